use sha2::{Digest, Sha256};

/// Number of hex characters of the video id hash appended on slug collisions.
const COLLISION_SUFFIX_LEN: usize = 8;

/// Derives a URL-safe slug from a title.
///
/// Lower-cases and trims the title, turns each whitespace run into a single
/// hyphen, drops everything that is not an ASCII word character or hyphen,
/// then collapses repeated hyphens and strips them from both ends.
///
/// A title with no usable characters produces an empty slug.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();

    let mut slug = String::with_capacity(lowered.len());
    let mut in_whitespace = false;
    for c in lowered.trim().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            slug.push(c);
        }
    }

    // Stripped characters can leave hyphens adjacent, so collapse after filtering
    let mut collapsed = String::with_capacity(slug.len());
    for c in slug.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }

    collapsed.trim_matches('-').to_string()
}

/// Builds the slug used when `slug` is already owned by a different video.
///
/// Appends the first hex characters of SHA-256(`video_id`), so the result is
/// stable for a given video across syncs. An empty slug becomes the bare hash.
pub fn disambiguate_slug(slug: &str, video_id: &str) -> String {
    let hash = format!("{:x}", Sha256::digest(video_id.as_bytes()));
    let suffix = &hash[..COLLISION_SUFFIX_LEN];
    if slug.is_empty() {
        suffix.to_string()
    } else {
        format!("{}-{}", slug, suffix)
    }
}
