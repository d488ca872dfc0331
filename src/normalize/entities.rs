/// Entities resolved by [`decode_entities`]. Anything else passes through.
///
/// Numeric references other than `&#39;` are recognized as entity tokens but
/// deliberately left undecoded.
const ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
];

/// Resolves the fixed set of HTML entities in `text`.
///
/// Tokens of the form `&name;` (ASCII letters) or `&#digits;` are looked up
/// exactly, case-sensitively; unknown tokens are copied unchanged. Each token
/// is decoded once, so `&amp;lt;` becomes `&lt;`, not `<`.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match entity_token_len(candidate) {
            Some(len) => {
                let token = &candidate[..len];
                let replacement = ENTITIES
                    .iter()
                    .find(|(name, _)| *name == token)
                    .map_or(token, |(_, value)| *value);
                out.push_str(replacement);
                rest = &candidate[len..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);

    out
}

/// Length in bytes of the entity token at the start of `s`, if any.
fn entity_token_len(s: &str) -> Option<usize> {
    let body = s.strip_prefix('&')?;
    let (digits, offset) = match body.strip_prefix('#') {
        Some(numeric) => (true, numeric),
        None => (false, body),
    };

    let name_len = offset
        .bytes()
        .take_while(|b| {
            if digits {
                b.is_ascii_digit()
            } else {
                b.is_ascii_alphabetic()
            }
        })
        .count();

    if name_len == 0 || offset.as_bytes().get(name_len) != Some(&b';') {
        return None;
    }

    // '&' + optional '#' + name + ';'
    Some(1 + usize::from(digits) + name_len + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fixed_table() {
        assert_eq!(
            decode_entities("&amp; &lt; &gt; &quot; &#39; &apos;"),
            "& < > \" ' '"
        );
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(decode_entities("Nothing to see"), "Nothing to see");
    }

    #[test]
    fn test_unknown_named_entity_passes_through() {
        assert_eq!(decode_entities("a&nbsp;b &copy;"), "a&nbsp;b &copy;");
    }

    #[test]
    fn test_numeric_entities_other_than_apostrophe_pass_through() {
        assert_eq!(decode_entities("It&#8217;s &#38; more"), "It&#8217;s &#38; more");
    }

    #[test]
    fn test_match_is_case_sensitive() {
        assert_eq!(decode_entities("&AMP; &Amp;"), "&AMP; &Amp;");
    }

    #[test]
    fn test_decoded_once() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_bare_ampersands_kept() {
        assert_eq!(decode_entities("Tom & Jerry &"), "Tom & Jerry &");
        assert_eq!(decode_entities("&;"), "&;");
        assert_eq!(decode_entities("&#;"), "&#;");
        assert_eq!(decode_entities("&amp"), "&amp");
    }

    #[test]
    fn test_adjacent_entities() {
        assert_eq!(decode_entities("&lt;&lt;&gt;&gt;"), "<<>>");
    }

    #[test]
    fn test_multibyte_text_around_entities() {
        assert_eq!(decode_entities("café &amp; crème"), "café & crème");
    }
}
