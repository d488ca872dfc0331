use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// SEC-003: Maximum element nesting depth before the walk is abandoned.
const MAX_DEPTH: usize = 64;

/// One `<entry>` block as extracted from the feed, before normalization.
///
/// Only `video_id` and `title` are guaranteed; every other field is `None`
/// when the feed omitted it. Text fields still carry their entity escapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub video_id: String,
    pub title: String,
    /// ISO-8601 timestamp as written in the feed
    pub published: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    /// View count exactly as written in the feed, unparsed
    pub view_count: Option<String>,
    /// Never present in channel feeds
    pub is_live_now: Option<bool>,
}

/// Result of walking a feed document.
#[derive(Debug, Default)]
pub struct ParseResult {
    /// Entries that had both an id and a title, in document order
    pub entries: Vec<RawEntry>,
    /// Number of entries discarded for lacking an id or title
    pub dropped: usize,
    /// True when an XML error stopped the walk before the end of the document
    pub truncated: bool,
}

#[derive(Debug, Error)]
pub enum ParseError {
    /// The root element is missing or is not `<feed>`.
    #[error("Document is not a video feed")]
    NotAFeed,

    /// XML was unreadable before the root element.
    #[error("XML parse error: {0}")]
    Xml(String),
}

/// Field slots of the entry currently being walked. First match wins.
#[derive(Debug, Default)]
struct EntryBuilder {
    video_id: Option<String>,
    title: Option<String>,
    published: Option<String>,
    description: Option<String>,
    thumbnail_url: Option<String>,
    view_count: Option<String>,
}

impl EntryBuilder {
    fn fill(slot: &mut Option<String>, value: &str) {
        let value = value.trim();
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }

    /// Routes the text of a properly closed element at `path` (relative to the entry).
    fn accept_text(&mut self, path: &[String], text: &str) {
        match path_str(path).as_slice() {
            ["videoId"] => Self::fill(&mut self.video_id, text),
            ["title"] => Self::fill(&mut self.title, text),
            ["published"] => Self::fill(&mut self.published, text),
            ["group", "description"] => Self::fill(&mut self.description, text),
            _ => {}
        }
    }

    /// Routes attributes of an element at `path` (relative to the entry).
    fn accept_attributes(&mut self, path: &[String], e: &BytesStart<'_>, reader: &Reader<&[u8]>) {
        match path_str(path).as_slice() {
            ["group", "thumbnail"] if self.thumbnail_url.is_none() => {
                if let Some(url) = attribute_value(e, reader, b"url") {
                    Self::fill(&mut self.thumbnail_url, &url);
                }
            }
            ["group", "community", "statistics"] if self.view_count.is_none() => {
                if let Some(views) = attribute_value(e, reader, b"views") {
                    Self::fill(&mut self.view_count, &views);
                }
            }
            _ => {}
        }
    }

    fn build(self) -> Option<RawEntry> {
        Some(RawEntry {
            video_id: self.video_id?,
            title: self.title?,
            published: self.published,
            description: self.description,
            thumbnail_url: self.thumbnail_url,
            view_count: self.view_count,
            is_live_now: None,
        })
    }
}

fn path_str(path: &[String]) -> Vec<&str> {
    path.iter().map(String::as_str).collect()
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Looks up an attribute by local name, XML-unescaping its value when possible.
fn attribute_value(e: &BytesStart<'_>, reader: &Reader<&[u8]>, name: &[u8]) -> Option<String> {
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed feed attribute");
                continue;
            }
        };
        if attr.key.local_name().as_ref() != name {
            continue;
        }
        let decoder = reader.decoder();
        let value = match attr.decode_and_unescape_value(decoder) {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        return Some(value);
    }
    None
}

/// Tracks the element stack and the entry under construction.
struct FeedWalker {
    /// Local names of open elements; index 0 is the root
    stack: Vec<String>,
    /// Open entry, if the walk is inside a top-level `<entry>`
    current: Option<EntryBuilder>,
    /// Text of the open entry, descendants included
    text: String,
    /// Offset into `text` where each open element's content begins
    text_starts: Vec<usize>,
    result: ParseResult,
}

impl FeedWalker {
    fn new() -> Self {
        Self {
            stack: Vec::new(),
            current: None,
            text: String::new(),
            text_starts: Vec::new(),
            result: ParseResult::default(),
        }
    }

    fn in_entry(&self) -> bool {
        self.current.is_some() && self.stack.len() >= 2
    }

    /// Path of the innermost open element relative to the entry element.
    fn entry_path(&self) -> &[String] {
        self.stack.get(2..).unwrap_or(&[])
    }

    fn finish_entry(&mut self) {
        if let Some(builder) = self.current.take() {
            match builder.build() {
                Some(entry) => self.result.entries.push(entry),
                None => {
                    tracing::debug!("Dropping feed entry without video id or title");
                    self.result.dropped += 1;
                }
            }
        }
        self.truncate(1);
        self.text.clear();
    }

    fn truncate(&mut self, depth: usize) {
        self.stack.truncate(depth);
        self.text_starts.truncate(depth);
    }

    /// Stops the walk early; the open entry, if any, counts as dropped.
    fn abandon(&mut self) {
        if self.current.take().is_some() {
            self.result.dropped += 1;
        }
        self.result.truncated = true;
    }

    fn start(&mut self, name: String) {
        if name == "entry" && (self.stack.len() == 1 || self.in_entry()) {
            // A new entry while one is still open closes the open one
            if self.current.is_some() {
                self.finish_entry();
            }
            self.current = Some(EntryBuilder::default());
            self.text.clear();
        }
        self.stack.push(name);
        self.text_starts.push(self.text.len());
    }

    fn empty(&mut self, name: &str, e: &BytesStart<'_>, reader: &Reader<&[u8]>) {
        if name == "entry" && self.stack.len() == 1 {
            // <entry/> carries nothing
            self.result.dropped += 1;
            return;
        }
        if self.in_entry() {
            let mut path = self.entry_path().to_vec();
            path.push(name.to_string());
            if let Some(builder) = self.current.as_mut() {
                builder.accept_attributes(&path, e, reader);
            }
        }
    }

    fn start_attributes(&mut self, e: &BytesStart<'_>, reader: &Reader<&[u8]>) {
        if self.in_entry() {
            let path = self.entry_path().to_vec();
            if let Some(builder) = self.current.as_mut() {
                builder.accept_attributes(&path, e, reader);
            }
        }
    }

    fn end(&mut self, name: &str) {
        let Some(position) = self.stack.iter().rposition(|open| open == name) else {
            tracing::debug!(element = %name, "Ignoring stray end tag");
            return;
        };
        let properly_closed = position + 1 == self.stack.len();

        // Closing the entry, or the root around an unclosed entry
        if position <= 1 && self.current.is_some() {
            self.finish_entry();
            self.truncate(position);
            return;
        }

        if properly_closed && self.in_entry() {
            // Mixed content keeps the text of child elements too
            let start = self.text_starts.get(position).copied().unwrap_or(0);
            let text = self.text.get(start..).unwrap_or_default().to_string();
            let path = self.entry_path().to_vec();
            if let Some(builder) = self.current.as_mut() {
                builder.accept_text(&path, &text);
            }
        }
        // Elements left open inside this one are closed implicitly, without their text
        self.truncate(position);
    }
}

/// Extracts video entries from a channel feed document.
///
/// Walks the XML tree and treats every `<entry>` directly under the root
/// `<feed>` as one video. From each entry it takes `yt:videoId`, `title`,
/// `published`, and from the nested `media:group` the description, the
/// thumbnail URL and the view count. The first occurrence of each field wins.
///
/// Extraction is per entry and best-effort:
/// - entries missing an id or title are dropped and counted in `dropped`
/// - mismatched end tags close the elements left open without failing
/// - an XML syntax error keeps the entries completed so far and sets `truncated`
///
/// # Errors
///
/// - [`ParseError::NotAFeed`] when there is no root element or it is not `<feed>`
/// - [`ParseError::Xml`] when the XML breaks before the root element
///
/// # Security
///
/// SEC-002: `quick-xml` does not expand `<!ENTITY>` declarations. Element
/// text is kept raw so entity decoding happens once, during normalization.
pub fn parse_feed(content: &str) -> Result<ParseResult, ParseError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().check_end_names = false;

    let mut walker = FeedWalker::new();
    let mut buf = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                if !seen_root {
                    if name != "feed" {
                        return Err(ParseError::NotAFeed);
                    }
                    seen_root = true;
                }
                if walker.stack.len() >= MAX_DEPTH {
                    tracing::warn!(max_depth = MAX_DEPTH, "Feed nesting too deep, stopping");
                    walker.abandon();
                    break;
                }
                walker.start(name);
                walker.start_attributes(&e, &reader);
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                if !seen_root {
                    // A self-closing root cannot hold entries
                    return if name == "feed" {
                        Ok(ParseResult::default())
                    } else {
                        Err(ParseError::NotAFeed)
                    };
                }
                walker.empty(&name, &e, &reader);
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                walker.end(&name);
            }
            Ok(Event::Text(t)) => {
                if walker.in_entry() {
                    walker.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::CData(t)) => {
                if walker.in_entry() {
                    walker.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::Eof) => {
                if !seen_root {
                    return Err(ParseError::NotAFeed);
                }
                if walker.current.is_some() {
                    walker.finish_entry();
                }
                break;
            }
            Err(e) => {
                if !seen_root {
                    return Err(ParseError::Xml(e.to_string()));
                }
                tracing::warn!(
                    error = %e,
                    position = reader.buffer_position(),
                    parsed = walker.result.entries.len(),
                    "Feed XML broken mid-document, keeping entries parsed so far"
                );
                walker.abandon();
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(walker.result)
}
