//! XML processor: translates text between tags and leaves already
//! translated comment blocks alone

use quick_xml::escape::unescape;
use regex::Regex;
use std::borrow::Cow;
use std::ops::Range;
use std::path::Path;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::TranslatableUnit;
use crate::processors::FormatAdapter;

/// Comments carrying an `EN:` or `DONE:` marker hold text that was already
/// translated and are copied through verbatim
pub const PROTECTED_COMMENT_PATTERN: &str = r"(?s)<!--\s*(?:EN|DONE):.*?-->";

/// Text between the end of one tag and the start of the next
pub const TAG_TEXT_PATTERN: &str = r"(?s)>(.*?)<";

/// Regex-driven processor for markup files
#[derive(Debug, Clone)]
pub struct MarkupProcessor {
    protected: Regex,
    tag_text: Regex,
}

/// Units carry unescaped text; translations are escaped back on write
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;")
}

impl MarkupProcessor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            protected: Regex::new(PROTECTED_COMMENT_PATTERN)?,
            tag_text: Regex::new(TAG_TEXT_PATTERN)?,
        })
    }

    /// Byte ranges of `content` outside protected comments
    fn open_segments(&self, content: &str) -> Vec<Range<usize>> {
        let mut segments = Vec::new();
        let mut cursor = 0;
        for block in self.protected.find_iter(content) {
            segments.push(cursor..block.start());
            cursor = block.end();
        }
        segments.push(cursor..content.len());
        segments
    }
}

/// Narrow `range` to its text without surrounding whitespace
fn trimmed_range(content: &str, range: Range<usize>) -> Range<usize> {
    let slice = &content[range.clone()];
    let start = range.start + (slice.len() - slice.trim_start().len());
    let end = range.end - (slice.len() - slice.trim_end().len());
    start..end.max(start)
}

impl FormatAdapter for MarkupProcessor {
    type Document = String;
    type Locator = Range<usize>;

    fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<String> {
        String::from_utf8(bytes).map_err(|e| TranslationError::parse(path, e))
    }

    fn extract(&self, doc: &String) -> Vec<TranslatableUnit<Range<usize>>> {
        let mut units = Vec::new();

        for segment in self.open_segments(doc) {
            let part = &doc[segment.clone()];
            for caps in self.tag_text.captures_iter(part) {
                let Some(inner) = caps.get(1) else { continue };
                let span = trimmed_range(
                    doc,
                    segment.start + inner.start()..segment.start + inner.end(),
                );
                if span.is_empty() {
                    continue;
                }
                let raw = &doc[span.clone()];
                let text = unescape(raw).unwrap_or(Cow::Borrowed(raw));
                units.push(TranslatableUnit::new(span, text.into_owned()));
            }
        }

        units
    }

    fn reinsert(&self, doc: &mut String, mut replacements: Vec<(Range<usize>, String)>) -> Result<()> {
        if replacements.is_empty() {
            return Ok(());
        }

        replacements.sort_by_key(|(span, _)| span.start);

        let mut output = String::with_capacity(doc.len());
        let mut cursor = 0;
        for (span, translation) in replacements {
            if span.start < cursor || span.end > doc.len() {
                continue;
            }
            output.push_str(&doc[cursor..span.start]);
            output.push_str(&escape_text(&translation));
            cursor = span.end;
        }
        output.push_str(&doc[cursor..]);

        *doc = output;
        Ok(())
    }

    fn serialize(&self, doc: String) -> Result<Vec<u8>> {
        Ok(doc.into_bytes())
    }
}
