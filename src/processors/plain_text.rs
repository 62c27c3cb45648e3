//! Plain text processor: one unit per line

use std::path::Path;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::TranslatableUnit;
use crate::processors::FormatAdapter;

/// A line without its terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    /// Line ended with `\r\n`
    pub crlf: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextProcessor;

impl FormatAdapter for PlainTextProcessor {
    type Document = Vec<Line>;
    type Locator = usize;

    fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<Vec<Line>> {
        let content = String::from_utf8(bytes).map_err(|e| TranslationError::parse(path, e))?;

        Ok(content
            .split('\n')
            .map(|raw| match raw.strip_suffix('\r') {
                Some(text) => Line {
                    text: text.to_string(),
                    crlf: true,
                },
                None => Line {
                    text: raw.to_string(),
                    crlf: false,
                },
            })
            .collect())
    }

    fn extract(&self, doc: &Vec<Line>) -> Vec<TranslatableUnit<usize>> {
        doc.iter()
            .enumerate()
            .map(|(idx, line)| TranslatableUnit::new(idx, line.text.clone()))
            .collect()
    }

    fn reinsert(&self, doc: &mut Vec<Line>, replacements: Vec<(usize, String)>) -> Result<()> {
        for (idx, translation) in replacements {
            if let Some(line) = doc.get_mut(idx) {
                // a translation must not split one line into several
                line.text = translation.replace(['\r', '\n'], " ");
            }
        }
        Ok(())
    }

    fn serialize(&self, doc: Vec<Line>) -> Result<Vec<u8>> {
        let joined = doc
            .into_iter()
            .map(|line| {
                if line.crlf {
                    format!("{}\r", line.text)
                } else {
                    line.text
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(joined.into_bytes())
    }
}
