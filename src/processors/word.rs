//! DOCX processor: body paragraphs and table cells of `word/document.xml`

use std::fmt;
use std::path::Path;
use tracing::warn;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::{is_blank, TranslatableUnit};
use crate::processors::ooxml::{Element, Package, XmlDocument};
use crate::processors::FormatAdapter;

const DOCUMENT_PART: &str = "word/document.xml";

/// Paragraph index among body paragraphs, or a cell of a top-level table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordLocator {
    Paragraph(usize),
    Cell { table: usize, row: usize, cell: usize },
}

impl fmt::Display for WordLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordLocator::Paragraph(idx) => write!(f, "paragraph {}", idx + 1),
            WordLocator::Cell { table, row, cell } => {
                write!(f, "table {}, row {}, cell {}", table + 1, row + 1, cell + 1)
            }
        }
    }
}

#[derive(Debug)]
pub struct WordDocument {
    package: Package,
    xml: XmlDocument,
}

impl WordDocument {
    fn body(&self) -> Option<&Element> {
        self.xml.root()?.child("body")
    }

    fn body_mut(&mut self) -> Option<&mut Element> {
        self.xml.root_mut()?.child_mut("body")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WordProcessor;

/// Cell text: its paragraphs joined by newlines
fn cell_text(cell: &Element) -> String {
    cell.children_named("p")
        .map(|p| p.text_of("t"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `w:t` drops leading/trailing spaces unless told otherwise
fn preserve_spaces(element: &mut Element) {
    element.for_each_mut("t", &mut |t| {
        let text = t.own_text();
        if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
            t.set_attr("xml:space", "preserve");
        }
    });
}

fn locate<'a>(body: &'a mut Element, locator: &WordLocator) -> Option<&'a mut Element> {
    match *locator {
        WordLocator::Paragraph(idx) => body.children_named_mut("p").nth(idx),
        WordLocator::Cell { table, row, cell } => body
            .children_named_mut("tbl")
            .nth(table)?
            .children_named_mut("tr")
            .nth(row)?
            .children_named_mut("tc")
            .nth(cell),
    }
}

impl FormatAdapter for WordProcessor {
    type Document = WordDocument;
    type Locator = WordLocator;

    fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<WordDocument> {
        let package = Package::from_bytes(path, bytes)?;
        let xml = package.xml_part(path, DOCUMENT_PART)?;
        let doc = WordDocument { package, xml };

        if doc.body().is_none() {
            return Err(TranslationError::parse(path, "document has no body"));
        }
        Ok(doc)
    }

    fn extract(&self, doc: &WordDocument) -> Vec<TranslatableUnit<WordLocator>> {
        let mut units = Vec::new();
        let Some(body) = doc.body() else {
            return units;
        };

        for (idx, paragraph) in body.children_named("p").enumerate() {
            let text = paragraph.text_of("t");
            if !is_blank(&text) {
                units.push(TranslatableUnit::new(WordLocator::Paragraph(idx), text));
            }
        }

        for (table_idx, table) in body.children_named("tbl").enumerate() {
            for (row_idx, row) in table.children_named("tr").enumerate() {
                for (cell_idx, cell) in row.children_named("tc").enumerate() {
                    let text = cell_text(cell);
                    if !is_blank(&text) {
                        let locator = WordLocator::Cell {
                            table: table_idx,
                            row: row_idx,
                            cell: cell_idx,
                        };
                        units.push(TranslatableUnit::new(locator, text));
                    }
                }
            }
        }

        units
    }

    fn reinsert(&self, doc: &mut WordDocument, replacements: Vec<(WordLocator, String)>) -> Result<()> {
        let Some(body) = doc.body_mut() else {
            return Ok(());
        };

        for (locator, translation) in replacements {
            let Some(target) = locate(body, &locator) else {
                warn!("No element at {}, skipping", locator);
                continue;
            };

            let written = match locator {
                WordLocator::Paragraph(_) => {
                    target.replace_run_text("t", &translation.replace('\n', " "))
                }
                WordLocator::Cell { .. } => target.set_paragraphs("p", "t", &translation),
            };

            if written {
                preserve_spaces(target);
            } else {
                warn!("No text run at {}, skipping", locator);
            }
        }

        Ok(())
    }

    fn serialize(&self, mut doc: WordDocument) -> Result<Vec<u8>> {
        doc.package.set_part(DOCUMENT_PART, doc.xml.to_bytes()?);
        doc.package.to_bytes()
    }
}
