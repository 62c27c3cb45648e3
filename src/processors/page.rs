//! PDF processor.
//!
//! Each page's text is extracted and split into lines. A page that gets at
//! least one translated line has its content stream replaced by all of its
//! lines drawn in Helvetica from a fixed origin near the top-left corner.
//! Original layout, images and fonts are not reproduced.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

use crate::core::errors::{Result, TranslationError};
use crate::core::models::{is_blank, TranslatableUnit};
use crate::processors::FormatAdapter;

/// Distance of the first baseline from the left and top edges, in points
const ORIGIN: i64 = 50;
const FONT_SIZE: i64 = 11;
const LEADING: i64 = 14;
/// Top edge of a US Letter page, used when a page has no resolvable MediaBox
const DEFAULT_PAGE_TOP: f32 = 792.0;

/// Page index and line index within the page's extracted text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLocator {
    pub page: usize,
    pub line: usize,
}

impl fmt::Display for PageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}, line {}", self.page + 1, self.line + 1)
    }
}

#[derive(Debug)]
struct PageText {
    id: ObjectId,
    lines: Vec<String>,
    dirty: bool,
}

pub struct PageDocument {
    pdf: Document,
    pages: Vec<PageText>,
}

impl fmt::Debug for PageDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageDocument")
            .field("pages", &self.pages)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PageProcessor;

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Upper y coordinate of the page's MediaBox, following inherited attributes
fn page_top(pdf: &Document, page_id: ObjectId) -> f32 {
    let mut current = Some(page_id);
    // page trees are shallow; the bound guards against reference cycles
    for _ in 0..32 {
        let Some(id) = current else { break };
        let Ok(dict) = pdf.get_dictionary(id) else { break };

        if let Ok(Object::Array(mediabox)) = dict.get(b"MediaBox") {
            if let (Some(y0), Some(y1)) = (
                mediabox.get(1).and_then(number),
                mediabox.get(3).and_then(number),
            ) {
                return y0.max(y1);
            }
        }

        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    DEFAULT_PAGE_TOP
}

/// Helvetica with WinAnsi encoding covers Latin-1; anything else becomes `?`
fn encode_line(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| if (c as u32) < 256 { c as u32 as u8 } else { b'?' })
        .collect()
}

fn page_content(lines: &[String], page_top: f32) -> Result<Vec<u8>> {
    let baseline = page_top as i64 - ORIGIN;

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(b"F1".to_vec()), Object::Integer(FONT_SIZE)],
        ),
        Operation::new("TL", vec![Object::Integer(LEADING)]),
        Operation::new("Td", vec![Object::Integer(ORIGIN), Object::Integer(baseline)]),
    ];
    for line in lines {
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode_line(line))],
        ));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    Ok(Content { operations }.encode()?)
}

impl FormatAdapter for PageProcessor {
    type Document = PageDocument;
    type Locator = PageLocator;

    fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<PageDocument> {
        let pdf = Document::load_mem(&bytes).map_err(|e| TranslationError::parse(path, e))?;

        let mut pages = Vec::new();
        for (number, id) in pdf.get_pages() {
            let text = pdf
                .extract_text(&[number])
                .map_err(|e| TranslationError::parse(path, e))?;
            let lines = text
                .split('\n')
                .map(|l| l.trim_end_matches('\r').to_string())
                .collect();
            pages.push(PageText {
                id,
                lines,
                dirty: false,
            });
        }

        debug!("Opened PDF with {} pages", pages.len());
        Ok(PageDocument { pdf, pages })
    }

    fn extract(&self, doc: &PageDocument) -> Vec<TranslatableUnit<PageLocator>> {
        let mut units = Vec::new();
        for (page_idx, page) in doc.pages.iter().enumerate() {
            for (line_idx, line) in page.lines.iter().enumerate() {
                if !is_blank(line) {
                    let locator = PageLocator {
                        page: page_idx,
                        line: line_idx,
                    };
                    units.push(TranslatableUnit::new(locator, line.clone()));
                }
            }
        }
        units
    }

    fn reinsert(&self, doc: &mut PageDocument, replacements: Vec<(PageLocator, String)>) -> Result<()> {
        for (locator, translation) in replacements {
            let Some(line) = doc
                .pages
                .get_mut(locator.page)
                .and_then(|page| {
                    page.dirty = true;
                    page.lines.get_mut(locator.line)
                })
            else {
                warn!("No line at {}, skipping", locator);
                continue;
            };
            *line = translation.replace(['\r', '\n'], " ");
        }
        Ok(())
    }

    fn serialize(&self, mut doc: PageDocument) -> Result<Vec<u8>> {
        let font_id = doc.pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        for page in doc.pages.iter().filter(|p| p.dirty) {
            let top = page_top(&doc.pdf, page.id);
            let content = page_content(&page.lines, top)?;
            doc.pdf.change_page_content(page.id, content)?;

            let page_dict = doc.pdf.get_object_mut(page.id)?.as_dict_mut()?;
            page_dict.set(
                "Resources",
                dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            );
        }

        let mut out = Vec::new();
        doc.pdf.save_to(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch::BatchTranslator;
    use crate::core::provider::mock::UppercaseProvider;
    use crate::processors::process_file;
    use lopdf::Stream;
    use std::sync::Arc;
    use std::time::Duration;

    fn sample_pdf(lines: &[&str]) -> Vec<u8> {
        sample_pdf_with_box(lines, [0, 0, 595, 842])
    }

    fn sample_pdf_with_box(lines: &[&str], mediabox: [i64; 4]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new(
                "Td",
                vec![100.into(), (700 - 20 * idx as i64).into()],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => mediabox.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn shown_text(pdf: &Document, page_id: ObjectId) -> Vec<String> {
        let content = Content::decode(&pdf.get_page_content(page_id).unwrap()).unwrap();
        content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| op.operands.first())
            .filter_map(|obj| obj.as_str().ok())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }

    #[test]
    fn test_extracts_lines_per_page() {
        let doc = PageProcessor
            .parse(Path::new("a.pdf"), sample_pdf(&["Hello", "World"]))
            .unwrap();
        let units = PageProcessor.extract(&doc);

        let texts: Vec<&str> = units.iter().map(|u| u.text.trim()).collect();
        assert!(texts.contains(&"Hello"));
        assert!(texts.contains(&"World"));
        assert!(units.iter().all(|u| u.locator.page == 0));
    }

    #[test]
    fn test_page_top_inherited_from_parent() {
        let doc = PageProcessor
            .parse(Path::new("a.pdf"), sample_pdf(&["x"]))
            .unwrap();
        assert_eq!(page_top(&doc.pdf, doc.pages[0].id), 842.0);
    }

    #[tokio::test]
    async fn test_baseline_follows_offset_mediabox() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offset.pdf");
        std::fs::write(&path, sample_pdf_with_box(&["Hello"], [0, 100, 595, 942])).unwrap();

        let translator =
            BatchTranslator::new(Arc::new(UppercaseProvider), 20).with_chunk_delay(Duration::ZERO);
        process_file(&PageProcessor, &path, "id", &translator)
            .await
            .unwrap();

        let pdf = Document::load_mem(&std::fs::read(&path).unwrap()).unwrap();
        let page_id = *pdf.get_pages().values().next().unwrap();
        let content = Content::decode(&pdf.get_page_content(page_id).unwrap()).unwrap();
        let td = content
            .operations
            .iter()
            .find(|op| op.operator == "Td")
            .unwrap();
        assert_eq!(td.operands, vec![Object::Integer(ORIGIN), Object::Integer(892)]);
    }

    #[test]
    fn test_encode_line_replaces_unsupported_chars() {
        assert_eq!(encode_line("Café 日本"), vec![b'C', b'a', b'f', 0xe9, b' ', b'?', b'?']);
    }

    #[tokio::test]
    async fn test_rewrites_page_with_translated_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("letter.pdf");
        std::fs::write(&path, sample_pdf(&["Hello", "World"])).unwrap();

        let translator =
            BatchTranslator::new(Arc::new(UppercaseProvider), 20).with_chunk_delay(Duration::ZERO);
        let report = process_file(&PageProcessor, &path, "id", &translator)
            .await
            .unwrap();
        assert!(report.replaced >= 2);

        let pdf = Document::load_mem(&std::fs::read(&path).unwrap()).unwrap();
        let page_id = *pdf.get_pages().values().next().unwrap();
        let shown = shown_text(&pdf, page_id).join("|");
        assert!(shown.contains("HELLO"));
        assert!(shown.contains("WORLD"));

        let page = pdf.get_dictionary(page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        assert!(resources.get(b"Font").unwrap().as_dict().unwrap().has(b"F1"));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let err = PageProcessor
            .parse(Path::new("bad.pdf"), b"%PDF-nope".to_vec())
            .unwrap_err();
        assert!(err.is_parse_failure());
    }
}
