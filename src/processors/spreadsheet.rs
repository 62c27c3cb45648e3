//! XLSX processor: string cells of every worksheet

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

use crate::core::errors::{Result, TranslationError};
use crate::core::models::{is_blank, TranslatableUnit};
use crate::processors::ooxml::{relationships, Element, Package, XmlDocument};
use crate::processors::FormatAdapter;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Where a cell keeps its string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellText {
    /// Index into the shared string table
    Shared(usize),
    /// `<is>` element inside the cell
    Inline,
}

/// A string cell: sheet, row and cell position plus its A1 reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellLocator {
    pub sheet: usize,
    pub row: usize,
    pub column: usize,
    pub reference: String,
    pub text: CellText,
}

impl fmt::Display for CellLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sheet {}, cell {}", self.sheet + 1, self.reference)
    }
}

#[derive(Debug)]
pub struct Worksheet {
    pub name: String,
    part: String,
    xml: XmlDocument,
}

#[derive(Debug)]
pub struct Workbook {
    package: Package,
    sheets: Vec<Worksheet>,
    shared: Option<XmlDocument>,
}

impl Workbook {
    fn shared_item(&self, idx: usize) -> Option<&Element> {
        self.shared.as_ref()?.root()?.children_named("si").nth(idx)
    }

    fn shared_item_mut(&mut self, idx: usize) -> Option<&mut Element> {
        self.shared
            .as_mut()?
            .root_mut()?
            .children_named_mut("si")
            .nth(idx)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetProcessor;

/// Worksheet part names in workbook order
fn sheet_parts(package: &Package, path: &Path) -> Result<Vec<(String, String)>> {
    let workbook = package.xml_part(path, WORKBOOK_PART)?;
    let rels = relationships(package, path, WORKBOOK_PART)?;

    let mut parts = Vec::new();
    if let Some(sheets) = workbook.root().and_then(|r| r.child("sheets")) {
        for sheet in sheets.children_named("sheet") {
            let name = sheet.attr("name").unwrap_or_default().to_string();
            let target = sheet
                .attr("r:id")
                .and_then(|id| rels.get(id))
                .filter(|part| package.part(part).is_some());
            match target {
                Some(part) => parts.push((name, part.clone())),
                None => warn!("Sheet '{}' has no worksheet part, skipping", name),
            }
        }
    }

    Ok(parts)
}

fn sheet_data(xml: &XmlDocument) -> Option<&Element> {
    xml.root()?.child("sheetData")
}

fn cell_mut<'a>(xml: &'a mut XmlDocument, locator: &CellLocator) -> Option<&'a mut Element> {
    xml.root_mut()?
        .child_mut("sheetData")?
        .children_named_mut("row")
        .nth(locator.row)?
        .children_named_mut("c")
        .nth(locator.column)
}

/// Text of a string item (`<si>` or `<is>`), plain or rich
fn item_text(item: &Element) -> String {
    item.text_of("t")
}

impl FormatAdapter for SpreadsheetProcessor {
    type Document = Workbook;
    type Locator = CellLocator;

    fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<Workbook> {
        let package = Package::from_bytes(path, bytes)?;

        let mut sheets = Vec::new();
        for (name, part) in sheet_parts(&package, path)? {
            let xml = package.xml_part(path, &part)?;
            sheets.push(Worksheet { name, part, xml });
        }

        let shared = match package.part(SHARED_STRINGS_PART) {
            Some(data) => Some(XmlDocument::parse(data).map_err(|e| TranslationError::parse(path, e))?),
            None => None,
        };

        debug!("Opened workbook with {} sheets", sheets.len());
        Ok(Workbook {
            package,
            sheets,
            shared,
        })
    }

    fn extract(&self, doc: &Workbook) -> Vec<TranslatableUnit<CellLocator>> {
        let mut units = Vec::new();

        for (sheet_idx, sheet) in doc.sheets.iter().enumerate() {
            let Some(data) = sheet_data(&sheet.xml) else {
                continue;
            };

            for (row_idx, row) in data.children_named("row").enumerate() {
                for (col_idx, cell) in row.children_named("c").enumerate() {
                    let (text, kind) = match cell.attr("t") {
                        Some("s") => {
                            let Some(idx) = cell
                                .child("v")
                                .and_then(|v| v.own_text().trim().parse::<usize>().ok())
                            else {
                                continue;
                            };
                            let Some(item) = doc.shared_item(idx) else {
                                continue;
                            };
                            (item_text(item), CellText::Shared(idx))
                        }
                        Some("inlineStr") => match cell.child("is") {
                            Some(item) => (item_text(item), CellText::Inline),
                            None => continue,
                        },
                        _ => continue,
                    };

                    if is_blank(&text) {
                        continue;
                    }

                    let locator = CellLocator {
                        sheet: sheet_idx,
                        row: row_idx,
                        column: col_idx,
                        reference: cell.attr("r").unwrap_or_default().to_string(),
                        text: kind,
                    };
                    units.push(TranslatableUnit::new(locator, text));
                }
            }
        }

        units
    }

    fn reinsert(&self, doc: &mut Workbook, replacements: Vec<(CellLocator, String)>) -> Result<()> {
        let mut written_shared = HashSet::new();

        for (locator, translation) in replacements {
            let target = match locator.text {
                CellText::Shared(idx) => {
                    // a shared string is rewritten once even if many cells use it
                    if !written_shared.insert(idx) {
                        continue;
                    }
                    doc.shared_item_mut(idx)
                }
                CellText::Inline => doc
                    .sheets
                    .get_mut(locator.sheet)
                    .and_then(|sheet| cell_mut(&mut sheet.xml, &locator))
                    .and_then(|cell| cell.child_mut("is")),
            };

            match target {
                Some(item) => {
                    if !item.replace_run_text("t", &translation) {
                        warn!("No text element at {}, skipping", locator);
                    }
                }
                None => warn!("No string at {}, skipping", locator),
            }
        }

        Ok(())
    }

    fn serialize(&self, mut doc: Workbook) -> Result<Vec<u8>> {
        for sheet in &doc.sheets {
            doc.package.set_part(&sheet.part, sheet.xml.to_bytes()?);
        }
        if let Some(shared) = &doc.shared {
            doc.package.set_part(SHARED_STRINGS_PART, shared.to_bytes()?);
        }
        doc.package.to_bytes()
    }
}
