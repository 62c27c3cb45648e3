//! PPTX processor: text frames of the shapes on every slide

use std::fmt;
use std::path::Path;
use tracing::warn;

use crate::core::errors::Result;
use crate::core::models::{is_blank, TranslatableUnit};
use crate::processors::ooxml::{relationships, Element, Package, XmlDocument};
use crate::processors::FormatAdapter;

const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Slide index and shape index within the slide's shape tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeLocator {
    pub slide: usize,
    pub shape: usize,
}

impl fmt::Display for ShapeLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slide {}, shape {}", self.slide + 1, self.shape + 1)
    }
}

#[derive(Debug)]
struct Slide {
    part: String,
    xml: XmlDocument,
}

#[derive(Debug)]
pub struct Presentation {
    package: Package,
    slides: Vec<Slide>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PresentationProcessor;

/// Slide part names in presentation order
fn slide_parts(package: &Package, path: &Path) -> Result<Vec<String>> {
    let presentation = package.xml_part(path, PRESENTATION_PART)?;
    let rels = relationships(package, path, PRESENTATION_PART)?;

    let parts = presentation
        .root()
        .and_then(|r| r.child("sldIdLst"))
        .map(|list| {
            list.children_named("sldId")
                .filter_map(|slide| slide.attr("r:id"))
                .filter_map(|id| rels.get(id))
                .filter(|part| package.part(part).is_some())
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    Ok(parts)
}

/// Shapes (`p:sp`) directly in the slide's shape tree
fn shapes(xml: &XmlDocument) -> impl Iterator<Item = &Element> {
    xml.root()
        .and_then(|r| r.child("cSld"))
        .and_then(|c| c.child("spTree"))
        .into_iter()
        .flat_map(|tree| tree.children_named("sp"))
}

fn shape_mut<'a>(xml: &'a mut XmlDocument, idx: usize) -> Option<&'a mut Element> {
    xml.root_mut()?
        .child_mut("cSld")?
        .child_mut("spTree")?
        .children_named_mut("sp")
        .nth(idx)
}

/// Text frame contents: paragraphs joined by newlines
fn frame_text(body: &Element) -> String {
    body.children_named("p")
        .map(|p| p.text_of("t"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl FormatAdapter for PresentationProcessor {
    type Document = Presentation;
    type Locator = ShapeLocator;

    fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<Presentation> {
        let package = Package::from_bytes(path, bytes)?;

        let mut slides = Vec::new();
        for part in slide_parts(&package, path)? {
            let xml = package.xml_part(path, &part)?;
            slides.push(Slide { part, xml });
        }

        Ok(Presentation { package, slides })
    }

    fn extract(&self, doc: &Presentation) -> Vec<TranslatableUnit<ShapeLocator>> {
        let mut units = Vec::new();

        for (slide_idx, slide) in doc.slides.iter().enumerate() {
            for (shape_idx, shape) in shapes(&slide.xml).enumerate() {
                let Some(body) = shape.child("txBody") else {
                    continue;
                };
                let text = frame_text(body);
                if !is_blank(&text) {
                    let locator = ShapeLocator {
                        slide: slide_idx,
                        shape: shape_idx,
                    };
                    units.push(TranslatableUnit::new(locator, text));
                }
            }
        }

        units
    }

    fn reinsert(&self, doc: &mut Presentation, replacements: Vec<(ShapeLocator, String)>) -> Result<()> {
        for (locator, translation) in replacements {
            let body = doc
                .slides
                .get_mut(locator.slide)
                .and_then(|slide| shape_mut(&mut slide.xml, locator.shape))
                .and_then(|shape| shape.child_mut("txBody"));

            match body {
                Some(body) => {
                    if !body.set_paragraphs("p", "t", &translation) {
                        warn!("No text run at {}, skipping", locator);
                    }
                }
                None => warn!("No text frame at {}, skipping", locator),
            }
        }

        Ok(())
    }

    fn serialize(&self, mut doc: Presentation) -> Result<Vec<u8>> {
        for slide in &doc.slides {
            doc.package.set_part(&slide.part, slide.xml.to_bytes()?);
        }
        doc.package.to_bytes()
    }
}
