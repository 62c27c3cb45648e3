//! Office Open XML plumbing shared by the DOCX, XLSX and PPTX processors:
//! an in-memory zip package and a small mutable XML tree.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use crate::core::errors::{Result, TranslationError};

/// One entry of a zip package
#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    data: Vec<u8>,
    method: zip::CompressionMethod,
    is_dir: bool,
}

/// A zip package held fully in memory; entry order and compression are kept
/// when it is written back.
#[derive(Debug, Clone)]
pub struct Package {
    entries: Vec<PackageEntry>,
}

impl Package {
    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Result<Self> {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| TranslationError::parse(path, e))?;

        let mut entries = Vec::with_capacity(archive.len());
        for idx in 0..archive.len() {
            let mut file = archive
                .by_index(idx)
                .map_err(|e| TranslationError::parse(path, e))?;
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            entries.push(PackageEntry {
                name: file.name().to_string(),
                data,
                method: file.compression(),
                is_dir: file.is_dir(),
            });
        }

        Ok(Self { entries })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.data.as_slice())
    }

    /// Parse a required XML part
    pub fn xml_part(&self, path: &Path, name: &str) -> Result<XmlDocument> {
        let data = self.part(name).ok_or_else(|| TranslationError::ParseError {
            path: path.display().to_string(),
            message: format!("missing part {}", name),
        })?;
        XmlDocument::parse(data).map_err(|e| TranslationError::parse(path, e))
    }

    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.data = data,
            None => self.entries.push(PackageEntry {
                name: name.to_string(),
                data,
                method: zip::CompressionMethod::Deflated,
                is_dir: false,
            }),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            let method = match entry.method {
                zip::CompressionMethod::Stored => zip::CompressionMethod::Stored,
                _ => zip::CompressionMethod::Deflated,
            };
            let options = zip::write::FileOptions::default().compression_method(method);

            if entry.is_dir {
                writer.add_directory(entry.name.clone(), options)?;
            } else {
                writer.start_file(entry.name.clone(), options)?;
                writer.write_all(&entry.data)?;
            }
        }

        Ok(writer.finish()?.into_inner())
    }
}

/// Relationship id -> part name, for the `.rels` file belonging to `part`.
///
/// `xl/workbook.xml` reads `xl/_rels/workbook.xml.rels`; relative targets are
/// resolved against the directory of `part`.
pub fn relationships(package: &Package, path: &Path, part: &str) -> Result<HashMap<String, String>> {
    let (dir, file) = match part.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", part),
    };
    let rels_name = if dir.is_empty() {
        format!("_rels/{}.rels", file)
    } else {
        format!("{}/_rels/{}.rels", dir, file)
    };

    let mut map = HashMap::new();
    let Some(data) = package.part(&rels_name) else {
        return Ok(map);
    };
    let rels = XmlDocument::parse(data).map_err(|e| TranslationError::parse(path, e))?;

    if let Some(root) = rels.root() {
        for rel in root.children_named("Relationship") {
            let (Some(id), Some(target)) = (rel.attr("Id"), rel.attr("Target")) else {
                continue;
            };
            let resolved = match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None if dir.is_empty() => target.to_string(),
                None => format!("{}/{}", dir, target),
            };
            map.insert(id.to_string(), normalize_part_name(&resolved));
        }
    }

    Ok(map)
}

/// Collapse `..` and `.` segments
fn normalize_part_name(name: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// XML node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// Declarations, comments, CDATA and processing instructions, kept as is
    Raw(Event<'static>),
}

/// XML element with its qualified name and unescaped attribute values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// Local part of a qualified name (`w:p` -> `p`)
fn local(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, l)| l).unwrap_or(name)
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Matches on the local name, ignoring the namespace prefix
    pub fn is(&self, local_name: &str) -> bool {
        local(&self.name) == local_name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((key.to_string(), value.to_string())),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.is(local_name))
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a mut Element> {
        self.elements_mut().filter(move |e| e.is(local_name))
    }

    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(local_name))
    }

    pub fn child_mut(&mut self, local_name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.is(local_name))
    }

    /// Concatenated character data directly inside this element
    pub fn own_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Concatenated text of every descendant `local_name` element, in
    /// document order (e.g. all `w:t` inside a paragraph)
    pub fn text_of(&self, local_name: &str) -> String {
        let mut out = String::new();
        self.walk(&mut |e| {
            if e.is(local_name) {
                out.push_str(&e.own_text());
            }
        });
        out
    }

    fn walk(&self, f: &mut dyn FnMut(&Element)) {
        for child in self.elements() {
            f(child);
            child.walk(f);
        }
    }

    fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Element)) {
        for child in self.elements_mut() {
            f(child);
            child.walk_mut(f);
        }
    }

    pub fn set_own_text(&mut self, text: &str) {
        self.children.retain(|n| !matches!(n, Node::Text(_)));
        if !text.is_empty() {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    /// Put `text` into the first descendant `local_name` element and empty
    /// every later one, so the first run keeps its formatting. Returns false
    /// when there is no such element.
    pub fn replace_run_text(&mut self, local_name: &str, text: &str) -> bool {
        let mut first = true;
        self.walk_mut(&mut |e| {
            if e.is(local_name) {
                if first {
                    e.set_own_text(text);
                    first = false;
                } else {
                    e.set_own_text("");
                }
            }
        });
        !first
    }

    /// First descendant with the given local name, depth first
    pub fn find(&self, local_name: &str) -> Option<&Element> {
        for child in self.elements() {
            if child.is(local_name) {
                return Some(child);
            }
            if let Some(found) = child.find(local_name) {
                return Some(found);
            }
        }
        None
    }

    /// Visit every descendant with the given local name
    pub fn for_each_mut(&mut self, local_name: &str, f: &mut dyn FnMut(&mut Element)) {
        self.walk_mut(&mut |e| {
            if e.is(local_name) {
                f(e);
            }
        });
    }

    /// Replace all `para` children with one paragraph per line of `text`.
    ///
    /// The first paragraph that has a `run` element is cloned as the
    /// template for every line, so paragraph and first-run formatting carry
    /// over. Returns false (leaving the element untouched) when no paragraph
    /// has a run to write into.
    pub fn set_paragraphs(&mut self, para: &str, run: &str, text: &str) -> bool {
        let Some(template) = self
            .children_named(para)
            .find(|p| p.find(run).is_some())
            .cloned()
        else {
            return false;
        };

        let Some(position) = self
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if e.is(para)))
        else {
            return false;
        };

        let paragraphs: Vec<Node> = text
            .split('\n')
            .map(|line| {
                let mut p = template.clone();
                p.replace_run_text(run, line);
                Node::Element(p)
            })
            .collect();

        self.children
            .retain(|n| !matches!(n, Node::Element(e) if e.is(para)));
        let position = position.min(self.children.len());
        self.children.splice(position..position, paragraphs);
        true
    }
}

/// A parsed XML part
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlDocument {
    pub nodes: Vec<Node>,
}

impl XmlDocument {
    pub fn parse(data: &[u8]) -> std::result::Result<Self, quick_xml::Error> {
        let mut reader = Reader::from_reader(data);
        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut nodes: Vec<Node> = Vec::new();

        fn push(stack: &mut [Element], nodes: &mut Vec<Node>, node: Node) {
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => nodes.push(node),
            }
        }

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Eof => break,
                Event::Start(start) => stack.push(element_from(&start)?),
                Event::Empty(start) => {
                    let element = element_from(&start)?;
                    push(&mut stack, &mut nodes, Node::Element(element));
                }
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        push(&mut stack, &mut nodes, Node::Element(element));
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape()?.into_owned();
                    push(&mut stack, &mut nodes, Node::Text(text));
                }
                other => push(&mut stack, &mut nodes, Node::Raw(other.into_owned())),
            }
            buf.clear();
        }

        while let Some(element) = stack.pop() {
            push(&mut stack, &mut nodes, Node::Element(element));
        }

        Ok(Self { nodes })
    }

    pub fn root(&self) -> Option<&Element> {
        self.nodes.iter().find_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn root_mut(&mut self) -> Option<&mut Element> {
        self.nodes.iter_mut().find_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, quick_xml::Error> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.nodes {
            write_node(&mut writer, node)?;
        }
        Ok(writer.into_inner())
    }
}

fn element_from(start: &BytesStart<'_>) -> std::result::Result<Element, quick_xml::Error> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attrs.push((key, value));
    }
    Ok(element)
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> std::result::Result<(), quick_xml::Error> {
    match node {
        Node::Element(element) => {
            let mut start = BytesStart::new(element.name.as_str());
            for (key, value) in &element.attrs {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            if element.children.is_empty() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                for child in &element.children {
                    write_node(writer, child)?;
                }
                writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
            }
        }
        Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        Node::Raw(event) => writer.write_event(event.clone())?,
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fixtures::{package, read_part};
    use super::*;

    #[test]
    fn test_xml_roundtrip_keeps_structure() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="x"><w:body><w:p><w:r><w:t xml:space="preserve">A &amp; B</w:t></w:r></w:p><w:sectPr/></w:body></w:document>"#;
        let doc = XmlDocument::parse(xml.as_bytes()).unwrap();
        let body = doc.root().unwrap().child("body").unwrap();
        assert_eq!(body.child("p").unwrap().text_of("t"), "A & B");

        let written = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert_eq!(written, xml);
    }

    #[test]
    fn test_replace_run_text_keeps_first_run() {
        let xml = r#"<p><r><rPr/><t>Hel</t></r><r><t>lo</t></r></p>"#;
        let mut doc = XmlDocument::parse(xml.as_bytes()).unwrap();
        let para = doc.root_mut().unwrap();
        assert!(para.replace_run_text("t", "Halo"));

        let written = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert_eq!(written, "<p><r><rPr/><t>Halo</t></r><r><t/></r></p>");
    }

    #[test]
    fn test_replace_run_text_without_runs() {
        let mut element = Element::new("p");
        assert!(!element.replace_run_text("t", "x"));
    }

    #[test]
    fn test_relationships_resolve_relative_targets() {
        let bytes = package(&[(
            "xl/_rels/workbook.xml.rels",
            r#"<Relationships><Relationship Id="rId1" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Target="/xl/worksheets/../sharedStrings.xml"/></Relationships>"#,
        )]);
        let pkg = Package::from_bytes(Path::new("a.xlsx"), bytes).unwrap();
        let rels = relationships(&pkg, Path::new("a.xlsx"), "xl/workbook.xml").unwrap();

        assert_eq!(rels["rId1"], "xl/worksheets/sheet1.xml");
        assert_eq!(rels["rId2"], "xl/sharedStrings.xml");
    }

    #[test]
    fn test_package_rewrite_keeps_other_parts() {
        let bytes = package(&[("a.xml", "<a/>"), ("media/b.bin", "raw")]);
        let mut pkg = Package::from_bytes(Path::new("p.zip"), bytes).unwrap();
        pkg.set_part("a.xml", b"<a>x</a>".to_vec());

        let written = pkg.to_bytes().unwrap();
        assert_eq!(read_part(&written, "a.xml"), "<a>x</a>");
        assert_eq!(read_part(&written, "media/b.bin"), "raw");
        assert_eq!(
            Package::from_bytes(Path::new("p.zip"), written)
                .unwrap()
                .entries
                .iter()
                .map(|e| e.name.as_str())
                .collect::<Vec<_>>(),
            vec!["a.xml", "media/b.bin"]
        );
    }

    #[test]
    fn test_not_a_zip_is_parse_error() {
        let err = Package::from_bytes(Path::new("x.docx"), b"plain text".to_vec()).unwrap_err();
        assert!(err.is_parse_failure());
    }
}
