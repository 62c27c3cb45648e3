//! JSON and YAML processor: translates every string leaf of the tree

use std::fmt;
use std::path::Path;
use tracing::warn;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::TranslatableUnit;
use crate::processors::FormatAdapter;

/// One step from a container to a child
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Mapping entry by string key
    Key(String),
    /// Mapping entry by position, for YAML keys that are not strings
    Entry(usize),
    /// Sequence element
    Index(usize),
}

/// Path from the document root to a string leaf
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPath(pub Vec<PathSegment>);

impl KeyPath {
    fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) => write!(f, ".{}", key)?,
                PathSegment::Entry(idx) => write!(f, ".<{}>", idx)?,
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// Parsed JSON or YAML tree
#[derive(Debug, Clone, PartialEq)]
pub enum Tree {
    Json(serde_json::Value),
    Yaml(serde_yaml::Value),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredProcessor;

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            ext == "yaml" || ext == "yml"
        })
        .unwrap_or(false)
}

/// Depth-first walk collecting string leaves
fn collect_json(value: &serde_json::Value, path: KeyPath, out: &mut Vec<TranslatableUnit<KeyPath>>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                collect_json(child, path.child(PathSegment::Key(key.clone())), out);
            }
        }
        serde_json::Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                collect_json(child, path.child(PathSegment::Index(idx)), out);
            }
        }
        serde_json::Value::String(text) if !text.trim().is_empty() => {
            out.push(TranslatableUnit::new(path, text.clone()));
        }
        _ => {}
    }
}

fn collect_yaml(value: &serde_yaml::Value, path: KeyPath, out: &mut Vec<TranslatableUnit<KeyPath>>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (idx, (key, child)) in map.iter().enumerate() {
                let segment = match key.as_str() {
                    Some(key) => PathSegment::Key(key.to_string()),
                    None => PathSegment::Entry(idx),
                };
                collect_yaml(child, path.child(segment), out);
            }
        }
        serde_yaml::Value::Sequence(items) => {
            for (idx, child) in items.iter().enumerate() {
                collect_yaml(child, path.child(PathSegment::Index(idx)), out);
            }
        }
        serde_yaml::Value::Tagged(tagged) => collect_yaml(&tagged.value, path, out),
        serde_yaml::Value::String(text) if !text.trim().is_empty() => {
            out.push(TranslatableUnit::new(path, text.clone()));
        }
        _ => {}
    }
}

fn json_leaf<'a>(root: &'a mut serde_json::Value, path: &KeyPath) -> Option<&'a mut String> {
    let mut node = root;
    for segment in &path.0 {
        node = match segment {
            PathSegment::Key(key) => node.get_mut(key.as_str())?,
            PathSegment::Index(idx) => node.get_mut(*idx)?,
            PathSegment::Entry(_) => return None,
        };
    }
    match node {
        serde_json::Value::String(text) => Some(text),
        _ => None,
    }
}

fn untag(value: &mut serde_yaml::Value) -> &mut serde_yaml::Value {
    match value {
        serde_yaml::Value::Tagged(tagged) => untag(&mut tagged.value),
        other => other,
    }
}

fn yaml_leaf<'a>(root: &'a mut serde_yaml::Value, path: &KeyPath) -> Option<&'a mut String> {
    let mut node = root;
    for segment in &path.0 {
        node = match (segment, untag(node)) {
            (PathSegment::Key(key), serde_yaml::Value::Mapping(map)) => map.get_mut(key.as_str())?,
            (PathSegment::Entry(idx), serde_yaml::Value::Mapping(map)) => {
                map.iter_mut().nth(*idx).map(|(_, v)| v)?
            }
            (PathSegment::Index(idx), serde_yaml::Value::Sequence(items)) => items.get_mut(*idx)?,
            _ => return None,
        };
    }
    match untag(node) {
        serde_yaml::Value::String(text) => Some(text),
        _ => None,
    }
}

/// Pretty JSON with 4-space indentation, non-ASCII left as is
fn to_json_bytes(value: &serde_json::Value) -> Result<Vec<u8>> {
    use serde::Serialize;

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

impl FormatAdapter for StructuredProcessor {
    type Document = Tree;
    type Locator = KeyPath;

    fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<Tree> {
        if is_yaml(path) {
            Ok(Tree::Yaml(
                serde_yaml::from_slice(&bytes).map_err(|e| TranslationError::parse(path, e))?,
            ))
        } else {
            Ok(Tree::Json(
                serde_json::from_slice(&bytes).map_err(|e| TranslationError::parse(path, e))?,
            ))
        }
    }

    fn extract(&self, doc: &Tree) -> Vec<TranslatableUnit<KeyPath>> {
        let mut units = Vec::new();
        match doc {
            Tree::Json(value) => collect_json(value, KeyPath::default(), &mut units),
            Tree::Yaml(value) => collect_yaml(value, KeyPath::default(), &mut units),
        }
        units
    }

    fn reinsert(&self, doc: &mut Tree, replacements: Vec<(KeyPath, String)>) -> Result<()> {
        for (path, translation) in replacements {
            let leaf = match doc {
                Tree::Json(value) => json_leaf(value, &path),
                Tree::Yaml(value) => yaml_leaf(value, &path),
            };
            match leaf {
                Some(text) => *text = translation,
                None => warn!("No string leaf at {}, skipping", path),
            }
        }
        Ok(())
    }

    fn serialize(&self, doc: Tree) -> Result<Vec<u8>> {
        match &doc {
            Tree::Json(value) => to_json_bytes(value),
            Tree::Yaml(value) => Ok(serde_yaml::to_string(value)?.into_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch::BatchTranslator;
    use crate::core::provider::mock::{EchoProvider, UppercaseProvider};
    use crate::processors::process_file;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn parse_json(content: &str) -> Tree {
        StructuredProcessor
            .parse(Path::new("a.json"), content.as_bytes().to_vec())
            .unwrap()
    }

    fn translator(provider: Arc<dyn crate::core::provider::TranslationProvider>) -> BatchTranslator {
        BatchTranslator::new(provider, 20).with_chunk_delay(Duration::ZERO)
    }

    #[test]
    fn test_extracts_string_leaves_depth_first() {
        let doc = parse_json(r#"{"title":"Hi","items":[{"name":"A","qty":2},"B"],"ok":true,"none":null,"blank":""}"#);
        let units = StructuredProcessor.extract(&doc);

        let paths: Vec<String> = units.iter().map(|u| u.locator.to_string()).collect();
        assert_eq!(paths, vec!["$.title", "$.items[0].name", "$.items[1]"]);
        let texts: Vec<&str> = units.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, vec!["Hi", "A", "B"]);
    }

    #[tokio::test]
    async fn test_translates_nested_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ui.json");
        std::fs::write(
            &path,
            r#"{"menu":{"open":"Open","count":3,"tags":["new","",false]},"empty":""}"#,
        )
        .unwrap();

        process_file(&StructuredProcessor, &path, "id", &translator(Arc::new(UppercaseProvider)))
            .await
            .unwrap();

        let output: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_json_eq!(
            output,
            json!({"menu": {"open": "OPEN", "count": 3, "tags": ["NEW", "", false]}, "empty": ""})
        );
    }

    #[tokio::test]
    async fn test_written_json_keeps_key_order_and_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.json");
        std::fs::write(&path, r#"{"z":"é","a":"b"}"#).unwrap();

        process_file(&StructuredProcessor, &path, "id", &translator(Arc::new(UppercaseProvider)))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\n    \"z\": \"É\",\n    \"a\": \"B\"\n}"
        );
    }

    #[tokio::test]
    async fn test_echo_translation_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compact.json");
        let original = "{\"a\":[\"x\",1,{\"b\":\"y\"}],  \"c\" : null}\n";
        std::fs::write(&path, original).unwrap();

        process_file(&StructuredProcessor, &path, "id", &translator(Arc::new(EchoProvider)))
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn test_translates_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strings.yml");
        std::fs::write(&path, "greeting: hello\nlist:\n  - one\n  - 2\n1: numeric key\n").unwrap();

        process_file(&StructuredProcessor, &path, "id", &translator(Arc::new(UppercaseProvider)))
            .await
            .unwrap();

        let output: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(output["greeting"], serde_yaml::Value::from("HELLO"));
        assert_eq!(output["list"][0], serde_yaml::Value::from("ONE"));
        assert_eq!(output["list"][1], serde_yaml::Value::from(2));
        assert_eq!(output[1], serde_yaml::Value::from("NUMERIC KEY"));
    }

    #[test]
    fn test_stale_locator_is_ignored() {
        let mut doc = parse_json(r#"{"a":"x"}"#);
        let stale = KeyPath(vec![PathSegment::Key("missing".to_string())]);
        StructuredProcessor
            .reinsert(&mut doc, vec![(stale, "y".to_string())])
            .unwrap();
        assert_eq!(doc, Tree::Json(json!({"a": "x"})));
    }
}
