//! Child-to-supervisor message shapes and the dependency classifier.
//!
//! Messages are decoded into a closed set of variants. Anything that is not a
//! well-formed `{"kind": "dependency", "path": "..."}` object becomes
//! [`ChildMessage::Unknown`] and is discarded by the supervisor.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tag value identifying a dependency declaration.
pub const DEPENDENCY_KIND: &str = "dependency";

/// Every message a child may send, decoded by its `kind` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChildMessage {
    /// The child loaded `path` and wants restarts when it changes.
    Dependency { path: String },
    /// Any other tag.
    #[serde(other)]
    Unknown,
}

impl ChildMessage {
    /// Decode a structured message. Never fails.
    pub fn decode(message: &Value) -> Self {
        // serde would also accept a variant index here; only string tags count
        if !message.get("kind").is_some_and(Value::is_string) {
            return ChildMessage::Unknown;
        }
        ChildMessage::deserialize(message).unwrap_or(ChildMessage::Unknown)
    }

    /// Encode as one NDJSON line (without the trailing newline).
    pub fn to_line(&self) -> String {
        // A tagged enum of strings cannot fail to serialize
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A narrowed dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyMessage {
    pub path: String,
}

impl DependencyMessage {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// The declared path as a filesystem path, relative to `base` if needed.
    ///
    /// `file://` URLs are converted; anything that fails to convert is used
    /// verbatim as a path.
    pub fn to_path(&self, base: &Path) -> PathBuf {
        let raw = if self.path.starts_with("file:") {
            url::Url::parse(&self.path)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .unwrap_or_else(|| PathBuf::from(&self.path))
        } else {
            PathBuf::from(&self.path)
        };

        crate::watcher::normalize_path(&raw, base)
    }
}

impl From<DependencyMessage> for ChildMessage {
    fn from(message: DependencyMessage) -> Self {
        ChildMessage::Dependency { path: message.path }
    }
}

/// Narrow an arbitrary message to a dependency declaration.
pub fn classify(message: &Value) -> Option<DependencyMessage> {
    match ChildMessage::decode(message) {
        ChildMessage::Dependency { path } => Some(DependencyMessage { path }),
        ChildMessage::Unknown => None,
    }
}

/// Classify one raw NDJSON line. Lines that are not JSON yield `None`.
pub fn classify_line(line: &str) -> Option<DependencyMessage> {
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|value| classify(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_dependency() {
        let message = json!({ "kind": "dependency", "path": "/project/src/a.ts" });
        assert_eq!(
            classify(&message),
            Some(DependencyMessage::new("/project/src/a.ts"))
        );
    }

    #[test]
    fn test_classify_ignores_extra_fields() {
        let message = json!({ "kind": "dependency", "path": "a.ts", "extra": [1, 2] });
        assert_eq!(classify(&message), Some(DependencyMessage::new("a.ts")));
    }

    #[test]
    fn test_classify_is_total() {
        let rejected = [
            Value::Null,
            json!([]),
            json!(["dependency", "a.ts"]),
            json!(42),
            json!("dependency"),
            json!(true),
            json!({}),
            json!({ "path": "a.ts" }),
            json!({ "type": "dependency", "path": "a.ts" }),
            json!({ "kind": "log", "path": "a.ts" }),
            json!({ "kind": "Dependency", "path": "a.ts" }),
            json!({ "kind": null, "path": "a.ts" }),
            json!({ "kind": 0, "path": "a.ts" }),
            json!({ "kind": "dependency" }),
            json!({ "kind": "dependency", "path": 7 }),
            json!({ "kind": "dependency", "path": null }),
        ];

        for message in &rejected {
            assert_eq!(classify(message), None, "should reject {message}");
        }
    }

    #[test]
    fn test_classify_line() {
        assert_eq!(
            classify_line(r#"{"kind":"dependency","path":"x.js"}"#),
            Some(DependencyMessage::new("x.js"))
        );
        assert_eq!(classify_line("not json"), None);
        assert_eq!(classify_line(""), None);
        assert_eq!(classify_line("null"), None);
    }

    #[test]
    fn test_wire_shape() {
        let line = ChildMessage::from(DependencyMessage::new("/a/b.ts")).to_line();
        assert_eq!(line, r#"{"kind":"dependency","path":"/a/b.ts"}"#);
    }

    #[test]
    fn test_file_url_to_path() {
        let message = DependencyMessage::new("file:///definitely/not/here/mod.ts");
        assert_eq!(
            message.to_path(Path::new("/elsewhere")),
            PathBuf::from("/definitely/not/here/mod.ts")
        );
    }

    #[test]
    fn test_relative_path_resolves_against_base() {
        let message = DependencyMessage::new("./src/../lib/mod.ts");
        assert_eq!(
            message.to_path(Path::new("/definitely/not/here")),
            PathBuf::from("/definitely/not/here/lib/mod.ts")
        );
    }
}
