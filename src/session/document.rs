//! Read-only session document tree
//!
//! The simulator publishes its session info as a loosely typed YAML document.
//! [`SessionDocument`] keeps that tree intact and exposes it through
//! [`Query`], a cursor that supports path lookup, indexed-key lookup (select a
//! sequence element whose field has a given value) and scalar conversion.
//! Absent paths never panic: they produce an empty query whose scalar
//! accessors return `None`.
//!
//! ```rust
//! use pitwall_timing::session::SessionDocument;
//!
//! let doc = SessionDocument::parse(
//!     "DriverInfo:\n  Drivers:\n  - CarIdx: 0\n    UserName: Alice\n",
//! ).unwrap();
//!
//! let name: Option<String> =
//!     doc.query().get("DriverInfo").get("Drivers").find("CarIdx", 0).get("UserName").as_string();
//! assert_eq!(name.as_deref(), Some("Alice"));
//! assert!(!doc.query().get("DriverInfo").get("Drivers").find("CarIdx", 1).exists());
//! ```

use serde_yaml_ng::Value;
use std::fmt::Display;
use std::str::FromStr;

use crate::Result;
use crate::yaml_utils::preprocess_iracing_yaml;

/// Immutable session document for one polling instant
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDocument {
    root: Value,
    version: u32,
}

impl SessionDocument {
    /// Preprocess and parse raw session YAML
    pub fn parse(yaml: &str) -> Result<Self> {
        let cleaned = preprocess_iracing_yaml(yaml)?;
        let root = serde_yaml_ng::from_str(&cleaned)?;
        Ok(Self { root, version: 0 })
    }

    /// Wrap an already parsed tree
    pub fn from_value(root: Value) -> Self {
        Self { root, version: 0 }
    }

    /// Tag the document with the source's session info update counter
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Session info update counter this document was read at
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Start a query at the document root
    pub fn query(&self) -> Query<'_> {
        Query { node: Some(&self.root) }
    }
}

/// Cursor into a [`SessionDocument`]
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    node: Option<&'a Value>,
}

impl<'a> Query<'a> {
    /// Query that matches nothing
    pub fn missing() -> Self {
        Self { node: None }
    }

    /// Descend into a mapping key
    pub fn get(self, key: &str) -> Query<'a> {
        let node = self.node.and_then(|node| match node {
            Value::Mapping(map) => map.get(key),
            _ => None,
        });
        Query { node }
    }

    /// Select the first sequence element whose `key` field equals `value`
    ///
    /// Comparison is done on the scalar's string form, so `find("CarIdx", 3)`
    /// matches both `CarIdx: 3` and `CarIdx: "3"`.
    pub fn find(self, key: &str, value: impl Display) -> Query<'a> {
        let wanted = value.to_string();
        let node = self.node.and_then(|node| match node {
            Value::Sequence(items) => items.iter().find(|item| {
                Query { node: Some(*item) }.get(key).as_string().is_some_and(|v| v == wanted)
            }),
            _ => None,
        });
        Query { node }
    }

    /// Whether the path resolved to a non-null node
    pub fn exists(&self) -> bool {
        matches!(self.node, Some(node) if !node.is_null())
    }

    pub fn value(&self) -> Option<&'a Value> {
        self.node
    }

    /// Iterate the elements of a sequence node
    pub fn items(self) -> impl Iterator<Item = Query<'a>> {
        let items: &'a [Value] = match self.node {
            Some(Value::Sequence(items)) => items.as_slice(),
            _ => &[],
        };
        items.iter().map(|item| Query { node: Some(item) })
    }

    /// Scalar value as a string
    pub fn as_string(&self) -> Option<String> {
        match self.node? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Tagged(tagged) => Query { node: Some(&tagged.value) }.as_string(),
            _ => None,
        }
    }

    /// Parse the scalar value, `None` when absent or malformed
    pub fn try_get<T: FromStr>(&self) -> Option<T> {
        self.as_string().and_then(|s| s.trim().parse().ok())
    }
}
