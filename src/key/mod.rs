//! Entity keys and key literals
//!
//! A key addresses one entity: an optional namespace plus a path of
//! `(kind, id)` elements. The terminal element names the entity itself;
//! earlier elements are ancestors.
//!
//! Filters on the identity field are rewritten into a [`KeyLiteral`], which
//! renders as `KEY(<kind>, <id>)` in GQL.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Logical field callers filter on to address one entity by key
pub const IDENTITY_FIELD: &str = "id";

/// Reserved field the store uses for key comparisons
pub const KEY_FIELD: &str = "__key__";

/// Identifier of a single path element
///
/// Numeric ids order before names, matching the store's natural key order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyId {
    /// Store-allocated numeric id
    Id(i64),
    /// Caller-chosen name
    Name(String),
}

impl KeyId {
    /// Derive a key id from a filter value.
    ///
    /// Integers and integer-looking strings become numeric ids; any other
    /// string becomes a name. Remaining JSON values use their JSON text.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(id) => KeyId::Id(id),
                None => KeyId::Name(n.to_string()),
            },
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(id) => KeyId::Id(id),
                Err(_) => KeyId::Name(s.clone()),
            },
            other => KeyId::Name(other.to_string()),
        }
    }

    /// Returns the numeric id, if any
    pub fn as_id(&self) -> Option<i64> {
        match self {
            KeyId::Id(id) => Some(*id),
            KeyId::Name(_) => None,
        }
    }

    /// Returns the name, if any
    pub fn as_name(&self) -> Option<&str> {
        match self {
            KeyId::Id(_) => None,
            KeyId::Name(name) => Some(name),
        }
    }

    /// JSON form of the id, used when the id is handed back to callers
    pub fn to_value(&self) -> Value {
        match self {
            KeyId::Id(id) => Value::from(*id),
            KeyId::Name(name) => Value::String(name.clone()),
        }
    }
}

impl fmt::Display for KeyId {
    /// GQL form: numeric ids verbatim, names single-quoted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyId::Id(id) => write!(f, "{}", id),
            KeyId::Name(name) => write!(
                f,
                "'{}'",
                name.replace('\\', "\\\\").replace('\'', "''")
            ),
        }
    }
}

impl From<i64> for KeyId {
    fn from(id: i64) -> Self {
        KeyId::Id(id)
    }
}

impl From<&str> for KeyId {
    fn from(name: &str) -> Self {
        KeyId::Name(name.to_string())
    }
}

impl From<String> for KeyId {
    fn from(name: String) -> Self {
        KeyId::Name(name)
    }
}

/// One `(kind, id)` element of a key path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathElement {
    pub kind: String,
    /// None until the store allocates an id
    pub id: Option<KeyId>,
}

/// Store address of an entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawKey")]
pub struct Key {
    /// Partition the entity lives in
    pub namespace: Option<String>,
    /// Ancestors first, entity last. Never empty.
    path: Vec<PathElement>,
}

impl Key {
    /// Creates a key with no id yet (the store fills it in on allocation)
    pub fn incomplete(kind: impl Into<String>) -> Self {
        Self {
            namespace: None,
            path: vec![PathElement {
                kind: kind.into(),
                id: None,
            }],
        }
    }

    /// Creates a complete single-element key
    pub fn new(kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        Self {
            namespace: None,
            path: vec![PathElement {
                kind: kind.into(),
                id: Some(id.into()),
            }],
        }
    }

    /// Sets the namespace
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    /// Prepends an ancestor element
    pub fn with_ancestor(mut self, kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        self.path.insert(
            0,
            PathElement {
                kind: kind.into(),
                id: Some(id.into()),
            },
        );
        self
    }

    /// Returns the full path, ancestors first
    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    /// Returns the terminal path element
    pub fn path_end(&self) -> &PathElement {
        // path is constructed non-empty and never shrinks
        &self.path[self.path.len() - 1]
    }

    /// Kind of the addressed entity
    pub fn kind(&self) -> &str {
        &self.path_end().kind
    }

    /// Id of the addressed entity, None while incomplete
    pub fn id(&self) -> Option<&KeyId> {
        self.path_end().id.as_ref()
    }

    /// Returns true if the terminal element has no id yet
    pub fn is_incomplete(&self) -> bool {
        self.path_end().id.is_none()
    }

    /// Returns a copy of this key with the terminal id set
    pub fn with_id(&self, id: KeyId) -> Self {
        let mut key = self.clone();
        let last = key.path.len() - 1;
        key.path[last].id = Some(id);
        key
    }
}

/// Wire form of a key, checked before it becomes a [`Key`]
#[derive(Deserialize)]
struct RawKey {
    #[serde(default)]
    namespace: Option<String>,
    path: Vec<PathElement>,
}

impl TryFrom<RawKey> for Key {
    type Error = String;

    fn try_from(raw: RawKey) -> Result<Self, Self::Error> {
        if raw.path.is_empty() {
            return Err("key path must not be empty".to_string());
        }
        Ok(Self {
            namespace: raw.namespace,
            path: raw.path,
        })
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            match &element.id {
                Some(id) => write!(f, "{}:{}", element.kind, id)?,
                None => write!(f, "{}:?", element.kind)?,
            }
        }
        Ok(())
    }
}

/// A `(kind, id)` pair rendered as `KEY(<kind>, <id>)` inside a GQL filter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyLiteral {
    pub kind: String,
    pub id: KeyId,
}

impl KeyLiteral {
    pub fn new(kind: impl Into<String>, id: KeyId) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }

    /// Returns true if this literal addresses the given key's terminal element
    pub fn addresses(&self, key: &Key) -> bool {
        key.kind() == self.kind && key.id() == Some(&self.id)
    }
}

impl fmt::Display for KeyLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KEY({}, {})", self.kind, self.id)
    }
}
