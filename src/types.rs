//! Core scalar types shared across the engine: node/edge kinds, positions,
//! and the content-addressed node identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable content-addressed identifier: `"<kind>:<hash32>"`.
///
/// The hash is a blake3 digest of `(filePath, kind, name, startLine)`,
/// hex-truncated to 32 characters (128 bits) — enough collision resistance
/// for a single project's graph while keeping IDs compact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(kind: NodeKind, file_path: &str, name: &str, start_line: u32) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(file_path.as_bytes());
        hasher.update(b"\0");
        hasher.update(kind.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(name.as_bytes());
        hasher.update(b"\0");
        hasher.update(&start_line.to_le_bytes());
        let digest = hasher.finalize().to_hex();
        NodeId(format!("{}:{}", kind.as_str(), &digest[..32]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            pub fn from_str_opt(s: &str) -> Option<Self> {
                match s {
                    $($s => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub const ALL: &'static [$name] = &[$(Self::$variant),+];
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::IndexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_str_opt(s).ok_or_else(|| crate::error::IndexError::General(
                    format!("unknown {} value: {s}", stringify!($name))
                ))
            }
        }
    };
}

string_enum!(NodeKind {
    File => "file",
    Function => "function",
    Method => "method",
    Class => "class",
    Interface => "interface",
    Trait => "trait",
    Protocol => "protocol",
    Struct => "struct",
    Enum => "enum",
    EnumMember => "enum_member",
    TypeAlias => "type_alias",
    Property => "property",
    Field => "field",
    Variable => "variable",
    Constant => "constant",
    Parameter => "parameter",
    Module => "module",
    Namespace => "namespace",
    Component => "component",
    Route => "route",
    Import => "import",
    Export => "export",
});

string_enum!(EdgeKind {
    Contains => "contains",
    Calls => "calls",
    Imports => "imports",
    References => "references",
    Extends => "extends",
    Implements => "implements",
    ReturnsType => "returns_type",
    Renders => "renders",
    TypeOf => "type_of",
});

string_enum!(Visibility {
    Public => "public",
    Private => "private",
    Protected => "protected",
    Internal => "internal",
});

/// Edge kinds that signal "depends on", used by impact-radius traversal.
pub fn is_dependency_edge(kind: EdgeKind) -> bool {
    matches!(
        kind,
        EdgeKind::Calls
            | EdgeKind::References
            | EdgeKind::Imports
            | EdgeKind::Extends
            | EdgeKind::Implements
    )
}

/// Half-open-at-end source position. Lines are 1-based; columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Range {
    pub fn point(line: u32, column: u32) -> Self {
        Range { start_line: line, start_column: column, end_line: line, end_column: column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_stable_under_unchanged_inputs() {
        let a = NodeId::new(NodeKind::Function, "src/a.rs", "hello", 10);
        let b = NodeId::new(NodeKind::Function, "src/a.rs", "hello", 10);
        assert_eq!(a, b);
    }

    #[test]
    fn node_id_changes_with_start_line() {
        let a = NodeId::new(NodeKind::Function, "src/a.rs", "hello", 10);
        let b = NodeId::new(NodeKind::Function, "src/a.rs", "hello", 11);
        assert_ne!(a, b);
    }

    #[test]
    fn node_id_prefixed_by_kind() {
        let id = NodeId::new(NodeKind::Struct, "src/a.rs", "Foo", 1);
        assert!(id.as_str().starts_with("struct:"));
        assert_eq!(id.as_str().len(), "struct:".len() + 32);
    }

    #[test]
    fn edge_kind_round_trips_through_str() {
        for kind in EdgeKind::ALL {
            let s = kind.as_str();
            assert_eq!(EdgeKind::from_str_opt(s), Some(*kind));
        }
    }

    #[test]
    fn dependency_edges_exclude_contains_and_structural_kinds() {
        assert!(is_dependency_edge(EdgeKind::Calls));
        assert!(!is_dependency_edge(EdgeKind::Contains));
        assert!(!is_dependency_edge(EdgeKind::Renders));
    }
}
