//! Entity records of a [`crate::model::CodeModel`].
//!
//! Entities never embed pointers to each other. Every relation is an id that
//! is looked up in the owning model's arenas.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::body::BodyRepr;

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

entity_id!(TypeId);
entity_id!(MethodId);
entity_id!(FieldId);

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

static GENERIC_ARGS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<>]*>").unwrap());

/// Erase generic arguments and whitespace: `Map<String, List<T>>` -> `Map`.
pub fn erase_type_name(name: &str) -> String {
    let mut erased = name.trim().to_string();
    // Innermost first, until no angle brackets remain.
    while GENERIC_ARGS_RE.is_match(&erased) {
        erased = GENERIC_ARGS_RE.replace_all(&erased, "").into_owned();
    }
    erased.split_whitespace().collect()
}

/// Last dotted segment of a qualified name.
pub fn simple_name(qualified_name: &str) -> &str {
    qualified_name
        .rsplit_once('.')
        .map_or(qualified_name, |(_, tail)| tail)
}

/// Normalized method signature key. Constructors carry an empty name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodKey {
    pub declaring_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parameter_types: Vec<String>,
}

impl MethodKey {
    pub fn new(declaring_type: &str, name: &str, parameter_types: &[&str]) -> Self {
        Self {
            declaring_type: declaring_type.to_string(),
            name: name.to_string(),
            parameter_types: parameter_types.iter().map(|t| erase_type_name(t)).collect(),
        }
    }

    /// Signature without the declaring type, e.g. `foo(int,String)`.
    pub fn local_signature(&self) -> String {
        format!("{}({})", self.name, self.parameter_types.join(","))
    }

    /// Same key re-homed on another declaring type.
    pub fn in_type(&self, declaring_type: &str) -> MethodKey {
        MethodKey {
            declaring_type: declaring_type.to_string(),
            name: self.name.clone(),
            parameter_types: self.parameter_types.clone(),
        }
    }

    pub(crate) fn erased(mut self) -> Self {
        self.parameter_types = self.parameter_types.iter().map(|t| erase_type_name(t)).collect();
        self
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.declaring_type, self.local_signature())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldKey {
    pub declaring_type: String,
    pub name: String,
}

impl FieldKey {
    pub fn new(declaring_type: &str, name: &str) -> Self {
        Self {
            declaring_type: declaring_type.to_string(),
            name: name.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone)]
pub struct TypeEntity {
    pub id: TypeId,
    pub qualified_name: String,
    pub kind: TypeKind,
    pub package: String,
    pub file_path: Option<String>,
    pub superclass: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub enclosing: Option<TypeId>,
    pub nested: Vec<TypeId>,
    pub is_test_code: bool,
    pub is_deprecated: bool,
    pub methods: Vec<MethodId>,
    pub fields: Vec<FieldId>,
}

impl TypeEntity {
    pub fn simple_name(&self) -> &str {
        simple_name(&self.qualified_name)
    }

    /// Direct supertypes: superclass first, then interfaces in declared order.
    pub fn supertypes(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.superclass.iter().copied().chain(self.interfaces.iter().copied())
    }
}

#[derive(Debug, Clone)]
pub struct MethodEntity {
    pub id: MethodId,
    pub declaring_type: TypeId,
    pub key: MethodKey,
    /// Source name; for constructors the declaring type's simple name.
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub statement_count: usize,
    pub body: BodyRepr,
    pub is_test_code: bool,
    pub is_deprecated: bool,
    pub is_abstract: bool,
    pub is_overridden: bool,
    pub is_recursive: bool,
    /// Resolved callees, deduplicated, in discovery order.
    pub calls: Vec<MethodId>,
    /// Reverse of `calls`, in method id order.
    pub callers: Vec<MethodId>,
}

impl MethodEntity {
    pub fn is_constructor(&self) -> bool {
        self.key.name.is_empty()
    }

    /// `name(T1, T2)`.
    pub fn verbose_name(&self) -> String {
        format!("{}({})", self.name, self.key.parameter_types.join(", "))
    }

    pub fn arity(&self) -> usize {
        self.key.parameter_types.len()
    }

    pub fn is_getter(&self) -> bool {
        let prefixed = is_accessor_name(&self.name, "get") || is_accessor_name(&self.name, "is");
        prefixed && self.parameters.is_empty() && self.statement_count <= 1
    }

    pub fn is_setter(&self) -> bool {
        is_accessor_name(&self.name, "set")
            && self.parameters.len() == 1
            && self.statement_count <= 1
    }

    pub fn calls_method(&self, target: MethodId) -> bool {
        self.calls.contains(&target)
    }
}

fn is_accessor_name(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_uppercase())
}

#[derive(Debug, Clone)]
pub struct FieldEntity {
    pub id: FieldId,
    pub declaring_type: TypeId,
    pub key: FieldKey,
    pub type_name: String,
}

impl FieldEntity {
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// `name : Type`.
    pub fn verbose_name(&self) -> String {
        format!("{} : {}", self.key.name, self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erase_type_name() {
        assert_eq!(erase_type_name("List<String>"), "List");
        assert_eq!(erase_type_name("Map<String, List<Integer>>"), "Map");
        assert_eq!(erase_type_name(" int[] "), "int[]");
        assert_eq!(erase_type_name("Set<T>[]"), "Set[]");
    }

    #[test]
    fn test_simple_name() {
        assert_eq!(simple_name("pkg.sub.Foo"), "Foo");
        assert_eq!(simple_name("Foo"), "Foo");
    }

    #[test]
    fn test_method_key_local_signature() {
        let key = MethodKey::new("pkg.Foo", "bar", &["int", "List<String>"]);
        assert_eq!(key.local_signature(), "bar(int,List)");
        assert_eq!(key.to_string(), "pkg.Foo#bar(int,List)");
        assert_eq!(key.in_type("pkg.Baz").declaring_type, "pkg.Baz");
    }

    #[test]
    fn test_accessor_names() {
        assert!(is_accessor_name("getName", "get"));
        assert!(is_accessor_name("isEmpty", "is"));
        assert!(!is_accessor_name("get", "get"));
        assert!(!is_accessor_name("getaway", "get"));
        assert!(!is_accessor_name("issue", "is"));
    }
}
