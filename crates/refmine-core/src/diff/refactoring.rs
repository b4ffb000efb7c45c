//! Closed refactoring taxonomy and its canonical descriptions.
//!
//! A [`Refactoring`] holds ids into the two models of one detection call; the
//! owned [`RefactoringRecord`] is what leaves the pipeline.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diff::motivation::MotivationTag;
use crate::model::entities::{FieldId, MethodId, TypeId, TypeKind};
use crate::model::CodeModel;

// ---------------------------------------------------------------------------
// RefactoringType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RefactoringType {
    #[serde(rename = "Rename Class")]
    RenameClass,
    #[serde(rename = "Move Class")]
    MoveClass,
    #[serde(rename = "Move And Rename Class")]
    MoveAndRenameClass,
    #[serde(rename = "Extract Superclass")]
    ExtractSuperclass,
    #[serde(rename = "Extract Interface")]
    ExtractInterface,
    #[serde(rename = "Rename Method")]
    RenameMethod,
    #[serde(rename = "Move Method")]
    MoveMethod,
    #[serde(rename = "Pull Up Method")]
    PullUpMethod,
    #[serde(rename = "Push Down Method")]
    PushDownMethod,
    #[serde(rename = "Extract Method")]
    ExtractMethod,
    #[serde(rename = "Inline Method")]
    InlineMethod,
    #[serde(rename = "Move Attribute")]
    MoveAttribute,
    #[serde(rename = "Pull Up Attribute")]
    PullUpAttribute,
    #[serde(rename = "Push Down Attribute")]
    PushDownAttribute,
}

impl RefactoringType {
    pub const ALL: [RefactoringType; 14] = [
        RefactoringType::RenameClass,
        RefactoringType::MoveClass,
        RefactoringType::MoveAndRenameClass,
        RefactoringType::ExtractSuperclass,
        RefactoringType::ExtractInterface,
        RefactoringType::RenameMethod,
        RefactoringType::MoveMethod,
        RefactoringType::PullUpMethod,
        RefactoringType::PushDownMethod,
        RefactoringType::ExtractMethod,
        RefactoringType::InlineMethod,
        RefactoringType::MoveAttribute,
        RefactoringType::PullUpAttribute,
        RefactoringType::PushDownAttribute,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            RefactoringType::RenameClass => "Rename Class",
            RefactoringType::MoveClass => "Move Class",
            RefactoringType::MoveAndRenameClass => "Move And Rename Class",
            RefactoringType::ExtractSuperclass => "Extract Superclass",
            RefactoringType::ExtractInterface => "Extract Interface",
            RefactoringType::RenameMethod => "Rename Method",
            RefactoringType::MoveMethod => "Move Method",
            RefactoringType::PullUpMethod => "Pull Up Method",
            RefactoringType::PushDownMethod => "Push Down Method",
            RefactoringType::ExtractMethod => "Extract Method",
            RefactoringType::InlineMethod => "Inline Method",
            RefactoringType::MoveAttribute => "Move Attribute",
            RefactoringType::PullUpAttribute => "Pull Up Attribute",
            RefactoringType::PushDownAttribute => "Push Down Attribute",
        }
    }

    /// Inverse of [`RefactoringType::display_name`].
    pub fn from_display_name(name: &str) -> Option<RefactoringType> {
        Self::ALL.into_iter().find(|t| t.display_name() == name)
    }
}

impl fmt::Display for RefactoringType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// Refactoring
// ---------------------------------------------------------------------------

/// One detected refactoring. `before*`/`origin`/`inlined`/`from` ids point
/// into the before model, `after*`/`extracted`/`dest` ids into the after
/// model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refactoring {
    RenameClass { before: TypeId, after: TypeId },
    MoveClass { before: TypeId, after: TypeId },
    MoveAndRenameClass { before: TypeId, after: TypeId },
    ExtractSuperType { extracted: TypeId, origin_after: TypeId, kind: TypeKind },
    RenameMethod { before: MethodId, after: MethodId },
    MoveMethod { before: MethodId, after: MethodId },
    PullUpMethod { before: MethodId, after: MethodId },
    PushDownMethod { before: MethodId, after: MethodId },
    /// `from` lists every before-side origin that supplied code to
    /// `extracted`; `origin` is the one chosen for reporting.
    ExtractMethod { extracted: MethodId, origin: MethodId, from: Vec<MethodId> },
    InlineMethod { inlined: MethodId, dest: MethodId },
    MoveAttribute { before: FieldId, after: FieldId },
    PullUpAttribute { before: FieldId, after: FieldId },
    PushDownAttribute { before: FieldId, after: FieldId },
}

impl Refactoring {
    pub fn refactoring_type(&self) -> RefactoringType {
        match self {
            Refactoring::RenameClass { .. } => RefactoringType::RenameClass,
            Refactoring::MoveClass { .. } => RefactoringType::MoveClass,
            Refactoring::MoveAndRenameClass { .. } => RefactoringType::MoveAndRenameClass,
            Refactoring::ExtractSuperType { kind: TypeKind::Interface, .. } => {
                RefactoringType::ExtractInterface
            }
            Refactoring::ExtractSuperType { kind: TypeKind::Class, .. } => {
                RefactoringType::ExtractSuperclass
            }
            Refactoring::RenameMethod { .. } => RefactoringType::RenameMethod,
            Refactoring::MoveMethod { .. } => RefactoringType::MoveMethod,
            Refactoring::PullUpMethod { .. } => RefactoringType::PullUpMethod,
            Refactoring::PushDownMethod { .. } => RefactoringType::PushDownMethod,
            Refactoring::ExtractMethod { .. } => RefactoringType::ExtractMethod,
            Refactoring::InlineMethod { .. } => RefactoringType::InlineMethod,
            Refactoring::MoveAttribute { .. } => RefactoringType::MoveAttribute,
            Refactoring::PullUpAttribute { .. } => RefactoringType::PullUpAttribute,
            Refactoring::PushDownAttribute { .. } => RefactoringType::PushDownAttribute,
        }
    }

    /// Canonical human-readable description. Downstream consumers parse these
    /// strings, so the formats are fixed.
    pub fn description(&self, before: &CodeModel, after: &CodeModel) -> String {
        let name = self.refactoring_type().display_name();
        match *self {
            Refactoring::RenameClass { before: b, after: a } => format!(
                "{name} {} renamed to {}",
                before.type_entity(b).qualified_name,
                after.type_entity(a).qualified_name
            ),
            Refactoring::MoveClass { before: b, after: a } => format!(
                "{name} {} moved to {}",
                before.type_entity(b).qualified_name,
                after.type_entity(a).qualified_name
            ),
            Refactoring::MoveAndRenameClass { before: b, after: a } => format!(
                "{name} {} moved and renamed to {}",
                before.type_entity(b).qualified_name,
                after.type_entity(a).qualified_name
            ),
            Refactoring::ExtractSuperType { extracted, origin_after, .. } => format!(
                "{name} {} from class {}",
                after.type_entity(extracted).qualified_name,
                after.type_entity(origin_after).qualified_name
            ),
            Refactoring::RenameMethod { before: b, after: a } => format!(
                "{name} {} renamed to {} in class {}",
                before.method(b).verbose_name(),
                after.method(a).verbose_name(),
                after.method_container(a)
            ),
            Refactoring::MoveMethod { before: b, after: a }
            | Refactoring::PullUpMethod { before: b, after: a }
            | Refactoring::PushDownMethod { before: b, after: a } => format!(
                "{name} {} from class {} to {} from class {}",
                before.method(b).verbose_name(),
                before.method_container(b),
                after.method(a).verbose_name(),
                after.method_container(a)
            ),
            Refactoring::ExtractMethod { extracted, origin, .. } => format!(
                "{name} {} extracted from {} in class {}",
                after.method(extracted).verbose_name(),
                before.method(origin).verbose_name(),
                before.method_container(origin)
            ),
            Refactoring::InlineMethod { inlined, dest } => format!(
                "{name} {} inlined to {} in class {}",
                before.method(inlined).verbose_name(),
                after.method(dest).verbose_name(),
                after.method_container(dest)
            ),
            Refactoring::MoveAttribute { before: b, after: a } => format!(
                "{name} {} from class {} to {} from class {}",
                before.field(b).verbose_name(),
                before.field_container(b),
                after.field(a).verbose_name(),
                after.field_container(a)
            ),
            Refactoring::PullUpAttribute { before: b, after: a }
            | Refactoring::PushDownAttribute { before: b, after: a } => format!(
                "{name} {} from class {} to class {}",
                after.field(a).verbose_name(),
                before.field_container(b),
                after.field_container(a)
            ),
        }
    }

    /// Entity names on each side, in the `pkg.Type#member(T1, T2)` form used
    /// by oracle files.
    pub fn entities(&self, before: &CodeModel, after: &CodeModel) -> (String, String) {
        match *self {
            Refactoring::RenameClass { before: b, after: a }
            | Refactoring::MoveClass { before: b, after: a }
            | Refactoring::MoveAndRenameClass { before: b, after: a } => (
                before.type_entity(b).qualified_name.clone(),
                after.type_entity(a).qualified_name.clone(),
            ),
            Refactoring::ExtractSuperType { extracted, origin_after, .. } => (
                after.type_entity(origin_after).qualified_name.clone(),
                after.type_entity(extracted).qualified_name.clone(),
            ),
            Refactoring::RenameMethod { before: b, after: a }
            | Refactoring::MoveMethod { before: b, after: a }
            | Refactoring::PullUpMethod { before: b, after: a }
            | Refactoring::PushDownMethod { before: b, after: a } => {
                (before.method_full_name(b), after.method_full_name(a))
            }
            Refactoring::ExtractMethod { extracted, origin, .. } => {
                (before.method_full_name(origin), after.method_full_name(extracted))
            }
            Refactoring::InlineMethod { inlined, dest } => {
                (before.method_full_name(inlined), after.method_full_name(dest))
            }
            Refactoring::MoveAttribute { before: b, after: a }
            | Refactoring::PullUpAttribute { before: b, after: a }
            | Refactoring::PushDownAttribute { before: b, after: a } => {
                (before.field_full_name(b), after.field_full_name(a))
            }
        }
    }

    /// Owned, model-independent form.
    pub fn to_record(
        &self,
        before: &CodeModel,
        after: &CodeModel,
        motivations: &BTreeSet<MotivationTag>,
    ) -> RefactoringRecord {
        let (entity_before, entity_after) = self.entities(before, after);
        RefactoringRecord {
            refactoring_type: self.refactoring_type(),
            description: self.description(before, after),
            entity_before,
            entity_after,
            motivations: motivations.iter().copied().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// RefactoringRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RefactoringRecord {
    #[serde(rename = "type")]
    pub refactoring_type: RefactoringType,
    pub description: String,
    pub entity_before: String,
    pub entity_after: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub motivations: Vec<MotivationTag>,
}

impl fmt::Display for RefactoringRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::draft::{MethodSpec, ModelDraft, TypeSpec};
    use crate::model::entities::{FieldKey, MethodKey};

    fn models() -> (CodeModel, CodeModel) {
        let before = ModelDraft::new()
            .with_type(
                TypeSpec::class("pkg1.A")
                    .method(MethodSpec::new("run").param("n", "int"))
                    .field("size", "int"),
            )
            .with_type(TypeSpec::class("pkg1.Base"))
            .freeze()
            .unwrap();
        let after = ModelDraft::new()
            .with_type(
                TypeSpec::class("pkg2.B")
                    .extends("pkg2.Base")
                    .method(MethodSpec::new("execute").param("n", "int"))
                    .method(MethodSpec::new("helper").param("n", "int").param("s", "String")),
            )
            .with_type(TypeSpec::interface("pkg2.Base").field("size", "int"))
            .freeze()
            .unwrap();
        (before, after)
    }

    #[test]
    fn test_display_names_round_trip() {
        for t in RefactoringType::ALL {
            assert_eq!(RefactoringType::from_display_name(t.display_name()), Some(t));
        }
        assert_eq!(RefactoringType::from_display_name("Rename Package"), None);
    }

    #[test]
    fn test_type_descriptions() {
        let (before, after) = models();
        let a = before.type_by_name("pkg1.A").unwrap();
        let b = after.type_by_name("pkg2.B").unwrap();
        let rename = Refactoring::RenameClass { before: a, after: b };
        assert_eq!(rename.description(&before, &after), "Rename Class pkg1.A renamed to pkg2.B");
        let moved = Refactoring::MoveClass { before: a, after: b };
        assert_eq!(moved.description(&before, &after), "Move Class pkg1.A moved to pkg2.B");
        let both = Refactoring::MoveAndRenameClass { before: a, after: b };
        assert_eq!(
            both.description(&before, &after),
            "Move And Rename Class pkg1.A moved and renamed to pkg2.B"
        );
    }

    #[test]
    fn test_extract_supertype_kind() {
        let (before, after) = models();
        let base = after.type_by_name("pkg2.Base").unwrap();
        let b = after.type_by_name("pkg2.B").unwrap();
        let r = Refactoring::ExtractSuperType {
            extracted: base,
            origin_after: b,
            kind: after.type_entity(base).kind,
        };
        assert_eq!(r.refactoring_type(), RefactoringType::ExtractInterface);
        assert_eq!(r.description(&before, &after), "Extract Interface pkg2.Base from class pkg2.B");
    }

    #[test]
    fn test_method_descriptions() {
        let (before, after) = models();
        let run = before.method_by_key(&MethodKey::new("pkg1.A", "run", &["int"])).unwrap();
        let execute = after
            .method_by_key(&MethodKey::new("pkg2.B", "execute", &["int"]))
            .unwrap();
        let helper = after
            .method_by_key(&MethodKey::new("pkg2.B", "helper", &["int", "String"]))
            .unwrap();

        let moved = Refactoring::MoveMethod { before: run, after: execute };
        assert_eq!(
            moved.description(&before, &after),
            "Move Method run(int) from class pkg1.A to execute(int) from class pkg2.B"
        );
        let renamed = Refactoring::RenameMethod { before: run, after: execute };
        assert_eq!(
            renamed.description(&before, &after),
            "Rename Method run(int) renamed to execute(int) in class pkg2.B"
        );
        let extracted = Refactoring::ExtractMethod { extracted: helper, origin: run, from: vec![run] };
        assert_eq!(
            extracted.description(&before, &after),
            "Extract Method helper(int, String) extracted from run(int) in class pkg1.A"
        );
        let inlined = Refactoring::InlineMethod { inlined: run, dest: execute };
        assert_eq!(
            inlined.description(&before, &after),
            "Inline Method run(int) inlined to execute(int) in class pkg2.B"
        );
    }

    #[test]
    fn test_attribute_descriptions_and_record() {
        let (before, after) = models();
        let size_before = before.field_by_key(&FieldKey::new("pkg1.A", "size")).unwrap();
        let size_after = after.field_by_key(&FieldKey::new("pkg2.Base", "size")).unwrap();
        let pulled = Refactoring::PullUpAttribute { before: size_before, after: size_after };
        assert_eq!(
            pulled.description(&before, &after),
            "Pull Up Attribute size : int from class pkg1.A to class pkg2.Base"
        );
        let moved = Refactoring::MoveAttribute { before: size_before, after: size_after };
        assert_eq!(
            moved.description(&before, &after),
            "Move Attribute size : int from class pkg1.A to size : int from class pkg2.Base"
        );

        let record = pulled.to_record(&before, &after, &BTreeSet::new());
        assert_eq!(record.entity_before, "pkg1.A#size");
        assert_eq!(record.entity_after, "pkg2.Base#size");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "Pull Up Attribute");
        assert!(json.get("motivations").is_none());
    }
}
