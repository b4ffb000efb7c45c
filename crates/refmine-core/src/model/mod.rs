//! Code Model: the immutable structural snapshot of one revision.
//!
//! Entities live in arenas addressed by typed ids; every relation
//! (containment, inheritance, calls) is a relational lookup through the model.

pub mod body;
pub mod draft;
pub mod entities;

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::errors::RefMineResult;
use crate::model::draft::{transitive, ModelDraft, ModelSpec};
use crate::model::entities::{
    FieldEntity, FieldId, FieldKey, MethodEntity, MethodId, MethodKey, TypeEntity, TypeId,
};

#[derive(Debug, Clone, Default)]
pub struct CodeModel {
    types: Vec<TypeEntity>,
    methods: Vec<MethodEntity>,
    fields: Vec<FieldEntity>,
    type_index: IndexMap<String, TypeId>,
    method_index: IndexMap<MethodKey, MethodId>,
    field_index: IndexMap<FieldKey, FieldId>,
    subtypes: Vec<Vec<TypeId>>,
}

impl CodeModel {
    /// Build a model from the JSON interchange form of [`ModelSpec`].
    pub fn from_json(text: &str) -> RefMineResult<CodeModel> {
        let spec: ModelSpec = serde_json::from_str(text)?;
        Self::from_spec(spec)
    }

    pub fn from_spec(spec: ModelSpec) -> RefMineResult<CodeModel> {
        ModelDraft::from_spec(spec).freeze()
    }

    // -- arenas -------------------------------------------------------------

    pub fn type_entity(&self, id: TypeId) -> &TypeEntity {
        &self.types[id.index()]
    }

    pub fn method(&self, id: MethodId) -> &MethodEntity {
        &self.methods[id.index()]
    }

    pub fn field(&self, id: FieldId) -> &FieldEntity {
        &self.fields[id.index()]
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeEntity> {
        self.types.iter()
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodEntity> {
        self.methods.iter()
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldEntity> {
        self.fields.iter()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    // -- key lookups --------------------------------------------------------

    pub fn type_by_name(&self, qualified_name: &str) -> Option<TypeId> {
        self.type_index.get(qualified_name).copied()
    }

    pub fn method_by_key(&self, key: &MethodKey) -> Option<MethodId> {
        self.method_index.get(key).copied()
    }

    pub fn field_by_key(&self, key: &FieldKey) -> Option<FieldId> {
        self.field_index.get(key).copied()
    }

    /// Types declared in `path`, in model order.
    pub fn types_in_file(&self, path: &str) -> Vec<TypeId> {
        self.types
            .iter()
            .filter(|t| t.file_path.as_deref() == Some(path))
            .map(|t| t.id)
            .collect()
    }

    // -- hierarchy ----------------------------------------------------------

    pub fn direct_subtypes(&self, id: TypeId) -> &[TypeId] {
        &self.subtypes[id.index()]
    }

    /// Strict, transitive subtype test over superclass and interface edges.
    pub fn is_subtype_of(&self, sub: TypeId, sup: TypeId) -> bool {
        if sub == sup {
            return false;
        }
        transitive(&self.subtypes, sup).contains(&sub)
    }

    // -- naming -------------------------------------------------------------

    /// Enclosing type's qualified name for nested types, else the package.
    pub fn type_container(&self, id: TypeId) -> &str {
        let t = self.type_entity(id);
        match t.enclosing {
            Some(outer) => &self.type_entity(outer).qualified_name,
            None => &t.package,
        }
    }

    pub fn method_container(&self, id: MethodId) -> &str {
        &self.type_entity(self.method(id).declaring_type).qualified_name
    }

    pub fn field_container(&self, id: FieldId) -> &str {
        &self.type_entity(self.field(id).declaring_type).qualified_name
    }

    /// `pkg.Type#name(T1, T2)`.
    pub fn method_full_name(&self, id: MethodId) -> String {
        format!("{}#{}", self.method_container(id), self.method(id).verbose_name())
    }

    /// `pkg.Type#name`.
    pub fn field_full_name(&self, id: FieldId) -> String {
        format!("{}#{}", self.field_container(id), self.field(id).name())
    }

    /// Member-local signatures of a type: `name(T1,T2)` per method, the bare
    /// name per field.
    pub fn member_signatures(&self, id: TypeId) -> BTreeSet<String> {
        let t = self.type_entity(id);
        let methods = t.methods.iter().map(|&m| self.method(m).key.local_signature());
        let fields = t.fields.iter().map(|&f| self.field(f).name().to_string());
        methods.chain(fields).collect()
    }
}
