//! Model assembly from builder-supplied specs.
//!
//! The external model builder hands over plain serde records ([`ModelSpec`]).
//! [`ModelDraft::freeze`] validates key uniqueness, resolves references into
//! ids and computes the derived facts (callers, subtypes, `is_recursive`,
//! `is_overridden`) exactly once.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{RefMineError, RefMineResult};
use crate::model::body::BodyRepr;
use crate::model::entities::{
    erase_type_name, simple_name, FieldEntity, FieldId, FieldKey, MethodEntity, MethodId,
    MethodKey, Parameter, TypeEntity, TypeId, TypeKind,
};
use crate::model::CodeModel;

// ---------------------------------------------------------------------------
// Specs (interchange format)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSpec {
    pub types: Vec<TypeSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeSpec {
    pub qualified_name: String,
    pub kind: TypeKind,
    /// Derived from the qualified name (or the outermost enclosing type) when absent.
    pub package: Option<String>,
    pub file_path: Option<String>,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub enclosing: Option<String>,
    pub is_test_code: bool,
    pub is_deprecated: bool,
    pub methods: Vec<MethodSpec>,
    pub fields: Vec<FieldSpec>,
}

impl TypeSpec {
    pub fn class(qualified_name: &str) -> Self {
        Self {
            qualified_name: qualified_name.to_string(),
            ..Self::default()
        }
    }

    pub fn interface(qualified_name: &str) -> Self {
        Self {
            qualified_name: qualified_name.to_string(),
            kind: TypeKind::Interface,
            ..Self::default()
        }
    }

    pub fn in_file(mut self, path: &str) -> Self {
        self.file_path = Some(path.to_string());
        self
    }

    pub fn extends(mut self, superclass: &str) -> Self {
        self.superclass = Some(superclass.to_string());
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    pub fn nested_in(mut self, enclosing: &str) -> Self {
        self.enclosing = Some(enclosing.to_string());
        self
    }

    pub fn test_code(mut self) -> Self {
        self.is_test_code = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.is_deprecated = true;
        self
    }

    pub fn method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }

    pub fn field(mut self, name: &str, type_name: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            type_name: type_name.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodSpec {
    pub name: String,
    pub is_constructor: bool,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub body: Vec<String>,
    /// Overrides the count derived from `body`.
    pub statement_count: Option<usize>,
    pub calls: Vec<MethodKey>,
    pub is_abstract: bool,
    pub is_deprecated: bool,
    /// Inherits the declaring type's flag when absent.
    pub is_test_code: Option<bool>,
}

impl MethodSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn constructor() -> Self {
        Self {
            is_constructor: true,
            ..Self::default()
        }
    }

    pub fn param(mut self, name: &str, type_name: &str) -> Self {
        self.parameters.push(Parameter {
            name: name.to_string(),
            type_name: type_name.to_string(),
        });
        self
    }

    pub fn returns(mut self, type_name: &str) -> Self {
        self.return_type = Some(type_name.to_string());
        self
    }

    pub fn body<I, S>(mut self, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body = statements.into_iter().map(Into::into).collect();
        self
    }

    pub fn call(mut self, declaring_type: &str, name: &str, parameter_types: &[&str]) -> Self {
        self.calls.push(MethodKey::new(declaring_type, name, parameter_types));
        self
    }

    pub fn abstract_method(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.is_deprecated = true;
        self
    }

    pub fn test_code(mut self, is_test_code: bool) -> Self {
        self.is_test_code = Some(is_test_code);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

// ---------------------------------------------------------------------------
// ModelDraft
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ModelDraft {
    types: Vec<TypeSpec>,
}

impl ModelDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_spec(spec: ModelSpec) -> Self {
        Self { types: spec.types }
    }

    pub fn add_type(&mut self, spec: TypeSpec) -> &mut Self {
        self.types.push(spec);
        self
    }

    pub fn with_type(mut self, spec: TypeSpec) -> Self {
        self.types.push(spec);
        self
    }

    /// Validate and resolve into an immutable [`CodeModel`].
    pub fn freeze(self) -> RefMineResult<CodeModel> {
        let specs = self.types;

        let mut type_index: IndexMap<String, TypeId> = IndexMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            if spec.qualified_name.trim().is_empty() {
                return Err(RefMineError::ModelBuild(
                    "type with empty qualified name".to_string(),
                ));
            }
            if type_index
                .insert(spec.qualified_name.clone(), TypeId(i as u32))
                .is_some()
            {
                return Err(RefMineError::ModelBuild(format!(
                    "duplicate type {}",
                    spec.qualified_name
                )));
            }
        }

        let packages = derive_packages(&specs, &type_index);
        let resolve = |name: &str| type_index.get(name).copied();

        let mut types: Vec<TypeEntity> = Vec::with_capacity(specs.len());
        let mut methods: Vec<MethodEntity> = Vec::new();
        let mut fields: Vec<FieldEntity> = Vec::new();
        let mut method_index: IndexMap<MethodKey, MethodId> = IndexMap::new();
        let mut field_index: IndexMap<FieldKey, FieldId> = IndexMap::new();
        let mut pending_calls: Vec<Vec<MethodKey>> = Vec::new();

        for (i, (spec, package)) in specs.into_iter().zip(packages).enumerate() {
            let type_id = TypeId(i as u32);
            let qualified_name = spec.qualified_name;

            let superclass = spec
                .superclass
                .as_deref()
                .and_then(resolve)
                .filter(|s| *s != type_id);
            let mut interfaces: Vec<TypeId> = Vec::new();
            for name in &spec.interfaces {
                if let Some(iface) = resolve(name) {
                    if iface != type_id && !interfaces.contains(&iface) {
                        interfaces.push(iface);
                    }
                }
            }
            let enclosing = spec
                .enclosing
                .as_deref()
                .and_then(resolve)
                .filter(|e| *e != type_id);

            let mut method_ids = Vec::with_capacity(spec.methods.len());
            for method in spec.methods {
                let method_id = MethodId(methods.len() as u32);
                let key = MethodKey {
                    declaring_type: qualified_name.clone(),
                    name: if method.is_constructor {
                        String::new()
                    } else {
                        method.name.clone()
                    },
                    parameter_types: method
                        .parameters
                        .iter()
                        .map(|p| erase_type_name(&p.type_name))
                        .collect(),
                };
                if method.name.is_empty() && !method.is_constructor {
                    return Err(RefMineError::ModelBuild(format!(
                        "method without a name in {qualified_name}"
                    )));
                }
                if method_index.insert(key.clone(), method_id).is_some() {
                    return Err(RefMineError::ModelBuild(format!("duplicate method {key}")));
                }

                let body = BodyRepr::from_statements(&method.body);
                let name = if method.is_constructor {
                    simple_name(&qualified_name).to_string()
                } else {
                    method.name
                };
                methods.push(MethodEntity {
                    id: method_id,
                    declaring_type: type_id,
                    key,
                    name,
                    parameters: method.parameters,
                    return_type: method.return_type,
                    statement_count: method.statement_count.unwrap_or(body.len()),
                    body,
                    is_test_code: method.is_test_code.unwrap_or(spec.is_test_code),
                    is_deprecated: method.is_deprecated,
                    is_abstract: method.is_abstract,
                    is_overridden: false,
                    is_recursive: false,
                    calls: Vec::new(),
                    callers: Vec::new(),
                });
                pending_calls.push(method.calls);
                method_ids.push(method_id);
            }

            let mut field_ids = Vec::with_capacity(spec.fields.len());
            for field in spec.fields {
                let field_id = FieldId(fields.len() as u32);
                let key = FieldKey::new(&qualified_name, &field.name);
                if field_index.insert(key.clone(), field_id).is_some() {
                    return Err(RefMineError::ModelBuild(format!(
                        "duplicate field {}#{}",
                        key.declaring_type, key.name
                    )));
                }
                fields.push(FieldEntity {
                    id: field_id,
                    declaring_type: type_id,
                    key,
                    type_name: erase_type_name(&field.type_name),
                });
                field_ids.push(field_id);
            }

            types.push(TypeEntity {
                id: type_id,
                qualified_name,
                kind: spec.kind,
                package,
                file_path: spec.file_path,
                superclass,
                interfaces,
                enclosing,
                nested: Vec::new(),
                is_test_code: spec.is_test_code,
                is_deprecated: spec.is_deprecated,
                methods: method_ids,
                fields: field_ids,
            });
        }

        // -- containment ----------------------------------------------------
        for i in 0..types.len() {
            if let Some(outer) = types[i].enclosing {
                let inner = types[i].id;
                types[outer.index()].nested.push(inner);
            }
        }

        // -- call graph -----------------------------------------------------
        for (i, keys) in pending_calls.into_iter().enumerate() {
            let mut calls: Vec<MethodId> = Vec::new();
            for key in keys {
                // Calls outside the model are dropped.
                if let Some(&target) = method_index.get(&key.erased()) {
                    if !calls.contains(&target) {
                        calls.push(target);
                    }
                }
            }
            methods[i].is_recursive = calls.contains(&methods[i].id);
            methods[i].calls = calls;
        }
        for i in 0..methods.len() {
            let caller = methods[i].id;
            for callee in methods[i].calls.clone() {
                methods[callee.index()].callers.push(caller);
            }
        }

        // -- hierarchy ------------------------------------------------------
        let mut subtypes: Vec<Vec<TypeId>> = vec![Vec::new(); types.len()];
        for t in &types {
            for sup in t.supertypes() {
                if !subtypes[sup.index()].contains(&t.id) {
                    subtypes[sup.index()].push(t.id);
                }
            }
        }

        for t in &types {
            let descendants = transitive(&subtypes, t.id);
            if descendants.is_empty() {
                continue;
            }
            for &m in &t.methods {
                if methods[m.index()].is_constructor() {
                    continue;
                }
                let name = methods[m.index()].key.name.clone();
                let arity = methods[m.index()].arity();
                let overridden = descendants.iter().any(|d| {
                    types[d.index()].methods.iter().any(|&other| {
                        let other = &methods[other.index()];
                        other.key.name == name && other.arity() == arity
                    })
                });
                methods[m.index()].is_overridden = overridden;
            }
        }

        Ok(CodeModel {
            types,
            methods,
            fields,
            type_index,
            method_index,
            field_index,
            subtypes,
        })
    }
}

/// Package of each spec: explicit, else taken from the outermost enclosing
/// type, else the qualified name minus its last segment.
fn derive_packages(specs: &[TypeSpec], index: &IndexMap<String, TypeId>) -> Vec<String> {
    specs
        .iter()
        .map(|spec| {
            if let Some(package) = &spec.package {
                return package.clone();
            }
            let mut current = spec;
            // Bounded walk so a containment cycle cannot loop.
            for _ in 0..specs.len() {
                let Some(outer) = current.enclosing.as_deref().and_then(|n| index.get(n)) else {
                    break;
                };
                let outer = &specs[outer.index()];
                if let Some(package) = &outer.package {
                    return package.clone();
                }
                current = outer;
            }
            current
                .qualified_name
                .rsplit_once('.')
                .map_or(String::new(), |(head, _)| head.to_string())
        })
        .collect()
}

/// Strict transitive closure over a direct-edge adjacency list.
pub(crate) fn transitive(edges: &[Vec<TypeId>], start: TypeId) -> Vec<TypeId> {
    let mut seen: HashSet<TypeId> = HashSet::new();
    let mut order = Vec::new();
    let mut queue: VecDeque<TypeId> = edges[start.index()].iter().copied().collect();
    while let Some(next) = queue.pop_front() {
        if next == start || !seen.insert(next) {
            continue;
        }
        order.push(next);
        queue.extend(edges[next.index()].iter().copied());
    }
    order
}
