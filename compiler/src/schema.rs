// schema.rs — JSON schema loader
//
// Builds a `TypeModel` from the JSON rendering of a validated IDL schema.
// Loading runs in two phases: every declaration is first allocated and
// registered under its type identifier, then all type references (fields,
// arguments, prerequisites, sequence elements) are resolved, so declarations
// may refer to types declared later in the file.
//
// Preconditions: none.
// Postconditions: on success every reference in the model is a valid
//                 `TypeId` and the prerequisite graph is acyclic.
// Failure modes: unreadable file, malformed JSON, unknown or ambiguous type
//                references, duplicate definitions, non-interface
//                prerequisites, inheritance cycles, enumerator values outside
//                `i64::MIN ..= u64::MAX`.
// Side effects: reads the schema file in `load_file`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::diag::{codes, Diagnostic, Location};
use crate::id::TypeId;
use crate::model::{
    Arg, AuxData, EnumValue, Field, Method, SourceLocation, StorageKind, TypeKind, TypeModel,
    TypeNode,
};
use crate::quote::cunquote_chain;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: invalid schema: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{referrer}: unknown type '{reference}'")]
    UnknownType { referrer: String, reference: String },
    #[error("duplicate definition of type '{0}'")]
    DuplicateType(String),
    #[error("{referrer}: prerequisite '{reference}' is not an interface")]
    NotAnInterface { referrer: String, reference: String },
    #[error("inheritance cycle through '{0}'")]
    InheritanceCycle(String),
    #[error("{type_name}.{ident}: enumerator value out of range")]
    EnumValue { type_name: String, ident: String },
}

// ── Wire format ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SchemaDoc {
    #[serde(default)]
    types: Vec<TypeDecl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum DeclKind {
    Enum,
    Record,
    Sequence,
    Interface,
}

fn default_true() -> bool {
    true
}

fn default_void() -> String {
    "void".to_string()
}

#[derive(Debug, Deserialize)]
struct TypeDecl {
    kind: DeclKind,
    name: String,
    #[serde(default)]
    namespace: Vec<String>,
    #[serde(default)]
    prerequisites: Vec<String>,
    #[serde(default)]
    aux_data: Map<String, Value>,
    #[serde(default)]
    fields: Vec<FieldDecl>,
    #[serde(default)]
    methods: Vec<MethodDecl>,
    #[serde(default)]
    values: Vec<EnumValueDecl>,
    #[serde(default)]
    combinable: bool,
    #[serde(default)]
    element: Option<FieldDecl>,
    #[serde(default)]
    forward: bool,
    #[serde(default = "default_true", rename = "impl")]
    is_impl: bool,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FieldDecl {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    aux_data: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct MethodDecl {
    name: String,
    #[serde(default = "default_void", rename = "return")]
    ret: String,
    #[serde(default)]
    args: Vec<ArgDecl>,
    #[serde(default)]
    pure: bool,
}

#[derive(Debug, Deserialize)]
struct ArgDecl {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    default: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct EnumValueDecl {
    ident: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    blurb: Option<String>,
    value: serde_json::Number,
}

// ── Value conversion ───────────────────────────────────────────────────────

/// Stringify an aux value. Strings lose an `_(…)` translation wrapper and
/// C string literal chains are unquoted; other values keep their JSON text.
pub fn aux_value_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => {
            let inner = s
                .strip_prefix("_(")
                .and_then(|r| r.strip_suffix(')'))
                .map(str::trim)
                .unwrap_or(s.as_str());
            if inner.starts_with('"') {
                cunquote_chain(inner).unwrap_or_else(|| inner.to_string())
            } else {
                inner.to_string()
            }
        }
        other => other.to_string(),
    }
}

fn aux_data(map: &Map<String, Value>) -> AuxData {
    map.iter().map(|(k, v)| (k.clone(), aux_value_string(v))).collect()
}

fn default_expr(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn enum_value(n: &serde_json::Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

// ── Loader ─────────────────────────────────────────────────────────────────

/// A loaded model plus the warnings raised while building it.
#[derive(Debug)]
pub struct LoadedSchema {
    pub model: TypeModel,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn load_file(path: &Path) -> Result<LoadedSchema, SchemaError> {
    let text = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    load_str(&text, &path.display().to_string())
}

/// Load a schema from JSON text; `origin` names it in errors and warnings.
pub fn load_str(text: &str, origin: &str) -> Result<LoadedSchema, SchemaError> {
    let doc: SchemaDoc = serde_json::from_str(text).map_err(|e| SchemaError::Json {
        path: PathBuf::from(origin),
        source: e,
    })?;
    Loader::new(origin).load(&doc)
}

struct Loader<'o> {
    origin: &'o str,
    model: TypeModel,
    diagnostics: Vec<Diagnostic>,
}

impl<'o> Loader<'o> {
    fn new(origin: &'o str) -> Self {
        Loader {
            origin,
            model: TypeModel::new(),
            diagnostics: Vec::new(),
        }
    }

    fn load(mut self, doc: &SchemaDoc) -> Result<LoadedSchema, SchemaError> {
        // Phase 1: allocate nodes and register identifiers.
        let mut defined: HashSet<String> = HashSet::new();
        let mut ids = Vec::with_capacity(doc.types.len());
        for decl in &doc.types {
            let chain = self.model.intern_namespace(&decl.namespace);
            let mut node = TypeNode::new(&decl.name, chain, placeholder(decl.kind));
            node.is_forward = decl.forward;
            node.is_impl = decl.is_impl;
            node.aux_data = aux_data(&decl.aux_data);
            node.location = decl.line.map(|line| SourceLocation {
                line,
                column: decl.column.unwrap_or(0),
            });
            let id = self.model.add_type(node);
            let ident = self.model.type_identifier(id);
            if !decl.forward && !defined.insert(ident.clone()) {
                return Err(SchemaError::DuplicateType(ident));
            }
            ids.push(id);
        }

        // Phase 2: resolve references.
        for (decl, &id) in doc.types.iter().zip(&ids) {
            if decl.forward {
                continue;
            }
            let kind = self.resolve_kind(decl, id)?;
            let prerequisites = self.resolve_prerequisites(decl, id)?;
            let node = self.model.get_mut(id);
            node.kind = kind;
            node.prerequisites = prerequisites;
            self.check_members(decl, id);
        }

        check_acyclic(&self.model)?;
        Ok(LoadedSchema {
            model: self.model,
            diagnostics: self.diagnostics,
        })
    }

    /// Resolve `reference` from the namespace of `decl` outward.
    fn resolve(&self, decl: &TypeDecl, referrer: TypeId, reference: &str) -> Result<TypeId, SchemaError> {
        if let Some(kind) = StorageKind::from_primitive_name(reference) {
            if let Some(id) = TypeModel::primitive(kind) {
                return Ok(id);
            }
        }
        let scope: Vec<&str> = decl
            .namespace
            .iter()
            .map(String::as_str)
            .filter(|n| !n.is_empty())
            .collect();
        for depth in (0..=scope.len()).rev() {
            let mut parts = scope[..depth].to_vec();
            parts.push(reference);
            if let Some(id) = self.model.lookup(&parts.join(".")) {
                return Ok(id);
            }
        }
        Err(SchemaError::UnknownType {
            referrer: self.model.type_identifier(referrer),
            reference: reference.to_string(),
        })
    }

    fn field(&self, decl: &TypeDecl, id: TypeId, f: &FieldDecl) -> Result<Field, SchemaError> {
        Ok(Field {
            name: f.name.clone(),
            ty: self.resolve(decl, id, &f.ty)?,
            aux_data: aux_data(&f.aux_data),
        })
    }

    fn resolve_kind(&self, decl: &TypeDecl, id: TypeId) -> Result<TypeKind, SchemaError> {
        Ok(match decl.kind {
            DeclKind::Enum => {
                let mut values = Vec::with_capacity(decl.values.len());
                for v in &decl.values {
                    let value = enum_value(&v.value).ok_or_else(|| SchemaError::EnumValue {
                        type_name: self.model.type_identifier(id),
                        ident: v.ident.clone(),
                    })?;
                    values.push(EnumValue {
                        ident: v.ident.clone(),
                        label: v.label.clone(),
                        blurb: v.blurb.clone(),
                        value,
                    });
                }
                TypeKind::Enum {
                    values,
                    combinable: decl.combinable,
                }
            }
            DeclKind::Record => TypeKind::Record {
                fields: decl
                    .fields
                    .iter()
                    .map(|f| self.field(decl, id, f))
                    .collect::<Result<_, _>>()?,
            },
            DeclKind::Sequence => {
                let element = match &decl.element {
                    Some(e) => self.field(decl, id, e)?,
                    None => {
                        return Err(SchemaError::UnknownType {
                            referrer: self.model.type_identifier(id),
                            reference: "<element>".to_string(),
                        })
                    }
                };
                TypeKind::Sequence { element }
            }
            DeclKind::Interface => {
                let fields = decl
                    .fields
                    .iter()
                    .map(|f| self.field(decl, id, f))
                    .collect::<Result<_, _>>()?;
                let mut methods = Vec::with_capacity(decl.methods.len());
                for m in &decl.methods {
                    let mut args = Vec::with_capacity(m.args.len());
                    for a in &m.args {
                        args.push(Arg {
                            name: a.name.clone(),
                            ty: self.resolve(decl, id, &a.ty)?,
                            default: a.default.as_ref().and_then(default_expr),
                        });
                    }
                    methods.push(Method {
                        name: m.name.clone(),
                        ret: self.resolve(decl, id, &m.ret)?,
                        args,
                        pure: m.pure,
                    });
                }
                TypeKind::Interface { fields, methods }
            }
        })
    }

    fn resolve_prerequisites(&self, decl: &TypeDecl, id: TypeId) -> Result<Vec<TypeId>, SchemaError> {
        let mut out = Vec::with_capacity(decl.prerequisites.len());
        for p in &decl.prerequisites {
            let pid = self.resolve(decl, id, p)?;
            if self.model.get(pid).storage() != StorageKind::Interface {
                return Err(SchemaError::NotAnInterface {
                    referrer: self.model.type_identifier(id),
                    reference: p.clone(),
                });
            }
            out.push(pid);
        }
        Ok(out)
    }

    fn location(&self, decl: &TypeDecl) -> Location {
        match decl.line {
            Some(line) => Location::at(self.origin, line, decl.column.unwrap_or(0)),
            None => Location::file(self.origin),
        }
    }

    fn warn(&mut self, decl: &TypeDecl, code: crate::diag::DiagCode, message: String) {
        let d = Diagnostic::warning(message)
            .with_code(code)
            .with_location(self.location(decl));
        self.diagnostics.push(d);
    }

    fn check_members(&mut self, decl: &TypeDecl, id: TypeId) {
        let ident = self.model.type_identifier(id);
        let mut seen = HashSet::new();
        let names = decl
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(decl.methods.iter().map(|m| m.name.as_str()))
            .chain(decl.values.iter().map(|v| v.ident.as_str()));
        let mut duplicates = Vec::new();
        for name in names {
            if !seen.insert(name) {
                duplicates.push(name.to_string());
            }
        }
        let methods: HashSet<&str> = decl.methods.iter().map(|m| m.name.as_str()).collect();
        let clashes: Vec<String> = decl
            .fields
            .iter()
            .filter(|f| methods.contains(f.name.as_str()))
            .map(|f| f.name.clone())
            .collect();
        for name in &clashes {
            self.warn(
                decl,
                codes::W0002,
                format!("{}: property '{}' clashes with a method of the same name", ident, name),
            );
        }
        for name in duplicates.into_iter().filter(|n| !clashes.contains(n)) {
            self.warn(decl, codes::W0003, format!("{}: duplicate member '{}'", ident, name));
        }
        if decl.kind == DeclKind::Enum && decl.values.is_empty() {
            self.warn(decl, codes::W0004, format!("{}: enumeration has no values", ident));
        }
    }
}

fn placeholder(kind: DeclKind) -> TypeKind {
    match kind {
        DeclKind::Enum => TypeKind::Enum {
            values: Vec::new(),
            combinable: false,
        },
        DeclKind::Record => TypeKind::Record { fields: Vec::new() },
        DeclKind::Sequence => TypeKind::Sequence {
            element: Field::new("", TypeId(0)),
        },
        DeclKind::Interface => TypeKind::Interface {
            fields: Vec::new(),
            methods: Vec::new(),
        },
    }
}

fn check_acyclic(model: &TypeModel) -> Result<(), SchemaError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Open,
        Done,
    }
    fn visit(model: &TypeModel, id: TypeId, marks: &mut HashMap<TypeId, Mark>) -> Result<(), SchemaError> {
        match marks.get(&id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Open) => return Err(SchemaError::InheritanceCycle(model.type_identifier(id))),
            None => {}
        }
        marks.insert(id, Mark::Open);
        for &p in &model.get(id).prerequisites {
            visit(model, p, marks)?;
        }
        marks.insert(id, Mark::Done);
        Ok(())
    }
    let mut marks = HashMap::new();
    for id in model.compound_types() {
        visit(model, id, &mut marks)?;
    }
    Ok(())
}
