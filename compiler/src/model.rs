// model.rs — Read-only type model consumed by the stub generator
//
// An arena of type nodes plus a de-duplicated namespace table. Primitive
// storage kinds are pre-registered singleton nodes, so every type reference
// (field, argument, prerequisite) is a plain `TypeId`.
//
// Preconditions: nodes are added before any generation pass starts.
// Postconditions: the model is immutable for the remainder of the run.
// Failure modes: none (lookups of foreign IDs panic).
// Side effects: none.

use std::collections::HashMap;

use crate::id::{IdAllocator, NamespaceId, TypeId};

// ── Storage kinds ──────────────────────────────────────────────────────────

/// Storage kind of a type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Void,
    Bool,
    Int32,
    Int64,
    Float64,
    String,
    Any,
    Enum,
    Record,
    Sequence,
    Interface,
}

impl StorageKind {
    /// Primitive kinds in registration order; `TypeModel::new` assigns them
    /// the IDs `0..7`.
    pub const PRIMITIVES: [StorageKind; 7] = [
        StorageKind::Void,
        StorageKind::Bool,
        StorageKind::Int32,
        StorageKind::Int64,
        StorageKind::Float64,
        StorageKind::String,
        StorageKind::Any,
    ];

    /// Upper-case storage name used in aux metadata (`type=INT32`).
    pub fn name(self) -> &'static str {
        match self {
            StorageKind::Void => "VOID",
            StorageKind::Bool => "BOOL",
            StorageKind::Int32 => "INT32",
            StorageKind::Int64 => "INT64",
            StorageKind::Float64 => "FLOAT64",
            StorageKind::String => "STRING",
            StorageKind::Any => "ANY",
            StorageKind::Enum => "ENUM",
            StorageKind::Record => "RECORD",
            StorageKind::Sequence => "SEQUENCE",
            StorageKind::Interface => "INTERFACE",
        }
    }

    /// Schema spelling of a primitive kind (`int32`, `string`, ...).
    pub fn from_primitive_name(name: &str) -> Option<StorageKind> {
        Some(match name {
            "void" => StorageKind::Void,
            "bool" => StorageKind::Bool,
            "int32" => StorageKind::Int32,
            "int64" => StorageKind::Int64,
            "float64" => StorageKind::Float64,
            "string" => StorageKind::String,
            "any" => StorageKind::Any,
            _ => return None,
        })
    }

    pub fn is_compound(self) -> bool {
        matches!(
            self,
            StorageKind::Enum | StorageKind::Record | StorageKind::Sequence | StorageKind::Interface
        )
    }

    /// Kinds held and passed by value; zero-initialized as record fields.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            StorageKind::Bool
                | StorageKind::Int32
                | StorageKind::Int64
                | StorageKind::Float64
                | StorageKind::Enum
        )
    }

    /// Kinds passed as `const T&`.
    pub fn is_const_ref(self) -> bool {
        matches!(
            self,
            StorageKind::String | StorageKind::Record | StorageKind::Sequence | StorageKind::Any
        )
    }
}

// ── Aux data ───────────────────────────────────────────────────────────────

/// Insertion-ordered `key → value` metadata attached to types and fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuxData {
    entries: Vec<(String, String)>,
}

impl AuxData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AuxData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut aux = AuxData::new();
        for (k, v) in iter {
            aux.insert(k, v);
        }
        aux
    }
}

// ── Members ────────────────────────────────────────────────────────────────

/// One entry of the namespace table. Anonymous namespaces have an empty name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
    pub parent: Option<NamespaceId>,
}

/// A record field, interface property, or sequence element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    pub aux_data: AuxData,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Field {
            name: name.into(),
            ty,
            aux_data: AuxData::new(),
        }
    }
}

/// A method argument with an optional default-value expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub name: String,
    pub ty: TypeId,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub ret: TypeId,
    pub args: Vec<Arg>,
    /// Servant declaration is pure virtual (`= 0`).
    pub pure: bool,
}

/// Enumerator `(identifier, label, blurb, value)`. Values span
/// `i64::MIN ..= u64::MAX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub ident: String,
    pub label: Option<String>,
    pub blurb: Option<String>,
    pub value: i128,
}

/// Position of a declaration in the IDL source, as reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

// ── Type nodes ─────────────────────────────────────────────────────────────

/// Kind-specific payload of a type node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Void,
    Bool,
    Int32,
    Int64,
    Float64,
    String,
    Any,
    Enum {
        values: Vec<EnumValue>,
        combinable: bool,
    },
    Record {
        fields: Vec<Field>,
    },
    Sequence {
        element: Field,
    },
    Interface {
        fields: Vec<Field>,
        methods: Vec<Method>,
    },
}

impl TypeKind {
    pub fn storage(&self) -> StorageKind {
        match self {
            TypeKind::Void => StorageKind::Void,
            TypeKind::Bool => StorageKind::Bool,
            TypeKind::Int32 => StorageKind::Int32,
            TypeKind::Int64 => StorageKind::Int64,
            TypeKind::Float64 => StorageKind::Float64,
            TypeKind::String => StorageKind::String,
            TypeKind::Any => StorageKind::Any,
            TypeKind::Enum { .. } => StorageKind::Enum,
            TypeKind::Record { .. } => StorageKind::Record,
            TypeKind::Sequence { .. } => StorageKind::Sequence,
            TypeKind::Interface { .. } => StorageKind::Interface,
        }
    }

    fn primitive(kind: StorageKind) -> Option<TypeKind> {
        Some(match kind {
            StorageKind::Void => TypeKind::Void,
            StorageKind::Bool => TypeKind::Bool,
            StorageKind::Int32 => TypeKind::Int32,
            StorageKind::Int64 => TypeKind::Int64,
            StorageKind::Float64 => TypeKind::Float64,
            StorageKind::String => TypeKind::String,
            StorageKind::Any => TypeKind::Any,
            StorageKind::Enum
            | StorageKind::Record
            | StorageKind::Sequence
            | StorageKind::Interface => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    pub name: String,
    /// Outer → inner namespace chain.
    pub namespace: Vec<NamespaceId>,
    /// Declared prerequisites; may contain transitive redundancy.
    pub prerequisites: Vec<TypeId>,
    pub aux_data: AuxData,
    /// Declared here, defined elsewhere.
    pub is_forward: bool,
    /// Code is emitted for this type in the current run.
    pub is_impl: bool,
    pub location: Option<SourceLocation>,
    pub kind: TypeKind,
}

impl TypeNode {
    pub fn new(name: impl Into<String>, namespace: Vec<NamespaceId>, kind: TypeKind) -> Self {
        TypeNode {
            name: name.into(),
            namespace,
            prerequisites: Vec::new(),
            aux_data: AuxData::new(),
            is_forward: false,
            is_impl: true,
            location: None,
            kind,
        }
    }

    pub fn with_prerequisites(mut self, prerequisites: Vec<TypeId>) -> Self {
        self.prerequisites = prerequisites;
        self
    }

    pub fn with_aux(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.aux_data.insert(key, value);
        self
    }

    pub fn forward(mut self) -> Self {
        self.is_forward = true;
        self
    }

    pub fn storage(&self) -> StorageKind {
        self.kind.storage()
    }

    /// Record fields or interface properties; empty for other kinds.
    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            TypeKind::Record { fields } | TypeKind::Interface { fields, .. } => fields,
            _ => &[],
        }
    }

    pub fn methods(&self) -> &[Method] {
        match &self.kind {
            TypeKind::Interface { methods, .. } => methods,
            _ => &[],
        }
    }
}

// ── Model ──────────────────────────────────────────────────────────────────

/// The complete set of types known to one generator run.
#[derive(Debug)]
pub struct TypeModel {
    ids: IdAllocator,
    namespaces: Vec<Namespace>,
    namespace_index: HashMap<(Option<NamespaceId>, String), NamespaceId>,
    types: Vec<TypeNode>,
    identifiers: HashMap<String, TypeId>,
}

impl Default for TypeModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeModel {
    pub fn new() -> Self {
        let mut model = TypeModel {
            ids: IdAllocator::new(),
            namespaces: Vec::new(),
            namespace_index: HashMap::new(),
            types: Vec::new(),
            identifiers: HashMap::new(),
        };
        for kind in StorageKind::PRIMITIVES {
            if let Some(tk) = TypeKind::primitive(kind) {
                model.add_type(TypeNode::new("", Vec::new(), tk));
            }
        }
        model
    }

    /// ID of the singleton node for a primitive kind.
    pub fn primitive(kind: StorageKind) -> Option<TypeId> {
        StorageKind::PRIMITIVES
            .iter()
            .position(|k| *k == kind)
            .map(|pos| TypeId(pos as u32))
    }

    /// Intern a namespace path (outer → inner) and return its chain.
    /// Identical paths always yield identical chains.
    pub fn intern_namespace<S: AsRef<str>>(&mut self, path: &[S]) -> Vec<NamespaceId> {
        let mut chain = Vec::with_capacity(path.len());
        let mut parent = None;
        for name in path {
            let key = (parent, name.as_ref().to_string());
            let id = match self.namespace_index.get(&key) {
                Some(&id) => id,
                None => {
                    let id = self.ids.alloc_namespace();
                    self.namespaces.push(Namespace {
                        name: key.1.clone(),
                        parent,
                    });
                    self.namespace_index.insert(key, id);
                    id
                }
            };
            chain.push(id);
            parent = Some(id);
        }
        chain
    }

    /// Add a node. Compound types become reachable through `lookup`; a
    /// definition replaces an earlier forward declaration of the same name.
    pub fn add_type(&mut self, node: TypeNode) -> TypeId {
        let id = self.ids.alloc_type();
        if node.storage().is_compound() {
            let ident = self.identifier_of(&node);
            let replace = match self.identifiers.get(&ident) {
                Some(&prev) => self.types[prev.index()].is_forward && !node.is_forward,
                None => true,
            };
            if replace {
                self.identifiers.insert(ident, id);
            }
        }
        self.types.push(node);
        id
    }

    pub fn get(&self, id: TypeId) -> &TypeNode {
        &self.types[id.index()]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut TypeNode {
        &mut self.types[id.index()]
    }

    pub fn namespace(&self, id: NamespaceId) -> &Namespace {
        &self.namespaces[id.index()]
    }

    /// Look up a compound type by its dot-joined type identifier.
    pub fn lookup(&self, identifier: &str) -> Option<TypeId> {
        self.identifiers.get(identifier).copied()
    }

    /// Whether any compound type has the given bare name.
    pub fn has_type_named(&self, name: &str) -> bool {
        self.types
            .iter()
            .any(|t| t.storage().is_compound() && t.name == name)
    }

    /// Compound types in declaration order.
    pub fn compound_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.types
            .iter()
            .enumerate()
            .filter(|(_, t)| t.storage().is_compound())
            .map(|(i, _)| TypeId(i as u32))
    }

    /// Compound types selected for emission, in declaration order.
    pub fn impl_types(&self) -> Vec<TypeId> {
        self.compound_types()
            .filter(|&id| self.get(id).is_impl)
            .collect()
    }

    /// Non-anonymous namespace names of a chain.
    pub fn namespace_names(&self, chain: &[NamespaceId]) -> Vec<&str> {
        chain
            .iter()
            .map(|&ns| self.namespace(ns).name.as_str())
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// Canonical dot-joined identifier (`Bse.Device`); the storage name for
    /// primitives.
    pub fn type_identifier(&self, id: TypeId) -> String {
        self.identifier_of(self.get(id))
    }

    /// Absolute `::`-joined C++ name of a compound type.
    pub fn absolute_name(&self, id: TypeId) -> String {
        let node = self.get(id);
        let mut parts = self.namespace_names(&node.namespace);
        parts.push(&node.name);
        parts.join("::")
    }

    fn identifier_of(&self, node: &TypeNode) -> String {
        if !node.storage().is_compound() {
            return node.storage().name().to_string();
        }
        let mut parts = self.namespace_names(&node.namespace);
        parts.push(&node.name);
        parts.join(".")
    }
}
