// id.rs — Stable arena identifiers for the type model
//
// Types and namespaces live in flat arenas inside `TypeModel`; these IDs
// index them. IDs are allocated in schema declaration order, so two runs over
// the same schema assign identical IDs and the emitted text stays
// byte-for-byte reproducible.

/// Identifier of a type node (primitive or compound) in the model arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// Identifier of an entry in the de-duplicated namespace table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(pub u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl NamespaceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Allocator for arena IDs. Produces monotonically increasing IDs in
/// allocation (declaration) order.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_type: u32,
    next_namespace: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_type(&mut self) -> TypeId {
        let id = TypeId(self.next_type);
        self.next_type += 1;
        id
    }

    pub fn alloc_namespace(&mut self) -> NamespaceId {
        let id = NamespaceId(self.next_namespace);
        self.next_namespace += 1;
        id
    }
}
