// identity.rs — Wire identities for interface members
//
// Client stubs and servant dispatch tables are compiled independently and
// must agree on a numeric identity for every method and property. The
// identity is a 128-bit digest of a canonical signature string that depends
// only on the schema (type identifier, member name, role), never on the
// generation mode or the namespace scope at the point of emission.
//
// Preconditions: identities are requested for interface types only.
// Postconditions: equal (interface, member, role) inputs give equal `WireId`s.
// Failure modes: none.
// Side effects: none.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::id::TypeId;
use crate::inherit::class_ancestry;
use crate::model::{Method, StorageKind, TypeModel};

/// Internal tag of the dynamic property access entry point.
pub const ACCESS_TAG: &str = "__access__";

// ── Identity value ─────────────────────────────────────────────────────────

/// Two-word wire identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireId {
    pub hi: u64,
    pub lo: u64,
}

impl WireId {
    /// Big-endian words from the first 16 digest bytes.
    pub fn from_bytes(bytes: &[u8; 16]) -> Self {
        let mut hi = [0u8; 8];
        let mut lo = [0u8; 8];
        hi.copy_from_slice(&bytes[..8]);
        lo.copy_from_slice(&bytes[8..]);
        WireId {
            hi: u64::from_be_bytes(hi),
            lo: u64::from_be_bytes(lo),
        }
    }

    /// `Aida::TypeHash (0x…ULL, 0x…ULL)`
    pub fn type_hash_expr(&self) -> String {
        format!("Aida::TypeHash ({})", self)
    }
}

/// Renders as two unsigned 64-bit C++ literals: `0x…ULL, 0x…ULL`.
impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}ULL, 0x{:016x}ULL", self.hi, self.lo)
    }
}

// ── Digest primitive ───────────────────────────────────────────────────────

/// Deterministic mapping from a signature string to 128 bits.
pub trait SignatureDigest {
    fn digest128(&self, signature: &str) -> [u8; 16];
}

/// SHA-256 truncated to its first 16 bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Digest;

impl SignatureDigest for Sha256Digest {
    fn digest128(&self, signature: &str) -> [u8; 16] {
        let mut hasher = Sha256::new();
        hasher.update(signature.as_bytes());
        let result = hasher.finalize();
        let mut out = [0u8; 16];
        out.copy_from_slice(&result[..16]);
        out
    }
}

// ── Dispatch surface ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchRole {
    Getter,
    Setter,
    Method,
    Internal,
}

impl DispatchRole {
    /// Enumerator spelling in the generated dispatch tables.
    pub fn cpp_name(self) -> &'static str {
        match self {
            DispatchRole::Getter => "Aida::DispatchRole::GETTER",
            DispatchRole::Setter => "Aida::DispatchRole::SETTER",
            DispatchRole::Method => "Aida::DispatchRole::METHOD",
            DispatchRole::Internal => "Aida::DispatchRole::INTERNAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEntry {
    pub member: String,
    pub role: DispatchRole,
    pub id: WireId,
}

/// Everything a servant registers for remote dispatch: its own class
/// identity, the identities of its whole ancestry (for checked downcasts),
/// and one entry per own member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSurface {
    pub class_id: WireId,
    pub ancestry: Vec<(String, WireId)>,
    pub entries: Vec<DispatchEntry>,
}

// ── Composer ───────────────────────────────────────────────────────────────

pub struct IdentityComposer<'a> {
    model: &'a TypeModel,
    digest: &'a dyn SignatureDigest,
}

impl<'a> IdentityComposer<'a> {
    pub fn new(model: &'a TypeModel, digest: &'a dyn SignatureDigest) -> Self {
        IdentityComposer { model, digest }
    }

    fn ident(&self, iface: TypeId) -> String {
        debug_assert_eq!(self.model.get(iface).storage(), StorageKind::Interface);
        self.model.type_identifier(iface)
    }

    fn hash(&self, signature: &str) -> WireId {
        WireId::from_bytes(&self.digest.digest128(signature))
    }

    pub fn class_signature(&self, iface: TypeId) -> String {
        format!("{} # class", self.ident(iface))
    }

    pub fn method_signature(&self, iface: TypeId, method: &str) -> String {
        format!("{}::{} # method", self.ident(iface), method)
    }

    pub fn property_signature(
        &self,
        iface: TypeId,
        field: &str,
        ty: TypeId,
        is_setter: bool,
    ) -> String {
        let role = if is_setter { "setter" } else { "getter" };
        format!(
            "{}::{}: {} # {}",
            self.ident(iface),
            field,
            self.model.type_identifier(ty),
            role
        )
    }

    pub fn internal_signature(&self, iface: TypeId, tag: &str) -> String {
        format!("{} # {} # internal", self.ident(iface), tag)
    }

    pub fn class_identity(&self, iface: TypeId) -> WireId {
        self.hash(&self.class_signature(iface))
    }

    pub fn method_identity(&self, iface: TypeId, method: &Method) -> WireId {
        self.hash(&self.method_signature(iface, &method.name))
    }

    pub fn property_identity(
        &self,
        iface: TypeId,
        field: &str,
        ty: TypeId,
        is_setter: bool,
    ) -> WireId {
        self.hash(&self.property_signature(iface, field, ty, is_setter))
    }

    pub fn internal_identity(&self, iface: TypeId, tag: &str) -> WireId {
        self.hash(&self.internal_signature(iface, tag))
    }

    /// Dispatch surface of `iface`. `with_access` adds the internal
    /// property-access entry.
    pub fn dispatch_surface(&self, iface: TypeId, with_access: bool) -> DispatchSurface {
        let node = self.model.get(iface);
        let ancestry = class_ancestry(self.model, iface)
            .into_iter()
            .map(|t| (self.model.type_identifier(t), self.class_identity(t)))
            .collect();
        let mut entries = Vec::new();
        for field in node.fields() {
            for (role, is_setter) in [(DispatchRole::Getter, false), (DispatchRole::Setter, true)] {
                entries.push(DispatchEntry {
                    member: field.name.clone(),
                    role,
                    id: self.property_identity(iface, &field.name, field.ty, is_setter),
                });
            }
        }
        for method in node.methods() {
            entries.push(DispatchEntry {
                member: method.name.clone(),
                role: DispatchRole::Method,
                id: self.method_identity(iface, method),
            });
        }
        if with_access {
            entries.push(DispatchEntry {
                member: ACCESS_TAG.to_string(),
                role: DispatchRole::Internal,
                id: self.internal_identity(iface, ACCESS_TAG),
            });
        }
        DispatchSurface {
            class_id: self.class_identity(iface),
            ancestry,
            entries,
        }
    }
}
