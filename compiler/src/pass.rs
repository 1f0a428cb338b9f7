// pass.rs — Artifact descriptors for the four emission passes
//
// Declares the four generated artifacts, the generation mode each one is
// written in, and the file suffix it lands under. The pipeline runs the
// passes in `ALL_ARTIFACTS` order; the emission engine consults the
// descriptor to decide which per-type generators apply.

use crate::names::GenMode;

// ── Artifact identifiers ───────────────────────────────────────────────────

/// One generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Servant declarations (`_interfaces.hh`).
    ServerDecl,
    /// Servant implementations and dispatch tables (`_interfaces.cc`).
    ServerImpl,
    /// Remote handles, records, sequences and enums (`_handles.hh`).
    ClientDecl,
    /// Handle stubs and type registrations (`_handles.cc`).
    ClientImpl,
}

// ── Descriptor ─────────────────────────────────────────────────────────────

/// Static metadata about an artifact.
pub struct ArtifactDescriptor {
    /// Human-readable name for diagnostics/verbose output.
    pub name: &'static str,
    /// Appended to the schema base path.
    pub suffix: &'static str,
    pub mode: GenMode,
    /// Header (declarations) rather than implementation file.
    pub is_decl: bool,
}

pub fn descriptor(artifact: Artifact) -> ArtifactDescriptor {
    match artifact {
        Artifact::ServerDecl => ArtifactDescriptor {
            name: "server_decl",
            suffix: "_interfaces.hh",
            mode: GenMode::Servant,
            is_decl: true,
        },
        Artifact::ServerImpl => ArtifactDescriptor {
            name: "server_impl",
            suffix: "_interfaces.cc",
            mode: GenMode::Servant,
            is_decl: false,
        },
        Artifact::ClientDecl => ArtifactDescriptor {
            name: "client_decl",
            suffix: "_handles.hh",
            mode: GenMode::Handle,
            is_decl: true,
        },
        Artifact::ClientImpl => ArtifactDescriptor {
            name: "client_impl",
            suffix: "_handles.cc",
            mode: GenMode::Handle,
            is_decl: false,
        },
    }
}

/// Emission order of one run.
pub const ALL_ARTIFACTS: [Artifact; 4] = [
    Artifact::ServerDecl,
    Artifact::ServerImpl,
    Artifact::ClientDecl,
    Artifact::ClientImpl,
];

impl Artifact {
    pub fn name(self) -> &'static str {
        descriptor(self).name
    }

    pub fn suffix(self) -> &'static str {
        descriptor(self).suffix
    }

    pub fn mode(self) -> GenMode {
        descriptor(self).mode
    }

    pub fn is_decl(self) -> bool {
        descriptor(self).is_decl
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
