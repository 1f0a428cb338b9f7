// insertions.rs — Hand-written code fragments spliced into generated output
//
// Insertion files are plain text split into blocks by marker lines:
//
//     includes:                 // top of every artifact
//     class_scope:Device:       // servant and handle class bodies
//     handle_scope:Device:      // handle (or record/sequence) class body
//     interface_scope:Device:   // servant class body
//     IGNORE:                   // captured, never spliced
//
// Each marker may carry a trailing `// comment`. Lines before the first
// marker are ignored. Blocks with the same key accumulate across files.
//
// Preconditions: none.
// Postconditions: `text()` returns the block stripped of leading and trailing
//                 newlines, or the empty string for unknown keys.
// Failure modes: unreadable files (`InsertionError::Io`).
// Side effects: reads insertion files from disk in `load_file`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::diag::{codes, Diagnostic, Location};
use crate::model::TypeModel;

#[derive(Debug, Error)]
pub enum InsertionError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Slot keys ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotKind {
    Includes,
    ClassScope,
    HandleScope,
    InterfaceScope,
    Ignore,
}

impl SlotKind {
    fn marker(self) -> &'static str {
        match self {
            SlotKind::Includes => "includes",
            SlotKind::ClassScope => "class_scope",
            SlotKind::HandleScope => "handle_scope",
            SlotKind::InterfaceScope => "interface_scope",
            SlotKind::Ignore => "IGNORE",
        }
    }

    /// Slots spliced inside a class body (indented).
    fn in_class_body(self) -> bool {
        matches!(
            self,
            SlotKind::ClassScope | SlotKind::HandleScope | SlotKind::InterfaceScope
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub kind: SlotKind,
    pub type_name: Option<String>,
}

impl SlotKey {
    pub fn includes() -> Self {
        SlotKey {
            kind: SlotKind::Includes,
            type_name: None,
        }
    }

    pub fn scoped(kind: SlotKind, type_name: &str) -> Self {
        SlotKey {
            kind,
            type_name: Some(type_name.to_string()),
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_name {
            Some(name) => write!(f, "{}:{}", self.kind.marker(), name),
            None => write!(f, "{}", self.kind.marker()),
        }
    }
}

/// `:` followed by optional whitespace and an optional `//` comment.
fn marker_tail(rest: &str) -> bool {
    let rest = rest.trim_start();
    rest.is_empty() || rest.starts_with("//")
}

/// Recognize a marker line.
pub fn parse_marker(line: &str) -> Option<SlotKey> {
    let line = line.trim_end_matches(['\n', '\r']);
    for kind in [SlotKind::Includes, SlotKind::Ignore] {
        if let Some(rest) = line
            .strip_prefix(kind.marker())
            .and_then(|r| r.strip_prefix(':'))
        {
            if marker_tail(rest) {
                return Some(SlotKey {
                    kind,
                    type_name: None,
                });
            }
        }
    }
    for kind in [
        SlotKind::ClassScope,
        SlotKind::HandleScope,
        SlotKind::InterfaceScope,
    ] {
        let Some(rest) = line
            .strip_prefix(kind.marker())
            .and_then(|r| r.strip_prefix(':'))
        else {
            continue;
        };
        let name_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if name_len == 0 {
            continue;
        }
        let (name, tail) = rest.split_at(name_len);
        if let Some(tail) = tail.strip_prefix(':') {
            if marker_tail(tail) {
                return Some(SlotKey::scoped(kind, name));
            }
        }
    }
    None
}

// ── Insertion map ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Insertions {
    blocks: BTreeMap<SlotKey, String>,
    origins: BTreeMap<SlotKey, Location>,
}

impl Insertions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_file(&mut self, path: &Path) -> Result<(), InsertionError> {
        let text = std::fs::read_to_string(path).map_err(|e| InsertionError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.parse_str(&text, &path.display().to_string());
        Ok(())
    }

    /// Capture the blocks of one insertion file. `origin` names the file in
    /// diagnostics.
    pub fn parse_str(&mut self, text: &str, origin: &str) {
        let mut key: Option<SlotKey> = None;
        for (idx, line) in text.split_inclusive('\n').enumerate() {
            if let Some(marker) = parse_marker(line) {
                self.origins
                    .entry(marker.clone())
                    .or_insert_with(|| Location::at(origin, idx as u32 + 1, 1));
                key = Some(marker);
                continue;
            }
            if let Some(k) = &key {
                self.blocks.entry(k.clone()).or_default().push_str(line);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SlotKey> {
        self.blocks.keys()
    }

    /// Warn about scoped keys whose type name the model does not define.
    pub fn validate(&self, model: &TypeModel) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        for key in self.origins.keys() {
            let Some(name) = &key.type_name else {
                continue;
            };
            if model.has_type_named(name) {
                continue;
            }
            let mut d = Diagnostic::warning(format!(
                "insertion key '{}' refers to unknown type '{}'",
                key, name
            ))
            .with_code(codes::W0001)
            .with_hint(format!(
                "declare '{}' in the schema or drop the '{}:' block",
                name, key
            ));
            if let Some(loc) = self.origins.get(key) {
                d = d.with_location(loc.clone());
            }
            diags.push(d);
        }
        diags
    }

    /// Raw captured text for `key`, without stripping.
    pub fn raw(&self, key: &SlotKey) -> Option<&str> {
        self.blocks.get(key).map(String::as_str)
    }

    /// Splice-ready text: a `// key:` header followed by the stripped block,
    /// indented for class bodies. Empty when nothing was captured.
    pub fn text(&self, key: &SlotKey) -> String {
        if key.kind == SlotKind::Ignore {
            return String::new();
        }
        let text = self
            .raw(key)
            .unwrap_or("")
            .trim_start_matches('\n')
            .trim_end_matches('\n');
        if text.is_empty() {
            return String::new();
        }
        let indent = if key.kind.in_class_body() { "  " } else { "" };
        format!("{}// {}:\n{}\n", indent, key, text)
    }
}
