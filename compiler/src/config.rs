// config.rs — Generator configuration and output naming
//
// Collects everything a run needs besides the type model: backend options
// (`-G docs`, `-G macro=NAME`, `-G strip-path=PATH`, `-G property-list=off`),
// custom inclusions, and the output location. Derives the include-guard macro
// and the four artifact paths from the schema path.
//
// Preconditions: `idl_file` is non-empty.
// Postconditions: `cpp_macro()` is a valid C identifier fragment.
// Failure modes: none (unknown backend options are reported to the caller).
// Side effects: `idl_path()` consults the current directory for relative
//               schema paths.

use std::path::{Path, PathBuf};

use crate::pass::Artifact;

/// Default base class of servants without prerequisites.
pub const IMPLICIT_BASE: &str = "Aida::ImplicitBase";

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub idl_file: PathBuf,
    /// Emit doxygen blocks and cross references.
    pub gen_docs: bool,
    /// Include-guard macro override.
    pub cppmacro: Option<String>,
    /// Prefix removed from the schema path before deriving the macro.
    pub strip_path: Option<String>,
    /// Emit dynamic property access (`__access__`).
    pub property_list: bool,
    pub iface_base: String,
    /// Extra `#include` arguments, spelled with their delimiters.
    pub inclusions: Vec<String>,
    pub output_dir: Option<PathBuf>,
}

impl GeneratorConfig {
    pub fn new(idl_file: impl Into<PathBuf>) -> Self {
        GeneratorConfig {
            idl_file: idl_file.into(),
            gen_docs: false,
            cppmacro: None,
            strip_path: None,
            property_list: true,
            iface_base: IMPLICIT_BASE.to_string(),
            inclusions: Vec::new(),
            output_dir: None,
        }
    }

    /// Apply one `-G` option. Returns `false` for unrecognized options.
    pub fn apply_backend_option(&mut self, opt: &str) -> bool {
        if opt == "docs" {
            self.gen_docs = true;
        } else if let Some(name) = opt.strip_prefix("macro=") {
            self.cppmacro = Some(name.to_string());
        } else if let Some(path) = opt.strip_prefix("strip-path=") {
            self.strip_path = Some(path.to_string());
        } else if let Some(value) = opt.strip_prefix("property-list=") {
            let off = matches!(
                value.to_ascii_lowercase().as_str(),
                "0" | "no" | "none" | "false"
            );
            self.property_list = !off;
        } else {
            return false;
        }
        true
    }

    /// Absolute schema path with the strip-path prefix removed.
    pub fn idl_path(&self) -> String {
        let apath = absolute(&self.idl_file);
        let Some(strip) = self.strip_path.as_deref().filter(|s| !s.is_empty()) else {
            return apath;
        };
        for prefix in [strip.to_string(), absolute(Path::new(strip))] {
            if let Some(rest) = apath.strip_prefix(prefix.as_str()) {
                return rest.strip_prefix('/').unwrap_or(rest).to_string();
            }
        }
        apath
    }

    /// Include-guard macro: the override, or the schema path with every
    /// character outside `[A-Za-z0-9_]` (and a leading digit) turned into `_`.
    pub fn cpp_macro(&self) -> String {
        match &self.cppmacro {
            Some(m) => m.clone(),
            None => macro_from_path(&self.idl_path()),
        }
    }

    /// Schema path without its last extension, re-rooted under the output
    /// directory.
    pub fn base_path(&self) -> PathBuf {
        let stem = self.idl_file.with_extension("");
        match &self.output_dir {
            Some(dir) => match stem.file_name() {
                Some(name) => dir.join(name),
                None => dir.clone(),
            },
            None => stem,
        }
    }

    pub fn output_path(&self, artifact: Artifact) -> PathBuf {
        let mut s = self.base_path().into_os_string();
        s.push(artifact.suffix());
        PathBuf::from(s)
    }

    /// File name of an artifact, as used in `#include "…"` lines.
    pub fn output_file_name(&self, artifact: Artifact) -> String {
        let path = self.output_path(artifact);
        match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => path.display().to_string(),
        }
    }
}

fn absolute(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

fn macro_from_path(path: &str) -> String {
    path.chars()
        .enumerate()
        .map(|(i, c)| {
            let ok = c.is_ascii_alphabetic() || c == '_' || (i > 0 && c.is_ascii_digit());
            if ok {
                c
            } else {
                '_'
            }
        })
        .collect()
}
