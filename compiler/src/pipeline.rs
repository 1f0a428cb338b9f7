// pipeline.rs — Run orchestration: load, validate, generate, write
//
// Loads the schema and insertion files, reports load-time warnings, then runs
// the four emission passes in `ALL_ARTIFACTS` order over one shared
// `RunState` and writes each artifact next to the schema (or under the
// output directory).
//
// Preconditions: `config.idl_file` names the schema to load.
// Postconditions: on success all four artifacts were generated; `run` has
//                 also written them.
// Failure modes: unreadable/unresolvable schema, unreadable insertion file,
//                unwritable output file.
// Side effects: file writes; diagnostics are reported through `tracing`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

use crate::codegen::{self, RunState, StubInputs};
use crate::config::GeneratorConfig;
use crate::diag::Diagnostic;
use crate::identity::{Sha256Digest, SignatureDigest};
use crate::insertions::{InsertionError, Insertions};
use crate::model::TypeModel;
use crate::pass::{Artifact, ALL_ARTIFACTS};
use crate::schema::{self, SchemaError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Insertion(#[from] InsertionError),
    #[error("{}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One generated file, not yet written.
#[derive(Debug, Clone)]
pub struct GeneratedArtifact {
    pub artifact: Artifact,
    pub path: PathBuf,
    pub text: String,
}

#[derive(Debug)]
pub struct RunOutput {
    pub artifacts: Vec<GeneratedArtifact>,
    /// Load-time warnings, already reported.
    pub diagnostics: Vec<Diagnostic>,
}

// ── Generation ──────────────────────────────────────────────────────────────

/// Run all four passes in memory.
pub fn generate_all(
    model: &TypeModel,
    config: &GeneratorConfig,
    insertions: &Insertions,
    digest: &dyn SignatureDigest,
) -> Vec<GeneratedArtifact> {
    let inputs = StubInputs {
        model,
        config,
        insertions,
        digest,
    };
    let mut state = RunState::new();
    ALL_ARTIFACTS
        .iter()
        .map(|&artifact| {
            let start = Instant::now();
            let text = codegen::generate(inputs, artifact, &mut state);
            debug!(
                pass = artifact.name(),
                bytes = text.len(),
                elapsed_us = start.elapsed().as_micros() as u64,
                "generated"
            );
            GeneratedArtifact {
                artifact,
                path: config.output_path(artifact),
                text,
            }
        })
        .collect()
}

/// Load inputs and generate all artifacts without touching the filesystem
/// beyond reading.
pub fn generate(
    config: &GeneratorConfig,
    insertion_files: &[PathBuf],
) -> Result<RunOutput, PipelineError> {
    let start = Instant::now();
    let loaded = schema::load_file(&config.idl_file)?;
    debug!(
        types = loaded.model.impl_types().len(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "schema loaded"
    );

    let mut insertions = Insertions::new();
    for path in insertion_files {
        insertions.load_file(path)?;
        debug!(path = %path.display(), "insertions loaded");
    }

    let mut diagnostics = loaded.diagnostics;
    diagnostics.extend(insertions.validate(&loaded.model));
    let fallback = config.idl_file.display().to_string();
    for diag in &diagnostics {
        diag.report(&fallback);
    }

    let artifacts = generate_all(&loaded.model, config, &insertions, &Sha256Digest);
    Ok(RunOutput {
        artifacts,
        diagnostics,
    })
}

// ── Output ──────────────────────────────────────────────────────────────────

pub fn write_artifacts(artifacts: &[GeneratedArtifact]) -> Result<(), PipelineError> {
    for generated in artifacts {
        write_file(&generated.path, &generated.text)?;
        info!(
            artifact = generated.artifact.name(),
            path = %generated.path.display(),
            "wrote"
        );
    }
    Ok(())
}

fn write_file(path: &Path, text: &str) -> Result<(), PipelineError> {
    let wrap = |source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(wrap)?;
    }
    std::fs::write(path, text).map_err(wrap)
}

/// Generate and write all artifacts.
pub fn run(
    config: &GeneratorConfig,
    insertion_files: &[PathBuf],
) -> Result<RunOutput, PipelineError> {
    let output = generate(config, insertion_files)?;
    write_artifacts(&output.artifacts)?;
    Ok(output)
}
