use clap::Parser;
use std::path::PathBuf;

use cxxstub::config::GeneratorConfig;
use cxxstub::pipeline;

#[derive(Parser, Debug)]
#[command(
    name = "cxxstub",
    version,
    about = "C++ stub generator — emits servant interfaces and remote handles from an IDL schema"
)]
struct Cli {
    /// Input IDL schema (JSON); exactly one is required
    files: Vec<PathBuf>,

    /// Output directory for the generated files
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Backend option: docs, macro=NAME, strip-path=PATH, property-list=off (repeatable)
    #[arg(short = 'G', long = "backend-option")]
    backend_option: Vec<String>,

    /// Insertion file with marker-delimited code blocks (repeatable)
    #[arg(short = 'x', long = "insertions")]
    insertions: Vec<PathBuf>,

    /// Extra #include argument, spelled with delimiters, e.g. '<bse/utils.hh>' (repeatable)
    #[arg(long)]
    include: Vec<String>,

    /// Print generator phases and timing
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new(default)
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.files.len() != 1 {
        let program = std::env::args().next().unwrap_or_else(|| "cxxstub".to_string());
        eprintln!("{}: exactly one IDL input file is required", program);
        std::process::exit(127);
    }

    let mut config = GeneratorConfig::new(cli.files[0].clone());
    for opt in &cli.backend_option {
        if !config.apply_backend_option(opt) {
            tracing::warn!("ignoring unknown backend option: {}", opt);
        }
    }
    config.inclusions = cli.include.clone();
    config.output_dir = cli.output.clone();

    if cli.verbose {
        tracing::debug!(schema = %config.idl_file.display(), macro_name = %config.cpp_macro(), "configured");
    }

    match pipeline::run(&config, &cli.insertions) {
        Ok(output) => {
            if cli.verbose {
                for a in &output.artifacts {
                    eprintln!("cxxstub: wrote {}", a.path.display());
                }
            }
        }
        Err(e) => {
            eprintln!("cxxstub: error: {}", e);
            std::process::exit(1);
        }
    }
}
