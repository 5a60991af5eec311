use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use tailorcheck::records::{Entry, EntryError};
use tailorcheck::xref::{HttpTransport, IdResolver, XrefError};
use tailorcheck::{ConfigError, Validator, ValidatorConfig};

/// Clean and validate reaction entry files.
#[derive(Parser, Debug)]
#[command(name = "tailorcheck", version)]
struct Args {
    /// Directory of `*.json` entry files
    #[arg(short, long)]
    input_dir: PathBuf,

    /// Where cleaned entries are written; nothing is written if absent
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Complete GenPept/UniProt accessions through the UniProt endpoint
    #[arg(long)]
    resolve_ids: bool,

    /// JSON file with validator settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum FileError {
    #[error("cannot read or write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid entry JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Entry(#[from] EntryError),
}

#[derive(Debug, Error)]
enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Xref(#[from] XrefError),
    #[error("cannot list {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            tracing::error!(failed, "some entries failed validation");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "aborted");
            ExitCode::FAILURE
        }
    }
}

/// Returns the number of files that failed.
fn run(args: &Args) -> Result<usize, SetupError> {
    let config = match &args.config {
        Some(path) => ValidatorConfig::from_json_file(path)?,
        None => ValidatorConfig::default(),
    };
    let resolver = if args.resolve_ids {
        Some(IdResolver::<HttpTransport>::from_config(&config.xref)?)
    } else {
        None
    };
    let validator = Validator::new(config);

    let files = entry_files(&args.input_dir).map_err(|source| SetupError::Io {
        path: args.input_dir.clone(),
        source,
    })?;
    tracing::info!(files = files.len(), dir = %args.input_dir.display(), "validating entries");

    let mut failed = 0;
    for path in &files {
        match process(path, &validator, resolver.as_ref(), args.output_dir.as_deref()) {
            Ok(()) => tracing::info!(file = %path.display(), "ok"),
            Err(e) => {
                failed += 1;
                tracing::error!(file = %path.display(), error = %e, "validation failed");
            }
        }
    }
    Ok(failed)
}

fn entry_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> FileError {
    let path = path.to_path_buf();
    move |source| FileError::Io { path, source }
}

fn process(
    path: &Path,
    validator: &Validator,
    resolver: Option<&IdResolver<HttpTransport>>,
    output_dir: Option<&Path>,
) -> Result<(), FileError> {
    let text = fs::read_to_string(path).map_err(io_err(path))?;
    let mut entry: Entry = serde_json::from_str(&text).map_err(|source| FileError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    entry.clean();
    if let (Some(resolver), Some(enzyme)) = (resolver, entry.enzyme.as_mut()) {
        resolver.resolve_ids(&mut enzyme.database_ids);
    }
    entry.validate(validator)?;

    if let Some(dir) = output_dir {
        let Some(name) = path.file_name() else {
            return Ok(());
        };
        let out = dir.join(name);
        let json = serde_json::to_string_pretty(&entry).map_err(|source| FileError::Json {
            path: out.clone(),
            source,
        })?;
        fs::create_dir_all(dir).map_err(io_err(dir))?;
        fs::write(&out, json + "\n").map_err(io_err(&out))?;
    }
    Ok(())
}
