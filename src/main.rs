//! Command-line front end: read a PGM, filter it, write a PGM.

use std::error::Error as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;

use edgestag::config::{Config, ConfigError};
use edgestag::filters::edge::edges_with;
use edgestag::pgm::{self, PgmError, PgmFormat};
use edgestag::script::{Script, ScriptError, Session};
use edgestag::FilterError;

/// Grayscale kernel filtering and Canny-style edge detection for PGM images
#[derive(Parser, Debug)]
#[command(name = "edgestag")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input PGM image (P2 or P5)
    input: PathBuf,

    /// Output PGM image (default: <input stem>_out.pgm)
    output: Option<PathBuf>,

    /// Filter script to run instead of the edge pipeline
    #[arg(long, short)]
    script: Option<PathBuf>,

    /// Config file path
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Write binary P5 instead of the configured format
    #[arg(long)]
    binary: bool,

    /// Print the histogram of the result
    #[arg(long)]
    histogram: bool,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pgm(#[from] PgmError),
    #[error("script '{}': {source}", .path.display())]
    Script {
        path: PathBuf,
        #[source]
        source: ScriptError,
    },
    #[error("failed to read script '{}': {source}", .path.display())]
    ScriptIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// `dir/name.pgm` becomes `dir/name_out.pgm`.
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{}_out.pgm", stem))
}

fn run(args: &Args) -> Result<(), AppError> {
    let config = Config::load(args.config.as_deref())?;
    let image = pgm::read(&args.input)?;

    let result = match &args.script {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| AppError::ScriptIo {
                path: path.clone(),
                source: e,
            })?;
            let script_err = |source| AppError::Script {
                path: path.clone(),
                source,
            };
            let script = Script::parse(&text).map_err(script_err)?;
            log::info!("running {} command(s) from '{}'", script.len(), path.display());
            let mut session = Session::from_config(&config);
            script.run(&image, &mut session).map_err(script_err)?
        }
        None => {
            log::info!("running edge pipeline: {:?}", config.edges);
            edges_with(&image, &config.edges)?
        }
    };

    if args.histogram {
        for (value, count) in result.histogram()?.non_empty() {
            println!("{} {}", value, count);
        }
    }

    let format = if args.binary {
        PgmFormat::Binary
    } else {
        config.output.format
    };
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input));
    pgm::write(&result, &output, format)?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            let mut source = err.source();
            while let Some(cause) = source {
                log::error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
