//! Headless runner for the space-colonization core.
//!
//! Builds a growth field (fresh from a config, or resumed from a saved
//! record), steps it until nothing can grow or the step limit is hit, and
//! writes the resulting forest as JSON.
//!
//! Usage:
//!     sca-run [OPTIONS]
//!
//! Options:
//!     -c, --config <FILE>     JSON config (missing fields use defaults)
//!     -r, --resume <FILE>     Continue from a saved forest
//!     -n, --steps <N>         Maximum number of steps (default: 500)
//!     --seed <SEED>           RNG seed
//!     --planar | --volume     Force 2-D or 3-D growth
//!     -o, --out <FILE>        Where to write the forest (default: forest.json)
//!     -h, --help              Show this help message

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use sca_core::{Config, FieldRecord, GrowthField};
use thiserror::Error;

#[derive(Debug, Error)]
enum RunError {
    #[error("{0}")]
    Args(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Sim(#[from] sca_core::Error),
}

fn print_help() {
    eprintln!("sca-run - Space-colonization growth runner");
    eprintln!();
    eprintln!("Usage: sca-run [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("    -c, --config <FILE>     JSON config (missing fields use defaults)");
    eprintln!("    -r, --resume <FILE>     Continue from a saved forest");
    eprintln!("    -n, --steps <N>         Maximum number of steps (default: 500)");
    eprintln!("    --seed <SEED>           RNG seed");
    eprintln!("    --planar | --volume     Force 2-D or 3-D growth");
    eprintln!("    -o, --out <FILE>        Where to write the forest (default: forest.json)");
    eprintln!("    -h, --help              Show this help message");
    eprintln!();
    eprintln!("Example:");
    eprintln!("    sca-run --volume --seed 42 -n 300 -o tree.json");
    eprintln!("    RUST_LOG=debug sca-run -r tree.json -n 100 -o tree2.json");
}

#[derive(Debug, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    resume: Option<PathBuf>,
    steps: u64,
    seed: Option<u64>,
    planar: Option<bool>,
    out: PathBuf,
    help: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: None,
            resume: None,
            steps: 500,
            seed: None,
            planar: None,
            out: PathBuf::from("forest.json"),
            help: false,
        }
    }
}

fn parse_args(args: &[String]) -> Result<Args, RunError> {
    let mut parsed = Args::default();

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = || {
            i += 1;
            args.get(i)
                .cloned()
                .ok_or_else(|| RunError::Args(format!("Missing value for {flag}")))
        };

        match flag {
            "-h" | "--help" => parsed.help = true,
            "-c" | "--config" => parsed.config = Some(PathBuf::from(value()?)),
            "-r" | "--resume" => parsed.resume = Some(PathBuf::from(value()?)),
            "-n" | "--steps" => {
                let raw = value()?;
                parsed.steps = raw
                    .parse()
                    .map_err(|_| RunError::Args(format!("Invalid step count: {raw}")))?;
            }
            "--seed" => {
                let raw = value()?;
                parsed.seed = Some(
                    raw.parse()
                        .map_err(|_| RunError::Args(format!("Invalid seed: {raw}")))?,
                );
            }
            "--planar" => parsed.planar = Some(true),
            "--volume" => parsed.planar = Some(false),
            "-o" | "--out" => parsed.out = PathBuf::from(value()?),
            other => return Err(RunError::Args(format!("Unknown argument: {other}"))),
        }
        i += 1;
    }

    Ok(parsed)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, RunError> {
    let text = fs::read_to_string(path).map_err(|source| RunError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| RunError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), RunError> {
    let text = serde_json::to_string_pretty(value).map_err(|source| RunError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| RunError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn build_config(args: &Args) -> Result<Config, RunError> {
    let mut config = match &args.config {
        Some(path) => read_json(path)?,
        None => Config::default(),
    };
    if let Some(seed) = args.seed {
        config.rng_seed = Some(seed);
    }
    if let Some(planar) = args.planar {
        config.planar = planar;
    }
    Ok(config)
}

fn build_field(args: &Args, config: Config) -> Result<GrowthField, RunError> {
    let field = match &args.resume {
        Some(path) => {
            let record: FieldRecord = read_json(path)?;
            GrowthField::from_record(config, &record)?
        }
        None => GrowthField::initialize(config)?,
    };
    Ok(field)
}

fn run(args: &Args) -> Result<(), RunError> {
    let config = build_config(args)?;
    let mut field = build_field(args, config)?;

    let start = Instant::now();
    let mut steps = 0;
    while steps < args.steps && !field.is_finished() {
        field.step();
        steps += 1;
        if steps % 50 == 0 {
            log::info!(
                "step {steps}: {} tips, front {}",
                field.tips().len(),
                field.front_len()
            );
        }
    }

    let consumed = field
        .attractors()
        .iter()
        .filter(|a| !a.is_active())
        .count();
    log::info!(
        "Ran {steps} steps in {:.2}s: {} tips, {}/{} attractors consumed{}",
        start.elapsed().as_secs_f64(),
        field.tips().len(),
        consumed,
        field.attractors().len(),
        if field.is_finished() { ", finished" } else { "" }
    );

    write_json(&args.out, &field.export())?;
    log::info!("Wrote {}", args.out.display());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let raw: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    if args.help {
        print_help();
        return;
    }

    if let Err(e) = run(&args) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
