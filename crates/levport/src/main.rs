use anyhow::{Context, Result, bail};
use clap::Parser;
use levport::{LevportConfig, run_batch, translate};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "levport",
    version,
    about = "Translate Lua dungeon-level descriptions into JavaScript modules"
)]
struct Cli {
    /// Lua file to translate, or the input directory with --batch
    input: PathBuf,

    /// Output file (stdout when omitted), or the output directory with --batch
    output: Option<PathBuf>,

    /// Translate every *.lua file directly inside INPUT
    #[arg(long)]
    batch: bool,

    /// TOML configuration file (default: ./levport.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Worker threads for --batch (default: one per core)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Print the batch report as JSON on stdout
    #[arg(long, requires = "batch")]
    json: bool,

    /// Raise the log level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("LEVPORT_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = LevportConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    if cli.batch {
        let Some(output_dir) = cli.output.as_deref() else {
            bail!("--batch needs an output directory");
        };
        if let Some(jobs) = cli.jobs {
            rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build_global()
                .context("failed to configure worker threads")?;
        }
        run_batch_mode(&cli.input, output_dir, &config, cli.json)
    } else {
        run_single(&cli.input, cli.output.as_deref(), &config)
    }
}

fn run_single(input: &Path, output: Option<&Path>, config: &LevportConfig) -> Result<ExitCode> {
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());

    let translation = translate(&source, &name, config);
    for diagnostic in translation.diagnostics.iter() {
        eprintln!("{}:{}", input.display(), diagnostic);
    }

    let Some(text) = translation.output else {
        return Ok(ExitCode::FAILURE);
    };
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{}", text),
    }
    Ok(ExitCode::SUCCESS)
}

fn run_batch_mode(
    input_dir: &Path,
    output_dir: &Path,
    config: &LevportConfig,
    json: bool,
) -> Result<ExitCode> {
    let report = run_batch(input_dir, output_dir, config)
        .with_context(|| format!("batch translation of {} failed", input_dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.format_text());
    }

    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
