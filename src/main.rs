use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tokio::io::AsyncBufReadExt;
use tokio::signal;

use txgraph::{config, metrics, pipeline, Pipeline};

const EMBEDDED_CONFIG: &str = include_str!("../config.toml");
const LOCAL_CONFIG: &str = "config.toml";

#[derive(Parser)]
#[command(author, version, about = "Rolling median degree of a sliding-window payment graph")]
struct Cli {
    /// TOML config; falls back to ./config.toml, then the built-in defaults
    #[arg(short, long)]
    config: Option<String>,

    /// Window length in seconds (overrides the config file)
    #[arg(long)]
    window: Option<i64>,

    /// Also print the current median for payments that fall outside the window
    #[arg(long, default_value_t = false)]
    emit_on_reject: bool,

    /// Suppress per-payment logs
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    metrics_bind: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Process a payment log and write one median per admitted payment
    Run {
        /// Input log, one JSON payment per line (`-` for stdin)
        #[arg(short, long)]
        input: String,
        /// Output file (`-` for stdout)
        #[arg(short, long, default_value = "-")]
        output: String,
    },
    /// Read payments from stdin until EOF or Ctrl-C, printing medians as they arrive
    Follow,
    /// Load and validate the configuration, then print it
    CheckConfig,
}

fn load_config(cli: &Cli) -> Result<config::Config> {
    let mut cfg = match &cli.config {
        Some(path) => config::load(path)?,
        // a present but broken ./config.toml is an error, not a reason to use defaults
        None if Path::new(LOCAL_CONFIG).exists() => config::load(LOCAL_CONFIG)?,
        None => config::load_from_str(EMBEDDED_CONFIG)
            .context("failed to load built-in configuration")?,
    };

    if let Some(secs) = cli.window {
        cfg.window.seconds = secs;
    }
    if cli.emit_on_reject {
        cfg.output.emit_on_reject = true;
    }
    if cli.quiet {
        cfg.log.quiet = true;
    }
    if let Some(bind) = &cli.metrics_bind {
        cfg.metrics.enabled = true;
        cfg.metrics.bind = bind.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn build_pipeline(cfg: &config::Config) -> Result<Pipeline> {
    let mut pipeline = Pipeline::from_config(cfg)?;
    if cfg.metrics.enabled {
        let m = metrics::Metrics::new()?;
        metrics::serve(&cfg.metrics.bind, m.clone())?;
        eprintln!("📊 Metrics on http://{}/metrics", cfg.metrics.bind);
        pipeline = pipeline.with_metrics(m);
    }
    Ok(pipeline)
}

fn open_input(path: &str) -> Result<Box<dyn BufRead>> {
    if path == "-" {
        if atty::is(atty::Stream::Stdin) {
            eprintln!("⌨️  Reading payments from the terminal (Ctrl-D to finish)");
        }
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).with_context(|| format!("🗂️  couldn’t open input {}", path))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: &str) -> Result<Box<dyn Write>> {
    if path == "-" {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    let file = File::create(path).with_context(|| format!("🗂️  couldn’t create output {}", path))?;
    Ok(Box::new(BufWriter::new(file)))
}

async fn follow(mut pipeline: Pipeline) -> Result<()> {
    if atty::is(atty::Stream::Stdin) {
        eprintln!("⌨️  Waiting for payments on stdin (Ctrl-C to stop)");
    }
    // split on raw bytes so a non-UTF-8 line is skipped instead of ending the stream
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).split(b'\n');
    let stdout = io::stdout();

    loop {
        tokio::select! {
            next = lines.next_segment() => {
                let Some(line) = next.context("failed to read stdin")? else { break };
                let outcome = pipeline.handle_bytes(&line);
                if let Some(median) = pipeline.output_for(&outcome) {
                    let mut out = stdout.lock();
                    writeln!(out, "{}", median)?;
                    out.flush()?;
                }
            },
            _ = signal::ctrl_c() => {
                eprintln!("🛑 Interrupted");
                break;
            }
        }
    }

    eprintln!("✅ {}", pipeline.stats().summary());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;
    pipeline::set_quiet_logging(cfg.log.quiet);

    match &cli.cmd {
        Cmd::Run { input, output } => {
            let mut pipeline = build_pipeline(&cfg)?;
            let reader = open_input(input)?;
            let writer = open_output(output)?;
            let stats = pipeline.run(reader, writer)?;
            eprintln!("✅ {}", stats.summary());
        }
        Cmd::Follow => {
            let pipeline = build_pipeline(&cfg)?;
            follow(pipeline).await?;
        }
        Cmd::CheckConfig => {
            let text = toml::to_string_pretty(&cfg).context("failed to render configuration")?;
            println!("{}", text);
            eprintln!("✅ Configuration OK (window {})", cfg.window_size()?);
        }
    }

    Ok(())
}
