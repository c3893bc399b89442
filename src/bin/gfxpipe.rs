use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use gfxpipe::script::Script;
use gfxpipe::{GfxConfig, PipeRegistry};

#[derive(Parser, Debug)]
#[command(name = "gfxpipe", version)]
struct Cli {
    /// Log pipe validation and retries to stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the selected pipes after each state-changing script step, one JSON object per line.
    Probe(ProbeArgs),
    /// Run a drawing script and write the target as a PNG.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Input script JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Pipeline config JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input script JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Pipeline config JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::DEBUG)
            .init();
    }
    match cli.cmd {
        Command::Probe(args) => cmd_probe(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn registry(config: Option<&PathBuf>) -> anyhow::Result<Arc<PipeRegistry>> {
    let cfg = match config {
        Some(path) => GfxConfig::from_json_path(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => GfxConfig::default(),
    };
    Ok(Arc::new(PipeRegistry::builder(cfg).build()?))
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let script = Script::from_path(&args.in_path)?;
    let registry = registry(args.config.as_ref())?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    script
        .run_with(registry, |step, cmd, ctx| {
            if !cmd.is_state_change() {
                return Ok(());
            }
            let pipes = ctx.validated_pipes()?;
            let line = serde_json::json!({ "step": step, "command": cmd, "pipes": pipes });
            writeln!(out, "{line}").map_err(|e| gfxpipe::GfxError::Other(e.into()))
        })
        .with_context(|| format!("probe '{}'", args.in_path.display()))?;
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let script = Script::from_path(&args.in_path)?;
    let registry = registry(args.config.as_ref())?;
    let target = script
        .run(registry)
        .with_context(|| format!("render '{}'", args.in_path.display()))?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    target
        .write_png(&args.out)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
