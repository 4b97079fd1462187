use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use farm_control::{AutopilotController, IntentSource};
use farm_core::metrics::{append_metrics_row, write_metrics_header};
use farm_core::{compute_metrics, FarmSession, GameContent, GameState, Intent, Millis};
use farm_world::{build_initial_state, load_content, load_state};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "farm_cli", about = "Headless farm simulation runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the farm with the autopilot for a span of virtual time.
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Virtual seconds to simulate.
    #[arg(long)]
    seconds: u64,
    /// Virtual milliseconds per tick.
    #[arg(long, default_value_t = 100)]
    step_ms: u64,
    /// RNG seed for harvest rolls. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Resume from a saved snapshot instead of a fresh farm.
    #[arg(long = "state")]
    state_file: Option<PathBuf>,
    /// Write the final snapshot here.
    #[arg(long)]
    save: Option<PathBuf>,
    #[arg(long, default_value = "./content")]
    content_dir: String,
    /// Print a status line every N virtual seconds.
    #[arg(long, default_value_t = 60)]
    print_every: u64,
    /// Sample metrics every N virtual seconds.
    #[arg(long, default_value_t = 10)]
    metrics_every: u64,
    /// Disable automatic metrics collection to runs/ directory.
    #[arg(long)]
    no_metrics: bool,
}

// ---------------------------------------------------------------------------
// Run directory
// ---------------------------------------------------------------------------

fn generate_run_id(seed: u64) -> String {
    let started = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    format!("{started}_seed{seed}")
}

fn create_run_dir(run_id: &str) -> Result<PathBuf> {
    let dir = PathBuf::from("runs").join(run_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating run directory: {}", dir.display()))?;
    Ok(dir)
}

fn write_run_info(
    dir: &Path,
    run_id: &str,
    seed: u64,
    args: &RunArgs,
    content_version: &str,
) -> Result<()> {
    let info = serde_json::json!({
        "run_id": run_id,
        "seed": seed,
        "content_version": content_version,
        "runner": "farm_cli",
        "args": {
            "seconds": args.seconds,
            "step_ms": args.step_ms,
            "print_every": args.print_every,
            "metrics_every": args.metrics_every,
        }
    });
    let path = dir.join("run_info.json");
    let file =
        std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, &info)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Streams metrics rows to `metrics.csv` in a run directory.
struct MetricsFile {
    writer: BufWriter<std::fs::File>,
}

impl MetricsFile {
    fn create(dir: &Path) -> Result<Self> {
        let path = dir.join("metrics.csv");
        let file =
            std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        write_metrics_header(&mut writer).context("writing metrics header")?;
        Ok(Self { writer })
    }

    fn write_row(&mut self, state: &GameState, content: &GameContent, now: Millis) -> Result<()> {
        let snapshot = compute_metrics(state, content, now);
        append_metrics_row(&mut self.writer, &snapshot).context("writing metrics row")
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("final metrics flush")
    }
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

fn run(args: &RunArgs) -> Result<()> {
    let content = load_content(&args.content_dir)?;
    let seed = args.seed.unwrap_or_else(rand::random);

    // Virtual time starts at zero for fresh farms and at the last save
    // for resumed ones, so timers inside the snapshot stay meaningful.
    let state = match &args.state_file {
        Some(path) => load_state(path, &content, 0)?,
        None => build_initial_state(&content, 0),
    };
    let start = state.last_save_time;
    let end = start + args.seconds * 1_000;
    let step = args.step_ms.max(1);

    let mut metrics = None;
    if !args.no_metrics {
        let run_id = generate_run_id(seed);
        let run_dir = create_run_dir(&run_id)?;
        write_run_info(&run_dir, &run_id, seed, args, &content.content_version)?;
        metrics = Some(MetricsFile::create(&run_dir)?);
        println!("Run directory: {}", run_dir.display());
    }

    println!(
        "Starting simulation: seconds={} step_ms={step} seed={seed} plots={} content_version={}",
        args.seconds,
        state.plots.len(),
        content.content_version,
    );
    println!("{}", "-".repeat(80));

    let mut session = FarmSession::new(content, state, ChaCha8Rng::seed_from_u64(seed));
    let mut autopilot = AutopilotController::default();
    let print_every = args.print_every.max(1) * 1_000;
    let metrics_every = args.metrics_every.max(1) * 1_000;

    let mut now = start;
    while now < end {
        now = (now + step).min(end);
        let intents = autopilot.generate_intents(session.state(), session.content(), now);
        for intent in &intents {
            match session.apply_intent(intent, now) {
                Ok(outcome) if outcome.applied => {
                    if let Intent::PurchaseTech { tech_id } = intent {
                        println!("*** TECH UNLOCKED: {tech_id} at t={} ***", clock(now - start));
                    }
                }
                Ok(_) => {}
                Err(err) => println!("  rejected {intent:?}: {err}"),
            }
        }

        let report = session.tick(now);
        for achievement in &report.achievements {
            println!("*** ACHIEVEMENT: {achievement} at t={} ***", clock(now - start));
        }

        let elapsed = now - start;
        if elapsed % print_every == 0 {
            print_status(session.state(), elapsed);
        }
        if let Some(file) = metrics.as_mut() {
            if elapsed % metrics_every == 0 {
                file.write_row(session.state(), session.content(), now)?;
            }
        }
    }

    println!("{}", "-".repeat(80));
    println!("Done. Final state at t={}:", clock(now - start));
    print_status(session.state(), now - start);

    if let Some(file) = metrics.as_mut() {
        file.flush()?;
        println!("Metrics written to runs/ directory.");
    }

    if let Some(path) = &args.save {
        let snapshot = session.snapshot_for_save(now);
        let json = serde_json::to_string_pretty(&snapshot).context("serializing snapshot")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("Saved to {}", path.display());
    }

    Ok(())
}

/// `mm:ss` of virtual play.
fn clock(elapsed_ms: Millis) -> String {
    let secs = elapsed_ms / 1_000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn print_status(state: &GameState, elapsed_ms: Millis) {
    let r = &state.resources;
    let growing = state
        .plots
        .iter()
        .filter(|p| matches!(p.contents, farm_core::PlotContents::Crop { .. }))
        .count();
    println!(
        "[t={t}]  gold={gold:.0}  seeds={seeds:.0}  water={water:.0}  research={research:.0}  \
         crops={growing:2}  harvested={harvested}  techs={techs}  achievements={achievements}",
        t = clock(elapsed_ms),
        gold = r.gold,
        seeds = r.seeds,
        water = r.water,
        research = r.research,
        harvested = state.total_harvested,
        techs = state.techs.len(),
        achievements = state.achievements.len(),
    );
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(&args)?,
    }
    Ok(())
}
