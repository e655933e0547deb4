//! basic — run replicates of the HIV agent-based model and write CSV output.
//!
//! ```text
//! cargo run --release -p basic -- --params demos/basic/params.json --replicates 4
//! ```
//!
//! Each replicate writes `step_summaries.csv`, `edges.csv` and
//! `components.csv` under `<output>/r<replicate>/`.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use log::LevelFilter;
use log4rs::Config;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;

use hv_core::{Params, Tick};
use hv_output::{CsvWriter, OutputError, SimOutputObserver};
use hv_sim::{SimObserver, StepReport, SummaryRecorder, run_replicates};

// ISO 8601 timestamp, colour-coded level, target.
const LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "basic", about = "Run the HIV agent-based model")]
struct Args {
    /// JSON parameter file; built-in defaults when omitted.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Number of independent replicates.
    #[arg(long, default_value_t = 1)]
    replicates: usize,

    /// Output directory.
    #[arg(long, default_value = "output/basic")]
    output: PathBuf,

    /// Override `sizing.n_pop`.
    #[arg(long)]
    n_pop: Option<usize>,

    /// Override `sizing.tmax`.
    #[arg(long)]
    tmax: Option<u32>,

    /// Dump edges and components every N steps (0 disables).
    #[arg(long, default_value_t = 12)]
    dump_every: u32,

    /// off, error, warn, info, debug or trace.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: LevelFilter) -> Result<()> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .context("building log config")?;
    log4rs::init_config(config).context("installing logger")?;
    Ok(())
}

// ── Observer ──────────────────────────────────────────────────────────────────

/// CSV output plus an in-memory summary trace for the closing table.
struct ReplicateObserver {
    output:   Result<SimOutputObserver<CsvWriter>, OutputError>,
    recorder: SummaryRecorder,
}

impl ReplicateObserver {
    fn new(args: &Args, r: usize) -> Self {
        let dir = args.output.join(format!("r{r}"));
        let output = CsvWriter::new(&dir)
            .map(|w| SimOutputObserver::new(w, r).with_network_dumps(args.dump_every));
        Self { output, recorder: SummaryRecorder::new() }
    }
}

impl SimObserver for ReplicateObserver {
    fn on_step(&mut self, report: &StepReport<'_>) {
        self.recorder.on_step(report);
        if let Ok(out) = &mut self.output {
            out.on_step(report);
        }
    }

    fn on_sim_end(&mut self, final_tick: Tick) {
        if let Ok(out) = &mut self.output {
            out.on_sim_end(final_tick);
        }
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    let level: LevelFilter = args
        .log_level
        .parse()
        .map_err(|_| anyhow!("unknown log level `{}`", args.log_level))?;
    init_logging(level)?;

    let mut params = match &args.params {
        Some(path) => Params::from_json_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Params::default(),
    };
    if let Some(n) = args.n_pop {
        params.sizing.n_pop = n;
    }
    if let Some(t) = args.tmax {
        params.sizing.tmax = t;
    }
    params.validate().context("invalid parameters")?;
    if args.replicates == 0 {
        bail!("--replicates must be at least 1");
    }

    log::info!(
        "{} replicates: n_pop {}, burn-in {} months, {} main steps",
        args.replicates,
        params.sizing.n_pop,
        params.sizing.burn_duration,
        params.sizing.tmax
    );

    let t0 = Instant::now();
    let results = run_replicates(&params, args.replicates, |r| ReplicateObserver::new(&args, r));
    let elapsed = t0.elapsed();

    println!();
    println!(
        "{:<6} {:>8} {:>8} {:>10} {:>8} {:>8} {:>8} {:>8}",
        "Rep", "Agents", "HIV+", "Prevalence", "HAART", "PrEP", "Incar", "Infect."
    );
    println!("{}", "-".repeat(72));

    let mut failed = 0;
    for (r, result) in results.into_iter().enumerate() {
        let mut obs = match result {
            Ok(obs) => obs,
            Err(e) => {
                log::error!("replicate {r}: {e}");
                failed += 1;
                continue;
            }
        };
        match &mut obs.output {
            Ok(out) => {
                if let Some(e) = out.take_error() {
                    log::error!("replicate {r}: output error: {e}");
                }
            }
            Err(e) => log::error!("replicate {r}: could not open output: {e}"),
        }

        let infections: usize = obs.recorder.steps.iter().map(|s| s.new_infections).sum();
        if let Some(last) = obs.recorder.last() {
            let prevalence = if last.n_pop == 0 { 0.0 } else { last.hiv as f64 / last.n_pop as f64 };
            println!(
                "{:<6} {:>8} {:>8} {:>10.4} {:>8} {:>8} {:>8} {:>8}",
                r, last.n_pop, last.hiv, prevalence, last.haart, last.prep, last.incar, infections
            );
        }
    }
    println!();
    println!("Completed in {:.2} s; output in {}", elapsed.as_secs_f64(), args.output.display());

    if failed > 0 {
        bail!("{failed} of {} replicates failed", args.replicates);
    }
    Ok(())
}
