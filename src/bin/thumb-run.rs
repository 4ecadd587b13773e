use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use thumb_rs::{
    assemble, program::parse_hex_program, CycleEvent, DryRunDevice, ExplorerConfig, Pipeline, PipelineError, Psr,
    StatusRecord,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Step a Thumb program through the three-stage pipeline against a dry-run device"
)]
struct Opts {
    /// Assembly source to assemble and run
    #[arg(long, conflicts_with = "hex")]
    source: Option<PathBuf>,
    /// Hex program (one word per line, as thumb-asm writes it)
    #[arg(long)]
    hex: Option<PathBuf>,
    /// Flags reported by the device, e.g. "nz" or "c"
    #[arg(long, default_value = "")]
    flags: String,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Stop after N cycles (default: config max_cycles)
    #[arg(long)]
    cycles: Option<u64>,
    /// Cycle on a timer (config cycle_interval_ms) until the program ends
    #[arg(long)]
    auto: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let cfg = match &opts.config {
        Some(path) => ExplorerConfig::load(path)?,
        None => ExplorerConfig::default(),
    };

    let words = match (&opts.source, &opts.hex) {
        (Some(src), _) => match assemble(&std::fs::read_to_string(src)?) {
            Ok(words) => words,
            Err(report) => {
                eprintln!("{report}");
                bail!("assembly failed with {} error(s)", report.error_count());
            }
        },
        (None, Some(hex)) => parse_hex_program(&std::fs::read_to_string(hex)?)?,
        (None, None) => bail!("one of --source or --hex is required"),
    };

    let mut pipe = Pipeline::new(DryRunDevice::new(), &cfg);
    pipe.cpu_mut().state.psr = Psr::from_letters(&opts.flags);
    pipe.connect()?;
    acknowledge(&mut pipe)?;
    pipe.load(words);
    let auto = opts.auto || cfg.auto_cycle;
    pipe.set_auto_cycle(auto);

    let limit = opts.cycles.unwrap_or(cfg.max_cycles);
    for n in 1..=limit {
        let step = if auto { pipe.tick() } else { pipe.cycle().map(Some) };
        let report = match step {
            Ok(Some(r)) => r,
            Ok(None) => break,
            Err(PipelineError::InvalidFetch { pc }) => {
                println!("{n:>5}  invalid fetch at {pc}");
                break;
            }
            Err(e) => return Err(e.into()),
        };
        println!(
            "{n:>5}  pc={:<4} fetch={:<16} decode={:<20} execute={}",
            report.pc, report.fetch, report.decode, report.execute
        );
        match report.event {
            CycleEvent::EndOfProgram => break,
            CycleEvent::Forwarded(_) => acknowledge(&mut pipe)?,
            CycleEvent::ForwardFailed { reason, .. } => bail!("forward failed: {reason}"),
            _ => {}
        }
        if auto {
            std::thread::sleep(cfg.cycle_interval());
        }
    }
    Ok(())
}

/// Play the device's reply: the current snapshot, completion last.
fn acknowledge(pipe: &mut Pipeline<DryRunDevice>) -> Result<()> {
    let state = pipe.cpu().state;
    for record in StatusRecord::snapshot(&state) {
        pipe.receive(&record.to_bytes())?;
    }
    Ok(())
}
