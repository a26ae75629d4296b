mod oracle;
mod sample;

use clap::{Args, Parser, Subcommand};
use oracle::CommandOracle;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sample::{sample_params, sample_regime};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use vortex_core::{
    EquationParams, FallbackProposer, HallOfFame, LabConfig, OracleProposer, Orchestrator, Pacing,
    ParamProposer, PauseHandle, StopCause,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Propose, simulate and refute PDE hypotheses")]
struct Cli {
    /// Log level (error|warn|info|debug|trace); falls back to RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one refinement loop from the configured initial hypothesis
    Run {
        #[command(flatten)]
        common: CommonArgs,

        /// External oracle command (prompt on stdin, JSON reply on stdout)
        #[arg(long)]
        oracle_cmd: Option<String>,

        /// Output directory for iterations.jsonl, field.bin and hall_of_fame.json
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Run many loops from randomly sampled initial hypotheses
    Sweep {
        #[command(flatten)]
        common: CommonArgs,

        /// Output directory
        #[arg(long)]
        out: PathBuf,

        /// Number of loops
        #[arg(long, default_value_t = 20)]
        runs: usize,

        /// Base RNG seed (reproducibility)
        #[arg(long, default_value_t = 123)]
        seed: u64,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// JSON configuration file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the iteration cap
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Skip the pacing delays between phases
    #[arg(long)]
    fast: bool,
}

impl CommonArgs {
    fn load(&self) -> Result<LabConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => LabConfig::load(path)?,
            None => LabConfig::default(),
        };
        if let Some(cap) = self.max_iterations {
            config.max_iterations = cap;
        }
        if self.fast {
            config.pacing = Pacing::none();
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Serialize)]
struct SweepRow {
    run_idx: usize,
    base_seed: u64,
    run_seed: u64,
    regime: &'static str,
    initial_params: EquationParams,
    stop_cause: Option<StopCause>,
    iterations: u32,
    final_score: Option<f64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match cli.command {
        Command::Run {
            common,
            oracle_cmd,
            out,
        } => {
            let config = common.load()?;
            match oracle_cmd.as_deref().and_then(CommandOracle::parse) {
                Some(oracle) => {
                    log::info!("proposals from oracle command '{}'", oracle.program());
                    run_once(config, OracleProposer::new(oracle), out.as_deref())
                }
                None => run_once(config, FallbackProposer, out.as_deref()),
            }
        }
        Command::Sweep {
            common,
            out,
            runs,
            seed,
        } => sweep(common.load()?, &out, runs, seed),
    }
}

fn init_logging(level: Option<&str>) {
    let level = level
        .and_then(|l| l.parse::<log::LevelFilter>().ok())
        .or_else(|| std::env::var("RUST_LOG").ok().and_then(|v| v.parse().ok()))
        .unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(buf, "[{} {:5}] {}", buf.timestamp_seconds(), record.level(), record.args())
        })
        .init();
}

fn run_once<P: ParamProposer>(
    config: LabConfig,
    proposer: P,
    out: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = Orchestrator::new(config, proposer)?;
    let cause = lab.run_blocking(&PauseHandle::new(), |lab, report| {
        if let (Some(cause), Some(eval)) = (report.stopped, lab.current_evaluation()) {
            println!(
                "iteration {}: {} ({:.3})",
                report.iteration,
                cause.as_str(),
                eval.score
            );
        }
    })?;

    for entry in lab.logs().iter().rev() {
        println!(
            "  #{:<2} {:<20} score={:.3} decision={:<6} stable={} \
             D={:.4} omega={:.3} S={:.3} damping={:.4}",
            entry.iteration,
            entry.spec.name,
            entry.evaluation.score,
            entry.evaluation.decision.as_str(),
            entry.metrics.stable,
            entry.spec.params.diffusion,
            entry.spec.params.omega,
            entry.spec.params.source_amp,
            entry.spec.params.damping,
        );
    }
    println!(
        "Stopped: {}",
        cause.map(|c| c.as_str()).unwrap_or("paused")
    );

    if let Some(out) = out {
        fs::create_dir_all(out)?;

        let mut log_file = BufWriter::new(File::create(out.join("iterations.jsonl"))?);
        for entry in lab.logs().iter().rev() {
            serde_json::to_writer(&mut log_file, entry)?;
            log_file.write_all(b"\n")?;
        }
        log_file.flush()?;

        if let Some(field) = lab.current_field() {
            let mut field_file = BufWriter::new(File::create(out.join("field.bin"))?);
            write_f32_vec(&mut field_file, &field.to_f32())?;
            field_file.flush()?;
        }

        write_hall_of_fame(out, lab.hall_of_fame())?;
        println!("Wrote run to: {}", out.display());
    }
    Ok(())
}

fn sweep(
    config: LabConfig,
    out: &Path,
    runs: usize,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(out)?;
    let mut rows = BufWriter::new(File::create(out.join("sweep.jsonl"))?);
    let mut hall_of_fame = HallOfFame::default();
    let pause = PauseHandle::new();

    for run_idx in 0..runs {
        // Deterministic per-run seed
        let run_seed = seed ^ ((run_idx as u64).wrapping_mul(0x9E3779B97F4A7C15));
        let mut rng = ChaCha8Rng::seed_from_u64(run_seed);

        let regime = sample_regime(&mut rng);
        let initial_params = sample_params(&mut rng, regime);

        let run_config = LabConfig {
            initial_params,
            ..config.clone()
        };
        let mut lab = Orchestrator::new(run_config, FallbackProposer)?;
        let stop_cause = lab.run_blocking(&pause, |_, _| {})?;
        hall_of_fame.extend(lab.hall_of_fame().entries().iter().cloned().map(|mut e| {
            e.name = format!("run{run_idx}/{}", e.name);
            e
        }));

        let row = SweepRow {
            run_idx,
            base_seed: seed,
            run_seed,
            regime: regime.as_str(),
            initial_params,
            stop_cause,
            iterations: lab.iteration(),
            final_score: lab.current_evaluation().map(|e| e.score),
        };
        serde_json::to_writer(&mut rows, &row)?;
        rows.write_all(b"\n")?;
    }
    rows.flush()?;

    write_hall_of_fame(out, &hall_of_fame)?;

    println!("Wrote sweep to: {}", out.display());
    println!(
        "Runs: {} accepted: {} best: {}",
        runs,
        hall_of_fame.len(),
        hall_of_fame
            .best()
            .map(|e| format!("{} ({:.3})", e.name, e.score))
            .unwrap_or_else(|| "none".to_string())
    );
    Ok(())
}

fn write_hall_of_fame(
    out: &Path,
    hall_of_fame: &HallOfFame,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut w = BufWriter::new(File::create(out.join("hall_of_fame.json"))?);
    serde_json::to_writer_pretty(&mut w, hall_of_fame)?;
    w.flush()?;
    Ok(())
}

fn write_f32_vec<W: Write>(w: &mut W, v: &[f32]) -> std::io::Result<()> {
    for &x in v {
        w.write_all(&x.to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sweep_arguments() {
        let args = ["vortex", "sweep", "--out", "/tmp/x", "--runs", "3", "--fast"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Sweep { out, runs, seed, common } => {
                assert_eq!(out, PathBuf::from("/tmp/x"));
                assert_eq!(runs, 3);
                assert_eq!(seed, 123);
                assert!(common.fast);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let common = CommonArgs {
            config: None,
            max_iterations: Some(4),
            fast: true,
        };
        let config = common.load().unwrap();
        assert_eq!(config.max_iterations, 4);
        assert_eq!(config.pacing, Pacing::none());
        assert_eq!(config.grid.nx, 64);
    }

    #[test]
    fn field_is_written_little_endian() {
        let mut buf = Vec::new();
        write_f32_vec(&mut buf, &[1.0, -2.5]).unwrap();
        assert_eq!(buf.len(), 8);
        assert_eq!(&buf[..4], &1.0f32.to_le_bytes());
        assert_eq!(&buf[4..], &(-2.5f32).to_le_bytes());
    }
}
