// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;
mod output;

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use sweep_app::{init_logging, ConfigFile};
use sweep_core::{
    DynResult, FileSource, FrequencyRange, SweepSession, SweepSink, SyntheticSource,
    TransferSource,
};

use config::{CliConfig, OutputFormat, SourceKind};
use output::SweepWriter;

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - wideband spectrum sweeper");
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// Frequency range in MHz as <min>:<max>; repeat for several ranges
    #[arg(short = 'f', long = "freq", value_name = "MIN:MAX")]
    freq: Vec<FrequencyRange>,
    /// FFT bin width in Hz
    #[arg(short = 'w', long = "bin-width", value_name = "HZ")]
    bin_width: Option<u32>,
    /// Samples per hop, a multiple of 8192
    #[arg(short = 'n', long = "num-samples")]
    num_samples: Option<u32>,
    /// IF (LNA) gain, 0-40 dB in 8 dB steps
    #[arg(short = 'l', long = "lna-gain", value_name = "DB")]
    lna_gain: Option<u32>,
    /// Baseband (VGA) gain, 0-62 dB in 2 dB steps
    #[arg(short = 'g', long = "vga-gain", value_name = "DB")]
    vga_gain: Option<u32>,
    /// RF amplifier (1 on, 0 off)
    #[arg(short = 'a', long = "amp", value_parser = clap::value_parser!(u8).range(0..=1))]
    amp: Option<u8>,
    /// Antenna port power (1 on, 0 off)
    #[arg(short = 'p', long = "antenna-power", value_parser = clap::value_parser!(u8).range(0..=1))]
    antenna_power: Option<u8>,
    /// Stop after a single sweep
    #[arg(short = '1', long = "one-shot")]
    one_shot: bool,
    /// Stop after this many sweeps
    #[arg(short = 'N', long = "num-sweeps")]
    num_sweeps: Option<u64>,
    /// Write binary records instead of text
    #[arg(short = 'B', long = "binary")]
    binary: bool,
    /// Output file ("-" for stdout)
    #[arg(short = 'r', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,
    /// Transfer source
    #[arg(long = "source", value_enum)]
    source: Option<SourceKind>,
    /// Recording to replay with --source file
    #[arg(long = "input", value_name = "FILE")]
    input: Option<PathBuf>,
    /// SoapySDR device arguments
    #[arg(long = "args")]
    args: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

/// Apply command line overrides on top of the loaded configuration.
fn resolve_config(cli: &Cli, mut cfg: CliConfig) -> DynResult<CliConfig> {
    if !cli.freq.is_empty() {
        cfg.sweep.ranges = cli.freq.clone();
    }
    if let Some(bin_width) = cli.bin_width {
        cfg.sweep.bin_width_hz = bin_width;
    }
    if let Some(samples) = cli.num_samples {
        cfg.sweep.samples_per_block = samples;
    }
    if let Some(lna) = cli.lna_gain {
        cfg.sweep.lna_gain = lna;
    }
    if let Some(vga) = cli.vga_gain {
        cfg.sweep.vga_gain = vga;
    }
    if let Some(amp) = cli.amp {
        cfg.sweep.amp = amp == 1;
    }
    if let Some(power) = cli.antenna_power {
        cfg.sweep.antenna_power = power == 1;
    }

    if cli.one_shot && cli.num_sweeps.is_some() {
        return Err("--one-shot and --num-sweeps are mutually exclusive".into());
    }
    if cli.one_shot {
        cfg.sweep.max_sweeps = Some(1);
    } else if let Some(n) = cli.num_sweeps {
        if n == 0 {
            return Err("--num-sweeps must be at least 1".into());
        }
        cfg.sweep.max_sweeps = Some(n);
    }

    if cli.binary {
        cfg.output.format = OutputFormat::Binary;
    }
    if let Some(ref path) = cli.output {
        cfg.output.path = Some(path.clone());
    }

    if let Some(kind) = cli.source {
        cfg.source.kind = kind;
    }
    if let Some(ref input) = cli.input {
        cfg.source.path = Some(input.clone());
        if cli.source.is_none() {
            cfg.source.kind = SourceKind::File;
        }
    }
    if let Some(ref args) = cli.args {
        cfg.source.args = args.clone();
    }
    if let Some(ref level) = cli.log_level {
        cfg.general.log_level = Some(level.clone());
    }

    cfg.validate()
        .map_err(|e| format!("Invalid sweep-rs configuration: {}", e))?;
    Ok(cfg)
}

fn build_source(cfg: &CliConfig) -> DynResult<Box<dyn TransferSource>> {
    match cfg.source.kind {
        SourceKind::Synthetic => {
            let source = SyntheticSource::new(&cfg.sweep)?
                .with_tones(cfg.source.tones.clone())
                .with_noise(cfg.source.noise)
                .realtime(cfg.source.realtime);
            info!("Synthetic source ({} hops per pass)", source.hops().len());
            Ok(Box::new(source))
        }
        SourceKind::File => {
            let path = cfg
                .source
                .path
                .as_ref()
                .ok_or("[source].path must be set for the file source")?;
            let source = FileSource::open(path)
                .map_err(|e| format!("Cannot open recording {}: {}", path.display(), e))?;
            info!("Replaying transfers from {}", path.display());
            Ok(Box::new(source))
        }
        SourceKind::Soapysdr => build_soapysdr_source(cfg),
    }
}

#[cfg(feature = "soapysdr")]
fn build_soapysdr_source(cfg: &CliConfig) -> DynResult<Box<dyn TransferSource>> {
    let settings =
        sweep_backend_soapysdr::DeviceSettings::from_config(&cfg.source.args, &cfg.sweep)?;
    let source = sweep_backend_soapysdr::SoapySdrSource::open(settings)?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "soapysdr"))]
fn build_soapysdr_source(_cfg: &CliConfig) -> DynResult<Box<dyn TransferSource>> {
    Err("SoapySDR support is not compiled in (rebuild with --features soapysdr)".into())
}

fn build_sink(cfg: &CliConfig) -> DynResult<Box<dyn SweepSink>> {
    let format = cfg.output.format;
    match cfg.output.file() {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| format!("Cannot create output {}: {}", path.display(), e))?;
            info!("Writing {:?} output to {}", format, path.display());
            Ok(Box::new(SweepWriter::new(BufWriter::new(file), format)))
        }
        None => Ok(Box::new(SweepWriter::new(
            BufWriter::new(io::stdout()),
            format,
        ))),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> DynResult<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", CliConfig::example_combined_toml());
        return Ok(());
    }

    let (cfg, config_path) = if let Some(ref path) = cli.config {
        let cfg = CliConfig::load_from_file(path)?;
        (cfg, Some(path.clone()))
    } else {
        CliConfig::load_from_default_paths()?
    };
    let cfg = resolve_config(&cli, cfg)?;

    init_logging(cfg.general.log_level.as_deref());

    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let source = build_source(&cfg)?;
    let sink = build_sink(&cfg)?;
    let mut session = SweepSession::start(cfg.sweep.clone(), source, sink)?;

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut status = tokio::time::interval(STATUS_POLL_INTERVAL);
    let mut interrupted = false;

    while !session.is_finished() {
        tokio::select! {
            res = &mut ctrl_c, if !interrupted => {
                if let Err(e) = res {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                } else {
                    info!("Caught interrupt, stopping sweep");
                }
                interrupted = true;
                session.stop();
            }
            _ = status.tick() => {}
        }
    }

    session.wait()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["sweep-rs"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_pass_through() {
        let cfg = resolve_config(&cli(&[]), CliConfig::default()).unwrap();
        assert_eq!(cfg.sweep.ranges, vec![FrequencyRange::new(0, 6000)]);
        assert_eq!(cfg.sweep.max_sweeps, None);
        assert_eq!(cfg.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_sweep_flags_override_config() {
        let args = cli(&[
            "-f", "2400:2500", "-f", "5700:5900", "-w", "250000", "-l", "24", "-g", "30", "-a",
            "1", "-p", "0", "-N", "5", "-B", "-r", "out.bin",
        ]);
        let cfg = resolve_config(&args, CliConfig::default()).unwrap();
        assert_eq!(
            cfg.sweep.ranges,
            vec![FrequencyRange::new(2400, 2500), FrequencyRange::new(5700, 5900)]
        );
        assert_eq!(cfg.sweep.bin_width_hz, 250_000);
        assert_eq!(cfg.sweep.lna_gain, 24);
        assert_eq!(cfg.sweep.vga_gain, 30);
        assert!(cfg.sweep.amp);
        assert!(!cfg.sweep.antenna_power);
        assert_eq!(cfg.sweep.max_sweeps, Some(5));
        assert_eq!(cfg.output.format, OutputFormat::Binary);
        assert_eq!(cfg.output.file(), Some(&PathBuf::from("out.bin")));
    }

    #[test]
    fn test_one_shot() {
        let cfg = resolve_config(&cli(&["-1"]), CliConfig::default()).unwrap();
        assert_eq!(cfg.sweep.max_sweeps, Some(1));
        assert!(resolve_config(&cli(&["-1", "-N", "3"]), CliConfig::default()).is_err());
        assert!(resolve_config(&cli(&["-N", "0"]), CliConfig::default()).is_err());
    }

    #[test]
    fn test_input_selects_file_source() {
        let cfg = resolve_config(&cli(&["--input", "capture.bin"]), CliConfig::default()).unwrap();
        assert_eq!(cfg.source.kind, SourceKind::File);
        assert_eq!(cfg.source.path, Some(PathBuf::from("capture.bin")));
    }

    #[test]
    fn test_invalid_override_rejected() {
        assert!(resolve_config(&cli(&["-l", "41"]), CliConfig::default()).is_err());
        assert!(resolve_config(&cli(&["-f", "100:7300"]), CliConfig::default()).is_err());
        assert!(Cli::try_parse_from(["sweep-rs", "-a", "2"]).is_err());
        assert!(Cli::try_parse_from(["sweep-rs", "-f", "2400-2500"]).is_err());
    }

    #[test]
    fn test_replay_to_file() {
        let recording = tempfile::NamedTempFile::new().unwrap();
        let output = tempfile::NamedTempFile::new().unwrap();
        {
            let mut cfg = CliConfig::default();
            cfg.sweep.ranges = vec![FrequencyRange::new(0, 40)];
            let mut source = SyntheticSource::new(&cfg.sweep).unwrap();
            let mut buf = vec![0u8; 16 * 16384];
            source.read_transfer(&mut buf).unwrap();
            std::fs::write(recording.path(), &buf).unwrap();
        }

        let path = output.path().to_str().unwrap().to_string();
        let input = recording.path().to_str().unwrap().to_string();
        let args = cli(&["-f", "0:40", "--input", &input, "-r", &path]);
        let cfg = resolve_config(&args, CliConfig::default()).unwrap();

        let source = build_source(&cfg).unwrap();
        let sink = build_sink(&cfg).unwrap();
        let mut session = SweepSession::start(cfg.sweep.clone(), source, sink).unwrap();
        let report = session.wait().unwrap();
        assert_eq!(report.stats.sweeps_completed, 3);
        drop(session);

        let text = std::fs::read_to_string(output.path()).unwrap();
        assert!(text.lines().count() > 0);
        assert!(text.lines().all(|l| l.split(", ").count() == 6 + 5));
    }
}
