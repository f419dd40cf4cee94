//! lmwire - Replay recorded Lords Mobile traffic and print decoded records
//!
//! Input is a chunk log: one captured payload chunk per line, written as
//! `<unix timestamp> <hex bytes>`. Each file is one flow.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use lmwire_core::{
    Catalog, DecoratedRecord, DecoderConfig, Dispatch, Flow, FlowStats, Interest, MemoryCatalog,
    NullCatalog, Opcode, OpcodePrefix, ValidationMode,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Replay recorded game traffic and print decoded records
#[derive(Parser, Debug)]
#[command(name = "lmwire")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Decode this opcode, e.g. 310b00 (repeatable)
    #[arg(long = "code", value_name = "OPCODE")]
    codes: Vec<Opcode>,

    /// Decode every opcode starting with this prefix, e.g. ac08 (repeatable)
    #[arg(long = "prefix", value_name = "PREFIX")]
    prefixes: Vec<OpcodePrefix>,

    /// JSON catalog of display names
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Skip frames shorter than this many bytes
    #[arg(long, default_value = "40")]
    min_frame_len: usize,

    /// Warn instead of failing on unexpected padding
    #[arg(long)]
    lenient: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Print each roster player only once
    #[arg(long)]
    unique_players: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single chunk log
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of chunk logs
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Output format for decoded records
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One summary line per record
    Text,
    /// One JSON object per record
    Json,
}

/// Records decoded from one chunk log
#[derive(Debug, Default)]
struct LogReport {
    records: Vec<(u64, Opcode, DecoratedRecord)>,
    stats: FlowStats,
}

impl Cli {
    fn decoder_config(&self) -> DecoderConfig {
        let interest = if self.codes.is_empty() && self.prefixes.is_empty() {
            Interest::all_known()
        } else {
            let interest = self.codes.iter().fold(Interest::new(), |i, &c| i.code(c));
            self.prefixes.iter().fold(interest, |i, &p| i.prefix(p))
        };
        let mode = if self.lenient {
            ValidationMode::Lenient
        } else {
            ValidationMode::Strict
        };

        DecoderConfig::new()
            .interest(interest)
            .min_frame_len(self.min_frame_len)
            .mode(mode)
    }

    fn load_catalog(&self) -> Result<Box<dyn Catalog>> {
        match &self.catalog {
            Some(path) => {
                let catalog = MemoryCatalog::from_file(path)
                    .with_context(|| format!("Failed to load catalog: {}", path.display()))?;
                info!("Loaded {} catalog entries", catalog.len());
                Ok(Box::new(catalog))
            }
            None => Ok(Box::new(NullCatalog)),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let files = if let Some(ref file) = cli.input.file {
        single_file(file)?
    } else if let Some(ref directory) = cli.input.directory {
        collect_logs(directory)?
    } else {
        bail!("Either --file or --directory must be specified")
    };

    let catalog = cli.load_catalog()?;
    let reports = process_logs(&cli, &files, catalog.as_ref())?;

    let mut seen_players = HashSet::new();
    for (path, report) in files.iter().zip(reports) {
        print_summary(path, &report.stats);
        for (timestamp, opcode, record) in report.records {
            if cli.unique_players && !first_sighting(&record, &mut seen_players) {
                continue;
            }
            print_record(cli.format, timestamp, opcode, &record)?;
        }
    }

    Ok(())
}

fn single_file(file: &Path) -> Result<Vec<PathBuf>> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }
    Ok(vec![file.to_path_buf()])
}

/// Collect chunk logs below a directory, skipping hidden files
fn collect_logs(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut files: Vec<PathBuf> = WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file())
        .filter(|path| {
            !path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('.'))
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    info!("Found {} chunk logs", files.len());
    Ok(files)
}

/// Decode every file on its own thread, one flow per file.
/// All workers share the catalog.
fn process_logs(cli: &Cli, files: &[PathBuf], catalog: &dyn Catalog) -> Result<Vec<LogReport>> {
    let config = cli.decoder_config();
    debug!(
        "Decoding {} exact opcodes and {} prefixes",
        config.interest.exact_codes().len(),
        config.interest.prefixes().len()
    );

    std::thread::scope(|scope| {
        let workers: Vec<_> = files
            .iter()
            .map(|path| {
                let config = config.clone();
                scope.spawn(move || process_log(path, config, catalog))
            })
            .collect();

        workers
            .into_iter()
            .zip(files)
            .map(|(worker, path)| -> Result<LogReport> {
                let report = worker
                    .join()
                    .map_err(|_| anyhow!("Worker for {} panicked", path.display()))?;
                report.or_else(|e| {
                    // Log error but continue with other files
                    warn!("Error processing {}: {:#}", path.display(), e);
                    Ok(LogReport::default())
                })
            })
            .collect()
    })
}

/// Replay one chunk log through a fresh flow
fn process_log(path: &Path, config: DecoderConfig, catalog: &dyn Catalog) -> Result<LogReport> {
    trace!("Reading {}", path.display());
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read chunk log: {}", path.display()))?;

    let mut flow = Flow::new(config);
    let mut records = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let (timestamp, chunk) = match parse_chunk_line(line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => continue,
            Err(e) => {
                warn!("{}:{}: {}", path.display(), index + 1, e);
                continue;
            }
        };

        flow.feed(&chunk, timestamp, |outcome| match outcome.result {
            Ok(Dispatch::Records(decoded)) => {
                records.extend(
                    decoded
                        .into_iter()
                        .map(|r| (outcome.timestamp, outcome.opcode, r.decorate(catalog))),
                );
            }
            Ok(Dispatch::Unhandled(opcode)) => trace!("No decoder for {}", opcode),
            Ok(Dispatch::Filtered(_)) => {}
            Err(e) => warn!("{}: failed to decode {}: {}", path.display(), outcome.opcode, e),
        });
    }

    if flow.pending() > 0 {
        debug!("{}: {} bytes left in an incomplete frame", path.display(), flow.pending());
    }

    Ok(LogReport {
        records,
        stats: flow.stats(),
    })
}

/// Parse `<timestamp> <hex>`. Blank lines and `#` comments yield `None`.
fn parse_chunk_line(line: &str) -> Result<Option<(u64, Vec<u8>)>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (timestamp, data) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| anyhow!("expected '<timestamp> <hex>'"))?;
    // fractional seconds are dropped
    let seconds = timestamp.split('.').next().unwrap_or(timestamp);
    let timestamp: u64 = seconds
        .parse()
        .with_context(|| format!("invalid timestamp '{}'", timestamp))?;

    let data: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    let chunk = hex::decode(&data).context("invalid hex chunk")?;
    Ok(Some((timestamp, chunk)))
}

/// Returns false for a roster player already printed
fn first_sighting(record: &DecoratedRecord, seen: &mut HashSet<u64>) -> bool {
    match record {
        DecoratedRecord::Player(player) => seen.insert(player.record.iggid),
        _ => true,
    }
}

fn print_record(
    format: OutputFormat,
    timestamp: u64,
    opcode: Opcode,
    record: &DecoratedRecord,
) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{} {}", timestamp, record),
        OutputFormat::Json => {
            let line = serde_json::json!({
                "timestamp": timestamp,
                "opcode": opcode,
                "record": record,
            });
            println!("{}", serde_json::to_string(&line).context("Failed to encode record")?);
        }
    }
    Ok(())
}

fn print_summary(path: &Path, stats: &FlowStats) {
    info!(
        "{}: {} frames, {} decoded, {} failed, {} unhandled, {} filtered, {} skipped",
        path.display(),
        stats.framer.frames,
        stats.decoded,
        stats.failed,
        stats.unhandled,
        stats.filtered,
        stats.skipped
    );
    if stats.framer.resyncs > 0 || stats.framer.resync_failures > 0 {
        info!(
            "{}: {} resyncs, {} resync failures, {} bytes dropped",
            path.display(),
            stats.framer.resyncs,
            stats.framer.resync_failures,
            stats.framer.bytes_dropped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use lmwire_core::model::Player;
    use lmwire_core::Record;
    use std::io::Write;
    use tempfile::TempDir;

    // skill activation frame, 21 bytes
    const SKILL_FRAME: &str = "15002320001d004700521b89620000000000000000";

    fn write_log(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("lmwire").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_chunk_line() {
        assert!(parse_chunk_line("").unwrap().is_none());
        assert!(parse_chunk_line("   # comment").unwrap().is_none());

        let (timestamp, chunk) = parse_chunk_line("1651000000.25 0a0b 0c").unwrap().unwrap();
        assert_eq!(timestamp, 1_651_000_000);
        assert_eq!(chunk, vec![0x0a, 0x0b, 0x0c]);

        assert!(parse_chunk_line("1651000000").is_err());
        assert!(parse_chunk_line("soon 0a0b").is_err());
        assert!(parse_chunk_line("1651000000 0a0").is_err());
    }

    #[test]
    fn test_process_log_reassembles_split_frames() {
        let dir = TempDir::new().unwrap();
        let (head, tail) = SKILL_FRAME.split_at(12);
        let log = format!("# capture\n1651000000 {}\n\n1651000001 {}{}\n", head, tail, SKILL_FRAME);
        let path = write_log(&dir, "flow.log", &log);

        let config = cli(&["--file", "x", "--min-frame-len", "0"]).decoder_config();
        let report = process_log(&path, config, &NullCatalog).unwrap();
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].0, 1_651_000_001);
        assert_eq!(report.records[0].1.to_string(), "232000");
        assert_eq!(report.stats.decoded, 2);
    }

    #[test]
    fn test_min_frame_len_skips_short_frames() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "flow.log", &format!("1 {}\n", SKILL_FRAME));

        let report = process_log(&path, cli(&["--file", "x"]).decoder_config(), &NullCatalog).unwrap();
        assert!(report.records.is_empty());
        assert_eq!(report.stats.skipped, 1);
    }

    #[test]
    fn test_interest_from_flags() {
        let args = ["--file", "x", "--code", "bb0b00", "--prefix", "ac08", "--lenient"];
        let config = cli(&args).decoder_config();
        assert!(config.interest.contains("bb0b00".parse().unwrap()));
        assert!(config.interest.contains("ac080f".parse().unwrap()));
        assert!(!config.interest.contains("310b00".parse().unwrap()));
        assert_eq!(config.mode, ValidationMode::Lenient);

        let config = cli(&["--file", "x"]).decoder_config();
        assert_eq!(config.interest, Interest::all_known());
        assert_eq!(config.min_frame_len, 40);
    }

    #[test]
    fn test_collect_logs_skips_hidden_files() {
        let dir = TempDir::new().unwrap();
        write_log(&dir, "a.log", "");
        write_log(&dir, ".hidden", "");
        fs::create_dir(dir.path().join("nested")).unwrap();
        write_log(&dir, "nested/b.log", "");

        let files = collect_logs(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| !f.ends_with(".hidden")));
    }

    #[test]
    fn test_missing_input_is_an_error() {
        assert!(single_file(Path::new("/nonexistent/flow.log")).is_err());
        assert!(collect_logs(Path::new("/nonexistent")).is_err());
    }

    #[test]
    fn test_first_sighting_only_filters_players() {
        let player = Record::Player(Player {
            iggid: 7,
            avatar_id: 0,
            name: "Alice".into(),
            guild_rank: 1,
            might: 0,
            kills: 0,
            lastseen: 0,
        })
        .decorate(&NullCatalog);
        let mut seen = HashSet::new();
        assert!(first_sighting(&player, &mut seen));
        assert!(!first_sighting(&player, &mut seen));
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
