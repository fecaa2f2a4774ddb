//! tpconf CLI - Command-line tool for router configuration backups
//!
//! This binary provides command-line interfaces for:
//! - decode: encrypted config.bin → XML (or the JSON document view)
//! - encode: XML (or the JSON export request) → encrypted config.bin
//! - inspect: report layout, byte order and sizes without writing anything

use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tpconf_codec::{
    CipherFrame, CodecOptions, ConfigCodec, ConfigFormat, Document, Endianness, ExportRequest,
    Inspection, Limits,
};
use tpconf_format::constants::EXPORT_FILE_NAME;
use tracing::{debug, info, Level};

/// Path standing for stdin or stdout
const STDIO_PATH: &str = "-";

#[derive(Parser)]
#[command(name = "tpconf")]
#[command(about = "Decode and encode router configuration backups (config.bin)")]
#[command(version)]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// TOML file with codec options and an optional hex `key`
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// DES key as 16 hex digits (overrides the embedded key and the config file)
    #[arg(long, global = true)]
    key: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decrypt and unpack backups to XML
    ///
    /// Examples:
    ///   tpconf decode config.bin
    ///   tpconf decode config.bin -o -
    ///   tpconf decode router1.bin router2.bin --json --progress
    Decode {
        /// Input backups
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output file ("-" for stdout); only valid with a single input.
        /// Defaults to the input path with an .xml (or .json) extension
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write the `{ xml, littleEndian, format }` JSON view instead of raw XML
        #[arg(long)]
        json: bool,
        /// Show a progress bar
        #[arg(long)]
        progress: bool,
    },
    /// Compress and encrypt XML into a backup
    Encode {
        /// Input XML file ("-" for stdin)
        input: PathBuf,
        /// Output backup ("-" for stdout)
        #[arg(short, long, default_value = EXPORT_FILE_NAME)]
        output: PathBuf,
        /// Write a little-endian backup
        #[arg(long)]
        little_endian: bool,
        /// Treat the input as a `{ xml, littleEndian }` JSON export request
        #[arg(long)]
        json: bool,
        /// Hash only the first position of each match while compressing
        #[arg(long)]
        allow_overlap_insert: bool,
    },
    /// Report layout, byte order and sizes of backups
    Inspect {
        /// Input backups
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Contents of the `--config` file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    key: Option<String>,
    allow_overlap_insert: bool,
    limits: Limits,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let file_config = load_file_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Decode {
            inputs,
            output,
            json,
            progress,
        } => {
            let codec = build_codec(file_config, cli.key.as_deref(), false)?;
            handle_decode(&codec, inputs, output, json, progress)?;
        }
        Commands::Encode {
            input,
            output,
            little_endian,
            json,
            allow_overlap_insert,
        } => {
            let codec = build_codec(file_config, cli.key.as_deref(), allow_overlap_insert)?;
            handle_encode(&codec, input, output, little_endian, json)?;
        }
        Commands::Inspect { inputs, json } => {
            let codec = build_codec(file_config, cli.key.as_deref(), false)?;
            handle_inspect(&codec, inputs, json)?;
        }
    }

    Ok(())
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn load_file_config(path: Option<&Path>) -> Result<FileConfig, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("cannot read config {}: {}", path.display(), err))?;
    let config = toml::from_str(&contents)
        .map_err(|err| format!("invalid config {}: {}", path.display(), err))?;
    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

fn build_codec(
    file_config: FileConfig,
    key: Option<&str>,
    allow_overlap_insert: bool,
) -> Result<ConfigCodec, Box<dyn Error>> {
    let cipher = match key.or(file_config.key.as_deref()) {
        Some(hex) => CipherFrame::from_hex(hex)?,
        None => CipherFrame::default(),
    };
    let options = CodecOptions {
        allow_overlap_insert: allow_overlap_insert || file_config.allow_overlap_insert,
        limits: file_config.limits,
    };
    Ok(ConfigCodec::with_cipher(cipher, options))
}

struct DecodeReport {
    format: ConfigFormat,
    endianness: Endianness,
    output: PathBuf,
}

fn handle_decode(
    codec: &ConfigCodec,
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    json: bool,
    show_progress: bool,
) -> Result<(), Box<dyn Error>> {
    if output.is_some() && inputs.len() > 1 {
        return Err("--output takes a single input; omit it to write beside each input".into());
    }

    let start = Instant::now();
    let progress_bar = show_progress.then(|| create_progress(inputs.len() as u64, "Decoding"));

    // Errors cross the thread pool as strings.
    let results: Vec<(&PathBuf, Result<DecodeReport, String>)> = inputs
        .par_iter()
        .map(|input| {
            let target = output
                .clone()
                .unwrap_or_else(|| default_decode_output(input, json));
            let outcome = decode_file(codec, input, &target, json).map_err(|err| err.to_string());
            if let Some(pb) = &progress_bar {
                pb.inc(1);
            }
            (input, outcome)
        })
        .collect();

    let elapsed = start.elapsed();
    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!("Decoded {} backups in {:.2?}", inputs.len(), elapsed));
    }

    let mut stderr = std::io::stderr().lock();
    let mut failures = 0;
    for (input, outcome) in &results {
        match outcome {
            Ok(report) if report.output.as_os_str() == STDIO_PATH => {}
            Ok(report) => writeln!(
                &mut stderr,
                "Decoded {} ({}, {}) to {}",
                input.display(),
                report.format,
                report.endianness,
                report.output.display()
            )?,
            Err(err) => {
                failures += 1;
                writeln!(&mut stderr, "Failed to decode {}: {}", input.display(), err)?;
            }
        }
    }

    if failures > 0 {
        return Err(format!("{} of {} backups failed to decode", failures, results.len()).into());
    }
    Ok(())
}

fn decode_file(
    codec: &ConfigCodec,
    input: &Path,
    target: &Path,
    json: bool,
) -> Result<DecodeReport, Box<dyn Error>> {
    let raw = read_input(input)?;
    let document = codec.decode(&raw)?;
    let rendered = if json {
        let mut view = document.to_view().to_json_pretty()?;
        view.push('\n');
        view
    } else {
        document.xml
    };
    write_output(target, rendered.as_bytes())?;
    info!(
        input = %input.display(),
        format = %document.format,
        endianness = %document.endianness,
        "decoded backup"
    );

    Ok(DecodeReport {
        format: document.format,
        endianness: document.endianness,
        output: target.to_path_buf(),
    })
}

fn default_decode_output(input: &Path, json: bool) -> PathBuf {
    let extension = if json { "json" } else { "xml" };
    let target = input.with_extension(extension);
    if target == input {
        let mut name = input.as_os_str().to_owned();
        name.push(".");
        name.push(extension);
        return PathBuf::from(name);
    }
    target
}

fn handle_encode(
    codec: &ConfigCodec,
    input: PathBuf,
    output: PathBuf,
    little_endian: bool,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let text = String::from_utf8(read_input(&input)?)
        .map_err(|_| format!("{} is not valid UTF-8", input.display()))?;

    let mut document = if json {
        ExportRequest::from_json(&text)?.into_document()
    } else {
        Document::new(text, Endianness::Big)
    };
    if little_endian {
        document.endianness = Endianness::Little;
    }

    let raw = codec.encode_document(&document)?;
    write_output(&output, &raw)?;
    info!(output = %output.display(), bytes = raw.len(), "encoded backup");

    if output.as_os_str() != STDIO_PATH {
        let mut stderr = std::io::stderr().lock();
        writeln!(
            &mut stderr,
            "Encoded {} ({}, {} bytes, elapsed: {:.2?}) to {}",
            input.display(),
            document.endianness,
            raw.len(),
            start.elapsed(),
            output.display()
        )?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct InspectReport {
    path: String,
    #[serde(flatten)]
    inspection: Inspection,
}

fn handle_inspect(
    codec: &ConfigCodec,
    inputs: Vec<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let mut reports = Vec::with_capacity(inputs.len());
    for input in &inputs {
        let raw = read_input(input)?;
        let inspection = codec
            .inspect(&raw)
            .map_err(|err| format!("{}: {}", input.display(), err))?;
        reports.push(InspectReport {
            path: input.display().to_string(),
            inspection,
        });
    }

    let mut stdout = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &reports)?;
        writeln!(&mut stdout)?;
        return Ok(());
    }

    for report in &reports {
        writeln!(&mut stdout, "{}", report.path)?;
        writeln!(&mut stdout, "  format:        {}", report.inspection.format)?;
        writeln!(&mut stdout, "  byte order:    {}", report.inspection.endianness)?;
        writeln!(&mut stdout, "  decrypted:     {} bytes", report.inspection.decrypted_len)?;
        writeln!(&mut stdout, "  payload:       {} bytes", report.inspection.payload_len)?;
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<Vec<u8>, Box<dyn Error>> {
    if path.as_os_str() == STDIO_PATH {
        let mut buf = Vec::new();
        std::io::stdin().lock().read_to_end(&mut buf)?;
        return Ok(buf);
    }
    fs::read(path).map_err(|err| format!("cannot read {}: {}", path.display(), err).into())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), Box<dyn Error>> {
    if path.as_os_str() == STDIO_PATH {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(bytes)?;
        stdout.flush()?;
        return Ok(());
    }
    fs::write(path, bytes).map_err(|err| format!("cannot write {}: {}", path.display(), err).into())
}

fn create_progress(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:30} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
