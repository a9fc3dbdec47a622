//! replwire-dump
//!
//! Decodes a snapshot file or a captured reply stream and prints it.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use replwire::resp::{Frame, ReplyDecoder};
use replwire::snapshot::{ChecksumStatus, RecordValue, SnapshotDecoder, SnapshotRecord};
use replwire::{Config, TracingObserver};

/// Replication stream dumper
#[derive(Parser, Debug)]
#[command(name = "replwire-dump")]
#[command(about = "Decode replication snapshots and reply streams")]
#[command(version)]
struct Args {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Reject inline commands in reply streams
    #[arg(long, global = true)]
    no_inline: bool,

    /// Read but do not compare the trailing snapshot checksum
    #[arg(long, global = true)]
    skip_checksum: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode a snapshot file, one JSON line per record
    Snapshot {
        /// Snapshot file ("-" for stdin)
        path: PathBuf,
    },

    /// Decode a captured reply stream
    Replies {
        /// Capture file ("-" for stdin)
        path: PathBuf,

        /// Print bulk sizes instead of buffering bulk bodies
        #[arg(long)]
        streaming: bool,
    },
}

/// One output line of the snapshot dump
#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum RecordLine<'a> {
    SelectDb {
        index: u64,
    },
    Entry {
        db: Option<u64>,
        key: Cow<'a, str>,
        value_type: String,
        expires_at_ms: Option<u64>,
        len: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Cow<'a, str>>,
    },
    Summary {
        version: Option<u32>,
        checksum: String,
        bytes: u64,
    },
}

fn main() {
    // Initialize tracing/logging on stderr so stdout stays machine-readable
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,replwire=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let result = match &args.command {
        Commands::Snapshot { path } => {
            open_input(path).and_then(|input| dump_snapshot(input, config))
        }
        Commands::Replies { path, streaming } => {
            open_input(path).and_then(|input| dump_replies(input, config, *streaming))
        }
    };

    if let Err(e) = result {
        tracing::error!("Decode failed: {}", e);
        std::process::exit(1);
    }
}

fn load_config(args: &Args) -> Result<Config, String> {
    let mut config = match &args.config {
        Some(path) => {
            let file = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
            serde_json::from_reader(file).map_err(|e| format!("{}: {}", path.display(), e))?
        }
        None => Config::default(),
    };
    if args.no_inline {
        config.inline_commands = false;
    }
    if args.skip_checksum {
        config.verify_checksum = false;
    }
    Ok(config)
}

fn open_input(path: &Path) -> replwire::Result<Box<dyn Read>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    Ok(Box::new(File::open(path)?))
}

fn dump_snapshot(input: Box<dyn Read>, config: Config) -> replwire::Result<()> {
    let mut decoder =
        SnapshotDecoder::with_config(input, config).with_observer(Arc::new(TracingObserver));

    while let Some(record) = decoder.decode_next()? {
        print_json(&record_line(&record));
    }

    print_json(&RecordLine::Summary {
        version: decoder.version(),
        checksum: checksum_label(decoder.checksum_status()).to_string(),
        bytes: decoder.bytes_consumed(),
    });
    Ok(())
}

fn record_line(record: &SnapshotRecord) -> RecordLine<'_> {
    match record {
        SnapshotRecord::SelectDb(index) => RecordLine::SelectDb { index: *index },
        SnapshotRecord::ExpiringEntry(_, entry) | SnapshotRecord::PlainEntry(entry) => {
            RecordLine::Entry {
                db: entry.db,
                key: String::from_utf8_lossy(&entry.key),
                value_type: format!("{:?}", entry.value_type),
                expires_at_ms: record.expiry().map(|e| e.as_millis()),
                len: entry.value.len(),
                value: match &entry.value {
                    RecordValue::String(s) => Some(String::from_utf8_lossy(s)),
                    _ => None,
                },
            }
        }
    }
}

fn checksum_label(status: ChecksumStatus) -> &'static str {
    match status {
        ChecksumStatus::Verified => "verified",
        ChecksumStatus::Skipped => "skipped",
        ChecksumStatus::NotPresent => "not present",
        ChecksumStatus::Pending => "pending",
    }
}

fn dump_replies(input: Box<dyn Read>, config: Config, streaming: bool) -> replwire::Result<()> {
    let mut decoder =
        ReplyDecoder::with_config(input, config).with_observer(Arc::new(TracingObserver));

    if !streaming {
        while let Some(value) = decoder.decode_next()? {
            println!("{}", value);
        }
        return Ok(());
    }

    while let Some(frame) = decoder.next_frame()? {
        println!("{}", frame_line(frame)?);
    }
    Ok(())
}

/// One output line per streamed frame; bulk bodies are counted, not kept
fn frame_line(frame: Frame<'_>) -> io::Result<String> {
    Ok(match frame {
        Frame::SimpleString(s) => format!("+{}", s),
        Frame::Error(s) => format!("-{}", s),
        Frame::Integer(i) => format!(":{}", i),
        Frame::Bulk(None) => "$(nil)".to_string(),
        Frame::Bulk(Some(mut payload)) => {
            let copied = io::copy(&mut payload, &mut io::sink())?;
            format!("${} bytes", copied)
        }
        Frame::ArrayHeader(None) => "*(nil)".to_string(),
        Frame::ArrayHeader(Some(len)) => format!("*{}", len),
        Frame::Inline(tokens) => {
            let words: Vec<_> = tokens.iter().map(|t| String::from_utf8_lossy(t)).collect();
            format!("inline {}", words.join(" "))
        }
    })
}

fn print_json(line: &RecordLine<'_>) {
    match serde_json::to_string(line) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::warn!("Failed to serialize record: {}", e),
    }
}
