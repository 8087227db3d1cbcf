use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stegsift::batch;
use stegsift::carve::{carve_values, extract_low_bits, to_hex};
use stegsift::config::{ScanOptions, DEFAULT_LSB_BITS};
use stegsift::{Channel, ChunkStream, StreamEnd};
use tracing::{info, metadata::LevelFilter};
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "stegsift", version, about = "PNG repair, bit-plane views and LSB carving for image triage")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse every image directly inside a directory
    Scan {
        input: PathBuf,
        /// Output root (default: <INPUT>/stego_output)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Low bits per channel value used for carving (1-8)
        #[arg(long, default_value_t = DEFAULT_LSB_BITS, value_parser = clap::value_parser!(u8).range(1..=8))]
        lsb_bits: u8,
        /// Channel to carve: r, g, b or a
        #[arg(long, default_value = "r")]
        channel: Channel,
        /// Keep extensions even when they disagree with the content
        #[arg(long)]
        no_rename: bool,
        /// Delete files that are not a supported image
        #[arg(long)]
        remove_unsupported: bool,
        /// Also write metadata.json
        #[arg(long)]
        json: bool,
    },
    /// Recompute the chunk CRCs of one PNG
    Repair {
        input: PathBuf,
        /// Write here instead of replacing the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the chunks of one PNG
    Chunks {
        input: PathBuf,
    },
    /// Carve file signatures out of one image's low bits
    Carve {
        input: PathBuf,
        #[arg(long, default_value_t = DEFAULT_LSB_BITS, value_parser = clap::value_parser!(u8).range(1..=8))]
        lsb_bits: u8,
        #[arg(long, default_value = "r")]
        channel: Channel,
        /// Print the hex stream as well
        #[arg(long)]
        dump_hex: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {

        // ── Scan ─────────────────────────────────────────────────────────────
        Commands::Scan { input, output, lsb_bits, channel, no_rename, remove_unsupported, json } => {
            let opts = ScanOptions {
                output_dir:         output,
                lsb_bits,
                carve_channel:      channel,
                rename_mismatched:  !no_rename,
                remove_unsupported,
                write_json:         json,
            };
            let summary = batch::scan_dir(&input, &opts)?;
            println!(
                "Processed {}, failed {}, skipped {}, removed {}",
                summary.processed, summary.failed, summary.skipped, summary.removed
            );
        }

        // ── Repair ───────────────────────────────────────────────────────────
        Commands::Repair { input, output } => {
            let bytes = std::fs::read(&input)?;
            let stream = ChunkStream::parse(&bytes)?;
            let repair = stream.repair();
            for &i in &repair.fixed {
                if let Some(chunk) = stream.get(i) {
                    info!(
                        "{} @ {}: {:08x} -> {:08x}",
                        chunk.kind, chunk.offset, chunk.crc, chunk.computed_crc()
                    );
                }
            }
            match output {
                Some(out) => {
                    std::fs::write(&out, repair.stream.serialize())?;
                    println!("Wrote: {} (changed: {})", out.display(), repair.changed);
                }
                None if repair.changed => {
                    let bak = batch::backup_once(&input)?;
                    std::fs::write(&input, repair.stream.serialize())?;
                    println!("Repaired {} chunk(s); backup at {}", repair.fixed.len(), bak.display());
                }
                None => println!("All checksums valid; nothing written"),
            }
        }

        // ── Chunks ───────────────────────────────────────────────────────────
        Commands::Chunks { input } => {
            let bytes = std::fs::read(&input)?;
            let stream = ChunkStream::parse(&bytes)?;
            println!("{:>10} {:<6} {:>10} {:>10} {:>10}", "Offset", "Type", "Length", "Stored", "Computed");
            for chunk in stream.chunks() {
                let mark = if chunk.crc_matches() { "" } else { "  MISMATCH" };
                println!(
                    "{:>10} {:<6} {:>10} {:>10} {:>10}{}",
                    chunk.offset, chunk.kind.to_string(), chunk.length,
                    format!("{:08x}", chunk.crc), format!("{:08x}", chunk.computed_crc()), mark
                );
            }
            match stream.end() {
                StreamEnd::Terminal => println!("Ends at IEND; {} trailing byte(s)", stream.trailing_len()),
                StreamEnd::Exhausted => println!("No IEND chunk"),
                StreamEnd::Truncated { offset } => println!("Truncated at offset {offset}"),
            }
        }

        // ── Carve ────────────────────────────────────────────────────────────
        Commands::Carve { input, lsb_bits, channel, dump_hex } => {
            let rgba = image::open(&input)?.to_rgba8();
            let values = channel.values(&rgba);
            if dump_hex {
                println!("{}", to_hex(&extract_low_bits(&values, lsb_bits)));
            }
            let hits = carve_values(&values, lsb_bits);
            if hits.is_empty() {
                println!("No known signature in {} LSB{} stream", channel, lsb_bits);
            }
            for hit in hits {
                println!("{hit}");
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let subscriber = tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().without_time());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
