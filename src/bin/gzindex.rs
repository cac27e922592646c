//! gzindex CLI
//!
//! Create, inspect and read indexed gzip files.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gzindex::parallel::{plan_splits, process_splits};
use gzindex::{ByteWindow, Config, IndexedReader, IndexedWriter, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// gzindex
#[derive(Parser, Debug)]
#[command(name = "gzindex")]
#[command(about = "Random-access, splittable gzip files")]
#[command(version)]
struct Args {
    /// Scan / output buffer size in bytes
    #[arg(short, long, default_value = "32768", global = true)]
    buffer_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compress a line-oriented file into an indexed gzip file
    Compress {
        input: PathBuf,
        output: PathBuf,

        /// Start a member every N lines, keyed by line number
        #[arg(long, conflicts_with = "every_bytes", value_parser = clap::value_parser!(u64).range(1..))]
        every_lines: Option<u64>,

        /// Start a member once it holds N uncompressed bytes
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        every_bytes: Option<u64>,

        /// Deflate level 0-9
        #[arg(short, long, default_value = "6")]
        level: u32,
    },

    /// Print the offset map
    Index { file: PathBuf },

    /// Report whether a file carries an offset map
    Detect { file: PathBuf },

    /// Decompress to stdout, optionally from the member for a key
    Cat {
        file: PathBuf,

        /// Start at the member recorded for the greatest key ≤ this
        #[arg(long)]
        from: Option<u64>,
    },

    /// Show where a requested split range lands after alignment
    Align {
        file: PathBuf,
        start: u64,
        end: u64,
    },

    /// Count words over parallel splits
    Wc {
        file: PathBuf,

        /// Requested split size in compressed bytes
        #[arg(long, default_value = "33554432")]
        split_size: u64,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,gzindex=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let base = Config::builder().buffer_size(args.buffer_size).build();
    base.validate()?;

    match args.command {
        Commands::Compress {
            input,
            output,
            every_lines,
            every_bytes,
            level,
        } => {
            let config = Config::builder()
                .buffer_size(base.buffer_size)
                .compression_level(level)
                .member_size_target(every_bytes)
                .build();
            let mut input = BufReader::new(File::open(&input)?);
            let mut writer = IndexedWriter::with_config(BufWriter::new(File::create(&output)?), &config)?;

            let mut line = Vec::new();
            let mut lines = 0u64;
            while input.read_until(b'\n', &mut line)? > 0 {
                writer.write_bytes(&line)?;
                line.clear();
                lines += 1;
                if let Some(every) = every_lines {
                    if lines % every == 0 {
                        writer.mark(lines)?;
                    }
                }
            }

            let (summary, mut sink) = writer.finish()?;
            sink.flush()?;
            println!(
                "{} lines, {} members, {} index entries, {} -> {} bytes",
                lines,
                summary.member_count,
                summary.entry_count,
                summary.uncompressed_len,
                summary.compressed_len
            );
        }

        Commands::Index { file } => {
            let reader = IndexedReader::open_with_config(ByteWindow::new(File::open(&file)?)?, &base)?;
            if let Some(map) = reader.offset_map() {
                println!("{} entries", map.len());
                for entry in map.iter() {
                    println!("{}\t{}", entry.key, entry.offset);
                }
            }
        }

        Commands::Detect { file } => {
            let mut source = ByteWindow::new(File::open(&file)?)?;
            let indexed = IndexedReader::detect(&mut source);
            println!("{}", if indexed { "indexed" } else { "not indexed" });
        }

        Commands::Cat { file, from } => {
            let mut reader = IndexedReader::open_with_config(ByteWindow::new(File::open(&file)?)?, &base)?;
            if let Some(key) = from {
                reader.jump_to(key)?;
            }
            let stdout = io::stdout();
            io::copy(&mut reader, &mut stdout.lock())?;
        }

        Commands::Align { file, start, end } => {
            let mut source = ByteWindow::new(File::open(&file)?)?;
            let scanner = gzindex::HeaderScanner::new(base.buffer_size);
            let range = gzindex::align(&mut source, &scanner, start, end)?;
            println!("{}\t{}", range.start, range.end);
        }

        Commands::Wc { file, split_size } => {
            let len = File::open(&file)?.metadata()?.len();
            let splits = plan_splits(len, split_size);
            let partials = process_splits(|| File::open(&file), &splits, &base, |reader| {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                let mut counts: BTreeMap<String, u64> = BTreeMap::new();
                for word in String::from_utf8_lossy(&data).split_whitespace() {
                    *counts.entry(word.to_string()).or_default() += 1;
                }
                Ok(counts)
            })?;

            let mut totals: BTreeMap<String, u64> = BTreeMap::new();
            for partial in partials {
                for (word, count) in partial {
                    *totals.entry(word).or_default() += count;
                }
            }
            for (word, count) in totals {
                println!("{}\t{}", word, count);
            }
        }
    }

    Ok(())
}
