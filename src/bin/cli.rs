//! blobkv CLI
//!
//! Command-line interface for a local blobkv store.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use blobkv::{BlobStore, Config, StreamInfo};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// blobkv CLI
#[derive(Parser, Debug)]
#[command(name = "blobkv-cli")]
#[command(about = "CLI for the blobkv file-backed blob store")]
#[command(version)]
struct Args {
    /// Working directory holding storage.bin and index.bin
    #[arg(short, long, default_value = "./blobkv_data")]
    data_dir: PathBuf,

    /// Compress payloads larger than this many bytes
    #[arg(short = 't', long, default_value = "4096")]
    compression_threshold: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a file under a key
    Add {
        /// The key to store under
        key: String,

        /// File whose contents are stored
        file: PathBuf,

        /// The file is already a zstd frame
        #[arg(long)]
        compressed: bool,
    },

    /// Write the payload of a key to stdout or a file
    Get {
        /// The key to read
        key: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Check whether a key exists
    Contains {
        /// The key to check
        key: String,
    },

    /// Print index and data file statistics
    Stats,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,blobkv=debug"));

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

fn run(args: Args) -> blobkv::Result<()> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .compression_threshold(args.compression_threshold)
        .build();

    let store = BlobStore::open(config)?;

    match args.command {
        Commands::Add {
            key,
            file,
            compressed,
        } => {
            let mut input = File::open(&file)?;
            let mut info = StreamInfo::new();
            if compressed {
                info = info.compressed();
            }
            store.add(&key, &mut input, &info)?;
            tracing::info!(key = %key, file = %file.display(), "Stored");
        }
        Commands::Get { key, out } => {
            let mut payload = store.get(&key)?;
            match out {
                Some(path) => {
                    let mut output = File::create(&path)?;
                    io::copy(&mut payload, &mut output)?;
                }
                None => {
                    let stdout = io::stdout();
                    let mut lock = stdout.lock();
                    io::copy(&mut payload, &mut lock)?;
                    lock.flush()?;
                }
            }
        }
        Commands::Contains { key } => {
            println!("{}", store.contains(&key)?);
        }
        Commands::Stats => {
            println!("entries:        {}", store.entries_count());
            println!("index capacity: {}", store.index_capacity());
            println!("data file size: {}", store.data_file_len());
        }
    }

    store.close()
}
