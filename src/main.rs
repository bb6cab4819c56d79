use clap::{Parser, Subcommand};
use fountain::app_config::AppConfig;
use fountain::error::Result;
use fountain::fec::{encode_blocks, CodecKind, Decoder, Producer};
use fountain::wire::{decode_batches, BlockBatch};
use fountain::{logger, telemetry};
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// TOML configuration file
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Print Prometheus counters when done
    #[clap(long, global = true)]
    metrics: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encodes a file into one batch of blocks
    Encode {
        /// File to encode
        #[clap(short, long)]
        input: PathBuf,

        /// Batch to write (`.json` for JSON, anything else for bincode)
        #[clap(short, long)]
        output: PathBuf,

        /// Producer seed for block identifiers
        #[clap(long, default_value_t = 8923483)]
        seed: u64,

        /// Number of blocks to produce
        #[clap(long)]
        blocks: Option<usize>,

        /// Source symbols the file is split into
        #[clap(long)]
        source_symbols: Option<usize>,

        /// Precode parity symbols (raptor) or soliton ripple (lt)
        #[clap(long)]
        redundancy: Option<u32>,

        /// Codec variant (raptor, lt)
        #[clap(long)]
        kind: Option<String>,
    },
    /// Decodes a file from one or more batches
    Decode {
        /// Where to write the recovered file
        #[clap(short, long)]
        output: PathBuf,

        /// Refuse batches whose digest differs from the first batch
        #[clap(long)]
        strict: bool,

        /// Batches, fed in order until the system is determined
        #[clap(required = true)]
        batches: Vec<PathBuf>,
    },
    /// Reports which source symbol counts decode a file from a single producer
    Sweep {
        /// File to encode
        #[clap(short, long)]
        input: PathBuf,

        #[clap(long, default_value_t = 4)]
        from: usize,

        #[clap(long, default_value_t = 100)]
        to: usize,

        /// Blocks produced beyond the source symbol count
        #[clap(long, default_value_t = 50)]
        extra: usize,

        #[clap(long, default_value_t = 8923489)]
        seed: u64,
    },
}

fn main() {
    logger::init();
    let cli = Cli::parse();
    telemetry::init();

    if let Err(e) = run(&cli) {
        error!("{}", e);
        std::process::exit(1);
    }
    if cli.metrics {
        print!("{}", telemetry::render());
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };

    match &cli.command {
        Commands::Encode {
            input,
            output,
            seed,
            blocks,
            source_symbols,
            redundancy,
            kind,
        } => {
            let mut config = config;
            if let Some(k) = source_symbols {
                config.codec.source_symbols = *k;
            }
            if let Some(r) = redundancy {
                config.codec.redundancy = *r;
            }
            if let Some(kind) = kind {
                config.codec.kind = kind.parse::<CodecKind>()?;
            }
            if let Some(n) = blocks {
                config.producer.blocks = *n;
            }
            config.validate()?;
            run_encode(&config, input, output, *seed)
        }
        Commands::Decode {
            output,
            strict,
            batches,
        } => run_decode(output, *strict, batches),
        Commands::Sweep {
            input,
            from,
            to,
            extra,
            seed,
        } => {
            config.validate()?;
            run_sweep(&config, input, *from, *to, *extra, *seed)
        }
    }
}

fn run_encode(config: &AppConfig, input: &Path, output: &Path, seed: u64) -> Result<()> {
    let message = std::fs::read(input)?;
    let codec = config.codec.build()?;
    let ids = Producer::with_id_space(seed, config.producer.id_space).ids(config.producer.blocks);
    let start = Instant::now();
    let blocks = encode_blocks(&message, &ids, &codec)?;
    let batch = BlockBatch::new(&codec, &message, blocks);
    batch.write_to(output)?;
    info!(
        "encoded {} bytes into {} {} blocks (K={}, redundancy={}) in {:?} -> {}",
        message.len(),
        batch.blocks.len(),
        codec.kind(),
        codec.source_symbols(),
        codec.redundancy().get(),
        start.elapsed(),
        output.display()
    );
    Ok(())
}

fn run_decode(output: &Path, strict: bool, paths: &[PathBuf]) -> Result<()> {
    let batches = paths
        .iter()
        .map(|path| BlockBatch::read_from(path))
        .collect::<Result<Vec<_>>>()?;
    let decoded = decode_batches(&batches, strict)?;
    std::fs::write(output, &decoded.message)?;
    info!(
        "decoded {} bytes from {} of {} batches, {} accepted blocks ({} dependent) -> {}",
        decoded.message.len(),
        decoded.batches_used,
        batches.len(),
        decoded.accepted,
        decoded.dependent,
        output.display()
    );
    Ok(())
}

fn run_sweep(
    config: &AppConfig,
    input: &Path,
    from: usize,
    to: usize,
    extra: usize,
    seed: u64,
) -> Result<()> {
    let message = std::fs::read(input)?;
    let mut available = Vec::new();
    for k in from.max(1)..=to {
        let mut codec_config = config.codec.clone();
        codec_config.source_symbols = k;
        let codec = Arc::new(codec_config.build()?);
        let ids = Producer::with_id_space(seed, config.producer.id_space).ids(k + extra);
        let blocks = encode_blocks(&message, &ids, &codec)?;
        let mut decoder = Decoder::new(Arc::clone(&codec), message.len())?;
        let ok = decoder.add_blocks(&blocks)? && decoder.decode()? == message;
        debug!("K={} decoded={} rank {}/{}", k, ok, decoder.rank(), decoder.required());
        if ok {
            available.push(k);
        }
    }
    info!(
        "{} of {} source symbol counts decode",
        available.len(),
        (from.max(1)..=to).count()
    );
    println!("available K: {:?}", available);
    Ok(())
}
