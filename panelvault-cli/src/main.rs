use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, anyhow};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use panelvault::{
    Codec as _, ImageCodec, OffloadDispatcher, PipelineConfig, TileShuffleCipher, WireFormat,
};

#[derive(Parser, Debug)]
#[command(name = "panelvault", version)]
struct Cli {
    /// Pipeline config JSON. Defaults apply when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-encode images into another codec, in parallel.
    Transcode(TranscodeArgs),
    /// Scramble a page image for storage.
    Encrypt(CipherArgs),
    /// Restore a scrambled page image.
    Decrypt(CipherArgs),
}

#[derive(Parser, Debug)]
struct TranscodeArgs {
    /// Input images.
    #[arg(long = "in", required = true, num_args = 1..)]
    in_paths: Vec<PathBuf>,

    /// Output directory; files keep their stem and take the target extension.
    #[arg(long)]
    out_dir: PathBuf,

    /// Target codec extension (defaults to the config's transcode target).
    #[arg(long)]
    format: Option<String>,

    /// Encoder quality 1..=100 (defaults to the config's transcode quality).
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct CipherArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output image; the codec follows its extension (PNG when unknown).
    #[arg(long)]
    out: PathBuf,

    /// Tile edge in pixels.
    #[arg(long, default_value_t = panelvault::DEFAULT_TILE_SIZE)]
    tile: u32,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::Transcode(args) => cmd_transcode(&config, args),
        Command::Encrypt(args) => cmd_cipher(&config, args, true),
        Command::Decrypt(args) => cmd_cipher(&config, args, false),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let config = match path {
        Some(p) => PipelineConfig::from_path(p)?,
        None => PipelineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn cmd_transcode(config: &PipelineConfig, args: TranscodeArgs) -> anyhow::Result<()> {
    let format = match args.format.as_deref() {
        Some(ext) => {
            WireFormat::from_extension(ext).ok_or_else(|| anyhow!("unknown format '{ext}'"))?
        }
        None => config.transcode.target,
    };
    let quality = args.quality.unwrap_or(config.transcode.quality);
    let codec = ImageCodec::new();
    if !codec.can_encode(format) {
        return Err(anyhow!("cannot encode {format}"));
    }

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    let run = || -> Vec<anyhow::Result<PathBuf>> {
        args.in_paths
            .par_iter()
            .map(|input| transcode_file(&codec, input, &args.out_dir, format, quality))
            .collect()
    };
    let results = match args.threads {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .context("build rayon thread pool")?
            .install(run),
        None => run(),
    };

    let mut failed = 0usize;
    for (input, result) in args.in_paths.iter().zip(results) {
        match result {
            Ok(out) => eprintln!("wrote {}", out.display()),
            Err(e) => {
                failed += 1;
                tracing::error!(input = %input.display(), error = %format!("{e:#}"), "transcode failed");
            }
        }
    }
    if failed > 0 {
        return Err(anyhow!("{failed} of {} inputs failed", args.in_paths.len()));
    }
    Ok(())
}

fn transcode_file(
    codec: &ImageCodec,
    input: &Path,
    out_dir: &Path,
    format: WireFormat,
    quality: u8,
) -> anyhow::Result<PathBuf> {
    let bytes = std::fs::read(input).with_context(|| format!("read '{}'", input.display()))?;
    let raster = codec
        .decode(&bytes)
        .with_context(|| format!("decode '{}'", input.display()))?;
    let encoded = codec.encode(&raster, format, quality)?;

    let stem = input
        .file_stem()
        .ok_or_else(|| anyhow!("input '{}' has no file name", input.display()))?;
    let out = out_dir.join(format!("{}.{}", stem.to_string_lossy(), format.extension()));
    std::fs::write(&out, encoded).with_context(|| format!("write '{}'", out.display()))?;
    Ok(out)
}

fn cmd_cipher(config: &PipelineConfig, args: CipherArgs, encrypt: bool) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(&args.in_path).with_context(|| format!("read '{}'", args.in_path.display()))?;
    let format = args
        .out
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(WireFormat::from_extension)
        .unwrap_or(WireFormat::Png);

    let cipher = Arc::new(TileShuffleCipher::new(args.tile)?);
    let codec = ImageCodec::new();
    let quality = config.transcode.quality;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .context("build tokio runtime")?;
    let encoded = runtime.block_on(async {
        let mut dispatcher = OffloadDispatcher::new(cipher, config.offload.clone());
        let out = if encrypt {
            panelvault::protect_image(&mut dispatcher, &codec, &bytes, format, quality).await
        } else {
            panelvault::reveal_image(&mut dispatcher, &codec, &bytes, format, quality).await
        };
        tracing::debug!(stats = ?dispatcher.stats(), "cipher finished");
        out
    })?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, encoded)
        .with_context(|| format!("write '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
