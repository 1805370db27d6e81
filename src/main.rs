use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand, ValueEnum};

use targetgen::shape::ShapeKind;
use targetgen::tile::TileMode;
use targetgen::{Config, generate, nas, tile, train};

#[derive(Parser)]
#[command(name = "targetgen", about = "Synthetic target training data generator")]
struct Cli {
    /// JSON config file overriding the built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Worker pool size (defaults to all cores).
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Generate the single-shape corpus.
    Shapes {
        /// Restrict to one shape kind, e.g. "quarter-circle".
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        count: Option<usize>,
    },
    /// Generate full scenes with label sidecars for a partition.
    Scenes {
        #[arg(long, default_value = "train")]
        partition: String,
        #[arg(long)]
        count: Option<usize>,
    },
    /// Derive detector or classifier tiles from generated scenes.
    Tiles {
        #[arg(long, value_enum, default_value_t = ModeArg::Detector)]
        mode: ModeArg,
        #[arg(long, default_value = "train")]
        partition: String,
    },
    /// Extract not-a-shape distractor crops from the NAS photo corpus.
    Nas {
        #[arg(long)]
        count: Option<usize>,
    },
    /// Find interesting blobs in rendered images.
    Blobs {
        /// PNG images or image directories.
        #[arg(required = true)]
        filename: Vec<PathBuf>,
        /// Output directory.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        /// Minimum blob width in both directions.
        #[arg(long, default_value_t = 20)]
        min_width: u32,
        /// Maximum blobs per image.
        #[arg(long, default_value_t = 100)]
        limit: usize,
        /// Space to leave around blobs on each side.
        #[arg(long, default_value_t = 10)]
        padding: u32,
    },
    /// Run the external retraining program over the shape corpus.
    Train,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Detector,
    Clf,
}

impl From<ModeArg> for TileMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Detector => TileMode::Detector,
            ModeArg::Clf => TileMode::Classifier,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut cfg = Config::load(cli.config.as_deref())?;
    if cli.workers.is_some() {
        cfg.workers = cli.workers;
    }

    match cli.cmd {
        Cmd::Shapes { kind, count } => {
            let kind_filter = match kind {
                Some(name) => match ShapeKind::parse(&name) {
                    Some(k) => Some(k),
                    None => bail!("unknown shape kind {name:?}"),
                },
                None => None,
            };
            if let Some(n) = count {
                cfg.num_shapes = n;
            }
            generate::generate_shape_corpus(kind_filter, &cfg)?;
        }
        Cmd::Scenes { partition, count } => {
            let n = count.unwrap_or(cfg.num_images);
            generate::generate_scenes(&partition, n, &cfg)?;
        }
        Cmd::Tiles { mode, partition } => {
            tile::derive_partition(&partition, mode.into(), &cfg)?;
        }
        Cmd::Nas { count } => {
            if let Some(n) = count {
                cfg.nas_count = n;
            }
            nas::run_nas(&cfg)?;
        }
        Cmd::Blobs {
            filename,
            output,
            min_width,
            limit,
            padding,
        } => {
            nas::run_blobs(&filename, &output, min_width, limit, padding)?;
        }
        Cmd::Train => {
            train::run_training(&cfg)?;
        }
    }
    Ok(())
}
