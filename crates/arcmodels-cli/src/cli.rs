use std::path::PathBuf;

use arcmodels_core::ExporterVariant;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "arcmodels", version, about = "Deterministic ONNX model generator")]
pub struct Cli {
    /// Log level (RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the model catalog
    List {
        /// JSON catalog to use instead of the built-in one
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Generate every model in the catalog
    Generate {
        #[command(flatten)]
        opts: GenerateOpts,

        /// Models generated concurrently
        #[arg(long, default_value_t = 1)]
        jobs: usize,
    },

    /// Generate a single catalog entry
    GenerateOne {
        /// Catalog name of the model
        name: String,

        #[command(flatten)]
        opts: GenerateOpts,
    },

    /// Generate the spending model
    Spending {
        #[arg(long, default_value = "public/models")]
        out_dir: PathBuf,

        /// Copied into when the directory exists
        #[arg(long, default_value = "../jolt-atlas-fork/arc-prover/models")]
        secondary_dir: PathBuf,
    },

    /// Decode, check and probe an exported model
    Verify {
        path: PathBuf,

        /// Device for the probe run (cpu or cuda:N)
        #[arg(long, default_value = "cpu")]
        device: String,
    },
}

#[derive(Args, Debug)]
pub struct GenerateOpts {
    /// JSON catalog to use instead of the built-in one
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    #[arg(long, default_value = "public/models")]
    pub out_dir: PathBuf,

    /// Also copy each model here when the directory exists
    #[arg(long)]
    pub secondary_dir: Option<PathBuf>,

    /// Width of the first hidden layer
    #[arg(long, default_value_t = arcmodels_generator::DEFAULT_HIDDEN)]
    pub hidden: usize,

    /// Exporter variant (current or legacy)
    #[arg(long, default_value = "current")]
    pub variant: ExporterVariant,
}
