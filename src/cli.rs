use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Serve a pretrained object-detection model and maintain its
/// YOLO-format datasets.
#[derive(Debug, Parser)]
#[command(name = "safety-vision", version)]
pub struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP detection server.
    Serve,

    /// Count label occurrences per class in a labels directory.
    Stats {
        /// Directory containing the `*.txt` label files.
        #[arg(long)]
        labels: PathBuf,
    },

    /// Append labels from a source directory into same-named files in a
    /// destination directory.
    Merge {
        #[arg(long)]
        source: PathBuf,
        #[arg(long)]
        dest: PathBuf,
    },

    /// Run the model over a directory of images and write the predictions
    /// as YOLO label files.
    PredictLabels {
        /// Directory of images to label.
        #[arg(long)]
        images: PathBuf,

        /// Output directory for the `.txt` label files.
        #[arg(long)]
        out: PathBuf,
    },

    /// Stratified train/val/test split of a labeled image pool.
    Split {
        /// Pool directory containing `images/` and `labels/`.
        #[arg(long)]
        pool: PathBuf,

        /// Output dataset root.
        #[arg(long)]
        out: PathBuf,

        #[arg(long, default_value_t = 0.70)]
        train: f32,

        #[arg(long, default_value_t = 0.20)]
        val: f32,

        #[arg(long, default_value_t = 0.10)]
        test: f32,

        /// RNG seed; the same seed reproduces the same partition.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}
