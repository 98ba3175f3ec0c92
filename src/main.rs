use clap::Parser;
use tracing::info;

mod cli;
mod config;
mod core;
mod detector;
mod label_parser;
mod log_formatter;
mod server;
mod store;

use cli::{Cli, Command};
use config::AppConfig;
use crate::core::analysis::{count_classes, execute_split, plan_split, SplitRatios};
use crate::core::operations::merge_label_dirs;
use detector::{write_predicted_labels, DetectorParams, OnnxDetector};
use log_formatter::BracketedFormatter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .event_format(BracketedFormatter)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config);

    match cli.command {
        Command::Serve => server::serve(config).await,

        Command::Stats { labels } => {
            let counts = count_classes(&config.class_names, &labels);
            counts.log_report();
            Ok(())
        }

        Command::Merge { source, dest } => {
            let summary = merge_label_dirs(&source, &dest)?;
            info!(
                "Merged {} files ({} empty sources skipped)",
                summary.files_merged, summary.files_skipped_empty
            );
            Ok(())
        }

        Command::PredictLabels { images, out } => {
            let params = DetectorParams {
                input_size: config.input_size,
                confidence_threshold: config.confidence_threshold,
                nms_threshold: config.nms_threshold,
                max_detections: config.max_detections,
            };
            let detector = OnnxDetector::load(&config.model_path, params)?;
            let summary = write_predicted_labels(&detector, &images, &out)?;
            info!(
                "Wrote {} labels across {} images",
                summary.labels_written, summary.images_labeled
            );
            Ok(())
        }

        Command::Split {
            pool,
            out,
            train,
            val,
            test,
            seed,
        } => {
            let ratios = SplitRatios { train, val, test };
            let labels_dir = pool.join("labels");
            let images_dir = pool.join("images");

            let counts = count_classes(&config.class_names, &labels_dir);
            counts.log_report();

            let plan = plan_split(&counts, &ratios, seed)?;
            execute_split(&plan, &images_dir, &labels_dir, &out)?;
            Ok(())
        }
    }
}
