use std::fs;
use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::core::dataset::list_image_files;

use super::Detector;

/// Outcome of a predicted-label pass over an images directory.
#[derive(Debug, Clone, Default)]
pub struct LabelWriteSummary {
    pub images_labeled: usize,
    pub images_failed: usize,
    pub labels_written: usize,
}

/// Run the detector over every image in `images_dir` and write one YOLO
/// label file per image into `out_dir`, named after the image stem.
///
/// Images that fail to open or to run through the model are logged and
/// skipped. An image with no detections still gets an empty label file so
/// it counts as background downstream.
pub fn write_predicted_labels(
    detector: &dyn Detector,
    images_dir: &Path,
    out_dir: &Path,
) -> Result<LabelWriteSummary> {
    fs::create_dir_all(out_dir)?;
    let mut summary = LabelWriteSummary::default();

    for image_path in list_image_files(images_dir) {
        let image = match image::open(&image_path) {
            Ok(image) => image,
            Err(e) => {
                warn!("Failed to open image {:?}: {}", image_path, e);
                summary.images_failed += 1;
                continue;
            }
        };

        let detections = match detector.detect(&image) {
            Ok(detections) => detections,
            Err(e) => {
                warn!("Inference failed for {:?}: {}", image_path, e);
                summary.images_failed += 1;
                continue;
            }
        };

        let Some(stem) = image_path.file_stem() else {
            continue;
        };

        let lines: Vec<String> = detections
            .iter()
            .map(|d| d.to_label(image.width(), image.height()).to_line())
            .collect();

        let out_path = out_dir.join(format!("{}.txt", stem.to_string_lossy()));
        fs::write(&out_path, lines.join("\n"))?;
        summary.images_labeled += 1;
        summary.labels_written += lines.len();
    }

    info!(
        "Predicted labels for {} images into {:?} ({} labels, {} images failed)",
        summary.images_labeled, out_dir, summary.labels_written, summary.images_failed
    );

    Ok(summary)
}
