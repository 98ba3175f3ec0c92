mod annotate;
mod labels;
mod onnx;

pub use annotate::{draw_detections, encode_png};
pub use labels::{write_predicted_labels, LabelWriteSummary};
pub use onnx::OnnxDetector;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::label_parser::YoloLabel;

/// One detected object, in pixel coordinates on the original image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Detection {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &Detection) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }

    /// Convert to a normalized YOLO label for the given image size.
    pub fn to_label(&self, img_width: u32, img_height: u32) -> YoloLabel {
        let w = img_width as f32;
        let h = img_height as f32;
        YoloLabel {
            class_id: self.class_id,
            x_center: ((self.x1 + self.x2) / 2.0 / w).clamp(0.0, 1.0),
            y_center: ((self.y1 + self.y2) / 2.0 / h).clamp(0.0, 1.0),
            width: ((self.x2 - self.x1) / w).clamp(0.0, 1.0),
            height: ((self.y2 - self.y1) / h).clamp(0.0, 1.0),
        }
    }
}

/// Inference parameters passed through to the model adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorParams {
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    pub max_detections: usize,
}

/// Greedy per-class non-maximum suppression.
///
/// Expects detections sorted by descending confidence; a box is dropped
/// when a stronger box of the same class overlaps it beyond the threshold.
pub fn non_max_suppression(detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

/// Boundary to the pretrained model. The server only depends on this
/// trait; the ONNX session behind it is an external collaborator.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<Detection>>;
}
