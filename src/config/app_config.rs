use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application configuration shared by the server and the dataset commands.
///
/// Loaded from a JSON file when present; every field falls back to the
/// defaults below otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Class names, indexed by YOLO class id.
    pub class_names: Vec<String>,

    /// Path to the ONNX model served by `predict`.
    pub model_path: PathBuf,

    /// Square input size the model expects.
    pub input_size: u32,

    /// Minimum confidence for a detection to be reported.
    pub confidence_threshold: f32,

    /// IoU threshold for non-maximum suppression; boxes of the same class
    /// overlapping more than this are collapsed into the strongest one.
    pub nms_threshold: f32,

    /// Cap on detections returned per image.
    pub max_detections: usize,

    /// Address the HTTP server binds to.
    pub bind_addr: String,

    /// SQLite file holding the prediction/feedback records.
    pub database_path: PathBuf,

    /// Reference image used by the health check.
    pub health_check_image: PathBuf,

    /// Class ids the health check expects to detect in the reference
    /// image, in confidence order.
    pub health_check_classes: Vec<u32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            class_names: [
                "spray", "graffiti", "gun", "fire", "smoke", "knife", "puddle", "mud", "person",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            model_path: PathBuf::from("models/public_safety.onnx"),
            input_size: 640,
            confidence_threshold: 0.25,
            nms_threshold: 0.45,
            max_detections: 100,
            bind_addr: "0.0.0.0:7100".to_string(),
            database_path: PathBuf::from("feedback.db"),
            health_check_image: PathBuf::from("health_check_img.jpg"),
            health_check_classes: vec![8, 2],
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, or return defaults if the file doesn't
    /// exist or is corrupted.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from: {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}. Using defaults.", e);
                    Self::default()
                }
            },
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read config file: {}. Using defaults.", e);
                } else {
                    info!("No config file at {:?}. Using defaults.", path);
                }
                Self::default()
            }
        }
    }

    /// Get class name for a given class ID
    pub fn class_name(&self, class_id: u32) -> &str {
        self.class_names
            .get(class_id as usize)
            .map(String::as_str)
            .unwrap_or("unknown")
    }
}
