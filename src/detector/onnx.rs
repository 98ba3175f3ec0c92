use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use image::{imageops::FilterType, DynamicImage};
use ndarray::{s, Array4, ArrayViewD, Axis, IxDyn};
use ort::session::Session;
use ort::value::Value;
use tracing::info;

use super::{non_max_suppression, Detection, Detector, DetectorParams};

/// ONNX-backed detector for YOLO-style models with a
/// `[1, 4 + num_classes, N]` output head.
pub struct OnnxDetector {
    // Session::run needs exclusive access; the server shares one detector
    // across handlers.
    session: Mutex<Session>,
    params: DetectorParams,
}

impl OnnxDetector {
    pub fn load(path: &Path, params: DetectorParams) -> Result<Self> {
        info!("Loading ONNX model from {:?}", path);
        let session = Session::builder()?
            .with_intra_threads(4)?
            .commit_from_file(path)?;

        Ok(Self {
            session: Mutex::new(session),
            params,
        })
    }
}

impl Detector for OnnxDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let rgb = image.to_rgb8();
        let imgsz = self.params.input_size as usize;
        let resized = image::imageops::resize(
            &rgb,
            imgsz as u32,
            imgsz as u32,
            FilterType::Nearest,
        );

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let (raw, _) = input.into_raw_vec_and_offset();
        let input_tensor = Value::from_array((input_shape, raw))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("detector session lock poisoned"))?;
        let outputs = session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.into_iter().map(|&x| x as usize).collect();
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0);

        let num_candidates = view.shape()[1];
        let sx = rgb.width() as f32 / imgsz as f32;
        let sy = rgb.height() as f32 / imgsz as f32;

        let mut detections = Vec::new();

        for i in 0..num_candidates {
            let scores = view.slice(s![4.., i]);
            let Some((class_id, &max_score)) = scores
                .indexed_iter()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
            else {
                continue;
            };

            if max_score > self.params.confidence_threshold {
                let cx = view[[0, i]];
                let cy = view[[1, i]];
                let w = view[[2, i]];
                let h = view[[3, i]];

                detections.push(Detection {
                    class_id: class_id as u32,
                    confidence: max_score,
                    x1: (cx - w / 2.0) * sx,
                    y1: (cy - h / 2.0) * sy,
                    x2: (cx + w / 2.0) * sx,
                    y2: (cy + h / 2.0) * sy,
                });
            }
        }

        detections.sort_unstable_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let mut detections = non_max_suppression(detections, self.params.nms_threshold);
        detections.truncate(self.params.max_detections);
        Ok(detections)
    }
}
