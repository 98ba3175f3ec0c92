use std::fs;
use std::path::Path;

/// A single YOLO-format label: class index plus a normalized
/// center/size bounding box. All coordinates are in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct YoloLabel {
    pub class_id: u32,
    pub x_center: f32,
    pub y_center: f32,
    pub width: f32,
    pub height: f32,
}

impl YoloLabel {
    /// Check that every coordinate is normalized.
    pub fn is_normalized(&self) -> bool {
        [self.x_center, self.y_center, self.width, self.height]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }

    /// Serialize back to a label line. Seven decimal places, matching the
    /// precision the prediction scripts write.
    pub fn to_line(&self) -> String {
        format!(
            "{} {:.7} {:.7} {:.7} {:.7}",
            self.class_id, self.x_center, self.y_center, self.width, self.height
        )
    }
}

/// Contents of one label file (one file per image).
#[derive(Debug, Clone, Default)]
pub struct LabelFile {
    pub labels: Vec<YoloLabel>,
}

impl LabelFile {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Parse a single `class x_center y_center width height` line.
///
/// Returns `None` for comments, blank lines, and lines that do not have
/// exactly five parseable fields.
pub fn parse_label_line(line: &str) -> Option<YoloLabel> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let values: Vec<&str> = line.split_whitespace().collect();
    if values.len() != 5 {
        return None;
    }

    match (
        values[0].parse::<u32>(),
        values[1].parse::<f32>(),
        values[2].parse::<f32>(),
        values[3].parse::<f32>(),
        values[4].parse::<f32>(),
    ) {
        (Ok(class_id), Ok(x), Ok(y), Ok(w), Ok(h)) => Some(YoloLabel {
            class_id,
            x_center: x,
            y_center: y,
            width: w,
            height: h,
        }),
        _ => None,
    }
}

/// Parse a YOLO format label file.
///
/// # Returns
/// * `Some(LabelFile)` if the file exists and can be read
/// * `None` if the file doesn't exist or cannot be read
///
/// Malformed lines are skipped rather than failing the whole file.
pub fn parse_label_file(label_path: &Path) -> Option<LabelFile> {
    let content = fs::read_to_string(label_path).ok()?;

    let labels = content.lines().filter_map(parse_label_line).collect();

    Some(LabelFile { labels })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_line() {
        let label = parse_label_line("3 0.5 0.25 0.1 0.2").unwrap();
        assert_eq!(label.class_id, 3);
        assert_eq!(label.x_center, 0.5);
        assert_eq!(label.y_center, 0.25);
        assert_eq!(label.width, 0.1);
        assert_eq!(label.height, 0.2);
        assert!(label.is_normalized());
    }

    #[test]
    fn test_parse_label_line_rejects_garbage() {
        assert!(parse_label_line("").is_none());
        assert!(parse_label_line("# Resolution: 2560x1440").is_none());
        assert!(parse_label_line("1 0.5 0.5").is_none());
        assert!(parse_label_line("one 0.5 0.5 0.1 0.1").is_none());
    }

    #[test]
    fn test_to_line_precision() {
        let label = YoloLabel {
            class_id: 8,
            x_center: 0.5,
            y_center: 0.5,
            width: 0.1,
            height: 0.1,
        };
        assert_eq!(label.to_line(), "8 0.5000000 0.5000000 0.1000000 0.1000000");
    }

    #[test]
    fn test_roundtrip() {
        let label = YoloLabel {
            class_id: 2,
            x_center: 0.1234567,
            y_center: 0.7654321,
            width: 0.25,
            height: 0.75,
        };
        let parsed = parse_label_line(&label.to_line()).unwrap();
        assert_eq!(parsed, label);
    }

    #[test]
    fn test_out_of_range_is_not_normalized() {
        let label = parse_label_line("0 1.5 0.5 0.1 0.1").unwrap();
        assert!(!label.is_normalized());
    }
}
