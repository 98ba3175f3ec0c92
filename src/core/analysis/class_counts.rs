use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::core::dataset::list_label_files;
use crate::label_parser::parse_label_file;

/// Per-class tally: how many label lines reference the class and which
/// label files (by file name) contain at least one of them.
#[derive(Debug, Clone, Default)]
pub struct ClassTally {
    pub label_count: usize,
    pub images: HashSet<String>,
}

/// Statistics for one labels directory, grouped by class.
#[derive(Debug, Clone)]
pub struct ClassCounts {
    pub class_names: Vec<String>,
    pub per_class: Vec<ClassTally>,
    /// Total number of label files scanned.
    pub images_total: usize,
    /// Label files with no label lines (background images).
    pub images_empty: usize,
    /// File names of the empty label files, kept for split bookkeeping.
    pub empty_images: HashSet<String>,
}

impl ClassCounts {
    pub fn new(class_names: Vec<String>) -> Self {
        let per_class = vec![ClassTally::default(); class_names.len()];
        Self {
            class_names,
            per_class,
            images_total: 0,
            images_empty: 0,
            empty_images: HashSet::new(),
        }
    }

    pub fn tally(&self, class_id: usize) -> Option<&ClassTally> {
        self.per_class.get(class_id)
    }

    /// Class indices ordered by ascending total label frequency.
    /// Ties break on class index so the ordering is deterministic.
    pub fn classes_by_ascending_frequency(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.per_class.len()).collect();
        order.sort_by_key(|&i| (self.per_class[i].label_count, i));
        order
    }

    /// Log the per-class report, mirroring the dataset script output.
    pub fn log_report(&self) {
        info!("Total images in dataset: {}", self.images_total);
        info!("Images with empty labels: {}", self.images_empty);
        for (name, tally) in self.class_names.iter().zip(&self.per_class) {
            info!(
                "Class: {} - images: {} - labels: {}",
                name,
                tally.images.len(),
                tally.label_count
            );
        }
    }
}

/// Count label occurrences per class across every `*.txt` file in
/// `labels_dir`. One pass; malformed lines are skipped, label lines with a
/// class index outside `class_names` are logged and ignored.
pub fn count_classes(class_names: &[String], labels_dir: &Path) -> ClassCounts {
    let mut counts = ClassCounts::new(class_names.to_vec());

    for label_path in list_label_files(labels_dir) {
        let Some(label_file) = parse_label_file(&label_path) else {
            warn!("Failed to read label file: {:?}", label_path);
            continue;
        };

        counts.images_total += 1;

        let file_name = label_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if label_file.is_empty() {
            counts.images_empty += 1;
            counts.empty_images.insert(file_name);
            continue;
        }

        for label in &label_file.labels {
            match counts.per_class.get_mut(label.class_id as usize) {
                Some(tally) => {
                    tally.label_count += 1;
                    tally.images.insert(file_name.clone());
                }
                None => {
                    warn!(
                        "Unknown class id {} in {:?}, skipping line",
                        label.class_id, label_path
                    );
                }
            }
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn class_names() -> Vec<String> {
        ["gun", "fire", "person"].iter().map(|s| s.to_string()).collect()
    }

    fn write_labels(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_count_classes() {
        let dir = tempfile::tempdir().unwrap();
        write_labels(dir.path(), "a.txt", "0 0.5 0.5 0.1 0.1\n2 0.2 0.2 0.1 0.1\n");
        write_labels(dir.path(), "b.txt", "2 0.5 0.5 0.1 0.1\n2 0.6 0.6 0.1 0.1\n");
        write_labels(dir.path(), "c.txt", "");

        let counts = count_classes(&class_names(), dir.path());

        assert_eq!(counts.images_total, 3);
        assert_eq!(counts.images_empty, 1);
        assert!(counts.empty_images.contains("c.txt"));

        let gun = counts.tally(0).unwrap();
        assert_eq!(gun.label_count, 1);
        assert_eq!(gun.images.len(), 1);

        let person = counts.tally(2).unwrap();
        assert_eq!(person.label_count, 3);
        assert_eq!(person.images.len(), 2);

        assert_eq!(counts.tally(1).unwrap().label_count, 0);
    }

    #[test]
    fn test_unknown_class_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_labels(dir.path(), "a.txt", "7 0.5 0.5 0.1 0.1\n0 0.5 0.5 0.1 0.1\n");

        let counts = count_classes(&class_names(), dir.path());
        assert_eq!(counts.images_total, 1);
        assert_eq!(counts.tally(0).unwrap().label_count, 1);
        let total: usize = counts.per_class.iter().map(|t| t.label_count).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_ascending_frequency_order() {
        let dir = tempfile::tempdir().unwrap();
        write_labels(dir.path(), "a.txt", "2 0.5 0.5 0.1 0.1\n2 0.1 0.1 0.1 0.1\n");
        write_labels(dir.path(), "b.txt", "1 0.5 0.5 0.1 0.1\n");

        let counts = count_classes(&class_names(), dir.path());
        // gun: 0 labels, fire: 1, person: 2
        assert_eq!(counts.classes_by_ascending_frequency(), vec![0, 1, 2]);
    }
}
