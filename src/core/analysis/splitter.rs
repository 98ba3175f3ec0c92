//! Stratified dataset splitting.
//!
//! Partitions a flat labeled image pool into train/val/test. Classes are
//! processed by ascending label frequency so that rare classes are spread
//! across the splits before the common classes claim the remaining images.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::dataset::{image_for_label, DatasetSplit};
use crate::core::operations::{copy_file, FileOpError};

use super::ClassCounts;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("invalid split ratios: {0}")]
    InvalidRatios(String),
    #[error("file operation failed: {0}")]
    FileOp(#[from] FileOpError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Requested train/val/test proportions.
#[derive(Debug, Clone, Copy)]
pub struct SplitRatios {
    pub train: f32,
    pub val: f32,
    pub test: f32,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.70,
            val: 0.20,
            test: 0.10,
        }
    }
}

impl SplitRatios {
    /// Ratios must each lie in [0, 1] and sum to 1.0 within epsilon.
    pub fn validate(&self) -> Result<(), SplitError> {
        for (name, value) in [("train", self.train), ("val", self.val), ("test", self.test)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SplitError::InvalidRatios(format!(
                    "{} ratio {} is outside [0, 1]",
                    name, value
                )));
            }
        }
        let sum = self.train + self.val + self.test;
        if (sum - 1.0).abs() > 1e-3 {
            return Err(SplitError::InvalidRatios(format!(
                "ratios sum to {}, expected 1.0",
                sum
            )));
        }
        Ok(())
    }
}

/// Assignment of label file names to splits. Produced by [`plan_split`],
/// consumed by [`execute_split`].
#[derive(Debug, Clone, Default)]
pub struct SplitPlan {
    assignments: HashMap<String, DatasetSplit>,
}

impl SplitPlan {
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn split_for(&self, label_file: &str) -> Option<DatasetSplit> {
        self.assignments.get(label_file).copied()
    }

    /// Label file names assigned to one split, sorted.
    pub fn files_for(&self, split: DatasetSplit) -> Vec<&str> {
        let mut files: Vec<&str> = self
            .assignments
            .iter()
            .filter(|(_, s)| **s == split)
            .map(|(name, _)| name.as_str())
            .collect();
        files.sort();
        files
    }

    pub fn count_for(&self, split: DatasetSplit) -> usize {
        self.assignments.values().filter(|s| **s == split).count()
    }
}

/// Partition one bucket of file names across the splits.
///
/// Val and test sizes are rounded from the requested ratios; train takes the
/// remainder so every file is assigned.
fn assign_bucket(
    bucket: &mut Vec<String>,
    ratios: &SplitRatios,
    rng: &mut StdRng,
    plan: &mut SplitPlan,
    assigned: &mut HashSet<String>,
) {
    // Sorted before shuffling so the outcome depends only on the seed.
    bucket.sort();
    bucket.shuffle(rng);

    let n = bucket.len();
    let mut n_val = (n as f32 * ratios.val).round() as usize;
    let mut n_test = (n as f32 * ratios.test).round() as usize;

    // Rounding can oversubscribe small buckets.
    if n_val + n_test > n {
        n_test = n.saturating_sub(n_val);
        n_val = n_val.min(n);
    }

    for (idx, name) in bucket.drain(..).enumerate() {
        let split = if idx < n_val {
            DatasetSplit::Val
        } else if idx < n_val + n_test {
            DatasetSplit::Test
        } else {
            DatasetSplit::Train
        };
        assigned.insert(name.clone());
        plan.assignments.insert(name, split);
    }
}

/// Build a stratified split plan from per-class counts.
///
/// Classes are visited by ascending label frequency. Each class contributes
/// the images that reference it minus everything already assigned by a rarer
/// class, shuffled with the seeded RNG and sliced per ratio. Images with an
/// empty label file form a final background bucket partitioned the same way.
pub fn plan_split(
    counts: &ClassCounts,
    ratios: &SplitRatios,
    seed: u64,
) -> Result<SplitPlan, SplitError> {
    ratios.validate()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut plan = SplitPlan::default();
    let mut assigned: HashSet<String> = HashSet::new();

    for class_id in counts.classes_by_ascending_frequency() {
        let tally = &counts.per_class[class_id];
        let mut bucket: Vec<String> = tally.images.difference(&assigned).cloned().collect();
        if bucket.is_empty() {
            continue;
        }
        assign_bucket(&mut bucket, ratios, &mut rng, &mut plan, &mut assigned);
    }

    let mut background: Vec<String> = counts.empty_images.difference(&assigned).cloned().collect();
    if !background.is_empty() {
        assign_bucket(&mut background, ratios, &mut rng, &mut plan, &mut assigned);
    }

    info!(
        "Split plan: {} train, {} val, {} test ({} total)",
        plan.count_for(DatasetSplit::Train),
        plan.count_for(DatasetSplit::Val),
        plan.count_for(DatasetSplit::Test),
        plan.len()
    );

    Ok(plan)
}

/// Outcome of materializing a split plan on disk.
#[derive(Debug, Clone, Default)]
pub struct SplitSummary {
    pub labels_copied: usize,
    pub images_copied: usize,
    pub missing_images: usize,
}

/// Copy every planned label file and its image into
/// `<out_root>/<split>/{labels,images}`. Labels without a matching image are
/// still copied; the mismatch is logged and counted.
pub fn execute_split(
    plan: &SplitPlan,
    images_dir: &Path,
    labels_dir: &Path,
    out_root: &Path,
) -> Result<SplitSummary, SplitError> {
    let mut summary = SplitSummary::default();

    for split in DatasetSplit::all() {
        std::fs::create_dir_all(split.images_dir(out_root))?;
        std::fs::create_dir_all(split.labels_dir(out_root))?;
    }

    for (name, split) in &plan.assignments {
        let label_src = labels_dir.join(name);
        let label_dest = split.labels_dir(out_root).join(name);
        copy_file(&label_src, &label_dest)?;
        summary.labels_copied += 1;

        match image_for_label(&label_src, images_dir) {
            Some(image_src) => {
                // image_for_label only returns paths with a file name.
                if let Some(file_name) = image_src.file_name() {
                    let image_dest = split.images_dir(out_root).join(file_name);
                    copy_file(&image_src, &image_dest)?;
                    summary.images_copied += 1;
                }
            }
            None => {
                warn!("No image found for label {:?}", label_src);
                summary.missing_images += 1;
            }
        }
    }

    info!(
        "Split complete: {} labels, {} images copied, {} labels without an image",
        summary.labels_copied, summary.images_copied, summary.missing_images
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::count_classes;
    use std::fs;

    fn ratios() -> SplitRatios {
        SplitRatios {
            train: 0.6,
            val: 0.2,
            test: 0.2,
        }
    }

    fn build_counts(labels: &[(&str, &str)]) -> ClassCounts {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in labels {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let names: Vec<String> = ["rare", "common"].iter().map(|s| s.to_string()).collect();
        count_classes(&names, dir.path())
    }

    #[test]
    fn test_invalid_ratios_rejected() {
        let bad_sum = SplitRatios {
            train: 0.5,
            val: 0.2,
            test: 0.2,
        };
        assert!(matches!(
            bad_sum.validate(),
            Err(SplitError::InvalidRatios(_))
        ));

        let negative = SplitRatios {
            train: 1.2,
            val: -0.1,
            test: -0.1,
        };
        assert!(negative.validate().is_err());

        assert!(SplitRatios::default().validate().is_ok());
    }

    #[test]
    fn test_plan_is_disjoint_and_exhaustive() {
        let mut labels = Vec::new();
        let contents: Vec<(String, String)> = (0..50)
            .map(|i| {
                let content = if i % 10 == 0 {
                    // Every tenth image also holds the rare class.
                    "0 0.5 0.5 0.1 0.1\n1 0.2 0.2 0.1 0.1\n".to_string()
                } else {
                    "1 0.5 0.5 0.1 0.1\n".to_string()
                };
                (format!("img_{:03}.txt", i), content)
            })
            .collect();
        for (name, content) in &contents {
            labels.push((name.as_str(), content.as_str()));
        }
        let counts = build_counts(&labels);

        let plan = plan_split(&counts, &ratios(), 42).unwrap();

        assert_eq!(plan.len(), 50);
        let total: usize = DatasetSplit::all()
            .iter()
            .map(|s| plan.count_for(*s))
            .sum();
        assert_eq!(total, 50);
    }

    #[test]
    fn test_partition_sizes_match_ratios_within_rounding() {
        let contents: Vec<(String, String)> = (0..100)
            .map(|i| (format!("img_{:03}.txt", i), "1 0.5 0.5 0.1 0.1\n".to_string()))
            .collect();
        let labels: Vec<(&str, &str)> = contents
            .iter()
            .map(|(n, c)| (n.as_str(), c.as_str()))
            .collect();
        let counts = build_counts(&labels);

        let plan = plan_split(&counts, &ratios(), 7).unwrap();

        assert_eq!(plan.count_for(DatasetSplit::Val), 20);
        assert_eq!(plan.count_for(DatasetSplit::Test), 20);
        assert_eq!(plan.count_for(DatasetSplit::Train), 60);
    }

    #[test]
    fn test_same_seed_same_plan() {
        let contents: Vec<(String, String)> = (0..30)
            .map(|i| (format!("img_{:03}.txt", i), "1 0.5 0.5 0.1 0.1\n".to_string()))
            .collect();
        let labels: Vec<(&str, &str)> = contents
            .iter()
            .map(|(n, c)| (n.as_str(), c.as_str()))
            .collect();
        let counts = build_counts(&labels);

        let a = plan_split(&counts, &ratios(), 99).unwrap();
        let b = plan_split(&counts, &ratios(), 99).unwrap();

        for split in DatasetSplit::all() {
            assert_eq!(a.files_for(split), b.files_for(split));
        }
    }

    #[test]
    fn test_rare_class_stratified_before_common() {
        // 10 images with the rare class (which also appear in the common
        // pool) and 40 common-only images. The rare bucket must be
        // partitioned on its own, not swallowed by the common class.
        let contents: Vec<(String, String)> = (0..50)
            .map(|i| {
                let content = if i < 10 {
                    "0 0.5 0.5 0.1 0.1\n1 0.2 0.2 0.1 0.1\n".to_string()
                } else {
                    "1 0.5 0.5 0.1 0.1\n".to_string()
                };
                (format!("img_{:03}.txt", i), content)
            })
            .collect();
        let labels: Vec<(&str, &str)> = contents
            .iter()
            .map(|(n, c)| (n.as_str(), c.as_str()))
            .collect();
        let counts = build_counts(&labels);

        let plan = plan_split(&counts, &ratios(), 1).unwrap();

        let rare_files: Vec<String> = (0..10).map(|i| format!("img_{:03}.txt", i)).collect();
        let rare_val = rare_files
            .iter()
            .filter(|f| plan.split_for(f) == Some(DatasetSplit::Val))
            .count();
        let rare_test = rare_files
            .iter()
            .filter(|f| plan.split_for(f) == Some(DatasetSplit::Test))
            .count();
        // 10 rare images at 20%/20% round to 2 val and 2 test.
        assert_eq!(rare_val, 2);
        assert_eq!(rare_test, 2);
    }

    #[test]
    fn test_background_images_are_partitioned() {
        let contents: Vec<(String, String)> = (0..20)
            .map(|i| (format!("bg_{:03}.txt", i), String::new()))
            .collect();
        let labels: Vec<(&str, &str)> = contents
            .iter()
            .map(|(n, c)| (n.as_str(), c.as_str()))
            .collect();
        let counts = build_counts(&labels);

        let plan = plan_split(&counts, &ratios(), 3).unwrap();
        assert_eq!(plan.len(), 20);
        assert_eq!(plan.count_for(DatasetSplit::Val), 4);
        assert_eq!(plan.count_for(DatasetSplit::Test), 4);
    }

    #[test]
    fn test_execute_split_copies_pairs() {
        let pool = tempfile::tempdir().unwrap();
        let images = pool.path().join("images");
        let labels = pool.path().join("labels");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();
        for i in 0..10 {
            fs::write(labels.join(format!("img_{}.txt", i)), "1 0.5 0.5 0.1 0.1\n").unwrap();
            // Not a real png; the splitter only copies bytes.
            fs::write(images.join(format!("img_{}.png", i)), [0u8; 4]).unwrap();
        }

        let names: Vec<String> = ["rare", "common"].iter().map(|s| s.to_string()).collect();
        let counts = count_classes(&names, &labels);
        let plan = plan_split(&counts, &ratios(), 5).unwrap();

        let out = tempfile::tempdir().unwrap();
        let summary = execute_split(&plan, &images, &labels, out.path()).unwrap();

        assert_eq!(summary.labels_copied, 10);
        assert_eq!(summary.images_copied, 10);
        assert_eq!(summary.missing_images, 0);

        let train_labels = out.path().join("train").join("labels");
        let copied = fs::read_dir(train_labels).unwrap().count();
        assert_eq!(copied, plan.count_for(DatasetSplit::Train));
    }
}
