use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::core::dataset::list_label_files;

use super::{append_to_file, FileOpResult};

/// Outcome of a merge run.
#[derive(Debug, Clone, Default)]
pub struct MergeSummary {
    pub files_merged: usize,
    pub files_skipped_empty: usize,
}

/// Append the label lines of every `.txt` file in `source_dir` to the
/// same-named file in `dest_dir`.
///
/// Destination files are created when absent. Source files with no content
/// are skipped so predictions over background images do not leave stray
/// blank lines behind.
pub fn merge_label_dirs(source_dir: &Path, dest_dir: &Path) -> FileOpResult<MergeSummary> {
    info!("Merging labels from {:?} into {:?}", source_dir, dest_dir);

    let mut summary = MergeSummary::default();

    for source_path in list_label_files(source_dir) {
        let content = fs::read_to_string(&source_path)?;
        let content = content.trim_end();

        if content.is_empty() {
            summary.files_skipped_empty += 1;
            continue;
        }

        let Some(file_name) = source_path.file_name() else {
            warn!("Skipping label file with no file name: {:?}", source_path);
            continue;
        };

        append_to_file(&dest_dir.join(file_name), content)?;
        summary.files_merged += 1;
    }

    info!(
        "Merge complete: {} files merged, {} empty files skipped",
        summary.files_merged, summary.files_skipped_empty
    );

    Ok(summary)
}
