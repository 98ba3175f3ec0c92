use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// The three partitions a YOLO dataset is organized into on disk:
/// `<root>/<split>/images` and `<root>/<split>/labels`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetSplit {
    Train,
    Val,
    Test,
}

impl DatasetSplit {
    pub fn as_str(&self) -> &str {
        match self {
            DatasetSplit::Train => "train",
            DatasetSplit::Val => "val",
            DatasetSplit::Test => "test",
        }
    }

    pub fn all() -> [DatasetSplit; 3] {
        [DatasetSplit::Train, DatasetSplit::Val, DatasetSplit::Test]
    }

    pub fn images_dir(&self, root: &Path) -> PathBuf {
        root.join(self.as_str()).join("images")
    }

    pub fn labels_dir(&self, root: &Path) -> PathBuf {
        root.join(self.as_str()).join("labels")
    }
}

fn has_extension(path: &Path, wanted: &[&str]) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            wanted.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// List all image files (png/jpg/jpeg) in a directory, sorted for
/// consistent ordering.
pub fn list_image_files(dir: &Path) -> Vec<PathBuf> {
    list_files_with_extensions(dir, &["png", "jpg", "jpeg"])
}

/// List all label files (`*.txt`) in a directory, sorted.
pub fn list_label_files(dir: &Path) -> Vec<PathBuf> {
    list_files_with_extensions(dir, &["txt"])
}

fn list_files_with_extensions(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if has_extension(&path, extensions) {
                files.push(path);
            }
        }
    } else {
        warn!("Failed to read directory: {:?}", dir);
    }

    files.sort();
    files
}

/// Find the image file in `images_dir` that shares a stem with the given
/// label file. Tries the known image extensions in order.
pub fn image_for_label(label_path: &Path, images_dir: &Path) -> Option<PathBuf> {
    let stem = label_path.file_stem()?;
    for ext in ["png", "jpg", "jpeg"] {
        let candidate = images_dir.join(format!("{}.{}", stem.to_string_lossy(), ext));
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}
