use std::fs;
use std::path::Path;
use tracing::error;

/// Result type for file operations
pub type FileOpResult<T> = Result<T, FileOpError>;

/// Error types for file operations
#[derive(Debug)]
pub enum FileOpError {
    CopyFailed(String),
    AppendFailed(String),
    IoError(std::io::Error),
}

impl std::fmt::Display for FileOpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOpError::CopyFailed(msg) => write!(f, "Copy failed: {}", msg),
            FileOpError::AppendFailed(msg) => write!(f, "Append failed: {}", msg),
            FileOpError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for FileOpError {}

impl From<std::io::Error> for FileOpError {
    fn from(error: std::io::Error) -> Self {
        FileOpError::IoError(error)
    }
}

/// Copy a file, reporting both paths on failure.
pub fn copy_file(src: &Path, dest: &Path) -> FileOpResult<()> {
    if let Err(e) = fs::copy(src, dest) {
        error!("Failed to copy file from {:?} to {:?}: {}", src, dest, e);
        return Err(FileOpError::CopyFailed(format!(
            "Failed to copy from {:?} to {:?}: {}",
            src, dest, e
        )));
    }
    Ok(())
}

/// Append `content` to `dest` preceded by a newline, creating the file if
/// it does not exist yet.
pub fn append_to_file(dest: &Path, content: &str) -> FileOpResult<()> {
    use std::io::Write;

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dest)
        .map_err(|e| {
            error!("Failed to open {:?} for append: {}", dest, e);
            FileOpError::AppendFailed(format!("Failed to open {:?}: {}", dest, e))
        })?;

    write!(file, "\n{}", content).map_err(|e| {
        error!("Failed to append to {:?}: {}", dest, e);
        FileOpError::AppendFailed(format!("Failed to write to {:?}: {}", dest, e))
    })?;

    Ok(())
}
