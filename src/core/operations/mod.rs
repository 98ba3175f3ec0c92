mod file_ops;
mod merge;

pub use file_ops::{append_to_file, copy_file, FileOpError, FileOpResult};
pub use merge::{merge_label_dirs, MergeSummary};
