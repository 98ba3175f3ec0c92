mod class_counts;
mod splitter;

pub use class_counts::{count_classes, ClassCounts, ClassTally};
pub use splitter::{
    execute_split, plan_split, SplitError, SplitPlan, SplitRatios, SplitSummary,
};
