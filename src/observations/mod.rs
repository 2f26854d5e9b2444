mod accuracy;
mod merge;
mod types;

pub use accuracy::{accuracy, accuracy_by_weather, accuracy_report, Accuracy, AccuracyReport};
pub use merge::{merge, DataQualityWarning, MatchStatus, Merged, MergedRecord};
pub use types::{ObservationRecord, Weather};
