use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::observations::merge::{MatchStatus, MergedRecord};
use crate::observations::Weather;

/// Success counts over observations that matched a prediction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct Accuracy {
    pub matched: usize,
    pub successful: usize,
    /// `None` when nothing was matched.
    pub ratio: Option<f64>,
}

impl Accuracy {
    fn from_counts(matched: usize, successful: usize) -> Self {
        let ratio = if matched == 0 {
            None
        } else {
            Some(successful as f64 / matched as f64)
        };
        Self {
            matched,
            successful,
            ratio,
        }
    }

    pub fn failed(&self) -> usize {
        self.matched - self.successful
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct AccuracyReport {
    pub overall: Accuracy,
    pub by_weather: BTreeMap<Weather, Accuracy>,
}

pub fn accuracy(merged: &[MergedRecord]) -> Accuracy {
    let (matched, successful) = matched_outcomes(merged)
        .fold((0, 0), |(n, ok), (_, success)| (n + 1, ok + usize::from(success)));
    Accuracy::from_counts(matched, successful)
}

pub fn accuracy_by_weather(merged: &[MergedRecord]) -> BTreeMap<Weather, Accuracy> {
    let mut counts: BTreeMap<Weather, (usize, usize)> = BTreeMap::new();
    for (weather, success) in matched_outcomes(merged) {
        let entry = counts.entry(weather).or_default();
        entry.0 += 1;
        entry.1 += usize::from(success);
    }
    counts
        .into_iter()
        .map(|(weather, (n, ok))| (weather, Accuracy::from_counts(n, ok)))
        .collect()
}

pub fn accuracy_report(merged: &[MergedRecord]) -> AccuracyReport {
    AccuracyReport {
        overall: accuracy(merged),
        by_weather: accuracy_by_weather(merged),
    }
}

fn matched_outcomes(merged: &[MergedRecord]) -> impl Iterator<Item = (Weather, bool)> + '_ {
    merged
        .iter()
        .filter(|r| r.status == MatchStatus::Observed)
        .filter_map(|r| r.observation.as_ref())
        .map(|o| (o.weather, o.success))
}
