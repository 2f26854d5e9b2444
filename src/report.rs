use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::observations::Accuracy;
use crate::predict::PredictedPass;

const BAR_WIDTH: usize = 40;

/// Number of passes rising on each UTC date.
pub fn passes_per_day(passes: &[PredictedPass]) -> BTreeMap<NaiveDate, usize> {
    let mut counts = BTreeMap::new();
    for pass in passes {
        *counts.entry(pass.rise_time.date_naive()).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct OutcomeBreakdown {
    pub successful: usize,
    pub failed: usize,
}

impl From<&Accuracy> for OutcomeBreakdown {
    fn from(accuracy: &Accuracy) -> Self {
        Self {
            successful: accuracy.successful,
            failed: accuracy.failed(),
        }
    }
}

/// Horizontal bar chart, one labelled row per entry, scaled to the largest value.
pub fn render_bar_chart(title: &str, entries: impl IntoIterator<Item = (String, usize)>) -> String {
    let entries: Vec<(String, usize)> = entries.into_iter().collect();
    let mut out = String::new();
    let _ = writeln!(out, "{}", title);

    if entries.is_empty() {
        let _ = writeln!(out, "  (no data)");
        return out;
    }

    let label_width = entries.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    let max = entries.iter().map(|(_, v)| *v).max().unwrap_or(0).max(1);

    for (label, value) in &entries {
        let len = value * BAR_WIDTH / max;
        let _ = writeln!(
            out,
            "  {:<width$} | {} {}",
            label,
            "#".repeat(len),
            value,
            width = label_width
        );
    }
    out
}

pub fn passes_per_day_chart(passes: &[PredictedPass]) -> String {
    render_bar_chart(
        "Passes per day",
        passes_per_day(passes)
            .into_iter()
            .map(|(date, count)| (date.to_string(), count)),
    )
}

pub fn outcome_chart(accuracy: &Accuracy) -> String {
    let breakdown = OutcomeBreakdown::from(accuracy);
    let title = match accuracy.ratio {
        Some(ratio) => format!("Observation outcomes ({:.1}% successful)", ratio * 100.0),
        None => "Observation outcomes (no matched observations)".to_string(),
    };
    if accuracy.matched == 0 {
        return render_bar_chart(&title, Vec::new());
    }
    render_bar_chart(
        &title,
        [
            ("successful".to_string(), breakdown.successful),
            ("failed".to_string(), breakdown.failed),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::{best_passes, pass_id, Visibility};
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn pass_at(day: u32, hour: u32, peak_altitude: f64) -> PredictedPass {
        let rise_time = Utc.with_ymd_and_hms(2025, 10, day, hour, 0, 0).unwrap();
        PredictedPass {
            pass_id: pass_id(rise_time),
            rise_time,
            peak_time: rise_time + Duration::minutes(3),
            set_time: rise_time + Duration::minutes(6),
            peak_altitude,
            azimuth: 10.0,
            magnitude: -1.0,
            duration_minutes: 6.0,
            range_km: 900.0,
            sun_altitude: -8.0,
            visibility: Visibility::Visible,
        }
    }

    #[test]
    fn counts_passes_by_rise_date() {
        let passes = vec![pass_at(5, 1, 20.0), pass_at(5, 23, 35.0), pass_at(7, 2, 80.0)];
        let counts = passes_per_day(&passes);

        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&NaiveDate::from_ymd_opt(2025, 10, 5).unwrap()], 2);
        assert_eq!(counts[&NaiveDate::from_ymd_opt(2025, 10, 7).unwrap()], 1);
    }

    #[test]
    fn best_passes_keeps_high_ones_in_order() {
        let passes = vec![pass_at(5, 1, 20.0), pass_at(5, 23, 35.0), pass_at(7, 2, 80.0)];
        let best = best_passes(&passes, 30.0);
        let ids: Vec<_> = best.iter().map(|p| p.pass_id.as_str()).collect();
        assert_eq!(ids, vec!["20251005T230000Z", "20251007T020000Z"]);
    }

    #[test]
    fn bar_chart_scales_to_largest() {
        let chart = render_bar_chart(
            "t",
            vec![("a".to_string(), 4), ("bb".to_string(), 2)],
        );
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines[0], "t");
        assert_eq!(lines[1], format!("  a  | {} 4", "#".repeat(BAR_WIDTH)));
        assert_eq!(lines[2], format!("  bb | {} 2", "#".repeat(BAR_WIDTH / 2)));
    }

    #[test]
    fn outcome_chart_without_observations() {
        let chart = outcome_chart(&Accuracy::default());
        assert!(chart.contains("no matched observations"));
        assert!(chart.contains("(no data)"));
    }
}
