// SPDX-FileCopyrightText: 2026 Costguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Baseline cost statistics for anomaly detection.
//!
//! A baseline summarizes recent "normal" cost/token behavior for one
//! feature+model pair using median and P90 statistics, which are robust
//! to outliers. Baselines are computed fresh on every call from the
//! supplied events, never cached or incrementally updated.

use chrono::{DateTime, Duration, Utc};
use costguard_core::{CostGuardError, UsageEvent};
use serde::Serialize;

/// Minimum sample size for a baseline to be trusted for anomaly detection.
pub const WARM_SAMPLE_THRESHOLD: usize = 20;

/// Lookback window applied when sampling events.
const WINDOW_DAYS: i64 = 7;

/// Cap on the number of most-recent events included in the sample.
const MAX_SAMPLE_EVENTS: usize = 200;

/// Whether a baseline's sample is large enough to trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BaselineState {
    /// Insufficient data; metrics must not be used for anomaly detection.
    Cold,
    /// Sufficient data for reliable comparisons.
    Warm,
}

/// Statistical metrics computed from usage events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineMetrics {
    /// Median per-request cost in USD.
    pub median_cost: f64,
    /// 90th-percentile per-request cost in USD.
    pub p90_cost: f64,
    /// Median total tokens per request.
    pub median_tokens: u64,
    /// Number of events in the sample.
    pub sample_count: usize,
}

/// Complete baseline computation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineResult {
    /// Computed metrics. `None` only for the simulation harness's COLD
    /// baselines; [`compute_baseline`] always fills them, but COLD callers
    /// must treat them as unusable.
    pub metrics: Option<BaselineMetrics>,
    /// Sample trustworthiness.
    pub state: BaselineState,
    /// Timestamp of the oldest event in the sample.
    pub window_start: DateTime<Utc>,
    /// Timestamp of the newest event in the sample.
    pub window_end: DateTime<Utc>,
}

/// Compute baseline metrics from usage events for one feature+model pair.
///
/// Events are re-sorted newest first so the result is independent of input
/// order. Two caps apply simultaneously while walking newest to oldest:
/// events older than 7 days are dropped, and the sample stops at the 200
/// most-recent events, whichever boundary is hit first.
pub fn compute_baseline(events: &[UsageEvent]) -> Result<BaselineResult, CostGuardError> {
    if events.is_empty() {
        return Err(CostGuardError::InvalidInput(
            "events list cannot be empty".to_string(),
        ));
    }

    for (i, event) in events.iter().enumerate() {
        if !event.estimated_cost.is_finite() || event.estimated_cost < 0.0 {
            return Err(CostGuardError::InvalidInput(format!(
                "event at index {i} has an invalid estimated_cost ({})",
                event.estimated_cost
            )));
        }
    }

    let mut sorted: Vec<&UsageEvent> = events.iter().collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let cutoff = Utc::now() - Duration::days(WINDOW_DAYS);
    let mut sample: Vec<&UsageEvent> = Vec::new();
    for event in sorted {
        if event.timestamp < cutoff {
            break;
        }
        sample.push(event);
        if sample.len() >= MAX_SAMPLE_EVENTS {
            break;
        }
    }

    if sample.is_empty() {
        return Err(CostGuardError::InvalidInput(format!(
            "no events found within the {WINDOW_DAYS}-day window"
        )));
    }

    let state = if sample.len() >= WARM_SAMPLE_THRESHOLD {
        BaselineState::Warm
    } else {
        BaselineState::Cold
    };

    let costs: Vec<f64> = sample.iter().map(|e| e.estimated_cost).collect();
    let tokens: Vec<f64> = sample.iter().map(|e| f64::from(e.total_tokens)).collect();

    let median_cost = exact_percentile(&costs, 50.0)?;
    let p90_cost = exact_percentile(&costs, 90.0)?;
    let median_tokens = exact_percentile(&tokens, 50.0)? as u64;

    // Newest first, so the window runs from the last sample entry to the first.
    let window_end = sample[0].timestamp;
    let window_start = sample[sample.len() - 1].timestamp;
    if window_start > window_end {
        return Err(CostGuardError::Internal(
            "baseline window_start is after window_end".to_string(),
        ));
    }

    Ok(BaselineResult {
        metrics: Some(BaselineMetrics {
            median_cost,
            p90_cost,
            median_tokens,
            sample_count: sample.len(),
        }),
        state,
        window_start,
        window_end,
    })
}

/// Compute an exact percentile using linear interpolation.
///
/// Same method as numpy's `percentile(..., interpolation="linear")`:
/// sort ascending, take `position = (p / 100) * (n - 1)` and interpolate
/// between the bracketing values. Bit-reproducible for identical inputs.
pub fn exact_percentile(values: &[f64], percentile: f64) -> Result<f64, CostGuardError> {
    if values.is_empty() {
        return Err(CostGuardError::InvalidInput(
            "values list cannot be empty".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&percentile) {
        return Err(CostGuardError::InvalidInput(format!(
            "percentile must be between 0 and 100, got {percentile}"
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();

    let position = (percentile / 100.0) * (n - 1) as f64;
    let lower_index = position.floor() as usize;
    let upper_index = (lower_index + 1).min(n - 1);
    let fraction = position - lower_index as f64;

    let lower_value = sorted[lower_index];
    let upper_value = sorted[upper_index];

    Ok(lower_value + fraction * (upper_value - lower_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use costguard_core::TokenUsage;
    use proptest::prelude::*;

    fn event(cost: f64, tokens: u32, age_hours: i64) -> UsageEvent {
        UsageEvent::new(
            Utc::now() - Duration::hours(age_hours),
            "test_feature",
            "test_model",
            TokenUsage {
                prompt_tokens: tokens / 2,
                completion_tokens: tokens - tokens / 2,
            },
            cost,
            0,
            None,
        )
        .unwrap()
    }

    #[test]
    fn percentile_median_even_count() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((exact_percentile(&values, 50.0).unwrap() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn percentile_median_odd_count() {
        let values = [1.0, 2.0, 3.0];
        assert!((exact_percentile(&values, 50.0).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn percentile_p90_ten_values() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        // Position 8.1: 9.0 + 0.1 * (10.0 - 9.0)
        assert!((exact_percentile(&values, 90.0).unwrap() - 9.1).abs() < 1e-12);
    }

    #[test]
    fn percentile_p90_interpolates() {
        let values = [10.0, 20.0, 30.0, 40.0];
        // Position 2.7: 30.0 + 0.7 * (40.0 - 30.0)
        assert!((exact_percentile(&values, 90.0).unwrap() - 37.0).abs() < 1e-12);
    }

    #[test]
    fn percentile_zero_is_min_hundred_is_max() {
        let values = [5.0, 10.0, 15.0];
        assert!((exact_percentile(&values, 0.0).unwrap() - 5.0).abs() < 1e-12);
        assert!((exact_percentile(&values, 100.0).unwrap() - 15.0).abs() < 1e-12);
    }

    #[test]
    fn percentile_ignores_input_order() {
        let shuffled = [15.0, 5.0, 10.0];
        assert!((exact_percentile(&shuffled, 50.0).unwrap() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn percentile_empty_values_is_an_error() {
        let err = exact_percentile(&[], 50.0).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn percentile_out_of_range_is_an_error() {
        let values = [1.0, 2.0, 3.0];
        assert!(exact_percentile(&values, -1.0).is_err());
        assert!(exact_percentile(&values, 101.0).is_err());
    }

    #[test]
    fn cold_baseline_below_twenty_events() {
        let events: Vec<UsageEvent> = (0..10)
            .map(|i| event(f64::from(i) + 1.0, (i as u32 + 1) * 10, i.into()))
            .collect();

        let result = compute_baseline(&events).unwrap();
        assert_eq!(result.state, BaselineState::Cold);
        let metrics = result.metrics.unwrap();
        assert_eq!(metrics.sample_count, 10);
        assert!((metrics.median_cost - 5.5).abs() < 1e-12);
        assert!((metrics.p90_cost - 9.1).abs() < 1e-12);
        assert_eq!(metrics.median_tokens, 55);
    }

    #[test]
    fn warm_baseline_with_twenty_five_events() {
        // Costs 1.0..=25.0: median 13.0, p90 at position 21.6 = 22.6.
        let events: Vec<UsageEvent> = (0..25)
            .map(|i| event(f64::from(i) + 1.0, 100, i.into()))
            .collect();

        let result = compute_baseline(&events).unwrap();
        assert_eq!(result.state, BaselineState::Warm);
        let metrics = result.metrics.unwrap();
        assert_eq!(metrics.sample_count, 25);
        assert!((metrics.median_cost - 13.0).abs() < 1e-12);
        assert!((metrics.p90_cost - 22.6).abs() < 1e-9);
    }

    #[test]
    fn empty_events_is_an_error() {
        let err = compute_baseline(&[]).unwrap_err();
        assert!(matches!(err, CostGuardError::InvalidInput(_)));
    }

    #[test]
    fn invalid_cost_is_an_error() {
        let mut bad = event(1.0, 100, 1);
        bad.estimated_cost = f64::NAN;
        let err = compute_baseline(&[bad]).unwrap_err();
        assert!(err.to_string().contains("estimated_cost"));
    }

    #[test]
    fn all_events_outside_window_is_an_error() {
        let events = vec![event(1.0, 100, 24 * 10), event(2.0, 200, 24 * 9)];
        let err = compute_baseline(&events).unwrap_err();
        assert!(err.to_string().contains("7-day window"));
    }

    #[test]
    fn events_older_than_window_are_dropped() {
        let mut events: Vec<UsageEvent> = (0..5).map(|i| event(1.0, 100, i)).collect();
        events.push(event(100.0, 100, 24 * 8)); // outside the 7-day window

        let result = compute_baseline(&events).unwrap();
        assert_eq!(result.metrics.unwrap().sample_count, 5);
    }

    #[test]
    fn sample_caps_at_two_hundred_events() {
        // 250 events, all within the window, one minute apart.
        let events: Vec<UsageEvent> = (0..250)
            .map(|i| {
                UsageEvent::new(
                    Utc::now() - Duration::minutes(i),
                    "test_feature",
                    "test_model",
                    TokenUsage {
                        prompt_tokens: 50,
                        completion_tokens: 50,
                    },
                    1.0,
                    0,
                    None,
                )
                .unwrap()
            })
            .collect();

        let result = compute_baseline(&events).unwrap();
        assert_eq!(result.metrics.unwrap().sample_count, 200);
    }

    #[test]
    fn window_bounds_follow_sample() {
        let newest = event(1.0, 100, 1);
        let oldest = event(2.0, 100, 48);
        let result = compute_baseline(&[oldest.clone(), newest.clone()]).unwrap();
        assert_eq!(result.window_end, newest.timestamp);
        assert_eq!(result.window_start, oldest.timestamp);
        assert!(result.window_start <= result.window_end);
    }

    #[test]
    fn deterministic_regardless_of_input_order() {
        let events: Vec<UsageEvent> = (0..30)
            .map(|i| event(f64::from(i) + 1.0, (i as u32 + 1) * 10, i.into()))
            .collect();
        let mut reversed = events.clone();
        reversed.reverse();

        let a = compute_baseline(&events).unwrap();
        let b = compute_baseline(&reversed).unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn percentile_stays_within_bounds(
            values in proptest::collection::vec(0.0f64..1000.0, 1..50),
            percentile in 0.0f64..=100.0,
        ) {
            let result = exact_percentile(&values, percentile).unwrap();
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(result >= min && result <= max);
        }

        #[test]
        fn baseline_window_invariant_holds(
            ages in proptest::collection::vec(0i64..167, 1..60),
        ) {
            let events: Vec<UsageEvent> =
                ages.iter().map(|&h| event(1.0, 100, h)).collect();
            let result = compute_baseline(&events).unwrap();
            prop_assert!(result.window_start <= result.window_end);
        }
    }
}
