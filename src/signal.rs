//! Utilities for digital signals sampled from the behavioural rig.
use itertools::Itertools;

/// Thresholds a raw trace at half its maximum, returning a 0/1 trace.
/// A trace whose maximum is not positive is all zeros.
pub fn binarise(trace: &[f64]) -> Vec<f64> {
    let max = trace.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let threshold = max / 2.0;
    trace
        .iter()
        .map(|&x| if x > threshold { 1.0 } else { 0.0 })
        .collect()
}

/// Returns the indices `i` such that `trace[i] == 0` and `trace[i + 1] == 1`.
pub fn rising_edges(trace: &[f64]) -> Vec<usize> {
    trace
        .iter()
        .tuple_windows()
        .positions(|(&a, &b)| a == 0.0 && b == 1.0)
        .collect()
}

/// Returns the indices `i` such that `trace[i] == 1` and `trace[i + 1] == 0`.
pub fn falling_edges(trace: &[f64]) -> Vec<usize> {
    trace
        .iter()
        .tuple_windows()
        .positions(|(&a, &b)| a == 1.0 && b == 0.0)
        .collect()
}

/// Returns the permutation sorting the values in ascending order.
/// The sort is stable: equal values keep their original order.
pub fn argsort(values: &[f64]) -> Vec<usize> {
    (0..values.len())
        .sorted_by(|&i, &j| {
            values[i]
                .partial_cmp(&values[j])
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .collect()
}

/// Minimum of a trace, `None` for an empty trace.
pub fn min(trace: &[f64]) -> Option<f64> {
    trace.iter().cloned().reduce(f64::min)
}

/// Linearly interpolated percentile (in [0, 100]) of unsorted values.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let sorted: Vec<f64> = values
        .iter()
        .cloned()
        .sorted_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .collect();
    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}
