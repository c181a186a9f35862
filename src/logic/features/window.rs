//! Lag and rolling-window helpers
//!
//! All helpers return `None` when the window is not fully populated. Callers
//! drop such rows instead of filling them.

/// Value `k` ticks before `i`
pub fn lag(series: &[f64], i: usize, k: usize) -> Option<f64> {
    i.checked_sub(k).and_then(|j| series.get(j)).copied()
}

/// Mean and sample std of a trailing window ending at `i` (inclusive)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingStats {
    pub mean: f64,
    pub std: f64,
}

pub fn rolling(series: &[f64], i: usize, window: usize) -> Option<RollingStats> {
    if window < 2 || i >= series.len() || i + 1 < window {
        return None;
    }

    let slice = &series[i + 1 - window..=i];
    let n = window as f64;
    let mean = slice.iter().sum::<f64>() / n;
    let variance = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);

    Some(RollingStats {
        mean,
        std: variance.sqrt(),
    })
}
