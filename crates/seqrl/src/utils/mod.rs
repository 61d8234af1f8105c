//! Utility functions.

/// Seed libtorch's global generator (no-op without `torch`).
///
/// Samplers and replay buffers in this crate carry their own seeded
/// `StdRng` and do not depend on this.
pub fn set_seed(_seed: u64) {
    #[cfg(feature = "torch")]
    tch::manual_seed(_seed as i64);
}

/// Short display form of a sequence count: `950`, `12.3K`, `4.0M`
pub fn abbreviate(count: u64) -> String {
    const UNITS: [(u64, &str); 3] = [(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];
    UNITS
        .iter()
        .find(|&&(scale, _)| count >= scale)
        .map(|&(scale, suffix)| format!("{:.1}{}", count as f64 / scale as f64, suffix))
        .unwrap_or_else(|| count.to_string())
}

/// Whole seconds as `1h 2m 3s`; negative or non-finite input is `0s`
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, total / 60 % 60, total % 60);
    match (hours, minutes) {
        (0, 0) => format!("{}s", secs),
        (0, _) => format!("{}m {}s", minutes, secs),
        _ => format!("{}h {}m {}s", hours, minutes, secs),
    }
}

/// Summary of a batch of scalars
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Mean, min and max of `values`; `None` when empty
pub fn summarize<I>(values: I) -> Option<Summary>
where
    I: IntoIterator,
    I::Item: Into<f64>,
{
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in values {
        let v = value.into();
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    (count > 0).then(|| Summary {
        mean: sum / count as f64,
        min,
        max,
    })
}
