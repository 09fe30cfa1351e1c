//! Helpers shared by the tool definitions.

/// Current UTC time as RFC 3339, used for `generated_at` style fields.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Clamp a requested count into `1..=max`.
pub fn clamp_count<T: Ord + From<u8>>(requested: T, max: T) -> T {
    requested.clamp(T::from(1), max)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percent change from `previous` to `latest`, rounded to 2 decimals.
/// Requires both values to be present and non-zero.
pub fn percent_change(latest: Option<f64>, previous: Option<f64>) -> Option<f64> {
    match (latest, previous) {
        (Some(latest), Some(previous)) if latest != 0.0 && previous != 0.0 => {
            Some(round2((latest - previous) / previous * 100.0))
        }
        _ => None,
    }
}

/// `increasing` above +5%, `decreasing` below -5%, otherwise `stable`.
pub fn classify_trend(change_percent: Option<f64>) -> &'static str {
    match change_percent {
        Some(change) if change > 5.0 => "increasing",
        Some(change) if change < -5.0 => "decreasing",
        _ => "stable",
    }
}

/// Bucket two revenue figures by the ratio of the smaller to the larger.
pub fn revenue_similarity(a: Option<f64>, b: Option<f64>) -> &'static str {
    let (Some(a), Some(b)) = (a, b) else {
        return "unknown";
    };
    if a == 0.0 || b == 0.0 {
        return "unknown";
    }

    let ratio = a.min(b) / a.max(b);
    if ratio > 0.8 {
        "very_similar"
    } else if ratio > 0.5 {
        "similar"
    } else if ratio > 0.2 {
        "somewhat_similar"
    } else {
        "different"
    }
}

/// Mean of the present, non-zero values.
pub fn mean_non_zero(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .filter(|v| *v != 0.0)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}
