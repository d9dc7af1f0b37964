//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// `min(base × factor^attempt, max)`, saturating at `max`.
pub fn exponential(base: Duration, factor: f64, attempt: u32, max: Duration) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let scaled = base.as_nanos() as f64 * factor.powi(exponent);
    if !scaled.is_finite() || scaled >= max.as_nanos() as f64 {
        return max;
    }
    Duration::from_nanos(scaled as u64).min(max)
}

/// Uniform random delay in `[0, max]`.
pub fn jitter(max: Duration) -> Duration {
    let nanos = u64::try_from(max.as_nanos()).unwrap_or(u64::MAX);
    if nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rand::thread_rng().gen_range(0..=nanos))
}
