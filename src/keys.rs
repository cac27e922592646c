//! Synthetic logical keys
//!
//! Some hosts ask for "a new independent member" without giving the writer a
//! key. Those marks use clock-derived keys kept in the upper half of the `u64`
//! range, so they never collide with caller keys below [`SYNTHETIC_KEY_BASE`].
//!
//! Known limitation: a stream that mixes caller keys and synthetic keys must
//! still be strictly increasing, so caller keys cannot follow a synthetic mark.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// First synthetic key; caller keys are expected below this
pub const SYNTHETIC_KEY_BASE: u64 = 1 << 63;

/// Last key handed out in this process
static LAST_SYNTHETIC: AtomicU64 = AtomicU64::new(0);

/// Next clock-derived key, strictly greater than any returned before.
///
/// Nanoseconds since the Unix epoch, wrapped into 63 bits and offset by
/// [`SYNTHETIC_KEY_BASE`]. If the clock stalls or steps back the previous
/// key + 1 is used instead.
pub fn next_synthetic_key() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let candidate = SYNTHETIC_KEY_BASE | (nanos as u64 & (SYNTHETIC_KEY_BASE - 1));

    let mut last = LAST_SYNTHETIC.load(Ordering::Relaxed);
    loop {
        let next = candidate.max(last.saturating_add(1)).max(SYNTHETIC_KEY_BASE);
        match LAST_SYNTHETIC.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Whether `key` came from [`next_synthetic_key`]'s range
pub fn is_synthetic(key: u64) -> bool {
    key >= SYNTHETIC_KEY_BASE
}
