use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::Utc;

/// Millisecond-timestamp ids, strictly increasing within the process.
///
/// Once the numeric range is used up (a loaded id at `i64::MAX`), ids continue as
/// `9223372036854775807-<n>` with a separate counter.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
    overflow: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Acquire);
        loop {
            let Some(after) = prev.checked_add(1) else {
                return self.next_overflow_id();
            };
            let candidate = now.max(after);
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return candidate.to_string(),
                Err(actual) => prev = actual,
            }
        }
    }

    /// Ensure future ids sort after an id that already exists. Ids that are neither
    /// positive integers nor overflow ids are ignored.
    pub fn observe(&self, id: &str) {
        if let Some((base, suffix)) = id.split_once('-') {
            if base.parse::<i64>() == Ok(i64::MAX) {
                if let Ok(n) = suffix.parse::<u64>() {
                    self.last.store(i64::MAX, Ordering::Release);
                    self.overflow.fetch_max(n, Ordering::AcqRel);
                }
            }
            return;
        }
        if let Ok(n) = id.parse::<i64>() {
            if n > 0 {
                self.last.fetch_max(n, Ordering::AcqRel);
            }
        }
    }

    fn next_overflow_id(&self) -> String {
        let n = self.overflow.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        format!("{}-{n}", i64::MAX)
    }
}
