use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

/// Transfer-rate estimate from cumulative bytes since start.
///
/// Tasks record acknowledged chunk sizes; the reporter reads an average
/// rate and an ETA. Reporting only; no scheduling decision depends on it.
#[derive(Debug)]
pub struct SpeedEstimator {
    started: Instant,
    bytes: AtomicI64,
}

impl SpeedEstimator {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            bytes: AtomicI64::new(0),
        }
    }

    /// Records `bytes` as transferred.
    pub fn record(&self, bytes: i64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Total bytes recorded so far.
    pub fn bytes_transferred(&self) -> i64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Average rate in bytes/second since start. 0.0 until bytes arrive.
    pub fn bytes_per_second(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.bytes_transferred() as f64 / elapsed
    }

    /// Estimated time to transfer `remaining_bytes` at the current rate.
    ///
    /// `None` while the rate is zero.
    pub fn eta(&self, remaining_bytes: i64) -> Option<Duration> {
        let speed = self.bytes_per_second();
        if speed <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining_bytes.max(0) as f64 / speed))
    }
}

impl Default for SpeedEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn zero_bytes_means_zero_speed_and_no_eta() {
        let estimator = SpeedEstimator::new();
        assert_eq!(estimator.bytes_per_second(), 0.0);
        assert!(estimator.eta(1000).is_none());
    }

    #[test]
    fn records_accumulate() {
        let estimator = SpeedEstimator::new();
        estimator.record(100);
        estimator.record(250);
        assert_eq!(estimator.bytes_transferred(), 350);
    }

    #[test]
    fn speed_and_eta_positive_after_transfer() {
        let estimator = SpeedEstimator::new();
        estimator.record(4096);
        thread::sleep(Duration::from_millis(20));

        let speed = estimator.bytes_per_second();
        assert!(speed > 0.0);

        let eta = estimator.eta(8192).unwrap();
        assert!(eta.as_secs_f64() > 0.0);
    }

    #[test]
    fn eta_clamps_negative_remainder() {
        let estimator = SpeedEstimator::new();
        estimator.record(100);
        thread::sleep(Duration::from_millis(5));
        assert_eq!(estimator.eta(-50).unwrap(), Duration::ZERO);
    }

    #[test]
    fn concurrent_records() {
        let estimator = Arc::new(SpeedEstimator::new());
        let mut handles = vec![];
        for _ in 0..8 {
            let e = Arc::clone(&estimator);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    e.record(1);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(estimator.bytes_transferred(), 800);
    }
}
