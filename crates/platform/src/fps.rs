use std::time::{Duration, Instant};

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Counts presented frames, reporting an average about once per second.
pub struct FpsCounter {
    frames: u32,
    since: Instant,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            frames: 0,
            since: Instant::now(),
        }
    }

    pub fn frame(&mut self) -> Option<f64> {
        self.frame_at(Instant::now())
    }

    fn frame_at(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.since);
        if elapsed < REPORT_INTERVAL {
            return None;
        }
        let fps = f64::from(self.frames) / elapsed.as_secs_f64();
        self.frames = 0;
        self.since = now;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_interval() {
        let mut fps = FpsCounter::new();
        let start = fps.since;
        for i in 1..60 {
            assert_eq!(fps.frame_at(start + Duration::from_millis(i * 10)), None);
        }
        let report = fps.frame_at(start + Duration::from_secs(2)).unwrap();
        assert!((report - 30.0).abs() < 1e-9);
        assert_eq!(fps.frame_at(start + Duration::from_millis(2100)), None);
    }
}
