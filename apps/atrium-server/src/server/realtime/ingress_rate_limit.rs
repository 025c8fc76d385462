use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

/// Per-connection budget of inbound data frames over a sliding window.
///
/// Text and binary frames both spend a slot, so a client cannot flood with
/// frames that are later dropped. A refused frame spends nothing.
#[derive(Debug)]
pub(crate) struct ChatIngressLimiter {
    limit: usize,
    window: Duration,
    admitted: VecDeque<Instant>,
}

impl ChatIngressLimiter {
    pub(crate) fn new(limit: u32, window: Duration) -> Self {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Self {
            limit,
            window,
            admitted: VecDeque::with_capacity(limit.min(64)),
        }
    }

    pub(crate) fn admit(&mut self, now: Instant) -> bool {
        while self
            .admitted
            .front()
            .is_some_and(|oldest| now.saturating_duration_since(*oldest) >= self.window)
        {
            self.admitted.pop_front();
        }

        if self.admitted.len() >= self.limit {
            return false;
        }
        self.admitted.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::ChatIngressLimiter;

    #[test]
    fn admits_up_to_the_limit_then_refuses() {
        let start = Instant::now();
        let mut limiter = ChatIngressLimiter::new(2, Duration::from_secs(10));

        assert!(limiter.admit(start));
        assert!(limiter.admit(start + Duration::from_secs(1)));
        assert!(!limiter.admit(start + Duration::from_secs(2)));
    }

    #[test]
    fn refused_frames_do_not_extend_the_window() {
        let start = Instant::now();
        let mut limiter = ChatIngressLimiter::new(1, Duration::from_secs(10));

        assert!(limiter.admit(start));
        for offset in 1..10 {
            assert!(!limiter.admit(start + Duration::from_secs(offset)));
        }
        assert!(limiter.admit(start + Duration::from_secs(10)));
    }

    #[test]
    fn slots_free_up_as_frames_age_out() {
        let start = Instant::now();
        let mut limiter = ChatIngressLimiter::new(2, Duration::from_secs(5));

        assert!(limiter.admit(start));
        assert!(limiter.admit(start + Duration::from_secs(3)));
        assert!(!limiter.admit(start + Duration::from_secs(4)));
        assert!(limiter.admit(start + Duration::from_secs(5)));
        assert!(!limiter.admit(start + Duration::from_secs(6)));
    }
}
