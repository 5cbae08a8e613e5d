//! Per-client sliding-window rate limiting.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const WINDOW: Duration = Duration::from_secs(60);
// Idle clients are dropped once the table grows past this.
const PRUNE_THRESHOLD: usize = 1024;

/// Tracks request timestamps per client address.
///
/// A client may make `limit` requests in any trailing 60-second window. A
/// limit of zero disables the limiter.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    clients: Mutex<HashMap<IpAddr, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Creates a limiter allowing `limit` requests per minute per client.
    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, WINDOW)
    }

    /// Creates a limiter with an explicit window.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Records a request from `client` and reports whether it is allowed.
    pub fn try_acquire(&self, client: IpAddr) -> bool {
        self.try_acquire_at(client, Instant::now())
    }

    fn try_acquire_at(&self, client: IpAddr, now: Instant) -> bool {
        if self.limit == 0 {
            return true;
        }

        let mut clients = self.clients.lock();
        if clients.len() > PRUNE_THRESHOLD {
            let window = self.window;
            clients.retain(|_, stamps| {
                stamps
                    .back()
                    .is_some_and(|last| now.duration_since(*last) <= window)
            });
        }

        let stamps = clients.entry(client).or_default();
        while let Some(front) = stamps.front() {
            if now.duration_since(*front) > self.window {
                stamps.pop_front();
            } else {
                break;
            }
        }

        if stamps.len() < self.limit as usize {
            stamps.push_back(now);
            true
        } else {
            false
        }
    }

    /// Requests left for `client` in the current window, or `None` when the
    /// limiter is disabled.
    pub fn remaining(&self, client: IpAddr) -> Option<u32> {
        if self.limit == 0 {
            return None;
        }
        let now = Instant::now();
        let clients = self.clients.lock();
        let used = clients.get(&client).map_or(0, |stamps| {
            stamps
                .iter()
                .filter(|stamp| now.duration_since(**stamp) <= self.window)
                .count()
        });
        Some(
            self.limit
                .saturating_sub(u32::try_from(used).unwrap_or(u32::MAX)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const A: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    const B: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    #[test]
    fn limits_each_client_separately() {
        let limiter = RateLimiter::per_minute(2);

        assert!(limiter.try_acquire(A));
        assert!(limiter.try_acquire(A));
        assert!(!limiter.try_acquire(A));
        assert_eq!(limiter.remaining(A), Some(0));

        assert!(limiter.try_acquire(B));
        assert_eq!(limiter.remaining(B), Some(1));
    }

    #[test]
    fn window_slides() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();

        assert!(limiter.try_acquire_at(A, start));
        assert!(!limiter.try_acquire_at(A, start + Duration::from_secs(5)));
        assert!(limiter.try_acquire_at(A, start + Duration::from_secs(11)));
    }

    #[test]
    fn huge_limit_does_not_preallocate() {
        let limiter = RateLimiter::per_minute(4_000_000_000);

        assert!(limiter.try_acquire(A));
        assert_eq!(limiter.remaining(A), Some(3_999_999_999));
        assert!(limiter.clients.lock()[&A].capacity() < 1024);
    }

    #[test]
    fn zero_disables() {
        let limiter = RateLimiter::per_minute(0);
        for _ in 0..1000 {
            assert!(limiter.try_acquire(A));
        }
        assert_eq!(limiter.remaining(A), None);
    }

    #[test]
    fn idle_clients_are_pruned() {
        let limiter = RateLimiter::new(5, Duration::from_secs(1));
        let start = Instant::now();
        for i in 0..=PRUNE_THRESHOLD as u32 {
            let ip = IpAddr::V4(Ipv4Addr::from(i));
            assert!(limiter.try_acquire_at(ip, start));
        }

        assert!(limiter.try_acquire_at(A, start + Duration::from_secs(5)));
        assert_eq!(limiter.clients.lock().len(), 1);
    }
}
