//! File-format glue and timing helpers shared by the CLI and the dashboard.

pub mod export;
pub mod import;

/// Search-box debouncing.
///
/// Every keystroke arms a new ticket; after the delay only the newest ticket
/// is still current, so a burst of keystrokes fires one fetch.
pub mod debounce {
    use std::future::Future;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    pub const SEARCH_DELAY: Duration = Duration::from_millis(500);

    #[derive(Debug, Clone)]
    pub struct Debouncer {
        latest: Arc<AtomicU64>,
        delay: Duration,
    }

    impl Default for Debouncer {
        fn default() -> Self {
            Self::new(SEARCH_DELAY)
        }
    }

    impl Debouncer {
        pub fn new(delay: Duration) -> Self {
            Self {
                latest: Arc::new(AtomicU64::new(0)),
                delay,
            }
        }

        pub fn delay(&self) -> Duration {
            self.delay
        }

        /// Start a new quiet period, superseding every earlier ticket.
        pub fn arm(&self) -> u64 {
            self.latest.fetch_add(1, Ordering::SeqCst) + 1
        }

        pub fn is_current(&self, ticket: u64) -> bool {
            self.latest.load(Ordering::SeqCst) == ticket
        }

        /// Wait on `sleep` (a timer for [`Self::delay`] from whichever runtime
        /// the caller lives on), then report whether `ticket` survived.
        pub async fn settled<F: Future<Output = ()>>(&self, ticket: u64, sleep: F) -> bool {
            sleep.await;
            let current = self.is_current(ticket);
            if !current {
                log::debug!("[EKRAF] debounce: ticket {} superseded", ticket);
            }
            current
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::sync::atomic::AtomicUsize;

        #[test]
        fn newest_ticket_wins() {
            let debouncer = Debouncer::default();
            let first = debouncer.arm();
            let second = debouncer.arm();
            assert!(!debouncer.is_current(first));
            assert!(debouncer.is_current(second));
            assert_eq!(debouncer.delay(), Duration::from_millis(500));
        }

        #[test]
        fn clones_share_tickets() {
            let debouncer = Debouncer::default();
            let other = debouncer.clone();
            let ticket = debouncer.arm();
            other.arm();
            assert!(!debouncer.is_current(ticket));
        }

        #[tokio::test(start_paused = true)]
        async fn three_keystrokes_fire_one_fetch() {
            let debouncer = Debouncer::default();
            let fetches = Arc::new(AtomicUsize::new(0));
            let mut handles = Vec::new();

            for _ in 0..3 {
                let ticket = debouncer.arm();
                let debouncer = debouncer.clone();
                let fetches = fetches.clone();
                handles.push(tokio::spawn(async move {
                    let delay = debouncer.delay();
                    if debouncer.settled(ticket, tokio::time::sleep(delay)).await {
                        fetches.fetch_add(1, Ordering::SeqCst);
                    }
                }));
                tokio::time::advance(Duration::from_millis(150)).await;
            }
            for handle in handles {
                handle.await.unwrap();
            }
            assert_eq!(fetches.load(Ordering::SeqCst), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn keystrokes_further_apart_each_fire() {
            let debouncer = Debouncer::default();
            let mut fired = 0;
            for _ in 0..2 {
                let ticket = debouncer.arm();
                if debouncer
                    .settled(ticket, tokio::time::sleep(debouncer.delay()))
                    .await
                {
                    fired += 1;
                }
            }
            assert_eq!(fired, 2);
        }
    }
}
