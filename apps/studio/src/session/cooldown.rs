use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

/// Seconds left before submissions are accepted again, ticked down by a
/// single background task.
///
/// The counter shares one atomic word with an epoch (high half) that every
/// `start`/`clear` bumps, so a ticker that outlives its abort cannot touch a
/// newer countdown.
#[derive(Debug, Clone, Default)]
pub struct Cooldown {
    state: Arc<AtomicU64>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

fn pack(epoch: u32, secs: u32) -> u64 {
    (u64::from(epoch) << 32) | u64::from(secs)
}

fn epoch_of(state: u64) -> u32 {
    (state >> 32) as u32
}

fn secs_of(state: u64) -> u32 {
    state as u32
}

/// One tick for the ticker of `epoch`. False once that countdown is over or
/// has been replaced.
fn count_down(state: &AtomicU64, epoch: u32) -> bool {
    let updated = state.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
        if epoch_of(current) != epoch {
            return None;
        }
        secs_of(current).checked_sub(1).map(|n| pack(epoch, n))
    });
    matches!(updated, Ok(before) if secs_of(before) > 1)
}

impl Cooldown {
    pub fn remaining(&self) -> u32 {
        secs_of(self.state.load(Ordering::SeqCst))
    }

    pub fn is_active(&self) -> bool {
        self.remaining() > 0
    }

    /// Sets the counter to `secs` and (re)starts the ticker. Must be called
    /// from inside a tokio runtime.
    pub fn start(&self, secs: u32) {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        let epoch = self.replace(&mut ticker, secs);
        if secs == 0 {
            return;
        }
        info!(secs, "Cooldown started");

        let state = Arc::clone(&self.state);
        *ticker = Some(tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut ticks = interval_at(Instant::now() + period, period);
            loop {
                ticks.tick().await;
                if !count_down(&state, epoch) {
                    debug!("Cooldown finished");
                    break;
                }
            }
        }));
    }

    /// Drops any running ticker and zeroes the counter.
    pub fn clear(&self) {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        self.replace(&mut ticker, 0);
    }

    /// Aborts the current ticker and stores `secs` under a fresh epoch. The
    /// caller holds the ticker lock throughout.
    fn replace(&self, ticker: &mut Option<JoinHandle<()>>, secs: u32) -> u32 {
        if let Some(handle) = ticker.take() {
            handle.abort();
        }
        let epoch = epoch_of(self.state.load(Ordering::SeqCst)).wrapping_add(1);
        self.state.store(pack(epoch, secs), Ordering::SeqCst);
        epoch
    }

    #[cfg(test)]
    fn epoch(&self) -> u32 {
        epoch_of(self.state.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_once_per_second() {
        let cooldown = Cooldown::default();
        cooldown.start(3);
        assert_eq!(cooldown.remaining(), 3);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(cooldown.remaining(), 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(cooldown.remaining(), 0);
        assert!(!cooldown.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_previous_timer() {
        let cooldown = Cooldown::default();
        cooldown.start(2);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        cooldown.start(60);
        tokio::time::sleep(Duration::from_millis(2500)).await;
        // Only the new ticker runs: two ticks since the restart.
        assert_eq!(cooldown.remaining(), 58);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_ticker_cannot_count_down() {
        let cooldown = Cooldown::default();
        cooldown.start(5);
        let old_epoch = cooldown.epoch();
        cooldown.start(5);

        assert!(!count_down(&cooldown.state, old_epoch));
        assert_eq!(cooldown.remaining(), 5);
        assert!(count_down(&cooldown.state, cooldown.epoch()));
        assert_eq!(cooldown.remaining(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_leave_one_countdown() {
        let cooldown = Cooldown::default();
        let starts: Vec<_> = (0..16)
            .map(|_| {
                let cooldown = cooldown.clone();
                tokio::spawn(async move { cooldown.start(30) })
            })
            .collect();
        for start in starts {
            start.await.unwrap();
        }
        assert_eq!(cooldown.remaining(), 30);
        assert!(cooldown.ticker.lock().unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        // One live ticker: at most a tick or two, never one per start.
        assert!((28..30).contains(&cooldown.remaining()));
        cooldown.clear();
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_stops_countdown() {
        let cooldown = Cooldown::default();
        cooldown.start(10);
        cooldown.clear();
        assert_eq!(cooldown.remaining(), 0);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(cooldown.remaining(), 0);
    }
}
