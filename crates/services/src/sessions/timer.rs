use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Returned by a tick callback to keep or stop the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerControl {
    Continue,
    Stop,
}

/// The single countdown task owned by a session.
///
/// Spawned once when the attempt starts; ends when the callback returns
/// `Stop`, when `cancel` is called, or when the timer is dropped. A slow
/// callback delays later ticks instead of bunching them up.
#[derive(Debug)]
pub struct SessionTimer {
    task: JoinHandle<()>,
}

impl SessionTimer {
    /// Run `on_tick` every `period`, first after one full period.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = TimerControl> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if on_tick().await == TimerControl::Stop {
                    break;
                }
            }
            tracing::debug!("session timer stopped");
        });
        Self { task }
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_until_stopped() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&count);
        let timer = SessionTimer::spawn(Duration::from_secs(1), move || {
            let seen = Arc::clone(&seen);
            async move {
                let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 3 {
                    TimerControl::Stop
                } else {
                    TimerControl::Continue
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(timer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ticking() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&count);
        let timer = SessionTimer::spawn(Duration::from_secs(1), move || {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                TimerControl::Continue
            }
        });

        tokio::time::sleep(Duration::from_millis(1500)).await;
        timer.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
