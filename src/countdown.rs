//! Cancellable countdown timer
//!
//! Posts one `SessionEvent::CountdownTick` per period. Stopping aborts the
//! task and moves to a new generation, so a tick already sitting in the
//! channel is rejected by [`Countdown::accept`].

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::session::SessionEvent;

pub struct Countdown {
    period: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl Countdown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            generation: 0,
            task: None,
        }
    }

    /// Start ticking; the first tick arrives one full period from now
    pub fn start(&mut self, events: UnboundedSender<SessionEvent>) {
        self.stop();
        let generation = self.generation;
        let period = self.period;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events
                    .send(SessionEvent::CountdownTick { generation })
                    .is_err()
                {
                    break;
                }
            }
        }));
    }

    /// Abort the task and invalidate queued ticks
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// True if `generation` belongs to the running countdown
    pub fn accept(&self, generation: u64) -> bool {
        self.task.is_some() && generation == self.generation
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn tick_generation(event: SessionEvent) -> u64 {
        match event {
            SessionEvent::CountdownTick { generation } => generation,
            other => panic!("expected tick, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut countdown = Countdown::new(Duration::from_secs(1));
        let start = Instant::now();

        countdown.start(tx);
        for n in 1..=3u64 {
            let generation = tick_generation(rx.recv().await.unwrap());
            assert!(countdown.accept(generation));
            assert!(start.elapsed() >= Duration::from_secs(n));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_rejects_queued_tick() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut countdown = Countdown::new(Duration::from_secs(1));

        countdown.start(tx);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        // One tick is waiting in the channel
        countdown.stop();
        assert!(!countdown.is_running());

        let generation = tick_generation(rx.recv().await.unwrap());
        assert!(!countdown.accept(generation));

        // The task is gone, so the channel closes without further ticks
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_uses_new_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut countdown = Countdown::new(Duration::from_millis(100));

        countdown.start(tx.clone());
        let first = tick_generation(rx.recv().await.unwrap());
        countdown.start(tx);
        let second = tick_generation(rx.recv().await.unwrap());

        assert_ne!(first, second);
        assert!(!countdown.accept(first));
        assert!(countdown.accept(second));
    }
}
