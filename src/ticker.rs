use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};

/// Drives a polling loop. Returns `false` once the source is exhausted and
/// the loop should stop.
#[async_trait::async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self) -> bool;
}

pub struct IntervalTicker(Interval);

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut inner = interval(period);
        inner.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self(inner)
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

#[async_trait::async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.0.tick().await;
        true
    }
}

/// Ticks whenever the paired sender pushes a unit; stops when it is dropped.
#[cfg(test)]
pub struct ManualTicker(flume::Receiver<()>);

#[cfg(test)]
pub fn manual() -> (flume::Sender<()>, ManualTicker) {
    let (tx, rx) = flume::bounded(0);
    (tx, ManualTicker(rx))
}

#[cfg(test)]
#[async_trait::async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.0.recv_async().await.is_ok()
    }
}
