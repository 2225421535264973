use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

use crate::api::Command;

/// Source of periodic `Command::Tick` deliveries for the playback clock.
///
/// The clock calls `cancel` before every `start`, and on every exit from
/// `Playing`. Ticks already queued when `cancel` runs may still arrive; the
/// clock discards them by generation.
pub trait TickScheduler: Send + std::fmt::Debug {
    fn start(&mut self, generation: u64, period: Duration);

    fn cancel(&mut self);
}

/// Closable handle on the engine's command channel.
///
/// Ticker threads hold the sink, never a sender, so closing it lets the
/// channel disconnect even while a playing session is live.
#[derive(Debug, Clone)]
pub struct TickSink {
    sender: Arc<Mutex<Option<SyncSender<Command>>>>,
}

impl TickSink {
    pub fn new(sender: SyncSender<Command>) -> Self {
        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
        }
    }

    /// Drops the sender. Later posts fail and ticker threads exit.
    pub fn close(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }

    fn post(&self, command: Command) -> bool {
        let sender = match self.sender.lock() {
            Ok(sender) => sender.clone(),
            Err(_) => None,
        };
        sender.is_some_and(|sender| sender.send(command).is_ok())
    }
}

/// Scheduler backed by one sleeping thread per playing session.
#[derive(Debug)]
pub struct ThreadTicker {
    sink: TickSink,
    stop: Option<Arc<AtomicBool>>,
}

impl ThreadTicker {
    /// Creates a ticker that posts into the engine's command channel.
    pub fn new(sink: TickSink) -> Self {
        Self { sink, stop: None }
    }
}

impl TickScheduler for ThreadTicker {
    fn start(&mut self, generation: u64, period: Duration) {
        self.cancel();

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let sink = self.sink.clone();
        thread::spawn(move || {
            loop {
                thread::sleep(period);
                if thread_stop.load(Ordering::Acquire) {
                    break;
                }
                trace!(generation, "tick posted");
                if !sink.post(Command::Tick { generation }) {
                    break;
                }
            }
            debug!(generation, "ticker thread exited");
        });
        self.stop = Some(stop);
    }

    // Never joins: the ticker may be blocked sending into the channel the
    // engine thread is about to drain.
    fn cancel(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.store(true, Ordering::Release);
        }
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Scheduler call observed by [`ManualTicker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerCall {
    Start { generation: u64 },
    Cancel,
}

/// Scheduler that never fires on its own; the host (or a test) delivers
/// `Command::Tick` itself.
#[derive(Debug, Clone, Default)]
pub struct ManualTicker {
    calls: Arc<Mutex<Vec<TickerCall>>>,
    live: Arc<Mutex<Option<u64>>>,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<TickerCall>>> {
        Arc::clone(&self.calls)
    }

    /// Generation the host should stamp on ticks, if a session is live.
    pub fn live_generation(&self) -> Option<u64> {
        self.live.lock().ok().and_then(|live| *live)
    }

    fn record(&self, call: TickerCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl TickScheduler for ManualTicker {
    fn start(&mut self, generation: u64, _period: Duration) {
        self.record(TickerCall::Start { generation });
        if let Ok(mut live) = self.live.lock() {
            *live = Some(generation);
        }
    }

    fn cancel(&mut self) {
        self.record(TickerCall::Cancel);
        if let Ok(mut live) = self.live.lock() {
            *live = None;
        }
    }
}
