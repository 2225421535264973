use std::sync::mpsc;
use std::thread;

use tracing::{debug, warn};

use crate::api::{Command, Engine, EngineErrorEvent, Event};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::item::ItemId;
use crate::media::MediaBackend;
use crate::ticker::{ThreadTicker, TickSink};

const COMMAND_CHANNEL_CAPACITY: usize = 32;
const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Sender used by the host to dispatch commands to the engine thread.
pub type EngineCommandSender = mpsc::SyncSender<Command>;

/// Receiver used by the host to read events emitted by the engine thread.
pub type EngineEventReceiver = mpsc::Receiver<Event>;

/// Spawns an engine thread around `media` with a thread-backed tick source.
///
/// Host commands and scheduler ticks are serialized through one queue, so
/// every command runs to completion before the next one starts. Command
/// errors are reported as [`Event::Error`]. The thread exits once every
/// host sender is dropped and queued commands have been handled, or when
/// the event receiver is dropped.
pub fn spawn_engine_bridge<M>(
    media: M,
    config: EngineConfig,
) -> Result<(EngineCommandSender, EngineEventReceiver)>
where
    M: MediaBackend + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::sync_channel::<Command>(COMMAND_CHANNEL_CAPACITY);
    let (queue_tx, queue_rx) = mpsc::sync_channel::<Command>(COMMAND_CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::sync_channel::<Event>(EVENT_CHANNEL_CAPACITY);

    let sink = TickSink::new(queue_tx.clone());
    let mut engine = Engine::new(media, ThreadTicker::new(sink.clone()), config)?;

    thread::spawn(move || {
        while let Ok(command) = command_rx.recv() {
            if queue_tx.send(command).is_err() {
                break;
            }
        }
        sink.close();
        debug!("host command channel closed");
    });

    thread::spawn(move || {
        while let Ok(command) = queue_rx.recv() {
            match engine.handle_command(command) {
                Ok(events) => {
                    for event in events {
                        if event_tx.send(event).is_err() {
                            return;
                        }
                    }
                }
                Err(error) => {
                    warn!(%error, "command failed");
                    if event_tx
                        .send(Event::Error(EngineErrorEvent::from_error(&error)))
                        .is_err()
                    {
                        return;
                    }
                }
            }
        }
        debug!("engine thread exited");
    });

    Ok((command_tx, event_rx))
}

/// Runs a one-shot metadata probe off the engine thread.
///
/// Posts `ResolveDuration` when `probe` yields a length; posts nothing when
/// it yields `None` (load failure), leaving the item unresolved.
pub fn spawn_duration_probe<F>(
    sender: EngineCommandSender,
    id: ItemId,
    probe: F,
) -> thread::JoinHandle<()>
where
    F: FnOnce() -> Option<f64> + Send + 'static,
{
    thread::spawn(move || {
        let Some(duration) = probe() else {
            warn!(item_id = id, "media metadata unavailable; duration left unresolved");
            return;
        };
        if sender
            .send(Command::ResolveDuration { id, duration })
            .is_err()
        {
            debug!(item_id = id, "engine gone before duration resolved");
        }
    })
}
