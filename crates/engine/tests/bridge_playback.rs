use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use engine::{
    Command, EngineConfig, EngineEventReceiver, Event, HeadlessMediaBackend, ItemPatch, MediaKind,
    NewItem, PlaybackState, SourceRef, spawn_duration_probe, spawn_engine_bridge,
};

const WAIT: Duration = Duration::from_secs(2);

fn fast_config() -> EngineConfig {
    EngineConfig {
        tick_period_ms: 2,
        ..EngineConfig::default()
    }
}

fn next_event(events: &EngineEventReceiver) -> Event {
    events.recv_timeout(WAIT).expect("engine event")
}

fn wait_for(events: &EngineEventReceiver, mut wanted: impl FnMut(&Event) -> bool) -> Event {
    loop {
        let event = next_event(events);
        if wanted(&event) {
            return event;
        }
    }
}

fn image(source: &str) -> NewItem {
    NewItem {
        source: SourceRef::new(source),
        kind: MediaKind::Image,
    }
}

#[test]
fn thread_ticks_advance_until_the_primary_window_ends() {
    let (commands, events) =
        spawn_engine_bridge(HeadlessMediaBackend::new(), fast_config()).expect("spawn bridge");

    commands
        .send(Command::AddItems {
            items: vec![image("blob:a")],
        })
        .expect("send add");
    commands
        .send(Command::UpdateItem {
            id: 1,
            patch: ItemPatch::window(0.0, 1.0),
        })
        .expect("send update");
    commands.send(Command::Play).expect("send play");

    let stopped = wait_for(&events, |event| {
        matches!(
            event,
            Event::PlaybackChanged {
                state: PlaybackState::Stopped,
                ..
            }
        )
    });
    let Event::PlaybackChanged { current_time, .. } = stopped else {
        unreachable!();
    };
    assert_eq!(current_time, 1.0);
}

#[test]
fn no_ticks_are_applied_after_pause() {
    let (commands, events) =
        spawn_engine_bridge(HeadlessMediaBackend::new(), fast_config()).expect("spawn bridge");

    commands
        .send(Command::AddItems {
            items: vec![image("blob:a")],
        })
        .expect("send add");
    commands.send(Command::Play).expect("send play");
    wait_for(&events, |event| matches!(event, Event::ClockTicked { .. }));

    commands.send(Command::Pause).expect("send pause");
    let paused = wait_for(&events, |event| {
        matches!(
            event,
            Event::PlaybackChanged {
                state: PlaybackState::Paused,
                ..
            }
        )
    });
    let Event::PlaybackChanged {
        current_time: paused_at,
        ..
    } = paused
    else {
        unreachable!();
    };
    assert!(paused_at > 0.0);

    match events.recv_timeout(Duration::from_millis(100)) {
        Err(RecvTimeoutError::Timeout) => {}
        other => panic!("expected silence after pause, got {other:?}"),
    }

    commands.send(Command::Play).expect("send resume");
    let resumed = next_event(&events);
    assert_eq!(
        resumed,
        Event::PlaybackChanged {
            state: PlaybackState::Playing,
            current_time: paused_at,
            visible: vec![1],
        }
    );
}

#[test]
fn probe_resolves_a_video_through_the_bridge() {
    let (commands, events) =
        spawn_engine_bridge(HeadlessMediaBackend::new(), EngineConfig::default())
            .expect("spawn bridge");

    commands
        .send(Command::AddItems {
            items: vec![NewItem {
                source: SourceRef::new("blob:clip"),
                kind: MediaKind::Video,
            }],
        })
        .expect("send add");
    next_event(&events);

    spawn_duration_probe(commands.clone(), 1, || Some(6.0))
        .join()
        .expect("probe thread");

    let Event::CompositionChanged(snapshot) = next_event(&events) else {
        panic!("expected CompositionChanged");
    };
    let item = &snapshot.items[0].item;
    assert!(item.duration_known);
    assert_eq!(item.window.end_time, 6.0);
    assert_eq!(item.window.duration, 6.0);
}

#[test]
fn event_stream_ends_after_host_disconnects_mid_playback() {
    let (commands, events) =
        spawn_engine_bridge(HeadlessMediaBackend::new(), fast_config()).expect("spawn bridge");

    commands
        .send(Command::AddItems {
            items: vec![image("blob:a")],
        })
        .expect("send add");
    commands.send(Command::Play).expect("send play");
    drop(commands);

    let mut closed = false;
    for _ in 0..10_000 {
        match events.recv_timeout(WAIT) {
            Ok(_) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                closed = true;
                break;
            }
            Err(RecvTimeoutError::Timeout) => break,
        }
    }
    assert!(closed);
}
