//! End-to-end looper behaviour: transport ticks, recording, playback, mixing

mod common;

use common::{TEST_RATE, looper_with, run};
use loop_station::{ContentKind, LooperConfig, TrackId};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 120 bpm, one bar: a 2 s loop (2000 frames at the test rate)
fn one_bar() -> LooperConfig {
    LooperConfig {
        bars: 1,
        ..LooperConfig::default()
    }
}

fn track_ids(looper: &loop_station::Looper) -> Vec<TrackId> {
    looper.state().tracks.iter().map(|t| t.id).collect()
}

#[tokio::test]
async fn test_init_creates_default_track() {
    let (looper, _processor, _source) = looper_with(LooperConfig::default());
    let state = looper.state();
    assert_eq!(state.tracks.len(), 1);
    assert_eq!(state.tracks[0].name, "Track 1");
    assert!(!state.is_playing);
    assert!(!state.is_recording);
    assert_eq!(state.current_beat, 0);
}

#[tokio::test]
async fn test_beat_counter_wraps_with_the_loop() {
    let (mut looper, processor, mut source) = looper_with(LooperConfig::default());
    let beats = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&beats);
    looper.on_beat(move |event| sink.lock().unwrap().push(event.beat));

    looper.play();
    // One full cycle plus the first tick of the next
    run(&mut looper, &processor, &mut source, 8100);

    let mut expected: Vec<u32> = (0..16).collect();
    expected.push(0);
    assert_eq!(*beats.lock().unwrap(), expected);
    assert_eq!(looper.state().current_beat, 0);
}

#[tokio::test]
async fn test_play_is_idempotent() {
    let (looper, _processor, _source) = looper_with(LooperConfig::default());
    let notifications = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&notifications);
    looper.on_state_change(move |state| sink.lock().unwrap().push(state.clone()));

    looper.play();
    let once = looper.state();
    looper.play();
    assert_eq!(looper.state(), once);
    assert!(once.is_playing);

    let seen = notifications.lock().unwrap();
    assert!(seen.iter().all(|s| s.is_playing));
}

#[tokio::test]
async fn test_pause_keeps_position_and_stop_rewinds() {
    let (mut looper, processor, mut source) = looper_with(LooperConfig::default());
    looper.play();
    run(&mut looper, &processor, &mut source, 2000);
    looper.pause();
    assert!(!looper.state().is_playing);
    assert!((looper.current_position() - 0.25).abs() < 1e-9);

    // Paused blocks pass the bus through untouched
    run(&mut looper, &processor, &mut source, 500);
    assert!((looper.current_position() - 0.25).abs() < 1e-9);

    looper.play();
    run(&mut looper, &processor, &mut source, 1000);
    assert!((looper.current_position() - 0.375).abs() < 1e-9);

    looper.stop();
    assert_eq!(looper.current_position(), 0.0);
    assert_eq!(looper.state().current_beat, 0);
}

#[tokio::test]
async fn test_bpm_change_keeps_loop_fraction() {
    let (mut looper, processor, mut source) = looper_with(LooperConfig::default());
    looper.play();
    run(&mut looper, &processor, &mut source, 4000);
    looper.set_bpm(60);
    assert!((looper.current_position() - 0.5).abs() < 1e-9);
    assert_eq!(looper.loop_duration(), 16.0);
    assert_eq!(looper.state().current_beat, 8);
}

#[tokio::test]
async fn test_loop_disabled_stops_at_loop_end() {
    let (mut looper, processor, mut source) = looper_with(LooperConfig {
        loop_enabled: false,
        ..one_bar()
    });
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    looper.on_state_change(move |state| sink.lock().unwrap().push(state.is_playing));

    looper.play();
    run(&mut looper, &processor, &mut source, 2500);

    assert!(!looper.state().is_playing);
    assert_eq!(looper.current_position(), 0.0);
    assert_eq!(states.lock().unwrap().last(), Some(&false));
}

#[tokio::test]
async fn test_empty_recording_aborts_safely() {
    let (looper, _processor, _source) = looper_with(LooperConfig::default());
    let track = looper.start_recording(None).unwrap();
    assert!(looper.state().is_recording);

    looper.stop_recording().await;

    let state = looper.state();
    let snapshot = state.track(track).unwrap();
    assert!(!snapshot.has_buffer);
    assert!(!snapshot.is_recording);
    assert!(!state.is_recording);

    // The session is free again
    assert_eq!(looper.start_recording(None), Some(track));
}

#[tokio::test]
async fn test_record_and_play_back_a_take() {
    let (mut looper, processor, mut source) = looper_with(one_bar());
    let track = looper.start_recording(None).unwrap();
    assert!(looper.state().is_playing);

    source.level = 0.5;
    run(&mut looper, &processor, &mut source, 2000);
    looper.stop_recording().await;

    let state = looper.state();
    let snapshot = state.track(track).unwrap();
    assert!(snapshot.has_buffer);
    assert_eq!(snapshot.content, ContentKind::Audio);
    assert_eq!(snapshot.buffer_duration, Some(2.0));
    assert!(!state.is_recording);

    // Source silent: the bus now carries the take
    source.level = 0.0;
    let block = run(&mut looper, &processor, &mut source, 300);
    assert!(block.iter().all(|&s| (s - 0.5).abs() < 1e-3));
}

#[tokio::test]
async fn test_recording_fills_empty_tracks_first() {
    let (mut looper, processor, mut source) = looper_with(one_bar());
    let spare = looper.add_track().id;
    let first = track_ids(&looper)[0];

    source.level = 0.1;
    assert_eq!(looper.start_recording(None), Some(first));
    run(&mut looper, &processor, &mut source, 2000);
    looper.stop_recording().await;

    assert_eq!(looper.start_recording(None), Some(spare));
    run(&mut looper, &processor, &mut source, 2000);
    looper.stop_recording().await;

    // Everything holds a take now, so a third take gets a new track
    let third = looper.start_recording(None).unwrap();
    assert!(![first, spare].contains(&third));
    assert_eq!(looper.state().tracks.len(), 3);
}

#[tokio::test]
async fn test_second_record_request_is_ignored() {
    let (looper, _processor, _source) = looper_with(LooperConfig::default());
    let first = looper.start_recording(None).unwrap();
    let other = looper.add_track().id;
    assert_eq!(looper.start_recording(Some(other)), None);
    assert_eq!(
        looper.state().tracks.iter().filter(|t| t.is_recording).count(),
        1
    );
    assert!(looper.state().track(first).unwrap().is_recording);
}

#[tokio::test]
async fn test_solo_and_mute_shape_the_mix() {
    let (mut looper, processor, mut source) = looper_with(one_bar());

    let mut tracks = Vec::new();
    for level in [0.1, 0.2, 0.4] {
        source.level = level;
        tracks.push(looper.start_recording(None).unwrap());
        run(&mut looper, &processor, &mut source, 2000);
        looper.stop_recording().await;
    }
    source.level = 0.0;

    let block = run(&mut looper, &processor, &mut source, 200);
    assert!((block[50] - 0.7).abs() < 1e-3);

    looper.set_track_solo(tracks[0], true);
    looper.set_track_muted(tracks[2], true);
    let block = run(&mut looper, &processor, &mut source, 200);
    assert!((block[50] - 0.1).abs() < 1e-3);

    looper.set_track_solo(tracks[0], false);
    let block = run(&mut looper, &processor, &mut source, 200);
    assert!((block[50] - 0.3).abs() < 1e-3);
}

#[tokio::test]
async fn test_track_volume_applies_to_playback() {
    let (mut looper, processor, mut source) = looper_with(one_bar());
    source.level = 0.5;
    let track = looper.start_recording(None).unwrap();
    run(&mut looper, &processor, &mut source, 2000);
    looper.stop_recording().await;
    source.level = 0.0;

    looper.set_track_volume(track, -6.0);
    let block = run(&mut looper, &processor, &mut source, 200);
    assert!((block[50] - 0.5 * 10f32.powf(-6.0 / 20.0)).abs() < 1e-3);

    looper.set_track_volume(track, 24.0);
    assert_eq!(looper.state().track(track).unwrap().volume, 6.0);
}

#[tokio::test]
async fn test_note_captured_during_recording() {
    let (mut looper, processor, mut source) = looper_with(LooperConfig::default());
    let track = looper.start_recording(None).unwrap();

    run(&mut looper, &processor, &mut source, 2000);
    looper.note_on("C4");
    run(&mut looper, &processor, &mut source, 2000);
    looper.note_off();

    let state = looper.state();
    let notes = &state.track(track).unwrap().note_events;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].note, "C4");
    assert_eq!(notes[0].start_time, 0.25);
    assert_eq!(notes[0].duration, 0.25);
}

#[tokio::test]
async fn test_note_duration_wraps_around_loop_end() {
    let (mut looper, processor, mut source) = looper_with(LooperConfig::default());
    let track = looper.start_recording(None).unwrap();

    run(&mut looper, &processor, &mut source, 7600);
    looper.note_on("E4");
    run(&mut looper, &processor, &mut source, 800);
    looper.note_off();

    let state = looper.state();
    let note = &state.track(track).unwrap().note_events[0];
    assert!((note.start_time - 0.95).abs() < 1e-9);
    assert!((note.duration - 0.10).abs() < 1e-9);
}

#[tokio::test]
async fn test_notes_survive_take_installation() {
    let (mut looper, processor, mut source) = looper_with(one_bar());
    source.level = 0.3;
    let track = looper.start_recording(None).unwrap();
    looper.note_on("G4");
    run(&mut looper, &processor, &mut source, 1000);
    looper.note_off();
    run(&mut looper, &processor, &mut source, 1000);
    looper.stop_recording().await;

    let state = looper.state();
    let snapshot = state.track(track).unwrap();
    assert_eq!(snapshot.content, ContentKind::Audio);
    assert_eq!(snapshot.note_events.len(), 1);
}

#[tokio::test]
async fn test_stop_finalizes_in_background() {
    let (mut looper, processor, mut source) = looper_with(one_bar());
    source.level = 0.2;
    let track = looper.start_recording(None).unwrap();
    run(&mut looper, &processor, &mut source, 2000);

    looper.stop();
    let state = looper.state();
    assert!(!state.is_playing);
    assert!(!state.is_recording);

    let mut installed = false;
    for _ in 0..200 {
        if looper.state().track(track).unwrap().has_buffer {
            installed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(installed, "take was never installed");
}

#[tokio::test]
async fn test_take_from_before_dispose_does_not_touch_new_recording() {
    let (mut looper, processor, mut source) = looper_with(one_bar());
    source.level = 0.2;
    looper.start_recording(None).unwrap();
    run(&mut looper, &processor, &mut source, 2000);

    looper.dispose();
    let processor = looper.init(&source).unwrap();
    let track = looper.start_recording(None).unwrap();
    run(&mut looper, &processor, &mut source, 100);

    // Let the take ended by dispose finish loading
    tokio::time::sleep(Duration::from_millis(200)).await;

    let state = looper.state();
    assert!(state.is_recording);
    let snapshot = state.track(track).unwrap();
    assert!(snapshot.is_recording);
    assert!(!snapshot.has_buffer);
}

#[tokio::test]
async fn test_dropped_stop_recording_still_finalizes() {
    let (mut looper, processor, mut source) = looper_with(one_bar());
    source.level = 0.2;
    let track = looper.start_recording(None).unwrap();
    run(&mut looper, &processor, &mut source, 2000);

    drop(looper.stop_recording());

    let mut installed = false;
    for _ in 0..200 {
        if looper.state().track(track).unwrap().has_buffer {
            installed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(installed, "take was never installed");
    assert!(looper.start_recording(None).is_some());
}

#[tokio::test]
async fn test_stop_recording_without_take_notifies() {
    let (looper, _processor, _source) = looper_with(one_bar());
    let count = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&count);
    looper.on_state_change(move |_| *sink.lock().unwrap() += 1);

    looper.stop_recording().await;
    assert_eq!(*count.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_clear_and_remove_tracks() {
    let (mut looper, processor, mut source) = looper_with(one_bar());
    source.level = 0.2;
    let track = looper.start_recording(None).unwrap();
    run(&mut looper, &processor, &mut source, 2000);
    looper.stop_recording().await;

    looper.clear_track(track);
    let state = looper.state();
    let snapshot = state.track(track).unwrap();
    assert!(!snapshot.has_buffer);
    assert_eq!(snapshot.name, "Track 1");

    looper.add_track();
    looper.clear_all_tracks();
    assert!(looper.state().tracks.iter().all(|t| !t.has_buffer));

    looper.remove_track(track);
    looper.remove_track(TrackId::new());
    assert_eq!(looper.state().tracks.len(), 1);
    assert_eq!(looper.state().tracks[0].name, "Track 2");
}

#[tokio::test]
async fn test_tracks_named_and_coloured_by_creation_order() {
    let (looper, _processor, _source) = looper_with(LooperConfig::default());
    looper.add_track();
    looper.add_track();

    let state = looper.state();
    let names: Vec<&str> = state.tracks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Track 1", "Track 2", "Track 3"]);
    let colors: Vec<&str> = state.tracks.iter().map(|t| t.color.as_str()).collect();
    assert_eq!(colors, ["#00ffff", "#ff6b35", "#00ff88"]);
}

#[tokio::test]
async fn test_metronome_clicks_reach_the_bus() {
    let source = common::LevelSource::new(TEST_RATE * 48);
    let mut looper = loop_station::Looper::new(LooperConfig::default());
    let processor = looper.init(&source).unwrap();

    looper.play();
    let mut block = vec![0.0; 256];
    processor.process(&mut block);
    assert!(block.iter().any(|&s| s.abs() > 0.01));

    looper.stop();
    looper.set_metronome_enabled(false);
    looper.play();
    let mut block = vec![0.0; 256];
    processor.process(&mut block);
    assert!(block.iter().all(|&s| s == 0.0));
}

#[tokio::test]
async fn test_state_serializes_camel_case() {
    let (looper, _processor, _source) = looper_with(LooperConfig::default());
    let json = serde_json::to_value(looper.state()).unwrap();
    assert_eq!(json["bpm"], 120);
    assert_eq!(json["beatsPerBar"], 4);
    assert_eq!(json["isPlaying"], false);
    assert_eq!(json["tracks"][0]["hasBuffer"], false);
}
