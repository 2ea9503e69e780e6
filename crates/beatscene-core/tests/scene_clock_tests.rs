use beatscene_core::{
    AppContext, ClockConfig, ClockSignal, EngineConfig, SceneEngine, SignalKind, StreamClock,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.clock = ClockConfig {
        interval_ms: 1,
        ..ClockConfig::time()
    };
    config.scene.seed = Some(11);
    config
}

fn tick(sequence: u64) -> ClockSignal {
    ClockSignal {
        kind: SignalKind::Time,
        sequence,
        elapsed: sequence as f64 * 0.01,
    }
}

#[test]
fn test_state_frozen_after_stop() {
    let context = AppContext::new(fast_config());
    context.start_stream(None).unwrap();
    thread::sleep(Duration::from_millis(25));
    context.stop_stream().unwrap();

    let stopped = context.scene_state();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(context.scene_state(), stopped);
    assert!(stopped.ticks > 0);
}

#[test]
fn test_concurrent_readers_see_whole_scene() {
    let context = AppContext::new(fast_config());
    context.start_stream(None).unwrap();

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..50 {
                    let snapshot = context.scene_state();
                    assert_eq!(snapshot.objects.len(), 5);
                    for object in snapshot.objects.values() {
                        assert!(object.position.z >= -10.0);
                        assert!(object.position.z < 2.5);
                        assert!((-1.0..1.0).contains(&object.position.x));
                        assert!((-0.25..0.25).contains(&object.position.y));
                    }
                }
            });
        }
    });

    context.shutdown().unwrap();
    assert!(!context.is_streaming());
}

#[test]
fn test_two_full_cycles_return_to_far_plane() {
    let scene = SceneEngine::with_seed(5);
    scene.initialize_scene(1).unwrap();

    let mut recycled = 0;
    for sequence in 0..250 {
        recycled += scene.on_tick(&tick(sequence));
    }

    let state = scene.get_state();
    assert_eq!(recycled, 10);
    assert_eq!(state.ticks, 250);
    assert!(state
        .objects
        .values()
        .all(|o| o.position.z == -10.0 && o.steps_since_spawn() == 0));
}

#[test]
fn test_beat_clock_does_not_move_time_scene() {
    let scene = Arc::new(SceneEngine::with_seed(5));
    scene.initialize_scene(1).unwrap();
    let before = scene.get_state();

    let mut clock = StreamClock::new(ClockConfig {
        interval_ms: 1,
        ..ClockConfig::beat()
    });
    clock.set_listener(scene.clone());
    clock.start().unwrap();
    thread::sleep(Duration::from_millis(20));
    clock.stop().unwrap();

    assert!(clock.state().ticks > 0);
    assert_eq!(scene.get_state(), before);
}

#[test]
fn test_context_builds_beatmap_from_config() {
    let config = EngineConfig::from_toml_str("[beatmap]\nhigh_percentile = 99.0\n").unwrap();
    let context = AppContext::new(config);
    assert_eq!(context.config().beatmap.high_percentile, 99.0);

    let features = beatscene_core::FeatureFrames::new(
        vec![0.0, 1.0, 3.0, 2.0],
        vec![0.0, 0.1, 0.4, 0.2],
        vec![
            vec![0.0, -10.0],
            vec![0.0, -10.0],
            vec![-10.0, 0.0],
            vec![-10.0, 0.0],
        ],
        vec![1, 2, 3],
    );
    let beatmap = context.build_beatmap(&features).unwrap();
    assert!(!beatmap.is_empty());
}
