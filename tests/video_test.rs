// Tests for the per-frame video adapter
use std::sync::Arc;
use std::thread;

use chrono::DateTime;
use geostamp::geo::GeoPoint;
use geostamp::overlay::{CaptureContext, ConfigStore, ItemKind, LocationFix, OverlayConfig};
use geostamp::render::{RecordingCanvas, Rect};
use geostamp::video::{
    DEFAULT_SAFE_ZONE_RATIO, FrameOutcome, OutputOrientation, SafeZone, VideoSafeZoneAdapter,
};

fn context() -> CaptureContext {
    let ts = DateTime::parse_from_rfc3339("2024-12-24T10:00:00+07:00").unwrap();
    CaptureContext::new(ts).with_location(LocationFix::new(GeoPoint::new(13.7563, 100.5018)))
}

#[test]
fn test_landscape_sensor_safe_zone() {
    let zone = SafeZone::compute(1920, 1080, OutputOrientation::Portrait, DEFAULT_SAFE_ZONE_RATIO);
    assert!((zone.width - 1080.0 * 0.85).abs() < 1e-3);
    assert!((zone.height - 1920.0 * 0.85).abs() < 1e-3);
    let rect = zone.logical_rect();
    let expected = Rect::from_xywh(81.0, 144.0, 918.0, 1632.0);
    for (actual, wanted) in [
        (rect.left, expected.left),
        (rect.top, expected.top),
        (rect.right, expected.right),
        (rect.bottom, expected.bottom),
    ] {
        assert!((actual - wanted).abs() < 1e-2, "{rect:?}");
    }
}

#[test]
fn test_config_updates_apply_to_next_frame() {
    let store = Arc::new(ConfigStore::new(OverlayConfig {
        items: vec![ItemKind::DateTime],
        ..Default::default()
    }));
    let adapter = VideoSafeZoneAdapter::new(Arc::clone(&store), context);

    let mut before = RecordingCanvas::new(1080, 1920);
    assert_eq!(adapter.on_frame(&mut before), FrameOutcome::Rendered);
    assert!(before.texts().iter().all(|t| !t.contains("13.756300")));

    store
        .update(|config| config.items.push(ItemKind::Gps))
        .unwrap();
    let mut after = RecordingCanvas::new(1080, 1920);
    assert_eq!(adapter.on_frame(&mut after), FrameOutcome::Rendered);
    assert!(after.texts().contains(&"13.756300, 100.501800"));
}

#[test]
fn test_frames_from_many_threads_never_block() {
    let store = Arc::new(ConfigStore::new(OverlayConfig::default()));
    let adapter = Arc::new(VideoSafeZoneAdapter::new(store, context));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let adapter = Arc::clone(&adapter);
            thread::spawn(move || {
                (0..10)
                    .map(|_| adapter.on_frame(&mut RecordingCanvas::new(1920, 1080)))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let outcomes: Vec<FrameOutcome> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    assert_eq!(outcomes.len(), 40);
    assert!(outcomes.iter().all(|o| *o != FrameOutcome::Failed));

    let stats = adapter.stats();
    assert_eq!(stats.rendered + stats.skipped, 40);
    assert!(stats.rendered >= 1);
}
