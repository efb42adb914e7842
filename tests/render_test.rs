// Tests for the photo watermark path through the public API
use chrono::DateTime;
use geostamp::geo::{GeoPoint, GpsFormat};
use geostamp::overlay::{
    CaptureContext, ItemKind, LocationFix, OverlayConfig, OverlaySnapshotBuilder, WatermarkSnapshot,
};
use geostamp::render::{
    Anchor, DrawOp, FontBook, MARGIN_PX, RecordingCanvas, TemplateId, Viewport, compute_layout,
    render, render_photo,
};
use image::{Rgba, RgbaImage};

fn capture() -> CaptureContext {
    let ts = DateTime::parse_from_rfc3339("2024-12-24T10:00:00+07:00").unwrap();
    CaptureContext::new(ts)
        .with_location(LocationFix::new(GeoPoint::new(13.7563, 100.5018)))
        .with_heading(90.0)
}

fn build(config: &OverlayConfig) -> WatermarkSnapshot {
    OverlaySnapshotBuilder::new(config).build(&capture())
}

#[test]
fn test_classic_bottom_right_hugs_margin() {
    let canvas = RecordingCanvas::new(1080, 1920);
    let config = OverlayConfig::default();
    let lines = ["24/12/2024 10:00", "13.7563, 100.5018"];
    let layout = compute_layout(
        &canvas,
        &lines,
        &config.text_font(1.0),
        Anchor::BottomRight,
        Viewport::new(1080.0, 1920.0),
        MARGIN_PX,
    );
    assert!((layout.block_bounds.right - (1080.0 - MARGIN_PX)).abs() < 1e-3);
    assert!((layout.block_bounds.bottom - (1920.0 - MARGIN_PX)).abs() < 1e-3);
}

#[test]
fn test_every_template_stays_inside_canvas() {
    for template in [TemplateId::Classic, TemplateId::Modern, TemplateId::Minimal] {
        for anchor in Anchor::ALL {
            let config = OverlayConfig {
                template_id: template,
                position: anchor,
                background_box_enabled: true,
                project_name: "Bridge 7".to_string(),
                items: vec![ItemKind::DateTime, ItemKind::Gps, ItemKind::Project],
                ..Default::default()
            };
            let mut canvas = RecordingCanvas::new(1080, 1920);
            render(&mut canvas, &build(&config), &config, Viewport::new(1080.0, 1920.0), 1.0).unwrap();
            assert!(!canvas.ops().is_empty(), "{template:?} {anchor:?}");
            for op in canvas.ops() {
                let bounds = op.bounds();
                assert!(
                    bounds.left >= -1e-3 && bounds.top >= -1e-3,
                    "{template:?} {anchor:?} {bounds:?}"
                );
                assert!(
                    bounds.right <= 1080.001 && bounds.bottom <= 1920.001,
                    "{template:?} {anchor:?} {bounds:?}"
                );
            }
        }
    }
}

#[test]
fn test_compass_dial_precedes_template_text() {
    let config = OverlayConfig {
        compass_enabled: true,
        items: vec![ItemKind::DateTime, ItemKind::Compass],
        ..Default::default()
    };
    let snapshot = build(&config);
    assert_eq!(snapshot.compass_heading, Some(90.0));

    let mut canvas = RecordingCanvas::new(1080, 1920);
    render(&mut canvas, &snapshot, &config, Viewport::new(1080.0, 1920.0), 1.0).unwrap();
    assert!(matches!(canvas.ops()[0], DrawOp::Circle { .. }));
    let texts = canvas.texts();
    assert!(texts.contains(&"90°"));
    assert!(texts.contains(&"90° E"));
}

#[test]
fn test_failing_surface_keeps_photo_intact() {
    let config = OverlayConfig::default();
    let snapshot = build(&config);
    let source = RgbaImage::from_pixel(216, 384, Rgba([40, 80, 120, 255]));

    // 空画布：无法创建像素缓冲，原样返回
    let empty = RgbaImage::new(0, 0);
    assert_eq!(render_photo(&empty, &snapshot, &config, FontBook::shared()), empty);
    assert_ne!(render_photo(&source, &snapshot, &config, FontBook::shared()), source);

    let mut canvas = RecordingCanvas::new(1080, 1920).failing_after(1);
    assert!(render(&mut canvas, &snapshot, &config, Viewport::new(1080.0, 1920.0), 1.0).is_err());
}

#[test]
fn test_mgrs_line_on_minimal_template() {
    let config = OverlayConfig {
        template_id: TemplateId::Minimal,
        gps_format: GpsFormat::Mgrs,
        ..Default::default()
    };
    let mut canvas = RecordingCanvas::new(1080, 1920);
    render(&mut canvas, &build(&config), &config, Viewport::new(1080.0, 1920.0), 1.0).unwrap();
    // Minimal 始终以 4 位小数显示经纬度
    let texts = canvas.texts();
    assert_eq!(texts.len(), 2);
    assert!(texts[0].ends_with("13.7563, 100.5018"), "{}", texts[0]);
}

#[test]
fn test_photo_with_bundled_font_is_stamped() {
    let config = OverlayConfig::default();
    let source = RgbaImage::from_pixel(1080, 720, Rgba([20, 120, 200, 255]));
    let out = render_photo(&source, &build(&config), &config, FontBook::shared());

    assert_eq!(out.dimensions(), source.dimensions());
    assert_ne!(out, source);
    // 左上角远离右下角文本块，应保持不变
    assert_eq!(out.get_pixel(5, 5), source.get_pixel(5, 5));
}

#[test]
fn test_thai_address_is_shaped_without_panicking() {
    let config = OverlayConfig {
        items: vec![ItemKind::DateTime, ItemKind::CustomText],
        custom_text: "ถนนสุขุมวิท กรุงเทพมหานคร".to_string(),
        ..Default::default()
    };
    let source = RgbaImage::from_pixel(1080, 720, Rgba([0, 0, 0, 255]));
    let out = render_photo(&source, &build(&config), &config, FontBook::shared());
    assert_ne!(out, source);
}
