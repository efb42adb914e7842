//! # 水印绘制模块（render）
//!
//! ## 设计思路
//!
//! 绘制层只认两样东西：一个 [`Canvas`] 和一个不可变的 `WatermarkSnapshot`。
//! 同一套模板代码既画在照片位图（[`RasterCanvas`]）上，也画在视频帧的画布上，
//! 测试里则画在只记录指令的 [`RecordingCanvas`] 上。
//!
//! ## 实现思路
//!
//! ```text
//! render_photo(source)
//!   └─ 复制源图 → RasterCanvas（tiny-skia Pixmap + FontBook）
//!        └─ render(canvas, snapshot, config, viewport, scale)
//!             ├─ compass::draw_anchored   （启用且有航向）
//!             ├─ classic / modern / minimal（按 TemplateId 分派）
//!             └─ logo::draw               （最后绘制，右上角）
//! ```
//!
//! - 所有尺寸常量都以 1080 宽的参考画布为准，乘以 `scale = width / 1080`
//! - 任一绘制步骤返回错误或 panic 时，`render_photo` 返回未修改的原图副本

mod canvas;
mod classic;
pub mod compass;
mod error;
mod fonts;
mod layout;
pub mod logo;
mod minimal;
mod modern;
mod raster;
mod recording;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::overlay::{OverlayConfig, WatermarkSnapshot};

pub use canvas::{
    Canvas, Color, FontSpec, LinearGradient, Paint, PaintStyle, Point, Rect, Shadow, TextMeasurer,
    TextMetrics, map_point, rotation_degrees,
};
pub use compass::{heading_label, normalize_heading};
pub use error::RenderError;
pub use layout::{
    Anchor, BlockMetrics, LayoutResult, TextAlign, Viewport, anchor_origin, compute_layout,
};
pub use minimal::summary_text;
pub use modern::{card_anchor, split_date_time};
pub use fonts::{FontBook, TextOutline};
pub use raster::RasterCanvas;
pub use recording::{DrawOp, RecordingCanvas};
pub use tiny_skia::Transform;

/// 尺寸常量对应的参考画布宽度。
pub const REFERENCE_WIDTH: f32 = 1080.0;
/// 水印距画布边缘的留白（参考画布像素）。
pub const MARGIN_PX: f32 = 40.0;

const SHADOW_RADIUS_PX: f32 = 4.0;
const SHADOW_OFFSET_PX: f32 = 2.0;
const SHADOW_COLOR: Color = Color::from_argb(0xAA00_0000);

/// 水印模板。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateId {
    #[default]
    Classic,
    Modern,
    Minimal,
}

/// 画布宽度对应的缩放系数。
pub fn scale_for_width(width: f32) -> f32 {
    width / REFERENCE_WIDTH
}

/// 文字阴影参数；未启用阴影时为 `None`。
pub fn text_shadow(config: &OverlayConfig, scale: f32) -> Option<Shadow> {
    config.shadow_enabled.then(|| Shadow {
        radius: SHADOW_RADIUS_PX * scale,
        dx: SHADOW_OFFSET_PX * scale,
        dy: SHADOW_OFFSET_PX * scale,
        color: SHADOW_COLOR.modulate(config.opacity),
    })
}

/// 绘制一行文字：启用描边时先画描边（带阴影）再画填充，否则填充自带阴影。
pub(crate) fn draw_text_line(
    canvas: &mut dyn Canvas,
    text: &str,
    baseline: Point,
    font: &FontSpec,
    config: &OverlayConfig,
    color: Color,
    scale: f32,
) -> Result<(), RenderError> {
    let shadow = text_shadow(config, scale);
    let fill = Paint::fill(color.modulate(config.opacity));

    if config.stroke.enabled && config.stroke.width > 0.0 {
        let stroke = Paint::stroke(config.stroke.color.modulate(config.opacity), config.stroke.width * scale)
            .with_shadow(shadow);
        canvas.draw_text(text, baseline, font, &stroke)?;
        canvas.draw_text(text, baseline, font, &fill)
    } else {
        canvas.draw_text(text, baseline, font, &fill.with_shadow(shadow))
    }
}

/// 在 `viewport` 表示的逻辑画布上绘制整个水印。
///
/// `viewport` 与画布当前坐标系一致；视频路径会先平移 / 旋转画布，
/// 再传入安全区尺寸。
pub fn render(
    canvas: &mut dyn Canvas,
    snapshot: &WatermarkSnapshot,
    config: &OverlayConfig,
    viewport: Viewport,
    scale: f32,
) -> Result<(), RenderError> {
    if snapshot.is_empty() {
        return Ok(());
    }
    if !scale.is_finite() || scale <= 0.0 {
        return Err(RenderError::InvalidGeometry(format!("缩放系数无效: {scale}")));
    }
    if !(viewport.width > 0.0 && viewport.height > 0.0) {
        return Err(RenderError::InvalidGeometry(format!(
            "视口尺寸无效: {}x{}",
            viewport.width, viewport.height
        )));
    }

    let margin = MARGIN_PX * scale;
    if config.compass_enabled
        && let Some(heading) = snapshot.compass_heading
    {
        compass::draw_anchored(
            canvas,
            config.compass_position,
            heading,
            viewport,
            scale,
            margin,
            compass::DialStyle::new(&config.font_family, config.opacity),
        )?;
    }

    if !snapshot.lines.is_empty() {
        match config.template_id {
            TemplateId::Classic => classic::render(canvas, snapshot, config, viewport, scale)?,
            TemplateId::Modern => modern::render(canvas, snapshot, config, viewport, scale)?,
            TemplateId::Minimal => minimal::render(canvas, snapshot, config, viewport, scale)?,
        }
    }

    if config.logo_visible()
        && let Some(logo) = &config.logo_image
    {
        logo::draw(canvas, logo, viewport, margin)?;
    }
    Ok(())
}

/// 照片路径：在源图副本上绘制水印。
///
/// 绘制失败或 panic 时记录告警并返回未修改的副本，拍摄流程不会因此中断。
/// 没有自定义字体时传入 [`FontBook::shared`]。
pub fn render_photo(
    source: &RgbaImage,
    snapshot: &WatermarkSnapshot,
    config: &OverlayConfig,
    fonts: Arc<FontBook>,
) -> RgbaImage {
    if snapshot.is_empty() {
        log::debug!("水印快照为空，跳过绘制");
        return source.clone();
    }

    let started = Instant::now();
    let (width, height) = source.dimensions();
    let viewport = Viewport::new(width as f32, height as f32);
    let scale = scale_for_width(viewport.width);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut canvas = RasterCanvas::from_image(source, fonts)?;
        render(&mut canvas, snapshot, config, viewport, scale).map(|()| canvas.into_image())
    }));

    match outcome {
        Ok(Ok(image)) => {
            log::info!(
                "✅ 水印绘制完成 - {width}x{height} template={:?} lines={} total={}ms",
                config.template_id,
                snapshot.lines.len(),
                started.elapsed().as_millis()
            );
            image
        }
        Ok(Err(err)) => {
            log::warn!("⚠️ 水印绘制失败，返回原图：{err}");
            source.clone()
        }
        Err(_) => {
            log::warn!("⚠️ 水印绘制发生 panic，返回原图");
            source.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{ItemKind, LineKind, WatermarkLine};
    use chrono::DateTime;
    use image::Rgba;

    fn snapshot(texts: &[&str], heading: Option<f32>) -> WatermarkSnapshot {
        WatermarkSnapshot {
            lines: texts
                .iter()
                .map(|text| WatermarkLine {
                    text: text.to_string(),
                    color: Color::WHITE,
                    kind: LineKind::CustomText,
                })
                .collect(),
            compass_heading: heading,
            location: None,
            captured_at: DateTime::parse_from_rfc3339("2024-12-24T10:00:00+07:00").unwrap(),
        }
    }

    #[test]
    fn scale_follows_reference_width() {
        assert_eq!(scale_for_width(1080.0), 1.0);
        assert_eq!(scale_for_width(2160.0), 2.0);
    }

    #[test]
    fn empty_snapshot_draws_nothing() {
        let mut canvas = RecordingCanvas::new(1080, 1920);
        render(
            &mut canvas,
            &snapshot(&[], None),
            &OverlayConfig::default(),
            Viewport::new(1080.0, 1920.0),
            1.0,
        )
        .unwrap();
        assert!(canvas.ops().is_empty());
    }

    #[test]
    fn compass_is_drawn_before_text() {
        let config = OverlayConfig {
            compass_enabled: true,
            ..Default::default()
        };
        let mut canvas = RecordingCanvas::new(1080, 1920);
        render(
            &mut canvas,
            &snapshot(&["hello"], Some(45.0)),
            &config,
            Viewport::new(1080.0, 1920.0),
            1.0,
        )
        .unwrap();
        assert!(matches!(canvas.ops()[0], DrawOp::Circle { .. }));
        assert_eq!(canvas.texts().last().copied(), Some("hello"));
    }

    #[test]
    fn compass_is_skipped_when_disabled() {
        let mut canvas = RecordingCanvas::new(1080, 1920);
        render(
            &mut canvas,
            &snapshot(&["hello"], Some(45.0)),
            &OverlayConfig::default(),
            Viewport::new(1080.0, 1920.0),
            1.0,
        )
        .unwrap();
        assert!(canvas.ops().iter().all(|op| !matches!(op, DrawOp::Circle { .. })));
    }

    #[test]
    fn logo_is_drawn_last() {
        let config = OverlayConfig {
            items: vec![ItemKind::DateTime, ItemKind::LogoMarker],
            logo_image: Some(Arc::new(RgbaImage::from_pixel(20, 10, Rgba([255, 0, 0, 255])))),
            ..Default::default()
        };
        let mut canvas = RecordingCanvas::new(1080, 1920);
        render(
            &mut canvas,
            &snapshot(&["hello"], None),
            &config,
            Viewport::new(1080.0, 1920.0),
            1.0,
        )
        .unwrap();
        assert!(matches!(canvas.ops().last(), Some(DrawOp::Image { .. })));
    }

    #[test]
    fn invalid_scale_is_rejected() {
        let mut canvas = RecordingCanvas::new(10, 10);
        let result = render(
            &mut canvas,
            &snapshot(&["x"], None),
            &OverlayConfig::default(),
            Viewport::new(10.0, 10.0),
            f32::NAN,
        );
        assert!(matches!(result, Err(RenderError::InvalidGeometry(_))));
    }

    #[test]
    fn shadow_follows_config() {
        let mut config = OverlayConfig::default();
        let shadow = text_shadow(&config, 2.0).unwrap();
        assert_eq!(shadow.radius, 8.0);
        assert_eq!(shadow.dx, 4.0);
        config.shadow_enabled = false;
        assert!(text_shadow(&config, 2.0).is_none());
    }

    #[test]
    fn photo_is_stamped_with_bundled_font() {
        let source = RgbaImage::from_pixel(540, 960, Rgba([10, 20, 30, 255]));
        let config = OverlayConfig {
            background_box_enabled: false,
            ..Default::default()
        };
        let out = render_photo(&source, &snapshot(&["hello"], None), &config, FontBook::shared());
        assert_eq!(out.dimensions(), source.dimensions());
        assert_ne!(out, source);
    }

    #[test]
    fn empty_photo_is_returned_unchanged() {
        let source = RgbaImage::new(0, 0);
        let out = render_photo(&source, &snapshot(&["hello"], None), &OverlayConfig::default(), FontBook::shared());
        assert_eq!(out, source);
    }
}
