//! # 指南针表盘（CompassDial）
//!
//! ## 设计思路
//!
//! 表盘的刻度和文字随航向反向旋转（`rotate(-heading)`），顶部的红色指示三角
//! 保持固定，用户看到的是"表盘在转、指针不动"。航向为 0 时 `N` 正好位于指示
//! 三角下方。
//!
//! ## 绘制顺序
//!
//! 1. 半透明圆盘 + 外圈
//! 2. 固定的北向指示三角
//! 3. `save` → 平移到圆心 → `rotate(-heading)` → 刻度与标签 → `restore`
//! 4. 圆心读数（整数角度 + 八方位），不旋转
//!
//! 所有颜色都按水印整体不透明度 `opacity` 缩放 alpha。

use super::canvas::{Canvas, Color, FontSpec, Paint, Point, TextMeasurer};
use super::error::RenderError;
use super::layout::{Anchor, Viewport, anchor_origin};

/// 八方位标签，从正北开始顺时针。
pub const COMPASS_POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// 1080 宽参考画布下的表盘半径。
pub const DIAL_RADIUS_PX: f32 = 110.0;

const DISC_COLOR: Color = Color::from_argb(0x8000_0000);
const RING_COLOR: Color = Color::from_argb(0xB0FF_FFFF);
const TICK_COLOR: Color = Color::from_argb(0xE6FF_FFFF);
const NORTH_COLOR: Color = Color::RED;

const TICK_OUTER: f32 = 0.95;
const LABEL_RADIUS: f32 = 0.62;

/// 角度归一化到 `[0, 360)`，非有限值返回 0。
pub fn normalize_heading(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid 对极小负数可能返回 360.0
    if normalized >= 360.0 { 0.0 } else { normalized }
}

/// 八方位标签：`round(heading / 45) % 8`。
pub fn heading_label(degrees: f32) -> &'static str {
    let index = (normalize_heading(degrees) / 45.0).round() as usize % 8;
    COMPASS_POINTS[index]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickTier {
    Cardinal,
    Major,
    Minor,
}

impl TickTier {
    fn of(degrees: u32) -> Self {
        if degrees % 90 == 0 {
            Self::Cardinal
        } else if degrees % 30 == 0 {
            Self::Major
        } else {
            Self::Minor
        }
    }

    /// `(刻度长度占半径比例, 线宽)`，线宽为参考画布像素。
    fn geometry(self) -> (f32, f32) {
        match self {
            Self::Cardinal => (0.18, 3.0),
            Self::Major => (0.12, 2.0),
            Self::Minor => (0.06, 1.0),
        }
    }
}

fn cardinal_name(degrees: u32) -> &'static str {
    COMPASS_POINTS[(degrees / 45) as usize % 8]
}

/// 以 `center` 为中心水平、垂直居中绘制文本。
fn draw_centered_text(
    canvas: &mut dyn Canvas,
    text: &str,
    center: Point,
    font: &FontSpec,
    paint: &Paint,
) -> Result<(), RenderError> {
    let metrics = canvas.measure_text(text, font);
    let origin = Point::new(
        center.x - metrics.width / 2.0,
        center.y + (metrics.ascent - metrics.descent) / 2.0,
    );
    canvas.draw_text(text, origin, font, paint)
}

/// 表盘文字字体族与整体不透明度。
#[derive(Debug, Clone, Copy)]
pub struct DialStyle<'a> {
    pub font_family: &'a str,
    pub opacity: u8,
}

impl<'a> DialStyle<'a> {
    pub fn new(font_family: &'a str, opacity: u8) -> Self {
        Self { font_family, opacity }
    }
}

/// 在 `center` 处绘制半径为 `radius` 的表盘。
pub fn draw(
    canvas: &mut dyn Canvas,
    center: Point,
    radius: f32,
    heading_degrees: f32,
    scale: f32,
    style: DialStyle<'_>,
) -> Result<(), RenderError> {
    let DialStyle { font_family, opacity } = style;
    if !radius.is_finite() || radius <= 0.0 {
        return Err(RenderError::InvalidGeometry(format!("表盘半径无效: {radius}")));
    }
    let heading = normalize_heading(heading_degrees);

    canvas.draw_circle(center, radius, &Paint::fill(DISC_COLOR.modulate(opacity)))?;
    canvas.draw_circle(center, radius, &Paint::stroke(RING_COLOR.modulate(opacity), 2.0 * scale))?;

    let indicator = [
        Point::new(center.x, center.y - 0.98 * radius),
        Point::new(center.x + 0.08 * radius, center.y - 0.80 * radius),
        Point::new(center.x - 0.08 * radius, center.y - 0.80 * radius),
    ];
    canvas.draw_polygon(&indicator, &Paint::fill(NORTH_COLOR.modulate(opacity)))?;

    canvas.save();
    canvas.translate(center.x, center.y);
    canvas.rotate(-heading);
    let dial = draw_dial_face(canvas, radius, scale, font_family, opacity);
    canvas.restore();
    dial?;

    let readout_font = FontSpec::new(font_family, radius * 0.30).bold(true);
    let label_font = FontSpec::new(font_family, radius * 0.18);
    let white = Paint::fill(Color::WHITE.modulate(opacity));
    draw_centered_text(
        canvas,
        &format!("{}°", heading.round() as u32 % 360),
        Point::new(center.x, center.y - radius * 0.04),
        &readout_font,
        &white,
    )?;
    draw_centered_text(
        canvas,
        heading_label(heading),
        Point::new(center.x, center.y + radius * 0.24),
        &label_font,
        &white,
    )
}

/// 旋转坐标系下（原点为圆心）绘制刻度和标签。
fn draw_dial_face(
    canvas: &mut dyn Canvas,
    radius: f32,
    scale: f32,
    font_family: &str,
    opacity: u8,
) -> Result<(), RenderError> {
    let tick_color = TICK_COLOR.modulate(opacity);
    let cardinal_font = FontSpec::new(font_family, radius * 0.20).bold(true);
    let major_font = FontSpec::new(font_family, radius * 0.12);
    let outer = TICK_OUTER * radius;

    for degrees in (0..360).step_by(5) {
        let tier = TickTier::of(degrees);
        let (length, width) = tier.geometry();
        let (sin, cos) = (degrees as f32).to_radians().sin_cos();
        // 方位角顺时针，正北指向 -y
        let direction = Point::new(sin, -cos);
        let from = Point::new(direction.x * outer, direction.y * outer);
        let inner = outer - length * radius;
        let to = Point::new(direction.x * inner, direction.y * inner);
        canvas.draw_line(from, to, &Paint::stroke(tick_color, width * scale))?;

        let label_at = Point::new(direction.x * LABEL_RADIUS * radius, direction.y * LABEL_RADIUS * radius);
        match tier {
            TickTier::Cardinal => {
                let color = if degrees == 0 { NORTH_COLOR } else { Color::WHITE };
                let color = color.modulate(opacity);
                draw_centered_text(
                    canvas,
                    cardinal_name(degrees),
                    label_at,
                    &cardinal_font,
                    &Paint::fill(color),
                )?;
            }
            TickTier::Major => {
                draw_centered_text(
                    canvas,
                    &degrees.to_string(),
                    label_at,
                    &major_font,
                    &Paint::fill(tick_color),
                )?;
            }
            TickTier::Minor => {}
        }
    }
    Ok(())
}

/// 按 `anchor` 把表盘放进视口，返回所用的圆心。
pub fn draw_anchored(
    canvas: &mut dyn Canvas,
    anchor: Anchor,
    heading_degrees: f32,
    viewport: Viewport,
    scale: f32,
    margin: f32,
    style: DialStyle<'_>,
) -> Result<Point, RenderError> {
    let radius = DIAL_RADIUS_PX * scale;
    let origin = anchor_origin(anchor, radius * 2.0, radius * 2.0, viewport, margin);
    let center = Point::new(origin.x + radius, origin.y + radius);
    draw(canvas, center, radius, heading_degrees, scale, style)?;
    Ok(center)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{DrawOp, RecordingCanvas};

    fn indicator_points(canvas: &RecordingCanvas) -> Vec<Point> {
        canvas
            .ops()
            .iter()
            .find_map(|op| match op {
                DrawOp::Polygon { points, paint } if paint.color == NORTH_COLOR && points.len() == 3 => {
                    Some(points.clone())
                }
                _ => None,
            })
            .unwrap()
    }

    fn text_bounds(canvas: &RecordingCanvas, text: &str) -> Vec<crate::render::Rect> {
        canvas
            .ops()
            .iter()
            .filter(|op| op.text() == Some(text))
            .map(DrawOp::bounds)
            .collect()
    }

    #[test]
    fn labels_follow_rounding_rule() {
        assert_eq!(heading_label(0.0), "N");
        assert_eq!(heading_label(22.4), "N");
        assert_eq!(heading_label(22.6), "NE");
        assert_eq!(heading_label(137.0), "SE");
        assert_eq!(heading_label(359.0), "N");
        assert_eq!(heading_label(-90.0), "W");
        assert_eq!(heading_label(f32::NAN), "N");
    }

    #[test]
    fn normalize_wraps_into_range() {
        assert_eq!(normalize_heading(370.0), 10.0);
        assert_eq!(normalize_heading(-10.0), 350.0);
        assert_eq!(normalize_heading(f32::INFINITY), 0.0);
        let tiny = normalize_heading(-1e-9);
        assert!((0.0..360.0).contains(&tiny));
    }

    #[test]
    fn indicator_is_invariant_to_heading() {
        let center = Point::new(200.0, 200.0);
        let mut reference = None;
        for heading in [0.0, 45.0, 137.0, 270.0, 359.5] {
            let mut canvas = RecordingCanvas::new(400, 400);
            draw(&mut canvas, center, 100.0, heading, 1.0, DialStyle::new("sans", 255)).unwrap();
            let points = indicator_points(&canvas);
            assert!(points.iter().all(|p| p.y < center.y));
            match &reference {
                None => reference = Some(points),
                Some(expected) => assert_eq!(&points, expected),
            }
            assert_eq!(canvas.save_depth(), 0);
        }
    }

    #[test]
    fn north_label_sits_at_top_for_zero_heading() {
        let center = Point::new(200.0, 200.0);
        let mut canvas = RecordingCanvas::new(400, 400);
        draw(&mut canvas, center, 100.0, 0.0, 1.0, DialStyle::new("sans", 255)).unwrap();
        let north = text_bounds(&canvas, "N")[0].center();
        assert!((north.x - center.x).abs() < 1.0);
        assert!((north.y - (center.y - 62.0)).abs() < 1.0);

        // 航向 90° 时表盘逆时针转 90°，E 转到顶部、N 转到左侧
        let mut turned = RecordingCanvas::new(400, 400);
        draw(&mut turned, center, 100.0, 90.0, 1.0, DialStyle::new("sans", 255)).unwrap();
        let east = text_bounds(&turned, "E")[0].center();
        assert!((east.x - center.x).abs() < 1.0);
        assert!(east.y < center.y);
        let north = text_bounds(&turned, "N")[0].center();
        assert!((north.y - center.y).abs() < 1.0);
        assert!(north.x < center.x);
    }

    #[test]
    fn ticks_and_readout_are_drawn() {
        let mut canvas = RecordingCanvas::new(400, 400);
        draw(&mut canvas, Point::new(200.0, 200.0), 100.0, 137.4, 1.0, DialStyle::new("sans", 255)).unwrap();
        let texts = canvas.texts();
        assert!(texts.contains(&"137°"));
        assert!(texts.contains(&"SE"));
        for label in ["N", "E", "S", "W", "30", "60", "330"] {
            assert!(texts.contains(&label), "missing {label}");
        }
        let ticks = canvas
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::Line { .. }))
            .count();
        assert_eq!(ticks, 72);
        let polygons = canvas
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::Polygon { .. }))
            .count();
        assert_eq!(polygons, 1);
    }

    #[test]
    fn failing_canvas_still_restores_transform() {
        let mut canvas = RecordingCanvas::new(400, 400).failing_after(5);
        let result = draw(&mut canvas, Point::new(200.0, 200.0), 100.0, 10.0, 1.0, DialStyle::new("sans", 255));
        assert!(result.is_err());
        assert_eq!(canvas.save_depth(), 0);
    }

    #[test]
    fn anchored_dial_stays_inside_viewport() {
        let mut canvas = RecordingCanvas::new(1080, 1920);
        let viewport = Viewport::new(1080.0, 1920.0);
        let center = draw_anchored(&mut canvas, Anchor::TopLeft, 10.0, viewport, 1.0, 40.0, DialStyle::new("sans", 255)).unwrap();
        assert_eq!(center, Point::new(150.0, 150.0));
    }

    #[test]
    fn opacity_scales_every_element() {
        let mut canvas = RecordingCanvas::new(400, 400);
        draw(&mut canvas, Point::new(200.0, 200.0), 100.0, 0.0, 1.0, DialStyle::new("sans", 128)).unwrap();
        let alpha_of = |op: &DrawOp| match op {
            DrawOp::Circle { paint, .. }
            | DrawOp::Polygon { paint, .. }
            | DrawOp::Line { paint, .. }
            | DrawOp::Text { paint, .. } => paint.color.a,
            _ => 255,
        };
        let ops = canvas.ops();
        assert_eq!(alpha_of(&ops[0]), DISC_COLOR.modulate(128).a);
        assert_eq!(alpha_of(&ops[1]), RING_COLOR.modulate(128).a);
        assert!(ops.iter().all(|op| alpha_of(op) <= 128));
        let readout = ops.iter().rev().find(|op| op.text() == Some("0°")).unwrap();
        assert_eq!(alpha_of(readout), 128);
    }
}
