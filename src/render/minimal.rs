//! Minimal 模板：所有信息压成一行，放在胶囊形背景里。

use super::canvas::{Canvas, Color, Paint, Point, Rect};
use super::error::RenderError;
use super::layout::{Viewport, anchor_origin};
use super::{MARGIN_PX, draw_text_line};
use crate::overlay::{LineKind, OverlayConfig, WatermarkSnapshot};

const SEPARATOR: &str = " · ";
const ADDRESS_MAX_CHARS: usize = 25;
const ELLIPSIS: char = '…';

const PILL_PADDING_X_PX: f32 = 24.0;
const PILL_PADDING_Y_PX: f32 = 12.0;
const PILL_COLOR: Color = Color::from_argb(0x8C00_0000);
const FONT_SIZE_FACTOR: f32 = 0.9;

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push(ELLIPSIS);
    truncated
}

/// 先按 6 位小数格式化，再截去末两位，得到 4 位小数（不四舍五入到 4 位）。
fn truncate_coordinate(value: f64) -> String {
    let mut text = format!("{value:.6}");
    text.truncate(text.len() - 2);
    text
}

/// 拼出单行摘要文本；没有任何可显示内容时返回空串。
pub fn summary_text(snapshot: &WatermarkSnapshot) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(line) = snapshot.lines_of(LineKind::DateTime).next() {
        parts.push(line.text.clone());
    }

    let address = snapshot
        .lines_of(LineKind::Address)
        .map(|line| line.text.trim())
        .collect::<Vec<_>>()
        .join(" ");
    if !address.is_empty() {
        parts.push(truncate_chars(&address, ADDRESS_MAX_CHARS));
    }

    if snapshot.lines_of(LineKind::Gps).next().is_some()
        && let Some(point) = snapshot.location
    {
        parts.push(format!(
            "{}, {}",
            truncate_coordinate(point.latitude),
            truncate_coordinate(point.longitude)
        ));
    }

    for kind in [LineKind::Project, LineKind::Inspector, LineKind::Tags] {
        parts.extend(snapshot.lines_of(kind).map(|line| line.text.clone()));
    }

    parts.join(SEPARATOR)
}

pub fn render(
    canvas: &mut dyn Canvas,
    snapshot: &WatermarkSnapshot,
    config: &OverlayConfig,
    viewport: Viewport,
    scale: f32,
) -> Result<(), RenderError> {
    let text = summary_text(snapshot);
    if text.is_empty() {
        return Ok(());
    }

    let font = config.text_font(scale).scaled(FONT_SIZE_FACTOR);
    let metrics = canvas.measure_text(&text, &font);
    let (pad_x, pad_y) = (PILL_PADDING_X_PX * scale, PILL_PADDING_Y_PX * scale);
    let width = metrics.width + pad_x * 2.0;
    let height = metrics.height() + pad_y * 2.0;
    let origin = anchor_origin(config.position, width, height, viewport, MARGIN_PX * scale);
    let pill = Rect::from_xywh(origin.x, origin.y, width, height).intersect(&viewport.rect());

    canvas.draw_round_rect(pill, pill.height() / 2.0, &Paint::fill(PILL_COLOR.modulate(config.opacity)))?;
    draw_text_line(
        canvas,
        &text,
        Point::new(origin.x + pad_x, origin.y + pad_y + metrics.ascent),
        &font,
        config,
        config.text_color,
        scale,
    )
}
