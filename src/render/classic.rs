//! Classic 模板：一次布局覆盖所有行，可选半透明背景框，描边 + 填充两遍绘制。

use super::canvas::{Canvas, Color, Paint, TextMeasurer};
use super::error::RenderError;
use super::layout::{LayoutResult, Viewport, compute_layout};
use super::{MARGIN_PX, draw_text_line};
use crate::overlay::{OverlayConfig, WatermarkSnapshot};

const BACKGROUND_INSET_PX: f32 = 16.0;
const BACKGROUND_RADIUS_PX: f32 = 12.0;
const BACKGROUND_COLOR: Color = Color::from_argb(0x6600_0000);

/// 文本块布局，供绘制和命中测试共用。
pub fn layout<M>(
    measurer: &M,
    snapshot: &WatermarkSnapshot,
    config: &OverlayConfig,
    viewport: Viewport,
    scale: f32,
) -> LayoutResult
where
    M: TextMeasurer + ?Sized,
{
    compute_layout(
        measurer,
        &snapshot.texts(),
        &config.text_font(scale),
        config.position,
        viewport,
        MARGIN_PX * scale,
    )
}

pub fn render(
    canvas: &mut dyn Canvas,
    snapshot: &WatermarkSnapshot,
    config: &OverlayConfig,
    viewport: Viewport,
    scale: f32,
) -> Result<(), RenderError> {
    let layout = layout(&*canvas, snapshot, config, viewport, scale);
    if layout.is_empty() {
        return Ok(());
    }

    if config.background_box_enabled {
        let inset = BACKGROUND_INSET_PX * scale;
        let rect = layout
            .block_bounds
            .outset(inset, inset)
            .intersect(&viewport.rect());
        canvas.draw_round_rect(
            rect,
            BACKGROUND_RADIUS_PX * scale,
            &Paint::fill(BACKGROUND_COLOR.modulate(config.opacity)),
        )?;
    }

    let font = config.text_font(scale);
    for (line, baseline) in snapshot.lines.iter().zip(&layout.line_baselines) {
        draw_text_line(canvas, &line.text, *baseline, &font, config, line.color, scale)?;
    }
    Ok(())
}
