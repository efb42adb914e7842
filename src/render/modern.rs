//! # Modern 模板
//!
//! 圆角卡片 + 左侧渐变强调条。卡片内自上而下：大号时间、日期、分隔线、
//! 明细列表（地址 / 坐标 / 项目 / 检查人 / 标签 等非日期行）。
//!
//! 只支持五个锚点（四角 + 居中），其余锚点一律回退到右下角。

use super::canvas::{Canvas, Color, FontSpec, LinearGradient, Paint, Point, Rect, TextMeasurer};
use super::error::RenderError;
use super::layout::{Anchor, BlockMetrics, TextAlign, Viewport, anchor_origin};
use super::{MARGIN_PX, text_shadow};
use crate::overlay::{LineKind, OverlayConfig, WatermarkSnapshot};

const CARD_PADDING_PX: f32 = 28.0;
const CARD_RADIUS_PX: f32 = 24.0;
const ACCENT_WIDTH_PX: f32 = 8.0;
const ACCENT_GAP_PX: f32 = 20.0;
const SECTION_GAP_PX: f32 = 12.0;
const SEPARATOR_WIDTH_PX: f32 = 2.0;

const TIME_SIZE_FACTOR: f32 = 2.2;
const DETAIL_SIZE_FACTOR: f32 = 0.8;

const CARD_COLOR: Color = Color::from_argb(0x9900_0000);
const ACCENT_TOP: Color = Color::from_argb(0xFFFF_B300);
const ACCENT_BOTTOM: Color = Color::from_argb(0xFFFF_6F00);
const SEPARATOR_COLOR: Color = Color::from_argb(0x66FF_FFFF);
const DETAIL_ALPHA: u8 = 0xDD;

/// Modern 支持的锚点；其余回退到 `BottomRight`。
pub fn card_anchor(anchor: Anchor) -> Anchor {
    match anchor {
        Anchor::TopLeft | Anchor::TopRight | Anchor::BottomLeft | Anchor::BottomRight | Anchor::Center => {
            anchor
        }
        _ => Anchor::BottomRight,
    }
}

/// 把日期时间文本拆成 `(大号文本, 次要日期)`。
///
/// 最后一个空白之后的部分含 `':'` 时视为时间；否则整段作为大号文本。
pub fn split_date_time(text: &str) -> (&str, Option<&str>) {
    let text = text.trim();
    if let Some(index) = text.rfind(char::is_whitespace) {
        let (date, time) = (text[..index].trim_end(), text[index..].trim_start());
        if time.contains(':') && !date.is_empty() {
            return (time, Some(date));
        }
    }
    (text, None)
}

/// 一段已定位的文本。
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub text: String,
    pub baseline: Point,
    pub font: FontSpec,
}

/// 卡片几何，绘制和测试共用。
#[derive(Debug, Clone, PartialEq)]
pub struct CardLayout {
    pub card: Rect,
    pub accent: Rect,
    pub time: Option<PlacedText>,
    pub date: Option<PlacedText>,
    pub separator: Option<(Point, Point)>,
    pub details: Vec<PlacedText>,
}

pub fn layout<M>(
    measurer: &M,
    snapshot: &WatermarkSnapshot,
    config: &OverlayConfig,
    viewport: Viewport,
    scale: f32,
) -> Option<CardLayout>
where
    M: TextMeasurer + ?Sized,
{
    let base = config.text_font(scale);
    let time_font = base.scaled(TIME_SIZE_FACTOR).bold(true);
    let date_font = base.clone();
    let detail_font = base.scaled(DETAIL_SIZE_FACTOR);

    let (time_text, date_text) = snapshot
        .lines_of(LineKind::DateTime)
        .next()
        .map(|line| split_date_time(&line.text))
        .map_or((None, None), |(time, date)| (Some(time), date));
    let detail_texts: Vec<&str> = snapshot
        .lines
        .iter()
        .filter(|line| line.kind != LineKind::DateTime)
        .map(|line| line.text.as_str())
        .collect();

    let time_metrics = time_text.map(|t| measurer.measure_text(t, &time_font));
    let date_metrics = date_text.map(|t| measurer.measure_text(t, &date_font));
    let details = BlockMetrics::measure(measurer, &detail_texts, &detail_font);

    let content_width = [
        time_metrics.map_or(0.0, |m| m.width),
        date_metrics.map_or(0.0, |m| m.width),
        details.width,
    ]
    .into_iter()
    .fold(0.0, f32::max);
    if content_width <= 0.0 {
        return None;
    }

    let section_gap = SECTION_GAP_PX * scale;
    let separator_width = SEPARATOR_WIDTH_PX * scale;
    let has_header = time_metrics.is_some() || date_metrics.is_some();
    let mut content_height = time_metrics.map_or(0.0, |m| m.height());
    if let Some(m) = date_metrics {
        if time_metrics.is_some() {
            content_height += section_gap;
        }
        content_height += m.height();
    }
    if !detail_texts.is_empty() {
        if has_header {
            content_height += section_gap * 2.0 + separator_width;
        }
        content_height += details.height;
    }

    let padding = CARD_PADDING_PX * scale;
    let accent_width = ACCENT_WIDTH_PX * scale;
    let accent_gap = ACCENT_GAP_PX * scale;
    let card_width = padding * 2.0 + accent_width + accent_gap + content_width;
    let card_height = padding * 2.0 + content_height;
    let origin = anchor_origin(
        card_anchor(config.position),
        card_width,
        card_height,
        viewport,
        MARGIN_PX * scale,
    );

    let card = Rect::from_xywh(origin.x, origin.y, card_width, card_height).intersect(&viewport.rect());
    let accent = Rect::from_xywh(origin.x + padding, origin.y + padding, accent_width, content_height);
    let content_x = accent.right + accent_gap;
    let mut cursor = origin.y + padding;

    let time = time_text.zip(time_metrics).map(|(text, m)| {
        let placed = PlacedText {
            text: text.to_string(),
            baseline: Point::new(content_x, cursor + m.ascent),
            font: time_font.clone(),
        };
        cursor += m.height();
        placed
    });

    let date = date_text.zip(date_metrics).map(|(text, m)| {
        if time.is_some() {
            cursor += section_gap;
        }
        let placed = PlacedText {
            text: text.to_string(),
            baseline: Point::new(content_x, cursor + m.ascent),
            font: date_font.clone(),
        };
        cursor += m.height();
        placed
    });

    let separator = (has_header && !detail_texts.is_empty()).then(|| {
        cursor += section_gap;
        let y = cursor + separator_width / 2.0;
        cursor += separator_width + section_gap;
        (Point::new(content_x, y), Point::new(content_x + content_width, y))
    });

    let details = details
        .baselines(Point::new(content_x, cursor), TextAlign::Left)
        .into_iter()
        .zip(detail_texts)
        .map(|(baseline, text)| PlacedText {
            text: text.to_string(),
            baseline,
            font: detail_font.clone(),
        })
        .collect();

    Some(CardLayout {
        card,
        accent,
        time,
        date,
        separator,
        details,
    })
}

pub fn render(
    canvas: &mut dyn Canvas,
    snapshot: &WatermarkSnapshot,
    config: &OverlayConfig,
    viewport: Viewport,
    scale: f32,
) -> Result<(), RenderError> {
    let Some(card) = layout(&*canvas, snapshot, config, viewport, scale) else {
        return Ok(());
    };

    canvas.draw_round_rect(
        card.card,
        CARD_RADIUS_PX * scale,
        &Paint::fill(CARD_COLOR.modulate(config.opacity)),
    )?;

    let accent_paint = Paint::fill(ACCENT_TOP.modulate(config.opacity)).with_gradient(LinearGradient {
        start: Point::new(card.accent.left, card.accent.top),
        end: Point::new(card.accent.left, card.accent.bottom),
        from: ACCENT_TOP.modulate(config.opacity),
        to: ACCENT_BOTTOM.modulate(config.opacity),
    });
    canvas.draw_round_rect(card.accent, card.accent.width() / 2.0, &accent_paint)?;

    let text_paint = Paint::fill(config.text_color.modulate(config.opacity)).with_shadow(text_shadow(config, scale));
    for placed in card.time.iter().chain(card.date.iter()) {
        canvas.draw_text(&placed.text, placed.baseline, &placed.font, &text_paint)?;
    }

    if let Some((from, to)) = card.separator {
        canvas.draw_line(
            from,
            to,
            &Paint::stroke(SEPARATOR_COLOR.modulate(config.opacity), SEPARATOR_WIDTH_PX * scale),
        )?;
    }

    let detail_color = config
        .text_color
        .with_alpha(DETAIL_ALPHA)
        .modulate(config.text_color.a)
        .modulate(config.opacity);
    let detail_paint = Paint::fill(detail_color).with_shadow(text_shadow(config, scale));
    for placed in &card.details {
        canvas.draw_text(&placed.text, placed.baseline, &placed.font, &detail_paint)?;
    }
    Ok(())
}
