//! # 文本块布局（LayoutEngine）
//!
//! ## 规则
//!
//! - 行高 = 字形高度（上升 + 下降）+ 0.5 × 字号，额外间距平分到行的上下
//! - 块宽 = 各行宽度最大值，块高 = 各行行高之和
//! - 块原点由锚点决定：靠左/上取 `padding`，居中取 `(W - w) / 2`，
//!   靠右/下取 `W - w - padding`
//! - 行内对齐：左侧锚点左对齐；右侧与水平居中锚点都按右对齐处理
//! - 原点会被限制在画布内，包围盒再与画布求交，保证不越界
//!
//! 本模块只做纯几何计算，不触碰任何绘制表面。

use serde::{Deserialize, Serialize};

use super::canvas::{FontSpec, Point, Rect, TextMeasurer};

/// 行间额外间距（相对字号）。
pub const LINE_GAP_EM: f32 = 0.5;

/// 九宫格锚点。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizontal {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vertical {
    Top,
    Center,
    Bottom,
}

impl Anchor {
    pub const ALL: [Anchor; 9] = [
        Anchor::TopLeft,
        Anchor::TopCenter,
        Anchor::TopRight,
        Anchor::CenterLeft,
        Anchor::Center,
        Anchor::CenterRight,
        Anchor::BottomLeft,
        Anchor::BottomCenter,
        Anchor::BottomRight,
    ];

    pub fn horizontal(self) -> Horizontal {
        match self {
            Anchor::TopLeft | Anchor::CenterLeft | Anchor::BottomLeft => Horizontal::Left,
            Anchor::TopCenter | Anchor::Center | Anchor::BottomCenter => Horizontal::Center,
            Anchor::TopRight | Anchor::CenterRight | Anchor::BottomRight => Horizontal::Right,
        }
    }

    pub fn vertical(self) -> Vertical {
        match self {
            Anchor::TopLeft | Anchor::TopCenter | Anchor::TopRight => Vertical::Top,
            Anchor::CenterLeft | Anchor::Center | Anchor::CenterRight => Vertical::Center,
            Anchor::BottomLeft | Anchor::BottomCenter | Anchor::BottomRight => Vertical::Bottom,
        }
    }

    /// 行内对齐方式。水平居中的锚点沿用右对齐。
    pub fn text_align(self) -> TextAlign {
        match self.horizontal() {
            Horizontal::Left => TextAlign::Left,
            Horizontal::Center | Horizontal::Right => TextAlign::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Right,
}

/// 逻辑画布尺寸（像素）。视频路径下是安全区尺寸，而不是物理缓冲区尺寸。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_xywh(0.0, 0.0, self.width, self.height)
    }
}

/// 尺寸为 `size` 的块在视口内按锚点放置的左上角，结果限制在视口内。
pub fn anchor_origin(anchor: Anchor, width: f32, height: f32, viewport: Viewport, padding: f32) -> Point {
    let x = match anchor.horizontal() {
        Horizontal::Left => padding,
        Horizontal::Center => (viewport.width - width) / 2.0,
        Horizontal::Right => viewport.width - width - padding,
    };
    let y = match anchor.vertical() {
        Vertical::Top => padding,
        Vertical::Center => (viewport.height - height) / 2.0,
        Vertical::Bottom => viewport.height - height - padding,
    };
    Point::new(
        x.clamp(0.0, (viewport.width - width).max(0.0)),
        y.clamp(0.0, (viewport.height - height).max(0.0)),
    )
}

/// 多行文本的尺寸信息（与位置无关）。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockMetrics {
    pub line_widths: Vec<f32>,
    pub line_heights: Vec<f32>,
    pub line_ascents: Vec<f32>,
    pub gap: f32,
    pub width: f32,
    pub height: f32,
}

impl BlockMetrics {
    pub fn measure<M, S>(measurer: &M, lines: &[S], font: &FontSpec) -> Self
    where
        M: TextMeasurer + ?Sized,
        S: AsRef<str>,
    {
        let gap = LINE_GAP_EM * font.size_px;
        let mut metrics = Self {
            gap,
            ..Default::default()
        };
        for line in lines {
            let m = measurer.measure_text(line.as_ref(), font);
            metrics.line_widths.push(m.width);
            metrics.line_heights.push(m.height() + gap);
            metrics.line_ascents.push(m.ascent);
        }
        metrics.width = metrics.line_widths.iter().copied().fold(0.0, f32::max);
        metrics.height = metrics.line_heights.iter().sum();
        metrics
    }

    /// 以 `origin` 为块左上角时各行的基线起点。
    pub fn baselines(&self, origin: Point, align: TextAlign) -> Vec<Point> {
        let mut top = origin.y;
        let mut baselines = Vec::with_capacity(self.line_widths.len());
        for ((width, height), ascent) in self
            .line_widths
            .iter()
            .zip(&self.line_heights)
            .zip(&self.line_ascents)
        {
            let x = match align {
                TextAlign::Left => origin.x,
                TextAlign::Right => origin.x + self.width - width,
            };
            baselines.push(Point::new(x, top + self.gap / 2.0 + ascent));
            top += height;
        }
        baselines
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub block_origin: Point,
    pub line_baselines: Vec<Point>,
    pub block_bounds: Rect,
    pub line_widths: Vec<f32>,
    pub line_heights: Vec<f32>,
    pub alignment: TextAlign,
}

impl LayoutResult {
    pub fn is_empty(&self) -> bool {
        self.line_baselines.is_empty()
    }
}

/// 计算多行文本块在视口中的位置。
pub fn compute_layout<M, S>(
    measurer: &M,
    lines: &[S],
    font: &FontSpec,
    anchor: Anchor,
    viewport: Viewport,
    padding: f32,
) -> LayoutResult
where
    M: TextMeasurer + ?Sized,
    S: AsRef<str>,
{
    let metrics = BlockMetrics::measure(measurer, lines, font);
    let alignment = anchor.text_align();
    let origin = anchor_origin(anchor, metrics.width, metrics.height, viewport, padding);
    let bounds = Rect::from_xywh(origin.x, origin.y, metrics.width, metrics.height)
        .intersect(&viewport.rect());

    LayoutResult {
        block_origin: origin,
        line_baselines: metrics.baselines(origin, alignment),
        block_bounds: bounds,
        line_widths: metrics.line_widths,
        line_heights: metrics.line_heights,
        alignment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::RecordingCanvas;
    use proptest::prelude::*;

    fn font(size: f32) -> FontSpec {
        FontSpec::new("sans", size)
    }

    #[test]
    fn bottom_right_hugs_padding() {
        let canvas = RecordingCanvas::new(1080, 1920);
        let lines = ["17/10/2026 14:03:55", "13.756300, 100.501800"];
        let viewport = Viewport::new(1080.0, 1920.0);
        let layout = compute_layout(&canvas, &lines, &font(36.0), Anchor::BottomRight, viewport, 40.0);

        assert!((layout.block_bounds.right - 1040.0).abs() < 1e-3);
        assert!((layout.block_bounds.bottom - 1880.0).abs() < 1e-3);
        assert_eq!(layout.alignment, TextAlign::Right);
        // 右对齐：每行右端都落在块右边缘
        for (baseline, width) in layout.line_baselines.iter().zip(&layout.line_widths) {
            assert!((baseline.x + width - 1040.0).abs() < 1e-3);
        }
    }

    #[test]
    fn center_anchor_is_right_aligned() {
        let canvas = RecordingCanvas::new(1000, 1000);
        let lines = ["short", "a much longer line"];
        let layout = compute_layout(
            &canvas,
            &lines,
            &font(20.0),
            Anchor::TopCenter,
            Viewport::new(1000.0, 1000.0),
            10.0,
        );
        assert_eq!(layout.alignment, TextAlign::Right);
        let block_width = layout.line_widths[1];
        assert!((layout.block_origin.x - (1000.0 - block_width) / 2.0).abs() < 1e-3);
        assert!(layout.line_baselines[0].x > layout.line_baselines[1].x);
    }

    #[test]
    fn baselines_advance_by_line_height() {
        let canvas = RecordingCanvas::new(500, 500);
        let lines = ["a", "b", "c"];
        let layout = compute_layout(
            &canvas,
            &lines,
            &font(10.0),
            Anchor::TopLeft,
            Viewport::new(500.0, 500.0),
            5.0,
        );
        // 字形高 10，行间距 5，行高 15；首行基线 = 5 + 2.5 + 8
        assert_eq!(layout.line_heights, vec![15.0, 15.0, 15.0]);
        assert_eq!(layout.line_baselines[0], Point::new(5.0, 15.5));
        assert_eq!(layout.line_baselines[2].y - layout.line_baselines[0].y, 30.0);
    }

    #[test]
    fn oversized_block_is_clamped() {
        let canvas = RecordingCanvas::new(100, 40);
        let lines = ["this line is far wider than the tiny canvas"];
        let viewport = Viewport::new(100.0, 40.0);
        let layout = compute_layout(&canvas, &lines, &font(30.0), Anchor::BottomRight, viewport, 10.0);
        assert_eq!(layout.block_origin, Point::new(0.0, 0.0));
        assert!(viewport.rect().contains_rect(&layout.block_bounds));
    }

    #[test]
    fn empty_lines_produce_empty_layout() {
        let canvas = RecordingCanvas::new(100, 100);
        let lines: [&str; 0] = [];
        let layout = compute_layout(
            &canvas,
            &lines,
            &font(12.0),
            Anchor::Center,
            Viewport::new(100.0, 100.0),
            4.0,
        );
        assert!(layout.is_empty());
        assert_eq!(layout.block_bounds.width(), 0.0);
    }

    fn anchor_strategy() -> impl Strategy<Value = Anchor> {
        (0..Anchor::ALL.len()).prop_map(|i| Anchor::ALL[i])
    }

    proptest! {
        #[test]
        fn block_always_inside_viewport(
            lines in prop::collection::vec("[a-zA-Z0-9 ,.:]{0,40}", 1..6),
            size in 8.0f32..120.0,
            anchor in anchor_strategy(),
            width in 50.0f32..4000.0,
            height in 50.0f32..4000.0,
            padding_ratio in 0.0f32..0.5,
        ) {
            let canvas = RecordingCanvas::new(width as u32, height as u32);
            let viewport = Viewport::new(width, height);
            let padding = width.min(height) * padding_ratio;
            let layout = compute_layout(&canvas, &lines, &font(size), anchor, viewport, padding);
            prop_assert!(viewport.rect().contains_rect(&layout.block_bounds));
            prop_assert!(layout.block_origin.x >= 0.0 && layout.block_origin.y >= 0.0);
        }

        #[test]
        fn block_size_scales_linearly(
            lines in prop::collection::vec("[a-z0-9 ]{1,30}", 1..5),
            scale in 0.25f32..4.0,
        ) {
            let canvas = RecordingCanvas::new(100_000, 100_000);
            let viewport = Viewport::new(100_000.0, 100_000.0);
            let base = BlockMetrics::measure(&canvas, &lines, &font(36.0));
            let scaled = BlockMetrics::measure(&canvas, &lines, &font(36.0 * scale));
            prop_assert!((scaled.width - base.width * scale).abs() <= base.width * scale * 1e-4 + 1e-3);
            prop_assert!((scaled.height - base.height * scale).abs() <= base.height * scale * 1e-4 + 1e-3);

            let layout = compute_layout(&canvas, &lines, &font(36.0 * scale), Anchor::TopLeft, viewport, 0.0);
            prop_assert!((layout.block_bounds.width() - scaled.width).abs() < 1e-2);
        }
    }
}
