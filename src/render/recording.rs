//! 记录型画布：不产生像素，只把每条绘制指令按设备坐标记录下来。
//!
//! 文本度量使用固定比例（每字符 0.55 em，上升 0.8 em，下降 0.2 em），
//! 与字体文件无关，因此布局结果在任何环境下都可复现。

use image::RgbaImage;
use tiny_skia::Transform;

use super::canvas::{
    Canvas, FontSpec, Paint, Point, Rect, TextMeasurer, TextMetrics, line_width, map_point,
    rotation_degrees,
};
use super::error::RenderError;

pub const ADVANCE_EM: f32 = 0.55;
pub const BOLD_ADVANCE_FACTOR: f32 = 1.05;
pub const ASCENT_EM: f32 = 0.8;
pub const DESCENT_EM: f32 = 0.2;

/// 按固定比例估算文本度量。
pub fn approximate_metrics(text: &str, font: &FontSpec) -> TextMetrics {
    let mut advance = ADVANCE_EM * font.size_px;
    if font.bold {
        advance *= BOLD_ADVANCE_FACTOR;
    }
    TextMetrics {
        width: text.chars().count() as f32 * advance,
        ascent: ASCENT_EM * font.size_px,
        descent: DESCENT_EM * font.size_px,
    }
}

/// 一条已记录的绘制指令，坐标均已变换到设备空间。
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Polygon {
        points: Vec<Point>,
        paint: Paint,
    },
    RoundRect {
        /// 设备空间中的包围盒。
        bounds: Rect,
        radius: f32,
        paint: Paint,
    },
    Circle {
        center: Point,
        radius: f32,
        paint: Paint,
    },
    Line {
        from: Point,
        to: Point,
        paint: Paint,
    },
    Text {
        text: String,
        /// 基线左端点（设备坐标）。
        origin: Point,
        /// 设备空间中的包围盒。
        bounds: Rect,
        rotation_degrees: f32,
        font: FontSpec,
        paint: Paint,
    },
    Image {
        bounds: Rect,
    },
}

impl DrawOp {
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Polygon { points, .. } => Rect::bounding(points).unwrap_or_default(),
            Self::Circle { center, radius, .. } => {
                Rect::from_xywh(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0)
            }
            Self::Line { from, to, paint } => {
                let half = line_width(paint) / 2.0;
                Rect::bounding(&[*from, *to])
                    .unwrap_or_default()
                    .outset(half, half)
            }
            Self::RoundRect { bounds, .. } | Self::Text { bounds, .. } | Self::Image { bounds } => *bounds,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingCanvas {
    width: u32,
    height: u32,
    transform: Transform,
    saved: Vec<Transform>,
    ops: Vec<DrawOp>,
    /// 每个未结束绘制层开始时的指令数。
    layers: Vec<usize>,
    /// 记录到第 N 条指令后开始返回错误，用于验证降级路径。
    fail_after: Option<usize>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// 成功记录 `count` 条指令后，之后的绘制全部返回 `RenderError::Surface`。
    #[must_use]
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops.iter().filter_map(DrawOp::text).collect()
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn save_depth(&self) -> usize {
        self.saved.len()
    }

    pub fn layer_depth(&self) -> usize {
        self.layers.len()
    }

    fn record(&mut self, op: DrawOp) -> Result<(), RenderError> {
        if self.fail_after.is_some_and(|limit| self.ops.len() >= limit) {
            return Err(RenderError::Surface("记录画布已达到失败阈值".to_string()));
        }
        self.ops.push(op);
        Ok(())
    }

    fn map(&self, point: Point) -> Point {
        map_point(&self.transform, point)
    }

    fn device_bounds(&self, local: Rect) -> Rect {
        let corners = local.corners().map(|p| self.map(p));
        Rect::bounding(&corners).unwrap_or_default()
    }
}

impl TextMeasurer for RecordingCanvas {
    fn measure_text(&self, text: &str, font: &FontSpec) -> TextMetrics {
        approximate_metrics(text, font)
    }
}

impl Canvas for RecordingCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn save(&mut self) {
        self.saved.push(self.transform);
    }

    fn restore(&mut self) {
        if let Some(previous) = self.saved.pop() {
            self.transform = previous;
        }
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.transform = self.transform.pre_translate(dx, dy);
    }

    fn rotate(&mut self, degrees: f32) {
        self.transform = self.transform.pre_rotate(degrees);
    }

    fn save_layer(&mut self) {
        self.layers.push(self.ops.len());
    }

    fn restore_layer(&mut self, commit: bool) {
        match self.layers.pop() {
            Some(mark) if !commit => self.ops.truncate(mark),
            _ => {}
        }
    }

    fn draw_circle(&mut self, center: Point, radius: f32, paint: &Paint) -> Result<(), RenderError> {
        let center = self.map(center);
        self.record(DrawOp::Circle {
            center,
            radius,
            paint: paint.clone(),
        })
    }

    fn draw_polygon(&mut self, points: &[Point], paint: &Paint) -> Result<(), RenderError> {
        if points.len() < 3 {
            return Err(RenderError::InvalidGeometry(format!(
                "多边形至少需要 3 个顶点，实际 {}",
                points.len()
            )));
        }
        let points = points.iter().map(|p| self.map(*p)).collect();
        self.record(DrawOp::Polygon {
            points,
            paint: paint.clone(),
        })
    }

    fn draw_round_rect(&mut self, rect: Rect, radius: f32, paint: &Paint) -> Result<(), RenderError> {
        let bounds = self.device_bounds(rect);
        self.record(DrawOp::RoundRect {
            bounds,
            radius,
            paint: paint.clone(),
        })
    }

    fn draw_line(&mut self, from: Point, to: Point, paint: &Paint) -> Result<(), RenderError> {
        let (from, to) = (self.map(from), self.map(to));
        self.record(DrawOp::Line {
            from,
            to,
            paint: paint.clone(),
        })
    }

    fn draw_text(
        &mut self,
        text: &str,
        origin: Point,
        font: &FontSpec,
        paint: &Paint,
    ) -> Result<(), RenderError> {
        let metrics = approximate_metrics(text, font);
        let bounds = self.device_bounds(Rect {
            left: origin.x,
            top: origin.y - metrics.ascent,
            right: origin.x + metrics.width,
            bottom: origin.y + metrics.descent,
        });
        let op = DrawOp::Text {
            text: text.to_string(),
            origin: self.map(origin),
            bounds,
            rotation_degrees: rotation_degrees(&self.transform),
            font: font.clone(),
            paint: paint.clone(),
        };
        self.record(op)
    }

    fn draw_image(&mut self, image: &RgbaImage, top_left: Point) -> Result<(), RenderError> {
        let bounds = self.device_bounds(Rect::from_xywh(
            top_left.x,
            top_left.y,
            image.width() as f32,
            image.height() as f32,
        ));
        self.record(DrawOp::Image { bounds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::canvas::Color;

    #[test]
    fn metrics_scale_linearly_with_size() {
        let small = approximate_metrics("13.7563", &FontSpec::new("sans", 10.0));
        let large = approximate_metrics("13.7563", &FontSpec::new("sans", 40.0));
        assert!((large.width - small.width * 4.0).abs() < 1e-3);
        assert!((large.height() - small.height() * 4.0).abs() < 1e-3);
    }

    #[test]
    fn records_device_space_geometry() {
        let mut canvas = RecordingCanvas::new(200, 100);
        canvas.save();
        canvas.translate(50.0, 10.0);
        canvas
            .draw_rect(Rect::from_xywh(0.0, 0.0, 20.0, 10.0), &Paint::fill(Color::WHITE))
            .unwrap();
        canvas.restore();

        assert_eq!(canvas.save_depth(), 0);
        assert_eq!(
            canvas.ops()[0].bounds(),
            Rect { left: 50.0, top: 10.0, right: 70.0, bottom: 20.0 }
        );
    }

    #[test]
    fn fails_after_threshold() {
        let mut canvas = RecordingCanvas::new(10, 10).failing_after(1);
        let paint = Paint::fill(Color::WHITE);
        assert!(canvas.draw_circle(Point::new(1.0, 1.0), 1.0, &paint).is_ok());
        assert!(matches!(
            canvas.draw_circle(Point::new(1.0, 1.0), 1.0, &paint),
            Err(RenderError::Surface(_))
        ));
        assert_eq!(canvas.ops().len(), 1);
    }

    #[test]
    fn degenerate_polygon_is_rejected() {
        let mut canvas = RecordingCanvas::new(10, 10);
        let result = canvas.draw_polygon(&[Point::new(0.0, 0.0)], &Paint::fill(Color::WHITE));
        assert!(matches!(result, Err(RenderError::InvalidGeometry(_))));
    }

    #[test]
    fn discarded_layer_drops_its_ops() {
        let mut canvas = RecordingCanvas::new(100, 100);
        let paint = Paint::fill(Color::WHITE);
        canvas.draw_circle(Point::new(5.0, 5.0), 2.0, &paint).unwrap();

        canvas.save_layer();
        canvas.draw_circle(Point::new(50.0, 50.0), 2.0, &paint).unwrap();
        canvas.restore_layer(false);
        assert_eq!(canvas.ops().len(), 1);

        canvas.save_layer();
        canvas.draw_line(Point::new(0.0, 0.0), Point::new(10.0, 0.0), &Paint::stroke(Color::WHITE, 4.0)).unwrap();
        canvas.restore_layer(true);
        assert_eq!(canvas.ops().len(), 2);
        assert_eq!(canvas.layer_depth(), 0);
        assert_eq!(canvas.ops()[1].bounds(), Rect { left: -2.0, top: -2.0, right: 12.0, bottom: 2.0 });
    }
}
