//! # 绘制表面抽象
//!
//! ## 设计思路
//!
//! 模板只依赖 `Canvas` trait，不依赖具体像素缓冲：
//! - 照片 / 视频缓冲路径使用 `RasterCanvas`（`tiny_skia::Pixmap` + `cosmic-text` 排版）
//! - 测试使用 `RecordingCanvas`（只记录设备坐标下的绘制指令）
//! - 平台层可以把相机预览表面包装成自己的实现
//!
//! 文本绘制的 `origin` 是"基线左端点"，与 Android `Canvas.drawText` 一致。
//! 变换矩阵直接使用 `tiny_skia::Transform`，`translate` / `rotate` 对应其 `pre_*` 方法。

use image::RgbaImage;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tiny_skia::Transform;

use super::error::RenderError;

// ============================================================================
// 颜色
// ============================================================================

/// 非预乘 RGBA 颜色，序列化为 `#AARRGGBB`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const RED: Color = Color::rgba(0xE5, 0x39, 0x35, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// 由 `0xAARRGGBB` 构造。
    pub const fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    pub const fn to_argb(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// 按不透明度（0..=255）缩放 alpha。
    #[must_use]
    pub fn modulate(self, opacity: u8) -> Self {
        let a = (u16::from(self.a) * u16::from(opacity) + 127) / 255;
        self.with_alpha(a as u8)
    }


    /// 解析 `#RRGGBB` 或 `#AARRGGBB`。
    pub fn parse_hex(text: &str) -> Option<Self> {
        let hex = text.trim().strip_prefix('#')?;
        let value = u32::from_str_radix(hex, 16).ok()?;
        match hex.len() {
            6 => Some(Self::from_argb(0xFF00_0000 | value)),
            8 => Some(Self::from_argb(value)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:08X}", self.to_argb())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Color::parse_hex(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("无效的颜色值: {text}")))
    }
}

// ============================================================================
// 几何
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 轴对齐矩形，`left <= right`、`top <= bottom`。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            left: x,
            top: y,
            right: x + width,
            bottom: y + height,
        }
    }

    /// 包含所有点的最小矩形。
    pub fn bounding(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let init = Self {
            left: first.x,
            top: first.y,
            right: first.x,
            bottom: first.y,
        };
        Some(points.iter().skip(1).fold(init, |acc, p| Self {
            left: acc.left.min(p.x),
            top: acc.top.min(p.y),
            right: acc.right.max(p.x),
            bottom: acc.bottom.max(p.y),
        }))
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point::new((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }

    /// 四周外扩 `dx` / `dy`（负值为内缩）。
    #[must_use]
    pub fn outset(&self, dx: f32, dy: f32) -> Self {
        Self {
            left: self.left - dx,
            top: self.top - dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }

    /// 与另一矩形求交；不相交时退化为宽高为 0 的矩形。
    #[must_use]
    pub fn intersect(&self, other: &Rect) -> Self {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        Self {
            left,
            top,
            right: self.right.min(other.right).max(left),
            bottom: self.bottom.min(other.bottom).max(top),
        }
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left, self.top),
            Point::new(self.right, self.top),
            Point::new(self.right, self.bottom),
            Point::new(self.left, self.bottom),
        ]
    }
}

// ============================================================================
// 字体与画笔
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size_px: f32,
    pub bold: bool,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size_px: f32) -> Self {
        Self {
            family: family.into(),
            size_px,
            bold: false,
        }
    }

    #[must_use]
    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            size_px: self.size_px * factor,
            ..self.clone()
        }
    }
}

/// 单行文本的度量结果（像素）。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextMetrics {
    pub width: f32,
    /// 基线以上高度（正值）。
    pub ascent: f32,
    /// 基线以下高度（正值）。
    pub descent: f32,
}

impl TextMetrics {
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaintStyle {
    Fill,
    Stroke { width: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub radius: f32,
    pub dx: f32,
    pub dy: f32,
    pub color: Color,
}

/// 线性渐变，端点使用绘制坐标（变换前）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    pub from: Color,
    pub to: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    pub color: Color,
    pub style: PaintStyle,
    pub shadow: Option<Shadow>,
    pub gradient: Option<LinearGradient>,
}

impl Paint {
    pub fn fill(color: Color) -> Self {
        Self {
            color,
            style: PaintStyle::Fill,
            shadow: None,
            gradient: None,
        }
    }

    pub fn stroke(color: Color, width: f32) -> Self {
        Self {
            style: PaintStyle::Stroke { width },
            ..Self::fill(color)
        }
    }

    #[must_use]
    pub fn with_shadow(mut self, shadow: Option<Shadow>) -> Self {
        self.shadow = shadow;
        self
    }

    #[must_use]
    pub fn with_gradient(mut self, gradient: LinearGradient) -> Self {
        self.gradient = Some(gradient);
        self
    }

    /// 线宽；填充样式返回 `None`。
    pub fn stroke_width(&self) -> Option<f32> {
        match self.style {
            PaintStyle::Fill => None,
            PaintStyle::Stroke { width } => Some(width),
        }
    }
}

// ============================================================================
// Canvas trait
// ============================================================================

pub trait TextMeasurer {
    fn measure_text(&self, text: &str, font: &FontSpec) -> TextMetrics;
}

/// 模板使用的绘制表面。
pub trait Canvas: TextMeasurer {
    /// 物理宽度（像素）。
    fn width(&self) -> u32;
    /// 物理高度（像素）。
    fn height(&self) -> u32;

    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, dx: f32, dy: f32);
    /// 顺时针旋转（y 轴向下）。
    fn rotate(&mut self, degrees: f32);

    /// 开启一个可撤销的绘制层，可嵌套。
    fn save_layer(&mut self);
    /// 结束最近一次 `save_layer`；`commit == false` 时撤销该层内的全部绘制。
    fn restore_layer(&mut self, commit: bool);

    fn draw_circle(&mut self, center: Point, radius: f32, paint: &Paint) -> Result<(), RenderError>;

    fn draw_polygon(&mut self, points: &[Point], paint: &Paint) -> Result<(), RenderError>;

    /// 圆角矩形；半径会被限制在短边的一半以内。
    fn draw_round_rect(&mut self, rect: Rect, radius: f32, paint: &Paint) -> Result<(), RenderError>;

    /// 线段；线宽取 `paint` 的描边宽度，填充样式按 1px 处理。
    fn draw_line(&mut self, from: Point, to: Point, paint: &Paint) -> Result<(), RenderError>;

    fn draw_text(
        &mut self,
        text: &str,
        origin: Point,
        font: &FontSpec,
        paint: &Paint,
    ) -> Result<(), RenderError>;

    fn draw_image(&mut self, image: &RgbaImage, top_left: Point) -> Result<(), RenderError>;

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) -> Result<(), RenderError> {
        self.draw_round_rect(rect, 0.0, paint)
    }
}

/// 用变换矩阵映射单个点。
pub fn map_point(transform: &Transform, point: Point) -> Point {
    let mut mapped = [tiny_skia::Point::from_xy(point.x, point.y)];
    transform.map_points(&mut mapped);
    Point::new(mapped[0].x, mapped[0].y)
}

/// 当前矩阵对应的旋转角（度）。
pub fn rotation_degrees(transform: &Transform) -> f32 {
    transform.ky.atan2(transform.sx).to_degrees()
}

/// 线段的描边宽度；填充样式按 1px 处理。
pub fn line_width(paint: &Paint) -> f32 {
    paint.stroke_width().unwrap_or(1.0).max(1.0)
}
