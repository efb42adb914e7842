//! # 光栅画布（RasterCanvas）
//!
//! ## 实现思路
//!
//! - 像素缓冲是 `tiny_skia::Pixmap`（预乘 alpha），进出时与 `RgbaImage` 互转
//! - 矩形 / 圆角矩形 / 圆 / 多边形 / 线段都先构造 `tiny_skia::Path`，
//!   再按画笔样式 `fill_path` 或 `stroke_path`，当前变换直接交给 tiny-skia
//! - 渐变使用 `tiny_skia::LinearGradient` 着色器，端点在绘制坐标系中
//! - 文本由 [`FontBook`] 整形成轮廓路径，与其它图形走同一条绘制路径；伪粗体 = 填充后再描一圈细边
//! - 阴影：把路径画进一块仅覆盖其包围盒的小 `Pixmap`，取 alpha 经 `imageproc` 高斯模糊，
//!   着色后贴回主画布
//! - `save_layer` 备份整块像素，`restore_layer(false)` 用备份覆盖回去

use std::sync::Arc;

use image::{ImageBuffer, Luma, RgbaImage};
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, GradientStop, IntSize, LineJoin, Path, PathBuilder, Pixmap,
    PixmapPaint, SpreadMode, Stroke, Transform,
};

use super::canvas::{
    Canvas, Color, FontSpec, Paint, PaintStyle, Point, Rect, Shadow, TextMeasurer, TextMetrics,
    line_width,
};
use super::error::RenderError;
use super::fonts::{FontBook, faux_bold_width};

/// 三次贝塞尔逼近四分之一圆弧的控制点系数。
const BEZIER_K: f32 = 0.552_284_8;

// ============================================================================
// 类型转换
// ============================================================================

fn skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

fn skia_paint(paint: &Paint) -> tiny_skia::Paint<'static> {
    let mut out = tiny_skia::Paint {
        anti_alias: true,
        ..Default::default()
    };
    out.set_color(skia_color(paint.color));
    if let Some(gradient) = paint.gradient {
        let shader = tiny_skia::LinearGradient::new(
            tiny_skia::Point::from_xy(gradient.start.x, gradient.start.y),
            tiny_skia::Point::from_xy(gradient.end.x, gradient.end.y),
            vec![
                GradientStop::new(0.0, skia_color(gradient.from)),
                GradientStop::new(1.0, skia_color(gradient.to)),
            ],
            SpreadMode::Pad,
            Transform::identity(),
        );
        // 端点重合时 tiny-skia 不生成着色器，退化为纯色
        if let Some(shader) = shader {
            out.shader = shader;
        }
    }
    out
}

fn stroke(width: f32) -> Stroke {
    Stroke {
        width,
        line_join: LineJoin::Round,
        ..Stroke::default()
    }
}

fn pixmap_from_image(image: &RgbaImage) -> Result<Pixmap, RenderError> {
    let size = IntSize::from_wh(image.width(), image.height()).ok_or_else(|| {
        RenderError::Surface(format!("画布尺寸无效: {}x{}", image.width(), image.height()))
    })?;
    let data = image
        .pixels()
        .flat_map(|p| {
            let c = ColorU8::from_rgba(p[0], p[1], p[2], p[3]).premultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    Pixmap::from_vec(data, size).ok_or_else(|| RenderError::Surface("像素缓冲创建失败".to_string()))
}

/// `None` 表示矩形为空，无需绘制。
fn round_rect_path(rect: Rect, radius: f32) -> Result<Option<Path>, RenderError> {
    let finite = [rect.left, rect.top, rect.right, rect.bottom, radius]
        .iter()
        .all(|v| v.is_finite());
    if !finite {
        return Err(RenderError::InvalidGeometry(format!("矩形参数无效: {rect:?} r={radius}")));
    }
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return Ok(None);
    }
    let Some(bounds) = tiny_skia::Rect::from_ltrb(rect.left, rect.top, rect.right, rect.bottom)
    else {
        return Ok(None);
    };
    let r = radius.clamp(0.0, rect.width().min(rect.height()) / 2.0);
    if r <= 0.0 {
        return Ok(Some(PathBuilder::from_rect(bounds)));
    }

    let (l, t, rt, b) = (rect.left, rect.top, rect.right, rect.bottom);
    let k = r * BEZIER_K;
    let mut pb = PathBuilder::new();
    pb.move_to(l + r, t);
    pb.line_to(rt - r, t);
    pb.cubic_to(rt - r + k, t, rt, t + r - k, rt, t + r);
    pb.line_to(rt, b - r);
    pb.cubic_to(rt, b - r + k, rt - r + k, b, rt - r, b);
    pb.line_to(l + r, b);
    pb.cubic_to(l + r - k, b, l, b - r + k, l, b - r);
    pb.line_to(l, t + r);
    pb.cubic_to(l, t + r - k, l + r - k, t, l + r, t);
    pb.close();
    Ok(pb.finish())
}

/// 画笔样式拆成（是否填充，描边宽度）。
fn shape_style(paint: &Paint) -> (bool, Option<f32>) {
    match paint.style {
        PaintStyle::Fill => (true, None),
        PaintStyle::Stroke { width } => (false, Some(width)),
    }
}

fn paint_path(
    pixmap: &mut Pixmap,
    path: &Path,
    paint: &tiny_skia::Paint,
    fill: bool,
    stroke_width: Option<f32>,
    transform: Transform,
) {
    if fill {
        pixmap.fill_path(path, paint, FillRule::Winding, transform, None);
    }
    if let Some(width) = stroke_width {
        pixmap.stroke_path(path, paint, &stroke(width), transform, None);
    }
}

// ============================================================================
// RasterCanvas
// ============================================================================

pub struct RasterCanvas {
    pixmap: Pixmap,
    fonts: Arc<FontBook>,
    transform: Transform,
    saved: Vec<Transform>,
    /// 每个未结束绘制层开始时的像素备份。
    layers: Vec<Pixmap>,
}

impl RasterCanvas {
    /// 复制 `image` 作为底图；宽或高为 0 时返回 `RenderError::Surface`。
    pub fn from_image(image: &RgbaImage, fonts: Arc<FontBook>) -> Result<Self, RenderError> {
        Ok(Self {
            pixmap: pixmap_from_image(image)?,
            fonts,
            transform: Transform::identity(),
            saved: Vec::new(),
            layers: Vec::new(),
        })
    }

    /// 去预乘后输出为 `RgbaImage`。
    pub fn into_image(self) -> RgbaImage {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let data = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        // 尺寸来自同一块 pixmap，长度必然一致
        RgbaImage::from_raw(width, height, data).unwrap_or_else(|| RgbaImage::new(width, height))
    }

    fn draw_path(
        &mut self,
        path: &Path,
        paint: &Paint,
        fill: bool,
        stroke_width: Option<f32>,
    ) -> Result<(), RenderError> {
        if let Some(shadow) = paint.shadow {
            self.draw_shadow(path, shadow, paint.color.a, fill, stroke_width)?;
        }
        let skia = skia_paint(paint);
        paint_path(&mut self.pixmap, path, &skia, fill, stroke_width, self.transform);
        Ok(())
    }

    fn draw_shadow(
        &mut self,
        path: &Path,
        shadow: Shadow,
        alpha: u8,
        fill: bool,
        stroke_width: Option<f32>,
    ) -> Result<(), RenderError> {
        let sigma = (shadow.radius / 2.0).max(0.5);
        let transform = self.transform.pre_translate(shadow.dx, shadow.dy);
        let Some(device) = path.clone().transform(transform) else {
            return Err(RenderError::InvalidGeometry("阴影路径变换失败".to_string()));
        };

        let pad = (sigma * 3.0).ceil() + stroke_width.unwrap_or(0.0) + 1.0;
        let bounds = device.bounds();
        let left = (bounds.left() - pad).floor();
        let top = (bounds.top() - pad).floor();
        let width = ((bounds.right() + pad).ceil() - left) as u32;
        let height = ((bounds.bottom() + pad).ceil() - top) as u32;
        let Some(mut layer) = Pixmap::new(width, height) else {
            return Ok(());
        };

        let mut mask_paint = tiny_skia::Paint {
            anti_alias: true,
            ..Default::default()
        };
        mask_paint.set_color(skia_color(Color::BLACK));
        paint_path(
            &mut layer,
            &device,
            &mask_paint,
            fill,
            stroke_width,
            Transform::from_translate(-left, -top),
        );

        let coverage: Vec<f32> = layer.pixels().iter().map(|p| f32::from(p.alpha())).collect();
        let buffer = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(width, height, coverage)
            .ok_or_else(|| RenderError::Surface("阴影缓冲创建失败".to_string()))?;
        let blurred = imageproc::filter::gaussian_blur_f32(&buffer, sigma);

        let color = shadow.color.modulate(alpha);
        for (pixel, value) in layer.pixels_mut().iter_mut().zip(blurred.pixels()) {
            let a = (f32::from(color.a) * (value[0] / 255.0).clamp(0.0, 1.0)).round() as u8;
            *pixel = ColorU8::from_rgba(color.r, color.g, color.b, a).premultiply();
        }
        self.pixmap.draw_pixmap(
            left as i32,
            top as i32,
            layer.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        Ok(())
    }
}

impl TextMeasurer for RasterCanvas {
    fn measure_text(&self, text: &str, spec: &FontSpec) -> TextMetrics {
        self.fonts.measure(text, spec)
    }
}

impl Canvas for RasterCanvas {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
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
        self.layers.push(self.pixmap.clone());
    }

    fn restore_layer(&mut self, commit: bool) {
        match self.layers.pop() {
            Some(backup) if !commit => self.pixmap = backup,
            _ => {}
        }
    }

    fn draw_circle(&mut self, center: Point, radius: f32, paint: &Paint) -> Result<(), RenderError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(RenderError::InvalidGeometry(format!("圆半径无效: {radius}")));
        }
        let path = PathBuilder::from_circle(center.x, center.y, radius)
            .ok_or_else(|| RenderError::InvalidGeometry(format!("圆心无效: {center:?}")))?;
        let (fill, stroke_width) = shape_style(paint);
        self.draw_path(&path, paint, fill, stroke_width)
    }

    fn draw_polygon(&mut self, points: &[Point], paint: &Paint) -> Result<(), RenderError> {
        let [first, rest @ ..] = points else {
            return Err(RenderError::InvalidGeometry("多边形没有顶点".to_string()));
        };
        if rest.len() < 2 {
            return Err(RenderError::InvalidGeometry(format!(
                "多边形至少需要 3 个顶点，实际 {}",
                points.len()
            )));
        }
        let mut pb = PathBuilder::new();
        pb.move_to(first.x, first.y);
        for p in rest {
            pb.line_to(p.x, p.y);
        }
        pb.close();
        let path = pb
            .finish()
            .ok_or_else(|| RenderError::InvalidGeometry("多边形顶点无效".to_string()))?;
        let (fill, stroke_width) = shape_style(paint);
        self.draw_path(&path, paint, fill, stroke_width)
    }

    fn draw_round_rect(&mut self, rect: Rect, radius: f32, paint: &Paint) -> Result<(), RenderError> {
        let Some(path) = round_rect_path(rect, radius)? else {
            return Ok(());
        };
        let (fill, stroke_width) = shape_style(paint);
        self.draw_path(&path, paint, fill, stroke_width)
    }

    fn draw_line(&mut self, from: Point, to: Point, paint: &Paint) -> Result<(), RenderError> {
        let mut pb = PathBuilder::new();
        pb.move_to(from.x, from.y);
        pb.line_to(to.x, to.y);
        let Some(path) = pb.finish() else {
            return Ok(());
        };
        self.draw_path(&path, paint, false, Some(line_width(paint)))
    }

    fn draw_text(
        &mut self,
        text: &str,
        origin: Point,
        spec: &FontSpec,
        paint: &Paint,
    ) -> Result<(), RenderError> {
        let Some(outline) = self.fonts.outline(text, origin, spec)? else {
            // 纯空白文本没有可见字形
            return Ok(());
        };
        let emboldening = outline.faux_bold.then(|| faux_bold_width(spec.size_px));
        let (fill, stroke_width) = match paint.style {
            PaintStyle::Fill => (true, emboldening),
            PaintStyle::Stroke { width } => (false, Some(width + emboldening.unwrap_or(0.0))),
        };
        self.draw_path(&outline.path, paint, fill, stroke_width)
    }

    fn draw_image(&mut self, image: &RgbaImage, top_left: Point) -> Result<(), RenderError> {
        let source = pixmap_from_image(image)?;
        let rotated = self.transform.kx != 0.0 || self.transform.ky != 0.0;
        let paint = PixmapPaint {
            quality: if rotated { FilterQuality::Bilinear } else { FilterQuality::Nearest },
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &paint,
            self.transform.pre_translate(top_left.x, top_left.y),
            None,
        );
        Ok(())
    }
}
