//! # Logo 绘制
//!
//! ## 实现思路
//!
//! - Logo 固定画在右上角，宽度为画布宽度的 15%，按原图宽高比缩放
//! - 缩放使用 `fast_image_resize`（卷积 + Lanczos3），失败时回退 `image::imageops::resize`
//! - 缩放结果按 `(源图, 目标尺寸)` 缓存；缓存锁用 `try_lock`，
//!   被占用时直接就地缩放，绘制线程不会等待锁

use std::sync::{Arc, Mutex};

use fast_image_resize as fr;
use image::{ImageBuffer, Rgba, RgbaImage};
use once_cell::sync::Lazy;

use super::canvas::{Canvas, Point, Rect};
use super::error::RenderError;
use super::layout::Viewport;

/// Logo 宽度占画布宽度的比例。
pub const LOGO_WIDTH_RATIO: f32 = 0.15;

struct CachedLogo {
    /// 持有源图引用，保证指针比较期间地址不会被复用。
    source: Arc<RgbaImage>,
    width: u32,
    height: u32,
    scaled: Arc<RgbaImage>,
}

static LOGO_CACHE: Lazy<Mutex<Option<CachedLogo>>> = Lazy::new(|| Mutex::new(None));

/// 按视口宽度计算 Logo 目标尺寸。
pub fn target_size(logo: &RgbaImage, viewport_width: f32) -> Option<(u32, u32)> {
    let (width, height) = logo.dimensions();
    if width == 0 || height == 0 || !viewport_width.is_finite() || viewport_width <= 0.0 {
        return None;
    }
    let target_width = (viewport_width * LOGO_WIDTH_RATIO).round().max(1.0);
    let target_height = (target_width * height as f32 / width as f32).round().max(1.0);
    Some((target_width as u32, target_height as u32))
}

/// 使用 `fast_image_resize` 缩放，失败时回退到 `image` 自带实现。
pub fn resize_logo(logo: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if logo.dimensions() == (width, height) {
        return logo.clone();
    }
    match resize_with_fast_image_resize(logo, width, height) {
        Ok(resized) => resized,
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 缩放 Logo 失败，回退 image::resize：{err}");
            image::imageops::resize(logo, width, height, image::imageops::FilterType::Triangle)
        }
    }
}

fn resize_with_fast_image_resize(logo: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, RenderError> {
    let src = fr::images::Image::from_vec_u8(
        logo.width(),
        logo.height(),
        logo.as_raw().clone(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| RenderError::Logo(format!("构建源图像缓冲失败：{e}")))?;

    let mut dst = fr::images::Image::new(width, height, fr::PixelType::U8x4);
    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3));
    resizer
        .resize(&src, &mut dst, Some(&options))
        .map_err(|e| RenderError::Logo(format!("fast_image_resize 执行失败：{e}")))?;

    ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(width, height, dst.into_vec())
        .ok_or_else(|| RenderError::Logo("fast_image_resize 输出缓冲长度异常".to_string()))
}

/// 取缓存中的缩放结果，未命中时缩放并写回缓存。
pub fn scaled_logo(logo: &Arc<RgbaImage>, width: u32, height: u32) -> Arc<RgbaImage> {
    let Ok(mut cache) = LOGO_CACHE.try_lock() else {
        log::debug!("Logo 缓存被占用，直接缩放");
        return Arc::new(resize_logo(logo, width, height));
    };

    if let Some(cached) = cache.as_ref()
        && Arc::ptr_eq(&cached.source, logo)
        && cached.width == width
        && cached.height == height
    {
        return Arc::clone(&cached.scaled);
    }

    let scaled = Arc::new(resize_logo(logo, width, height));
    *cache = Some(CachedLogo {
        source: Arc::clone(logo),
        width,
        height,
        scaled: Arc::clone(&scaled),
    });
    scaled
}

/// 在视口右上角绘制 Logo，返回绘制区域。
pub fn draw(
    canvas: &mut dyn Canvas,
    logo: &Arc<RgbaImage>,
    viewport: Viewport,
    margin: f32,
) -> Result<Rect, RenderError> {
    let (width, height) = target_size(logo, viewport.width)
        .ok_or_else(|| RenderError::Logo(format!("Logo 尺寸无效：{:?}", logo.dimensions())))?;
    let scaled = scaled_logo(logo, width, height);
    let top_left = Point::new((viewport.width - width as f32 - margin).max(0.0), margin);
    canvas.draw_image(&scaled, top_left)?;
    Ok(Rect::from_xywh(top_left.x, top_left.y, width as f32, height as f32))
}
