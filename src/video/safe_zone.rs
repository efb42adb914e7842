//! 安全区几何、变换守卫与绘制层守卫。

use std::ops::{Deref, DerefMut};

use crate::render::{Canvas, Rect, Viewport, scale_for_width};

/// 电子防抖裁切的默认安全边距（每边 7.5%）。
pub const DEFAULT_SAFE_ZONE_RATIO: f32 = 0.075;

/// 编码输出的画面方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputOrientation {
    #[default]
    Portrait,
    Landscape,
}

/// 一帧的逻辑绘制区域。
///
/// 传感器缓冲区为横向而输出为竖向时，逻辑坐标系旋转 90°：
/// `translate(buffer_width, 0)` 后 `rotate(90)`，逻辑点 `(x, y)` 落在缓冲区 `(w - y, x)`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeZone {
    pub rotated: bool,
    buffer_width: f32,
    /// 旋转后的完整逻辑画布尺寸。
    pub logical_width: f32,
    pub logical_height: f32,
    pub inset_x: f32,
    pub inset_y: f32,
    /// 扣除两侧边距后的可绘制尺寸。
    pub width: f32,
    pub height: f32,
}

impl SafeZone {
    pub fn compute(buffer_width: u32, buffer_height: u32, orientation: OutputOrientation, ratio: f32) -> Self {
        let (bw, bh) = (buffer_width as f32, buffer_height as f32);
        let rotated = buffer_width > buffer_height && orientation == OutputOrientation::Portrait;
        let (logical_width, logical_height) = if rotated { (bh, bw) } else { (bw, bh) };
        let ratio = if ratio.is_finite() { ratio.clamp(0.0, 0.45) } else { DEFAULT_SAFE_ZONE_RATIO };

        let inset_x = logical_width * ratio;
        let inset_y = logical_height * ratio;
        Self {
            rotated,
            buffer_width: bw,
            logical_width,
            logical_height,
            inset_x,
            inset_y,
            width: logical_width - inset_x * 2.0,
            height: logical_height - inset_y * 2.0,
        }
    }

    /// 安全区作为模板的逻辑画布。
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }

    pub fn scale(&self) -> f32 {
        scale_for_width(self.width)
    }

    /// 在逻辑坐标系（旋转后、未扣边距）中的安全区矩形。
    pub fn logical_rect(&self) -> Rect {
        Rect::from_xywh(self.inset_x, self.inset_y, self.width, self.height)
    }

    /// 把画布坐标系切到安全区左上角。调用方负责保存 / 恢复变换。
    pub fn apply(&self, canvas: &mut dyn Canvas) {
        if self.rotated {
            canvas.translate(self.buffer_width, 0.0);
            canvas.rotate(90.0);
        }
        canvas.translate(self.inset_x, self.inset_y);
    }
}

/// 构造时 `save`，离开作用域（含 panic 展开）时 `restore`。
pub struct TransformGuard<'a> {
    canvas: &'a mut (dyn Canvas + 'a),
}

impl<'a> TransformGuard<'a> {
    pub fn new(canvas: &'a mut (dyn Canvas + 'a)) -> Self {
        canvas.save();
        Self { canvas }
    }
}

impl<'a> Deref for TransformGuard<'a> {
    type Target = dyn Canvas + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.canvas
    }
}

impl DerefMut for TransformGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.canvas
    }
}

impl Drop for TransformGuard<'_> {
    fn drop(&mut self) {
        self.canvas.restore();
    }
}

/// 构造时 `save_layer`；只有调用过 [`LayerGuard::commit`] 的层会保留，
/// 出错提前返回或 panic 展开时整层撤销，帧上不会留下半个水印。
pub struct LayerGuard<'a> {
    canvas: &'a mut (dyn Canvas + 'a),
    committed: bool,
}

impl<'a> LayerGuard<'a> {
    pub fn new(canvas: &'a mut (dyn Canvas + 'a)) -> Self {
        canvas.save_layer();
        Self {
            canvas,
            committed: false,
        }
    }

    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl<'a> Deref for LayerGuard<'a> {
    type Target = dyn Canvas + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.canvas
    }
}

impl DerefMut for LayerGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.canvas
    }
}

impl Drop for LayerGuard<'_> {
    fn drop(&mut self) {
        self.canvas.restore_layer(self.committed);
    }
}
