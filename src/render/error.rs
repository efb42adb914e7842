//! # 绘制错误模型
//!
//! 绘制链路中的所有失败都归入 `RenderError`。上层（照片路径 / 视频帧路径）
//! 收到错误后统一降级为"不绘制水印，原图原样返回"，不会阻断拍摄保存。

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("字体错误：{0}")]
    Font(String),

    #[error("Logo 处理错误：{0}")]
    Logo(String),

    #[error("绘制表面错误：{0}")]
    Surface(String),

    #[error("几何参数异常：{0}")]
    InvalidGeometry(String),
}
