//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 库内各子系统有各自的错误枚举（`RenderError`、`ConfigError`、`StoreError`），
//! 命令行入口把它们统一收敛为 `AppError`，用 `?` 直接传播，不再手写 `map_err`。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 子系统错误、`std::io::Error`、`image::ImageError`、`serde_json::Error`
//!   都提供 `From` 转换。

use crate::overlay::{ConfigError, StoreError};
use crate::render::RenderError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 水印配置无效（取值范围 / Logo / JSON）
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// 配置存储不可用
    #[error("{0}")]
    Store(#[from] StoreError),

    /// 绘制失败
    #[error("{0}")]
    Render(#[from] RenderError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 图片编解码错误
    #[error("图片编解码失败: {0}")]
    Image(#[from] image::ImageError),

    /// JSON 解析失败
    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 命令行参数无效
    #[error("参数无效: {0}")]
    InvalidArgument(String),
}
