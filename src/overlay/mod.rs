//! # 水印数据模块（overlay）
//!
//! ## 设计思路
//!
//! 把"画什么"与"怎么画"分开：本模块负责配置、配置存储和快照构建，
//! 输出的 `WatermarkSnapshot` 交给 `render` 模块绘制。
//!
//! ## 子模块
//!
//! - `config`：`OverlayConfig` 及其 JSON 持久化、Logo 解码
//! - `store`：`ConfigStore`，读写分离的配置快照
//! - `datetime`：日期模式格式化（含泰语 / 佛历）
//! - `snapshot`：`CaptureContext` → `WatermarkSnapshot`

mod config;
mod datetime;
mod snapshot;
mod store;

pub use config::{
    ConfigError, ItemKind, MAX_LOGO_BYTES, MAX_LOGO_PIXELS, OverlayConfig, StrokeConfig, TextStyle,
};
pub use datetime::{BUDDHIST_ERA_OFFSET, format_timestamp};
pub use snapshot::{
    CaptureContext, LineKind, LocationFix, OverlaySnapshotBuilder, WatermarkLine, WatermarkSnapshot,
};
pub use store::{ConfigStore, StoreError};
