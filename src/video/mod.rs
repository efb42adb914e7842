//! # 视频帧水印（video）
//!
//! ## 设计思路
//!
//! 视频路径复用照片路径的模板代码，只在外面包一层：
//! - 传感器缓冲区为横向、输出为竖向时，先旋转坐标系，在竖向逻辑空间里绘制
//! - 每边内缩 7.5% 作为安全区，防止电子防抖裁切掉水印
//! - 每帧刷新拍摄时间
//!
//! ## 实现思路
//!
//! - `TransformGuard` 采用 RAII：构造时 `save`，`Drop` 时 `restore`，
//!   绘制出错或 panic 时画布变换同样会被恢复
//! - `LayerGuard` 把整帧水印包在一个绘制层里，只有绘制成功才提交，
//!   失败的帧上不会残留背景框或半行文字
//! - 绘制中标志用 `AtomicBool`，上一帧未结束时直接跳过本帧，不排队、不重试
//! - 帧计数用 `AtomicU64`，回调线程上没有任何锁竞争

mod adapter;
mod safe_zone;

pub use adapter::{DEFAULT_FRAME_BUDGET, FrameOutcome, FrameStats, VideoConfig, VideoSafeZoneAdapter};
pub use safe_zone::{DEFAULT_SAFE_ZONE_RATIO, LayerGuard, OutputOrientation, SafeZone, TransformGuard};
