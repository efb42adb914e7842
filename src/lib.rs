//! # geostamp — 库入口
//!
//! GPS 相机水印合成引擎：把定位、地址、罗盘航向、时间等数据
//! 绘制成照片 / 视频帧上的水印，并提供 WGS84 → UTM → MGRS 坐标转换。
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            外部协作者（相机管线 / 设置页 / 定位）         │
//! └───────┬──────────────────────┬───────────────────────────┘
//!         │ CaptureContext       │ OverlayConfig 更新
//!         ↓                      ↓
//! ┌──────────────────────────────────────────────────────────┐
//! │  overlay                                                 │
//! │   ├─ store ───── ConfigStore (RwLock<Arc<..>> 快照)       │
//! │   ├─ snapshot ── CaptureContext → WatermarkSnapshot      │
//! │   │    ├─ geo      坐标文本 (十进制 / DMS / UTM / MGRS)   │
//! │   │    ├─ address  地址裁剪 + 软换行                      │
//! │   │    └─ datetime 日期模式 (泰语 / 佛历)                 │
//! │   └─ config ──── JSON 持久化 + Logo 解码                  │
//! │                                                          │
//! │  render                                                  │
//! │   ├─ layout ──── 九宫格锚点布局                           │
//! │   ├─ classic / modern / minimal 模板                     │
//! │   ├─ compass ─── 罗盘表盘                                 │
//! │   ├─ logo ────── 右上角 Logo (fast_image_resize)          │
//! │   └─ raster / recording  Canvas 实现                     │
//! │                                                          │
//! │  video ───────── 方向旋转 + 安全区 + 逐帧调度             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，命令行入口的返回类型 |
//! | [`geo`] | WGS84 → UTM → MGRS 转换与坐标文本格式化 |
//! | [`address`] | 结构化地址按精度裁剪、软换行 |
//! | [`overlay`] | 水印配置、配置存储、日期格式、快照构建 |
//! | [`render`] | Canvas 抽象、布局、三套模板、罗盘、Logo、照片路径 |
//! | [`video`] | 视频帧安全区适配、帧预算与跳帧 |

pub mod address;
pub mod error;
pub mod geo;
pub mod overlay;
pub mod render;
pub mod video;

pub use error::AppError;
