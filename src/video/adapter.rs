//! 逐帧水印适配器。

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Local};
use image::RgbaImage;

use super::safe_zone::{DEFAULT_SAFE_ZONE_RATIO, LayerGuard, OutputOrientation, SafeZone, TransformGuard};
use crate::overlay::{CaptureContext, ConfigStore, OverlayConfig, OverlaySnapshotBuilder, WatermarkSnapshot};
use crate::render::{self, Canvas, FontBook, RasterCanvas, RenderError};

/// 60fps 下单帧的绘制预算。
pub const DEFAULT_FRAME_BUDGET: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoConfig {
    pub output_orientation: OutputOrientation,
    pub safe_zone_ratio: f32,
    pub frame_budget: Duration,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            output_orientation: OutputOrientation::Portrait,
            safe_zone_ratio: DEFAULT_SAFE_ZONE_RATIO,
            frame_budget: DEFAULT_FRAME_BUDGET,
        }
    }
}

/// 单帧处理结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    /// 上一帧仍在绘制，本帧不叠加水印。
    Skipped,
    /// 绘制失败，帧原样放行。
    Failed,
}

/// 帧计数快照。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub rendered: u64,
    pub skipped: u64,
    pub failed: u64,
    pub over_budget: u64,
}

#[derive(Debug, Default)]
struct FrameCounters {
    rendered: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    over_budget: AtomicU64,
}

/// 绘制中标志；`Drop` 时清除，panic 也不会把适配器卡在"忙"状态。
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

type ContextSource = Box<dyn Fn() -> CaptureContext + Send + Sync>;
type Clock = Box<dyn Fn() -> DateTime<FixedOffset> + Send + Sync>;

/// 视频帧回调的包装：方向旋转 + 安全区内缩 + 共享模板绘制。
///
/// 每帧开头从 `ConfigStore` 取一次配置快照，之后不再访问任何共享锁。
pub struct VideoSafeZoneAdapter {
    store: Arc<ConfigStore>,
    context: ContextSource,
    clock: Clock,
    fonts: Arc<FontBook>,
    settings: VideoConfig,
    busy: AtomicBool,
    counters: FrameCounters,
}

impl VideoSafeZoneAdapter {
    /// `context` 每帧调用一次，提供最新的定位 / 地址 / 航向。
    pub fn new<F>(store: Arc<ConfigStore>, context: F) -> Self
    where
        F: Fn() -> CaptureContext + Send + Sync + 'static,
    {
        Self {
            store,
            context: Box::new(context),
            clock: Box::new(|| Local::now().fixed_offset()),
            fonts: FontBook::shared(),
            settings: VideoConfig::default(),
            busy: AtomicBool::new(false),
            counters: FrameCounters::default(),
        }
    }

    #[must_use]
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Fn() -> DateTime<FixedOffset> + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    #[must_use]
    pub fn with_fonts(mut self, fonts: Arc<FontBook>) -> Self {
        self.fonts = fonts;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: VideoConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            rendered: self.counters.rendered.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            over_budget: self.counters.over_budget.load(Ordering::Relaxed),
        }
    }

    /// 本帧快照：拍摄时间刷新为时钟当前值。
    pub fn build_frame_snapshot(&self, config: &OverlayConfig) -> WatermarkSnapshot {
        let mut ctx = (self.context)();
        ctx.captured_at = (self.clock)();
        OverlaySnapshotBuilder::new(config).build(&ctx)
    }

    /// 直接在帧画布上绘制。
    ///
    /// 整帧水印画在一个绘制层里，失败或 panic 时整层撤销，画布保持原样。
    pub fn on_frame(&self, canvas: &mut dyn Canvas) -> FrameOutcome {
        let zone = SafeZone::compute(
            canvas.width(),
            canvas.height(),
            self.settings.output_orientation,
            self.settings.safe_zone_ratio,
        );
        self.run_frame(|snapshot, config| {
            let mut layer = LayerGuard::new(canvas);
            draw_in_zone(&mut *layer, &zone, snapshot, config)?;
            layer.commit();
            Ok(())
        })
    }

    /// 在 RGBA 帧缓冲上绘制：画在副本上，成功后写回，失败时帧保持不变。
    pub fn on_frame_buffer(&self, frame: &mut RgbaImage) -> FrameOutcome {
        let zone = SafeZone::compute(
            frame.width(),
            frame.height(),
            self.settings.output_orientation,
            self.settings.safe_zone_ratio,
        );
        self.run_frame(|snapshot, config| {
            let mut canvas = RasterCanvas::from_image(frame, Arc::clone(&self.fonts))?;
            draw_in_zone(&mut canvas, &zone, snapshot, config)?;
            *frame = canvas.into_image();
            Ok(())
        })
    }

    fn run_frame<F>(&self, draw: F) -> FrameOutcome
    where
        F: FnOnce(&WatermarkSnapshot, &OverlayConfig) -> Result<(), RenderError>,
    {
        let Some(_busy) = BusyGuard::try_acquire(&self.busy) else {
            self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            log::debug!("上一帧仍在绘制，跳过本帧");
            return FrameOutcome::Skipped;
        };

        let config = match self.store.snapshot() {
            Ok(config) => config,
            Err(err) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("⚠️ 读取水印配置失败，本帧不叠加水印：{err}");
                return FrameOutcome::Failed;
            }
        };

        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let snapshot = self.build_frame_snapshot(&config);
            draw(&snapshot, &config)
        }));
        let elapsed = started.elapsed();

        if elapsed > self.settings.frame_budget {
            self.counters.over_budget.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "⚠️ 水印帧绘制超出预算 - {}µs（预算 {}µs）",
                elapsed.as_micros(),
                self.settings.frame_budget.as_micros()
            );
        }

        match outcome {
            Ok(Ok(())) => {
                self.counters.rendered.fetch_add(1, Ordering::Relaxed);
                log::debug!("水印帧绘制完成 - {}µs", elapsed.as_micros());
                FrameOutcome::Rendered
            }
            Ok(Err(err)) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("⚠️ 水印帧绘制失败，帧原样放行：{err}");
                FrameOutcome::Failed
            }
            Err(_) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("⚠️ 水印帧绘制发生 panic，帧原样放行");
                FrameOutcome::Failed
            }
        }
    }
}

/// 在安全区内调用共享模板；变换由守卫恢复。
fn draw_in_zone(
    canvas: &mut dyn Canvas,
    zone: &SafeZone,
    snapshot: &WatermarkSnapshot,
    config: &OverlayConfig,
) -> Result<(), RenderError> {
    let mut guard = TransformGuard::new(canvas);
    zone.apply(&mut *guard);
    render::render(&mut *guard, snapshot, config, zone.viewport(), zone.scale())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::ItemKind;
    use crate::render::{Rect, RecordingCanvas, Transform};
    use chrono::TimeZone;
    use image::Rgba;
    use std::sync::atomic::AtomicI64;

    fn fixed_time(seconds: i64) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 12, 24, 10, 0, 0)
            .unwrap()
            + chrono::Duration::seconds(seconds)
    }

    fn adapter(config: OverlayConfig) -> VideoSafeZoneAdapter {
        let store = Arc::new(ConfigStore::new(config));
        VideoSafeZoneAdapter::new(store, || CaptureContext::new(fixed_time(0)))
    }

    fn date_only() -> OverlayConfig {
        OverlayConfig {
            items: vec![ItemKind::DateTime],
            ..Default::default()
        }
    }

    #[test]
    fn frame_is_drawn_inside_rotated_safe_zone() {
        let adapter = adapter(date_only());
        let mut canvas = RecordingCanvas::new(1920, 1080);
        assert_eq!(adapter.on_frame(&mut canvas), FrameOutcome::Rendered);

        let safe = Rect::from_xywh(144.0, 81.0, 1632.0, 918.0).outset(0.01, 0.01);
        assert!(!canvas.ops().is_empty());
        for op in canvas.ops() {
            assert!(safe.contains_rect(&op.bounds()), "{op:?}");
        }
        assert_eq!(canvas.save_depth(), 0);
        assert_eq!(canvas.transform(), Transform::identity());
    }

    #[test]
    fn timestamp_refreshes_every_frame() {
        let tick = Arc::new(AtomicI64::new(0));
        let clock_tick = Arc::clone(&tick);
        let adapter = adapter(date_only())
            .with_clock(move || fixed_time(clock_tick.fetch_add(1, Ordering::SeqCst)));

        let mut first = RecordingCanvas::new(1080, 1920);
        let mut second = RecordingCanvas::new(1080, 1920);
        adapter.on_frame(&mut first);
        adapter.on_frame(&mut second);
        assert!(first.texts().contains(&"24/12/2024 10:00:00"));
        assert!(second.texts().contains(&"24/12/2024 10:00:01"));
        assert_eq!(adapter.stats().rendered, 2);
    }

    #[test]
    fn busy_adapter_skips_frame() {
        let adapter = adapter(date_only());
        let _busy = BusyGuard::try_acquire(&adapter.busy).unwrap();
        let mut canvas = RecordingCanvas::new(1080, 1920);
        assert_eq!(adapter.on_frame(&mut canvas), FrameOutcome::Skipped);
        assert!(canvas.ops().is_empty());
        assert_eq!(adapter.stats().skipped, 1);
    }

    #[test]
    fn busy_flag_is_released_after_failure() {
        let adapter = adapter(date_only());
        let mut failing = RecordingCanvas::new(1080, 1920).failing_after(0);
        assert_eq!(adapter.on_frame(&mut failing), FrameOutcome::Failed);
        assert_eq!(failing.save_depth(), 0);

        let mut canvas = RecordingCanvas::new(1080, 1920);
        assert_eq!(adapter.on_frame(&mut canvas), FrameOutcome::Rendered);
        assert_eq!(
            adapter.stats(),
            FrameStats {
                rendered: 1,
                failed: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn failed_frame_leaves_no_partial_overlay() {
        // 背景框和第一行文字画完后画布开始报错
        let adapter = adapter(OverlayConfig {
            background_box_enabled: true,
            ..date_only()
        });
        let mut canvas = RecordingCanvas::new(1080, 1920).failing_after(2);
        assert_eq!(adapter.on_frame(&mut canvas), FrameOutcome::Failed);
        assert!(canvas.ops().is_empty());
        assert_eq!(canvas.layer_depth(), 0);
        assert_eq!(canvas.save_depth(), 0);
    }

    #[test]
    fn buffer_frame_is_stamped_with_bundled_font() {
        let adapter = adapter(date_only());
        let original = RgbaImage::from_pixel(540, 960, Rgba([5, 6, 7, 255]));
        let mut frame = original.clone();
        assert_eq!(adapter.on_frame_buffer(&mut frame), FrameOutcome::Rendered);
        assert_eq!(frame.dimensions(), original.dimensions());
        assert_ne!(frame, original);
        assert_eq!(adapter.stats().rendered, 1);
    }

    #[test]
    fn failed_buffer_frame_is_untouched() {
        let adapter = adapter(date_only());
        let mut frame = RgbaImage::new(0, 0);
        assert_eq!(adapter.on_frame_buffer(&mut frame), FrameOutcome::Failed);
        assert_eq!(frame.dimensions(), (0, 0));
        assert_eq!(adapter.stats().failed, 1);
    }

    #[test]
    fn over_budget_frames_are_counted() {
        let adapter = adapter(date_only()).with_settings(VideoConfig {
            frame_budget: Duration::ZERO,
            ..Default::default()
        });
        let mut canvas = RecordingCanvas::new(1080, 1920);
        assert_eq!(adapter.on_frame(&mut canvas), FrameOutcome::Rendered);
        assert_eq!(adapter.stats().over_budget, 1);
    }
}
