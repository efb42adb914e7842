//! # 水印快照构建（OverlaySnapshotBuilder）
//!
//! ## 设计思路
//!
//! 绘制层只接收一个不可变的 `WatermarkSnapshot`。所有"活"的数据
//! （定位、逆地理编码地址、罗盘航向、拍摄时间）都先收进 `CaptureContext`，
//! 由本模块按配置里的信息项顺序一次性展开成文本行。
//!
//! 拍照时快照在快门瞬间构建；视频路径每帧构建一次。

use chrono::{DateTime, FixedOffset, Local};

use crate::address::PostalAddress;
use crate::geo::{GeoPoint, format_coordinates};
use crate::render::{Color, heading_label, normalize_heading};

use super::config::{ItemKind, OverlayConfig};
use super::datetime::format_timestamp;

/// 一次定位结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub point: GeoPoint,
    /// 海拔（米）。
    pub altitude_m: Option<f64>,
    /// 速度（米/秒）。
    pub speed_mps: Option<f64>,
}

impl LocationFix {
    pub fn new(point: GeoPoint) -> Self {
        Self {
            point,
            altitude_m: None,
            speed_mps: None,
        }
    }
}

/// 拍摄瞬间的外部数据。异步数据（地址等）必须在构建快照前就绪。
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureContext {
    pub location: Option<LocationFix>,
    pub address: Option<PostalAddress>,
    pub heading_degrees: Option<f32>,
    pub captured_at: DateTime<FixedOffset>,
}

impl CaptureContext {
    pub fn new(captured_at: DateTime<FixedOffset>) -> Self {
        Self {
            location: None,
            address: None,
            heading_degrees: None,
            captured_at,
        }
    }

    /// 以当前本地时间为拍摄时间。
    pub fn now() -> Self {
        Self::new(Local::now().fixed_offset())
    }

    #[must_use]
    pub fn with_location(mut self, fix: LocationFix) -> Self {
        self.location = Some(fix);
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: PostalAddress) -> Self {
        self.address = Some(address);
        self
    }

    #[must_use]
    pub fn with_heading(mut self, degrees: f32) -> Self {
        self.heading_degrees = Some(degrees);
        self
    }

    /// 有效定位；无效坐标会被丢弃并记录告警。
    fn valid_fix(&self) -> Option<&LocationFix> {
        let fix = self.location.as_ref()?;
        if fix.point.is_valid() {
            Some(fix)
        } else {
            log::warn!("⚠️ 丢弃无效定位: {}", fix.point);
            None
        }
    }
}

/// 文本行的语义类别，模板按类别挑选行。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    DateTime,
    Gps,
    Address,
    Compass,
    AltitudeSpeed,
    CustomText,
    Project,
    Inspector,
    Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkLine {
    pub text: String,
    pub color: Color,
    pub kind: LineKind,
}

/// 绘制层的唯一输入。
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSnapshot {
    pub lines: Vec<WatermarkLine>,
    /// 仅在启用表盘且有航向时为 `Some`，已归一化到 `[0, 360)`。
    pub compass_heading: Option<f32>,
    pub location: Option<GeoPoint>,
    pub captured_at: DateTime<FixedOffset>,
}

impl WatermarkSnapshot {
    /// 没有文本行也没有表盘。
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.compass_heading.is_none()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.lines.iter().map(|line| line.text.as_str()).collect()
    }

    pub fn lines_of(&self, kind: LineKind) -> impl Iterator<Item = &WatermarkLine> {
        self.lines.iter().filter(move |line| line.kind == kind)
    }

    /// 写入 EXIF ImageDescription / UserComment 的文本。
    pub fn exif_description(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

struct Labels {
    project: &'static str,
    inspector: &'static str,
    altitude: &'static str,
    speed: &'static str,
}

const LABELS_EN: Labels = Labels {
    project: "Project: ",
    inspector: "Inspector: ",
    altitude: "Alt",
    speed: "Speed",
};

const LABELS_TH: Labels = Labels {
    project: "โครงการ: ",
    inspector: "ผู้ตรวจสอบ: ",
    altitude: "ความสูง",
    speed: "ความเร็ว",
};

pub struct OverlaySnapshotBuilder<'a> {
    config: &'a OverlayConfig,
}

impl<'a> OverlaySnapshotBuilder<'a> {
    pub fn new(config: &'a OverlayConfig) -> Self {
        Self { config }
    }

    /// 按 `config.items` 的顺序展开文本行。
    ///
    /// # 示例
    /// ```rust
    /// use chrono::DateTime;
    /// use geostamp::geo::GeoPoint;
    /// use geostamp::overlay::{CaptureContext, LocationFix, OverlayConfig, OverlaySnapshotBuilder};
    ///
    /// let config = OverlayConfig::default();
    /// let ts = DateTime::parse_from_rfc3339("2024-12-24T10:00:00+07:00").unwrap();
    /// let ctx = CaptureContext::new(ts).with_location(LocationFix::new(GeoPoint::new(13.7563, 100.5018)));
    /// let snapshot = OverlaySnapshotBuilder::new(&config).build(&ctx);
    /// assert_eq!(snapshot.texts(), vec!["24/12/2024 10:00:00", "13.756300, 100.501800"]);
    /// ```
    pub fn build(&self, ctx: &CaptureContext) -> WatermarkSnapshot {
        let config = self.config;
        let labels = if config.use_thai_locale { &LABELS_TH } else { &LABELS_EN };
        let fix = ctx.valid_fix();
        let mut lines = Vec::with_capacity(config.items.len() + 2);

        let mut push = |kind: LineKind, text: String| {
            if !text.trim().is_empty() {
                lines.push(WatermarkLine {
                    text,
                    color: config.text_color,
                    kind,
                });
            }
        };

        for item in &config.items {
            match item {
                ItemKind::DateTime => push(
                    LineKind::DateTime,
                    format_timestamp(&ctx.captured_at, &config.date_pattern, config.use_thai_locale),
                ),
                ItemKind::Gps => {
                    if let Some(fix) = fix {
                        push(LineKind::Gps, format_coordinates(fix.point, config.gps_format));
                    }
                }
                ItemKind::Address => {
                    if let Some(address) = ctx.address.as_ref().filter(|a| !a.is_empty()) {
                        for line in address.format(config.address_resolution).lines() {
                            push(LineKind::Address, line.to_string());
                        }
                    }
                }
                ItemKind::Compass => {
                    if let Some(heading) = ctx.heading_degrees {
                        let heading = normalize_heading(heading);
                        push(
                            LineKind::Compass,
                            format!("{}° {}", heading.round() as u32 % 360, heading_label(heading)),
                        );
                    }
                }
                ItemKind::AltitudeSpeed => {
                    if let Some(fix) = fix {
                        push(LineKind::AltitudeSpeed, altitude_speed_text(config, fix, labels));
                    }
                }
                ItemKind::CustomText => push(LineKind::CustomText, config.custom_text.clone()),
                ItemKind::Project => {
                    if !config.project_name.trim().is_empty() {
                        push(LineKind::Project, format!("{}{}", labels.project, config.project_name.trim()));
                    }
                }
                ItemKind::Inspector => {
                    if !config.inspector_name.trim().is_empty() {
                        push(
                            LineKind::Inspector,
                            format!("{}{}", labels.inspector, config.inspector_name.trim()),
                        );
                    }
                }
                ItemKind::Tags => push(LineKind::Tags, tags_text(&config.tags)),
                ItemKind::LogoMarker => {}
            }
        }

        let compass_heading = if config.compass_enabled {
            ctx.heading_degrees.map(normalize_heading)
        } else {
            None
        };

        log::debug!("水印快照构建完成：{} 行，表盘 {:?}", lines.len(), compass_heading);

        WatermarkSnapshot {
            lines,
            compass_heading,
            location: fix.map(|f| f.point),
            captured_at: ctx.captured_at,
        }
    }
}

fn altitude_speed_text(config: &OverlayConfig, fix: &LocationFix, labels: &Labels) -> String {
    let mut parts = Vec::with_capacity(2);
    if config.altitude_enabled
        && let Some(altitude) = fix.altitude_m.filter(|a| a.is_finite())
    {
        parts.push(format!("{} {altitude:.1} m", labels.altitude));
    }
    if config.speed_enabled
        && let Some(speed) = fix.speed_mps.filter(|s| s.is_finite())
    {
        parts.push(format!("{} {:.1} km/h", labels.speed, speed * 3.6));
    }
    parts.join(" · ")
}

fn tags_text(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| tag.trim().trim_start_matches('#'))
        .filter(|tag| !tag.is_empty())
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<_>>()
        .join(" ")
}
