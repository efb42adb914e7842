//! # 坐标转换模块（geo）
//!
//! ## 设计思路
//!
//! 水印上的坐标显示依赖 WGS84 → UTM → MGRS 的转换链：
//! - `utm`：横轴墨卡托级数展开（正算 + 反算）
//! - `mgrs`：在 UTM 基础上推导 100 km 方格字母
//! - `format`：按 `GpsFormat` 输出十进制 / 度分秒 / UTM / MGRS 文本
//!
//! ## 实现思路
//!
//! 所有函数均为纯函数，对任意数值输入都不会 panic。
//! 纬度带超出 [-80, 84] 时以 `'?'` 表示"未定义"，这是正常输出而不是错误；
//! MGRS 在极区直接回退为 UTM 文本，不实现 UPS。

mod format;
mod mgrs;
mod utm;

pub use format::{format_coordinates, format_decimal, format_dms};
pub use mgrs::{MgrsOutput, MgrsReference, to_mgrs};
pub use utm::{UNDEFINED_BAND, UtmCoordinate, from_utm, latitude_band, to_utm, utm_zone};

use serde::{Deserialize, Serialize};

/// WGS84 经纬度点。
///
/// 约定：`latitude ∈ [-90, 90]`，`longitude ∈ [-180, 180]`。
/// 每次定位更新生成一个新值，创建后不再修改。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// 是否满足经纬度取值范围（同时排除 NaN / 无穷）。
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// 坐标显示格式，对应设置页中的"GPS 格式"。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpsFormat {
    #[default]
    Decimal,
    Dms,
    Utm,
    Mgrs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_checks_ranges_and_nan() {
        assert!(GeoPoint::new(13.7563, 100.5018).is_valid());
        assert!(GeoPoint::new(-90.0, 180.0).is_valid());
        assert!(!GeoPoint::new(90.1, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -180.5).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn gps_format_serializes_as_snake_case() {
        let json = serde_json::to_string(&GpsFormat::Mgrs).unwrap();
        assert_eq!(json, "\"mgrs\"");
        let parsed: GpsFormat = serde_json::from_str("\"dms\"").unwrap();
        assert_eq!(parsed, GpsFormat::Dms);
    }
}
