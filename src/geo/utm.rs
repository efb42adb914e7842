//! # UTM 正反算
//!
//! ## 实现思路
//!
//! 采用 WGS84 椭球上的横轴墨卡托级数展开（展开到 6 阶项）：
//! - 正算：经纬度 → 投影带内东坐标/北坐标
//! - 反算：由底点纬度（footpoint latitude）级数还原经纬度
//!
//! 带号 = `floor((lon + 180) / 6) + 1`，不处理挪威/斯瓦尔巴特殊带。
//! 南半球北坐标加 10,000,000 m 假北。

use super::GeoPoint;

/// WGS84 长半轴（米）。
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 扁率。
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// UTM 中央经线比例因子。
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// 纬度带字母表（C..X，跳过 I 和 O），每带 8°，X 带延伸到 84°。
const LATITUDE_BANDS: [char; 20] = [
    'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V',
    'W', 'X',
];

/// 纬度超出 [-80, 84] 时的纬度带占位符。
pub const UNDEFINED_BAND: char = '?';

/// UTM 坐标（派生值，不持久化）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtmCoordinate {
    /// 投影带号，1..=60。
    pub zone: u8,
    /// 纬度带字母；未定义时为 [`UNDEFINED_BAND`]。
    pub band: char,
    pub easting: f64,
    pub northing: f64,
}

impl UtmCoordinate {
    /// 纬度带是否有定义。
    pub fn has_band(&self) -> bool {
        self.band != UNDEFINED_BAND
    }

    /// 是否位于南半球（C..M 带）。
    ///
    /// 纬度带未定义时按北半球处理。
    pub fn is_southern(&self) -> bool {
        self.has_band() && self.band < 'N'
    }
}

impl std::fmt::Display for UtmCoordinate {
    /// 输出形如 `47P 662366 1521280`，东/北坐标截断到整米。
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{} {} {}",
            self.zone,
            self.band,
            self.easting.max(0.0).floor() as u64,
            self.northing.max(0.0).floor() as u64
        )
    }
}

/// 根据经度计算 UTM 带号（1..=60）。
///
/// 经度 180° 归入第 60 带；NaN 等异常输入会被钳到合法区间。
pub fn utm_zone(longitude: f64) -> u8 {
    let zone = ((longitude + 180.0) / 6.0).floor() as i32 + 1;
    zone.clamp(1, 60) as u8
}

/// 根据纬度查找纬度带字母。
///
/// 超出 [-80, 84] 返回 [`UNDEFINED_BAND`]。
pub fn latitude_band(latitude: f64) -> char {
    if !(-80.0..=84.0).contains(&latitude) {
        return UNDEFINED_BAND;
    }
    let index = ((latitude + 80.0) / 8.0).floor() as usize;
    LATITUDE_BANDS[index.min(LATITUDE_BANDS.len() - 1)]
}

fn central_meridian_deg(zone: u8) -> f64 {
    f64::from(zone) * 6.0 - 183.0
}

struct Ellipsoid {
    e2: f64,
    ep2: f64,
}

impl Ellipsoid {
    fn wgs84() -> Self {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        Self {
            e2,
            ep2: e2 / (1.0 - e2),
        }
    }

    /// 赤道到纬度 `phi` 的子午线弧长。
    fn meridian_arc(&self, phi: f64) -> f64 {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        WGS84_A
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }
}

/// WGS84 经纬度 → UTM。
///
/// # 示例
/// ```rust
/// use geostamp::geo::{GeoPoint, to_utm};
///
/// let utm = to_utm(GeoPoint::new(40.7128, -74.0060));
/// assert_eq!(utm.to_string(), "18T 583959 4507350");
/// ```
pub fn to_utm(point: GeoPoint) -> UtmCoordinate {
    let zone = utm_zone(point.longitude);
    let band = latitude_band(point.latitude);
    let ellipsoid = Ellipsoid::wgs84();

    let phi = point.latitude.to_radians();
    let lambda = point.longitude.to_radians();
    let lambda0 = central_meridian_deg(zone).to_radians();

    let sin_phi = phi.sin();
    let cos_phi = phi.cos();
    let tan_phi = phi.tan();

    let n = WGS84_A / (1.0 - ellipsoid.e2 * sin_phi * sin_phi).sqrt();
    let t = tan_phi * tan_phi;
    let c = ellipsoid.ep2 * cos_phi * cos_phi;
    let a = (lambda - lambda0) * cos_phi;
    let m = ellipsoid.meridian_arc(phi);

    let a2 = a * a;
    let a3 = a2 * a;
    let a4 = a3 * a;
    let a5 = a4 * a;
    let a6 = a5 * a;

    let easting = K0
        * n
        * (a + (1.0 - t + c) * a3 / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ellipsoid.ep2) * a5 / 120.0)
        + FALSE_EASTING;

    let mut northing = K0
        * (m + n
            * tan_phi
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ellipsoid.ep2) * a6 / 720.0));

    if point.latitude < 0.0 {
        northing += FALSE_NORTHING_SOUTH;
    }

    UtmCoordinate {
        zone,
        band,
        easting,
        northing,
    }
}

/// UTM → WGS84 经纬度（反算）。
///
/// 半球由纬度带判断（见 [`UtmCoordinate::is_southern`]）。
pub fn from_utm(utm: &UtmCoordinate) -> GeoPoint {
    let ellipsoid = Ellipsoid::wgs84();
    let e2 = ellipsoid.e2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let ep2 = ellipsoid.ep2;

    let x = utm.easting - FALSE_EASTING;
    let y = if utm.is_southern() {
        utm.northing - FALSE_NORTHING_SOUTH
    } else {
        utm.northing
    };

    let m = y / K0;
    let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();
    let denom = 1.0 - e2 * sin_phi1 * sin_phi1;

    let n1 = WGS84_A / denom.sqrt();
    let t1 = tan_phi1 * tan_phi1;
    let c1 = ep2 * cos_phi1 * cos_phi1;
    let r1 = WGS84_A * (1.0 - e2) / denom.powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    let latitude = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0 - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let longitude = (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5 / 120.0)
        / cos_phi1;

    GeoPoint::new(
        latitude.to_degrees(),
        central_meridian_deg(utm.zone) + longitude.to_degrees(),
    )
}
