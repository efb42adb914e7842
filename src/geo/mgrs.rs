//! # MGRS 方格推导
//!
//! ## 实现思路
//!
//! 在 UTM 结果上推导两位 100 km 方格字母：
//! - 列字母：`floor(easting / 100000) - 1` 对 8 字母列表取模，
//!   列表由 `(zone - 1) % 6` 选择（每 3 个带循环一次）；
//! - 行字母：`floor(northing / 100000)` 对 20 字母行表取模，偶数带偏移 5。
//!
//! 这是简化的取模近似，方格字母只在约 ±2000 km 范围内唯一，
//! 调用方不能假定其全球唯一。极区（纬度带未定义）回退为 UTM 文本。

use super::{GeoPoint, UtmCoordinate, to_utm};

const COLUMN_SETS: [[char; 8]; 3] = [
    ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'],
    ['J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R'],
    ['S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z'],
];

const ROW_LETTERS: [char; 20] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T',
    'U', 'V',
];

const SQUARE_SIZE_M: f64 = 100_000.0;

/// MGRS 坐标。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MgrsReference {
    pub zone: u8,
    pub band: char,
    pub square_id: [char; 2],
    /// 方格内东坐标（米，0..100000）。
    pub easting5: u32,
    /// 方格内北坐标（米，0..100000）。
    pub northing5: u32,
}

impl std::fmt::Display for MgrsReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{} {}{} {:05} {:05}",
            self.zone, self.band, self.square_id[0], self.square_id[1], self.easting5, self.northing5
        )
    }
}

/// `to_mgrs` 的结果：正常方格坐标，或极区回退的 UTM 坐标。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MgrsOutput {
    Grid(MgrsReference),
    UtmFallback(UtmCoordinate),
}

impl MgrsOutput {
    pub fn grid(&self) -> Option<&MgrsReference> {
        match self {
            Self::Grid(reference) => Some(reference),
            Self::UtmFallback(_) => None,
        }
    }
}

impl std::fmt::Display for MgrsOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grid(reference) => reference.fmt(f),
            Self::UtmFallback(utm) => utm.fmt(f),
        }
    }
}

/// WGS84 经纬度 → MGRS。
///
/// # 示例
/// ```rust
/// use geostamp::geo::{GeoPoint, to_mgrs};
///
/// let mgrs = to_mgrs(GeoPoint::new(40.7128, -74.0060));
/// assert_eq!(mgrs.to_string(), "18T WL 83959 07350");
/// ```
pub fn to_mgrs(point: GeoPoint) -> MgrsOutput {
    let utm = to_utm(point);
    if !utm.has_band() || point.latitude.abs() > 84.0 {
        log::debug!("MGRS 在纬度 {:.4} 处未定义，回退为 UTM", point.latitude);
        return MgrsOutput::UtmFallback(utm);
    }

    let easting = utm.easting.max(0.0);
    let northing = utm.northing.max(0.0);

    let set = usize::from(utm.zone - 1) % 6;
    let columns = &COLUMN_SETS[set % 3];
    let column_index = ((easting / SQUARE_SIZE_M).floor() as i64 - 1).rem_euclid(8) as usize;

    let mut row_index = ((northing / SQUARE_SIZE_M).floor() as i64).rem_euclid(20) as usize;
    if utm.zone % 2 == 0 {
        row_index = (row_index + 5) % 20;
    }

    MgrsOutput::Grid(MgrsReference {
        zone: utm.zone,
        band: utm.band,
        square_id: [columns[column_index], ROW_LETTERS[row_index]],
        easting5: (easting.floor() as u64 % 100_000) as u32,
        northing5: (northing.floor() as u64 % 100_000) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_grid_references() {
        let cases = [
            (13.7563, 100.5018, "47P PR 62366 21280"),
            (40.7128, -74.0060, "18T WL 83959 07350"),
            (51.4778, -0.0014, "30U YC 08220 07224"),
            (-33.8688, 151.2093, "56H LH 34368 50948"),
            (45.0, 11.9, "32T QQ 28564 87042"),
            (18.7883, 98.9853, "47Q MA 98450 77403"),
        ];
        for (lat, lon, expected) in cases {
            assert_eq!(to_mgrs(GeoPoint::new(lat, lon)).to_string(), expected);
        }
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let point = GeoPoint::new(13.7563, 100.5018);
        let first = to_mgrs(point);
        for _ in 0..100 {
            assert_eq!(to_mgrs(point), first);
        }
    }

    #[test]
    fn polar_points_fall_back_to_utm() {
        let output = to_mgrs(GeoPoint::new(86.0, 45.0));
        assert!(matches!(output, MgrsOutput::UtmFallback(_)));
        assert!(output.grid().is_none());
        assert!(output.to_string().starts_with("38? "));

        let south = to_mgrs(GeoPoint::new(-85.0, 0.0));
        assert!(matches!(south, MgrsOutput::UtmFallback(_)));
    }

    #[test]
    fn digits_are_zero_padded() {
        let reference = MgrsReference {
            zone: 4,
            band: 'Q',
            square_id: ['F', 'J'],
            easting5: 123,
            northing5: 7,
        };
        assert_eq!(reference.to_string(), "4Q FJ 00123 00007");
    }
}
