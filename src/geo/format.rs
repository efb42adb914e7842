//! 坐标文本格式化（十进制 / 度分秒 / UTM / MGRS）。

use super::{GeoPoint, GpsFormat, to_mgrs, to_utm};

/// 按指定格式输出坐标文本。
pub fn format_coordinates(point: GeoPoint, format: GpsFormat) -> String {
    match format {
        GpsFormat::Decimal => format_decimal(point, 6),
        GpsFormat::Dms => format_dms(point),
        GpsFormat::Utm => to_utm(point).to_string(),
        GpsFormat::Mgrs => to_mgrs(point).to_string(),
    }
}

/// 十进制度，`decimals` 位小数，例如 `13.756300, 100.501800`。
pub fn format_decimal(point: GeoPoint, decimals: usize) -> String {
    format!(
        "{:.prec$}, {:.prec$}",
        point.latitude,
        point.longitude,
        prec = decimals
    )
}

/// 度分秒，秒保留一位小数，例如 `13°45'22.7"N 100°30'06.5"E`。
pub fn format_dms(point: GeoPoint) -> String {
    let lat_hemisphere = if point.latitude >= 0.0 { 'N' } else { 'S' };
    let lon_hemisphere = if point.longitude >= 0.0 { 'E' } else { 'W' };
    format!(
        "{}{} {}{}",
        dms_component(point.latitude),
        lat_hemisphere,
        dms_component(point.longitude),
        lon_hemisphere
    )
}

fn dms_component(value: f64) -> String {
    // 先整体取整到 0.1 秒再拆分，避免出现 59.95" 进位成 60.0"
    let tenths = (value.abs() * 36_000.0).round() as u64;
    let degrees = tenths / 36_000;
    let minutes = (tenths % 36_000) / 600;
    let seconds_tenths = tenths % 600;
    format!(
        "{}°{:02}'{:02}.{}\"",
        degrees,
        minutes,
        seconds_tenths / 10,
        seconds_tenths % 10
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_uses_requested_precision() {
        let point = GeoPoint::new(13.7563, 100.5018);
        assert_eq!(format_decimal(point, 6), "13.756300, 100.501800");
        assert_eq!(format_decimal(point, 4), "13.7563, 100.5018");
    }

    #[test]
    fn dms_formats_hemispheres() {
        assert_eq!(
            format_dms(GeoPoint::new(13.7563, 100.5018)),
            "13°45'22.7\"N 100°30'06.5\"E"
        );
        assert_eq!(
            format_dms(GeoPoint::new(-33.8688, -70.5)),
            "33°52'07.7\"S 70°30'00.0\"W"
        );
    }

    #[test]
    fn dms_carries_rounded_seconds() {
        // 0.99999999° ≈ 0°59'59.99996"，四舍五入后应进位为 1°00'00.0"
        assert_eq!(dms_component(0.999_999_99), "1°00'00.0\"");
    }

    #[test]
    fn dispatches_on_format() {
        let point = GeoPoint::new(40.7128, -74.0060);
        assert_eq!(format_coordinates(point, GpsFormat::Utm), "18T 583959 4507350");
        assert_eq!(format_coordinates(point, GpsFormat::Mgrs), "18T WL 83959 07350");
        assert!(format_coordinates(point, GpsFormat::Dms).ends_with('W'));
    }
}
