//! # 日期格式化
//!
//! 支持 `yyyy/yy/MM/MMM/MMMM/dd/HH/hh/mm/ss/a/E/EEEE` 等常用模式字母，
//! 单引号内为原样输出的文本（`''` 表示单引号本身）。
//!
//! 泰语模式下月份、星期、上下午使用泰文名称，年份使用佛历（公历 + 543）。

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;

/// 佛历与公历的年份差。
pub const BUDDHIST_ERA_OFFSET: i32 = 543;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'[^']*'|y+|M+|d+|H+|h+|m+|s+|a+|E+").expect("日期模式正则是常量，必然合法")
});

const MONTHS_EN: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const MONTHS_TH: [&str; 12] = [
    "มกราคม", "กุมภาพันธ์", "มีนาคม", "เมษายน", "พฤษภาคม", "มิถุนายน", "กรกฎาคม", "สิงหาคม",
    "กันยายน", "ตุลาคม", "พฤศจิกายน", "ธันวาคม",
];

const MONTHS_TH_SHORT: [&str; 12] = [
    "ม.ค.", "ก.พ.", "มี.ค.", "เม.ย.", "พ.ค.", "มิ.ย.", "ก.ค.", "ส.ค.", "ก.ย.", "ต.ค.", "พ.ย.",
    "ธ.ค.",
];

/// 从星期日开始。
const DAYS_EN: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

const DAYS_TH: [&str; 7] = [
    "วันอาทิตย์", "วันจันทร์", "วันอังคาร", "วันพุธ", "วันพฤหัสบดี", "วันศุกร์", "วันเสาร์",
];

const DAYS_TH_SHORT: [&str; 7] = ["อา.", "จ.", "อ.", "พ.", "พฤ.", "ศ.", "ส."];

/// 按模式格式化时间戳。
///
/// # 示例
/// ```rust
/// use chrono::DateTime;
/// use geostamp::overlay::format_timestamp;
///
/// let ts = DateTime::parse_from_rfc3339("2026-10-17T14:03:05+07:00").unwrap();
/// assert_eq!(format_timestamp(&ts, "dd/MM/yyyy HH:mm:ss", false), "17/10/2026 14:03:05");
/// assert_eq!(format_timestamp(&ts, "d MMMM yyyy", true), "17 ตุลาคม 2569");
/// ```
pub fn format_timestamp(timestamp: &DateTime<FixedOffset>, pattern: &str, thai: bool) -> String {
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut last = 0;
    for token in TOKEN_PATTERN.find_iter(pattern) {
        out.push_str(&pattern[last..token.start()]);
        out.push_str(&expand_token(timestamp, token.as_str(), thai));
        last = token.end();
    }
    out.push_str(&pattern[last..]);
    out
}

fn expand_token(ts: &DateTime<FixedOffset>, token: &str, thai: bool) -> String {
    if let Some(literal) = token.strip_prefix('\'') {
        let literal = literal.strip_suffix('\'').unwrap_or(literal);
        return if literal.is_empty() {
            "'".to_string()
        } else {
            literal.to_string()
        };
    }

    let count = token.chars().count();
    let month = ts.month0() as usize;
    let weekday = ts.weekday().num_days_from_sunday() as usize;

    match token.chars().next() {
        Some('y') => {
            let year = if thai {
                ts.year() + BUDDHIST_ERA_OFFSET
            } else {
                ts.year()
            };
            if count == 2 {
                format!("{:02}", year.rem_euclid(100))
            } else {
                format!("{year:0count$}")
            }
        }
        Some('M') => match count {
            1 => ts.month().to_string(),
            2 => format!("{:02}", ts.month()),
            3 if thai => MONTHS_TH_SHORT[month].to_string(),
            3 => MONTHS_EN[month][..3].to_string(),
            _ if thai => MONTHS_TH[month].to_string(),
            _ => MONTHS_EN[month].to_string(),
        },
        Some('d') => pad(ts.day(), count),
        Some('H') => pad(ts.hour(), count),
        Some('h') => {
            let (_, hour12) = ts.hour12();
            pad(hour12, count)
        }
        Some('m') => pad(ts.minute(), count),
        Some('s') => pad(ts.second(), count),
        Some('a') => {
            let pm = ts.hour() >= 12;
            match (thai, pm) {
                (true, false) => "ก่อนเที่ยง",
                (true, true) => "หลังเที่ยง",
                (false, false) => "AM",
                (false, true) => "PM",
            }
            .to_string()
        }
        Some('E') => match (thai, count >= 4) {
            (true, true) => DAYS_TH[weekday].to_string(),
            (true, false) => DAYS_TH_SHORT[weekday].to_string(),
            (false, true) => DAYS_EN[weekday].to_string(),
            (false, false) => DAYS_EN[weekday][..3].to_string(),
        },
        _ => token.to_string(),
    }
}

fn pad(value: u32, count: usize) -> String {
    if count >= 2 {
        format!("{value:02}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DateTime<FixedOffset> {
        // 2026-01-04 是星期日
        DateTime::parse_from_rfc3339("2026-01-04T09:05:07+07:00").unwrap()
    }

    #[test]
    fn default_pattern() {
        assert_eq!(
            format_timestamp(&sample(), "dd/MM/yyyy HH:mm:ss", false),
            "04/01/2026 09:05:07"
        );
    }

    #[test]
    fn buddhist_year_and_thai_names() {
        let ts = sample();
        assert_eq!(format_timestamp(&ts, "yyyy", true), "2569");
        assert_eq!(format_timestamp(&ts, "yy", true), "69");
        assert_eq!(format_timestamp(&ts, "MMMM", true), "มกราคม");
        assert_eq!(format_timestamp(&ts, "MMM", true), "ม.ค.");
        assert_eq!(format_timestamp(&ts, "EEEE", true), "วันอาทิตย์");
        assert_eq!(format_timestamp(&ts, "E", true), "อา.");
        assert_eq!(format_timestamp(&ts, "a", true), "ก่อนเที่ยง");
    }

    #[test]
    fn english_names_and_twelve_hour_clock() {
        let ts = DateTime::parse_from_rfc3339("2026-10-17T14:03:05+00:00").unwrap();
        assert_eq!(format_timestamp(&ts, "EEE, d MMM yyyy h:mm a", false), "Sat, 17 Oct 2026 2:03 PM");
        assert_eq!(format_timestamp(&ts, "EEEE MMMM", false), "Saturday October");
    }

    #[test]
    fn quoted_literals_are_preserved() {
        let ts = sample();
        assert_eq!(format_timestamp(&ts, "yyyy-MM-dd'T'HH:mm", false), "2026-01-04T09:05");
        assert_eq!(format_timestamp(&ts, "HH'h' mm''", false), "09h 05'");
        assert_eq!(format_timestamp(&ts, "'at' H", false), "at 9");
    }

    #[test]
    fn unknown_letters_pass_through() {
        assert_eq!(format_timestamp(&sample(), "dd.MM Z", false), "04.01 Z");
    }
}
