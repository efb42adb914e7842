//! # 地址格式化模块（address）
//!
//! ## 设计思路
//!
//! 逆地理编码得到的结构化地址由外部服务提供，本模块只负责按"精度档位"
//! 裁剪成一段显示文本。完整地址会按列宽做软换行，这只是显示上的近似处理，
//! 不做任何语言学意义上的分词。
//!
//! ## 换行规则（仅 `Full` 档位）
//!
//! 单行超过 30 个字符时：
//! 1. 在前 40 个字符内找离第 30 列最近的逗号，在逗号后断开；
//! 2. 否则在第 35 列之前找最后一个空格（位置不小于 15）断开；
//! 3. 否则保持不换行。
//!
//! 字符按 `char` 计数，泰文等多字节文本不会被截断在字节中间。

use serde::{Deserialize, Serialize};

const WRAP_THRESHOLD: usize = 30;
const COMMA_SEARCH_LIMIT: usize = 40;
const SPACE_SEARCH_LIMIT: usize = 35;
const MIN_BREAK_COLUMN: usize = 15;

/// 结构化邮政地址，空字符串表示该字段缺失。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostalAddress {
    pub house_number: String,
    pub street: String,
    pub sub_district: String,
    pub district: String,
    pub province: String,
    pub country: String,
    pub postal_code: String,
}

/// 地址显示精度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressResolution {
    /// 仅国家
    Country,
    /// 省 + 国家
    Province,
    /// 区/县 + 省
    District,
    /// 街道/乡 + 区/县 + 省
    SubDistrict,
    /// 完整地址（含门牌、邮编），带软换行
    #[default]
    Full,
}

impl PostalAddress {
    /// 所有字段均为空。
    pub fn is_empty(&self) -> bool {
        [
            &self.house_number,
            &self.street,
            &self.sub_district,
            &self.district,
            &self.province,
            &self.country,
            &self.postal_code,
        ]
        .iter()
        .all(|part| part.trim().is_empty())
    }

    /// 按精度档位输出地址文本；`Full` 档位可能包含 `'\n'`。
    pub fn format(&self, resolution: AddressResolution) -> String {
        match resolution {
            AddressResolution::Country => join_parts(&[&self.country]),
            AddressResolution::Province => join_parts(&[&self.province, &self.country]),
            AddressResolution::District => join_parts(&[&self.district, &self.province]),
            AddressResolution::SubDistrict => {
                join_parts(&[&self.sub_district, &self.district, &self.province])
            }
            AddressResolution::Full => {
                let street_line = join_with(&[&self.house_number, &self.street], " ");
                let province_line = join_with(&[&self.province, &self.postal_code], " ");
                let full = join_parts(&[
                    &street_line,
                    &self.sub_district,
                    &self.district,
                    &province_line,
                    &self.country,
                ]);
                wrap_address_line(&full).join("\n")
            }
        }
    }
}

fn join_parts(parts: &[&str]) -> String {
    join_with(parts, ", ")
}

fn join_with(parts: &[&str], separator: &str) -> String {
    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// 对单行地址做软换行，返回各行文本。
pub fn wrap_address_line(line: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rest: Vec<char> = line.trim().chars().collect();

    while rest.len() > WRAP_THRESHOLD {
        let Some((head_end, tail_start)) = find_break(&rest) else {
            break;
        };
        let head: String = rest[..head_end].iter().collect();
        lines.push(head.trim_end().to_string());
        rest = rest[tail_start..].to_vec();
        while rest.first().is_some_and(|c| c.is_whitespace()) {
            rest.remove(0);
        }
    }

    if !rest.is_empty() {
        lines.push(rest.iter().collect());
    }
    lines
}

/// 返回 `(本行结束位置, 下一行起始位置)`，均为 `char` 下标。
fn find_break(chars: &[char]) -> Option<(usize, usize)> {
    let comma = chars
        .iter()
        .take(COMMA_SEARCH_LIMIT)
        .enumerate()
        .filter(|(_, c)| **c == ',')
        .min_by_key(|(index, _)| index.abs_diff(WRAP_THRESHOLD))
        .map(|(index, _)| index);
    if let Some(index) = comma {
        return Some((index + 1, index + 1));
    }

    chars
        .iter()
        .take(SPACE_SEARCH_LIMIT)
        .enumerate()
        .rev()
        .find(|(index, c)| c.is_whitespace() && *index >= MIN_BREAK_COLUMN)
        .map(|(index, _)| (index, index + 1))
}
