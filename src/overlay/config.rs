//! # 水印配置模块
//!
//! ## 设计思路
//!
//! 所有用户可调的水印选项集中在 `OverlayConfig`：位置、颜色、字号、描边、阴影、
//! 模板、坐标格式、日期格式、Logo 等。配置通过 JSON 持久化，`Default` 给出
//! 开箱即用的取值。
//!
//! ## 实现思路
//!
//! - `#[serde(default)]`：旧版本配置文件缺字段时自动补默认值
//! - Logo 以 base64（可带 `data:image/...;base64,` 前缀）保存，
//!   加载时解码为 `Arc<RgbaImage>`，解码结果不参与序列化
//! - `validate` 在写入配置存储前做取值范围检查

use std::io::Cursor;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::address::AddressResolution;
use crate::geo::GpsFormat;
use crate::render::{Anchor, Color, FontSpec, TemplateId};

/// Logo 原始字节上限（5MB）。
pub const MAX_LOGO_BYTES: usize = 5 * 1024 * 1024;
/// Logo 解码后像素上限。
pub const MAX_LOGO_PIXELS: u64 = 16_000_000;

const MIN_TEXT_SIZE_PX: f32 = 4.0;
const MAX_TEXT_SIZE_PX: f32 = 400.0;
const MAX_STROKE_WIDTH_PX: f32 = 50.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("配置取值无效：{0}")]
    InvalidValue(String),

    #[error("Logo 无效：{0}")]
    Logo(String),

    #[error("配置 JSON 解析失败：{0}")]
    Json(#[from] serde_json::Error),
}

/// 水印可显示的信息项，按列表顺序输出为文本行。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    DateTime,
    Gps,
    Address,
    Compass,
    AltitudeSpeed,
    CustomText,
    Project,
    Inspector,
    Tags,
    /// 只控制 Logo 是否绘制，不产生文本行。
    LogoMarker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextStyle {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeConfig {
    pub enabled: bool,
    /// 描边宽度（1080 宽参考画布下的像素）。
    pub width: f32,
    pub color: Color,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 3.0,
            color: Color::BLACK,
        }
    }
}

/// 水印配置。
///
/// 尺寸类字段都以 1080 像素宽的参考画布为准，绘制时乘以 `canvas_width / 1080`。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// 文本块锚点。
    pub position: Anchor,
    /// 指南针表盘锚点。
    pub compass_position: Anchor,
    pub text_color: Color,
    /// 基准字号（像素）。
    pub text_size_px: f32,
    pub text_style: TextStyle,
    pub font_family: String,
    /// 整体不透明度（0..=255）。
    pub opacity: u8,
    pub stroke: StrokeConfig,
    pub shadow_enabled: bool,
    pub background_box_enabled: bool,
    /// 日期格式，如 `dd/MM/yyyy HH:mm:ss`。
    pub date_pattern: String,
    /// 泰语月份/星期名称，并使用佛历纪年。
    pub use_thai_locale: bool,
    pub template_id: TemplateId,
    pub gps_format: GpsFormat,
    pub compass_enabled: bool,
    pub altitude_enabled: bool,
    pub speed_enabled: bool,
    pub items: Vec<ItemKind>,
    pub address_resolution: AddressResolution,
    pub custom_text: String,
    pub project_name: String,
    pub inspector_name: String,
    pub tags: Vec<String>,
    /// Logo 的 base64 文本，可带 data URL 前缀。
    pub logo_base64: Option<String>,
    /// 解码后的 Logo，由 `decode_logo` 填充。
    #[serde(skip)]
    pub logo_image: Option<Arc<RgbaImage>>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            position: Anchor::BottomRight,
            compass_position: Anchor::TopLeft,
            text_color: Color::WHITE,
            text_size_px: 36.0,
            text_style: TextStyle::Normal,
            font_family: "sans-serif".to_string(),
            opacity: 255,
            stroke: StrokeConfig::default(),
            shadow_enabled: true,
            background_box_enabled: false,
            date_pattern: "dd/MM/yyyy HH:mm:ss".to_string(),
            use_thai_locale: false,
            template_id: TemplateId::Classic,
            gps_format: GpsFormat::Decimal,
            compass_enabled: false,
            altitude_enabled: false,
            speed_enabled: false,
            items: vec![ItemKind::DateTime, ItemKind::Gps, ItemKind::Address],
            address_resolution: AddressResolution::Full,
            custom_text: String::new(),
            project_name: String::new(),
            inspector_name: String::new(),
            tags: Vec::new(),
            logo_base64: None,
            logo_image: None,
        }
    }
}

impl OverlayConfig {
    /// 解析 JSON，校验取值并解码 Logo。
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json)?;
        config.validate()?;
        config.decode_logo()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.text_size_px.is_finite()
            || !(MIN_TEXT_SIZE_PX..=MAX_TEXT_SIZE_PX).contains(&self.text_size_px)
        {
            return Err(ConfigError::InvalidValue(format!(
                "字号 {} 超出范围 {MIN_TEXT_SIZE_PX}..={MAX_TEXT_SIZE_PX}",
                self.text_size_px
            )));
        }
        if !self.stroke.width.is_finite() || !(0.0..=MAX_STROKE_WIDTH_PX).contains(&self.stroke.width) {
            return Err(ConfigError::InvalidValue(format!(
                "描边宽度 {} 超出范围 0..={MAX_STROKE_WIDTH_PX}",
                self.stroke.width
            )));
        }
        if self.date_pattern.trim().is_empty() {
            return Err(ConfigError::InvalidValue("日期格式不能为空".to_string()));
        }
        if self.font_family.trim().is_empty() {
            return Err(ConfigError::InvalidValue("字体族不能为空".to_string()));
        }
        for (index, item) in self.items.iter().enumerate() {
            if self.items[..index].contains(item) {
                return Err(ConfigError::InvalidValue(format!("信息项重复: {item:?}")));
            }
        }
        Ok(())
    }

    pub fn has_item(&self, item: ItemKind) -> bool {
        self.items.contains(&item)
    }

    /// 是否需要绘制 Logo。
    pub fn logo_visible(&self) -> bool {
        self.logo_image.is_some() && self.has_item(ItemKind::LogoMarker)
    }

    /// 按缩放系数得到正文字体。
    pub fn text_font(&self, scale: f32) -> FontSpec {
        FontSpec::new(self.font_family.clone(), self.text_size_px * scale)
            .bold(self.text_style == TextStyle::Bold)
    }

    /// 根据 `logo_base64` 重新生成 `logo_image`。
    pub fn decode_logo(&mut self) -> Result<(), ConfigError> {
        self.logo_image = match self.logo_base64.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(data) => {
                let bytes = parse_base64(data)?;
                Some(Arc::new(decode_logo_bytes(&bytes)?))
            }
        };
        Ok(())
    }

    /// 直接设置 Logo 原始字节（PNG/JPEG 等），同时更新 base64 文本。
    pub fn set_logo_bytes(&mut self, bytes: &[u8]) -> Result<(), ConfigError> {
        let image = decode_logo_bytes(bytes)?;
        self.logo_base64 = Some(general_purpose::STANDARD.encode(bytes));
        self.logo_image = Some(Arc::new(image));
        Ok(())
    }
}

fn parse_base64(data: &str) -> Result<Vec<u8>, ConfigError> {
    let payload = if data.starts_with("data:") {
        if !data.starts_with("data:image/") {
            return Err(ConfigError::Logo("data URL 不是图片类型".to_string()));
        }
        let marker = data
            .find(";base64,")
            .ok_or_else(|| ConfigError::Logo("缺少 base64 标记".to_string()))?;
        &data[marker + 8..]
    } else {
        data
    };

    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| ConfigError::Logo(format!("Base64 解码失败：{e}")))
}

/// 先读图片头做尺寸检查，再完整解码为 RGBA。
fn decode_logo_bytes(bytes: &[u8]) -> Result<RgbaImage, ConfigError> {
    if bytes.len() > MAX_LOGO_BYTES {
        return Err(ConfigError::Logo(format!(
            "Logo 体积过大：{} 字节（限制：{MAX_LOGO_BYTES} 字节）",
            bytes.len()
        )));
    }

    let (width, height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ConfigError::Logo(format!("无法识别图片格式：{e}")))?
        .into_dimensions()
        .map_err(|e| ConfigError::Logo(format!("无法读取图片尺寸：{e}")))?;

    let pixels = u64::from(width) * u64::from(height);
    if pixels == 0 || pixels > MAX_LOGO_PIXELS {
        return Err(ConfigError::Logo(format!(
            "Logo 像素数不合法：{width}x{height}（限制：{MAX_LOGO_PIXELS} 像素）"
        )));
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| ConfigError::Logo(format!("图片解码失败：{e}")))?;
    log::info!("✅ Logo 解码成功 - 尺寸: {width}x{height}");
    Ok(decoded.to_rgba8())
}
