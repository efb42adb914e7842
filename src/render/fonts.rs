//! # 字体库（FontBook）
//!
//! ## 实现思路
//!
//! - 排版交给 `cosmic-text`：`Buffer` + `Shaping::Advanced` 完成复杂文字整形（泰文上下标组合等）
//! - 字形轮廓由 `SwashCache::get_outline_commands` 取出，转换成 `tiny_skia::Path`，
//!   画布对同一条路径做填充、描边和阴影
//! - 内置 DejaVu Sans（常规 + 粗体），未注册的字体族名回退到内置字体；
//!   库中所有字体都参与 cosmic-text 的缺字回退
//! - `FontSystem` 只能可变借用，整套排版状态放在一把 `Mutex` 里

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use cosmic_text::{
    Attrs, Buffer, Command, Family, FontSystem, Metrics, Shaping, SwashCache, Weight, Wrap, fontdb,
};
use once_cell::sync::Lazy;
use tiny_skia::{Path, PathBuilder};

use super::canvas::{FontSpec, Point, TextMetrics};
use super::error::RenderError;
use super::recording::approximate_metrics;

const BUNDLED_REGULAR: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const BUNDLED_BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");
const BUNDLED_FAMILY: &str = "DejaVu Sans";
const LOCALE: &str = "en-US";
const LINE_HEIGHT_EM: f32 = 1.2;

static SHARED: Lazy<Arc<FontBook>> = Lazy::new(|| Arc::new(FontBook::new()));

/// 伪粗体的描边宽度（像素）。
pub(crate) fn faux_bold_width(size_px: f32) -> f32 {
    (size_px / 24.0).round().max(1.0)
}

struct TextEngine {
    fonts: FontSystem,
    glyphs: SwashCache,
}

#[derive(Debug, Clone)]
struct FamilyEntry {
    /// 字体文件内的族名，用于 fontdb 匹配。
    name: String,
    bold: Option<String>,
}

/// 一行文本在绘制坐标系中的轮廓。
#[derive(Debug, Clone)]
pub struct TextOutline {
    pub path: Path,
    /// 请求了粗体但该族没有粗体字形。
    pub faux_bold: bool,
}

/// 按别名索引的字体集合。
pub struct FontBook {
    engine: Mutex<TextEngine>,
    families: HashMap<String, FamilyEntry>,
    fallback: FamilyEntry,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("families", &self.families)
            .field("fallback", &self.fallback.name)
            .finish()
    }
}

impl Default for FontBook {
    fn default() -> Self {
        Self::new()
    }
}

impl FontBook {
    /// 只含内置字体的字体库，不扫描系统字体。
    pub fn new() -> Self {
        let mut db = fontdb::Database::new();
        db.load_font_data(BUNDLED_REGULAR.to_vec());
        db.load_font_data(BUNDLED_BOLD.to_vec());
        db.set_sans_serif_family(BUNDLED_FAMILY);

        let fallback = FamilyEntry {
            name: BUNDLED_FAMILY.to_string(),
            bold: Some(BUNDLED_FAMILY.to_string()),
        };
        let mut families = HashMap::new();
        families.insert(BUNDLED_FAMILY.to_lowercase(), fallback.clone());

        Self {
            engine: Mutex::new(TextEngine {
                fonts: FontSystem::new_with_locale_and_db(LOCALE.to_string(), db),
                glyphs: SwashCache::new(),
            }),
            families,
            fallback,
        }
    }

    /// 进程内共享的内置字体库。
    pub fn shared() -> Arc<FontBook> {
        Arc::clone(&SHARED)
    }

    /// 注册一个字体族；`alias` 不区分大小写，与配置里的 `font_family` 对应。
    pub fn add_family(&mut self, alias: &str, regular: Vec<u8>) -> Result<(), RenderError> {
        let name = self.load_face(regular)?;
        log::info!("✅ 已注册字体族 {alias} ({name})");
        self.families
            .insert(alias.to_lowercase(), FamilyEntry { name, bold: None });
        Ok(())
    }

    /// 为已注册的字体族补充粗体字形。
    pub fn set_bold(&mut self, alias: &str, bold: Vec<u8>) -> Result<(), RenderError> {
        let key = alias.to_lowercase();
        if !self.families.contains_key(&key) {
            return Err(RenderError::Font(format!("未注册的字体族: {alias}")));
        }
        let name = self.load_face(bold)?;
        if let Some(entry) = self.families.get_mut(&key) {
            entry.bold = Some(name);
        }
        Ok(())
    }

    fn load_face(&mut self, bytes: Vec<u8>) -> Result<String, RenderError> {
        let engine = self.engine.get_mut().unwrap_or_else(PoisonError::into_inner);
        let db = engine.fonts.db_mut();
        let before = db.len();
        db.load_font_data(bytes);
        db.faces()
            .skip(before)
            .find_map(|face| face.families.first())
            .map(|(name, _)| name.clone())
            .ok_or_else(|| RenderError::Font("字体解析失败: 没有可用的字形".to_string()))
    }

    /// 返回 fontdb 族名、字重和是否需要伪粗体。
    fn resolve(&self, spec: &FontSpec) -> (&str, Weight, bool) {
        let entry = self
            .families
            .get(&spec.family.to_lowercase())
            .unwrap_or(&self.fallback);
        match (&entry.bold, spec.bold) {
            (Some(bold), true) => (bold.as_str(), Weight::BOLD, false),
            (None, true) => (entry.name.as_str(), Weight::NORMAL, true),
            _ => (entry.name.as_str(), Weight::NORMAL, false),
        }
    }

    pub fn measure(&self, text: &str, spec: &FontSpec) -> TextMetrics {
        if !valid_size(spec.size_px) {
            return approximate_metrics(text, spec);
        }
        let (family, weight, faux_bold) = self.resolve(spec);
        let mut guard = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
        let buffer = shape(&mut guard, text, spec.size_px, family, weight);

        let width = buffer.layout_runs().map(|run| run.line_w).fold(0.0_f32, f32::max);
        let (ascent, descent) = buffer
            .lines
            .iter()
            .filter_map(|line| line.layout_opt().as_ref())
            .flatten()
            .fold((0.0_f32, 0.0_f32), |(a, d), line| {
                (a.max(line.max_ascent), d.max(line.max_descent))
            });

        let fallback = approximate_metrics(text, spec);
        let bold_extra = if faux_bold && !text.is_empty() {
            faux_bold_width(spec.size_px)
        } else {
            0.0
        };
        TextMetrics {
            width: width + bold_extra,
            // 空文本没有字形，纵向度量沿用固定比例
            ascent: if ascent > 0.0 { ascent } else { fallback.ascent },
            descent: if ascent > 0.0 { descent } else { fallback.descent },
        }
    }

    /// 整形并生成轮廓；`origin` 为基线左端点。纯空白文本返回 `None`。
    pub fn outline(
        &self,
        text: &str,
        origin: Point,
        spec: &FontSpec,
    ) -> Result<Option<TextOutline>, RenderError> {
        if !valid_size(spec.size_px) {
            return Err(RenderError::Font(format!("字号无效: {}", spec.size_px)));
        }
        let (family, weight, faux_bold) = self.resolve(spec);
        let mut guard = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
        let engine = &mut *guard;
        let buffer = shape(engine, text, spec.size_px, family, weight);

        let mut builder = PathBuilder::new();
        for run in buffer.layout_runs() {
            for glyph in run.glyphs {
                let physical = glyph.physical((0.0, 0.0), 1.0);
                let pen = Point::new(
                    origin.x + glyph.x + glyph.font_size * glyph.x_offset,
                    origin.y + glyph.y - glyph.font_size * glyph.y_offset,
                );
                if let Some(commands) =
                    engine.glyphs.get_outline_commands(&mut engine.fonts, physical.cache_key)
                {
                    append_outline(&mut builder, commands, pen);
                }
            }
        }
        Ok(builder.finish().map(|path| TextOutline { path, faux_bold }))
    }
}

fn valid_size(size_px: f32) -> bool {
    size_px.is_finite() && size_px > 0.0
}

fn shape(engine: &mut TextEngine, text: &str, size_px: f32, family: &str, weight: Weight) -> Buffer {
    let fonts = &mut engine.fonts;
    let mut buffer = Buffer::new(fonts, Metrics::new(size_px, size_px * LINE_HEIGHT_EM));
    buffer.set_wrap(fonts, Wrap::None);
    buffer.set_size(fonts, None, None);
    buffer.set_text(
        fonts,
        text,
        Attrs::new().family(Family::Name(family)).weight(weight),
        Shaping::Advanced,
    );
    buffer
}

/// 字体空间 y 轴向上，画布 y 轴向下。
fn to_canvas(pen: Point, x: f32, y: f32) -> (f32, f32) {
    (pen.x + x, pen.y - y)
}

fn append_outline(builder: &mut PathBuilder, commands: &[Command], pen: Point) {
    for command in commands {
        match command {
            Command::MoveTo(p) => {
                let (x, y) = to_canvas(pen, p.x, p.y);
                builder.move_to(x, y);
            }
            Command::LineTo(p) => {
                let (x, y) = to_canvas(pen, p.x, p.y);
                builder.line_to(x, y);
            }
            Command::QuadTo(c, p) => {
                let (cx, cy) = to_canvas(pen, c.x, c.y);
                let (x, y) = to_canvas(pen, p.x, p.y);
                builder.quad_to(cx, cy, x, y);
            }
            Command::CurveTo(c1, c2, p) => {
                let (x1, y1) = to_canvas(pen, c1.x, c1.y);
                let (x2, y2) = to_canvas(pen, c2.x, c2.y);
                let (x, y) = to_canvas(pen, p.x, p.y);
                builder.cubic_to(x1, y1, x2, y2, x, y);
            }
            Command::Close => builder.close(),
        }
    }
}
