//! Text layout for the raster backend using cosmic-text
//!
//! Text is laid out on a single line inside a box. The font size follows the
//! box height, then the overflow policy decides what happens when the shaped
//! line is wider than the box.

use std::collections::HashMap;
use std::sync::Arc;

use camoverlay_types::{Color, TextAlign, TextOverflow};
use cosmic_text::fontdb::Source;
use cosmic_text::{Attrs, Buffer, Family, FontSystem, LayoutGlyph, Metrics, Shaping, SwashCache};
use tiny_skia::Pixmap;

use crate::utils::truncate_name;

/// Maximum entries in the shaping cache (LRU eviction when exceeded)
const TEXT_CACHE_MAX_ENTRIES: usize = 256;

/// Font size relative to the height of the text box
const FONT_SIZE_RATIO: f32 = 0.75;

/// Shaped single line of text
#[derive(Clone)]
struct ShapedLine {
    glyphs: Vec<LayoutGlyph>,
    width: f32,
    /// Baseline offset from the top of the line box
    baseline: f32,
    line_height: f32,
    last_used: u64,
}

/// (text, font size in tenths, family)
type ShapeKey = (String, u32, Option<String>);

/// Target box for one `WriteText` call, in surface pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

pub struct TextEngine {
    font_system: FontSystem,
    swash_cache: SwashCache,
    cache: HashMap<ShapeKey, ShapedLine>,
    access_counter: u64,
}

impl TextEngine {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
            cache: HashMap::with_capacity(64),
            access_counter: 0,
        }
    }

    /// Register font data and return its family name, or `None` if the data
    /// holds no usable face
    pub fn load_font(&mut self, data: Vec<u8>) -> Option<String> {
        let db = self.font_system.db_mut();
        let ids = db.load_font_source(Source::Binary(Arc::new(data)));
        let family = ids
            .iter()
            .find_map(|id| db.face(*id))
            .and_then(|face| face.families.first())
            .map(|(name, _)| name.clone());
        if family.is_some() {
            // Shaped lines may have fallen back before this face existed
            self.cache.clear();
        }
        family
    }

    /// Lay out `text` inside `bounds` and blend it onto `pixmap`.
    ///
    /// Returns the text that was actually drawn, which differs from `text`
    /// when [`TextOverflow::Truncate`] shortened it. Nothing is drawn into an
    /// empty box and an empty string is returned.
    pub fn draw(
        &mut self,
        pixmap: &mut Pixmap,
        text: &str,
        bounds: TextBox,
        align: TextAlign,
        overflow: TextOverflow,
        color: Color,
        family: Option<&str>,
    ) -> String {
        if text.is_empty() || bounds.width <= 0.0 || bounds.height <= 0.0 {
            return String::new();
        }

        let mut font_size = (bounds.height * FONT_SIZE_RATIO).max(1.0);
        let mut content = text.to_string();
        let mut line = self.shape(&content, font_size, family);

        if line.width > bounds.width {
            match overflow {
                TextOverflow::Overflow => {}
                TextOverflow::ScaleToFit => {
                    font_size = (font_size * bounds.width / line.width).max(1.0);
                    line = self.shape(&content, font_size, family);
                }
                TextOverflow::Truncate => {
                    let chars = content.chars().count();
                    for max_chars in (1..chars).rev() {
                        content = truncate_name(text, max_chars);
                        line = self.shape(&content, font_size, family);
                        if line.width <= bounds.width {
                            break;
                        }
                    }
                }
            }
        }

        let x = match align {
            TextAlign::Left => bounds.x,
            TextAlign::Center => bounds.x + (bounds.width - line.width) / 2.0,
            TextAlign::Right => bounds.x + bounds.width - line.width,
        };
        let top = bounds.y + (bounds.height - line.line_height) / 2.0;
        let baseline = top + line.baseline;

        for glyph in &line.glyphs {
            let physical = glyph.physical((x, baseline), 1.0);
            if let Some(image) = self
                .swash_cache
                .get_image(&mut self.font_system, physical.cache_key)
            {
                draw_glyph_to_pixmap(
                    pixmap,
                    &image.data,
                    image.placement.width,
                    image.placement.height,
                    physical.x + image.placement.left,
                    physical.y - image.placement.top,
                    color,
                );
            }
        }
        content
    }

    fn shape(&mut self, text: &str, font_size: f32, family: Option<&str>) -> ShapedLine {
        let size_key = (font_size * 10.0).round() as u32;
        self.access_counter += 1;
        let now = self.access_counter;

        let key: ShapeKey = (text.to_string(), size_key, family.map(str::to_string));
        if let Some(cached) = self.cache.get_mut(&key) {
            cached.last_used = now;
            return cached.clone();
        }

        let metrics = Metrics::new(font_size, font_size * 1.2);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);
        let attrs = match family {
            Some(name) => Attrs::new().family(Family::Name(name)),
            None => Attrs::new().family(Family::SansSerif),
        };
        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);
        buffer.shape_until_scroll(&mut self.font_system, false);

        let mut line = ShapedLine {
            glyphs: Vec::new(),
            width: 0.0,
            baseline: font_size,
            line_height: font_size * 1.2,
            last_used: now,
        };
        if let Some(run) = buffer.layout_runs().next() {
            line.width = run.line_w;
            line.baseline = run.line_y - run.line_top;
            line.line_height = run.line_height;
            line.glyphs = run.glyphs.to_vec();
        }

        self.cache.insert(key, line.clone());
        self.evict_lru_if_needed();
        line
    }

    fn evict_lru_if_needed(&mut self) {
        if self.cache.len() <= TEXT_CACHE_MAX_ENTRIES {
            return;
        }

        let target_size = TEXT_CACHE_MAX_ENTRIES * 3 / 4;
        let mut entries: Vec<_> = self
            .cache
            .iter()
            .map(|(k, v)| (k.clone(), v.last_used))
            .collect();
        entries.sort_by_key(|(_, last_used)| *last_used);

        for (key, _) in entries.into_iter().take(self.cache.len() - target_size) {
            self.cache.remove(&key);
        }
    }
}

impl Default for TextEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Blend a glyph coverage mask onto a premultiplied pixmap
fn draw_glyph_to_pixmap(
    pixmap: &mut Pixmap,
    glyph_data: &[u8],
    glyph_width: u32,
    glyph_height: u32,
    dest_x: i32,
    dest_y: i32,
    color: Color,
) {
    let pixmap_width = pixmap.width() as i32;
    let pixmap_height = pixmap.height() as i32;
    let data = pixmap.data_mut();
    let [r, g, b, a] = color.map(u32::from);

    for gy in 0..glyph_height as i32 {
        let py = dest_y + gy;
        if py < 0 || py >= pixmap_height {
            continue;
        }

        for gx in 0..glyph_width as i32 {
            let px = dest_x + gx;
            if px < 0 || px >= pixmap_width {
                continue;
            }

            let glyph_idx = (gy as u32 * glyph_width + gx as u32) as usize;
            let Some(&coverage) = glyph_data.get(glyph_idx) else {
                continue;
            };
            if coverage == 0 {
                continue;
            }

            let idx = ((py * pixmap_width + px) * 4) as usize;
            let src_a = coverage as u32 * a / 255;
            let inv_a = 255 - src_a;

            data[idx] = ((r * src_a + data[idx] as u32 * inv_a) / 255) as u8;
            data[idx + 1] = ((g * src_a + data[idx + 1] as u32 * inv_a) / 255) as u8;
            data[idx + 2] = ((b * src_a + data[idx + 2] as u32 * inv_a) / 255) as u8;
            data[idx + 3] = (src_a + data[idx + 3] as u32 * inv_a / 255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blends_full_coverage_as_source_color() {
        let mut pixmap = Pixmap::new(2, 2).unwrap();
        draw_glyph_to_pixmap(&mut pixmap, &[255, 0, 0, 255], 2, 2, 0, 0, [10, 20, 30, 255]);

        assert_eq!(&pixmap.data()[..4], &[10, 20, 30, 255]);
        assert_eq!(&pixmap.data()[4..8], &[0, 0, 0, 0]);
        assert_eq!(&pixmap.data()[12..], &[10, 20, 30, 255]);
    }

    #[test]
    fn clips_glyphs_outside_the_pixmap() {
        let mut pixmap = Pixmap::new(2, 2).unwrap();
        draw_glyph_to_pixmap(&mut pixmap, &[255; 16], 4, 4, -3, -3, [255, 255, 255, 255]);

        assert_eq!(&pixmap.data()[..4], &[255, 255, 255, 255]);
        assert!(pixmap.data()[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn rejects_non_font_data() {
        let mut engine = TextEngine::new();
        assert_eq!(engine.load_font(b"not a font".to_vec()), None);
    }

    const WHITE: Color = [255, 255, 255, 255];

    /// Rightmost column holding any ink, if anything was drawn
    fn rightmost_ink(pixmap: &Pixmap) -> Option<u32> {
        let width = pixmap.width();
        pixmap
            .pixels()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.alpha() > 0)
            .map(|(i, _)| i as u32 % width)
            .max()
    }

    /// Draw a long run of wide glyphs into an 80 px box at x = 10.
    /// `None` when the machine has no system fonts to shape with.
    fn draw_wide(overflow: TextOverflow) -> Option<(Pixmap, String, TextBox)> {
        let mut engine = TextEngine::new();
        engine.font_system.db().faces().next()?;
        let mut pixmap = Pixmap::new(480, 40).unwrap();
        let bounds = TextBox {
            x: 10.0,
            y: 4.0,
            width: 80.0,
            height: 32.0,
        };
        let drawn = engine.draw(
            &mut pixmap,
            &"W".repeat(16),
            bounds,
            TextAlign::Left,
            overflow,
            WHITE,
            None,
        );
        Some((pixmap, drawn, bounds))
    }

    /// Glyph positions are rounded to whole pixels
    const SLACK: f32 = 1.0;

    #[test]
    fn overflow_draws_past_the_box() {
        let Some((pixmap, drawn, bounds)) = draw_wide(TextOverflow::Overflow) else {
            return;
        };

        assert_eq!(drawn, "W".repeat(16));
        let right = rightmost_ink(&pixmap).expect("text was drawn");
        assert!(right as f32 > bounds.x + bounds.width, "ink ends at {right}");
    }

    #[test]
    fn scale_to_fit_keeps_every_glyph_inside() {
        let Some((pixmap, drawn, bounds)) = draw_wide(TextOverflow::ScaleToFit) else {
            return;
        };

        assert_eq!(drawn, "W".repeat(16));
        let right = rightmost_ink(&pixmap).expect("text was drawn");
        assert!(right as f32 <= bounds.x + bounds.width + SLACK, "ink ends at {right}");
    }

    #[test]
    fn truncate_cuts_with_an_ellipsis() {
        let Some((pixmap, drawn, bounds)) = draw_wide(TextOverflow::Truncate) else {
            return;
        };

        assert!(drawn.ends_with("..."), "drew {drawn:?}");
        assert!(drawn.chars().count() < 16);
        let right = rightmost_ink(&pixmap).expect("text was drawn");
        assert!(right as f32 <= bounds.x + bounds.width + SLACK, "ink ends at {right}");
    }

    #[test]
    fn short_text_is_never_truncated() {
        let mut engine = TextEngine::new();
        let mut pixmap = Pixmap::new(200, 40).unwrap();
        let bounds = TextBox {
            x: 0.0,
            y: 0.0,
            width: 200.0,
            height: 32.0,
        };

        let drawn = engine.draw(
            &mut pixmap,
            "12 kg",
            bounds,
            TextAlign::Right,
            TextOverflow::Truncate,
            WHITE,
            None,
        );

        assert_eq!(drawn, "12 kg");
    }

    #[test]
    fn empty_box_draws_nothing() {
        let mut engine = TextEngine::new();
        let mut pixmap = Pixmap::new(4, 4).unwrap();
        let bounds = TextBox {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 4.0,
        };

        let drawn = engine.draw(
            &mut pixmap,
            "88",
            bounds,
            TextAlign::Left,
            TextOverflow::Overflow,
            [255, 255, 255, 255],
            None,
        );

        assert!(drawn.is_empty());
        assert!(pixmap.data().iter().all(|&b| b == 0));
    }
}
