//! Bitmap fonts over 8-bit indexed glyphs.
//! - Glyph fallback: case folding and accent stripping when a code has no glyph
//! - Advance widths inherited from related glyphs for codes without their own
//! - Uppercase-only vs mixed-case detection, with the sharp-s special case
//! - One palette per color range, synthesized from the glyphs' own colors
//! - String metrics and glyph placement over text with inline color escapes

use bitflags::bitflags;
use log::{debug, info, trace, warn};

use crate::assets::{GlyphImage, IndexedGlyph};
use crate::core::gfx::{PaletteBackend, PaletteHandle};
use crate::error::FontError;
use crate::ui::charmap::{is_alpha, is_cased, is_lower, strip_accent, upper_for_lower};
use crate::ui::color::{BasePalette, ColorRange, NUM_TEXT_COLORS, PalEntry};
use crate::ui::text::{TextToken, tokens};
use crate::ui::translation::{
    TranslationStyles, build_translations, match_palette, record_texture_colors,
    simple_translation,
};

const SHARP_S: i32 = 0xDF;
const CAPITAL_SHARP_S: i32 = 0x1E9E;
const DEFAULT_CURSOR: i32 = '_' as i32;
const FALLBACK_SPACE_WIDTH: i32 = 4;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FontFlags: u8 {
        /// Both upper- and lowercase glyphs are present.
        const MIXED_CASE   = 1 << 0;
        /// Glyphs are drawn with their authored colors and tinted instead.
        const NO_TRANSLATE = 1 << 1;
        /// The untranslated range goes through the remap path too.
        const FORCE_REMAP  = 1 << 2;
    }
}

/// Index of a glyph image owned by a [`Font`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PicId(u32);

/// One code point slot in `[first_char, last_char]`. Both images may be the
/// same `PicId`. `x_move` is `None` until the advance has been resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Character {
    pub original_pic: Option<PicId>,
    pub translated_pic: Option<PicId>,
    pub x_move: Option<i32>,
}

/// Result of [`Font::get_char`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphLookup {
    /// Code the request resolved to after fallback.
    pub code: Option<i32>,
    pub pic: Option<PicId>,
    pub width: i32,
    /// `pic` is the authored image rather than the remapped one.
    pub redirected: bool,
}

/// A glyph positioned by [`Font::layout`], ready for an indexed-texture draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedGlyph {
    pub code: i32,
    pub x: i32,
    pub y: i32,
    pub pic: PicId,
    pub range: ColorRange,
    pub palette: Option<PaletteHandle>,
    pub tint: PalEntry,
    pub redirected: bool,
}

pub struct Font {
    name: String,
    first_char: i32,
    last_char: i32,
    chars: Vec<Character>,
    pics: Vec<Box<dyn GlyphImage>>,
    space_width: i32,
    global_kerning: i32,
    font_height: i32,
    cursor: i32,
    displacement: i32,
    flags: FontFlags,
    translation_style: String,
    patch_remap: [u8; 256],
    active_colors: usize,
    ranges: Vec<PaletteHandle>,
    tints: [PalEntry; NUM_TEXT_COLORS],
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("name", &self.name)
            .field("first_char", &self.first_char)
            .field("last_char", &self.last_char)
            .field("pics", &self.pics.len())
            .field("flags", &self.flags)
            .field("translation_style", &self.translation_style)
            .field("active_colors", &self.active_colors)
            .finish_non_exhaustive()
    }
}

impl Font {
    /* ----------------------------- accessors ----------------------------- */

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn first_char(&self) -> i32 {
        self.first_char
    }

    #[inline(always)]
    pub fn last_char(&self) -> i32 {
        self.last_char
    }

    #[inline(always)]
    pub fn space_width(&self) -> i32 {
        self.space_width
    }

    #[inline(always)]
    pub fn global_kerning(&self) -> i32 {
        self.global_kerning
    }

    pub fn set_global_kerning(&mut self, kerning: i32) {
        self.global_kerning = kerning;
    }

    #[inline(always)]
    pub fn font_height(&self) -> i32 {
        self.font_height
    }

    #[inline(always)]
    pub fn cursor(&self) -> i32 {
        self.cursor
    }

    /// Largest top offset among the authored glyph images.
    #[inline(always)]
    pub fn displacement(&self) -> i32 {
        self.displacement
    }

    #[inline(always)]
    pub fn flags(&self) -> FontFlags {
        self.flags
    }

    #[inline(always)]
    pub fn is_mixed_case(&self) -> bool {
        self.flags.contains(FontFlags::MIXED_CASE)
    }

    #[inline(always)]
    pub fn translation_style(&self) -> &str {
        &self.translation_style
    }

    /// Authored palette index -> compact luminosity index.
    #[inline(always)]
    pub fn patch_remap(&self) -> &[u8; 256] {
        &self.patch_remap
    }

    #[inline(always)]
    pub fn active_colors(&self) -> usize {
        self.active_colors
    }

    #[inline(always)]
    pub fn character(&self, code: i32) -> Option<&Character> {
        if code < self.first_char || code > self.last_char {
            return None;
        }
        self.chars.get((code - self.first_char) as usize)
    }

    #[inline(always)]
    pub fn image(&self, pic: PicId) -> Option<&dyn GlyphImage> {
        self.pics.get(pic.0 as usize).map(|p| &**p)
    }

    #[inline(always)]
    fn has_glyph(&self, code: i32) -> bool {
        self.character(code).is_some_and(|c| c.translated_pic.is_some())
    }

    #[inline(always)]
    fn available(&self, code: i32, need_glyph: bool) -> bool {
        self.character(code)
            .is_some_and(|c| !need_glyph || c.translated_pic.is_some())
    }

    /* ----------------------------- resolution ----------------------------- */

    /// Resolves `code` to a code this font can serve, following case and
    /// accent fallbacks. Negative codes in -128..=-1 are read as unsigned bytes.
    pub fn get_char_code(&self, code: i32, need_glyph: bool) -> Option<i32> {
        let mut code = if (-128..0).contains(&code) { code & 255 } else { code };
        if self.available(code, need_glyph) {
            return Some(code);
        }

        if !self.is_mixed_case() {
            if is_lower(code) {
                code = upper_for_lower(code);
                if self.available(code, need_glyph) {
                    return Some(code);
                }
            }
            let stripped = strip_accent(code);
            if stripped != code && self.available(stripped, need_glyph) {
                return Some(stripped);
            }
            return None;
        }

        if let Some(hit) = self.strip_chain(code, need_glyph) {
            return Some(hit);
        }
        if is_lower(code) {
            let upper = upper_for_lower(code);
            if upper != code {
                return self.get_char_code(upper, need_glyph);
            }
        }
        self.strip_chain(code, need_glyph)
    }

    fn strip_chain(&self, mut code: i32, need_glyph: bool) -> Option<i32> {
        loop {
            let next = strip_accent(code);
            if next == code {
                return None;
            }
            code = next;
            if self.available(code, need_glyph) {
                return Some(code);
            }
        }
    }

    /// Image and advance for `code` drawn in `range`. The untranslated range
    /// returns the authored image when it differs from the remapped one,
    /// unless the font forces remapping.
    pub fn get_char(&self, code: i32, range: ColorRange) -> GlyphLookup {
        let Some(code) = self.get_char_code(code, true) else {
            return GlyphLookup {
                code: None,
                pic: None,
                width: self.space_width,
                redirected: false,
            };
        };
        let ch = self.chars[(code - self.first_char) as usize];
        let redirected = range == ColorRange::Untranslated
            && !self.flags.contains(FontFlags::FORCE_REMAP)
            && ch.original_pic.is_some()
            && ch.original_pic != ch.translated_pic;
        GlyphLookup {
            code: Some(code),
            pic: if redirected { ch.original_pic } else { ch.translated_pic },
            width: ch.x_move.unwrap_or(self.space_width),
            redirected,
        }
    }

    pub fn char_width(&self, code: i32) -> i32 {
        self.get_char_code(code, true)
            .and_then(|c| self.chars[(c - self.first_char) as usize].x_move)
            .unwrap_or(self.space_width)
    }

    #[inline(always)]
    pub fn cursor_width(&self) -> i32 {
        self.char_width(self.cursor)
    }

    /* ------------------------------ metrics ------------------------------ */

    /// Widest line of `text` in pixels. Color escapes take no space.
    pub fn string_width(&self, text: &str) -> i32 {
        let mut w = 0;
        let mut maxw = 0;
        for tok in tokens(text) {
            match tok {
                TextToken::Color(_) => {}
                TextToken::Newline => {
                    maxw = maxw.max(w);
                    w = 0;
                }
                TextToken::Glyph(code) => w += self.char_width(code) + self.global_kerning,
            }
        }
        maxw.max(w)
    }

    /// False if any letter would only print through a fallback glyph.
    pub fn can_print(&self, text: &str) -> bool {
        let mixed = self.is_mixed_case();
        tokens(text).all(|tok| {
            let TextToken::Glyph(chr) = tok else {
                return true;
            };
            let chr = if mixed { chr } else { upper_for_lower(chr) };
            self.get_char_code(chr, true) == Some(chr) || !is_alpha(chr)
        })
    }

    /// Largest top offset among the glyphs of the first line.
    pub fn max_ascender(&self, text: &str) -> i32 {
        let mut best = 0;
        for tok in tokens(text) {
            match tok {
                TextToken::Newline => break,
                TextToken::Color(_) => {}
                TextToken::Glyph(code) => {
                    let pic = self.get_char(code, ColorRange::Untranslated).pic;
                    if let Some(img) = pic.and_then(|p| self.image(p)) {
                        best = best.max(img.top_offset());
                    }
                }
            }
        }
        best
    }

    /// Vertical shift that puts `code`'s bottom on the baseline of '0'.
    pub fn bottom_align_offset(&self, code: i32) -> i32 {
        let img = |c: i32| {
            self.get_char(c, ColorRange::Untranslated)
                .pic
                .and_then(|p| self.image(p))
        };
        let mut offset = 0;
        if let Some(c) = img(code) {
            offset += c.top_offset();
        }
        if let Some(zero) = img('0' as i32) {
            offset += zero.height() as i32 - zero.top_offset();
        }
        offset
    }

    /// Places the glyphs of `text` starting at (0, 0) in `range`. Color
    /// escapes switch the range from that point on.
    pub fn layout(&self, text: &str, range: ColorRange) -> Vec<PlacedGlyph> {
        let mut out = Vec::with_capacity(text.len());
        let mut range = range;
        let (mut x, mut y) = (0, 0);
        for tok in tokens(text) {
            match tok {
                TextToken::Newline => {
                    x = 0;
                    y += self.font_height;
                }
                TextToken::Color(esc) => match esc.range() {
                    Some(r) => range = r,
                    None => warn!("Font '{}': unknown color escape {esc:?}.", self.name),
                },
                TextToken::Glyph(code) => {
                    let g = self.get_char(code, range);
                    if let Some(pic) = g.pic {
                        let (palette, tint) = self.color_translation(range);
                        out.push(PlacedGlyph {
                            code: g.code.unwrap_or(code),
                            x,
                            y,
                            pic,
                            range,
                            palette,
                            tint,
                            redirected: g.redirected,
                        });
                    }
                    x += g.width + self.global_kerning;
                }
            }
        }
        out
    }

    /* ---------------------------- translations ---------------------------- */

    /// Palette handle and tint for a range index; anything past the last
    /// range means untranslated. Tints only apply to fonts that can't be
    /// remapped and are white otherwise.
    pub fn color_translation_at(&self, index: usize) -> (Option<PaletteHandle>, PalEntry) {
        let index = if index < NUM_TEXT_COLORS {
            index
        } else {
            ColorRange::Untranslated.index()
        };
        let tint = if self.flags.contains(FontFlags::NO_TRANSLATE) {
            self.tints[index].with_alpha(255)
        } else {
            PalEntry::WHITE
        };
        if self.active_colors == 0 {
            return (None, tint);
        }
        (self.ranges.get(index).copied(), tint)
    }

    #[inline(always)]
    pub fn color_translation(&self, range: ColorRange) -> (Option<PaletteHandle>, PalEntry) {
        self.color_translation_at(range.index())
    }

    fn translated_pic_ids(&self) -> Vec<PicId> {
        let mut seen = vec![false; self.pics.len()];
        let mut ids = Vec::new();
        for pic in self.chars.iter().filter_map(|c| c.translated_pic) {
            if !std::mem::replace(&mut seen[pic.0 as usize], true) {
                ids.push(pic);
            }
        }
        ids
    }

    /// Adds the authored palette indices of every translated glyph to `used`.
    /// Remaps are lifted for the count and put back afterwards.
    pub fn record_all_texture_colors(&mut self, used: &mut [u32; 256]) {
        for id in self.translated_pic_ids() {
            let pic = &mut self.pics[id.0 as usize];
            let old = pic.reset_source_remap();
            record_texture_colors(&**pic, used);
            pic.set_source_remap(old);
        }
    }

    /// Rebuilds every range palette from the glyphs' colors and the font's
    /// translation style. The font is left untouched if anything fails.
    pub fn load_translations(
        &mut self,
        styles: &TranslationStyles,
        base: &BasePalette,
        backend: &mut dyn PaletteBackend,
    ) -> Result<(), FontError> {
        let style = styles
            .by_name(&self.translation_style)
            .ok_or_else(|| FontError::UnknownStyle(self.translation_style.clone()))?;
        let tints = ColorRange::ALL.map(|r| style.tint(r));

        if self.flags.contains(FontFlags::NO_TRANSLATE) {
            debug!("Font '{}': untranslatable, tinting only.", self.name);
            self.tints = tints;
            self.active_colors = 0;
            self.ranges.clear();
            return Ok(());
        }

        let mut used = [0u32; 256];
        self.record_all_texture_colors(&mut used);
        let st = simple_translation(&used, base);
        let ranges = build_translations(
            &st.luminosity,
            Some(&st.reverse),
            style.parms(),
            st.active_colors(),
            None,
            base,
            backend,
        )?;

        for id in self.translated_pic_ids() {
            self.pics[id.0 as usize].set_source_remap(Some(st.translation));
        }
        self.patch_remap = st.translation;
        self.active_colors = st.active_colors();
        self.ranges = ranges;
        self.tints = tints;
        debug!(
            "Font '{}': {} active colors, style '{}'.",
            self.name,
            self.active_colors,
            style.name()
        );
        Ok(())
    }

    /// Recolors the untranslated range to match another font's shading,
    /// given that font's color histogram. Untranslated text then always goes
    /// through the remap path.
    pub fn set_default_translation(
        &mut self,
        other_colors: &[u32; 256],
        base: &BasePalette,
        backend: &mut dyn PaletteBackend,
    ) -> Result<(), FontError> {
        if self.ranges.len() != NUM_TEXT_COLORS {
            warn!(
                "Font '{}' has no translations; default translation ignored.",
                self.name
            );
            return Ok(());
        }
        let mut mine = [0u32; 256];
        self.record_all_texture_colors(&mut mine);
        let my_st = simple_translation(&mine, base);
        let other_st = simple_translation(other_colors, base);
        let pal = match_palette(&my_st.luminosity, &other_st, base);
        let handle = backend.register_palette(&pal)?;

        let mut ranges = self.ranges.clone();
        ranges[ColorRange::Untranslated.index()] = handle;
        self.ranges = ranges;
        self.flags.insert(FontFlags::FORCE_REMAP);
        debug!("Font '{}': untranslated range matched, now {handle}.", self.name);
        Ok(())
    }

    /* ------------------------------ load passes ------------------------------ */

    /// Decides between uppercase-only and mixed case. A lone sharp s in an
    /// otherwise uppercase font is moved to the capital sharp s slot.
    fn check_case(&mut self) {
        let mut lowercount = 0usize;
        let mut uppercount = 0usize;
        for (i, ch) in self.chars.iter().enumerate() {
            let code = self.first_char + i as i32;
            if !is_cased(code) || ch.translated_pic.is_none() {
                continue;
            }
            if is_lower(code) {
                lowercount += 1;
            } else {
                uppercount += 1;
            }
        }
        self.flags.remove(FontFlags::MIXED_CASE);
        if lowercount == 0 {
            debug!("Font '{}': uppercase only ({uppercount} letters).", self.name);
            return;
        }

        if self.has_glyph(SHARP_S) {
            if self.last_char < CAPITAL_SHARP_S {
                self.chars
                    .resize((CAPITAL_SHARP_S - self.first_char + 1) as usize, Character::default());
                self.last_char = CAPITAL_SHARP_S;
            }
            if !self.has_glyph(CAPITAL_SHARP_S) {
                let lo = (SHARP_S - self.first_char) as usize;
                let hi = (CAPITAL_SHARP_S - self.first_char) as usize;
                self.chars.swap(lo, hi);
                lowercount -= 1;
                uppercount += 1;
                trace!("Font '{}': sharp s doubles as capital.", self.name);
            }
        }
        if lowercount > 0 {
            self.flags.insert(FontFlags::MIXED_CASE);
        }
        debug!(
            "Font '{}': {lowercount} lowercase / {uppercount} uppercase letters, mixed case: {}.",
            self.name,
            self.is_mixed_case()
        );
    }

    #[inline(always)]
    fn resolved_x_move(&self, code: i32) -> Option<i32> {
        self.character(code).and_then(|c| c.x_move)
    }

    /// Gives every code without an advance the advance of its uppercase or
    /// unaccented form, or the space width.
    fn fix_x_moves(&mut self) {
        for i in 0..self.chars.len() {
            let code = self.first_char + i as i32;
            if self.chars[i].x_move.is_none() {
                let upper = is_lower(code).then(|| upper_for_lower(code));
                let stripped = Some(strip_accent(code)).filter(|&c| c != code);
                let inherited = upper
                    .and_then(|c| self.resolved_x_move(c))
                    .or_else(|| stripped.and_then(|c| self.resolved_x_move(c)));
                self.chars[i].x_move = Some(inherited.unwrap_or(self.space_width));
            }
            let top = self.chars[i]
                .original_pic
                .and_then(|p| self.image(p))
                .map(|img| img.top_offset());
            if let Some(top) = top {
                self.displacement = self.displacement.max(top);
            }
        }
    }
}

/* ============================ BUILDER ============================ */

struct PendingGlyph {
    code: i32,
    original: Box<dyn GlyphImage>,
    /// `None` when the original doubles as the translated image.
    translated: Option<Box<dyn GlyphImage>>,
    x_move: Option<i32>,
}

/// Collects glyphs and metrics, then runs the load passes in order:
/// case detection, advance fixup, translations.
pub struct FontBuilder {
    name: String,
    glyphs: Vec<PendingGlyph>,
    space_width: Option<i32>,
    global_kerning: i32,
    font_height: Option<i32>,
    cursor: i32,
    no_translate: bool,
    translation_style: String,
}

impl FontBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            glyphs: Vec::new(),
            space_width: None,
            global_kerning: 0,
            font_height: None,
            cursor: DEFAULT_CURSOR,
            no_translate: false,
            translation_style: "normal".to_string(),
        }
    }

    fn push(
        &mut self,
        code: i32,
        original: Box<dyn GlyphImage>,
        translated: Option<Box<dyn GlyphImage>>,
        x_move: Option<i32>,
    ) {
        let code = if (-128..0).contains(&code) { code & 255 } else { code };
        if code < 0 {
            warn!("Font '{}': dropping glyph with negative code {code}.", self.name);
            return;
        }
        if let Some(pos) = self.glyphs.iter().position(|g| g.code == code) {
            debug!("Font '{}': glyph U+{code:04X} replaced.", self.name);
            self.glyphs.remove(pos);
        }
        self.glyphs.push(PendingGlyph {
            code,
            original,
            translated,
            x_move,
        });
    }

    /// Authored glyph plus its own remappable copy over the same pixels.
    /// `x_move` defaults to the image width.
    #[must_use]
    pub fn glyph(mut self, code: i32, glyph: IndexedGlyph, x_move: Option<i32>) -> Self {
        let translated = glyph.share();
        self.push(code, Box::new(glyph), Some(Box::new(translated)), x_move);
        self
    }

    /// One image serving as both authored and translated glyph.
    #[must_use]
    pub fn glyph_shared(
        mut self,
        code: i32,
        image: Box<dyn GlyphImage>,
        x_move: Option<i32>,
    ) -> Self {
        self.push(code, image, None, x_move);
        self
    }

    #[must_use]
    pub fn glyph_images(
        mut self,
        code: i32,
        original: Box<dyn GlyphImage>,
        translated: Box<dyn GlyphImage>,
        x_move: Option<i32>,
    ) -> Self {
        self.push(code, original, Some(translated), x_move);
        self
    }

    #[must_use]
    pub fn space_width(mut self, width: i32) -> Self {
        self.space_width = Some(width);
        self
    }

    #[must_use]
    pub fn global_kerning(mut self, kerning: i32) -> Self {
        self.global_kerning = kerning;
        self
    }

    #[must_use]
    pub fn font_height(mut self, height: i32) -> Self {
        self.font_height = Some(height);
        self
    }

    #[must_use]
    pub fn cursor(mut self, code: i32) -> Self {
        self.cursor = code;
        self
    }

    #[must_use]
    pub fn no_translate(mut self, no_translate: bool) -> Self {
        self.no_translate = no_translate;
        self
    }

    #[must_use]
    pub fn translation_style(mut self, style: &str) -> Self {
        self.translation_style = style.to_string();
        self
    }

    pub fn build(
        self,
        styles: &TranslationStyles,
        base: &BasePalette,
        backend: &mut dyn PaletteBackend,
    ) -> Result<Font, FontError> {
        let (Some(first_char), Some(last_char)) = (
            self.glyphs.iter().map(|g| g.code).min(),
            self.glyphs.iter().map(|g| g.code).max(),
        ) else {
            return Err(FontError::EmptyFont(self.name));
        };

        let mut chars = vec![Character::default(); (last_char - first_char + 1) as usize];
        let mut pics: Vec<Box<dyn GlyphImage>> = Vec::with_capacity(self.glyphs.len() * 2);
        let mut tallest = 0;
        for g in self.glyphs {
            tallest = tallest.max(g.original.height() as i32);
            let x_move = g.x_move.unwrap_or(g.original.width() as i32);
            let original = PicId(pics.len() as u32);
            pics.push(g.original);
            let translated = match g.translated {
                Some(t) => {
                    pics.push(t);
                    PicId(pics.len() as u32 - 1)
                }
                None => original,
            };
            chars[(g.code - first_char) as usize] = Character {
                original_pic: Some(original),
                translated_pic: Some(translated),
                x_move: Some(x_move),
            };
        }

        let space_width = self.space_width.unwrap_or_else(|| {
            let of = |c: char| {
                chars
                    .get((c as i32 - first_char) as usize)
                    .filter(|ch| ch.translated_pic.is_some())
                    .and_then(|ch| ch.x_move)
            };
            of(' ')
                .or_else(|| of('N').map(|w| (w + 1) / 2))
                .unwrap_or(FALLBACK_SPACE_WIDTH)
        });

        let mut font = Font {
            name: self.name,
            first_char,
            last_char,
            chars,
            pics,
            space_width,
            global_kerning: self.global_kerning,
            font_height: self.font_height.unwrap_or(tallest),
            cursor: self.cursor,
            displacement: 0,
            flags: if self.no_translate {
                FontFlags::NO_TRANSLATE
            } else {
                FontFlags::empty()
            },
            translation_style: self.translation_style,
            patch_remap: [0; 256],
            active_colors: 0,
            ranges: Vec::new(),
            tints: [PalEntry::WHITE; NUM_TEXT_COLORS],
        };
        font.check_case();
        font.fix_x_moves();
        font.load_translations(styles, base, backend)?;
        info!(
            "Font '{}' loaded: U+{:04X}..U+{:04X}, {} images, {} active colors.",
            font.name,
            font.first_char,
            font.last_char,
            font.pics.len(),
            font.active_colors
        );
        Ok(font)
    }
}

#[cfg(test)]
mod tests {
    use super::{Font, FontBuilder, FontFlags};
    use crate::assets::IndexedGlyph;
    use crate::core::gfx::PaletteBackend;
    use crate::core::gfx::backends::software::PaletteStore;
    use crate::error::FontError;
    use crate::ui::color::{BasePalette, ColorRange, PalEntry, pal_hex};
    use crate::ui::translation::TranslationStyles;

    fn solid(w: u32, h: u32, index: u8) -> IndexedGlyph {
        IndexedGlyph::from_indices(w, h, vec![index; (w * h) as usize]).expect("solid glyph")
    }

    fn build(builder: FontBuilder, store: &mut PaletteStore) -> Font {
        builder
            .build(&TranslationStyles::builtin(), &BasePalette::grayscale(), store)
            .expect("font builds")
    }

    fn code(c: char) -> i32 {
        c as i32
    }

    #[test]
    fn string_width_takes_widest_line() {
        let mut store = PaletteStore::new();
        let font = build(
            FontBuilder::new("metrics")
                .glyph(code('A'), solid(10, 8, 200), None)
                .glyph(code('B'), solid(8, 8, 200), None)
                .glyph(code('C'), solid(12, 8, 200), None)
                .global_kerning(1),
            &mut store,
        );
        assert_eq!(font.string_width("AB\nC"), 20);
        assert_eq!(font.string_width("C\nAB"), 20);
        assert_eq!(font.string_width("A\x1cgB"), 20, "escapes take no width");
        assert_eq!(font.string_width(""), 0);
    }

    #[test]
    fn uppercase_only_fonts_fold_then_strip_once() {
        let mut store = PaletteStore::new();
        let font = build(
            FontBuilder::new("caps")
                .glyph(code('A'), solid(6, 8, 100), None)
                .glyph(code('E'), solid(6, 8, 100), None)
                .glyph(code('U'), solid(6, 8, 100), None),
            &mut store,
        );
        assert!(!font.is_mixed_case());
        assert_eq!(font.get_char_code(code('a'), true), Some(code('A')));
        assert_eq!(font.get_char_code(0xE9, true), Some(code('E')), "é -> É -> E");
        assert_eq!(font.get_char_code(-23, true), Some(code('E')), "signed byte é");
        assert_eq!(font.get_char_code(code('b'), true), None);
        assert_eq!(font.get_char_code(0x1D8, true), None, "one strip step only");
        for _ in 0..3 {
            assert_eq!(font.get_char_code(code('a'), true), Some(code('A')));
        }
        assert_eq!(
            font.get_char_code(code('C'), false),
            Some(code('C')),
            "in range without glyph"
        );
    }

    #[test]
    fn mixed_case_fonts_chain_strips_before_folding() {
        let mut store = PaletteStore::new();
        let font = build(
            FontBuilder::new("mixed")
                .glyph(code('U'), solid(6, 8, 100), None)
                .glyph(code('a'), solid(5, 6, 100), None)
                .glyph(code('u'), solid(5, 6, 100), None)
                .glyph(code('E'), solid(6, 8, 100), None),
            &mut store,
        );
        assert!(font.is_mixed_case());
        assert_eq!(font.get_char_code(0x1D8, true), Some(code('u')), "ǘ -> ü -> u");
        assert_eq!(font.get_char_code(0xDC, true), Some(code('U')), "Ü -> U");
        assert_eq!(font.get_char_code(0xE9, true), Some(code('E')), "é: no e, so É -> E");
        assert_eq!(font.get_char_code(code('b'), true), None);
    }

    #[test]
    fn can_print_rejects_letters_needing_fallback() {
        let mut store = PaletteStore::new();
        let font = build(
            FontBuilder::new("caps")
                .glyph(code('E'), solid(6, 8, 100), None)
                .glyph(code('!'), solid(2, 8, 100), None),
            &mut store,
        );
        assert!(font.can_print("EE!\n\x1cge"), "lowercase folds on uppercase-only fonts");
        assert!(!font.can_print("É"));
        assert!(font.can_print("?"), "non-letters never fail");
    }

    #[test]
    fn fix_x_moves_resolves_every_advance() {
        let mut store = PaletteStore::new();
        let font = build(
            FontBuilder::new("gaps")
                .glyph(code('A'), solid(7, 8, 100), None)
                .glyph(code('E'), solid(9, 8, 100).with_top_offset(3), None)
                .glyph(code('c'), solid(5, 6, 100), Some(6))
                .glyph(0xCC, solid(4, 10, 100), None)
                .space_width(3),
            &mut store,
        );
        assert!(
            (font.first_char()..=font.last_char())
                .all(|c| font.character(c).is_some_and(|ch| ch.x_move.is_some()))
        );
        let x_move = |c: i32| font.character(c).and_then(|ch| ch.x_move);
        assert_eq!(x_move(code('a')), Some(7), "inherits from A");
        assert_eq!(x_move(code('B')), Some(3), "space width");
        assert_eq!(x_move(0xC9), Some(9), "É inherits from E");
        assert_eq!(x_move(code('c')), Some(6));
        assert_eq!(font.displacement(), 3);
        assert_eq!(font.char_width(code('Z')), 3);
    }

    #[test]
    fn sharp_s_moves_to_capital_slot_in_uppercase_fonts() {
        let mut store = PaletteStore::new();
        let font = build(
            FontBuilder::new("caps")
                .glyph(code('S'), solid(6, 8, 100), None)
                .glyph(0xDF, solid(6, 8, 100), Some(11)),
            &mut store,
        );
        assert!(!font.is_mixed_case());
        assert_eq!(font.last_char(), 0x1E9E);
        assert!(font.character(0x1E9E).is_some_and(|c| c.translated_pic.is_some()));
        assert_eq!(font.get_char_code(0xDF, true), Some(0x1E9E));
        assert_eq!(font.char_width(0xDF), 11);

        let font = build(
            FontBuilder::new("mixed")
                .glyph(code('S'), solid(6, 8, 100), None)
                .glyph(code('s'), solid(5, 6, 100), None)
                .glyph(0xDF, solid(6, 8, 100), None),
            &mut store,
        );
        assert!(font.is_mixed_case(), "other lowercase letters keep the font mixed");
        assert_eq!(font.get_char_code(0xDF, true), Some(0x1E9E));
    }

    #[test]
    fn untranslated_requests_redirect_to_authored_images() {
        let mut store = PaletteStore::new();
        let font = build(
            FontBuilder::new("split")
                .glyph(code('A'), solid(6, 8, 100), None)
                .glyph_shared(code('B'), Box::new(solid(6, 8, 150)), None),
            &mut store,
        );
        let a = font.get_char(code('A'), ColorRange::Untranslated);
        let ch = font.character(code('A')).copied().expect("A is in range");
        assert!(a.redirected);
        assert_eq!(a.pic, ch.original_pic);
        let red = font.get_char(code('A'), ColorRange::Red);
        assert!(!red.redirected);
        assert_eq!(red.pic, ch.translated_pic);
        assert!(!font.get_char(code('B'), ColorRange::Untranslated).redirected);

        let missing = font.get_char(code('Q'), ColorRange::Red);
        assert_eq!((missing.pic, missing.width), (None, font.space_width()));
    }

    #[test]
    fn translations_remap_glyphs_into_luminosity_order() {
        let mut store = PaletteStore::new();
        let mut font = build(
            FontBuilder::new("two-tone")
                .glyph(
                    code('A'),
                    IndexedGlyph::from_indices(2, 1, vec![200, 40]).expect("2x1"),
                    None,
                ),
            &mut store,
        );
        assert_eq!(font.active_colors(), 3);
        assert_eq!(font.patch_remap()[40], 1);
        assert_eq!(font.patch_remap()[200], 2);

        let lookup = font.get_char(code('A'), ColorRange::Red);
        let img = lookup.pic.and_then(|p| font.image(p)).expect("translated image");
        let mut px = vec![0u8; img.pixel_count()];
        img.create_8bit_pixels(&mut px);
        assert_eq!(px, vec![2, 1]);

        let mut used = [0u32; 256];
        font.record_all_texture_colors(&mut used);
        assert_eq!((used[40], used[200], used[1]), (1, 1, 0), "counts authored indices");
        let img = lookup.pic.and_then(|p| font.image(p)).expect("translated image");
        img.create_8bit_pixels(&mut px);
        assert_eq!(px, vec![2, 1], "remap restored after counting");

        let (handle, tint) = font.color_translation(ColorRange::Untranslated);
        let pal = store.palette(handle.expect("untranslated handle")).expect("registered");
        assert_eq!(pal[0].a, 0);
        assert_eq!(pal[1], PalEntry::rgb(40, 40, 40));
        assert_eq!(tint, PalEntry::WHITE);
        assert_eq!(
            font.color_translation_at(999).0,
            font.color_translation(ColorRange::Untranslated).0
        );
        let red = store
            .palette(font.color_translation(ColorRange::Red).0.expect("red handle"))
            .expect("registered");
        assert_eq!(red[2], pal_hex("#FF0000"));
    }

    #[test]
    fn no_translate_fonts_only_tint() {
        let mut store = PaletteStore::new();
        let font = build(
            FontBuilder::new("flat")
                .glyph(code('A'), solid(6, 8, 100), None)
                .no_translate(true),
            &mut store,
        );
        assert!(font.flags().contains(FontFlags::NO_TRANSLATE));
        assert_eq!(font.active_colors(), 0);
        assert_eq!(font.color_translation(ColorRange::Red), (None, pal_hex("#FF0000")));
        assert_eq!(font.color_translation(ColorRange::Untranslated), (None, PalEntry::WHITE));
        assert!(store.is_empty());
    }

    #[test]
    fn default_translation_forces_remap_path() {
        let mut store = PaletteStore::new();
        let mut font = build(
            FontBuilder::new("replacement").glyph(code('A'), solid(6, 8, 100), None),
            &mut store,
        );
        let before = font.color_translation(ColorRange::Untranslated).0;
        let mut other = [0u32; 256];
        other[30] = 5;
        other[220] = 5;
        font.set_default_translation(&other, &BasePalette::grayscale(), &mut store)
            .expect("matched palette registers");

        assert!(font.flags().contains(FontFlags::FORCE_REMAP));
        assert!(!font.get_char(code('A'), ColorRange::Untranslated).redirected);
        let after = font.color_translation(ColorRange::Untranslated).0;
        assert_ne!(before, after);
        let pal = store.palette(after.expect("handle")).expect("registered");
        assert_eq!(pal[0].a, 0);
        assert_eq!(pal[1], PalEntry::rgb(220, 220, 220), "single level matches the top");
    }

    #[test]
    fn layout_follows_escapes_and_lines() {
        let mut store = PaletteStore::new();
        let font = build(
            FontBuilder::new("layout")
                .glyph(code('A'), solid(6, 8, 100), None)
                .glyph(code('0'), solid(5, 7, 100).with_top_offset(7), None)
                .glyph(code('q'), solid(5, 9, 100).with_top_offset(5), None)
                .global_kerning(1)
                .font_height(10),
            &mut store,
        );
        let placed = font.layout("A\x1cgA\nA ", ColorRange::Untranslated);
        assert_eq!(placed.len(), 3, "unknown glyphs advance but aren't placed");
        assert_eq!(
            (placed[0].x, placed[0].y, placed[0].range),
            (0, 0, ColorRange::Untranslated)
        );
        assert!(placed[0].redirected);
        assert_eq!((placed[1].x, placed[1].range), (7, ColorRange::Red));
        assert_eq!(placed[1].palette, font.color_translation(ColorRange::Red).0);
        assert_eq!((placed[2].x, placed[2].y, placed[2].range), (0, 10, ColorRange::Red));

        assert_eq!(font.max_ascender("A0q\n0"), 7);
        assert_eq!(font.max_ascender("Aq"), 5);
        assert_eq!(font.bottom_align_offset(code('q')), 5);
        assert_eq!(font.cursor_width(), font.space_width(), "no '_' glyph");
    }

    #[test]
    fn empty_and_misconfigured_fonts_fail_to_load() {
        let mut store = PaletteStore::new();
        let styles = TranslationStyles::builtin();
        let base = BasePalette::grayscale();
        assert!(matches!(
            FontBuilder::new("nothing").build(&styles, &base, &mut store),
            Err(FontError::EmptyFont(_))
        ));
        assert!(matches!(
            FontBuilder::new("odd")
                .glyph(code('A'), solid(6, 8, 100), None)
                .translation_style("neon")
                .build(&styles, &base, &mut store),
            Err(FontError::UnknownStyle(_))
        ));
        let mut tiny = PaletteStore::with_capacity_limit(2);
        assert!(matches!(
            FontBuilder::new("big")
                .glyph(code('A'), solid(6, 8, 100), None)
                .build(&styles, &base, &mut tiny),
            Err(FontError::Palette(_))
        ));
    }

    fn translated_pixels(font: &Font) -> Vec<u8> {
        let pic = font.get_char(code('A'), ColorRange::Red).pic;
        let img = pic.and_then(|p| font.image(p)).expect("translated image");
        let mut px = vec![0u8; img.pixel_count()];
        img.create_8bit_pixels(&mut px);
        px
    }

    #[test]
    fn failed_reloads_leave_the_font_untouched() {
        let mut store = PaletteStore::new();
        let styles = TranslationStyles::builtin();
        let mut font = build(
            FontBuilder::new("steady").glyph(
                code('A'),
                IndexedGlyph::from_indices(3, 1, vec![200, 40, 120]).expect("3x1"),
                None,
            ),
            &mut store,
        );
        let handles = ColorRange::ALL.map(|r| font.color_translation(r));
        let remap = *font.patch_remap();
        let active = font.active_colors();
        let pixels = translated_pixels(&font);
        assert_eq!(pixels, vec![3, 1, 2]);

        let mut inverted = [PalEntry::TRANSPARENT; 256];
        for (i, e) in inverted.iter_mut().enumerate() {
            let v = 255 - i as u8;
            *e = PalEntry::rgb(v, v, v);
        }
        let inverted = BasePalette::new(inverted);
        let mut tiny = PaletteStore::with_capacity_limit(1);
        assert!(matches!(
            font.load_translations(&styles, &inverted, &mut tiny),
            Err(FontError::Palette(_))
        ));

        assert_eq!(ColorRange::ALL.map(|r| font.color_translation(r)), handles);
        assert_eq!(font.patch_remap(), &remap);
        assert_eq!(font.active_colors(), active);
        assert_eq!(translated_pixels(&font), pixels);

        let mut other = [0u32; 256];
        other[30] = 1;
        other[220] = 1;
        let mut full = PaletteStore::with_capacity_limit(0);
        assert!(matches!(
            font.set_default_translation(&other, &BasePalette::grayscale(), &mut full),
            Err(FontError::Palette(_))
        ));
        assert!(!font.flags().contains(FontFlags::FORCE_REMAP));
        assert_eq!(ColorRange::ALL.map(|r| font.color_translation(r)), handles);
        assert_eq!(translated_pixels(&font), pixels);
    }
}
