//! Font color translations.
//! - Palette analysis: which base palette indices a font's glyphs actually use
//! - Luminosity sort: used colors packed into 1..N, darkest first, with a
//!   normalized 0.0..=1.0 brightness per compact index
//! - Ramp synthesis: one 256-entry palette per named color range, interpolated
//!   from luminosity breakpoints
//! - Cross-font matching: recolor one font into another font's shading
//! - Style tables: builtin, INI and JSON breakpoint tables, validated at load

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;

use log::{debug, trace, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::assets::GlyphImage;
use crate::core::gfx::{PaletteBackend, PaletteHandle};
use crate::error::FontError;
use crate::ui::color::{BasePalette, ColorRange, NUM_TEXT_COLORS, PalEntry, Palette, pal_hex};

/// Upper bound of the integer luminosity scale breakpoints are authored in.
pub const LUMINOSITY_SCALE: i32 = 256;

/// Every range except `Untranslated` carries a ramp.
pub const NUM_RAMPS: usize = NUM_TEXT_COLORS - 1;

/* ======================= TYPES ======================= */

/// One linear segment of a luminosity -> RGB ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationParm {
    pub range_start: i32,
    pub range_end: i32,
    pub start: [u8; 3],
    pub end: [u8; 3],
}

impl TranslationParm {
    pub const fn new(range_start: i32, range_end: i32, start: PalEntry, end: PalEntry) -> Self {
        Self {
            range_start,
            range_end,
            start: start.to_rgb(),
            end: end.to_rgb(),
        }
    }

    #[inline(always)]
    pub const fn contains(&self, v: i32) -> bool {
        self.range_start <= v && self.range_end >= v
    }

    /// 8-bit fixed-point blend between `start` and `end` at luminosity `v`.
    /// A breakpoint without positive width yields its `start` color.
    #[inline(always)]
    pub fn color_at(&self, v: i32) -> PalEntry {
        let width = self.range_end - self.range_start;
        if width <= 0 {
            return PalEntry::from_rgb(self.start);
        }
        let rangev = ((v - self.range_start) << 8) / width;
        let blend = |c: usize| {
            let s = i32::from(self.start[c]);
            let e = i32::from(self.end[c]);
            (((s << 8) + rangev * (e - s)) >> 8).clamp(0, 255) as u8
        };
        PalEntry::rgb(blend(0), blend(1), blend(2))
    }
}

/// Index one past the last breakpoint of the ramp starting at `start`.
/// A breakpoint continues the current ramp only if it starts above where the
/// previous one ended.
#[inline(always)]
fn ramp_end(parms: &[TranslationParm], start: usize) -> usize {
    let mut i = start;
    while i + 1 < parms.len() && parms[i + 1].range_start > parms[i].range_end {
        i += 1;
    }
    i + 1
}

/* ======================= PALETTE ANALYZER ======================= */

/// Adds one count per pixel to `used`, indexed by the pixel's palette index
/// as currently decoded.
pub fn record_texture_colors(pic: &dyn GlyphImage, used: &mut [u32; 256]) {
    let mut pixels = vec![0u8; pic.pixel_count()];
    pic.create_8bit_pixels(&mut pixels);
    for &p in &pixels {
        used[p as usize] += 1;
    }
}

/* ======================= LUMINOSITY SORTER ======================= */

/// Result of packing a color histogram into luminosity order.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleTranslation {
    /// original index -> compact index (0 for unused).
    pub translation: [u8; 256],
    /// compact index -> original index.
    pub reverse: [u8; 256],
    /// `[0]` is the transparent slot; `[1..]` is darkest (0.0) to brightest (1.0).
    pub luminosity: Vec<f64>,
}

impl SimpleTranslation {
    /// Compact colors plus the transparent slot.
    #[inline(always)]
    pub fn active_colors(&self) -> usize {
        self.luminosity.len()
    }
}

/// Packs every used, non-zero palette index into 1..=N sorted by brightness.
/// A font whose colors all share one brightness gets 1.0 for all of them.
pub fn simple_translation(colors_used: &[u32; 256], base: &BasePalette) -> SimpleTranslation {
    let mut order: Vec<u8> = (1..=255u8).filter(|&i| colors_used[i as usize] != 0).collect();
    order.sort_by_key(|&i| base.get(i).luma_key());

    let mut translation = [0u8; 256];
    let mut reverse = [0u8; 256];
    let mut luminosity = Vec::with_capacity(order.len() + 1);
    luminosity.push(0.0);

    let mut min = f64::MAX;
    let mut max = f64::MIN;
    for (slot, &orig) in order.iter().enumerate() {
        let compact = slot + 1;
        translation[orig as usize] = compact as u8;
        reverse[compact] = orig;
        let lum = base.get(orig).luminance();
        min = min.min(lum);
        max = max.max(lum);
        luminosity.push(lum);
    }

    if max > min {
        let diver = 1.0 / (max - min);
        for lum in luminosity.iter_mut().skip(1) {
            *lum = (*lum - min) * diver;
        }
    } else if !order.is_empty() {
        debug!(
            "{} used color(s) share one luminosity; mapping all to 1.0.",
            order.len()
        );
        for lum in luminosity.iter_mut().skip(1) {
            *lum = 1.0;
        }
    }

    SimpleTranslation {
        translation,
        reverse,
        luminosity,
    }
}

/* ======================= TRANSLATION BUILDER ======================= */

/// Palette for one ramp: compact index j gets the ramp color at
/// `round(luminosity[j] * 256)`.
pub fn ramp_palette(luminosity: &[f64], ramp: &[TranslationParm], active_colors: usize) -> Palette {
    let mut pal = [PalEntry::TRANSPARENT; 256];
    let Some(last) = ramp.last() else {
        return pal;
    };
    for (j, &lum) in luminosity.iter().enumerate().take(active_colors.min(256)).skip(1) {
        let v = (lum * f64::from(LUMINOSITY_SCALE)).round() as i32;
        let parm = ramp.iter().find(|p| p.contains(v)).unwrap_or(last);
        pal[j] = parm.color_at(v);
    }
    pal
}

/// The untranslated palette: authored colors through `identity`, or an
/// explicit override. Entry 0 always ends up transparent.
pub fn untranslated_palette(
    identity: Option<&[u8; 256]>,
    palette: Option<&Palette>,
    active_colors: usize,
    base: &BasePalette,
) -> Palette {
    let mut pal = match (identity, palette) {
        (Some(_), Some(over)) => *over,
        (Some(identity), None) => {
            let mut pal = [PalEntry::TRANSPARENT; 256];
            pal[0] = base.get(identity[0]);
            for j in 1..active_colors.min(256) {
                pal[j] = base.get(identity[j]).with_alpha(255);
            }
            pal
        }
        (None, _) => *base.entries(),
    };
    pal[0] = pal[0].with_alpha(0);
    pal
}

/// One palette per color range, in `ColorRange` order. `parms` is a flat
/// breakpoint table holding the ramps of every range except `Untranslated`.
pub fn synthesize_palettes(
    luminosity: &[f64],
    identity: Option<&[u8; 256]>,
    parms: &[TranslationParm],
    active_colors: usize,
    palette: Option<&Palette>,
    base: &BasePalette,
) -> Result<Vec<Palette>, FontError> {
    validate_parms("<table>", parms)?;

    let mut out = Vec::with_capacity(NUM_TEXT_COLORS);
    let mut cursor = 0usize;
    for range in ColorRange::ALL {
        if range == ColorRange::Untranslated {
            out.push(untranslated_palette(identity, palette, active_colors, base));
            continue;
        }
        let end = ramp_end(parms, cursor);
        let ramp = &parms[cursor..end];
        trace!(
            "Range '{}': {} breakpoint(s), {} color(s).",
            range.name(),
            ramp.len(),
            active_colors
        );
        out.push(ramp_palette(luminosity, ramp, active_colors));
        cursor = end;
    }
    Ok(out)
}

/// Synthesizes every range palette and registers them with the backend.
/// Handles come back indexed by `ColorRange::index()`; nothing is returned
/// unless all of them registered.
pub fn build_translations(
    luminosity: &[f64],
    identity: Option<&[u8; 256]>,
    parms: &[TranslationParm],
    active_colors: usize,
    palette: Option<&Palette>,
    base: &BasePalette,
    backend: &mut dyn PaletteBackend,
) -> Result<Vec<PaletteHandle>, FontError> {
    let palettes = synthesize_palettes(luminosity, identity, parms, active_colors, palette, base)?;
    let mut handles = Vec::with_capacity(palettes.len());
    for pal in &palettes {
        handles.push(backend.register_palette(pal)?);
    }
    Ok(handles)
}

/* ======================= CROSS-FONT MATCHING ======================= */

/// Palette that shades compact colors of one font (`mine`, its luminosity
/// array) with the colors of another font at the same relative brightness.
pub fn match_palette(mine: &[f64], other: &SimpleTranslation, base: &BasePalette) -> Palette {
    let mut pal = [PalEntry::TRANSPARENT; 256];
    let other_lum = &other.luminosity;
    for (l, &my) in mine.iter().enumerate().take(256).skip(1) {
        for o in 1..other_lum.len().saturating_sub(1) {
            let (lo, hi) = (other_lum[o], other_lum[o + 1]);
            if my < lo || my > hi {
                continue;
            }
            let c1 = base.get(other.reverse[o]);
            let c2 = base.get(other.reverse[o + 1]);
            let weight = if lo != hi { (my - lo) / (hi - lo) } else { 0.0 };
            let mix = |a: u8, b: u8| {
                let a = f64::from(a);
                ((a + weight * (f64::from(b) - a)) as i32).clamp(0, 255) as u8
            };
            pal[l] = PalEntry::rgb(mix(c1.r, c2.r), mix(c1.g, c2.g), mix(c1.b, c2.b));
            break;
        }
    }
    pal
}

/* ======================= VALIDATION ======================= */

/// Checks a flat breakpoint table: no zero-width breakpoints, each ramp
/// gapless and spanning 0..=256, exactly one ramp per translatable range.
/// Returns the index ranges of the ramps.
fn validate_parms(style: &str, parms: &[TranslationParm]) -> Result<Vec<Range<usize>>, FontError> {
    let mut ramps = Vec::with_capacity(NUM_RAMPS);
    let mut cursor = 0usize;
    while cursor < parms.len() {
        let end = ramp_end(parms, cursor);
        ramps.push(cursor..end);
        cursor = end;
    }
    if ramps.len() != NUM_RAMPS {
        return Err(FontError::RampCountMismatch {
            style: style.to_string(),
            expected: NUM_RAMPS,
            found: ramps.len(),
        });
    }

    let translatable = ColorRange::ALL
        .iter()
        .copied()
        .filter(|&r| r != ColorRange::Untranslated);
    for (range, span) in translatable.zip(&ramps) {
        let ramp = &parms[span.clone()];
        for p in ramp {
            if p.range_end == p.range_start {
                return Err(FontError::ZeroWidthBreakpoint {
                    style: style.to_string(),
                    range,
                    at: p.range_start,
                });
            }
        }
        for pair in ramp.windows(2) {
            if pair[1].range_start != pair[0].range_end + 1 {
                return Err(FontError::BreakpointGap {
                    style: style.to_string(),
                    range,
                    after: pair[0].range_end,
                    next: pair[1].range_start,
                });
            }
        }
        let (first, last) = (ramp[0], ramp[ramp.len() - 1]);
        if first.range_start != 0 || last.range_end != LUMINOSITY_SCALE {
            return Err(FontError::IncompleteRamp {
                style: style.to_string(),
                range,
                start: first.range_start,
                end: last.range_end,
            });
        }
    }
    Ok(ramps)
}

/* ======================= STYLE TABLES ======================= */

type Ramp = SmallVec<[TranslationParm; 4]>;

/// A named, validated breakpoint table ("normal", "console", ...).
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationStyle {
    name: String,
    parms: Vec<TranslationParm>,
    ramps: Vec<Range<usize>>,
}

impl TranslationStyle {
    /// Builds from a flat table in `ColorRange` order (`Untranslated` skipped).
    pub fn from_parms(name: &str, parms: Vec<TranslationParm>) -> Result<Self, FontError> {
        let ramps = validate_parms(name, &parms)?;
        Ok(Self {
            name: name.to_string(),
            parms,
            ramps,
        })
    }

    fn from_ramps(name: &str, ramps: &[Ramp]) -> Result<Self, FontError> {
        let mut parms = Vec::new();
        for (range, ramp) in ColorRange::ALL.iter().zip(ramps) {
            if *range == ColorRange::Untranslated {
                continue;
            }
            if ramp.is_empty() {
                return Err(FontError::UnknownColorRange(format!(
                    "{name}.{} has no breakpoints",
                    range.name()
                )));
            }
            parms.extend_from_slice(ramp);
        }
        Self::from_parms(name, parms)
    }

    fn to_ramps(&self) -> Vec<Ramp> {
        let mut out = vec![Ramp::new(); NUM_TEXT_COLORS];
        for range in ColorRange::ALL {
            if let Some(ramp) = self.ramp(range) {
                out[range.index()] = Ramp::from_slice(ramp);
            }
        }
        out
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The flat breakpoint table, as consumed by [`build_translations`].
    #[inline(always)]
    pub fn parms(&self) -> &[TranslationParm] {
        &self.parms
    }

    pub fn ramp(&self, range: ColorRange) -> Option<&[TranslationParm]> {
        let slot = match range.index().cmp(&ColorRange::Untranslated.index()) {
            std::cmp::Ordering::Less => range.index(),
            std::cmp::Ordering::Equal => return None,
            std::cmp::Ordering::Greater => range.index() - 1,
        };
        self.ramps.get(slot).map(|span| &self.parms[span.clone()])
    }

    /// Flat color for fonts that can't be remapped: the ramp's brightest end.
    pub fn tint(&self, range: ColorRange) -> PalEntry {
        self.ramp(range)
            .and_then(|r| r.last())
            .map_or(PalEntry::WHITE, |p| PalEntry::from_rgb(p.end))
    }
}

const fn bp(start: i32, end: i32, from: &str, to: &str) -> TranslationParm {
    TranslationParm::new(start, end, pal_hex(from), pal_hex(to))
}

const NORMAL_RAMPS: &[(ColorRange, &[TranslationParm])] = &[
    (ColorRange::Brick, &[bp(0, 256, "#470000", "#A35C5C")]),
    (ColorRange::Tan, &[bp(0, 256, "#332B13", "#FFEBDF")]),
    (ColorRange::Gray, &[bp(0, 256, "#272727", "#EFEFEF")]),
    (ColorRange::Green, &[bp(0, 256, "#0B1700", "#77FF6F")]),
    (ColorRange::Brown, &[bp(0, 256, "#532B17", "#BF7B4B")]),
    (ColorRange::Gold, &[bp(0, 256, "#732B00", "#FFFF73")]),
    (ColorRange::Red, &[bp(0, 256, "#3F0000", "#FF0000")]),
    (ColorRange::Blue, &[bp(0, 256, "#00007F", "#6060FF")]),
    (ColorRange::Orange, &[bp(0, 256, "#200000", "#FF8000")]),
    (ColorRange::White, &[bp(0, 256, "#242424", "#FFFFFF")]),
    (ColorRange::Yellow, &[bp(0, 256, "#271C00", "#FFEF3F")]),
    (ColorRange::Black, &[bp(0, 256, "#131313", "#505050")]),
    (ColorRange::LightBlue, &[bp(0, 256, "#000073", "#B4B4FF")]),
    (ColorRange::Cream, &[bp(0, 256, "#CF8353", "#FFD7BB")]),
    (ColorRange::Olive, &[bp(0, 256, "#2F371F", "#7B7F50")]),
    (ColorRange::DarkGreen, &[bp(0, 256, "#0B1300", "#509F47")]),
    (ColorRange::DarkRed, &[bp(0, 256, "#0B0000", "#A70000")]),
    (ColorRange::DarkBrown, &[bp(0, 256, "#1F170B", "#A3733F")]),
    (ColorRange::Purple, &[bp(0, 256, "#230023", "#CF00CF")]),
    (ColorRange::DarkGray, &[bp(0, 256, "#111111", "#8B8B8B")]),
    (ColorRange::Cyan, &[bp(0, 256, "#001F1F", "#00F0F0")]),
    (
        ColorRange::Ice,
        &[bp(0, 94, "#343450", "#7C7C98"), bp(95, 256, "#7C7C98", "#E0E0E0")],
    ),
    (
        ColorRange::Fire,
        &[bp(0, 104, "#660000", "#D57604"), bp(105, 256, "#D57604", "#FFFF00")],
    ),
    (
        ColorRange::Sapphire,
        &[bp(0, 94, "#000468", "#506CFC"), bp(95, 256, "#506CFC", "#50ECFC")],
    ),
    (
        ColorRange::Teal,
        &[bp(0, 90, "#001F1F", "#00807F"), bp(91, 256, "#00807F", "#A0FFF0")],
    ),
];

#[inline(always)]
fn lighten(c: [u8; 3]) -> [u8; 3] {
    c.map(|v| v + (255 - v) / 2)
}

/// Console text: each ramp reaches its normal top color at mid brightness
/// and washes out toward white above it.
fn console_ramps(normal: &[Ramp]) -> Vec<Ramp> {
    normal
        .iter()
        .map(|ramp| {
            let (Some(first), Some(last)) = (ramp.first(), ramp.last()) else {
                return Ramp::new();
            };
            let mut out = Ramp::new();
            out.push(TranslationParm {
                range_start: 0,
                range_end: 127,
                start: first.start,
                end: last.end,
            });
            out.push(TranslationParm {
                range_start: 128,
                range_end: LUMINOSITY_SCALE,
                start: last.end,
                end: lighten(last.end),
            });
            out
        })
        .collect()
}

fn normal_ramps() -> Vec<Ramp> {
    let mut out = vec![Ramp::new(); NUM_TEXT_COLORS];
    for (range, ramp) in NORMAL_RAMPS {
        out[range.index()] = Ramp::from_slice(ramp);
    }
    out
}

/// Every loaded style, addressable by index or (case-insensitive) name.
#[derive(Debug, Clone)]
pub struct TranslationStyles {
    styles: Vec<TranslationStyle>,
    by_name: FxHashMap<String, usize>,
}

type StyleOverlay = BTreeMap<String, BTreeMap<String, Vec<TranslationParm>>>;

impl TranslationStyles {
    pub const NORMAL: usize = 0;
    pub const CONSOLE: usize = 1;

    /// The compiled-in "normal" and "console" styles.
    pub fn builtin() -> Self {
        let normal = normal_ramps();
        let console = console_ramps(&normal);
        let mut styles = Self {
            styles: Vec::new(),
            by_name: FxHashMap::default(),
        };
        for (name, ramps) in [("normal", normal), ("console", console)] {
            match TranslationStyle::from_ramps(name, &ramps) {
                Ok(style) => styles.insert(style),
                Err(e) => warn!("Builtin translation style '{name}' rejected: {e}"),
            }
        }
        styles
    }

    fn insert(&mut self, style: TranslationStyle) {
        let key = style.name.to_ascii_lowercase();
        if let Some(&idx) = self.by_name.get(&key) {
            self.styles[idx] = style;
        } else {
            self.by_name.insert(key, self.styles.len());
            self.styles.push(style);
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<&TranslationStyle> {
        self.styles.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.trim().to_ascii_lowercase()).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&TranslationStyle> {
        self.index_of(name).and_then(|i| self.get(i))
    }

    /// Replaces the named ramps of the named styles. Unknown style names start
    /// as a copy of "normal". Every touched style is revalidated.
    fn overlay(&mut self, overlay: StyleOverlay) -> Result<(), FontError> {
        for (style_name, ranges) in overlay {
            let base = self
                .by_name(&style_name)
                .or_else(|| self.get(Self::NORMAL))
                .ok_or_else(|| FontError::UnknownStyle(style_name.clone()))?;
            let mut ramps = base.to_ramps();
            for (range_name, mut parms) in ranges {
                let range: ColorRange = range_name
                    .parse()
                    .map_err(|()| FontError::UnknownColorRange(range_name.clone()))?;
                if range == ColorRange::Untranslated {
                    warn!("Style '{style_name}': untranslated has no ramp; ignoring.");
                    continue;
                }
                parms.sort_by_key(|p| p.range_start);
                ramps[range.index()] = Ramp::from_vec(parms);
            }
            let style = TranslationStyle::from_ramps(&style_name.to_ascii_lowercase(), &ramps)?;
            debug!("Translation style '{}' loaded.", style.name());
            self.insert(style);
        }
        Ok(())
    }

    /// INI overlay: `[style.range]` sections, `start-end = rrggbb rrggbb` keys.
    pub fn load_ini_str(&mut self, text: &str) -> Result<(), FontError> {
        let ini = ini::Ini::load_from_str(text)?;
        let mut overlay = StyleOverlay::new();
        for (section, props) in ini.iter() {
            let Some(section) = section else {
                continue;
            };
            let Some((style, range)) = section.rsplit_once('.') else {
                return Err(FontError::Config(format!(
                    "section '[{section}]' is not <style>.<range>"
                )));
            };
            let parms = overlay
                .entry(style.trim().to_string())
                .or_default()
                .entry(range.trim().to_string())
                .or_default();
            for (key, value) in props.iter() {
                parms.push(parse_breakpoint(key, value)?);
            }
        }
        self.overlay(overlay)
    }

    /// JSON overlay: `{ "style": { "range": [ TranslationParm, ... ] } }`.
    pub fn load_json_str(&mut self, text: &str) -> Result<(), FontError> {
        let overlay: StyleOverlay = serde_json::from_str(text)?;
        self.overlay(overlay)
    }

    /// Builtin styles plus the file's overlay; format chosen by extension.
    pub fn load(path: &Path) -> Result<Self, FontError> {
        let text = std::fs::read_to_string(path)?;
        let mut styles = Self::builtin();
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            styles.load_json_str(&text)?;
        } else {
            styles.load_ini_str(&text)?;
        }
        debug!(
            "Loaded translation styles from '{}' ({} total).",
            path.display(),
            styles.len()
        );
        Ok(styles)
    }
}

impl Default for TranslationStyles {
    fn default() -> Self {
        Self::builtin()
    }
}

/// `"0-128"`, `"000000 7f7f7f"` -> breakpoint.
fn parse_breakpoint(key: &str, value: &str) -> Result<TranslationParm, FontError> {
    let bad = || FontError::InvalidBreakpoint(format!("{key} = {value}"));
    let (a, b) = key.split_once('-').ok_or_else(bad)?;
    let range_start: i32 = a.trim().parse().map_err(|_| bad())?;
    let range_end: i32 = b.trim().parse().map_err(|_| bad())?;

    let mut colors = value.split_whitespace();
    let (Some(from), Some(to), None) = (colors.next(), colors.next(), colors.next()) else {
        return Err(bad());
    };
    let from = crate::ui::color::parse_hex_color(from)
        .ok_or_else(|| FontError::InvalidColor(from.to_string()))?;
    let to = crate::ui::color::parse_hex_color(to)
        .ok_or_else(|| FontError::InvalidColor(to.to_string()))?;
    Ok(TranslationParm::new(range_start, range_end, from, to))
}
