use serde::{Deserialize, Serialize};
use std::str::FromStr;

/* =========================== PALETTE ENTRIES =========================== */

/// One palette slot. Alpha 0 marks the slot as transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PalEntry {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// A full 256-slot indexed palette, as submitted to the rendering backend.
pub type Palette = [PalEntry; 256];

impl PalEntry {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    #[inline(always)]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[inline(always)]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline(always)]
    pub const fn from_rgb(rgb: [u8; 3]) -> Self {
        Self::rgb(rgb[0], rgb[1], rgb[2])
    }

    #[inline(always)]
    pub const fn to_rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    #[inline(always)]
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Integer form of the perceptual weighting, used as a sort key.
    #[inline(always)]
    pub const fn luma_key(self) -> u32 {
        self.r as u32 * 299 + self.g as u32 * 587 + self.b as u32 * 114
    }

    /// Perceptual brightness on a 0..=255 scale (R*0.299 + G*0.587 + B*0.114).
    #[inline(always)]
    pub fn luminance(self) -> f64 {
        f64::from(self.luma_key()) / 1000.0
    }
}

/// Accepts "#rgb", "#rrggbb" (or without '#').
/// Panics on invalid input; use only with trusted literals.
/// Evaluated at COMPILE TIME if assigned to a const/static.
pub const fn pal_hex(s: &str) -> PalEntry {
    let bytes = s.as_bytes();

    let (bytes, len) = if !bytes.is_empty() && bytes[0] == b'#' {
        let (_, rem) = bytes.split_at(1);
        (rem, s.len() - 1)
    } else {
        (bytes, s.len())
    };

    const fn val(b: u8) -> u8 {
        match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => 10 + (b - b'a'),
            b'A'..=b'F' => 10 + (b - b'A'),
            _ => panic!("invalid hex digit in color string"),
        }
    }

    const fn byte2(h: u8, l: u8) -> u8 {
        (val(h) << 4) | val(l)
    }

    // Expand 4-bit color to 8-bit (e.g. F -> FF)
    const fn rep(n: u8) -> u8 {
        (val(n) << 4) | val(n)
    }

    match len {
        3 => PalEntry::rgb(rep(bytes[0]), rep(bytes[1]), rep(bytes[2])),
        6 => PalEntry::rgb(
            byte2(bytes[0], bytes[1]),
            byte2(bytes[2], bytes[3]),
            byte2(bytes[4], bytes[5]),
        ),
        _ => panic!("color hex string must be 3 or 6 digits"),
    }
}

/// Runtime counterpart of [`pal_hex`] for config data. Never panics.
pub fn parse_hex_color(s: &str) -> Option<PalEntry> {
    let t = s.trim();
    let t = t.strip_prefix('#').unwrap_or(t);
    if !t.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    match t.len() {
        3 => {
            let v = u16::from_str_radix(t, 16).ok()?;
            let nib = |shift: u16| ((v >> shift) & 0xF) as u8 * 0x11;
            Some(PalEntry::rgb(nib(8), nib(4), nib(0)))
        }
        6 => {
            let v = u32::from_str_radix(t, 16).ok()?;
            Some(PalEntry::rgb((v >> 16) as u8, (v >> 8) as u8, v as u8))
        }
        _ => None,
    }
}

/* =========================== BASE PALETTE =========================== */

/// The global 256-color palette that glyph pixel indices refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePalette {
    entries: Palette,
}

impl BasePalette {
    pub const fn new(entries: Palette) -> Self {
        Self { entries }
    }

    /// Index `i` is the gray `(i, i, i)`.
    pub fn grayscale() -> Self {
        let mut entries = [PalEntry::TRANSPARENT; 256];
        for (i, e) in entries.iter_mut().enumerate() {
            let v = i as u8;
            *e = PalEntry::rgb(v, v, v);
        }
        Self { entries }
    }

    /// Packed RGB triplets (768 bytes, PLAYPAL layout).
    pub fn from_rgb_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 768 {
            return None;
        }
        let mut entries = [PalEntry::TRANSPARENT; 256];
        for (e, rgb) in entries.iter_mut().zip(bytes.chunks_exact(3)) {
            *e = PalEntry::rgb(rgb[0], rgb[1], rgb[2]);
        }
        Some(Self { entries })
    }

    #[inline(always)]
    pub const fn get(&self, index: u8) -> PalEntry {
        self.entries[index as usize]
    }

    #[inline(always)]
    pub const fn entries(&self) -> &Palette {
        &self.entries
    }
}

impl Default for BasePalette {
    fn default() -> Self {
        Self::grayscale()
    }
}

/* =========================== TEXT COLOR RANGES =========================== */

/// Named text colors, in the fixed order translation tables are built in.
/// The escape letters 'a'..='z' follow this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColorRange {
    Brick,
    Tan,
    Gray,
    Green,
    Brown,
    Gold,
    Red,
    Blue,
    Orange,
    White,
    Yellow,
    Untranslated,
    Black,
    LightBlue,
    Cream,
    Olive,
    DarkGreen,
    DarkRed,
    DarkBrown,
    Purple,
    DarkGray,
    Cyan,
    Ice,
    Fire,
    Sapphire,
    Teal,
}

pub const NUM_TEXT_COLORS: usize = 26;

impl ColorRange {
    pub const ALL: [Self; NUM_TEXT_COLORS] = [
        Self::Brick,
        Self::Tan,
        Self::Gray,
        Self::Green,
        Self::Brown,
        Self::Gold,
        Self::Red,
        Self::Blue,
        Self::Orange,
        Self::White,
        Self::Yellow,
        Self::Untranslated,
        Self::Black,
        Self::LightBlue,
        Self::Cream,
        Self::Olive,
        Self::DarkGreen,
        Self::DarkRed,
        Self::DarkBrown,
        Self::Purple,
        Self::DarkGray,
        Self::Cyan,
        Self::Ice,
        Self::Fire,
        Self::Sapphire,
        Self::Teal,
    ];

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline(always)]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Brick => "brick",
            Self::Tan => "tan",
            Self::Gray => "gray",
            Self::Green => "green",
            Self::Brown => "brown",
            Self::Gold => "gold",
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Orange => "orange",
            Self::White => "white",
            Self::Yellow => "yellow",
            Self::Untranslated => "untranslated",
            Self::Black => "black",
            Self::LightBlue => "lightblue",
            Self::Cream => "cream",
            Self::Olive => "olive",
            Self::DarkGreen => "darkgreen",
            Self::DarkRed => "darkred",
            Self::DarkBrown => "darkbrown",
            Self::Purple => "purple",
            Self::DarkGray => "darkgray",
            Self::Cyan => "cyan",
            Self::Ice => "ice",
            Self::Fire => "fire",
            Self::Sapphire => "sapphire",
            Self::Teal => "teal",
        }
    }

    /// Single-letter escape code: 'a'..='z' in enumeration order, '-' for untranslated.
    pub fn from_escape_code(code: char) -> Option<Self> {
        match code {
            '-' => Some(Self::Untranslated),
            'a'..='z' => Self::from_index(code as usize - 'a' as usize),
            'A'..='Z' => Self::from_index(code as usize - 'A' as usize),
            _ => None,
        }
    }
}

impl FromStr for ColorRange {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['_', ' '], "");
        match key.as_str() {
            "grey" => return Ok(Self::Gray),
            "darkgrey" => return Ok(Self::DarkGray),
            "normal" | "none" => return Ok(Self::Untranslated),
            _ => {}
        }
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.name() == key)
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BasePalette, ColorRange, NUM_TEXT_COLORS, PalEntry, pal_hex, parse_hex_color};

    #[test]
    fn hex_literals_expand_short_forms() {
        assert_eq!(pal_hex("#FFF"), PalEntry::rgb(255, 255, 255));
        assert_eq!(pal_hex("3F0000"), PalEntry::rgb(0x3F, 0, 0));
        assert_eq!(parse_hex_color(" #7f7f7f "), Some(PalEntry::rgb(127, 127, 127)));
        assert_eq!(parse_hex_color("0a1"), Some(PalEntry::rgb(0x00, 0xAA, 0x11)));
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("zzzzzz"), None);
    }

    #[test]
    fn luminance_weights_green_over_red_over_blue() {
        let r = PalEntry::rgb(255, 0, 0);
        let g = PalEntry::rgb(0, 255, 0);
        let b = PalEntry::rgb(0, 0, 255);
        assert!(g.luminance() > r.luminance() && r.luminance() > b.luminance());
        assert!(g.luma_key() > r.luma_key() && r.luma_key() > b.luma_key());
        assert!((PalEntry::WHITE.luminance() - 255.0).abs() < 1e-9);
    }

    #[test]
    fn escape_letters_follow_enumeration_order() {
        assert_eq!(ColorRange::from_escape_code('a'), Some(ColorRange::Brick));
        assert_eq!(ColorRange::from_escape_code('L'), Some(ColorRange::Untranslated));
        assert_eq!(ColorRange::from_escape_code('z'), Some(ColorRange::Teal));
        assert_eq!(ColorRange::from_escape_code('-'), Some(ColorRange::Untranslated));
        assert_eq!(ColorRange::from_escape_code('!'), None);
        assert_eq!(ColorRange::ALL.len(), NUM_TEXT_COLORS);
        for (i, r) in ColorRange::ALL.iter().enumerate() {
            assert_eq!(r.index(), i, "{} out of order", r.name());
        }
    }

    #[test]
    fn range_names_parse_case_insensitively() {
        assert_eq!("Light Blue".parse::<ColorRange>(), Ok(ColorRange::LightBlue));
        assert_eq!("DARKGREY".parse::<ColorRange>(), Ok(ColorRange::DarkGray));
        assert_eq!("sapphire".parse::<ColorRange>(), Ok(ColorRange::Sapphire));
        assert!("mauve".parse::<ColorRange>().is_err());
    }

    #[test]
    fn base_palette_from_bytes_requires_full_table() {
        assert!(BasePalette::from_rgb_bytes(&[0u8; 767]).is_none());
        let mut raw = vec![0u8; 768];
        raw[3..6].copy_from_slice(&[10, 20, 30]);
        let pal = BasePalette::from_rgb_bytes(&raw).expect("768 bytes is a full palette");
        assert_eq!(pal.get(1), PalEntry::rgb(10, 20, 30));
        assert_eq!(BasePalette::grayscale().get(200), PalEntry::rgb(200, 200, 200));
    }
}
