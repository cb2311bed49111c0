use crate::error::FontError;
use image::{GrayImage, ImageReader, Luma};
use log::{debug, info, warn};
use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

// --- Glyph Image Contract ---

/// Maps authored palette indices to the font's compact luminosity indices.
pub type SourceRemap = [u8; 256];

/// What the font core needs from a glyph image. Variants that can't be
/// remapped keep the default no-op remap methods.
pub trait GlyphImage {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Distance from the top of the image to the baseline.
    fn top_offset(&self) -> i32 {
        0
    }

    /// Writes `width * height` palette indices into `out`, passed through the
    /// active source remap if one is set.
    fn create_8bit_pixels(&self, out: &mut [u8]);

    fn source_remap(&self) -> Option<&SourceRemap> {
        None
    }

    fn set_source_remap(&mut self, _remap: Option<SourceRemap>) {}

    /// Clears the remap and hands back the previous one so it can be restored.
    fn reset_source_remap(&mut self) -> Option<SourceRemap> {
        let old = self.source_remap().copied();
        self.set_source_remap(None);
        old
    }

    #[inline(always)]
    fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }
}

// --- Indexed Glyphs ---

/// An 8-bit palette-index glyph. The pixel buffer is shared between the
/// authored image and its remapped counterpart.
#[derive(Debug, Clone)]
pub struct IndexedGlyph {
    pixels: Rc<GrayImage>,
    top_offset: i32,
    remap: Option<SourceRemap>,
}

impl IndexedGlyph {
    pub fn new(pixels: GrayImage) -> Self {
        Self {
            pixels: Rc::new(pixels),
            top_offset: 0,
            remap: None,
        }
    }

    /// Row-major palette indices. `None` if the buffer size doesn't match.
    pub fn from_indices(width: u32, height: u32, indices: Vec<u8>) -> Option<Self> {
        GrayImage::from_raw(width, height, indices).map(Self::new)
    }

    #[must_use]
    pub fn with_top_offset(mut self, top_offset: i32) -> Self {
        self.top_offset = top_offset;
        self
    }

    /// A second image over the same pixels, without any remap.
    #[must_use]
    pub fn share(&self) -> Self {
        Self {
            pixels: Rc::clone(&self.pixels),
            top_offset: self.top_offset,
            remap: None,
        }
    }

    #[inline(always)]
    pub fn index_at(&self, x: u32, y: u32) -> u8 {
        let Luma([raw]) = *self.pixels.get_pixel(x, y);
        self.remap.map_or(raw, |remap| remap[raw as usize])
    }
}

impl GlyphImage for IndexedGlyph {
    #[inline(always)]
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline(always)]
    fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[inline(always)]
    fn top_offset(&self) -> i32 {
        self.top_offset
    }

    fn create_8bit_pixels(&self, out: &mut [u8]) {
        let raw = self.pixels.as_raw();
        match &self.remap {
            Some(remap) => {
                for (dst, &src) in out.iter_mut().zip(raw) {
                    *dst = remap[src as usize];
                }
            }
            None => {
                let n = raw.len().min(out.len());
                out[..n].copy_from_slice(&raw[..n]);
            }
        }
    }

    fn source_remap(&self) -> Option<&SourceRemap> {
        self.remap.as_ref()
    }

    fn set_source_remap(&mut self, remap: Option<SourceRemap>) {
        self.remap = remap;
    }
}

// --- PNG Loading ---

/// Decodes a glyph PNG whose gray level is the palette index. Fully
/// transparent pixels become index 0.
pub fn load_glyph_png(path: &Path) -> Result<IndexedGlyph, FontError> {
    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let la = img.into_luma_alpha8();
    let (w, h) = la.dimensions();
    let indices: Vec<u8> = la
        .pixels()
        .map(|p| if p.0[1] == 0 { 0 } else { p.0[0] })
        .collect();
    IndexedGlyph::from_indices(w, h, indices)
        .ok_or_else(|| FontError::Config(format!("bad glyph buffer in '{}'", path.display())))
}

/// Glyph code from a file stem: "0041", "U+0041" or "u0041" (hex).
#[inline(always)]
fn parse_glyph_code(stem: &str) -> Option<i32> {
    let hex = stem
        .strip_prefix("U+")
        .or_else(|| stem.strip_prefix("u+"))
        .or_else(|| stem.strip_prefix('u'))
        .or_else(|| stem.strip_prefix('U'))
        .unwrap_or(stem);
    if hex.is_empty() || hex.len() > 6 {
        return None;
    }
    i32::from_str_radix(hex, 16).ok()
}

fn list_glyph_pngs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut v = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if name.to_ascii_lowercase().ends_with(".png") {
            v.push(path);
        }
    }
    v.sort();
    Ok(v)
}

/// Loads every `<hexcode>.png` in `dir`, sorted by code.
pub fn load_glyph_dir(dir: &Path) -> Result<Vec<(i32, IndexedGlyph)>, FontError> {
    let mut glyphs = Vec::new();
    for path in list_glyph_pngs(dir)? {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let Some(code) = parse_glyph_code(stem) else {
            warn!("Skipping '{}': file name is not a glyph code.", path.display());
            continue;
        };
        let glyph = load_glyph_png(&path)?;
        debug!(
            "Glyph U+{code:04X} from '{}' ({}x{}).",
            path.display(),
            glyph.width(),
            glyph.height()
        );
        glyphs.push((code, glyph));
    }
    glyphs.sort_by_key(|(code, _)| *code);
    info!("Loaded {} glyph images from '{}'.", glyphs.len(), dir.display());
    Ok(glyphs)
}
