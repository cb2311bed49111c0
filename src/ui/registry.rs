use log::{debug, warn};

use crate::core::gfx::PaletteBackend;
use crate::error::FontError;
use crate::ui::color::BasePalette;
use crate::ui::font::Font;

/// Stable handle to a registered font. Handles of removed fonts never alias
/// a later registration in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    font: Option<Font>,
}

/// Owns every loaded font. Name lookups scan newest first.
#[derive(Debug, Default)]
pub struct FontRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<FontId>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, font: Font) -> FontId {
        debug!("Registering font '{}'.", font.name());
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.font = Some(font);
                FontId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    font: Some(font),
                });
                FontId {
                    index: self.slots.len() as u32 - 1,
                    generation: 0,
                }
            }
        };
        self.order.push(id);
        id
    }

    /// Unregisters and hands back the font; stale handles get `None`.
    pub fn remove(&mut self, id: FontId) -> Option<Font> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let font = slot.font.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.order.retain(|&o| o != id);
        debug!("Removed font '{}'.", font.name());
        Some(font)
    }

    #[inline(always)]
    pub fn get(&self, id: FontId) -> Option<&Font> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.font.as_ref())
    }

    #[inline(always)]
    pub fn get_mut(&mut self, id: FontId) -> Option<&mut Font> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.font.as_mut())
    }

    /// Most recently registered font with this name. Empty names never match.
    pub fn find_font(&self, name: &str) -> Option<FontId> {
        if name.is_empty() {
            return None;
        }
        self.order
            .iter()
            .rev()
            .copied()
            .find(|&id| self.get(id).is_some_and(|f| f.name().eq_ignore_ascii_case(name)))
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Fonts in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (FontId, &Font)> + '_ {
        self.order
            .iter()
            .filter_map(move |&id| self.get(id).map(|f| (id, f)))
    }

    /// Makes `replacement`'s untranslated text match `stock`'s shading.
    pub fn set_default_translation(
        &mut self,
        replacement: FontId,
        stock: FontId,
        base: &BasePalette,
        backend: &mut dyn PaletteBackend,
    ) -> Result<(), FontError> {
        let mut stock_colors = [0u32; 256];
        let Some(stock_font) = self.get_mut(stock) else {
            warn!("Default translation: stock font handle is stale.");
            return Ok(());
        };
        stock_font.record_all_texture_colors(&mut stock_colors);
        match self.get_mut(replacement) {
            Some(font) => font.set_default_translation(&stock_colors, base, backend),
            None => {
                warn!("Default translation: replacement font handle is stale.");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FontRegistry;
    use crate::assets::IndexedGlyph;
    use crate::core::gfx::PaletteBackend;
    use crate::core::gfx::backends::software::PaletteStore;
    use crate::ui::color::{BasePalette, ColorRange};
    use crate::ui::font::{Font, FontBuilder, FontFlags};
    use crate::ui::translation::TranslationStyles;

    fn font(name: &str, pixels: [u8; 4], store: &mut PaletteStore) -> Font {
        let glyph = IndexedGlyph::from_indices(2, 2, pixels.to_vec()).expect("2x2 glyph");
        FontBuilder::new(name)
            .glyph('A' as i32, glyph, None)
            .build(&TranslationStyles::builtin(), &BasePalette::grayscale(), store)
            .expect("font builds")
    }

    #[test]
    fn lookups_prefer_the_newest_registration() {
        let mut store = PaletteStore::new();
        let mut reg = FontRegistry::new();
        let old = reg.add(font("Small", [10; 4], &mut store));
        let big = reg.add(font("Big", [20; 4], &mut store));
        let new = reg.add(font("small", [30; 4], &mut store));

        assert_eq!(reg.find_font("SMALL"), Some(new));
        assert_eq!(reg.find_font("big"), Some(big));
        assert_eq!(reg.find_font(""), None);
        assert_eq!(reg.find_font("console"), None);

        assert!(reg.remove(new).is_some());
        assert_eq!(reg.find_font("small"), Some(old));
        assert_eq!(reg.len(), 2);
        let names: Vec<_> = reg.iter().map(|(_, f)| f.name().to_string()).collect();
        assert_eq!(names, vec!["Small", "Big"]);
    }

    #[test]
    fn removed_handles_go_stale() {
        let mut store = PaletteStore::new();
        let mut reg = FontRegistry::new();
        let a = reg.add(font("a", [10; 4], &mut store));
        assert!(reg.remove(a).is_some());
        assert!(reg.remove(a).is_none(), "double removal is a no-op");
        let b = reg.add(font("b", [10; 4], &mut store));
        assert!(reg.get(a).is_none(), "slot reuse must not revive old handles");
        assert_eq!(reg.get(b).map(Font::name), Some("b"));
        assert!(reg.get_mut(a).is_none());
    }

    #[test]
    fn default_translation_reads_the_stock_font() {
        let mut store = PaletteStore::new();
        let mut reg = FontRegistry::new();
        let stock = reg.add(font("stock", [90, 180, 180, 90], &mut store));
        let repl = reg.add(font("replacement", [60; 4], &mut store));
        reg.set_default_translation(repl, stock, &BasePalette::grayscale(), &mut store)
            .expect("matched palette registers");

        let f = reg.get(repl).expect("replacement registered");
        assert!(f.flags().contains(FontFlags::FORCE_REMAP));
        let (handle, _) = f.color_translation(ColorRange::Untranslated);
        let pal = store
            .palette(handle.expect("untranslated handle"))
            .expect("registered");
        assert_eq!((pal[1].r, pal[1].g, pal[1].b), (180, 180, 180));
        assert!(!reg.get(stock).expect("stock").flags().contains(FontFlags::FORCE_REMAP));
    }
}
