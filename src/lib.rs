//! Bitmap font glyph resolution and luminosity-driven palette translations
//! for 8-bit indexed text rendering.

pub mod assets;
pub mod config;
pub mod core;
pub mod error;
pub mod ui;

pub use crate::core::gfx::backends::software::PaletteStore;
pub use crate::core::gfx::{PaletteBackend, PaletteError, PaletteHandle};
pub use crate::error::FontError;
pub use crate::ui::color::{BasePalette, ColorRange, PalEntry, Palette};
pub use crate::ui::font::{
    Character, Font, FontBuilder, FontFlags, GlyphLookup, PicId, PlacedGlyph,
};
pub use crate::ui::registry::{FontId, FontRegistry};
pub use crate::ui::translation::{TranslationParm, TranslationStyle, TranslationStyles};
