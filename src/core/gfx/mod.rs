pub mod backends;

use std::fmt;

pub use crate::ui::color::{PalEntry, Palette};

// --- Public Data Contract ---

/// Opaque handle returned by the backend for a registered palette. Draw calls
/// select the palette used to sample an indexed glyph texture with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaletteHandle(pub u32);

impl fmt::Display for PaletteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pal#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteError {
    /// The backend cannot hold another palette.
    Full { capacity: usize },
    Rejected(String),
}

impl fmt::Display for PaletteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full { capacity } => {
                write!(f, "palette store is full ({capacity} palettes)")
            }
            Self::Rejected(why) => write!(f, "palette rejected by backend: {why}"),
        }
    }
}

impl std::error::Error for PaletteError {}

// --- Backend Facade ---

/// The only thing crossing into the renderer is a finished 256-entry palette.
pub trait PaletteBackend {
    fn register_palette(&mut self, palette: &Palette) -> Result<PaletteHandle, PaletteError>;

    /// Palette behind a handle, if the backend keeps a CPU-side copy.
    fn palette(&self, _handle: PaletteHandle) -> Option<&Palette> {
        None
    }
}
