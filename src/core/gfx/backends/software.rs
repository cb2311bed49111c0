use crate::core::gfx::{PalEntry, Palette, PaletteBackend, PaletteError, PaletteHandle};
use log::{debug, trace};
use rustc_hash::FxHashMap;

/// CPU-side palette table. Identical palettes share one handle, the same way
/// a GPU palette texture only stores each distinct row once.
#[derive(Debug, Default)]
pub struct PaletteStore {
    palettes: Vec<Box<Palette>>,
    lookup: FxHashMap<Box<Palette>, PaletteHandle>,
    capacity: Option<usize>,
}

impl PaletteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses new palettes once `capacity` distinct ones exist.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }

    /// Flattens every palette into one RGBA8 strip (256 texels per row), the
    /// layout a palette texture upload expects.
    pub fn to_rgba_rows(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.palettes.len() * 256 * 4);
        for pal in &self.palettes {
            for &PalEntry { r, g, b, a } in pal.iter() {
                out.extend_from_slice(&[r, g, b, a]);
            }
        }
        out
    }
}

impl PaletteBackend for PaletteStore {
    fn register_palette(&mut self, palette: &Palette) -> Result<PaletteHandle, PaletteError> {
        if let Some(&handle) = self.lookup.get(palette) {
            trace!("Palette already registered as {handle}.");
            return Ok(handle);
        }
        if let Some(capacity) = self.capacity
            && self.palettes.len() >= capacity
        {
            return Err(PaletteError::Full { capacity });
        }
        let handle = PaletteHandle(self.palettes.len() as u32);
        self.palettes.push(Box::new(*palette));
        self.lookup.insert(Box::new(*palette), handle);
        debug!("Registered palette {handle} ({} total).", self.palettes.len());
        Ok(handle)
    }

    fn palette(&self, handle: PaletteHandle) -> Option<&Palette> {
        self.palettes.get(handle.0 as usize).map(|p| &**p)
    }
}
