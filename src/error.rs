use crate::core::gfx::PaletteError;
use crate::ui::color::ColorRange;
use std::fmt;

/// Load-time failures. Lookups that merely miss (unknown glyph, unknown font
/// name) are not errors and come back as `None` instead.
#[derive(Debug)]
pub enum FontError {
    /// A breakpoint with `range_start == range_end` (interpolation divisor of zero).
    ZeroWidthBreakpoint {
        style: String,
        range: ColorRange,
        at: i32,
    },
    /// Consecutive breakpoints of one ramp leave luminosity values uncovered.
    BreakpointGap {
        style: String,
        range: ColorRange,
        after: i32,
        next: i32,
    },
    /// A ramp does not span the whole 0..=256 luminosity domain.
    IncompleteRamp {
        style: String,
        range: ColorRange,
        start: i32,
        end: i32,
    },
    /// Number of ramps in a flat breakpoint table differs from the number of
    /// translatable color ranges.
    RampCountMismatch {
        style: String,
        expected: usize,
        found: usize,
    },
    InvalidBreakpoint(String),
    UnknownStyle(String),
    UnknownColorRange(String),
    InvalidColor(String),
    EmptyFont(String),
    Palette(PaletteError),
    Config(String),
    Json(serde_json::Error),
    Image(image::ImageError),
    Io(std::io::Error),
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroWidthBreakpoint { style, range, at } => write!(
                f,
                "style '{style}', range '{}': zero-width breakpoint at {at}",
                range.name()
            ),
            Self::BreakpointGap {
                style,
                range,
                after,
                next,
            } => write!(
                f,
                "style '{style}', range '{}': gap between {after} and {next}",
                range.name()
            ),
            Self::IncompleteRamp {
                style,
                range,
                start,
                end,
            } => write!(
                f,
                "style '{style}', range '{}': covers {start}..={end}, expected 0..=256",
                range.name()
            ),
            Self::RampCountMismatch {
                style,
                expected,
                found,
            } => write!(f, "style '{style}': expected {expected} color ramps, found {found}"),
            Self::InvalidBreakpoint(s) => write!(f, "invalid breakpoint '{s}'"),
            Self::UnknownStyle(s) => write!(f, "unknown translation style '{s}'"),
            Self::UnknownColorRange(s) => write!(f, "unknown color range '{s}'"),
            Self::InvalidColor(s) => write!(f, "invalid color '{s}'"),
            Self::EmptyFont(name) => write!(f, "font '{name}' has no glyphs"),
            Self::Palette(_) => write!(f, "palette registration failed"),
            Self::Config(s) => write!(f, "config error: {s}"),
            Self::Json(e) => write!(f, "json error: {e}"),
            Self::Image(e) => write!(f, "image error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for FontError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Palette(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Image(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PaletteError> for FontError {
    fn from(e: PaletteError) -> Self {
        Self::Palette(e)
    }
}

impl From<serde_json::Error> for FontError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<image::ImageError> for FontError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}

impl From<std::io::Error> for FontError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ini::ParseError> for FontError {
    fn from(e: ini::ParseError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<ini::Error> for FontError {
    fn from(e: ini::Error) -> Self {
        Self::Config(e.to_string())
    }
}
