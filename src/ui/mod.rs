pub mod charmap;
pub mod color;
pub mod font;
pub mod registry;
pub mod text;
pub mod translation;
