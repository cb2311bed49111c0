use palfont::assets::load_glyph_dir;
use palfont::config;
use palfont::{BasePalette, ColorRange, FontBuilder, FontRegistry, PaletteStore, TranslationStyles};
use std::path::Path;

const SAMPLE_TEXT: &str = "The quick brown fox\n\x1c[gold]JUMPS\x1c- over the lazy dog";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    config::load();
    let cfg = config::get();
    log::set_max_level(cfg.log_level.as_level_filter());

    let styles = match cfg.styles_path.as_deref() {
        Some(path) => TranslationStyles::load(Path::new(path))?,
        None => TranslationStyles::builtin(),
    };

    let mut args = std::env::args().skip(1);
    let Some(glyph_dir) = args.next().or(cfg.glyph_dir) else {
        eprintln!("usage: palfont <glyph-dir> [text...]");
        eprintln!("  (or set GlyphDir in {})", config::CONFIG_PATH);
        return Ok(());
    };
    let text: Vec<String> = args.collect();
    let text = if text.is_empty() {
        SAMPLE_TEXT.to_string()
    } else {
        text.join(" ")
    };

    let dir = Path::new(&glyph_dir);
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("font")
        .to_string();
    let base = BasePalette::grayscale();
    let mut backend = PaletteStore::new();

    let mut builder = FontBuilder::new(&name)
        .global_kerning(cfg.global_kerning)
        .translation_style(&cfg.translation_style);
    for (code, glyph) in load_glyph_dir(dir)? {
        builder = builder.glyph(code, glyph, None);
    }
    let font = builder.build(&styles, &base, &mut backend)?;

    let mut registry = FontRegistry::new();
    let id = registry.add(font);
    let Some(font) = registry.get(id) else {
        return Err("font vanished from registry".into());
    };

    println!("font:           {}", font.name());
    println!(
        "chars:          U+{:04X}..U+{:04X}",
        font.first_char(),
        font.last_char()
    );
    println!("mixed case:     {}", font.is_mixed_case());
    println!("active colors:  {}", font.active_colors());
    println!("space width:    {}", font.space_width());
    println!("displacement:   {}", font.displacement());
    println!("palettes:       {}", backend.len());
    println!("text:           {text:?}");
    println!("string width:   {}", font.string_width(&text));
    println!("can print:      {}", font.can_print(&text));
    println!("max ascender:   {}", font.max_ascender(&text));
    let placed = font.layout(&text, ColorRange::Untranslated);
    println!("placed glyphs:  {}", placed.len());
    for g in placed.iter().take(8) {
        println!(
            "  U+{:04X} at ({}, {}) {} {}",
            g.code,
            g.x,
            g.y,
            g.range.name(),
            g.palette.map_or_else(|| "-".to_string(), |h| h.to_string())
        );
    }
    Ok(())
}
