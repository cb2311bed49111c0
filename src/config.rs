use ini::Ini;
use log::{info, warn};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

pub const CONFIG_PATH: &str = "palfont.ini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: LogLevel,
    /// Extra pixels between every pair of glyphs.
    pub global_kerning: i32,
    /// Style fonts use unless they pick one themselves.
    pub translation_style: String,
    /// `.ini` or `.json` overlay for the builtin translation styles.
    pub styles_path: Option<String>,
    /// Directory of `<hexcode>.png` glyphs for the demo font.
    pub glyph_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            global_kerning: 0,
            translation_style: "normal".to_string(),
            styles_path: None,
            glyph_dir: None,
        }
    }
}

static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

// --- File I/O ---

fn default_config_text() -> String {
    let default = Config::default();
    let mut content = String::new();

    // [Options] section - keys in alphabetical order
    content.push_str("[Options]\n");
    content.push_str(&format!("GlobalKerning={}\n", default.global_kerning));
    content.push_str("GlyphDir=\n");
    content.push_str(&format!("LogLevel={}\n", default.log_level.as_str()));
    content.push_str("StylesPath=\n");
    content.push_str(&format!("TranslationStyle={}\n", default.translation_style));
    content
}

fn create_default_config_file(path: &Path) -> Result<(), std::io::Error> {
    info!("'{}' not found, creating with default values.", path.display());
    std::fs::write(path, default_config_text())
}

#[inline(always)]
fn non_empty(v: &str) -> Option<String> {
    let v = v.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// Reads `[Options]`; missing or malformed keys keep their defaults.
pub fn parse(conf: &Ini) -> Config {
    let default = Config::default();
    let get = |key: &str| conf.get_from(Some("Options"), key);

    Config {
        log_level: get("LogLevel")
            .and_then(|v| LogLevel::from_str(v).ok())
            .unwrap_or(default.log_level),
        global_kerning: get("GlobalKerning")
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(default.global_kerning),
        translation_style: get("TranslationStyle")
            .and_then(non_empty)
            .unwrap_or(default.translation_style),
        styles_path: get("StylesPath").and_then(non_empty),
        glyph_dir: get("GlyphDir").and_then(non_empty),
    }
}

pub fn load() {
    load_from(Path::new(CONFIG_PATH));
}

pub fn load_from(path: &Path) {
    if !path.exists()
        && let Err(e) = create_default_config_file(path)
    {
        warn!("Failed to create default config file: {e}");
    }

    let cfg = match Ini::load_from_file(path) {
        Ok(conf) => parse(&conf),
        Err(e) => {
            warn!("Failed to load '{}', using defaults: {e}", path.display());
            Config::default()
        }
    };
    info!(
        "Config loaded: log level {}, style '{}', kerning {}.",
        cfg.log_level.as_str(),
        cfg.translation_style,
        cfg.global_kerning
    );
    *CONFIG.lock().unwrap_or_else(PoisonError::into_inner) = cfg;
}

pub fn get() -> Config {
    CONFIG
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}
