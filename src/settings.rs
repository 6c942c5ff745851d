//! Engine settings — persisted as a plain `key=value` text file.
//!
//! Location:
//!   Linux:    `$XDG_CONFIG_HOME/pixeleditor/pixeleditor_settings.cfg`
//!             (falls back to `~/.config/...`)
//!   Windows:  `%APPDATA%\PixelEditor\pixeleditor_settings.cfg`
//!   macOS:    `~/Library/Application Support/PixelEditor/pixeleditor_settings.cfg`
//!
//! Unknown keys are ignored and malformed values keep their defaults, so an
//! old or hand-edited file never prevents startup.

use std::path::{Path, PathBuf};

/// Default longest allocation: 4096 × 4096.
pub const DEFAULT_MAX_PIXELS: u64 = 4096 * 4096;

#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    /// Alpha cap applied to shape/line previews (128 = 50%).
    pub preview_alpha: u8,
    /// Size of a fresh canvas.
    pub default_width: u32,
    pub default_height: u32,
    /// Largest `width * height` a canvas may allocate.
    pub max_pixels: u64,
    /// Tolerance preset for magic wand / fill / similar-erase (0 = exact).
    pub default_tolerance: u32,
    /// Antialiasing preset for lines and ellipses.
    pub antialiasing: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            preview_alpha: 128,
            default_width: 32,
            default_height: 32,
            max_pixels: DEFAULT_MAX_PIXELS,
            default_tolerance: 0,
            antialiasing: false,
        }
    }
}

impl EngineSettings {
    /// Path to the settings file in the per-user config directory.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(PathBuf::from(appdata).join("PixelEditor").join("pixeleditor_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("PixelEditor")
                    .join("pixeleditor_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("pixeleditor").join("pixeleditor_settings.cfg"))
        }
    }

    /// Load from the default location, or defaults if the file is missing.
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from an explicit file. Missing or unreadable files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Parse `key=value` lines on top of the defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "preview_alpha" => {
                    if let Ok(v) = val.parse() {
                        s.preview_alpha = v;
                    }
                }
                "default_width" => {
                    if let Ok(v) = val.parse::<u32>() && v > 0 {
                        s.default_width = v;
                    }
                }
                "default_height" => {
                    if let Ok(v) = val.parse::<u32>() && v > 0 {
                        s.default_height = v;
                    }
                }
                "max_pixels" => {
                    if let Ok(v) = val.parse::<u64>() && v > 0 {
                        s.max_pixels = v;
                    }
                }
                "default_tolerance" => {
                    if let Ok(v) = val.parse() {
                        s.default_tolerance = v;
                    }
                }
                "antialiasing" => {
                    s.antialiasing = matches!(val, "true" | "1" | "yes" | "on");
                }
                _ => {}
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "preview_alpha={}\n\
             default_width={}\n\
             default_height={}\n\
             max_pixels={}\n\
             default_tolerance={}\n\
             antialiasing={}\n",
            self.preview_alpha,
            self.default_width,
            self.default_height,
            self.max_pixels,
            self.default_tolerance,
            self.antialiasing,
        )
    }

    /// Write to `path`, creating the directory if needed.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }
}
