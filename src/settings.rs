// ============================================================================
// SETTINGS: persisted editor preferences (key=value text file)
// ============================================================================

use std::path::{Path, PathBuf};

use crate::io::{DEFAULT_JPEG_QUALITY, MaxDimensions};

/// Height of the interactive preview when none is configured.
pub const DEFAULT_PREVIEW_HEIGHT: u32 = 200;
/// Intensity used by the contrast action when none is given.
pub const DEFAULT_CONTRAST_INTENSITY: i32 = 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorSettings {
    /// Preview height in pixels; 0 edits at full resolution.
    pub preview_height: u32,
    pub contrast_intensity: i32,
    pub jpeg_quality: u8,
    /// Background worker threads (at least 1).
    pub worker_threads: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            preview_height: DEFAULT_PREVIEW_HEIGHT,
            contrast_intensity: DEFAULT_CONTRAST_INTENSITY,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            worker_threads: 1,
        }
    }
}

impl EditorSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/filterlab/filterlab_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\FilterLab\filterlab_settings.cfg
    /// On macOS:   ~/Library/Application Support/FilterLab/filterlab_settings.cfg
    /// Fallback:   same directory as the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("filterlab");
            return Some(config_dir.join("filterlab_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("FilterLab").join("filterlab_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("FilterLab")
                    .join("filterlab_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("filterlab_settings.cfg")))
        }
    }

    /// Bounding box for the editing buffer.
    pub fn preview_dimensions(&self) -> MaxDimensions {
        if self.preview_height == 0 {
            MaxDimensions::NONE
        } else {
            MaxDimensions::height(self.preview_height)
        }
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "preview_height={}\n\
             contrast_intensity={}\n\
             jpeg_quality={}\n\
             worker_threads={}\n",
            self.preview_height, self.contrast_intensity, self.jpeg_quality, self.worker_threads,
        )
    }

    /// Parse `key=value` lines. Unknown keys and bad values are ignored.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "preview_height" => {
                    s.preview_height = val.parse().unwrap_or(DEFAULT_PREVIEW_HEIGHT);
                }
                "contrast_intensity" => {
                    s.contrast_intensity = val.parse().unwrap_or(DEFAULT_CONTRAST_INTENSITY);
                }
                "jpeg_quality" => {
                    s.jpeg_quality = val
                        .parse::<u8>()
                        .ok()
                        .filter(|q| (1..=100).contains(q))
                        .unwrap_or(DEFAULT_JPEG_QUALITY);
                }
                "worker_threads" => {
                    s.worker_threads = val.parse::<usize>().unwrap_or(1).max(1);
                }
                _ => {}
            }
        }
        s
    }

    /// Load settings from the default path (defaults if missing or unreadable).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }
}
