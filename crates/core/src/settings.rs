use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Process-wide defaults, copied into each Region on construction and
/// overridable there. Loaded from / saved to a JSON file; missing or
/// unreadable files silently fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds a find waits for the target to appear.
    pub auto_wait_timeout: f64,
    /// Default minimum similarity for matches, in [0,1].
    pub min_similarity: f64,
    /// Polling rate for wait/exists/vanish, in attempts per second.
    pub wait_scan_rate: f32,
    /// Polling rate for the observer loop, in scans per second.
    pub observe_scan_rate: f32,
    /// Default minimum changed area (pixels) for change observers.
    pub observe_min_changed_pixels: u32,
    /// true: a failed find aborts (policy Abort); false: policy Skip.
    pub throw_on_find_failed: bool,
    /// Text (OCR) targets; off by default, see FindError::TextSearchUnsupported.
    pub text_search: bool,
    /// Safety cap for the Retry escalation policy. None keeps the
    /// historical unbounded behavior (caution: endless loop).
    pub find_retry_limit: Option<u32>,
    /// Seconds to hold the button before dropping in drag_drop.
    pub delay_before_drop: f64,
    /// Directory searched for relative image file names.
    pub bundle_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_wait_timeout: 3.0,
            min_similarity: 0.7,
            wait_scan_rate: 3.0,
            observe_scan_rate: 3.0,
            observe_min_changed_pixels: 50,
            throw_on_find_failed: true,
            text_search: false,
            find_retry_limit: None,
            delay_before_drop: 0.3,
            bundle_path: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            let _ = std::fs::write(path, json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.auto_wait_timeout, 3.0);
        assert_eq!(s.min_similarity, 0.7);
        assert_eq!(s.wait_scan_rate, 3.0);
        assert_eq!(s.observe_scan_rate, 3.0);
        assert_eq!(s.observe_min_changed_pixels, 50);
        assert!(s.throw_on_find_failed);
        assert!(!s.text_search);
        assert!(s.find_retry_limit.is_none());
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let s = Settings::load(Path::new("/nonexistent/spotter-settings.json"));
        assert_eq!(s.min_similarity, Settings::default().min_similarity);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let s: Settings = serde_json::from_str(r#"{"min_similarity": 0.9}"#).unwrap();
        assert_eq!(s.min_similarity, 0.9);
        assert_eq!(s.auto_wait_timeout, 3.0);
    }
}
