//! UI preferences persisted in the settings store.
//!
//! Preferences are a single JSON blob under one settings key. Unknown
//! fields are ignored and missing ones take defaults, so older snapshots
//! keep loading after the shape grows.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::db::repos::settings;
use crate::db::DbPool;
use crate::error::AppError;

fn hex_color_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct UiPreferences {
    pub theme: Theme,
    /// Accent color as `#rgb` or `#rrggbb`
    pub accent_color: String,
    pub sidebar_collapsed: bool,
    pub show_timestamps: bool,
    /// Show token/cost/latency metadata under assistant replies
    pub show_usage_metadata: bool,
    pub compact_messages: bool,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            accent_color: "#6366F1".to_string(),
            sidebar_collapsed: false,
            show_timestamps: true,
            show_usage_metadata: false,
            compact_messages: false,
        }
    }
}

impl UiPreferences {
    /// Reject writes that would persist an unusable accent color.
    pub fn validate(&self) -> Result<(), AppError> {
        if !hex_color_re().is_match(&self.accent_color) {
            return Err(AppError::Validation(format!(
                "Invalid accent color \"{}\", expected #rgb or #rrggbb",
                self.accent_color
            )));
        }
        Ok(())
    }
}

/// Load preferences, falling back to defaults when nothing is stored or
/// the stored blob no longer parses.
pub fn load(pool: &DbPool) -> Result<UiPreferences, AppError> {
    let Some(raw) = settings::get(pool, settings::UI_PREFERENCES)? else {
        return Ok(UiPreferences::default());
    };
    match serde_json::from_str(&raw) {
        Ok(prefs) => Ok(prefs),
        Err(e) => {
            tracing::warn!(error = %e, "Stored preferences unreadable, using defaults");
            Ok(UiPreferences::default())
        }
    }
}

pub fn save(pool: &DbPool, prefs: &UiPreferences) -> Result<(), AppError> {
    prefs.validate()?;
    settings::set(pool, settings::UI_PREFERENCES, &serde_json::to_string(prefs)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;

    #[test]
    fn test_defaults_when_nothing_stored() {
        let pool = init_test_db().unwrap();
        assert_eq!(load(&pool).unwrap(), UiPreferences::default());
    }

    #[test]
    fn test_round_trip() {
        let pool = init_test_db().unwrap();
        let prefs = UiPreferences {
            theme: Theme::Dark,
            accent_color: "#abc".to_string(),
            sidebar_collapsed: true,
            ..UiPreferences::default()
        };
        save(&pool, &prefs).unwrap();
        assert_eq!(load(&pool).unwrap(), prefs);
    }

    #[test]
    fn test_invalid_accent_color_rejected() {
        let pool = init_test_db().unwrap();
        for bad in ["6366F1", "#12345", "#gggggg", "blue"] {
            let prefs = UiPreferences {
                accent_color: bad.to_string(),
                ..UiPreferences::default()
            };
            assert!(
                matches!(save(&pool, &prefs), Err(AppError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_corrupt_blob_falls_back_to_defaults() {
        let pool = init_test_db().unwrap();
        settings::set(&pool, settings::UI_PREFERENCES, "not json").unwrap();
        assert_eq!(load(&pool).unwrap(), UiPreferences::default());
    }

    #[test]
    fn test_older_snapshot_with_missing_fields_loads() {
        let pool = init_test_db().unwrap();
        settings::set(&pool, settings::UI_PREFERENCES, r#"{"theme":"dark"}"#).unwrap();
        let prefs = load(&pool).unwrap();
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.accent_color, UiPreferences::default().accent_color);
    }
}
