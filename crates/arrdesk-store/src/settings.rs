//! The global settings document and its option schema.
//!
//! Each settings field is listed in [`OPTIONS`] together with the kind of
//! value it accepts. A field-scoped write goes through
//! [`Settings::with_option`], which rejects unknown keys and mistyped values
//! before producing the updated document.
//!
//! # Example TOML
//!
//! ```toml
//! lang = "en"
//! dark = false
//! dev_mode = false
//! updates = "production"
//! log_level = "info"
//! download_dir = ""
//! hidden_apps = ["whisparr"]
//! active_instance = 1
//! allow_remove_active = false
//! request_timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::value::ConfigValue;

/// Locale codes accepted for `lang`, with their display names.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("da", "Dansk"),
    ("de", "Deutsch"),
    ("en", "English"),
    ("es", "Español"),
    ("fr", "Français"),
    ("it", "Italiano"),
    ("nl", "Nederlands"),
    ("pl", "Polski"),
    ("pt", "Português"),
    ("sv", "Svenska"),
    ("zh", "中文"),
];

const UPDATE_CHANNELS: &[&str] = &["production", "unstable"];
const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];
const APP_NAMES: &[&str] = &["lidarr", "prowlarr", "radarr", "readarr", "sonarr", "whisparr"];

/// Kind of value an option accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// `true` / `false`
    Bool,
    /// Any string
    Text,
    /// One string out of a fixed set
    Choice(&'static [&'static str]),
    /// Whole number within an inclusive range
    Integer { min: i64, max: i64 },
    /// Whole number at or above `min`, or the empty string to clear it
    OptionalInteger { min: i64 },
    /// List of strings, each out of a fixed set
    ChoiceList(&'static [&'static str]),
}

/// Schema entry for a single settings option.
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub key: &'static str,
    pub kind: OptionKind,
    pub description: &'static str,
}

/// Every option that can be written with a field-scoped save.
pub const OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        key: "lang",
        kind: OptionKind::Choice(&["da", "de", "en", "es", "fr", "it", "nl", "pl", "pt", "sv", "zh"]),
        description: "UI language code",
    },
    OptionSpec {
        key: "dark",
        kind: OptionKind::Bool,
        description: "Dark theme",
    },
    OptionSpec {
        key: "dev_mode",
        kind: OptionKind::Bool,
        description: "Show developer tools",
    },
    OptionSpec {
        key: "updates",
        kind: OptionKind::Choice(UPDATE_CHANNELS),
        description: "Release channel used for update checks",
    },
    OptionSpec {
        key: "log_level",
        kind: OptionKind::Choice(LOG_LEVELS),
        description: "Minimum level written to the log",
    },
    OptionSpec {
        key: "download_dir",
        kind: OptionKind::Text,
        description: "Where update downloads are staged (empty = cache dir)",
    },
    OptionSpec {
        key: "hidden_apps",
        kind: OptionKind::ChoiceList(APP_NAMES),
        description: "App tabs hidden from the UI",
    },
    OptionSpec {
        key: "active_instance",
        kind: OptionKind::OptionalInteger { min: 0 },
        description: "Id of the instance currently in use",
    },
    OptionSpec {
        key: "allow_remove_active",
        kind: OptionKind::Bool,
        description: "Allow removing the active instance",
    },
    OptionSpec {
        key: "request_timeout_secs",
        kind: OptionKind::Integer { min: 1, max: 600 },
        description: "Timeout for update checks",
    },
];

/// Look up the schema entry for `key`.
pub fn option(key: &str) -> Option<&'static OptionSpec> {
    OPTIONS.iter().find(|spec| spec.key == key)
}

impl OptionKind {
    /// Check `value` against this kind and convert it to its JSON form.
    pub fn coerce(&self, key: &str, value: &ConfigValue) -> Result<serde_json::Value, StoreError> {
        let mismatch = |expected: &str| {
            StoreError::invalid(key, format!("expected {expected}, got {}", value.kind_name()))
        };

        match *self {
            OptionKind::Bool => value
                .as_bool()
                .map(serde_json::Value::Bool)
                .ok_or_else(|| mismatch("bool")),
            OptionKind::Text => value
                .as_str()
                .map(|s| serde_json::Value::String(s.to_string()))
                .ok_or_else(|| mismatch("string")),
            OptionKind::Choice(choices) => {
                let s = value.as_str().ok_or_else(|| mismatch("string"))?;
                if choices.contains(&s) {
                    Ok(serde_json::Value::String(s.to_string()))
                } else {
                    Err(StoreError::invalid(
                        key,
                        format!("'{s}' is not one of {choices:?}"),
                    ))
                }
            }
            OptionKind::Integer { min, max } => {
                let n = value.as_integer().ok_or_else(|| mismatch("whole number"))?;
                if (min..=max).contains(&n) {
                    Ok(serde_json::Value::from(n))
                } else {
                    Err(StoreError::invalid(key, format!("{n} is outside {min}..={max}")))
                }
            }
            OptionKind::OptionalInteger { min } => {
                if value.as_str() == Some("") {
                    return Ok(serde_json::Value::Null);
                }
                let n = value
                    .as_integer()
                    .ok_or_else(|| mismatch("whole number or empty string"))?;
                if n >= min {
                    Ok(serde_json::Value::from(n))
                } else {
                    Err(StoreError::invalid(key, format!("{n} is below {min}")))
                }
            }
            OptionKind::ChoiceList(choices) => {
                let items = value.as_list().ok_or_else(|| mismatch("list"))?;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    let s = item.as_str().ok_or_else(|| mismatch("list of strings"))?;
                    if !choices.contains(&s) {
                        return Err(StoreError::invalid(
                            key,
                            format!("'{s}' is not one of {choices:?}"),
                        ));
                    }
                    out.push(serde_json::Value::String(s.to_string()));
                }
                Ok(serde_json::Value::Array(out))
            }
        }
    }
}

/// The global settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub lang: String,
    pub dark: bool,
    pub dev_mode: bool,
    /// "production" or "unstable"
    pub updates: String,
    pub log_level: String,
    /// Empty means the platform cache directory.
    pub download_dir: String,
    pub hidden_apps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_instance: Option<i64>,
    pub allow_remove_active: bool,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            dark: false,
            dev_mode: false,
            updates: "production".to_string(),
            log_level: "info".to_string(),
            download_dir: String::new(),
            hidden_apps: Vec::new(),
            active_instance: None,
            allow_remove_active: false,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Return a copy of this document with `key` set to `value`.
    ///
    /// # Errors
    ///
    /// - `UnknownOption` if `key` is not in [`OPTIONS`]
    /// - `InvalidValue` if `value` does not match the option kind
    pub fn with_option(&self, key: &str, value: &ConfigValue) -> Result<Settings, StoreError> {
        let spec = option(key).ok_or_else(|| StoreError::UnknownOption(key.to_string()))?;
        let json = spec.kind.coerce(key, value)?;

        let mut doc = serde_json::to_value(self)?;
        let fields = doc
            .as_object_mut()
            .ok_or_else(|| StoreError::Serialization("settings is not an object".to_string()))?;
        fields.insert(key.to_string(), json);

        serde_json::from_value(doc).map_err(|e| StoreError::invalid(key, e.to_string()))
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, StoreError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_option_is_a_settings_field() {
        let doc = serde_json::to_value(Settings {
            active_instance: Some(0),
            ..Settings::default()
        })
        .unwrap();
        let fields = doc.as_object().unwrap();
        for spec in OPTIONS {
            assert!(fields.contains_key(spec.key), "missing field {}", spec.key);
        }
        assert_eq!(fields.len(), OPTIONS.len());
    }

    #[test]
    fn test_lang_choices_match_language_table() {
        let OptionKind::Choice(codes) = option("lang").unwrap().kind else {
            panic!("lang should be a choice");
        };
        let table: Vec<_> = SUPPORTED_LANGUAGES.iter().map(|(code, _)| *code).collect();
        assert_eq!(codes, table.as_slice());
    }

    #[test]
    fn test_with_option_sets_field() {
        let settings = Settings::default();
        let updated = settings
            .with_option("log_level", &ConfigValue::from("debug"))
            .unwrap();
        assert_eq!(updated.log_level, "debug");
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_with_option_unknown_key() {
        let err = Settings::default()
            .with_option("nope", &ConfigValue::Bool(true))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownOption(k) if k == "nope"));
    }

    #[test]
    fn test_with_option_type_mismatch() {
        let err = Settings::default()
            .with_option("dark", &ConfigValue::from("yes"))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue { .. }));

        let err = Settings::default()
            .with_option("request_timeout_secs", &ConfigValue::Number(1.5))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue { .. }));
    }

    #[test]
    fn test_with_option_range_and_choice() {
        let s = Settings::default();
        assert!(s.with_option("request_timeout_secs", &ConfigValue::from(0)).is_err());
        assert!(s.with_option("request_timeout_secs", &ConfigValue::from(601)).is_err());
        assert_eq!(
            s.with_option("request_timeout_secs", &ConfigValue::from(60))
                .unwrap()
                .request_timeout_secs,
            60
        );
        assert!(s.with_option("updates", &ConfigValue::from("nightly")).is_err());
    }

    #[test]
    fn test_optional_integer_set_and_clear() {
        let s = Settings::default()
            .with_option("active_instance", &ConfigValue::from(3))
            .unwrap();
        assert_eq!(s.active_instance, Some(3));

        let cleared = s.with_option("active_instance", &ConfigValue::from("")).unwrap();
        assert_eq!(cleared.active_instance, None);

        assert!(s.with_option("active_instance", &ConfigValue::from(-1)).is_err());
        assert!(s
            .with_option("active_instance", &ConfigValue::Number(1e30))
            .is_err());
    }

    #[test]
    fn test_choice_list() {
        let s = Settings::default();
        let value = ConfigValue::List(vec!["radarr".into(), "sonarr".into()]);
        assert_eq!(
            s.with_option("hidden_apps", &value).unwrap().hidden_apps,
            vec!["radarr", "sonarr"]
        );

        let bad = ConfigValue::List(vec!["plex".into()]);
        assert!(s.with_option("hidden_apps", &bad).is_err());
    }

    #[test]
    fn test_toml_round_trip_and_defaults() {
        let s = Settings {
            dark: true,
            active_instance: Some(2),
            ..Settings::default()
        };
        let text = s.to_toml().unwrap();
        assert_eq!(Settings::from_toml(&text).unwrap(), s);

        // Missing fields fall back to defaults.
        let partial = Settings::from_toml("dark = true\n").unwrap();
        assert!(partial.dark);
        assert_eq!(partial.request_timeout_secs, 30);
    }
}
