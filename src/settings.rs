// Chunk: docs/chunks/explorer_sync - Explorer settings read
//!
//! Read-only access to the explorer's settings file.
//!
//! The subsystem reads exactly one thing from configuration: the initial
//! sort state. The settings file is a flat JSON object read once at
//! construction; an absent or unreadable file degrades to defaults with a
//! warning rather than failing startup.
//!
//! ## File Location
//!
//! - macOS: `~/Library/Application Support/lite-edit/settings.json`

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::tree_sort::{SortDirection, SortState, SortType};

/// Application name used for the config directory.
const APP_NAME: &str = "lite-edit";

/// Settings file name.
const SETTINGS_FILENAME: &str = "settings.json";

/// Settings key for the explorer sort strategy.
pub const SORT_TYPE_KEY: &str = "explorer.sortType";

/// Settings key for the explorer sort direction.
pub const SORT_DIRECTION_KEY: &str = "explorer.sortDirection";

/// Returns the path to the settings file, or `None` if the platform data
/// directory cannot be determined.
pub fn settings_file_path() -> Option<PathBuf> {
    Some(dirs::data_dir()?.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// A loaded, immutable view of the settings file.
pub struct Settings {
    values: serde_json::Map<String, Value>,
}

impl Settings {
    /// Loads the settings file from its platform location.
    pub fn load() -> Self {
        match settings_file_path() {
            Some(path) => Self::load_from(&path),
            None => Self::empty(),
        }
    }

    /// Loads a settings file from an explicit path.
    ///
    /// A missing file is normal (first launch) and yields empty settings; a
    /// malformed file yields empty settings with a warning.
    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            // Missing file is normal on first launch; anything else is worth
            // a warning before degrading to defaults.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::empty(),
            Err(e) => {
                eprintln!("Failed to read settings file {:?}: {}", path, e);
                return Self::empty();
            }
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(values)) => Self { values },
            Ok(_) | Err(_) => {
                eprintln!("Warning: settings file {:?} is not a JSON object, using defaults", path);
                Self::empty()
            }
        }
    }

    /// Settings with every key at its default.
    pub fn empty() -> Self {
        Self {
            values: serde_json::Map::new(),
        }
    }

    /// Returns the string value for `key`, or `default` when the key is
    /// absent or not a string.
    pub fn get<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.values
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
    }

    /// The sort state the tree starts in, from `explorer.sortType` and
    /// `explorer.sortDirection`. Unknown values fall back to the defaults.
    pub fn initial_sort_state(&self) -> SortState {
        let fallback = SortState::default();

        let sort_type = SortType::from_config_value(self.get(SORT_TYPE_KEY, ""))
            .unwrap_or(fallback.sort_type);
        let direction = match self.get(SORT_DIRECTION_KEY, "") {
            "ascending" => SortDirection::Ascending,
            "descending" => SortDirection::Descending,
            _ => fallback.direction,
        };

        SortState {
            sort_type,
            direction,
        }
    }
}
