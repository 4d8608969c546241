use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::AppPaths;

pub const DEFAULT_OPTIONS_FILENAME: &str = "options-default.json";
pub const CHANGES_OPTIONS_FILENAME: &str = "options-changes.json";

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("failed to access options file at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse options file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("default options file is missing: {path}")]
    MissingDefaults { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsOptions {
    pub screen_width: u32,
    pub screen_height: u32,
    pub target_fps: u32,
    pub resolution_scale: f64,
    pub fullscreen: bool,
    pub modern_interface: bool,
    pub cursor_scale: f64,
}

impl Default for GraphicsOptions {
    fn default() -> Self {
        Self {
            screen_width: 1280,
            screen_height: 720,
            target_fps: 60,
            resolution_scale: 1.0,
            fullscreen: false,
            modern_interface: false,
            cursor_scale: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiscOptions {
    pub show_intro: bool,
}

impl Default for MiscOptions {
    fn default() -> Self {
        Self { show_intro: true }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct OptionValues {
    graphics: GraphicsOptions,
    misc: MiscOptions,
}

/// Effective options: defaults shipped with the app, overlaid by the user's
/// changes file. Only changed keys are written back, so new defaults reach
/// existing installs.
#[derive(Debug, Default)]
pub struct Options {
    values: OptionValues,
    changed: BTreeMap<String, Value>,
}

impl Options {
    pub fn load(paths: &AppPaths) -> Result<Self, OptionsError> {
        let defaults_path = paths.root.join("options").join(DEFAULT_OPTIONS_FILENAME);
        if !defaults_path.is_file() {
            return Err(OptionsError::MissingDefaults {
                path: defaults_path,
            });
        }
        let values = read_values(&defaults_path)?;

        let changes_path = paths.options_dir.join(CHANGES_OPTIONS_FILENAME);
        let changed = if changes_path.is_file() {
            read_changes(&changes_path)?
        } else {
            fs::write(&changes_path, "{}").map_err(|source| OptionsError::Io {
                path: changes_path.clone(),
                source,
            })?;
            BTreeMap::new()
        };

        let mut options = Self { values, changed };
        let stale_keys: Vec<String> = options
            .changed
            .iter()
            .filter(|(key, value)| !apply_change(&mut options.values, key, value))
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale_keys {
            warn!(key = key.as_str(), "ignoring unrecognized changed option");
            options.changed.remove(&key);
        }

        Ok(options)
    }

    pub fn save_changes(&self, paths: &AppPaths) -> Result<(), OptionsError> {
        let changes_path = paths.options_dir.join(CHANGES_OPTIONS_FILENAME);
        let serialized =
            serde_json::to_string_pretty(&self.changed).map_err(|source| OptionsError::Parse {
                path: changes_path.clone(),
                source,
            })?;
        fs::write(&changes_path, serialized).map_err(|source| OptionsError::Io {
            path: changes_path,
            source,
        })
    }

    pub fn graphics(&self) -> &GraphicsOptions {
        &self.values.graphics
    }

    pub fn misc(&self) -> &MiscOptions {
        &self.values.misc
    }

    pub fn set_target_fps(&mut self, target_fps: u32) {
        self.values.graphics.target_fps = target_fps;
        self.changed
            .insert("graphics.target_fps".to_string(), Value::from(target_fps));
    }

    pub fn set_resolution_scale(&mut self, resolution_scale: f64) {
        self.values.graphics.resolution_scale = resolution_scale;
        self.changed.insert(
            "graphics.resolution_scale".to_string(),
            Value::from(resolution_scale),
        );
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.values.graphics.fullscreen = fullscreen;
        self.changed
            .insert("graphics.fullscreen".to_string(), Value::from(fullscreen));
    }

    pub fn set_modern_interface(&mut self, modern_interface: bool) {
        self.values.graphics.modern_interface = modern_interface;
        self.changed.insert(
            "graphics.modern_interface".to_string(),
            Value::from(modern_interface),
        );
    }

    pub fn set_cursor_scale(&mut self, cursor_scale: f64) {
        self.values.graphics.cursor_scale = cursor_scale;
        self.changed
            .insert("graphics.cursor_scale".to_string(), Value::from(cursor_scale));
    }

    pub fn set_show_intro(&mut self, show_intro: bool) {
        self.values.misc.show_intro = show_intro;
        self.changed
            .insert("misc.show_intro".to_string(), Value::from(show_intro));
    }
}

fn read_values(path: &Path) -> Result<OptionValues, OptionsError> {
    let raw = fs::read_to_string(path).map_err(|source| OptionsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| OptionsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_changes(path: &Path) -> Result<BTreeMap<String, Value>, OptionsError> {
    let raw = fs::read_to_string(path).map_err(|source| OptionsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| OptionsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_change(values: &mut OptionValues, key: &str, value: &Value) -> bool {
    match key {
        "graphics.screen_width" => set_u32(&mut values.graphics.screen_width, value),
        "graphics.screen_height" => set_u32(&mut values.graphics.screen_height, value),
        "graphics.target_fps" => set_u32(&mut values.graphics.target_fps, value),
        "graphics.resolution_scale" => set_f64(&mut values.graphics.resolution_scale, value),
        "graphics.fullscreen" => set_bool(&mut values.graphics.fullscreen, value),
        "graphics.modern_interface" => set_bool(&mut values.graphics.modern_interface, value),
        "graphics.cursor_scale" => set_f64(&mut values.graphics.cursor_scale, value),
        "misc.show_intro" => set_bool(&mut values.misc.show_intro, value),
        _ => false,
    }
}

fn set_u32(slot: &mut u32, value: &Value) -> bool {
    match value.as_u64().and_then(|raw| u32::try_from(raw).ok()) {
        Some(parsed) => {
            *slot = parsed;
            true
        }
        None => false,
    }
}

fn set_f64(slot: &mut f64, value: &Value) -> bool {
    match value.as_f64() {
        Some(parsed) => {
            *slot = parsed;
            true
        }
        None => false,
    }
}

fn set_bool(slot: &mut bool, value: &Value) -> bool {
    match value.as_bool() {
        Some(parsed) => {
            *slot = parsed;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths_with_defaults(defaults_json: &str) -> (tempfile::TempDir, AppPaths) {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().to_path_buf();
        let options_src = root.join("options");
        fs::create_dir_all(&options_src).expect("options dir");
        fs::write(options_src.join(DEFAULT_OPTIONS_FILENAME), defaults_json)
            .expect("defaults file");

        let options_dir = root.join("userdata").join("options");
        let screenshots_dir = root.join("userdata").join("screenshots");
        fs::create_dir_all(&options_dir).expect("user options dir");
        fs::create_dir_all(&screenshots_dir).expect("screenshots dir");

        let paths = AppPaths {
            root,
            options_dir,
            screenshots_dir,
        };
        (dir, paths)
    }

    const DEFAULTS: &str = r#"{
        "graphics": {
            "screen_width": 1280,
            "screen_height": 720,
            "target_fps": 60,
            "resolution_scale": 1.0,
            "fullscreen": false,
            "modern_interface": false,
            "cursor_scale": 2.0
        },
        "misc": { "show_intro": true }
    }"#;

    #[test]
    fn missing_defaults_file_is_a_setup_fault() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths {
            root: dir.path().to_path_buf(),
            options_dir: dir.path().join("opts"),
            screenshots_dir: dir.path().join("shots"),
        };

        let error = Options::load(&paths).expect_err("load should fail");
        assert!(matches!(error, OptionsError::MissingDefaults { .. }));
    }

    #[test]
    fn load_creates_empty_changes_file_when_absent() {
        let (_dir, paths) = paths_with_defaults(DEFAULTS);

        let options = Options::load(&paths).expect("load");
        assert_eq!(options.graphics().target_fps, 60);

        let changes_path = paths.options_dir.join(CHANGES_OPTIONS_FILENAME);
        let raw = fs::read_to_string(changes_path).expect("changes file");
        assert_eq!(raw, "{}");
    }

    #[test]
    fn changes_overlay_defaults() {
        let (_dir, paths) = paths_with_defaults(DEFAULTS);
        fs::write(
            paths.options_dir.join(CHANGES_OPTIONS_FILENAME),
            r#"{ "graphics.target_fps": 144, "misc.show_intro": false }"#,
        )
        .expect("changes file");

        let options = Options::load(&paths).expect("load");
        assert_eq!(options.graphics().target_fps, 144);
        assert!(!options.misc().show_intro);
        // Untouched keys keep defaults.
        assert_eq!(options.graphics().screen_width, 1280);
    }

    #[test]
    fn unknown_changed_key_is_dropped() {
        let (_dir, paths) = paths_with_defaults(DEFAULTS);
        fs::write(
            paths.options_dir.join(CHANGES_OPTIONS_FILENAME),
            r#"{ "graphics.gamma": 1.8, "graphics.target_fps": 30 }"#,
        )
        .expect("changes file");

        let options = Options::load(&paths).expect("load");
        assert_eq!(options.graphics().target_fps, 30);

        options.save_changes(&paths).expect("save");
        let raw =
            fs::read_to_string(paths.options_dir.join(CHANGES_OPTIONS_FILENAME)).expect("read");
        let saved: BTreeMap<String, Value> = serde_json::from_str(&raw).expect("parse");
        assert!(!saved.contains_key("graphics.gamma"));
        assert!(saved.contains_key("graphics.target_fps"));
    }

    #[test]
    fn save_writes_changed_keys_only() {
        let (_dir, paths) = paths_with_defaults(DEFAULTS);
        let mut options = Options::load(&paths).expect("load");

        options.set_target_fps(90);
        options.save_changes(&paths).expect("save");

        let raw =
            fs::read_to_string(paths.options_dir.join(CHANGES_OPTIONS_FILENAME)).expect("read");
        let saved: BTreeMap<String, Value> = serde_json::from_str(&raw).expect("parse");
        assert_eq!(saved.len(), 1);
        assert_eq!(saved.get("graphics.target_fps"), Some(&Value::from(90u32)));
    }

    #[test]
    fn saved_changes_survive_a_reload() {
        let (_dir, paths) = paths_with_defaults(DEFAULTS);
        let mut options = Options::load(&paths).expect("load");
        options.set_fullscreen(true);
        options.set_cursor_scale(3.0);
        options.save_changes(&paths).expect("save");

        let reloaded = Options::load(&paths).expect("reload");
        assert!(reloaded.graphics().fullscreen);
        assert!((reloaded.graphics().cursor_scale - 3.0).abs() < f64::EPSILON);
        assert_eq!(reloaded.graphics().target_fps, 60);
    }

    #[test]
    fn wrongly_typed_changed_value_is_ignored() {
        let (_dir, paths) = paths_with_defaults(DEFAULTS);
        fs::write(
            paths.options_dir.join(CHANGES_OPTIONS_FILENAME),
            r#"{ "graphics.target_fps": "fast" }"#,
        )
        .expect("changes file");

        let options = Options::load(&paths).expect("load");
        assert_eq!(options.graphics().target_fps, 60);
    }
}
