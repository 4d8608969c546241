use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;

pub use app::{
    run_app, run_app_with_metrics, text_width_px, AppError, CursorAlignment, Frame,
    GraphicsOptions, InputEvent, InputState, KeyCode, LoopConfig, LoopMetricsSnapshot,
    MetricsHandle, MiscOptions, MouseButton, Options, OptionsError, Panel, PanelContext,
    PanelCursor, PanelError, PanelStack, PhaseError, Renderer, ScreenshotError, Surface,
    TransitionRequests, Vec2, Viewport, GLYPH_ADVANCE, LINE_ADVANCE, MIN_FPS,
};

pub const ROOT_ENV_VAR: &str = "RELIC_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub options_dir: PathBuf,
    pub screenshots_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create user data directory at {path}: {source}")]
    CreateUserDataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "RELIC_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or options/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or options/.\n\
Set {env_var} explicitly, for example:\n\
PowerShell: $env:{env_var}=\"C:\\path\\to\\Relic\"\n\
Bash/zsh: export {env_var}=\"/path/to/Relic\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let user_data_dir = root.join("userdata");
    let options_dir = user_data_dir.join("options");
    let screenshots_dir = user_data_dir.join("screenshots");

    for dir in [&options_dir, &screenshots_dir] {
        fs::create_dir_all(dir).map_err(|source| StartupError::CreateUserDataDir {
            path: dir.clone(),
            source,
        })?;
    }

    Ok(AppPaths {
        root,
        options_dir,
        screenshots_dir,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_options = path.join("options").is_dir();

    cargo_toml && (has_crates || has_options)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
