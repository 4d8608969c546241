use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::rendering::Surface;

const SCREENSHOT_PREFIX: &str = "screenshot";

#[derive(Debug, Error)]
pub enum ScreenshotError {
    #[error("failed to create screenshot directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write screenshot to {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Lowest `screenshotNNN.png` name not already taken, zero-padded to three
/// digits. Existing files are skipped, never overwritten.
pub(crate) fn next_available_screenshot_path(dir: &Path) -> PathBuf {
    let mut index: u32 = 0;
    loop {
        let candidate = dir.join(format!("{}{:03}.png", SCREENSHOT_PREFIX, index));
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}

pub(crate) fn save_screenshot(dir: &Path, surface: &Surface) -> Result<PathBuf, ScreenshotError> {
    fs::create_dir_all(dir).map_err(|source| ScreenshotError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = next_available_screenshot_path(dir);
    image::save_buffer(
        &path,
        &surface.rgba,
        surface.width,
        surface.height,
        image::ExtendedColorType::Rgba8,
    )
    .map_err(|source| ScreenshotError::Encode {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), "screenshot_saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;

    fn touch(path: &Path) {
        File::create(path).expect("create file");
    }

    #[test]
    fn first_screenshot_uses_index_zero_with_padding() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = next_available_screenshot_path(dir.path());
        assert_eq!(path.file_name().expect("name"), "screenshot000.png");
    }

    #[test]
    fn existing_indices_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("screenshot000.png"));
        touch(&dir.path().join("screenshot001.png"));

        let path = next_available_screenshot_path(dir.path());
        assert_eq!(path.file_name().expect("name"), "screenshot002.png");
    }

    #[test]
    fn gaps_are_filled_before_appending() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("screenshot000.png"));
        touch(&dir.path().join("screenshot002.png"));

        let path = next_available_screenshot_path(dir.path());
        assert_eq!(path.file_name().expect("name"), "screenshot001.png");
    }

    #[test]
    fn save_encodes_png_and_returns_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let surface = Surface {
            width: 2,
            height: 2,
            rgba: vec![255; 2 * 2 * 4],
        };

        let path = save_screenshot(dir.path(), &surface).expect("save");
        assert!(path.is_file());
        assert_eq!(path.file_name().expect("name"), "screenshot000.png");

        let second = save_screenshot(dir.path(), &surface).expect("save again");
        assert_eq!(second.file_name().expect("name"), "screenshot001.png");
    }

    #[test]
    fn save_creates_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("userdata").join("screenshots");
        let surface = Surface {
            width: 1,
            height: 1,
            rgba: vec![0, 0, 0, 255],
        };

        let path = save_screenshot(&nested, &surface).expect("save");
        assert!(path.starts_with(&nested));
    }
}
