//! Font discovery shared by the PDF document and the chart renderer.
//!
//! Search order:
//! 1. `SALES_REPORT_FONTS_DIR`, then `assets/fonts` next to the executable, then `assets/fonts`
//!    in the crate manifest directory, each expected to hold the bundled Roboto family.
//! 2. System fallbacks: Windows Arial (`SALES_REPORT_WINDOWS_FONTS_DIR`, `WINDIR`, `SystemRoot`)
//!    and DejaVu Sans from the usual Linux font directories.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::Error;
use genpdf::fonts::{FontData, FontFamily};
use log::{debug, warn};

/// Name of the bundled font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Roboto";

/// File names making up one font family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontFiles {
    pub regular: &'static str,
    pub bold: &'static str,
    pub italic: &'static str,
    pub bold_italic: &'static str,
}

impl FontFiles {
    fn all(&self) -> [&'static str; 4] {
        [self.regular, self.bold, self.italic, self.bold_italic]
    }
}

const BUNDLED_FONT_FILES: FontFiles = FontFiles {
    regular: "Roboto-Regular.ttf",
    bold: "Roboto-Bold.ttf",
    italic: "Roboto-Italic.ttf",
    bold_italic: "Roboto-BoldItalic.ttf",
};

const WINDOWS_FONT_FILES: FontFiles = FontFiles {
    regular: "arial.ttf",
    bold: "arialbd.ttf",
    italic: "ariali.ttf",
    bold_italic: "arialbi.ttf",
};

const DEJAVU_FONT_FILES: FontFiles = FontFiles {
    regular: "DejaVuSans.ttf",
    bold: "DejaVuSans-Bold.ttf",
    italic: "DejaVuSans-Oblique.ttf",
    bold_italic: "DejaVuSans-BoldOblique.ttf",
};

const LINUX_FONT_DIRECTORIES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/dejavu",
    "/usr/share/fonts/TTF",
    "/usr/local/share/fonts",
];

/// A directory holding a complete font family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontSource {
    family_name: &'static str,
    directory: PathBuf,
    files: FontFiles,
}

impl FontSource {
    /// Returns the family name used in log messages.
    pub fn family_name(&self) -> &str {
        self.family_name
    }

    /// Returns the directory the family is loaded from.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the regular face.
    pub fn regular_path(&self) -> PathBuf {
        self.directory.join(self.files.regular)
    }

    /// Loads all four faces as a `genpdf` font family.
    pub fn load_family(&self) -> Result<FontFamily<FontData>, Error> {
        Ok(FontFamily {
            regular: self.load_face(self.files.regular, "regular")?,
            bold: self.load_face(self.files.bold, "bold")?,
            italic: self.load_face(self.files.italic, "italic")?,
            bold_italic: self.load_face(self.files.bold_italic, "bold italic")?,
        })
    }

    /// Reads the raw bytes of the regular face, used for chart text.
    pub fn regular_face_bytes(&self) -> Result<Vec<u8>, Error> {
        let path = self.regular_path();
        fs::read(&path).map_err(|err| {
            Error::new(
                format!("Failed to read chart font {}", path.display()),
                err,
            )
        })
    }

    fn load_face(&self, file: &str, style: &str) -> Result<FontData, Error> {
        let path = self.directory.join(file);
        FontData::load(&path, None).map_err(|err| {
            let io_kind = if path.is_file() {
                io::ErrorKind::Other
            } else {
                io::ErrorKind::NotFound
            };
            Error::new(
                format!(
                    "Failed to load {} {} font at {}: {}",
                    self.family_name,
                    style,
                    path.display(),
                    err
                ),
                io::Error::new(io_kind, err.to_string()),
            )
        })
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

fn push_unique(candidates: &mut Vec<PathBuf>, candidate: PathBuf) {
    if !candidates.iter().any(|existing| existing == &candidate) {
        candidates.push(candidate);
    }
}

fn bundled_directory_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = env_path("SALES_REPORT_FONTS_DIR") {
        candidates.push(path);
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            push_unique(&mut candidates, bin_dir.join("assets/fonts"));
        }
    }

    push_unique(
        &mut candidates,
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"),
    );
    candidates
}

fn fallback_candidates() -> Vec<(&'static str, PathBuf, FontFiles)> {
    let mut candidates = Vec::new();

    if let Some(path) = env_path("SALES_REPORT_WINDOWS_FONTS_DIR") {
        candidates.push(("Arial", path, WINDOWS_FONT_FILES));
    }
    for var in ["WINDIR", "SystemRoot"] {
        if let Some(root) = env_path(var) {
            candidates.push(("Arial", root.join("Fonts"), WINDOWS_FONT_FILES));
        }
    }
    for directory in LINUX_FONT_DIRECTORIES {
        candidates.push(("DejaVu Sans", PathBuf::from(directory), DEJAVU_FONT_FILES));
    }
    candidates
}

fn missing_font_files(path: &Path, files: &FontFiles) -> Vec<&'static str> {
    files
        .all()
        .into_iter()
        .filter(|name| !path.join(name).is_file())
        .collect()
}

/// Locates the first complete font family, preferring the bundled fonts.
pub fn resolve_font_source() -> Result<FontSource, Error> {
    let mut attempts = Vec::new();

    let bundled = bundled_directory_candidates()
        .into_iter()
        .map(|dir| (DEFAULT_FONT_FAMILY_NAME, dir, BUNDLED_FONT_FILES));
    for (family_name, directory, files) in bundled.chain(fallback_candidates()) {
        if !directory.is_dir() {
            attempts.push(format!("{} (directory missing)", directory.display()));
            continue;
        }

        let missing = missing_font_files(&directory, &files);
        if missing.is_empty() {
            if family_name == DEFAULT_FONT_FAMILY_NAME {
                debug!("Using bundled fonts from {}", directory.display());
            } else {
                warn!(
                    "Bundled fonts unavailable; falling back to '{}' from {}",
                    family_name,
                    directory.display()
                );
            }
            return Ok(FontSource {
                family_name,
                directory,
                files,
            });
        }

        attempts.push(format!(
            "{} (missing files [{}])",
            directory.display(),
            missing.join(", ")
        ));
    }

    Err(Error::new(
        format!(
            "Unable to locate a font family. Checked: {}. Copy Roboto into assets/fonts or set SALES_REPORT_FONTS_DIR.",
            attempts.join(", ")
        ),
        io::Error::new(io::ErrorKind::NotFound, "fonts not found"),
    ))
}

/// Indicates whether any usable font family is present on disk.
pub fn default_fonts_available() -> bool {
    resolve_font_source().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Roboto-Regular.ttf"), b"").unwrap();

        let missing = missing_font_files(dir.path(), &BUNDLED_FONT_FILES);
        assert_eq!(
            missing,
            vec![
                "Roboto-Bold.ttf",
                "Roboto-Italic.ttf",
                "Roboto-BoldItalic.ttf"
            ]
        );
    }

    #[test]
    fn bundled_candidates_include_manifest_directory() {
        let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts");
        assert!(bundled_directory_candidates().contains(&manifest));
    }
}
