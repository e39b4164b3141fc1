//! Input discovery for both pipeline stages.
//!
//! Directory listings are non-recursive and sorted by file name so a batch
//! always visits files in the same order.

use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader};

use crate::annotation::ANNOTATION_EXTENSION;
use crate::error::CoreError;

/// Extensions (lowercase, without the dot) accepted as image input.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

/// An image file selected for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub path: PathBuf,
    /// File name including extension, used in failure reports.
    pub file_name: String,
    /// File name without extension, used to name the annotation file.
    pub stem: String,
    pub byte_size: u64,
}

/// Pixel dimensions and detected format, read from the file header only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: Option<ImageFormat>,
}

impl ImageAsset {
    /// Read dimensions and format without decoding pixel data.
    pub fn probe(&self) -> Result<ImageInfo, CoreError> {
        let reader = ImageReader::open(&self.path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| CoreError::io(&self.path, e))?;
        let format = reader.format();
        let (width, height) = reader.into_dimensions().map_err(|e| {
            CoreError::Validation(format!("{}: unreadable image header: {e}", self.file_name))
        })?;
        Ok(ImageInfo {
            width,
            height,
            format,
        })
    }
}

/// Whether `path` has one of the [`IMAGE_EXTENSIONS`] (case-insensitive).
pub fn is_image_path(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

/// List the image files directly inside `dir`.
pub fn scan_images(dir: &Path) -> Result<Vec<ImageAsset>, CoreError> {
    let mut assets = Vec::new();
    for path in list_files(dir)? {
        if !is_image_path(&path) {
            continue;
        }
        let (Some(file_name), Some(stem)) = (
            path.file_name().and_then(|n| n.to_str()),
            path.file_stem().and_then(|s| s.to_str()),
        ) else {
            tracing::warn!(path = %path.display(), "Skipping file with non-UTF-8 name");
            continue;
        };
        let byte_size = std::fs::metadata(&path)
            .map_err(|e| CoreError::io(&path, e))?
            .len();
        assets.push(ImageAsset {
            file_name: file_name.to_string(),
            stem: stem.to_string(),
            byte_size,
            path,
        });
    }
    Ok(assets)
}

/// List the annotation (`*.json`) files directly inside `dir`.
pub fn scan_annotations(dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
    Ok(list_files(dir)?
        .into_iter()
        .filter(|p| has_extension(p, &[ANNOTATION_EXTENSION]))
        .collect())
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| ext.eq_ignore_ascii_case(a)))
}

/// Regular files directly inside `dir`, sorted by path.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let entries = std::fs::read_dir(dir).map_err(|e| CoreError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CoreError::io(dir, e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| CoreError::io(&entry.path(), e))?
            .is_file();
        if is_file {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
