//! Project images and the on-disk helpers behind reconciliation.
//!
//! An image is identified by its path relative to the project's `images/`
//! directory. Pixel data never enters this layer; decoding belongs to the
//! imaging boundary, which is handed the relative path.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::ProjectError;
use crate::events::EventEmitter;

/// Directory under the project root that holds the slide files.
pub const IMAGES_DIR: &str = "images";

/// Supported microscopy formats.
pub const IMAGE_EXTENSIONS: &[&str] = &["svs", "scn"];

/// Check if a filename has a supported image extension.
pub fn is_image_filename(name: &str) -> bool {
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Events emitted by an [`Image`].
#[derive(Debug)]
pub struct ImageEvents {
    pub block_name: EventEmitter<String>,
    pub panel_name: EventEmitter<String>,
}

/// A slide image tracked by the project.
///
/// `block_name` and `panel_name` reference entities by name; either may be
/// empty when the association has not been made (or the entity was deleted).
pub struct Image {
    relpath: RefCell<PathBuf>,
    block_name: RefCell<String>,
    panel_name: RefCell<String>,
    pub events: ImageEvents,
}

/// Shared handle to an [`Image`].
pub type ImageRef = Rc<Image>;

impl Image {
    pub fn new(relpath: impl Into<PathBuf>) -> ImageRef {
        Self::from_parts(relpath.into(), String::new(), String::new())
    }

    fn from_parts(relpath: PathBuf, block_name: String, panel_name: String) -> ImageRef {
        Rc::new(Self {
            relpath: RefCell::new(relpath),
            block_name: RefCell::new(block_name),
            panel_name: RefCell::new(panel_name),
            events: ImageEvents {
                block_name: EventEmitter::new(),
                panel_name: EventEmitter::new(),
            },
        })
    }

    /// Path relative to the project's `images/` directory.
    pub fn relpath(&self) -> PathBuf {
        self.relpath.borrow().clone()
    }

    /// Repair the recorded path after the file was found elsewhere on disk.
    pub(crate) fn set_relpath(&self, val: PathBuf) {
        *self.relpath.borrow_mut() = val;
    }

    pub fn block_name(&self) -> String {
        self.block_name.borrow().clone()
    }

    pub fn set_block_name(&self, val: impl Into<String>) {
        let val = val.into();
        {
            let mut block_name = self.block_name.borrow_mut();
            if *block_name == val {
                return;
            }
            *block_name = val.clone();
        }
        self.events.block_name.emit(&val);
    }

    pub fn panel_name(&self) -> String {
        self.panel_name.borrow().clone()
    }

    pub fn set_panel_name(&self, val: impl Into<String>) {
        let val = val.into();
        {
            let mut panel_name = self.panel_name.borrow_mut();
            if *panel_name == val {
                return;
            }
            *panel_name = val.clone();
        }
        self.events.panel_name.emit(&val);
    }

    /// Whether the file is present under `basepath/images/`.
    pub fn exists(&self, basepath: &Path) -> bool {
        basepath.join(IMAGES_DIR).join(self.relpath()).exists()
    }

    /// Move the file to `dst_relpath` under `basepath/images/`, creating
    /// destination parents. With `clean`, an emptied source directory is
    /// removed. The recorded path follows the file.
    pub fn move_to(
        &self,
        basepath: &Path,
        dst_relpath: &Path,
        clean: bool,
    ) -> Result<(), ProjectError> {
        let src = basepath.join(IMAGES_DIR).join(self.relpath());
        let dst = basepath.join(IMAGES_DIR).join(dst_relpath);

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&src, &dst)?;

        if clean {
            if let Some(parent) = src.parent() {
                if is_dir_empty(parent)? {
                    fs::remove_dir(parent)?;
                }
            }
        }

        self.set_relpath(dst_relpath.to_path_buf());
        Ok(())
    }

    pub fn to_data(&self) -> ImageData {
        ImageData {
            relpath: Some(self.relpath().to_string_lossy().into_owned()),
            block_name: self.block_name(),
            panel_name: self.panel_name(),
        }
    }

    /// Build an image from its serialized record. A record without a path
    /// has no identity and is rejected.
    pub fn from_data(data: &ImageData) -> Result<ImageRef, ProjectError> {
        let relpath = data
            .relpath
            .as_ref()
            .ok_or_else(|| ProjectError::missing_field("relpath"))?;
        Ok(Self::from_parts(
            PathBuf::from(relpath),
            data.block_name.clone(),
            data.panel_name.clone(),
        ))
    }
}

fn is_dir_empty(path: &Path) -> Result<bool, ProjectError> {
    if !path.is_dir() {
        return Err(ProjectError::NotADirectory {
            path: path.to_path_buf(),
        });
    }
    Ok(fs::read_dir(path)?.next().is_none())
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Image(relpath={:?}, block_name={}, panel_name={})",
            self.relpath(),
            self.block_name(),
            self.panel_name()
        )
    }
}

/// Serializable image record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    #[serde(default)]
    pub relpath: Option<String>,
    #[serde(default)]
    pub block_name: String,
    #[serde(default)]
    pub panel_name: String,
}

/// Recursively collect image paths under `basepath/images/`, relative to
/// that directory.
///
/// Two physically distinct files sharing a base filename cannot be told
/// apart during reconciliation, so they abort the load.
pub fn scan_image_relpaths(basepath: &Path) -> Result<Vec<PathBuf>, ProjectError> {
    let images_dir = basepath.join(IMAGES_DIR);

    let mut relpaths = Vec::new();
    if images_dir.is_dir() {
        scan_dir(&images_dir, &images_dir, &mut relpaths)?;
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for relpath in &relpaths {
        if let Some(name) = relpath.file_name().and_then(|n| n.to_str()) {
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }
    let duplicates: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name)
        .collect();
    if !duplicates.is_empty() {
        return Err(ProjectError::DuplicateImageFilenames { names: duplicates });
    }

    Ok(relpaths)
}

fn scan_dir(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ProjectError> {
    for entry in fs::read_dir(dir)?.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            scan_dir(root, &path, out)?;
        } else if path.is_file() && is_image_file(&path) {
            if let Ok(relpath) = path.strip_prefix(root) {
                out.push(relpath.to_path_buf());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_image_filename_allowlist() {
        assert!(is_image_filename("slide.svs"));
        assert!(is_image_filename("Slide.SCN"));
        assert!(!is_image_filename("slide.tiff"));
        assert!(!is_image_filename("slide"));
    }

    #[test]
    fn test_from_data_requires_relpath() {
        let data = ImageData {
            relpath: None,
            block_name: "B1".to_string(),
            panel_name: String::new(),
        };
        assert!(matches!(
            Image::from_data(&data),
            Err(ProjectError::MissingField { .. })
        ));
    }

    #[test]
    fn test_scan_collects_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("images/a.svs"));
        touch(&dir.path().join("images/sub/b.scn"));
        touch(&dir.path().join("images/sub/ignored.txt"));

        let mut relpaths = scan_image_relpaths(dir.path()).unwrap();
        relpaths.sort();
        assert_eq!(
            relpaths,
            vec![PathBuf::from("a.svs"), PathBuf::from("sub/b.scn")]
        );
    }

    #[test]
    fn test_scan_missing_images_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_image_relpaths(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_scan_rejects_duplicate_basenames() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("images/a/slide.svs"));
        touch(&dir.path().join("images/b/slide.svs"));

        assert!(matches!(
            scan_image_relpaths(dir.path()),
            Err(ProjectError::DuplicateImageFilenames { .. })
        ));
    }

    #[test]
    fn test_move_to_relocates_file_and_path() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("images/old/slide.svs"));

        let image = Image::new("old/slide.svs");
        image
            .move_to(dir.path(), Path::new("new/slide.svs"), true)
            .unwrap();

        assert_eq!(image.relpath(), PathBuf::from("new/slide.svs"));
        assert!(dir.path().join("images/new/slide.svs").exists());
        assert!(!dir.path().join("images/old").exists());
    }
}
