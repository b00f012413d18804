//! A folder of images to mark, handed out one random picture at a time.

use std::path::{Path, PathBuf};

use image::ImageFormat;
use log::debug;
use rand::Rng;

use crate::loader::LoadError;

#[derive(Debug, Clone)]
pub struct ImageDirectory {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl ImageDirectory {
    /// Scans `root` for image files. Subdirectories are skipped.
    ///
    /// # Errors
    /// [`LoadError::Io`] when the folder cannot be read,
    /// [`LoadError::NoImages`] when it holds no image files.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let mut dir = Self {
            root: root.into(),
            files: Vec::new(),
        };
        dir.rescan()?;
        Ok(dir)
    }

    /// Re-reads the folder, picking up files added or removed since.
    ///
    /// # Errors
    /// See [`Self::open`].
    pub fn rescan(&mut self) -> Result<(), LoadError> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_file() && is_image(&path) {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(LoadError::NoImages(self.root.clone()));
        }
        files.sort();
        debug!("{} images in {}", files.len(), self.root.display());
        self.files = files;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// A uniformly random image.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Path> {
        if self.files.is_empty() {
            return None;
        }
        self.files.get(rng.gen_range(0..self.files.len())).map(PathBuf::as_path)
    }

    /// A random image other than `current`, unless it is the only one.
    pub fn pick_next<R: Rng + ?Sized>(&self, current: Option<&Path>, rng: &mut R) -> Option<&Path> {
        let candidates: Vec<&Path> = self
            .files
            .iter()
            .map(PathBuf::as_path)
            .filter(|p| Some(*p) != current)
            .collect();
        if candidates.is_empty() {
            return self.pick(rng);
        }
        candidates.get(rng.gen_range(0..candidates.len())).copied()
    }
}

fn is_image(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok_and(|format| format.can_read())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use rand::SeedableRng as _;
    use rand::rngs::StdRng;

    fn folder(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            let path = dir.path().join(name);
            if is_image(&path) {
                RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]))
                    .save(&path)
                    .unwrap();
            } else {
                std::fs::write(&path, b"notes").unwrap();
            }
        }
        dir
    }

    #[test]
    fn test_open_lists_only_images() {
        let tmp = folder(&["b.png", "a.png", "readme.txt"]);
        std::fs::create_dir(tmp.path().join("marked")).unwrap();

        let dir = ImageDirectory::open(tmp.path()).unwrap();
        let names: Vec<_> = dir
            .files()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.png", "b.png"]);
    }

    #[test]
    fn test_empty_folder() {
        let tmp = folder(&["readme.txt"]);
        let err = ImageDirectory::open(tmp.path()).unwrap_err();
        assert!(matches!(err, LoadError::NoImages(_)));
    }

    #[test]
    fn test_missing_folder() {
        let err = ImageDirectory::open("/definitely/not/a/folder").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_pick_covers_every_file() {
        let tmp = folder(&["a.png", "b.png", "c.png"]);
        let dir = ImageDirectory::open(tmp.path()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(dir.pick(&mut rng).unwrap().to_path_buf());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_pick_next_avoids_current() {
        let tmp = folder(&["a.png", "b.png"]);
        let dir = ImageDirectory::open(tmp.path()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let current = dir.files().first().unwrap().clone();

        for _ in 0..50 {
            assert_ne!(dir.pick_next(Some(current.as_path()), &mut rng), Some(current.as_path()));
        }
    }

    #[test]
    fn test_pick_next_single_file_repeats() {
        let tmp = folder(&["only.png"]);
        let dir = ImageDirectory::open(tmp.path()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let only = dir.files().first().unwrap().clone();
        assert_eq!(dir.pick_next(Some(only.as_path()), &mut rng), Some(only.as_path()));
    }

    #[test]
    fn test_rescan_sees_new_files() {
        let tmp = folder(&["a.png"]);
        let mut dir = ImageDirectory::open(tmp.path()).unwrap();
        RgbaImage::new(1, 1).save(tmp.path().join("b.png")).unwrap();
        dir.rescan().unwrap();
        assert_eq!(dir.len(), 2);
    }
}
