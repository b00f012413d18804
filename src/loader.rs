//! Asynchronous bitmap loading.
//!
//! A load is a [`LoadFuture`] resolving to the decoded bitmap. The selector
//! owns at most one of them; dropping it cancels the load.

use std::path::PathBuf;

use futures::FutureExt as _;
use futures::future::{self, BoxFuture};
use image::{Rgba, RgbaImage};
use thiserror::Error;

/// URI loaded when `load_image` is called without one.
pub const DEFAULT_IMAGE_URI: &str = "builtin:demo";

const DEMO_SIZE: (u32, u32) = (320, 200);
const DEMO_CELL: u32 = 20;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("unsupported uri: {0}")]
    UnsupportedScheme(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("load was cancelled")]
    Cancelled,

    #[error("no images in {}", .0.display())]
    NoImages(PathBuf),
}

pub type LoadFuture = BoxFuture<'static, Result<RgbaImage, LoadError>>;

pub trait ImageLoader {
    /// Starts loading `uri`. The returned future must not borrow the loader.
    fn load(&self, uri: &str) -> LoadFuture;
}

/// Loads `builtin:` images, `file://` URIs and plain filesystem paths.
///
/// Files are read and decoded off the calling thread on native targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct UriLoader;

impl ImageLoader for UriLoader {
    fn load(&self, uri: &str) -> LoadFuture {
        match classify(uri) {
            Source::Builtin(name) => match builtin_image(name) {
                Some(img) => future::ready(Ok(img)).boxed(),
                None => future::ready(Err(LoadError::UnsupportedScheme(uri.to_owned()))).boxed(),
            },
            Source::File(path) => load_file(path),
            Source::Unsupported => {
                future::ready(Err(LoadError::UnsupportedScheme(uri.to_owned()))).boxed()
            }
        }
    }
}

enum Source<'a> {
    Builtin(&'a str),
    File(PathBuf),
    Unsupported,
}

fn classify(uri: &str) -> Source<'_> {
    if let Some(name) = uri.strip_prefix("builtin:") {
        return Source::Builtin(name);
    }
    if let Some(path) = uri.strip_prefix("file://") {
        return Source::File(PathBuf::from(path));
    }
    // Anything else with a scheme (http:, data:, ...) needs a host-provided loader.
    match uri.split_once("://") {
        Some(_) => Source::Unsupported,
        None if uri.is_empty() => Source::Unsupported,
        None => Source::File(PathBuf::from(uri)),
    }
}

fn builtin_image(name: &str) -> Option<RgbaImage> {
    match name {
        "demo" => Some(demo_image()),
        _ => None,
    }
}

/// Checkerboard used as the default demo picture.
pub fn demo_image() -> RgbaImage {
    let (width, height) = DEMO_SIZE;
    RgbaImage::from_fn(width, height, |x, y| {
        if (x / DEMO_CELL + y / DEMO_CELL) % 2 == 0 {
            Rgba([0x1d, 0xb9, 0x54, 0xff])
        } else {
            Rgba([0xf0, 0xf0, 0xf0, 0xff])
        }
    })
}

#[cfg(not(target_arch = "wasm32"))]
fn decode_file(path: &std::path::Path) -> Result<RgbaImage, LoadError> {
    let bytes = std::fs::read(path)?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

#[cfg(not(target_arch = "wasm32"))]
fn load_file(path: PathBuf) -> LoadFuture {
    let (tx, rx) = futures::channel::oneshot::channel();
    let spawned = std::thread::Builder::new()
        .name("image-load".to_owned())
        .spawn(move || {
            // The receiver is gone when the load was superseded.
            tx.send(decode_file(&path)).ok();
        });
    if let Err(err) = spawned {
        return future::ready(Err(LoadError::Io(err))).boxed();
    }
    rx.map(|res| res.unwrap_or(Err(LoadError::Cancelled))).boxed()
}

#[cfg(target_arch = "wasm32")]
fn load_file(path: PathBuf) -> LoadFuture {
    future::ready(Err(LoadError::UnsupportedScheme(path.display().to_string()))).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_builtin_demo() {
        let img = block_on(UriLoader.load(DEFAULT_IMAGE_URI)).unwrap();
        assert_eq!(img.dimensions(), DEMO_SIZE);
    }

    #[test]
    fn test_unknown_builtin() {
        let err = block_on(UriLoader.load("builtin:nope")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedScheme(_)));
    }

    #[test]
    fn test_http_is_unsupported() {
        let err = block_on(UriLoader.load("http://example.com/a.png")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedScheme(_)));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pic.png");
        RgbaImage::from_pixel(7, 3, Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let img = block_on(UriLoader.load(path.to_str().unwrap())).unwrap();
        assert_eq!(img.dimensions(), (7, 3));

        let uri = format!("file://{}", path.display());
        let img = block_on(UriLoader.load(&uri)).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [1, 2, 3, 255]);
    }

    #[test]
    fn test_missing_file() {
        let err = block_on(UriLoader.load("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_garbage_file_fails_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.png");
        std::fs::write(&path, b"not an image").unwrap();
        let err = block_on(UriLoader.load(path.to_str().unwrap())).unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));
    }
}
