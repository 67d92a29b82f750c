//! SnapCanvas Compositing Engine
//!
//! A headless canvas compositing API for Rust: fetch a remote photograph,
//! fit it into a viewport as a locked background layer, overlay independently
//! manipulable text and shape objects, and flatten the whole scene into a
//! downloadable PNG.
//!
//! # Features
//!
//! - **Remote Image Loader**: converts a possibly cross-origin image URL into
//!   a self-contained, canvas-safe encoding (decoded pixels + data URL)
//! - **Composition Surface**: lifecycle state machine over a scene graph with
//!   one locked background and insertion-ordered foreground objects
//! - **Software Backend**: a CPU rasterizer behind the `SceneEngine` trait so
//!   alternative rendering backends stay swappable
//!
//! # Example
//!
//! ```no_run
//! use snapcanvas::{EditorConfig, FileDownloader, HostElement, ImageLoader, ShapeKind, SourceImage};
//!
//! # async fn demo() -> snapcanvas::Result<()> {
//! let config = EditorConfig::default();
//! let host = HostElement::new(800, 600);
//! let loader = ImageLoader::new(&config)?;
//!
//! let mut surface = snapcanvas::new_surface(config);
//! let source = SourceImage::from_url("https://images.example.com/photo.jpg");
//! surface.open(&host, source, &loader).await?;
//!
//! surface.add_text("Hello")?;
//! surface.add_shape(ShapeKind::Circle)?;
//! surface.export(&FileDownloader::new("."))?;
//! # Ok(())
//! # }
//! ```

use image::Rgba;
use serde::Deserialize;

pub mod error;
pub use error::{Error, Result};

pub mod download;
pub mod host;
pub mod loader;
pub mod scene;
pub mod surface;

pub use download::{Downloader, FileDownloader};
pub use host::{HostElement, ResizeSubscription};
pub use loader::{EncodedImage, ImageLoader};
pub use scene::{ExportArtifact, ObjectId, RasterEngine, SceneObject, ShapeKind};
pub use surface::{fit_contain, BackgroundPlacement, CompositionSurface, LoadTicket, SurfaceState};

/// Configuration for an editing session
///
/// The defaults reproduce the editor's fixed insertion values: text lands at
/// the (100, 100) anchor at 24px in black, shapes at the (150, 150) anchor
/// with a per-kind fill, and exports are named `image-with-text.png`.
///
/// # Examples
///
/// ```
/// let cfg = snapcanvas::EditorConfig::default();
/// assert_eq!(cfg.export_filename, "image-with-text.png");
/// ```
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// User agent string to send with image fetches
    pub user_agent: String,
    /// Timeout for the background fetch in milliseconds
    pub timeout_ms: u64,
    /// Filename handed to the download mechanism on export
    pub export_filename: String,
    /// Base color of the drawing surface (visible as letterboxing)
    pub canvas_color: Rgba<u8>,
    /// Default anchor for inserted text boxes
    pub text_left: f64,
    pub text_top: f64,
    /// Default font size for inserted text boxes
    pub text_font_size: f32,
    /// Default fill for inserted text boxes
    pub text_fill: Rgba<u8>,
    /// Default anchor for inserted shapes
    pub shape_left: f64,
    pub shape_top: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) snapcanvas/0.1".to_string(),
            timeout_ms: 30000,
            export_filename: "image-with-text.png".to_string(),
            canvas_color: Rgba([255, 255, 255, 255]),
            text_left: 100.0,
            text_top: 100.0,
            text_font_size: 24.0,
            text_fill: Rgba([0, 0, 0, 255]),
            shape_left: 150.0,
            shape_top: 150.0,
        }
    }
}

/// Viewport dimensions in device-independent pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

impl Viewport {
    /// Width-to-height ratio, with zero height treated as 1 to stay finite.
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }
}

/// Size variants of a stock photograph as published by the search provider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageSrc {
    #[serde(default)]
    pub original: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub small: Option<String>,
}

/// A stock photograph handed over by the search collaborator
///
/// This is the session-start input to the editor: an opaque URL plus
/// descriptive metadata. The editor itself never performs a search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceImage {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub photographer: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub src: ImageSrc,
}

impl SourceImage {
    /// Wrap a bare URL as a session input (no metadata).
    pub fn from_url(url: &str) -> Self {
        Self {
            src: ImageSrc {
                large: Some(url.to_string()),
                ..ImageSrc::default()
            },
            ..Self::default()
        }
    }

    /// The URL the editor session consumes: the `large` rendition, falling
    /// back to the other published sizes when it is absent.
    pub fn preferred_url(&self) -> Option<&str> {
        self.src
            .large
            .as_deref()
            .or(self.src.original.as_deref())
            .or(self.src.medium.as_deref())
            .or(self.src.small.as_deref())
    }
}

/// Core trait for scene-graph rendering backends
///
/// The composition surface orchestrates *what* is in the scene (which objects,
/// when, at what initial transform); implementations of this trait own all
/// pixel-level rendering and direct-manipulation mechanics. Exactly one engine
/// may be bound to a [`HostElement`] at a time; the binding is released when
/// the engine is closed or dropped.
pub trait SceneEngine {
    /// Bind a new engine instance to the host element, sized to the host's
    /// current client dimensions. Fails with [`Error::EngineBinding`] when the
    /// host already has a live engine.
    fn bind(host: &HostElement, config: &EditorConfig) -> Result<Self>
    where
        Self: Sized;

    /// Current drawing-surface pixel dimensions
    fn dimensions(&self) -> (u32, u32);

    /// Resize the drawing surface. Object placements are untouched.
    fn set_dimensions(&mut self, width: u32, height: u32);

    /// Append an object to the paint-order list and return its id.
    fn add_object(&mut self, object: SceneObject) -> ObjectId;

    /// Remove an object. Returns `false` when the id is unknown.
    fn remove_object(&mut self, id: ObjectId) -> bool;

    /// Number of objects in the scene, background included.
    fn object_count(&self) -> usize;

    /// The scene in paint order (index 0 renders first, at the bottom).
    fn objects(&self) -> &[(ObjectId, SceneObject)];

    /// Mark an object as the active selection.
    fn set_active_object(&mut self, id: ObjectId);

    /// Clear the active selection.
    fn discard_active_object(&mut self);

    /// Currently selected object, if any.
    fn active_object(&self) -> Option<ObjectId>;

    /// Topmost interactive object under the given point, skipping objects
    /// flagged non-evented (the background is never returned).
    fn hit_test(&self, x: f64, y: f64) -> Option<ObjectId>;

    /// Move an object to a new position. Returns `false` for unknown ids.
    fn move_object(&mut self, id: ObjectId, left: f64, top: f64) -> bool;

    /// Repaint the on-screen frame, including editor decorations such as the
    /// active-selection outline.
    fn render(&mut self) -> Result<()>;

    /// Flatten the current scene to PNG bytes. Editor decorations are never
    /// part of the flattened pixels.
    fn export_png(&mut self) -> Result<Vec<u8>>;

    /// Release the engine and its host binding.
    fn close(self) -> Result<()>;
}

/// Create a composition surface backed by the built-in software rasterizer.
pub fn new_surface(config: EditorConfig) -> CompositionSurface<RasterEngine> {
    CompositionSurface::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.timeout_ms, 30000);
        assert_eq!(config.export_filename, "image-with-text.png");
        assert_eq!(config.text_font_size, 24.0);
        assert_eq!(config.text_fill, Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_viewport() {
        let viewport = Viewport {
            width: 1920,
            height: 1080,
        };
        assert_eq!(viewport.width, 1920);
        assert_eq!(viewport.height, 1080);
        assert!((viewport.aspect() - 16.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_source_image_preferred_url() {
        let bare = SourceImage::from_url("https://example.com/a.jpg");
        assert_eq!(bare.preferred_url(), Some("https://example.com/a.jpg"));

        let fallback = SourceImage {
            src: ImageSrc {
                medium: Some("https://example.com/m.jpg".to_string()),
                ..ImageSrc::default()
            },
            ..SourceImage::default()
        };
        assert_eq!(fallback.preferred_url(), Some("https://example.com/m.jpg"));
        assert_eq!(SourceImage::default().preferred_url(), None);
    }

    #[test]
    fn test_source_image_deserialize() {
        let payload = r#"{
            "id": 1181244,
            "url": "https://www.pexels.com/photo/1181244/",
            "photographer": "Christina Morillo",
            "alt": "Woman in gray jacket",
            "src": {
                "original": "https://images.pexels.com/photos/1181244/original.jpg",
                "large": "https://images.pexels.com/photos/1181244/large.jpg"
            }
        }"#;
        let image: SourceImage = serde_json::from_str(payload).expect("valid payload");
        assert_eq!(image.id, 1181244);
        assert!(image.preferred_url().unwrap().ends_with("large.jpg"));
    }
}
