//! Composition surface
//!
//! Owns the editing session's scene: one locked background photograph plus
//! zero or more user-added text and shape overlays, composed in insertion
//! order. The surface is a small state machine (`Uninitialized` before the
//! engine attaches, `Loading` while the background fetch is pending, `Ready`
//! for the rest of the session) and every mutating operation is gated on
//! `Ready` (early calls are no-ops, not errors; the UI is expected to keep
//! the controls disabled until then).

use crate::download::Downloader;
use crate::host::{HostElement, ResizeSubscription};
use crate::loader::{EncodedImage, ImageLoader};
use crate::scene::{ExportArtifact, ObjectId, SceneObject, ShapeKind};
use crate::{EditorConfig, Result, SceneEngine, SourceImage, Viewport};

/// Lifecycle state of a composition surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// No engine attached yet
    Uninitialized,
    /// Engine attached, background fetch pending
    Loading,
    /// Background placed (or recovered from a failed load); session live
    Ready,
}

/// Placement of the background photograph inside the viewport
///
/// Produced by [`fit_contain`]: the whole image is visible, aspect ratio
/// preserved, centered with symmetric letterboxing on the shorter axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundPlacement {
    /// Uniform scale factor applied to the natural dimensions
    pub scale: f64,
    pub left: f64,
    pub top: f64,
    /// Rendered width after scaling
    pub width: f64,
    /// Rendered height after scaling
    pub height: f64,
}

/// Liveness capture taken when a background load starts
///
/// The fetch cannot be aborted once in flight; instead its eventual
/// resolution is checked against the surface's current generation and
/// silently discarded when the surface was torn down or rebound in the
/// meantime.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    url: String,
}

impl LoadTicket {
    /// URL this load sequence is fetching
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Scale and center `image` dimensions inside `viewport` ("contain" fit).
///
/// When the image is relatively wider than the viewport the rendered width
/// equals the viewport width; otherwise the rendered height equals the
/// viewport height. The other axis follows proportionally and is centered.
pub fn fit_contain(image_width: u32, image_height: u32, viewport: Viewport) -> BackgroundPlacement {
    let iw = image_width.max(1) as f64;
    let ih = image_height.max(1) as f64;
    let vw = viewport.width.max(1) as f64;
    let vh = viewport.height.max(1) as f64;

    let scale = if iw / ih > vw / vh { vw / iw } else { vh / ih };
    let width = iw * scale;
    let height = ih * scale;
    BackgroundPlacement {
        scale,
        left: (vw - width) / 2.0,
        top: (vh - height) / 2.0,
        width,
        height,
    }
}

/// The interactive canvas compositing core
///
/// Generic over the [`SceneEngine`] collaborator that supplies rendering and
/// direct-manipulation mechanics; the surface itself decides *what* enters
/// the scene, when, and at which initial transform.
pub struct CompositionSurface<E: SceneEngine> {
    config: EditorConfig,
    state: SurfaceState,
    engine: Option<E>,
    resize_events: Option<ResizeSubscription>,
    viewport: Viewport,
    background: Option<ObjectId>,
    placement: Option<BackgroundPlacement>,
    source: Option<SourceImage>,
    generation: u64,
}

impl<E: SceneEngine> CompositionSurface<E> {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            state: SurfaceState::Uninitialized,
            engine: None,
            resize_events: None,
            viewport: Viewport::default(),
            background: None,
            placement: None,
            source: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SurfaceState::Ready
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The placement computed at load time, if a background was placed
    pub fn background_placement(&self) -> Option<BackgroundPlacement> {
        self.placement
    }

    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }

    /// The session's source image metadata
    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    /// Number of user-added objects (the background is not counted)
    pub fn foreground_count(&self) -> usize {
        self.engine
            .as_ref()
            .map(|e| e.object_count() - usize::from(self.background.is_some()))
            .unwrap_or(0)
    }

    /// Currently selected object, if any
    pub fn active_object(&self) -> Option<ObjectId> {
        self.engine.as_ref().and_then(|e| e.active_object())
    }

    /// The bound rendering engine, for embedders that need direct access
    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    /// Bind the engine to `host` and start the background-load sequence.
    ///
    /// Rebinding an already-initialized surface releases the previous engine
    /// and subscription first, so remount cycles never leak a rendering
    /// context or leave two engines fighting over one host.
    pub fn initialize(&mut self, host: &HostElement, source: SourceImage) -> Result<LoadTicket> {
        if self.engine.is_some() {
            log::debug!("reinitializing surface; releasing previous engine");
            self.dispose();
        }

        let engine = E::bind(host, &self.config)?;
        self.viewport = host.client_size();
        self.resize_events = Some(host.subscribe_resize());
        self.engine = Some(engine);
        self.generation += 1;
        self.state = SurfaceState::Loading;

        let url = source
            .preferred_url()
            .map(str::to_string)
            .unwrap_or_default();
        self.source = Some(source);
        log::debug!("surface loading {} at {:?}", url, self.viewport);
        Ok(LoadTicket {
            generation: self.generation,
            url,
        })
    }

    /// Run the full load sequence for `ticket`: fetch and decode through the
    /// loader, then place the background.
    ///
    /// Fetch and decode failures are terminal for the attempt: they are
    /// logged and the surface comes up over an empty canvas, still usable.
    /// Only an engine failure during placement is returned as an error.
    pub async fn load_background(&mut self, loader: &ImageLoader, ticket: LoadTicket) -> Result<()> {
        if ticket.url.is_empty() {
            log::error!("source image has no usable URL; showing empty canvas");
            return self.finish_without_background(&ticket);
        }
        match loader.load(&ticket.url).await {
            Ok(encoded) => self.place_background(&ticket, encoded),
            Err(err) => {
                log::error!("background load failed: {}", err);
                self.finish_without_background(&ticket)
            }
        }
    }

    /// Convenience for the whole session start: initialize + load + place.
    pub async fn open(
        &mut self,
        host: &HostElement,
        source: SourceImage,
        loader: &ImageLoader,
    ) -> Result<()> {
        let ticket = self.initialize(host, source)?;
        self.load_background(loader, ticket).await
    }

    /// Place a fetched background and enter `Ready`.
    ///
    /// A stale ticket (surface disposed or rebound since the load began) is
    /// discarded with a debug log; the delayed resolution must never mutate
    /// a scene it no longer belongs to.
    pub fn place_background(&mut self, ticket: &LoadTicket, image: EncodedImage) -> Result<()> {
        if !self.ticket_is_live(ticket) {
            log::debug!("discarding stale background load for {}", ticket.url);
            return Ok(());
        }
        if self.state != SurfaceState::Loading {
            log::debug!("ignoring background placement in {:?} state", self.state);
            return Ok(());
        }

        let placement = fit_contain(image.width(), image.height(), self.viewport);
        let Some(engine) = self.engine.as_mut() else {
            return Ok(());
        };
        let id = engine.add_object(SceneObject::Image {
            pixels: image.pixels(),
            left: placement.left,
            top: placement.top,
            scale: placement.scale,
        });
        self.background = Some(id);
        self.placement = Some(placement);
        self.state = SurfaceState::Ready;
        engine.render()?;
        log::debug!(
            "background placed at ({:.1}, {:.1}) scale {:.3}",
            placement.left,
            placement.top,
            placement.scale
        );
        Ok(())
    }

    fn finish_without_background(&mut self, ticket: &LoadTicket) -> Result<()> {
        if !self.ticket_is_live(ticket) || self.state != SurfaceState::Loading {
            return Ok(());
        }
        self.state = SurfaceState::Ready;
        if let Some(engine) = self.engine.as_mut() {
            engine.render()?;
        }
        Ok(())
    }

    fn ticket_is_live(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation && self.engine.is_some()
    }

    /// Insert a text box at the session's default anchor and select it.
    ///
    /// Empty or whitespace-only content is a no-op; an invisible object
    /// would still occupy the object list. Calls before `Ready` are no-ops.
    pub fn add_text(&mut self, content: &str) -> Result<Option<ObjectId>> {
        if self.state != SurfaceState::Ready {
            log::debug!("add_text ignored in {:?} state", self.state);
            return Ok(None);
        }
        if content.trim().is_empty() {
            log::debug!("add_text ignored: empty content");
            return Ok(None);
        }
        let object = SceneObject::Text {
            content: content.to_string(),
            left: self.config.text_left,
            top: self.config.text_top,
            font_size: self.config.text_font_size,
            fill: self.config.text_fill,
        };
        self.insert_and_select(object)
    }

    /// Insert a shape of `kind` at its fixed default size and select it.
    pub fn add_shape(&mut self, kind: ShapeKind) -> Result<Option<ObjectId>> {
        if self.state != SurfaceState::Ready {
            log::debug!("add_shape ignored in {:?} state", self.state);
            return Ok(None);
        }
        log::debug!("adding {} at the default anchor", kind.label());
        let left = self.config.shape_left;
        let top = self.config.shape_top;
        let (width, height) = kind.default_size();
        let fill = kind.default_fill();
        let object = match kind {
            ShapeKind::Rectangle => SceneObject::Rect {
                left,
                top,
                width,
                height,
                fill,
            },
            ShapeKind::Circle => SceneObject::Circle {
                left,
                top,
                radius: width / 2.0,
                fill,
            },
            ShapeKind::Triangle => SceneObject::Triangle {
                left,
                top,
                width,
                height,
                fill,
            },
        };
        self.insert_and_select(object)
    }

    fn insert_and_select(&mut self, object: SceneObject) -> Result<Option<ObjectId>> {
        let Some(engine) = self.engine.as_mut() else {
            log::debug!("insert ignored: no engine bound");
            return Ok(None);
        };
        let id = engine.add_object(object);
        engine.set_active_object(id);
        engine.render()?;
        Ok(Some(id))
    }

    /// Remove a foreground object. The background cannot be removed.
    pub fn remove_object(&mut self, id: ObjectId) -> Result<bool> {
        if self.state != SurfaceState::Ready {
            return Ok(false);
        }
        if self.background == Some(id) {
            log::warn!("ignoring attempt to remove the background layer");
            return Ok(false);
        }
        let Some(engine) = self.engine.as_mut() else {
            return Ok(false);
        };
        let removed = engine.remove_object(id);
        if removed {
            engine.render()?;
        }
        Ok(removed)
    }

    /// Select whatever interactive object sits under the point (topmost
    /// first; the locked background is never a target). Clears the selection
    /// when the point hits nothing.
    pub fn select_at(&mut self, x: f64, y: f64) -> Result<Option<ObjectId>> {
        if self.state != SurfaceState::Ready {
            return Ok(None);
        }
        let Some(engine) = self.engine.as_mut() else {
            return Ok(None);
        };
        let hit = engine.hit_test(x, y);
        match hit {
            Some(id) => engine.set_active_object(id),
            None => engine.discard_active_object(),
        }
        engine.render()?;
        Ok(hit)
    }

    /// Delegate a drag to the engine. Locked objects refuse to move.
    pub fn move_object(&mut self, id: ObjectId, left: f64, top: f64) -> Result<bool> {
        if self.state != SurfaceState::Ready {
            return Ok(false);
        }
        let Some(engine) = self.engine.as_mut() else {
            return Ok(false);
        };
        let moved = engine.move_object(id, left, top);
        if moved {
            engine.render()?;
        }
        Ok(moved)
    }

    /// Apply a viewport change: the drawable area tracks the new size, but
    /// object placements (the background's load-time fit included) are
    /// untouched.
    ///
    /// Valid while `Loading` (the host may resize before the fetch settles)
    /// and `Ready`; ignored before the engine attaches.
    pub fn resize(&mut self, viewport: Viewport) -> Result<()> {
        if self.state == SurfaceState::Uninitialized {
            log::debug!("resize ignored before initialization");
            return Ok(());
        }
        self.viewport = viewport;
        if let Some(engine) = self.engine.as_mut() {
            engine.set_dimensions(viewport.width, viewport.height);
            if self.state == SurfaceState::Ready {
                engine.render()?;
            }
        }
        Ok(())
    }

    /// Drain queued host resize events and apply them in arrival order.
    /// Returns how many were applied.
    pub fn pump_resize_events(&mut self) -> Result<usize> {
        let mut applied = 0;
        loop {
            let Some(viewport) = self.resize_events.as_ref().and_then(|s| s.next_event()) else {
                break;
            };
            self.resize(viewport)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Flatten the full composition in paint order and hand the artifact to
    /// the download mechanism.
    ///
    /// Selection outlines are editor decoration and never exported. Returns
    /// `Ok(None)` before `Ready`; an engine failure is fatal to the session
    /// and surfaces as [`crate::Error::Render`]; there is no partial artifact.
    pub fn export(&mut self, sink: &dyn Downloader) -> Result<Option<ExportArtifact>> {
        if self.state != SurfaceState::Ready {
            log::debug!("export ignored in {:?} state", self.state);
            return Ok(None);
        }
        let Some(engine) = self.engine.as_mut() else {
            return Ok(None);
        };
        let png_data = engine.export_png()?;
        let artifact = ExportArtifact {
            width: self.viewport.width,
            height: self.viewport.height,
            filename: self.config.export_filename.clone(),
            png_data,
        };
        log::debug!(
            "exported {} ({} bytes, sha256 {})",
            artifact.filename,
            artifact.png_data.len(),
            artifact.digest()
        );
        sink.save(&artifact);
        Ok(Some(artifact))
    }

    /// Release the engine, the host binding and the resize subscription.
    ///
    /// Safe to call in any state. Bumps the liveness generation so that any
    /// still-in-flight load resolves into a discard instead of a mutation.
    pub fn dispose(&mut self) {
        self.resize_events = None; // unsubscribes from the host registry
        if let Some(engine) = self.engine.take() {
            if let Err(err) = engine.close() {
                log::warn!("engine close failed: {}", err);
            }
        }
        self.background = None;
        self.placement = None;
        self.source = None;
        self.generation += 1;
        self.state = SurfaceState::Uninitialized;
        log::debug!("surface disposed");
    }
}

impl<E: SceneEngine> Drop for CompositionSurface<E> {
    fn drop(&mut self) {
        self.dispose();
    }
}
