//! Software scene-graph backend
//!
//! A CPU implementation of [`SceneEngine`]: composes the paint-order list
//! into an RGBA frame, rasterizes shapes and glyph outlines with alpha
//! blending, and encodes PNG exports. The on-screen frame produced by
//! `render` carries editor decorations (the active-selection outline);
//! exported pixels never do.

use std::io::Cursor;

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use image::{imageops, Rgba, RgbaImage};

use crate::host::{HostBinding, HostElement};
use crate::scene::object::{ObjectId, SceneObject};
use crate::{EditorConfig, Error, Result, SceneEngine};

/// Outline color for the active object (editor decoration only)
const SELECTION_OUTLINE: Rgba<u8> = Rgba([37, 99, 235, 255]);

/// Padding between an object's bounds and its selection outline, in pixels
const SELECTION_PAD: f64 = 2.0;

pub struct RasterEngine {
    width: u32,
    height: u32,
    canvas_color: Rgba<u8>,
    objects: Vec<(ObjectId, SceneObject)>,
    active: Option<ObjectId>,
    next_id: u64,
    frame: Option<RgbaImage>,
    font: Option<FontArc>,
    _binding: HostBinding,
}

impl RasterEngine {
    /// The last frame produced by `render`, decorations included.
    /// `None` until the first paint.
    pub fn frame(&self) -> Option<&RgbaImage> {
        self.frame.as_ref()
    }

    fn compose(&self, with_decorations: bool) -> RgbaImage {
        let mut frame = RgbaImage::from_pixel(
            self.width.max(1),
            self.height.max(1),
            self.canvas_color,
        );

        for (id, object) in &self.objects {
            match object {
                SceneObject::Image {
                    pixels,
                    left,
                    top,
                    scale,
                } => {
                    let sw = ((pixels.width() as f64 * scale).round() as u32).max(1);
                    let sh = ((pixels.height() as f64 * scale).round() as u32).max(1);
                    let scaled =
                        imageops::resize(pixels.as_ref(), sw, sh, imageops::FilterType::Triangle);
                    imageops::overlay(
                        &mut frame,
                        &scaled,
                        left.round() as i64,
                        top.round() as i64,
                    );
                }
                SceneObject::Rect {
                    left,
                    top,
                    width,
                    height,
                    fill,
                } => fill_rect(&mut frame, *left, *top, *width, *height, *fill),
                SceneObject::Circle {
                    left,
                    top,
                    radius,
                    fill,
                } => fill_circle(&mut frame, left + radius, top + radius, *radius, *fill),
                SceneObject::Triangle {
                    left,
                    top,
                    width,
                    height,
                    fill,
                } => {
                    let apex = (left + width / 2.0, *top);
                    let base_l = (*left, top + height);
                    let base_r = (left + width, top + height);
                    fill_triangle(&mut frame, apex, base_l, base_r, *fill);
                }
                SceneObject::Text {
                    content,
                    left,
                    top,
                    font_size,
                    fill,
                } => match &self.font {
                    Some(font) => {
                        draw_text(&mut frame, font, content, *left, *top, *font_size, *fill)
                    }
                    None => log::debug!("skipping text object; no font loaded"),
                },
            }

            if with_decorations && self.active == Some(*id) {
                let (l, t, w, h) = object.bounds();
                stroke_rect(
                    &mut frame,
                    l - SELECTION_PAD,
                    t - SELECTION_PAD,
                    w + SELECTION_PAD * 2.0,
                    h + SELECTION_PAD * 2.0,
                    SELECTION_OUTLINE,
                );
            }
        }

        frame
    }
}

impl SceneEngine for RasterEngine {
    fn bind(host: &HostElement, config: &EditorConfig) -> Result<Self>
    where
        Self: Sized,
    {
        let binding = host.bind_engine()?;
        let size = host.client_size();
        let font = load_system_font();
        if font.is_none() {
            log::warn!("no system font available; text objects will not rasterize");
        }
        log::debug!(
            "raster engine bound to host at {}x{}",
            size.width,
            size.height
        );
        Ok(Self {
            width: size.width,
            height: size.height,
            canvas_color: config.canvas_color,
            objects: Vec::new(),
            active: None,
            next_id: 0,
            frame: None,
            font,
            _binding: binding,
        })
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    fn add_object(&mut self, object: SceneObject) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push((id, object));
        id
    }

    fn remove_object(&mut self, id: ObjectId) -> bool {
        let before = self.objects.len();
        self.objects.retain(|(oid, _)| *oid != id);
        if self.active == Some(id) {
            self.active = None;
        }
        self.objects.len() != before
    }

    fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn objects(&self) -> &[(ObjectId, SceneObject)] {
        &self.objects
    }

    fn set_active_object(&mut self, id: ObjectId) {
        let selectable = self
            .objects
            .iter()
            .any(|(oid, o)| *oid == id && o.is_selectable());
        if selectable {
            self.active = Some(id);
        } else {
            log::debug!("refusing to select non-selectable object {:?}", id);
        }
    }

    fn discard_active_object(&mut self) {
        self.active = None;
    }

    fn active_object(&self) -> Option<ObjectId> {
        self.active
    }

    fn hit_test(&self, x: f64, y: f64) -> Option<ObjectId> {
        // Topmost first: later insertions render on top
        self.objects
            .iter()
            .rev()
            .find(|(_, o)| o.is_evented() && o.contains(x, y))
            .map(|(id, _)| *id)
    }

    fn move_object(&mut self, id: ObjectId, left: f64, top: f64) -> bool {
        match self.objects.iter_mut().find(|(oid, _)| *oid == id) {
            Some((_, object)) if object.is_selectable() => {
                object.set_position(left, top);
                true
            }
            Some(_) => {
                log::debug!("refusing to move locked object {:?}", id);
                false
            }
            None => false,
        }
    }

    fn render(&mut self) -> Result<()> {
        self.frame = Some(self.compose(true));
        Ok(())
    }

    fn export_png(&mut self) -> Result<Vec<u8>> {
        let flat = self.compose(false);
        let mut buf = Cursor::new(Vec::new());
        flat.write_to(&mut buf, image::ImageOutputFormat::Png)
            .map_err(|e| Error::Render(format!("PNG encoding failed: {}", e)))?;
        Ok(buf.into_inner())
    }

    fn close(self) -> Result<()> {
        // Host binding is released when `_binding` drops
        Ok(())
    }
}

fn load_system_font() -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::Properties;
    use font_kit::source::SystemSource;

    let handle = SystemSource::new()
        .select_best_match(&[FamilyName::SansSerif], &Properties::new())
        .ok()?;
    let font = handle.load().ok()?;
    let data = font.copy_font_data()?;
    FontArc::try_from_vec(data.as_ref().clone()).ok()
}

/// Source-over blend of `color` at the given coverage into one pixel.
/// Out-of-frame coordinates are ignored; the frame stays opaque.
fn blend_pixel(frame: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= frame.width() as i64 || y >= frame.height() as i64 {
        return;
    }
    let alpha = (color[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let dst = frame.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        dst[c] = (color[c] as f32 * alpha + dst[c] as f32 * (1.0 - alpha)).round() as u8;
    }
    dst[3] = 255;
}

fn fill_rect(frame: &mut RgbaImage, left: f64, top: f64, width: f64, height: f64, fill: Rgba<u8>) {
    let x0 = left.floor() as i64;
    let y0 = top.floor() as i64;
    let x1 = (left + width).ceil() as i64;
    let y1 = (top + height).ceil() as i64;
    for y in y0..y1 {
        for x in x0..x1 {
            blend_pixel(frame, x, y, fill, 1.0);
        }
    }
}

fn stroke_rect(frame: &mut RgbaImage, left: f64, top: f64, width: f64, height: f64, color: Rgba<u8>) {
    let x0 = left.floor() as i64;
    let y0 = top.floor() as i64;
    let x1 = (left + width).ceil() as i64;
    let y1 = (top + height).ceil() as i64;
    for x in x0..=x1 {
        blend_pixel(frame, x, y0, color, 1.0);
        blend_pixel(frame, x, y1, color, 1.0);
    }
    for y in y0..=y1 {
        blend_pixel(frame, x0, y, color, 1.0);
        blend_pixel(frame, x1, y, color, 1.0);
    }
}

fn fill_circle(frame: &mut RgbaImage, cx: f64, cy: f64, radius: f64, fill: Rgba<u8>) {
    if radius <= 0.0 {
        return;
    }
    let x0 = (cx - radius).floor() as i64;
    let y0 = (cy - radius).floor() as i64;
    let x1 = (cx + radius).ceil() as i64;
    let y1 = (cy + radius).ceil() as i64;
    for y in y0..=y1 {
        for x in x0..=x1 {
            // Sample at the pixel center
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            if dx * dx + dy * dy <= radius * radius {
                blend_pixel(frame, x, y, fill, 1.0);
            }
        }
    }
}

fn fill_triangle(
    frame: &mut RgbaImage,
    a: (f64, f64),
    b: (f64, f64),
    c: (f64, f64),
    fill: Rgba<u8>,
) {
    use crate::scene::object::point_in_triangle;

    let min_x = a.0.min(b.0).min(c.0).floor() as i64;
    let min_y = a.1.min(b.1).min(c.1).floor() as i64;
    let max_x = a.0.max(b.0).max(c.0).ceil() as i64;
    let max_y = a.1.max(b.1).max(c.1).ceil() as i64;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = (x as f64 + 0.5, y as f64 + 0.5);
            if point_in_triangle(p, a, b, c) {
                blend_pixel(frame, x, y, fill, 1.0);
            }
        }
    }
}

fn draw_text(
    frame: &mut RgbaImage,
    font: &FontArc,
    content: &str,
    left: f64,
    top: f64,
    font_size: f32,
    fill: Rgba<u8>,
) {
    let scale = PxScale::from(font_size);
    let scaled = font.as_scaled(scale);
    let mut pen_x = left as f32;
    let baseline = top as f32 + scaled.ascent();
    let mut previous = None;

    for ch in content.chars() {
        if ch.is_control() {
            continue;
        }
        let glyph_id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            pen_x += scaled.kern(prev, glyph_id);
        }
        let glyph = glyph_id.with_scale_and_position(scale, point(pen_x, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                blend_pixel(
                    frame,
                    bounds.min.x as i64 + gx as i64,
                    bounds.min.y as i64 + gy as i64,
                    fill,
                    coverage,
                );
            });
        }
        pen_x += scaled.h_advance(glyph_id);
        previous = Some(glyph_id);
    }
}
