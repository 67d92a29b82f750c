//! Scene object model
//!
//! The composition is a paint-order list over a closed set of drawables: one
//! locked background photograph plus the user-insertable foreground variants.
//! The set is fixed and small, so it is a tagged enum rather than open-ended
//! dynamic dispatch.

use std::sync::Arc;

use image::{Rgba, RgbaImage};

/// Identifier for an object in the scene's paint-order list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub(crate) u64);

/// Foreground shape primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Triangle,
}

impl ShapeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Circle => "circle",
            ShapeKind::Triangle => "triangle",
        }
    }

    pub fn all() -> &'static [ShapeKind] {
        &[ShapeKind::Rectangle, ShapeKind::Circle, ShapeKind::Triangle]
    }

    /// Parse a user-supplied kind name (CLI / UI strings).
    pub fn parse(name: &str) -> Option<ShapeKind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "rectangle" | "rect" => Some(ShapeKind::Rectangle),
            "circle" => Some(ShapeKind::Circle),
            "triangle" => Some(ShapeKind::Triangle),
            _ => None,
        }
    }

    /// Fixed insertion size (width, height) in canvas units.
    pub fn default_size(&self) -> (f64, f64) {
        match self {
            ShapeKind::Rectangle => (140.0, 90.0),
            ShapeKind::Circle => (120.0, 120.0),
            ShapeKind::Triangle => (120.0, 100.0),
        }
    }

    /// Distinct default fill per kind so freshly inserted shapes are
    /// visually distinguishable.
    pub fn default_fill(&self) -> Rgba<u8> {
        match self {
            ShapeKind::Rectangle => Rgba([59, 130, 246, 255]),
            ShapeKind::Circle => Rgba([45, 212, 191, 255]),
            ShapeKind::Triangle => Rgba([248, 113, 113, 255]),
        }
    }
}

/// A drawable in the composition
#[derive(Debug, Clone)]
pub enum SceneObject {
    /// The locked background photograph at its precomputed placement.
    /// Never selectable, never the target of manipulation.
    Image {
        pixels: Arc<RgbaImage>,
        left: f64,
        top: f64,
        /// Uniform scale applied to the natural pixel dimensions
        scale: f64,
    },
    Text {
        content: String,
        left: f64,
        top: f64,
        font_size: f32,
        fill: Rgba<u8>,
    },
    Rect {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        fill: Rgba<u8>,
    },
    Circle {
        left: f64,
        top: f64,
        radius: f64,
        fill: Rgba<u8>,
    },
    Triangle {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        fill: Rgba<u8>,
    },
}

impl SceneObject {
    pub fn kind(&self) -> &'static str {
        match self {
            SceneObject::Image { .. } => "image",
            SceneObject::Text { .. } => "text",
            SceneObject::Rect { .. } => "rectangle",
            SceneObject::Circle { .. } => "circle",
            SceneObject::Triangle { .. } => "triangle",
        }
    }

    /// The shape variant this object was inserted as, if it is a shape.
    pub fn shape_kind(&self) -> Option<ShapeKind> {
        match self {
            SceneObject::Rect { .. } => Some(ShapeKind::Rectangle),
            SceneObject::Circle { .. } => Some(ShapeKind::Circle),
            SceneObject::Triangle { .. } => Some(ShapeKind::Triangle),
            _ => None,
        }
    }

    /// Whether the user may select this object
    pub fn is_selectable(&self) -> bool {
        !matches!(self, SceneObject::Image { .. })
    }

    /// Whether this object participates in hit-testing
    pub fn is_evented(&self) -> bool {
        !matches!(self, SceneObject::Image { .. })
    }

    /// Axis-aligned bounds as (left, top, width, height).
    ///
    /// Text bounds use an advance approximation (0.6em per char, 1.2em tall);
    /// good enough for hit targets and selection outlines.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        match self {
            SceneObject::Image {
                pixels,
                left,
                top,
                scale,
            } => (
                *left,
                *top,
                pixels.width() as f64 * scale,
                pixels.height() as f64 * scale,
            ),
            SceneObject::Text {
                content,
                left,
                top,
                font_size,
                ..
            } => (
                *left,
                *top,
                content.chars().count() as f64 * *font_size as f64 * 0.6,
                *font_size as f64 * 1.2,
            ),
            SceneObject::Rect {
                left,
                top,
                width,
                height,
                ..
            }
            | SceneObject::Triangle {
                left,
                top,
                width,
                height,
                ..
            } => (*left, *top, *width, *height),
            SceneObject::Circle {
                left, top, radius, ..
            } => (*left, *top, radius * 2.0, radius * 2.0),
        }
    }

    /// Whether the point falls inside the object's actual extent (not just
    /// its bounding box).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        match self {
            SceneObject::Circle {
                left, top, radius, ..
            } => {
                let cx = left + radius;
                let cy = top + radius;
                let dx = x - cx;
                let dy = y - cy;
                dx * dx + dy * dy <= radius * radius
            }
            SceneObject::Triangle {
                left,
                top,
                width,
                height,
                ..
            } => {
                // Apex top-center, base along the bottom edge
                let apex = (left + width / 2.0, *top);
                let base_l = (*left, top + height);
                let base_r = (left + width, top + height);
                point_in_triangle((x, y), apex, base_l, base_r)
            }
            _ => {
                let (l, t, w, h) = self.bounds();
                x >= l && x <= l + w && y >= t && y <= t + h
            }
        }
    }

    pub fn position(&self) -> (f64, f64) {
        let (l, t, _, _) = self.bounds();
        (l, t)
    }

    pub fn set_position(&mut self, new_left: f64, new_top: f64) {
        match self {
            SceneObject::Image { left, top, .. }
            | SceneObject::Text { left, top, .. }
            | SceneObject::Rect { left, top, .. }
            | SceneObject::Circle { left, top, .. }
            | SceneObject::Triangle { left, top, .. } => {
                *left = new_left;
                *top = new_top;
            }
        }
    }
}

fn edge_sign(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (p.0 - b.0) * (a.1 - b.1) - (a.0 - b.0) * (p.1 - b.1)
}

pub(crate) fn point_in_triangle(
    p: (f64, f64),
    a: (f64, f64),
    b: (f64, f64),
    c: (f64, f64),
) -> bool {
    let d1 = edge_sign(p, a, b);
    let d2 = edge_sign(p, b, c);
    let d3 = edge_sign(p, c, a);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> SceneObject {
        SceneObject::Rect {
            left: 10.0,
            top: 20.0,
            width: 100.0,
            height: 50.0,
            fill: ShapeKind::Rectangle.default_fill(),
        }
    }

    #[test]
    fn shape_kind_parsing() {
        assert_eq!(ShapeKind::parse("rect"), Some(ShapeKind::Rectangle));
        assert_eq!(ShapeKind::parse(" Circle "), Some(ShapeKind::Circle));
        assert_eq!(ShapeKind::parse("triangle"), Some(ShapeKind::Triangle));
        assert_eq!(ShapeKind::parse("hexagon"), None);
    }

    #[test]
    fn default_fills_are_distinct() {
        let fills: Vec<_> = ShapeKind::all().iter().map(|k| k.default_fill()).collect();
        assert_ne!(fills[0], fills[1]);
        assert_ne!(fills[1], fills[2]);
        assert_ne!(fills[0], fills[2]);
    }

    #[test]
    fn rect_containment() {
        let r = rect();
        assert!(r.contains(10.0, 20.0));
        assert!(r.contains(110.0, 70.0));
        assert!(!r.contains(111.0, 70.0));
        assert!(!r.contains(9.0, 20.0));
    }

    #[test]
    fn circle_containment_is_round() {
        let c = SceneObject::Circle {
            left: 0.0,
            top: 0.0,
            radius: 50.0,
            fill: ShapeKind::Circle.default_fill(),
        };
        assert!(c.contains(50.0, 50.0)); // center
        assert!(c.contains(50.0, 1.0)); // top edge
        assert!(!c.contains(2.0, 2.0)); // bounding-box corner, outside circle
    }

    #[test]
    fn triangle_containment() {
        let t = SceneObject::Triangle {
            left: 0.0,
            top: 0.0,
            width: 100.0,
            height: 100.0,
            fill: ShapeKind::Triangle.default_fill(),
        };
        assert!(t.contains(50.0, 60.0)); // inside
        assert!(t.contains(50.0, 1.0)); // just below apex
        assert!(!t.contains(2.0, 2.0)); // top-left corner outside
        assert!(!t.contains(98.0, 2.0)); // top-right corner outside
    }

    #[test]
    fn background_image_is_locked() {
        let img = SceneObject::Image {
            pixels: Arc::new(RgbaImage::new(4, 4)),
            left: 0.0,
            top: 0.0,
            scale: 1.0,
        };
        assert!(!img.is_selectable());
        assert!(!img.is_evented());
        assert!(rect().is_selectable());
        assert!(rect().is_evented());
    }

    #[test]
    fn image_bounds_follow_scale() {
        let img = SceneObject::Image {
            pixels: Arc::new(RgbaImage::new(200, 100)),
            left: 10.0,
            top: 5.0,
            scale: 0.5,
        };
        assert_eq!(img.bounds(), (10.0, 5.0, 100.0, 50.0));
    }

    #[test]
    fn set_position_moves_any_variant() {
        let mut r = rect();
        r.set_position(40.0, 60.0);
        assert_eq!(r.position(), (40.0, 60.0));
    }
}
