//! Axis-aligned boxes in pixel or page-relative coordinates

use serde::{Deserialize, Serialize};

/// Bounding box given by its top-left `(x0, y0)` and bottom-right `(x1, y1)` corners
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    #[must_use]
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    #[must_use]
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Smallest box enclosing all points
    #[must_use]
    pub fn enclosing(points: &[(f32, f32)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bbox = Self::new(first.0, first.1, first.0, first.1);
        for &(x, y) in rest {
            bbox.x0 = bbox.x0.min(x);
            bbox.y0 = bbox.y0.min(y);
            bbox.x1 = bbox.x1.max(x);
            bbox.y1 = bbox.y1.max(y);
        }
        Some(bbox)
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    #[must_use]
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Width over height, zero for degenerate boxes
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        if self.height() <= 0.0 {
            0.0
        } else {
            self.width() / self.height()
        }
    }

    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    #[must_use]
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    #[must_use]
    pub fn intersection_area(&self, other: &BBox) -> f32 {
        let w = (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0);
        let h = (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0);
        w * h
    }

    #[must_use]
    pub fn intersects(&self, other: &BBox) -> bool {
        self.intersection_area(other) > 0.0
    }

    /// Intersection over union
    #[must_use]
    pub fn iou(&self, other: &BBox) -> f32 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    #[must_use]
    pub fn scaled(&self, sx: f32, sy: f32) -> BBox {
        BBox {
            x0: self.x0 * sx,
            y0: self.y0 * sy,
            x1: self.x1 * sx,
            y1: self.y1 * sy,
        }
    }

    /// Grow by `fraction` of width/height on every side
    #[must_use]
    pub fn padded(&self, fraction: f32) -> BBox {
        let dx = self.width() * fraction;
        let dy = self.height() * fraction;
        BBox {
            x0: self.x0 - dx,
            y0: self.y0 - dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }

    /// Clip to `[0, width] x [0, height]`
    #[must_use]
    pub fn clamp(&self, width: f32, height: f32) -> BBox {
        BBox {
            x0: self.x0.clamp(0.0, width),
            y0: self.y0.clamp(0.0, height),
            x1: self.x1.clamp(0.0, width),
            y1: self.y1.clamp(0.0, height),
        }
    }

    /// Page-relative fractions in `[0, 1]`
    #[must_use]
    pub fn normalized(&self, width: f32, height: f32) -> BBox {
        if width <= 0.0 || height <= 0.0 {
            return BBox::default();
        }
        let c = self.clamp(width, height);
        BBox {
            x0: c.x0 / width,
            y0: c.y0 / height,
            x1: c.x1 / width,
            y1: c.y1 / height,
        }
    }

    /// Integer pixel rectangle `(x, y, w, h)` inside an image, `None` when empty
    #[must_use]
    pub fn pixel_rect(&self, image_width: u32, image_height: u32) -> Option<(u32, u32, u32, u32)> {
        let clamped = self.clamp(image_width as f32, image_height as f32);
        let x0 = clamped.x0.floor() as u32;
        let y0 = clamped.y0.floor() as u32;
        let x1 = (clamped.x1.ceil() as u32).min(image_width);
        let y1 = (clamped.y1.ceil() as u32).min(image_height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1 - x0, y1 - y0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 0.0, 15.0, 10.0);
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
        assert_eq!(a.iou(&BBox::new(20.0, 20.0, 30.0, 30.0)), 0.0);
    }

    #[test]
    fn test_normalized_stays_in_unit_square() {
        let b = BBox::new(-10.0, 50.0, 900.0, 120.0).normalized(800.0, 600.0);
        assert_eq!(b.x0, 0.0);
        assert_eq!(b.x1, 1.0);
        assert!((b.y0 - 50.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn test_pixel_rect() {
        let b = BBox::new(2.5, 3.2, 10.1, 9.9);
        assert_eq!(b.pixel_rect(100, 100), Some((2, 3, 9, 7)));
        assert_eq!(BBox::new(120.0, 0.0, 130.0, 5.0).pixel_rect(100, 100), None);
    }

    #[test]
    fn test_new_orders_corners() {
        let b = BBox::new(10.0, 8.0, 2.0, 1.0);
        assert_eq!(b, BBox::new(2.0, 1.0, 10.0, 8.0));
        assert_eq!(b.aspect_ratio(), 8.0 / 7.0);
    }
}
