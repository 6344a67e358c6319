//! Canvas-space points and dirty-rectangle math.

use serde::{Deserialize, Serialize};

/// A point in canvas space (pixels, origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasPoint {
    pub x: f32,
    pub y: f32,
}

impl CanvasPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Self) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Angle of the vector from this point to `other`, in radians.
    pub fn angle_to(&self, other: &Self) -> f32 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}

/// Half-open pixel rectangle `[left, right) x [top, bottom)` used for
/// dirty-region tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn empty() -> Self {
        Self {
            left: i32::MAX,
            top: i32::MAX,
            right: i32::MIN,
            bottom: i32::MIN,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    /// Bounding rect of a circle of `radius` centered at `center`.
    pub fn around(center: CanvasPoint, radius: f32) -> Self {
        let r = radius.max(0.0);
        Self {
            left: (center.x - r).floor() as i32 - 1,
            top: (center.y - r).floor() as i32 - 1,
            right: (center.x + r).ceil() as i32 + 1,
            bottom: (center.y + r).ceil() as i32 + 1,
        }
    }

    pub fn union(&mut self, other: &Rect) {
        if other.is_empty() {
            return;
        }
        self.left = self.left.min(other.left);
        self.top = self.top.min(other.top);
        self.right = self.right.max(other.right);
        self.bottom = self.bottom.max(other.bottom);
    }

    /// Intersect with the canvas bounds `[0, width) x [0, height)`.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        Self {
            left: self.left.max(0),
            top: self.top.max(0),
            right: self.right.min(width as i32),
            bottom: self.bottom.min(height as i32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_and_lerp() {
        let a = CanvasPoint::new(0.0, 0.0);
        let b = CanvasPoint::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-6);

        let mid = a.lerp(&b, 0.5);
        assert!((mid.x - 1.5).abs() < 1e-6);
        assert!((mid.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_rect_union_is_identity() {
        let mut r = Rect::new(1, 2, 5, 6);
        r.union(&Rect::empty());
        assert_eq!(r, Rect::new(1, 2, 5, 6));

        let mut e = Rect::empty();
        e.union(&Rect::new(1, 2, 5, 6));
        assert_eq!(e, Rect::new(1, 2, 5, 6));
    }

    #[test]
    fn test_clamp_to_bounds() {
        let r = Rect::new(-10, -10, 300, 50).clamp_to(100, 100);
        assert_eq!(r, Rect::new(0, 0, 100, 50));
        assert!(!r.is_empty());

        let outside = Rect::new(200, 200, 300, 300).clamp_to(100, 100);
        assert!(outside.is_empty());
    }
}
