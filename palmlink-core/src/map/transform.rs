//! Pan/zoom view transform for focused mode.

/// Affine zoom-and-pan transform between image pixels and viewport
/// coordinates: `view = image * scale + offset`.
///
/// Rotation does not occur in this pipeline, so a full matrix would be
/// dead weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };

    /// A pure zoom with no pan.
    pub fn zoomed(scale: f64) -> Self {
        Self {
            scale,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Image coordinates → viewport coordinates.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale + self.offset_x, y * self.scale + self.offset_y)
    }

    /// Viewport coordinates → image coordinates.
    ///
    /// A degenerate (non-positive) scale inverts as identity scale so a
    /// broken gesture recognizer cannot produce NaN coordinates.
    pub fn invert(&self, x: f64, y: f64) -> (f64, f64) {
        let scale = if self.scale > f64::EPSILON {
            self.scale
        } else {
            1.0
        };
        ((x - self.offset_x) / scale, (y - self.offset_y) / scale)
    }

    /// Compose an additional pan onto this transform.
    pub fn panned_by(mut self, dx: f64, dy: f64) -> Self {
        self.offset_x += dx;
        self.offset_y += dy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_noop() {
        let t = ViewTransform::IDENTITY;
        assert_eq!(t.apply(12.5, -3.0), (12.5, -3.0));
        assert_eq!(t.invert(12.5, -3.0), (12.5, -3.0));
    }

    #[test]
    fn apply_and_invert_roundtrip() {
        let t = ViewTransform {
            scale: 3.0,
            offset_x: -40.0,
            offset_y: 25.0,
        };
        let (vx, vy) = t.apply(100.0, 200.0);
        let (ix, iy) = t.invert(vx, vy);
        assert!((ix - 100.0).abs() < 1e-9);
        assert!((iy - 200.0).abs() < 1e-9);
    }

    #[test]
    fn zoomed_has_no_pan() {
        let t = ViewTransform::zoomed(3.0);
        assert_eq!(t.apply(10.0, 10.0), (30.0, 30.0));
    }

    #[test]
    fn panned_by_accumulates() {
        let t = ViewTransform::zoomed(2.0).panned_by(5.0, -5.0).panned_by(5.0, 0.0);
        assert_eq!(t.offset_x, 10.0);
        assert_eq!(t.offset_y, -5.0);
    }

    #[test]
    fn degenerate_scale_does_not_blow_up() {
        let t = ViewTransform {
            scale: 0.0,
            offset_x: 10.0,
            offset_y: 10.0,
        };
        let (x, y) = t.invert(20.0, 20.0);
        assert!(x.is_finite());
        assert!(y.is_finite());
    }
}
