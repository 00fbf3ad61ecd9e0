//! The coordinate-mapping engine.

use serde::{Deserialize, Serialize};

use crate::map::transform::ViewTransform;

/// Scale at which the remote captures the full desktop (half size in
/// each dimension). Fixed by the capture host today; a candidate for
/// negotiation through `screen_info` later.
pub const FULL_SCREEN_CAPTURE_SCALE: f64 = 0.5;

/// Zoom applied immediately on entering focused mode.
pub const INITIAL_FOCUS_ZOOM: f64 = 3.0;

// ── Geometry ─────────────────────────────────────────────────────

/// Dimensions of the full remote display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
}

/// Rectangle of the remote window currently captured at native
/// resolution. Mutually exclusive with full-screen mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusedWindow {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// A point in viewport or remote coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Size of the on-device viewport, in the same units as tap events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

/// The letterboxed rectangle the image actually occupies on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRect {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Aspect-preserving fit of an `image_width × image_height` image into
/// `viewport`, centered on both axes.
pub fn letterbox_fit(viewport: ViewportSize, image_width: f64, image_height: f64) -> DisplayRect {
    if image_width <= 0.0 || image_height <= 0.0 || viewport.width <= 0.0 || viewport.height <= 0.0
    {
        return DisplayRect {
            width: viewport.width.max(0.0),
            height: viewport.height.max(0.0),
            offset_x: 0.0,
            offset_y: 0.0,
        };
    }
    let scale = (viewport.width / image_width).min(viewport.height / image_height);
    let width = image_width * scale;
    let height = image_height * scale;
    DisplayRect {
        width,
        height,
        offset_x: (viewport.width - width) / 2.0,
        offset_y: (viewport.height - height) / 2.0,
    }
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

// ── CoordinateMapper ─────────────────────────────────────────────

/// Converts device-viewport coordinates to remote pixels and back.
///
/// The mapper always has exactly one active reference frame while
/// frames flow: the full screen, or the focused window. Capture-region
/// side effects live in the session client; this type is pure state
/// and math.
#[derive(Debug, Clone, Default)]
pub struct CoordinateMapper {
    screen: Option<ScreenInfo>,
    focus: Option<FocusedWindow>,
    transform: ViewTransform,
}

impl CoordinateMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calibrate against the remote display (once per session, again on
    /// remote resolution changes).
    pub fn set_screen(&mut self, screen: ScreenInfo) {
        self.screen = Some(screen);
    }

    pub fn screen(&self) -> Option<ScreenInfo> {
        self.screen
    }

    /// Enter focused mode on `window`, applying the initial zoom.
    pub fn enter_focus(&mut self, window: FocusedWindow) {
        self.focus = Some(window);
        self.transform = ViewTransform::zoomed(INITIAL_FOCUS_ZOOM);
    }

    /// Leave focused mode, back to full-screen mapping.
    pub fn exit_focus(&mut self) {
        self.focus = None;
        self.transform = ViewTransform::IDENTITY;
    }

    pub fn focus(&self) -> Option<FocusedWindow> {
        self.focus
    }

    pub fn is_focused(&self) -> bool {
        self.focus.is_some()
    }

    /// Replace the pan/zoom transform (gesture updates).
    pub fn set_transform(&mut self, transform: ViewTransform) {
        self.transform = transform;
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    /// Map a tap at viewport coordinates to remote pixel coordinates.
    ///
    /// `None` until `screen_info` has calibrated the mapper — input
    /// before calibration has no meaningful target.
    pub fn to_remote(&self, tap: Point, viewport: ViewportSize) -> Option<Point> {
        let screen = self.screen?;
        let (sw, sh) = (screen.width as f64, screen.height as f64);

        let remote = match self.focus {
            None => {
                let image_w = sw * FULL_SCREEN_CAPTURE_SCALE;
                let image_h = sh * FULL_SCREEN_CAPTURE_SCALE;
                let rect = letterbox_fit(viewport, image_w, image_h);
                if rect.width <= 0.0 || rect.height <= 0.0 {
                    return None;
                }
                let dx = clamp(tap.x - rect.offset_x, 0.0, rect.width);
                let dy = clamp(tap.y - rect.offset_y, 0.0, rect.height);
                Point::new(dx / rect.width * sw, dy / rect.height * sh)
            }
            Some(window) => {
                let (wx, wy) = (window.x as f64, window.y as f64);
                let (ww, wh) = (window.width as f64, window.height as f64);
                if ww <= 0.0 || wh <= 0.0 {
                    return None;
                }
                let (ix, iy) = self.transform.invert(tap.x, tap.y);
                let rx = clamp(ix, 0.0, ww) / ww;
                let ry = clamp(iy, 0.0, wh) / wh;
                Point::new(rx * ww + wx, ry * wh + wy)
            }
        };

        Some(Point::new(
            clamp(remote.x, 0.0, sw),
            clamp(remote.y, 0.0, sh),
        ))
    }

    /// Reverse mapping: remote cursor position → viewport overlay
    /// position, for rendering the synthetic cursor indicator.
    pub fn to_viewport(&self, remote: Point, viewport: ViewportSize) -> Option<Point> {
        let screen = self.screen?;
        let (sw, sh) = (screen.width as f64, screen.height as f64);
        let rx = clamp(remote.x, 0.0, sw);
        let ry = clamp(remote.y, 0.0, sh);

        match self.focus {
            None => {
                let image_w = sw * FULL_SCREEN_CAPTURE_SCALE;
                let image_h = sh * FULL_SCREEN_CAPTURE_SCALE;
                let rect = letterbox_fit(viewport, image_w, image_h);
                Some(Point::new(
                    rx / sw * rect.width + rect.offset_x,
                    ry / sh * rect.height + rect.offset_y,
                ))
            }
            Some(window) => {
                let (ww, wh) = (window.width as f64, window.height as f64);
                let ix = clamp(rx - window.x as f64, 0.0, ww);
                let iy = clamp(ry - window.y as f64, 0.0, wh);
                let (vx, vy) = self.transform.apply(ix, iy);
                Some(Point::new(vx, vy))
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: ScreenInfo = ScreenInfo {
        width: 1920,
        height: 1080,
    };

    fn full_screen_mapper() -> CoordinateMapper {
        let mut m = CoordinateMapper::new();
        m.set_screen(SCREEN);
        m
    }

    fn assert_close(p: Point, x: f64, y: f64) {
        assert!((p.x - x).abs() < 0.5, "x: {} != {x}", p.x);
        assert!((p.y - y).abs() < 0.5, "y: {} != {y}", p.y);
    }

    #[test]
    fn uncalibrated_mapper_maps_nothing() {
        let m = CoordinateMapper::new();
        let vp = ViewportSize {
            width: 100.0,
            height: 100.0,
        };
        assert!(m.to_remote(Point::new(50.0, 50.0), vp).is_none());
        assert!(m.to_viewport(Point::new(50.0, 50.0), vp).is_none());
    }

    #[test]
    fn center_tap_hits_screen_center() {
        // Viewport with the image's exact aspect: no letterboxing.
        let m = full_screen_mapper();
        let vp = ViewportSize {
            width: 960.0,
            height: 540.0,
        };
        let remote = m.to_remote(Point::new(480.0, 270.0), vp).unwrap();
        assert_close(remote, 960.0, 540.0);
    }

    #[test]
    fn letterboxed_viewport_offsets_apply() {
        // 800×600 viewport, 16:9 image → 800×450 display, 75px bars.
        let m = full_screen_mapper();
        let vp = ViewportSize {
            width: 800.0,
            height: 600.0,
        };

        let center = m.to_remote(Point::new(400.0, 300.0), vp).unwrap();
        assert_close(center, 960.0, 540.0);

        // Top-left corner of the display rect.
        let corner = m.to_remote(Point::new(0.0, 75.0), vp).unwrap();
        assert_close(corner, 0.0, 0.0);

        // A tap inside the letterbox bar clamps to the image edge.
        let in_bar = m.to_remote(Point::new(400.0, 10.0), vp).unwrap();
        assert_close(in_bar, 960.0, 0.0);
    }

    #[test]
    fn full_screen_output_is_clamped() {
        let m = full_screen_mapper();
        let vp = ViewportSize {
            width: 960.0,
            height: 540.0,
        };
        let remote = m.to_remote(Point::new(5000.0, 5000.0), vp).unwrap();
        assert_close(remote, 1920.0, 1080.0);
    }

    #[test]
    fn focused_center_tap_with_initial_zoom() {
        let mut m = full_screen_mapper();
        m.enter_focus(FocusedWindow {
            x: 100,
            y: 200,
            width: 800,
            height: 600,
        });
        assert_eq!(m.transform().scale, INITIAL_FOCUS_ZOOM);

        let vp = ViewportSize {
            width: 400.0,
            height: 300.0,
        };
        // Image-space center (400, 300) appears at (1200, 900) under 3×.
        let remote = m.to_remote(Point::new(1200.0, 900.0), vp).unwrap();
        assert_close(remote, 500.0, 500.0);
    }

    #[test]
    fn focused_tap_clamps_into_window() {
        let mut m = full_screen_mapper();
        m.enter_focus(FocusedWindow {
            x: 100,
            y: 200,
            width: 800,
            height: 600,
        });
        let vp = ViewportSize {
            width: 400.0,
            height: 300.0,
        };
        // Far beyond the window under the inverse transform.
        let remote = m.to_remote(Point::new(9000.0, 9000.0), vp).unwrap();
        assert_close(remote, 900.0, 800.0); // window bottom-right corner
    }

    #[test]
    fn focused_pan_shifts_mapping() {
        let mut m = full_screen_mapper();
        m.enter_focus(FocusedWindow {
            x: 0,
            y: 0,
            width: 600,
            height: 600,
        });
        m.set_transform(ViewTransform::zoomed(3.0).panned_by(-300.0, -300.0));

        let vp = ViewportSize {
            width: 400.0,
            height: 300.0,
        };
        // view (0,0) → image (100,100) after the pan.
        let remote = m.to_remote(Point::new(0.0, 0.0), vp).unwrap();
        assert_close(remote, 100.0, 100.0);
    }

    #[test]
    fn exit_focus_restores_full_screen_mapping() {
        let mut m = full_screen_mapper();
        m.enter_focus(FocusedWindow {
            x: 100,
            y: 200,
            width: 800,
            height: 600,
        });
        m.exit_focus();
        assert!(!m.is_focused());
        assert_eq!(m.transform(), ViewTransform::IDENTITY);

        let vp = ViewportSize {
            width: 960.0,
            height: 540.0,
        };
        let remote = m.to_remote(Point::new(480.0, 270.0), vp).unwrap();
        assert_close(remote, 960.0, 540.0);
    }

    #[test]
    fn reverse_mapping_full_screen_roundtrip() {
        let m = full_screen_mapper();
        let vp = ViewportSize {
            width: 800.0,
            height: 600.0,
        };
        let remote = Point::new(960.0, 540.0);
        let view = m.to_viewport(remote, vp).unwrap();
        assert_close(view, 400.0, 300.0);

        let back = m.to_remote(view, vp).unwrap();
        assert_close(back, 960.0, 540.0);
    }

    #[test]
    fn reverse_mapping_focused_roundtrip() {
        let mut m = full_screen_mapper();
        m.enter_focus(FocusedWindow {
            x: 100,
            y: 200,
            width: 800,
            height: 600,
        });
        let vp = ViewportSize {
            width: 400.0,
            height: 300.0,
        };
        let view = m.to_viewport(Point::new(500.0, 500.0), vp).unwrap();
        assert_close(view, 1200.0, 900.0);

        let back = m.to_remote(view, vp).unwrap();
        assert_close(back, 500.0, 500.0);
    }

    #[test]
    fn letterbox_fit_pillarboxes_tall_viewports() {
        // Portrait phone showing a 16:9 image: bars top and bottom.
        let rect = letterbox_fit(
            ViewportSize {
                width: 540.0,
                height: 1200.0,
            },
            960.0,
            540.0,
        );
        assert!((rect.width - 540.0).abs() < 1e-9);
        assert!((rect.height - 303.75).abs() < 1e-9);
        assert_eq!(rect.offset_x, 0.0);
        assert!((rect.offset_y - 448.125).abs() < 1e-9);
    }

    #[test]
    fn letterbox_fit_degenerate_inputs() {
        let rect = letterbox_fit(
            ViewportSize {
                width: 100.0,
                height: 100.0,
            },
            0.0,
            540.0,
        );
        assert_eq!(rect.offset_x, 0.0);
        assert_eq!(rect.offset_y, 0.0);
    }
}
