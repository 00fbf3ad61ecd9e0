//! Viewport ↔ remote-desktop coordinate mapping.
//!
//! Two capture modes, selected by whether a focused window is set:
//!
//! - **Full screen**: the remote ships a scaled-down full-desktop image
//!   which the viewport letterboxes with an aspect-preserving fit.
//! - **Focused**: one window is captured at native resolution and shown
//!   through a user pan/zoom transform.
//!
//! Taps map through the active mode to remote pixel coordinates; the
//! reverse mapping places the synthetic remote-cursor overlay. All
//! geometry errors clamp rather than reject — a finger is not precise
//! enough to deserve an error path.

pub mod mapper;
pub mod transform;

pub use mapper::{
    letterbox_fit, CoordinateMapper, DisplayRect, FocusedWindow, Point, ScreenInfo, ViewportSize,
    FULL_SCREEN_CAPTURE_SCALE, INITIAL_FOCUS_ZOOM,
};
pub use transform::ViewTransform;
