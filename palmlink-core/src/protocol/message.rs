//! The closed control-message taxonomy.
//!
//! Every JSON envelope on the channel decodes into exactly one
//! [`ControlMessage`] variant at the channel boundary; nothing
//! downstream dispatches on raw string tags. Unknown `type` values
//! decode to [`ControlMessage::Unknown`] and are logged and ignored —
//! a protocol error never kills the connection.

use serde::{Deserialize, Serialize};

use crate::error::PalmError;
use crate::map::{FocusedWindow, ScreenInfo};

// ── ControlMessage ───────────────────────────────────────────────

/// All messages understood on the control channel, both directions.
///
/// Organized by category:
/// - session: `auth`, `auth_response`, `screen_info`
/// - capture: `start_screen_share` .. `reset_capture_region`
/// - queries: `list_*` / their responses
/// - input:   `input`, `press_key`, `type_text`
/// - shell:   `execute` / `execute_result`
/// - pty:     `pty_*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    // ── Session ──────────────────────────────────────────────────
    Auth {
        token: String,
        #[serde(rename = "deviceName")]
        device_name: String,
        #[serde(rename = "isExternal")]
        is_external: bool,
    },
    AuthResponse {
        success: bool,
        #[serde(
            rename = "screenInfo",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        screen_info: Option<ScreenInfo>,
    },
    /// Full remote display dimensions; re-sent when the remote screen
    /// configuration changes.
    ScreenInfo { width: u32, height: u32 },

    // ── Capture control ──────────────────────────────────────────
    StartScreenShare,
    StopScreenShare,
    StartWebrtc,
    StopWebrtc,
    SetCaptureRegion {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    ResetCaptureRegion,

    // ── Queries and responses ────────────────────────────────────
    ListApps,
    RunningApps { apps: Vec<String> },
    ListWindows { app: String },
    WindowList { windows: Vec<String> },
    ListTabs,
    TabList { tabs: Vec<String> },
    ListDir { path: String },
    DirListing { path: String, entries: Vec<DirEntry> },
    GetWindowInfo { app: String },
    WindowInfo {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },

    // ── Input ────────────────────────────────────────────────────
    Input {
        action: InputAction,
        x: i64,
        y: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        button: Option<MouseButton>,
    },
    PressKey { key: String },
    TypeText { text: String },

    // ── Shell ────────────────────────────────────────────────────
    Execute { command: String },
    ExecuteResult { success: bool, output: String },

    // ── PTY ──────────────────────────────────────────────────────
    PtyStart,
    PtyStop,
    PtyInput { input: String },
    PtyOutput { output: String },
    /// Buffered backlog, pushed once immediately after `pty_start`.
    PtyHistory { history: String },
    PtyResize { cols: u16, rows: u16 },

    /// Any `type` tag this client does not understand.
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, PalmError> {
        serde_json::to_string(self).map_err(Into::into)
    }

    /// Deserialize from a JSON text frame.
    pub fn from_json(text: &str) -> Result<Self, PalmError> {
        serde_json::from_str(text).map_err(Into::into)
    }

    /// The `WindowInfo` geometry as a [`FocusedWindow`], if applicable.
    pub fn as_window_info(&self) -> Option<FocusedWindow> {
        match *self {
            ControlMessage::WindowInfo {
                x,
                y,
                width,
                height,
            } => Some(FocusedWindow {
                x,
                y,
                width,
                height,
            }),
            _ => None,
        }
    }
}

// ── Input taxonomy ───────────────────────────────────────────────

/// Pointer action carried by an `input` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputAction {
    Move,
    Down,
    Up,
    Click,
    DoubleClick,
}

/// Pointer button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

// ── Directory entries ────────────────────────────────────────────

/// One entry of a `dir_listing` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(rename = "isDir")]
    pub is_dir: bool,
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_uses_exact_wire_field_names() {
        let msg = ControlMessage::Auth {
            token: "t0k".into(),
            device_name: "pixel".into(),
            is_external: true,
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"auth""#));
        assert!(json.contains(r#""deviceName":"pixel""#));
        assert!(json.contains(r#""isExternal":true"#));
        assert_eq!(ControlMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn auth_response_with_screen_info() {
        let json = r#"{"type":"auth_response","success":true,"screenInfo":{"width":1920,"height":1080}}"#;
        match ControlMessage::from_json(json).unwrap() {
            ControlMessage::AuthResponse {
                success,
                screen_info,
            } => {
                assert!(success);
                let s = screen_info.unwrap();
                assert_eq!(s.width, 1920);
                assert_eq!(s.height, 1080);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn auth_response_omits_absent_screen_info() {
        let msg = ControlMessage::AuthResponse {
            success: false,
            screen_info: None,
        };
        let json = msg.to_json().unwrap();
        assert!(!json.contains("screenInfo"));
        assert_eq!(ControlMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn unit_variants_are_bare_type_tags() {
        assert_eq!(
            ControlMessage::PtyStart.to_json().unwrap(),
            r#"{"type":"pty_start"}"#
        );
        assert_eq!(
            ControlMessage::from_json(r#"{"type":"reset_capture_region"}"#).unwrap(),
            ControlMessage::ResetCaptureRegion
        );
    }

    #[test]
    fn input_button_is_optional() {
        let no_button = ControlMessage::Input {
            action: InputAction::Move,
            x: 960,
            y: 540,
            button: None,
        };
        let json = no_button.to_json().unwrap();
        assert!(!json.contains("button"));
        assert!(json.contains(r#""action":"move""#));

        let clicked = r#"{"type":"input","action":"click","x":10,"y":20,"button":"left"}"#;
        match ControlMessage::from_json(clicked).unwrap() {
            ControlMessage::Input { button, .. } => assert_eq!(button, Some(MouseButton::Left)),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn set_capture_region_roundtrip() {
        let msg = ControlMessage::SetCaptureRegion {
            x: 100,
            y: 200,
            width: 800,
            height: 600,
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"set_capture_region""#));
        assert_eq!(ControlMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn unknown_type_decodes_to_unknown() {
        let msg = ControlMessage::from_json(r#"{"type":"hologram_mode","pixels":9}"#).unwrap();
        assert_eq!(msg, ControlMessage::Unknown);
    }

    #[test]
    fn malformed_json_is_an_encoding_error() {
        let err = ControlMessage::from_json("{nope").unwrap_err();
        assert!(matches!(err, PalmError::Encoding(_)));
    }

    #[test]
    fn window_info_converts_to_focused_window() {
        let msg = ControlMessage::WindowInfo {
            x: 100,
            y: 200,
            width: 800,
            height: 600,
        };
        let w = msg.as_window_info().unwrap();
        assert_eq!(w.x, 100);
        assert_eq!(w.height, 600);
        assert!(ControlMessage::PtyStart.as_window_info().is_none());
    }

    #[test]
    fn pty_messages_roundtrip() {
        for msg in [
            ControlMessage::PtyInput {
                input: "ls -la\n".into(),
            },
            ControlMessage::PtyOutput {
                output: "total 0\n".into(),
            },
            ControlMessage::PtyHistory {
                history: "$ ".into(),
            },
            ControlMessage::PtyResize { cols: 120, rows: 40 },
        ] {
            let json = msg.to_json().unwrap();
            assert_eq!(ControlMessage::from_json(&json).unwrap(), msg);
        }
    }

    #[test]
    fn dir_listing_roundtrip() {
        let msg = ControlMessage::DirListing {
            path: "/home".into(),
            entries: vec![
                DirEntry {
                    name: "docs".into(),
                    is_dir: true,
                },
                DirEntry {
                    name: "note.txt".into(),
                    is_dir: false,
                },
            ],
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""isDir":true"#));
        assert_eq!(ControlMessage::from_json(&json).unwrap(), msg);
    }
}
