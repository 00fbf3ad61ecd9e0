//! Remote PTY stream handling.
//!
//! The host forwards raw terminal output, ANSI escapes and all. This
//! client renders into a plain text view, so every control sequence is
//! stripped before text reaches the display buffer:
//!
//! ```text
//! ESC [ ... final(0x40-0x7E)      CSI  (cursor moves, SGR colors, erases)
//! ESC ] ... BEL | ESC \           OSC  (window title etc.)
//! ESC P/X/^/_ ... ESC \           DCS, SOS, PM, APC
//! ESC <byte>                      two-byte escapes (charset selection etc.)
//! BEL, bare CR                    dropped outright
//! ```

use tracing::debug;

// ── Escape stripping ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StripState {
    Ground,
    /// Saw ESC, deciding which sequence family follows.
    Escape,
    /// Inside `ESC [`; consumed through the final byte `0x40..=0x7E`.
    Csi,
    /// Inside `ESC ]`; terminated by BEL or the ST `ESC \`.
    Osc,
    /// OSC saw an ESC, checking for the `\` of ST.
    OscEscape,
    /// Inside DCS/SOS/PM/APC; terminated by ST only.
    StringSeq,
    /// String sequence saw an ESC, checking for the `\` of ST.
    StringSeqEscape,
}

/// Remove ANSI/VT control sequences from terminal output, keeping the
/// printable text and newlines.
///
/// Carriage returns are dropped rather than honored: the display
/// buffer is append-only, so the overwrite semantics of `\r` (progress
/// bars, spinners) would render as garbage.
pub fn strip_control_sequences(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut state = StripState::Ground;

    for ch in input.chars() {
        state = match state {
            StripState::Ground => match ch {
                '\u{1b}' => StripState::Escape,
                '\u{07}' | '\r' => StripState::Ground,
                _ => {
                    out.push(ch);
                    StripState::Ground
                }
            },
            StripState::Escape => match ch {
                '[' => StripState::Csi,
                ']' => StripState::Osc,
                'P' | 'X' | '^' | '_' => StripState::StringSeq,
                // Two-byte escape; the byte after ESC is the whole payload.
                _ => StripState::Ground,
            },
            StripState::Csi => {
                if ('\u{40}'..='\u{7e}').contains(&ch) {
                    StripState::Ground
                } else {
                    StripState::Csi
                }
            }
            StripState::Osc => match ch {
                '\u{07}' => StripState::Ground,
                '\u{1b}' => StripState::OscEscape,
                _ => StripState::Osc,
            },
            StripState::OscEscape => match ch {
                '\\' => StripState::Ground,
                '\u{1b}' => StripState::OscEscape,
                _ => StripState::Osc,
            },
            StripState::StringSeq => match ch {
                '\u{1b}' => StripState::StringSeqEscape,
                _ => StripState::StringSeq,
            },
            StripState::StringSeqEscape => match ch {
                '\\' => StripState::Ground,
                '\u{1b}' => StripState::StringSeqEscape,
                _ => StripState::StringSeq,
            },
        };
    }

    out
}

// ── PtySession ───────────────────────────────────────────────────

/// Client-side view of the remote terminal.
///
/// Tracks whether the PTY is running, accumulates stripped output into
/// an append-only display buffer, and applies the one-shot history
/// backlog the host pushes right after `pty_start`.
#[derive(Debug, Default)]
pub struct PtySession {
    active: bool,
    display: String,
    seen_history: bool,
}

impl PtySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the PTY started and reset the display for a fresh session.
    pub fn start(&mut self) {
        self.active = true;
        self.seen_history = false;
        self.display.clear();
    }

    /// Mark the PTY stopped. The display buffer survives so the last
    /// output stays visible until the next start.
    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Append a chunk of live output.
    pub fn push_output(&mut self, output: &str) {
        if !self.active {
            debug!("pty output while inactive, dropped");
            return;
        }
        self.display.push_str(&strip_control_sequences(output));
    }

    /// Apply the history backlog. Only the first backlog after a start
    /// is applied; the host occasionally re-sends it on reconnect races.
    pub fn push_history(&mut self, history: &str) {
        if !self.active || self.seen_history {
            return;
        }
        self.seen_history = true;
        let mut restored = strip_control_sequences(history);
        restored.push_str(&self.display);
        self.display = restored;
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    /// Full reset, used on connection teardown.
    pub fn clear(&mut self) {
        self.active = false;
        self.seen_history = false;
        self.display.clear();
    }
}
