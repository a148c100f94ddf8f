//! Live log panel rendering
//!
//! Pipeline logs arrive as terminal output, often colored with ANSI escape
//! codes. Before they reach the browser the CSI sequences are stripped, the
//! remaining text is HTML-escaped, and newlines become line breaks. Every
//! update re-renders the full accumulated text.

use regex::Regex;
use std::sync::LazyLock;

/// Default height of the log panel in pixels
pub const LOG_HEIGHT_PX: u32 = 300;

/// Placeholder shown before the pipeline produces any output
pub const WAITING_FOR_LOGS: &str = "Waiting for logs...";

/// Delay before the panel scrolls to its newest line
pub const AUTOSCROLL_DELAY_MS: u32 = 20;

/// ESC '[' , parameter bytes 0x30-0x3F, intermediate bytes 0x20-0x2F, final byte 0x40-0x7E
static ANSI_CSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1B\[[0-?]*[ -/]*[@-~]").expect("CSI pattern is valid"));

/// Remove every ANSI CSI escape sequence from `text`.
///
/// All other characters are kept, in their original order.
pub fn clean_ansi(text: &str) -> String {
    ANSI_CSI.replace_all(text, "").into_owned()
}

/// Escape text for embedding in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render log text into the fixed-height, auto-scrolling log panel.
///
/// The text is expected to be cleaned already; see [`clean_ansi`]. Runs of
/// spaces and tabs are kept as-is by the panel's `pre-wrap` style.
pub fn render_log_html(log_text: &str, height_px: u32) -> String {
    let safe_text = escape_html(log_text).replace('\n', "<br/>");
    format!(
        r#"<div class="log-box" data-autoscroll-ms="{AUTOSCROLL_DELAY_MS}" style="height: {height_px}px; white-space: pre-wrap;">{safe_text}</div>"#
    )
}
