//! Line framing for the panel's serial protocol.
//!
//! Outbound: `P:<s1>,<s2>,...` lights a pattern.
//! Inbound: `B:<n>` or a bare `<n>` is a button press; every other line
//! (boot banners, debug prints, values outside the alphabet) is noise.

use super::HardwareEvent;
use crate::game::Signal;

const PATTERN_PREFIX: &str = "P:";
const BUTTON_PREFIX: &str = "B:";

/// Encode a pattern as one newline-terminated frame.
pub fn encode_pattern(pattern: &[Signal]) -> String {
    let body = pattern
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("{}{}\n", PATTERN_PREFIX, body)
}

/// Decode one inbound line (without its terminator).
pub fn decode_line(line: &str) -> HardwareEvent {
    let trimmed = line.trim();
    let payload = trimmed.strip_prefix(BUTTON_PREFIX).unwrap_or(trimmed).trim();
    payload
        .parse::<i64>()
        .ok()
        .and_then(Signal::new)
        .map(HardwareEvent::Button)
        .unwrap_or_else(|| HardwareEvent::Noise(trimmed.to_string()))
}
