//! Auth Log Pattern
//!
//! Structural match for sshd "Failed password" lines:
//! timestamp, optional "invalid user" marker, principal, source identity, port.
//! Lines that do not match are simply not authentication failures.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::RawEvent;

static FAILED_PASSWORD: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"^(\w{3} +\d{1,2} \d{2}:\d{2}:\d{2}) .*sshd.*Failed password for (invalid user )?(\S+) from ([0-9A-Fa-f:.]+) port (\d+)",
    )
    .map_err(|e| log::error!("Failed-password pattern does not compile: {}", e))
    .ok()
});

/// Parse one log line into a failed-attempt RawEvent.
///
/// The event carries `raw` (trimmed line), `port` and `invalid_user` fields.
pub fn parse_failed_password(line: &str) -> Option<RawEvent> {
    let caps = FAILED_PASSWORD.as_ref()?.captures(line)?;

    let timestamp = caps.get(1)?.as_str();
    let invalid_user = caps.get(2).is_some();
    let user = caps.get(3)?.as_str();
    let source = caps.get(4)?.as_str();
    let port: u16 = caps.get(5)?.as_str().parse().ok()?;

    Some(
        RawEvent::new(source, timestamp)
            .with_principal(user)
            .with_field("port", port)
            .with_field("invalid_user", invalid_user)
            .with_field("raw", line.trim()),
    )
}
