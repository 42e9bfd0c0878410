//! Inbound remote commands.
//!
//! Payloads from the command topic are parsed exactly once, here, into the
//! closed [`Command`] set. Everything downstream matches on the variant.

/// Raw command payload as received from the transport.
pub type CommandText = heapless::String<64>;

/// Commands the remote channel can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stop feeding the watchdog and let it restart the device.
    Reset,
    /// Output to zero immediately.
    Off,
    /// Output to full power immediately.
    On,
    /// Re-enable boost scheduling.
    Auto,
    /// Ramp to an absolute level. Not clamped to the hardware maximum.
    SetLevel(u32),
    /// Anything unrecognised, normalised (trimmed, lowercase).
    Unknown(CommandText),
}

impl Command {
    /// Parse a payload. Case-insensitive and trimmed; the empty payload is
    /// an alias for `auto`; a run of ASCII digits is a level.
    pub fn parse(payload: &str) -> Self {
        let text = payload.trim();

        if text.is_empty() || text.eq_ignore_ascii_case("auto") {
            return Self::Auto;
        }
        if text.eq_ignore_ascii_case("reset") {
            return Self::Reset;
        }
        if text.eq_ignore_ascii_case("off") {
            return Self::Off;
        }
        if text.eq_ignore_ascii_case("on") {
            return Self::On;
        }
        if text.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(level) = text.parse::<u32>() {
                return Self::SetLevel(level);
            }
        }
        Self::Unknown(normalise(text))
    }

    /// Parse a raw byte payload; invalid UTF-8 is replaced before parsing.
    pub fn parse_bytes(payload: &[u8]) -> Self {
        Self::parse(&command_text(payload))
    }
}

/// Decode a raw payload into a [`CommandText`].
///
/// Invalid UTF-8 becomes U+FFFD, leading whitespace is dropped, and the
/// rest is truncated to capacity. Never fails.
pub fn command_text(payload: &[u8]) -> CommandText {
    let mut out = CommandText::new();
    for chunk in payload.utf8_chunks() {
        let valid = if out.is_empty() { chunk.valid().trim_start() } else { chunk.valid() };
        for c in valid.chars() {
            if out.push(c).is_err() {
                return out;
            }
        }
        if !chunk.invalid().is_empty() && out.push(char::REPLACEMENT_CHARACTER).is_err() {
            return out;
        }
    }
    out
}

/// Lowercase and truncate into a fixed-capacity string.
fn normalise(text: &str) -> CommandText {
    let mut out = CommandText::new();
    for c in text.chars().flat_map(char::to_lowercase) {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
