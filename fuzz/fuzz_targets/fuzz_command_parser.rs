//! Fuzz target: remote command payloads.
//!
//! Feeds arbitrary broker payloads through the inbox decoding and the
//! parser. Neither may panic, and the decoded text must fit the inbox slot.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use circpump::app::commands::{Command, command_text};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = command_text(data);
    assert!(text.chars().count() <= 64, "command text exceeds inbox slot");

    let command = Command::parse_bytes(data);
    assert_eq!(command, Command::parse(&text));

    if let Command::Unknown(normalised) = &command {
        assert!(!normalised.is_empty(), "empty payload must parse as auto");
        assert!(!normalised.chars().any(|c| c.is_ascii_uppercase()));
    }
});
