//! Fuzz target: feedback edge stream.
//!
//! Interprets the input as a sequence of (gap, level) edges, records them
//! the way the ISR does, and decodes at the end. Timestamps only move
//! forward; the decoder must always return a duty within 0..=100.
//!
//! cargo fuzz run fuzz_feedback_edges

#![no_main]

use circpump::sensors::feedback::{FeedbackCell, FeedbackDecoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let cell = FeedbackCell::new(2_000);
    let decoder = FeedbackDecoder::new(50, 1_000_000.0 / 75.0);

    let mut now: u64 = 0;
    for chunk in data.chunks_exact(3) {
        let gap = u64::from(u16::from_le_bytes([chunk[0], chunk[1]]));
        now += gap;
        let accepted = cell.record_edge(now, chunk[2] & 1 == 1);

        let sample = cell.snapshot();
        assert_eq!(sample.last_pulse_us, sample.last_flank_us);
        if accepted {
            assert_eq!(sample.last_flank_us, now);
        }
    }

    let report = decoder.sample(cell.snapshot(), now);
    assert!((0.0..=100.0).contains(&report.duty_percent));
});
