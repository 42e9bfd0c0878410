//! Sensor subsystem: the feedback decoder, the diagnostic inputs and the
//! aggregating [`SensorHub`].

pub mod diagnostic;
pub mod feedback;

use diagnostic::{DiagnosticInputs, DiagnosticSnapshot};
use feedback::{FEEDBACK, FeedbackCell, FeedbackSample};

/// Owns the diagnostic readers and a handle to the ISR-fed feedback cell.
pub struct SensorHub {
    feedback: &'static FeedbackCell,
    diagnostics: DiagnosticInputs,
}

impl Default for SensorHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorHub {
    /// Hub reading the global cell written by the feedback ISR.
    pub fn new() -> Self {
        Self::with_cell(&FEEDBACK)
    }

    pub fn with_cell(feedback: &'static FeedbackCell) -> Self {
        Self {
            feedback,
            diagnostics: DiagnosticInputs::new(),
        }
    }

    pub fn feedback_sample(&self) -> FeedbackSample {
        self.feedback.snapshot()
    }

    pub fn read_diagnostics(&mut self) -> DiagnosticSnapshot {
        self.diagnostics.read()
    }
}
