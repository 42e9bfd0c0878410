//! Pass-through diagnostic inputs.
//!
//! Three digital lines and three ADC1 voltages reported in telemetry. None of
//! them feed back into control; a failed read reports zero and is logged at
//! debug level only.

use log::debug;

use crate::drivers::hw_init;
use crate::pins;

/// One read of every diagnostic input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiagnosticSnapshot {
    /// Spare test input (`PIN1`).
    pub test_input: bool,
    /// Auxiliary feedback input (`PIN7`).
    pub aux_feedback: bool,
    /// Current level of the pump feedback line itself (`PIN5`).
    pub feedback_line: bool,
    /// Pump run-sense input (`PIN19` / `PumpFeedback`).
    pub pump_sense: bool,
    /// ADC voltages reported as `PIN26`, `PIN27`, `PIN28`.
    pub voltages: [f32; 3],
    /// Heap usage in percent.
    pub mem_percent: u8,
}

/// Reads the diagnostic GPIOs and ADC channels.
pub struct DiagnosticInputs {
    adc_channels: [u32; 3],
}

impl Default for DiagnosticInputs {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticInputs {
    pub fn new() -> Self {
        Self {
            adc_channels: [pins::ADC1_CH_DIAG_A, pins::ADC1_CH_DIAG_B, pins::ADC1_CH_DIAG_C],
        }
    }

    pub fn read(&mut self) -> DiagnosticSnapshot {
        let mut voltages = [0.0; 3];
        for (slot, &channel) in voltages.iter_mut().zip(self.adc_channels.iter()) {
            *slot = match hw_init::adc1_read(channel) {
                Ok(raw) => raw_to_volts(raw),
                Err(e) => {
                    debug!("diag: ADC1 ch{} read failed: {}", channel, e);
                    0.0
                }
            };
        }

        DiagnosticSnapshot {
            test_input: hw_init::gpio_read(pins::TEST_INPUT_GPIO),
            aux_feedback: hw_init::gpio_read(pins::AUX_FEEDBACK_GPIO),
            feedback_line: hw_init::gpio_read(pins::FEEDBACK_GPIO),
            pump_sense: hw_init::gpio_read(pins::PUMP_SENSE_GPIO),
            voltages,
            mem_percent: crate::diagnostics::memory_percent(),
        }
    }
}

/// Scale a raw 12-bit reading to volts, rounded to millivolts.
pub fn raw_to_volts(raw: u16) -> f32 {
    let raw = raw.min(pins::ADC_MAX_RAW);
    let volts = f32::from(raw) / f32::from(pins::ADC_MAX_RAW) * pins::ADC_VREF;
    (volts * 1_000.0).round() / 1_000.0
}
