//! GPIO / peripheral pin assignments for the pump controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers. The `PINxx` telemetry keys keep the labels of the
//! first wiring harness, so each constant notes the key it reports under.

// ---------------------------------------------------------------------------
// Pump speed output (reported as PWM / PIN0)
// ---------------------------------------------------------------------------

/// LEDC PWM output into the pump's speed input.
pub const PUMP_PWM_GPIO: i32 = 1;

// ---------------------------------------------------------------------------
// Pump feedback (reported as PIN5)
// ---------------------------------------------------------------------------

/// PWM feedback emitted by the pump; an any-edge interrupt feeds the decoder.
pub const FEEDBACK_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Diagnostic digital inputs (pull-up)
// ---------------------------------------------------------------------------

/// Spare test input (PIN1).
pub const TEST_INPUT_GPIO: i32 = 2;
/// Auxiliary feedback input (PIN7).
pub const AUX_FEEDBACK_GPIO: i32 = 7;
/// Pump run-sense input (PIN19 / PumpFeedback), no pull.
pub const PUMP_SENSE_GPIO: i32 = 19;

// ---------------------------------------------------------------------------
// Diagnostic analog inputs (ADC1, reported as PIN26..PIN28)
// ---------------------------------------------------------------------------

/// ADC1 channel N sits on GPIO N+1 on the ESP32-S3.
pub const ADC1_CH_DIAG_A: u32 = 7; // GPIO 8  → PIN26
pub const ADC1_CH_DIAG_B: u32 = 8; // GPIO 9  → PIN27
pub const ADC1_CH_DIAG_C: u32 = 9; // GPIO 10 → PIN28
/// ADC full-scale reference in volts.
pub const ADC_VREF: f32 = 3.3;
/// 12-bit ADC full scale.
pub const ADC_MAX_RAW: u16 = 4_095;

// ---------------------------------------------------------------------------
// Status LED
// ---------------------------------------------------------------------------

pub const STATUS_LED_GPIO: i32 = 48;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits). 14 bits is the ESP32-S3 ceiling.
pub const PWM_RESOLUTION_BITS: u32 = 14;
