//! One-shot hardware peripheral initialization.
//!
//! Configures the diagnostic ADC channels, GPIO directions, the pump LEDC
//! timer/channel and the feedback interrupt using raw ESP-IDF sys calls.
//! Called once from `main()` before the control loop starts.
//!
//! The embedded-hal handles at the bottom ([`LedcPwm`], [`GpioOutput`]) are
//! what the drivers own; on the host they only remember the last value.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::error::SensorError;
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
use log::info;

/// Configure every peripheral the controller touches.
///
/// `pwm_frequency_hz` is the pump carrier; the LEDC channel starts at zero
/// duty and the caller applies the power-on level right after.
#[cfg(target_os = "espidf")]
pub fn init_peripherals(pwm_frequency_hz: u32) -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the loop; single-threaded.
    unsafe {
        init_adc()?;
        init_gpio_inputs()?;
        init_gpio_outputs()?;
        init_ledc(pwm_frequency_hz)?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals(_pwm_frequency_hz: u32) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: only the init path writes the handle, and it completes before
/// the loop starts reading.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    esp!(unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) }).map_err(|e| HwInitError::AdcInitFailed(e.code()))?;

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };

    for channel in [pins::ADC1_CH_DIAG_A, pins::ADC1_CH_DIAG_B, pins::ADC1_CH_DIAG_C] {
        esp!(unsafe { adc_oneshot_config_channel(adc1_handle(), channel, &chan_cfg) }).map_err(|e| HwInitError::AdcInitFailed(e.code()))?;
    }

    info!("hw_init: ADC1 configured (CH7..CH9 diagnostics)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Result<u16, SensorError> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract; main-loop access only.
    esp!(unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) }).map_err(|_| SensorError::AdcReadFailed)?;
    Ok(raw.clamp(0, i32::from(pins::ADC_MAX_RAW)) as u16)
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> Result<u16, SensorError> {
    Ok(0)
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    let pulled_up = [
        (pins::TEST_INPUT_GPIO, gpio_int_type_t_GPIO_INTR_DISABLE),
        (pins::AUX_FEEDBACK_GPIO, gpio_int_type_t_GPIO_INTR_DISABLE),
        (pins::FEEDBACK_GPIO, gpio_int_type_t_GPIO_INTR_ANYEDGE),
    ];

    for (pin, intr_type) in pulled_up {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type,
        };
        esp!(unsafe { gpio_config(&cfg) }).map_err(|e| HwInitError::GpioConfigFailed(e.code()))?;
    }

    // Run-sense is driven by the pump electronics.
    let sense_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::PUMP_SENSE_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    esp!(unsafe { gpio_config(&sense_cfg) }).map_err(|e| HwInitError::GpioConfigFailed(e.code()))?;

    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: read-only register access on an already-configured input.
    (unsafe { gpio_get_level(pin) }) != 0
}

/// Host inputs idle high, like the pulled-up lines on the board.
#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::STATUS_LED_GPIO,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    esp!(unsafe { gpio_config(&cfg) }).map_err(|e| HwInitError::GpioConfigFailed(e.code()))?;
    unsafe { gpio_set_level(pins::STATUS_LED_GPIO, 0) };

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

// ── LEDC PWM ─────────────────────────────────────────────────

pub const LEDC_CH_PUMP: u32 = 0;

#[cfg(target_os = "espidf")]
unsafe fn init_ledc(frequency_hz: u32) -> Result<(), HwInitError> {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: pins::PWM_RESOLUTION_BITS,
        freq_hz: frequency_hz,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: single main-task context via init_peripherals().
    esp!(unsafe { ledc_timer_config(&timer) }).map_err(|e| HwInitError::LedcInitFailed(e.code()))?;

    esp!(unsafe {
        ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: LEDC_CH_PUMP,
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: pins::PUMP_PWM_GPIO,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        })
    })
    .map_err(|e| HwInitError::LedcInitFailed(e.code()))?;

    info!(
        "hw_init: LEDC configured (pump=CH0, {} Hz, {}-bit)",
        frequency_hz,
        pins::PWM_RESOLUTION_BITS
    );
    Ok(())
}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn feedback_gpio_isr(_arg: *mut core::ffi::c_void) {
    // SAFETY: counter read and register read, both ISR-safe.
    let (now_us, level) = unsafe { (esp_timer_get_time() as u64, gpio_get_level(pins::FEEDBACK_GPIO)) };
    crate::sensors::feedback::feedback_isr_handler(now_us, level != 0);
}

/// Install the GPIO ISR service and hook the feedback line.
/// Call after init_peripherals() and before the loop.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed. The handler only touches atomics.
    unsafe {
        if let Err(e) = esp!(gpio_install_isr_service(0)) {
            if e.code() != ESP_ERR_INVALID_STATE as esp_err_t {
                return Err(HwInitError::IsrInstallFailed(e.code()));
            }
        }

        gpio_set_intr_type(pins::FEEDBACK_GPIO, gpio_int_type_t_GPIO_INTR_ANYEDGE);
        esp!(gpio_isr_handler_add(pins::FEEDBACK_GPIO, Some(feedback_gpio_isr), core::ptr::null_mut()))
            .map_err(|e| HwInitError::IsrInstallFailed(e.code()))?;
        gpio_intr_enable(pins::FEEDBACK_GPIO);
    }
    info!("hw_init: ISR service installed (feedback, any edge)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}

// ── embedded-hal handles ──────────────────────────────────────

/// Raw ESP-IDF return code behind a failed register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EspCode(pub i32);

impl embedded_hal::pwm::Error for EspCode {
    fn kind(&self) -> embedded_hal::pwm::ErrorKind {
        embedded_hal::pwm::ErrorKind::Other
    }
}

impl embedded_hal::digital::Error for EspCode {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

/// One LEDC channel at `PWM_RESOLUTION_BITS` resolution.
pub struct LedcPwm {
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    channel: u32,
    duty: u16,
}

impl LedcPwm {
    /// Handle to a channel configured by [`init_peripherals`].
    pub fn new(channel: u32) -> Self {
        Self { channel, duty: 0 }
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }
}

impl embedded_hal::pwm::ErrorType for LedcPwm {
    type Error = EspCode;
}

impl embedded_hal::pwm::SetDutyCycle for LedcPwm {
    fn max_duty_cycle(&self) -> u16 {
        ((1u32 << pins::PWM_RESOLUTION_BITS) - 1) as u16
    }

    #[cfg(target_os = "espidf")]
    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        // SAFETY: channel configured in init_ledc(); main loop is the only writer.
        unsafe {
            esp!(ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, self.channel, u32::from(duty)))
                .map_err(|e| EspCode(e.code()))?;
            esp!(ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, self.channel)).map_err(|e| EspCode(e.code()))?;
        }
        self.duty = duty;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty = duty;
        Ok(())
    }
}

/// Push-pull GPIO output.
pub struct GpioOutput {
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    pin: i32,
    high: bool,
}

impl GpioOutput {
    pub fn new(pin: i32) -> Self {
        Self { pin, high: false }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, high: bool) -> Result<(), EspCode> {
        // SAFETY: pin configured as output in init_gpio_outputs().
        esp!(unsafe { gpio_set_level(self.pin, u32::from(high)) }).map_err(|e| EspCode(e.code()))?;
        self.high = high;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, high: bool) -> Result<(), EspCode> {
        self.high = high;
        Ok(())
    }
}

impl embedded_hal::digital::ErrorType for GpioOutput {
    type Error = EspCode;
}

impl embedded_hal::digital::OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}
