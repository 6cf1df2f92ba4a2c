const VOLTAGE_DIVIDER_MULTIPLIER: f32 = 9.648; // 999k + 119k
const ADC_1_VOLT: u16 = 672_u16;
const MULTIPLIER: f32 = (1.0 / ADC_1_VOLT as f32) * VOLTAGE_DIVIDER_MULTIPLIER;

pub trait BatteryMonitor {
    fn board_voltage(&mut self) -> f32;
}

/// Converts a raw sample taken behind the board's voltage divider.
pub fn adc_sample_to_voltage(sample: u16) -> f32 {
    sample as f32 * MULTIPLIER
}
