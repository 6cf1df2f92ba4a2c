//! Single axis PID with derivative on measurement, a low-pass filtered derivative,
//! conditional integration and a fixed output smoothing stage.
//!
//! Gains and ranges are only meaningful for a continuous regime, so every gain or range
//! change clears the accumulated history.

use core::f32::consts::PI;

use shared_definitions::{
    controller::PIDTuneConfig,
    protocol::{
        encoding::{encode_pid_gain, to_int64},
        messages::{PIDDesc, PIDState},
    },
};

use super::integrator::Integrator;

const PREVIOUS_OUTPUT_WEIGHT: f32 = 0.87;
const NEW_OUTPUT_WEIGHT: f32 = 0.13;
/// Gaps longer than this mean the loop was stalled.
const MAX_DELTA_TIME_S: f32 = 1.0;

pub struct PID {
    setpoint: f32,
    scalar: f32,
    proportional_multiplier: f32,
    integral_multiplier: f32,
    derivative_multiplier: f32,
    range_min: f32,
    range_max: f32,
    lowpass_cutoff_hz: f32,
    delta_time: f32,
    previous_time_ms: Option<u64>,
    previous_error: f32,
    previous_value: f32,
    previous_derivative: Option<f32>,
    error_integrator: Integrator,
    last_output: f32,
}

impl Default for PID {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }
}

impl PID {
    pub fn new(
        proportional_multiplier: f32,
        integral_multiplier: f32,
        derivative_multiplier: f32,
    ) -> Self {
        PID {
            setpoint: 0.0,
            scalar: 1.0,
            proportional_multiplier,
            integral_multiplier,
            derivative_multiplier,
            range_min: -1.0,
            range_max: 1.0,
            lowpass_cutoff_hz: 20.0,
            delta_time: 0.0,
            previous_time_ms: None,
            previous_error: 0.0,
            previous_value: 0.0,
            previous_derivative: None,
            error_integrator: Integrator::new(0.5),
            last_output: 0.0,
        }
    }

    /// Feeds a measurement taken at `timestamp_ms`.
    ///
    /// Returns `None` while there is no usable interval: on the first sample after a
    /// clear, on a duplicate timestamp and after a stall (which also clears).
    pub fn update(&mut self, measured_value: f32, timestamp_ms: u64) -> Option<f32> {
        self.previous_error = self.setpoint - measured_value;

        let previous_time_ms = match self.previous_time_ms {
            Some(previous_time_ms) => previous_time_ms,
            None => {
                self.previous_time_ms = Some(timestamp_ms);
                self.previous_value = measured_value;
                self.previous_derivative = None;
                self.error_integrator.reset();
                return None;
            }
        };

        if timestamp_ms < previous_time_ms {
            self.clear();
            return None;
        }
        let delta_time = (timestamp_ms - previous_time_ms) as f32 / 1000.0;
        if delta_time > MAX_DELTA_TIME_S {
            self.clear();
            return None;
        }
        if delta_time == 0.0 {
            return None;
        }
        self.delta_time = delta_time;
        self.previous_time_ms = Some(timestamp_ms);

        self.update_derivative(measured_value);
        self.update_integral();

        let raw_output = self.proportional() + self.integral() + self.derivative();
        self.last_output = PREVIOUS_OUTPUT_WEIGHT * self.last_output
            + NEW_OUTPUT_WEIGHT * raw_output * self.scalar;
        Some(self.last_output)
    }

    fn update_derivative(&mut self, measured_value: f32) {
        let filtered = match self.previous_derivative {
            None => 0.0,
            Some(previous) => {
                let raw = (self.previous_value - measured_value) / self.delta_time;
                let rc = 1.0 / (2.0 * PI * self.lowpass_cutoff_hz);
                let alpha = self.delta_time / (rc + self.delta_time);
                previous + alpha * (raw - previous)
            }
        };
        self.previous_value = measured_value;
        self.previous_derivative = Some(filtered);
    }

    fn update_integral(&mut self) {
        let level = self.proportional() + self.integral() + self.derivative();
        if level > self.range_min && level < self.range_max {
            self.error_integrator
                .add_new_value(self.previous_error, self.delta_time);
        }
    }

    fn proportional(&self) -> f32 {
        self.proportional_multiplier * self.previous_error
    }

    fn integral(&self) -> f32 {
        self.integral_multiplier * self.error_integrator.get_current_value()
    }

    fn derivative(&self) -> f32 {
        self.derivative_multiplier * self.delta_error()
    }

    /// Forgets the timing, error, derivative and integral history. The next update
    /// only records a baseline.
    pub fn clear(&mut self) {
        self.delta_time = 0.0;
        self.previous_time_ms = None;
        self.previous_error = 0.0;
        self.previous_derivative = None;
        self.error_integrator.reset();
    }

    pub fn reset_integral(&mut self) {
        self.error_integrator.reset();
        if self.previous_derivative.is_some() {
            self.previous_derivative = Some(0.0);
        }
    }

    pub fn set_setpoint(&mut self, value: f32) {
        if value.is_nan() {
            return;
        }
        self.setpoint = value.clamp(self.range_min, self.range_max);
    }

    pub fn set_range_min(&mut self, range_min: f32) {
        if !(range_min < self.range_max) {
            return;
        }
        self.range_min = range_min;
        if self.setpoint < range_min {
            self.setpoint = range_min;
        }
        self.clear();
    }

    pub fn set_range_max(&mut self, range_max: f32) {
        if !(range_max > self.range_min) {
            return;
        }
        self.range_max = range_max;
        if self.setpoint > range_max {
            self.setpoint = range_max;
        }
        self.clear();
    }

    pub fn set_proportional_multiplier(&mut self, value: f32) {
        if !(value >= 0.0) {
            return;
        }
        self.proportional_multiplier = value;
        self.clear();
    }

    pub fn set_integral_multiplier(&mut self, value: f32) {
        if !(value >= 0.0) {
            return;
        }
        self.integral_multiplier = value;
        self.clear();
    }

    pub fn set_derivative_multiplier(&mut self, value: f32) {
        if value.is_nan() {
            return;
        }
        self.derivative_multiplier = value;
        self.clear();
    }

    pub fn set_gains(&mut self, proportional: f32, integral: f32, derivative: f32) {
        self.set_proportional_multiplier(proportional);
        self.set_integral_multiplier(integral);
        self.set_derivative_multiplier(derivative);
    }

    pub fn set_windup_limit(&mut self, limit: f32) {
        if !(limit >= 0.0) {
            return;
        }
        self.error_integrator.set_limit(limit);
    }

    pub fn set_lowpass_cutoff(&mut self, cutoff_hz: f32) {
        if !(cutoff_hz > 0.0) {
            return;
        }
        self.lowpass_cutoff_hz = cutoff_hz;
    }

    pub fn set_scalar(&mut self, scalar: f32) {
        self.scalar = scalar;
    }

    pub fn target(&self) -> f32 {
        self.setpoint
    }

    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    pub fn error(&self) -> f32 {
        self.previous_error
    }

    /// Filtered derivative of the measurement, 0 while undefined.
    pub fn delta_error(&self) -> f32 {
        self.previous_derivative.unwrap_or(0.0)
    }

    pub fn accumulated_error(&self) -> f32 {
        self.error_integrator.get_current_value()
    }

    pub fn windup_limit(&self) -> f32 {
        self.error_integrator.limit()
    }

    pub fn lowpass_cutoff(&self) -> f32 {
        self.lowpass_cutoff_hz
    }

    pub fn scalar(&self) -> f32 {
        self.scalar
    }

    pub fn last_output(&self) -> f32 {
        self.last_output
    }

    pub fn range(&self) -> (f32, f32) {
        (self.range_min, self.range_max)
    }

    pub fn gains(&self) -> (f32, f32, f32) {
        (
            self.proportional_multiplier,
            self.integral_multiplier,
            self.derivative_multiplier,
        )
    }

    pub fn tune_config(&self) -> PIDTuneConfig {
        PIDTuneConfig {
            proportional: self.proportional_multiplier,
            integral: self.integral_multiplier,
            derivative: self.derivative_multiplier,
            range_min: self.range_min,
            range_max: self.range_max,
        }
    }

    pub fn pid_state(&self) -> PIDState {
        PIDState {
            set_point: to_int64(self.setpoint),
            delta_time: to_int64(self.delta_time),
            current_error: to_int64(self.previous_error),
            delta_error: to_int64(self.delta_error()),
            integral_error: to_int64(self.accumulated_error()),
            windup_limit: to_int64(self.windup_limit()),
            desc: PIDDesc {
                kp: encode_pid_gain(self.proportional_multiplier),
                ki: encode_pid_gain(self.integral_multiplier),
                kd: encode_pid_gain(self.derivative_multiplier),
                range_min: to_int64(self.range_min),
                range_max: to_int64(self.range_max),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::value_close;

    fn running_pid(proportional: f32, integral: f32, derivative: f32) -> PID {
        let mut pid = PID::new(proportional, integral, derivative);
        assert_eq!(pid.update(0.0, 1000), None);
        pid
    }

    #[test]
    fn first_sample_only_records_a_baseline() {
        let mut pid = PID::default();
        pid.set_setpoint(0.5);
        assert_eq!(pid.update(0.0, 1000), None);
        assert!(value_close(pid.error(), 0.5));
        assert!(pid.update(0.0, 1005).is_some());
    }

    #[test]
    fn duplicate_timestamps_leave_the_output_unchanged() {
        let mut pid = running_pid(1.0, 0.5, 0.1);
        pid.set_setpoint(0.3);
        pid.update(0.1, 1010);
        pid.update(0.2, 1020);
        let output = pid.last_output();
        let integral = pid.accumulated_error();

        assert_eq!(pid.update(0.2, 1020), None);
        assert_eq!(pid.update(0.2, 1020), None);
        assert_eq!(pid.last_output(), output);
        assert_eq!(pid.accumulated_error(), integral);
    }

    #[test]
    fn stalled_loop_clears_and_rearms() {
        let mut pid = running_pid(1.0, 1.0, 0.0);
        pid.set_setpoint(0.2);
        pid.update(0.0, 1100);
        assert!(pid.accumulated_error() > 0.0);

        assert_eq!(pid.update(0.0, 2101), None);
        assert_eq!(pid.accumulated_error(), 0.0);
        assert_eq!(pid.delta_time(), 0.0);
        assert_eq!(pid.update(0.0, 2110), None);
        assert!(pid.update(0.0, 2120).is_some());
    }

    #[test]
    fn output_is_smoothed_with_the_previous_cycle() {
        let mut pid = running_pid(1.0, 0.0, 0.0);
        pid.set_setpoint(0.5);
        let first = pid.update(0.0, 1010).unwrap();
        assert!(value_close(first, 0.13 * 0.5));
        let second = pid.update(0.0, 1020).unwrap();
        assert!(value_close(second, 0.87 * first + 0.13 * 0.5));

        pid.set_scalar(0.0);
        let third = pid.update(0.0, 1030).unwrap();
        assert!(value_close(third, 0.87 * second));
    }

    #[test]
    fn derivative_tracks_the_measurement_through_the_lowpass() {
        let mut pid = running_pid(0.0, 0.0, 1.0);
        pid.update(0.0, 1010);
        assert_eq!(pid.delta_error(), 0.0);

        pid.update(0.1, 1020);
        let raw = (0.0 - 0.1) / 0.01;
        let rc = 1.0 / (2.0 * PI * 20.0);
        let alpha = 0.01 / (rc + 0.01);
        assert!(value_close(pid.delta_error(), alpha * raw));

        // A setpoint step alone does not kick the derivative
        pid.set_setpoint(1.0);
        pid.update(0.1, 1030);
        assert!(value_close(pid.delta_error(), alpha * raw * (1.0 - alpha)));
    }

    #[test]
    fn setpoint_always_stays_in_range() {
        let mut pid = PID::default();
        pid.set_range_min(-0.5);
        pid.set_range_max(0.25);
        for value in [-10.0, -0.5, 0.1, 0.25, 3.0, f32::MAX, f32::MIN, f32::NAN] {
            pid.set_setpoint(value);
            let (min, max) = pid.range();
            assert!(pid.target() >= min && pid.target() <= max);
        }
        assert!(value_close(pid.target(), -0.5));
    }

    #[test]
    fn inverted_ranges_are_ignored() {
        let mut pid = PID::default();
        pid.set_range_min(1.0);
        pid.set_range_max(-2.0);
        pid.set_range_min(f32::NAN);
        assert_eq!(pid.range(), (-1.0, 1.0));
    }

    #[test]
    fn narrowing_the_range_reclamps_and_clears() {
        let mut pid = running_pid(1.0, 1.0, 0.0);
        pid.set_setpoint(0.9);
        pid.update(0.0, 1010);
        assert!(pid.accumulated_error() > 0.0);

        pid.set_range_max(0.5);
        assert!(value_close(pid.target(), 0.5));
        assert_eq!(pid.accumulated_error(), 0.0);
        assert_eq!(pid.update(0.0, 1020), None);
    }

    #[test]
    fn negative_gains_are_rejected_except_derivative() {
        let mut pid = PID::new(2.0, 3.0, 4.0);
        pid.set_proportional_multiplier(-1.0);
        pid.set_integral_multiplier(-1.0);
        pid.set_derivative_multiplier(-1.0);
        assert_eq!(pid.gains(), (2.0, 3.0, -1.0));
    }

    #[test]
    fn gain_changes_clear_history() {
        let mut pid = running_pid(1.0, 1.0, 0.0);
        pid.set_setpoint(0.4);
        pid.update(0.0, 1010);
        pid.set_integral_multiplier(2.0);
        assert_eq!(pid.accumulated_error(), 0.0);
        assert_eq!(pid.update(0.0, 1020), None);
    }

    #[test]
    fn integral_is_bounded_by_the_windup_limit() {
        let mut pid = running_pid(0.0, 0.01, 0.0);
        pid.set_windup_limit(0.25);
        pid.set_setpoint(1.0);
        for tick in 1..500 {
            pid.update(0.0, 1000 + tick * 5);
            assert!(pid.accumulated_error() <= pid.windup_limit());
        }
        assert!(value_close(pid.accumulated_error(), 0.25));
    }

    #[test]
    fn saturated_output_stops_integration() {
        let mut pid = running_pid(10.0, 1.0, 0.0);
        pid.set_setpoint(1.0);
        for tick in 1..200 {
            pid.update(-1.0, 1000 + tick * 5);
            assert_eq!(pid.accumulated_error(), 0.0);
        }
    }

    #[test]
    fn reset_integral_keeps_the_baseline() {
        let mut pid = running_pid(1.0, 1.0, 1.0);
        pid.set_setpoint(0.3);
        pid.update(0.0, 1010);
        pid.update(0.1, 1020);
        pid.reset_integral();
        assert_eq!(pid.accumulated_error(), 0.0);
        assert_eq!(pid.delta_error(), 0.0);
        assert!(pid.update(0.1, 1030).is_some());
    }

    #[test]
    fn no_derivative_kick_after_clear_and_reset() {
        let mut pid = PID::new(0.0, 0.0, 1.0);
        pid.update(1.1, 1000);
        pid.update(1.1, 1010);
        pid.clear();
        assert_eq!(pid.update(0.0, 2000), None);
        pid.reset_integral();
        assert_eq!(pid.delta_error(), 0.0);

        pid.update(0.0, 2005);
        assert!(pid.delta_error().abs() < 1e-6);
        pid.update(0.0, 2010);
        assert!(pid.delta_error().abs() < 1e-6);
    }

    #[test]
    fn snapshot_uses_wire_encodings() {
        let mut pid = PID::new(1.25, 0.325, 0.077);
        pid.set_setpoint(0.5);
        let state = pid.pid_state();
        assert_eq!(state.desc.kp, 1250);
        assert_eq!(state.desc.ki, 325);
        assert_eq!(state.desc.kd, 77);
        assert_eq!(state.desc.range_min, i64::MIN);
        assert_eq!(state.desc.range_max, i64::MAX);
        assert_eq!(state.set_point, to_int64(0.5));
    }
}
