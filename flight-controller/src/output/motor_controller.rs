use embedded_hal::pwm::SetDutyCycle;

/// One ESC channel. Levels are fractions of the full duty range, an unarmed channel
/// is held fully off whatever level is requested.
pub struct MotorController<P> {
    pwm_channel: P,
    armed: bool,
    level: f32,
}

impl<P> MotorController<P>
where
    P: SetDutyCycle,
{
    pub fn new(mut pwm_channel: P) -> Self {
        if let Err(error) = pwm_channel.set_duty_cycle_fully_off() {
            log::warn!("Failed to initialize motor channel {:?}", error);
        }
        MotorController {
            pwm_channel,
            armed: false,
            level: 0.0,
        }
    }

    pub fn arm(&mut self) {
        self.armed = true;
        self.write_level(0.0);
    }

    pub fn unarm(&mut self) {
        self.write_level(0.0);
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn set_motor_speed(&mut self, level: f32) {
        if !self.armed {
            return;
        }
        let level = if level.is_nan() {
            0.0
        } else {
            level.clamp(0.0, 1.0)
        };
        self.write_level(level);
    }

    pub fn motor_speed(&self) -> f32 {
        self.level
    }

    fn write_level(&mut self, level: f32) {
        let duty = (self.pwm_channel.max_duty_cycle() as f32 * level) as u16;
        match self.pwm_channel.set_duty_cycle(duty) {
            Ok(()) => self.level = level,
            Err(error) => log::warn!("Failed to set motor duty {} {:?}", duty, error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulated::SimulatedPwmChannel;
    use embedded_hal::pwm::{Error, ErrorKind, ErrorType};

    #[test]
    fn unarmed_channel_stays_off() {
        let channel = SimulatedPwmChannel::new(1000);
        let duty = channel.duty_handle();
        let mut motor = MotorController::new(channel);
        motor.set_motor_speed(0.5);
        assert_eq!(duty.load(), 0);
        assert_eq!(motor.motor_speed(), 0.0);
    }

    #[test]
    fn armed_channel_maps_level_to_duty() {
        let channel = SimulatedPwmChannel::new(1000);
        let duty = channel.duty_handle();
        let mut motor = MotorController::new(channel);
        motor.arm();
        motor.set_motor_speed(0.25);
        assert_eq!(duty.load(), 250);
        motor.set_motor_speed(3.0);
        assert_eq!(duty.load(), 1000);
        assert_eq!(motor.motor_speed(), 1.0);

        motor.unarm();
        assert_eq!(duty.load(), 0);
        assert!(!motor.is_armed());
    }

    #[derive(Debug)]
    struct ChannelFault;

    impl Error for ChannelFault {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    struct FaultyChannel;

    impl ErrorType for FaultyChannel {
        type Error = ChannelFault;
    }

    impl SetDutyCycle for FaultyChannel {
        fn max_duty_cycle(&self) -> u16 {
            100
        }

        fn set_duty_cycle(&mut self, _duty: u16) -> Result<(), Self::Error> {
            Err(ChannelFault)
        }
    }

    #[test]
    fn channel_faults_are_not_fatal() {
        let mut motor = MotorController::new(FaultyChannel);
        motor.arm();
        motor.set_motor_speed(0.7);
        assert_eq!(motor.motor_speed(), 0.0);
    }
}
