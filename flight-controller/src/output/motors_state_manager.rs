use embedded_hal::pwm::SetDutyCycle;
use shared_definitions::protocol::messages::MAX_MOTOR_COUNT;

use super::motor_controller::MotorController;

/// Motor bank as seen by the flight controller, indices past the installed motors are
/// ignored and read back as 0.
pub trait MotorOutputs {
    fn arm(&mut self);
    fn unarm(&mut self);
    fn is_armed(&self) -> bool;
    fn set_motor_level(&mut self, index: usize, level: f32);
    fn motor_level(&self, index: usize) -> f32;

    fn clear_motor_levels(&mut self) {
        for index in 0..MAX_MOTOR_COUNT {
            self.set_motor_level(index, 0.0);
        }
    }

    fn motor_levels(&self) -> [f32; MAX_MOTOR_COUNT] {
        core::array::from_fn(|index| self.motor_level(index))
    }
}

pub struct MotorsStateManager<P> {
    controllers: [Option<MotorController<P>>; MAX_MOTOR_COUNT],
    armed: bool,
}

impl<P> MotorsStateManager<P>
where
    P: SetDutyCycle,
{
    /// Takes up to eight channels in motor order, extra channels are dropped.
    pub fn new(channels: impl IntoIterator<Item = P>) -> Self {
        let mut channels = channels.into_iter();
        let controllers = core::array::from_fn(|_| channels.next().map(MotorController::new));
        MotorsStateManager {
            controllers,
            armed: false,
        }
    }

    pub fn installed_motors(&self) -> usize {
        self.controllers.iter().flatten().count()
    }

    pub fn set_motor_power(&mut self, values: &[f32]) {
        for (index, value) in values.iter().enumerate() {
            self.set_motor_level(index, *value);
        }
    }

    pub fn kill_motors(&mut self) {
        self.clear_motor_levels();
        log::info!("Killed motors");
    }
}

impl<P> MotorOutputs for MotorsStateManager<P>
where
    P: SetDutyCycle,
{
    fn arm(&mut self) {
        for controller in self.controllers.iter_mut().flatten() {
            controller.arm();
        }
        self.armed = true;
    }

    fn unarm(&mut self) {
        for controller in self.controllers.iter_mut().flatten() {
            controller.unarm();
        }
        self.armed = false;
    }

    fn is_armed(&self) -> bool {
        self.armed
    }

    fn set_motor_level(&mut self, index: usize, level: f32) {
        if let Some(Some(controller)) = self.controllers.get_mut(index) {
            controller.set_motor_speed(level);
        }
    }

    fn motor_level(&self, index: usize) -> f32 {
        match self.controllers.get(index) {
            Some(Some(controller)) => controller.motor_speed(),
            _ => 0.0,
        }
    }
}
