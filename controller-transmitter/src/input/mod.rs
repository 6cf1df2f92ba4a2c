use std::{
    fs::OpenOptions,
    io::{self, BufReader},
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use shared_definitions::{controller::ControlInput, protocol::encoding::to_int16};

use self::controller::{AnalogInputCodes, ButtonPressCodes, EventTypes, InputEvent};

pub mod controller;

const TRIGGER_MAX: f32 = 1023.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DroneMovementInput {
    pub input: ControlInput,
    pub kill_motors: bool,
}

/// Where the stick values streamed to the aircraft come from.
pub trait ControlInputSource {
    /// The input for the next Control message, `None` once the source is exhausted.
    fn next_input(&mut self) -> Option<DroneMovementInput>;
}

/// Replays a fixed list of `(ticks, input)` steps.
pub struct ScriptedInput {
    steps: Vec<(u32, ControlInput)>,
    step: usize,
    tick: u32,
}

impl ScriptedInput {
    pub fn new(steps: Vec<(u32, ControlInput)>) -> Self {
        ScriptedInput {
            steps,
            step: 0,
            tick: 0,
        }
    }

    /// Spool up to hover, a short roll right and back, then throttle down.
    pub fn hover_test() -> Self {
        let hover = ControlInput::default();
        let lift = ControlInput {
            thrust: to_int16(0.1),
            ..hover
        };
        Self::new(vec![
            (50, hover),
            (100, lift),
            (
                25,
                ControlInput {
                    roll: to_int16(0.25),
                    ..lift
                },
            ),
            (100, lift),
            (
                50,
                ControlInput {
                    thrust: to_int16(-1.0),
                    ..hover
                },
            ),
        ])
    }
}

impl ControlInputSource for ScriptedInput {
    fn next_input(&mut self) -> Option<DroneMovementInput> {
        loop {
            let (ticks, input) = *self.steps.get(self.step)?;
            if self.tick < ticks {
                self.tick += 1;
                return Some(DroneMovementInput {
                    input,
                    kill_motors: false,
                });
            }
            self.step += 1;
            self.tick = 0;
        }
    }
}

/// Xbox style gamepad read from an evdev node on a background thread.
#[derive(Clone)]
pub struct ControlInputMapper {
    drone_controls: Arc<Mutex<DroneMovementInput>>,
    reading: Arc<AtomicBool>,
}

impl ControlInputMapper {
    pub fn new() -> Self {
        ControlInputMapper {
            drone_controls: Arc::new(Mutex::new(DroneMovementInput::default())),
            reading: Arc::new(AtomicBool::new(false)),
        }
    }

    fn map_event_to_action(&self, event: InputEvent) {
        match event.event_type {
            EventTypes::ButtonPress => {
                if let Ok(button) = ButtonPressCodes::try_from(event.code) {
                    self.handle_button_press(button, event.value)
                }
            }
            EventTypes::AnalogInput => {
                if let Ok(axis) = AnalogInputCodes::try_from(event.code) {
                    self.handle_analog_input(axis, event.value)
                }
            }
            EventTypes::None => {}
        }
    }

    fn handle_button_press(&self, button: ButtonPressCodes, value: i32) {
        if button == ButtonPressCodes::B && value != 0 {
            self.controls().kill_motors = true;
        }
    }

    fn handle_analog_input(&self, axis: AnalogInputCodes, value: i32) {
        let stick = value.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        let mut controls = self.controls();
        match axis {
            AnalogInputCodes::LT => {
                controls.input.thrust = to_int16(value as f32 / TRIGGER_MAX);
            }
            AnalogInputCodes::RightX => controls.input.roll = stick,
            AnalogInputCodes::RightY => controls.input.pitch = stick,
            AnalogInputCodes::LeftX => controls.input.yaw = stick,
            _ => {}
        }
    }

    fn controls(&self) -> std::sync::MutexGuard<'_, DroneMovementInput> {
        self.drone_controls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_current_input(&self) -> DroneMovementInput {
        *self.controls()
    }

    pub fn start_event_handler_thread(&self, device_path: impl AsRef<Path>) -> io::Result<()> {
        let device = OpenOptions::new().read(true).open(device_path)?;
        let mapper = self.clone();
        self.reading.store(true, Ordering::Relaxed);
        std::thread::Builder::new()
            .name("gamepad".into())
            .spawn(move || {
                let mut device = BufReader::new(device);
                loop {
                    match InputEvent::read_from(&mut device) {
                        Ok(event) => mapper.map_event_to_action(event),
                        Err(error) => {
                            log::warn!("Gamepad disconnected: {}", error);
                            break;
                        }
                    }
                }
                mapper.reading.store(false, Ordering::Relaxed);
            })?;
        Ok(())
    }
}

impl Default for ControlInputMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlInputSource for ControlInputMapper {
    fn next_input(&mut self) -> Option<DroneMovementInput> {
        if !self.reading.load(Ordering::Relaxed) {
            return None;
        }
        Some(self.get_current_input())
    }
}
