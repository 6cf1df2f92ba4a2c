use std::sync::{
    atomic::{AtomicBool, AtomicI16, AtomicI32, AtomicU16, AtomicU32, AtomicU8, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use shared_definitions::protocol::messages::{
    Batteries, Battery, DroneState, Location, Orientation, MAX_BATTERY_COUNT, MAX_CELL_COUNT,
    MAX_MOTOR_COUNT,
};

use crate::{control::flight_controllers::FlightController, util::math::vectors::RotationVector3D};

pub type SharedFlightController<M> = Arc<Mutex<FlightController<M>>>;

/// Locks a shared value, a panicked holder does not take the aircraft down with it.
pub fn lock_shared<T>(shared: &Mutex<T>) -> MutexGuard<'_, T> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct AtomicF32(AtomicU32);
impl AtomicF32 {
    pub const fn new(val: f32) -> Self {
        Self(AtomicU32::new(val.to_bits()))
    }
    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.0.load(order))
    }
    pub fn store(&self, val: f32, order: Ordering) {
        self.0.store(val.to_bits(), order)
    }
}

pub struct AtomicRotationVector3D {
    roll: AtomicI32,
    pitch: AtomicI32,
    yaw: AtomicI32,
}

/// Hundredths, clamped to the i32 range.
fn to_centi(value: f32) -> i32 {
    (value * 100.0).clamp(i32::MIN as f32, i32::MAX as f32) as i32
}

impl AtomicRotationVector3D {
    pub const fn new() -> Self {
        Self {
            roll: AtomicI32::new(0),
            pitch: AtomicI32::new(0),
            yaw: AtomicI32::new(0),
        }
    }
    /// Keeps two decimals.
    pub fn store(&self, vector: RotationVector3D) {
        self.roll.store(to_centi(vector.roll), Ordering::Relaxed);
        self.pitch.store(to_centi(vector.pitch), Ordering::Relaxed);
        self.yaw.store(to_centi(vector.yaw), Ordering::Relaxed);
    }
    pub fn read(&self) -> RotationVector3D {
        RotationVector3D {
            roll: self.roll.load(Ordering::Relaxed) as f32 / 100.0,
            pitch: self.pitch.load(Ordering::Relaxed) as f32 / 100.0,
            yaw: self.yaw.load(Ordering::Relaxed) as f32 / 100.0,
        }
    }
}

#[allow(clippy::declare_interior_mutable_const)]
const ZERO_U8: AtomicU8 = AtomicU8::new(0);
#[allow(clippy::declare_interior_mutable_const)]
const ZERO_I16: AtomicI16 = AtomicI16::new(0);
#[allow(clippy::declare_interior_mutable_const)]
const ZERO_I32: AtomicI32 = AtomicI32::new(0);
#[allow(clippy::declare_interior_mutable_const)]
const ZERO_U16: AtomicU16 = AtomicU16::new(0);

/// Wire view of the last DroneState. Fields are stored one by one, a reader may see
/// two consecutive ticks mixed, which is fine for telemetry.
pub struct AtomicDroneState {
    is_armed: AtomicU8,
    orientation: [AtomicI16; 6],
    position_valid: AtomicU8,
    position: [AtomicI32; 4],
    motors: [AtomicU16; MAX_MOTOR_COUNT],
    battery_count: AtomicU8,
    cell_counts: [AtomicU8; MAX_BATTERY_COUNT],
    cell_levels: [AtomicU16; MAX_BATTERY_COUNT * MAX_CELL_COUNT],
}

impl AtomicDroneState {
    pub const fn new() -> Self {
        Self {
            is_armed: AtomicU8::new(0),
            orientation: [ZERO_I16; 6],
            position_valid: AtomicU8::new(0),
            position: [ZERO_I32; 4],
            motors: [ZERO_U16; MAX_MOTOR_COUNT],
            battery_count: AtomicU8::new(0),
            cell_counts: [ZERO_U8; MAX_BATTERY_COUNT],
            cell_levels: [ZERO_U16; MAX_BATTERY_COUNT * MAX_CELL_COUNT],
        }
    }

    pub fn store(&self, state: &DroneState) {
        self.is_armed.store(state.is_armed, Ordering::Relaxed);

        let orientation = &state.orientation;
        let angles = [
            orientation.roll,
            orientation.pitch,
            orientation.yaw,
            orientation.roll_rate,
            orientation.pitch_rate,
            orientation.yaw_rate,
        ];
        for (slot, value) in self.orientation.iter().zip(angles) {
            slot.store(value, Ordering::Relaxed);
        }

        let position = &state.position;
        self.position_valid
            .store(position.is_valid, Ordering::Relaxed);
        let coordinates = [
            position.latitude,
            position.longitude,
            position.altitude,
            position.height,
        ];
        for (slot, value) in self.position.iter().zip(coordinates) {
            slot.store(value, Ordering::Relaxed);
        }

        for (slot, value) in self.motors.iter().zip(state.motors) {
            slot.store(value, Ordering::Relaxed);
        }

        self.battery_count
            .store(state.batteries.count, Ordering::Relaxed);
        for (index, battery) in state.batteries.battery.iter().enumerate() {
            self.cell_counts[index].store(battery.cell_count, Ordering::Relaxed);
            for (cell, level) in battery.cell_levels.iter().enumerate() {
                self.cell_levels[index * MAX_CELL_COUNT + cell].store(*level, Ordering::Relaxed);
            }
        }
    }

    pub fn load(&self) -> DroneState {
        let angle = |index: usize| self.orientation[index].load(Ordering::Relaxed);
        let coordinate = |index: usize| self.position[index].load(Ordering::Relaxed);

        let mut batteries = Batteries {
            count: self.battery_count.load(Ordering::Relaxed),
            ..Default::default()
        };
        for (index, battery) in batteries.battery.iter_mut().enumerate() {
            *battery = Battery {
                cell_count: self.cell_counts[index].load(Ordering::Relaxed),
                cell_levels: core::array::from_fn(|cell| {
                    self.cell_levels[index * MAX_CELL_COUNT + cell].load(Ordering::Relaxed)
                }),
            };
        }

        DroneState {
            is_armed: self.is_armed.load(Ordering::Relaxed),
            orientation: Orientation {
                roll: angle(0),
                pitch: angle(1),
                yaw: angle(2),
                roll_rate: angle(3),
                pitch_rate: angle(4),
                yaw_rate: angle(5),
            },
            position: Location {
                is_valid: self.position_valid.load(Ordering::Relaxed),
                latitude: coordinate(0),
                longitude: coordinate(1),
                altitude: coordinate(2),
                height: coordinate(3),
            },
            motors: core::array::from_fn(|index| self.motors[index].load(Ordering::Relaxed)),
            batteries,
        }
    }
}

/// Lock-free snapshot written by the control tick and read by the telemetry path.
pub struct AtomicTelemetry {
    pub loop_exec_time_us: AtomicU32,
    pub rotation_rate: AtomicRotationVector3D,
    pub throttle: AtomicF32,
    pub critical_angle: AtomicBool,
    pub battery_voltage: AtomicF32,
    pub drone_state: AtomicDroneState,
}

impl AtomicTelemetry {
    pub const fn new() -> Self {
        AtomicTelemetry {
            loop_exec_time_us: AtomicU32::new(0),
            rotation_rate: AtomicRotationVector3D::new(),
            throttle: AtomicF32::new(0.0),
            critical_angle: AtomicBool::new(false),
            battery_voltage: AtomicF32::new(0.0),
            drone_state: AtomicDroneState::new(),
        }
    }
}

impl Default for AtomicTelemetry {
    fn default() -> Self {
        Self::new()
    }
}
