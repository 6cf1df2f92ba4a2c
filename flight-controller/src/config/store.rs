use std::{
    fs::File,
    io::{self, BufReader, BufWriter, ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use shared_definitions::controller::PIDTuneConfig;

use crate::{control::flight_controllers::PidAxis, util::error::AppError};

use super::FlightControllerConfig;

const STORE_MAGIC: u16 = 0x4447;
const STORE_VERSION: u8 = 1;

#[derive(Default, Debug, Clone, PartialEq)]
pub struct AppStoredConfig {
    pub initialized: bool,
    pub gains: [PIDTuneConfig; PidAxis::COUNT],
}

impl AppStoredConfig {
    pub fn from_config(config: &FlightControllerConfig) -> Self {
        let mut stored = AppStoredConfig {
            initialized: true,
            ..Default::default()
        };
        for axis in PidAxis::ALL {
            let settings = config.pid_settings(axis);
            stored.gains[axis.index()] = PIDTuneConfig {
                proportional: settings.proportional,
                integral: settings.integral,
                derivative: settings.derivative,
                range_min: settings.range_min,
                range_max: settings.range_max,
            };
        }
        stored
    }

    pub fn gains(&self, axis: PidAxis) -> &PIDTuneConfig {
        &self.gains[axis.index()]
    }

    pub fn update_gains(&mut self, axis: PidAxis, proportional: f32, integral: f32, derivative: f32) {
        let gains = &mut self.gains[axis.index()];
        gains.proportional = proportional;
        gains.integral = integral;
        gains.derivative = derivative;
        self.initialized = true;
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<BigEndian>(STORE_MAGIC)?;
        writer.write_u8(STORE_VERSION)?;
        writer.write_u8(self.initialized as u8)?;
        for gains in self.gains.iter() {
            writer.write_f32::<BigEndian>(gains.proportional)?;
            writer.write_f32::<BigEndian>(gains.integral)?;
            writer.write_f32::<BigEndian>(gains.derivative)?;
            writer.write_f32::<BigEndian>(gains.range_min)?;
            writer.write_f32::<BigEndian>(gains.range_max)?;
        }
        Ok(())
    }

    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        if reader.read_u16::<BigEndian>()? != STORE_MAGIC {
            return Err(io::Error::new(ErrorKind::InvalidData, "not a gain store"));
        }
        if reader.read_u8()? != STORE_VERSION {
            return Err(io::Error::new(ErrorKind::InvalidData, "unsupported store version"));
        }
        let mut config = AppStoredConfig {
            initialized: reader.read_u8()? != 0,
            ..Default::default()
        };
        for gains in config.gains.iter_mut() {
            *gains = PIDTuneConfig {
                proportional: reader.read_f32::<BigEndian>()?,
                integral: reader.read_f32::<BigEndian>()?,
                derivative: reader.read_f32::<BigEndian>()?,
                range_min: reader.read_f32::<BigEndian>()?,
                range_max: reader.read_f32::<BigEndian>()?,
            };
        }
        Ok(config)
    }
}

/// Gains persisted across restarts in a small binary file.
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        ConfigStorage {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store_to_file(&self, config: &AppStoredConfig) -> Result<(), AppError<ErrorKind>> {
        let file = File::create(&self.path)
            .map_err(|error| AppError::new("Failed to open the config store", error.kind()))?;
        let mut writer = BufWriter::new(file);
        config
            .write_to(&mut writer)
            .and_then(|_| writer.flush())
            .map_err(|error| AppError::new("Failed to store the config", error.kind()))
    }

    /// A missing file is an uninitialized config, not an error.
    pub fn load_from_file(&self) -> Result<AppStoredConfig, AppError<ErrorKind>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Ok(AppStoredConfig::default())
            }
            Err(error) => return Err(AppError::new("Failed to open the config store", error.kind())),
        };
        let config = AppStoredConfig::read_from(&mut BufReader::new(file))
            .map_err(|error| AppError::new("Failed to load the config", error.kind()))?;
        if config.initialized {
            Ok(config)
        } else {
            Ok(AppStoredConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}-{}.bin", name, std::process::id()))
    }

    #[test]
    fn missing_file_loads_defaults() {
        let storage = ConfigStorage::new(scratch_path("missing-gain-store"));
        let loaded = storage.load_from_file().unwrap();
        assert!(!loaded.initialized);
    }

    #[test]
    fn stored_gains_load_back() {
        let path = scratch_path("stored-gain-store");
        let storage = ConfigStorage::new(&path);
        let mut config = AppStoredConfig::from_config(&FlightControllerConfig::default());
        config.update_gains(PidAxis::PitchRate, 0.4, 1.6, 0.03);
        storage.store_to_file(&config).unwrap();

        let loaded = storage.load_from_file().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.gains(PidAxis::PitchRate).integral, 1.6);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn foreign_file_is_rejected() {
        let path = scratch_path("foreign-gain-store");
        std::fs::write(&path, b"not gains").unwrap();
        let error = ConfigStorage::new(&path).load_from_file().unwrap_err();
        assert_eq!(error.error, ErrorKind::InvalidData);
        let _ = std::fs::remove_file(path);
    }
}
