pub use crate::util::math::geodesy::GpsLocation;

pub trait GpsSensor {
    fn location(&mut self) -> GpsLocation;
}
