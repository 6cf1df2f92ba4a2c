pub mod geodesy;
pub mod vectors;
