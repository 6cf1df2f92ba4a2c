pub mod controller;
pub mod protocol;
