pub mod control_loops;
pub mod flight_controllers;
pub mod integrator;
pub mod pid;
