pub mod beacon;
pub mod controller;
pub mod dispatcher;
pub mod link;
