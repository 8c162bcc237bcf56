pub mod controller;
pub mod poller;
pub mod recorder;
pub mod remote;
