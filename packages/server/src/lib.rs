// YouTube Title Doctor - server core
//
// Accepts a channel name and an email address, then runs an event-driven
// pipeline (resolve channel, list recent uploads, improve titles, email the
// report). Each step is a seesaw effect reacting to the previous step's event.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
