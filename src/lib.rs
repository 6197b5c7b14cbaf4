#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms, missing_debug_implementations)]
#![allow(
    clippy::multiple_crate_versions,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

//! Rings once when each class in a weekly schedule ends.

pub mod advice;
/// the ringing/idle state machine
pub mod alarm;
pub mod audio;
pub mod class;
pub mod clock;
pub mod communication;
pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod notify;
pub mod store;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
