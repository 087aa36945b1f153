//! yomiage library crate
//!
//! Japanese text to speech with a cloud backend, a local speech engine
//! fallback and one playback controller in front of both.
//! The demo binary is in main.rs.

#[macro_use]
extern crate log;

pub mod artifact;
pub mod buffer;
pub mod config;
pub mod constants;
pub mod download;
pub mod error;
pub mod event;
pub mod generation;
pub mod input;
pub mod output;
pub mod playback;
pub mod recent;
pub mod script;
pub mod sources;
pub mod stdin;
pub mod storage;
pub mod synth;

pub use error::{Error, Result};

#[cfg(test)]
mod event_tests;
#[cfg(test)]
mod recent_tests;
#[cfg(test)]
mod stdin_tests;
