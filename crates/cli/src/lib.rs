//! Command-line bridge from the FusionSolar portal to Home Assistant.

pub mod cli;
pub mod commands;
pub mod context;
pub mod display;
pub mod error;
pub mod logging;
pub mod poll;
pub mod publisher;
