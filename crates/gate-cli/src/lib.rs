//! # launch-gate
//!
//! Command line host for the launch gate: loads a configuration file, runs a
//! configuration's before-launch tasks and then the configuration itself.
//!
//! The binary plays the part of the IDE around `text-gate`: it supplies the
//! sequential pipeline, shows notifications and process output on the console
//! and stops the prerequisites it started once the main process is done.

#![warn(missing_docs)]

pub mod commands;
pub mod console;
pub mod logging;
pub mod signals;
pub mod supervisor;
