#![allow(unused_assignments)] // thiserror/miette proc macros trigger false positives

pub mod cli;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod logging;
pub mod net;
pub mod paths;
pub mod present;
pub mod qr;
pub mod session;
pub mod setup;
pub mod util;
