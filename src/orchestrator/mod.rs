//! Application-level orchestration utilities.
//!
//! This module owns the command loop that turns UI actions into runner operations, and
//! post-run processing such as report assembly and JSON export. UI/CLI layers call into
//! this module to keep responsibilities separated.

mod controller;
mod post_process;

pub(crate) use controller::{run_controller, send_shutdown_beacon, UiCommand};
pub(crate) use post_process::{export_json, run_workflow, RunReport};
