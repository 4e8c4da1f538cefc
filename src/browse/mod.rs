//! Line-oriented interactive browser.
//!
//! This module provides the `marquee browse` session:
//! - Main loop (`run`)
//! - Command parsing and dispatch
//! - Background task event processing
//! - Plain-text rendering of lists, search results and details
//!
//! # Module Structure
//!
//! - `loop_runner` - Main loop and shutdown handling
//! - `input` - Command parsing and dispatch
//! - `events` - Background task event processing
//! - `render` - Text rendering
//! - `helpers` - Shared utility functions

mod events;
mod helpers;
mod input;
mod loop_runner;
pub mod render;

pub(crate) use helpers::catch_task_panic;
pub use helpers::terminal_width as output_width;
pub use input::{parse_command, Command};
pub use loop_runner::{run, BrowseOptions};
