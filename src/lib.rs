//! Small personal time tracker. Projects are created by name, a single timer runs against one
//! project at a time and reports break the tracked time down per project over today, this week
//! or this month.
//!

pub mod cli;
pub mod engine;
pub mod storage;
pub mod timer;
pub mod utils;
