//! Tutor Service Library Crate
//!
//! Wires the question/answer session from `tutor-core` to a local GPT-2
//! model and the platform's speech program. The `tutor` binary is a thin
//! wrapper that parses flags, sets up logging and calls [`app::run`].

pub mod app;
pub mod config;
pub mod provider;
