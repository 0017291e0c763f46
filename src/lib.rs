pub mod application;
pub mod commands;
pub mod config;
pub mod error;
pub mod package;
pub mod process;
pub mod runtime;
pub mod vcs;
pub mod workspace;
