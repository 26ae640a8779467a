//! Updater Engine
//! Core logic for the self-update agent

pub mod cli;
pub mod config;
pub mod updater;
