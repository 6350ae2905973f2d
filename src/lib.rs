//! gymlog - 12-week strength program tracker
//!
//! Imports the Essentials 4x/week worksheet into a program template, then
//! tracks runs of it: completed workouts, logged sets and history.

pub mod config;
pub mod db;
pub mod program;
pub mod rest;
pub mod session;
pub mod settings;
pub mod template;
pub mod tui;
pub mod video;

pub use db::Database;
