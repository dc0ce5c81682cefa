#![deny(warnings)]

pub mod audio;
pub mod camera;
pub mod config;
pub mod detector;
pub mod effects;
pub mod emotion;
pub mod overlay;
pub mod poller;
pub mod session;
pub mod speech;
