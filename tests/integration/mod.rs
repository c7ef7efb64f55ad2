//! Integration test modules for Ostinato
//!
//! Test categories:
//! - session: voice lifecycle as seen in the command stream
//! - render: command files, options record, logical time
//! - live: real-time processor scheduling and pool pressure

pub mod live;
pub mod render;
pub mod session;
