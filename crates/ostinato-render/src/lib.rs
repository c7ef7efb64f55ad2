//! # Ostinato Render
//!
//! Non-realtime rendering for the Ostinato command protocol.
//!
//! A [`RenderEngine`] implements the same [`Engine`](ostinato_core::Engine)
//! interface as the live engine, but writes every packet to a command file
//! instead of executing it. The file is a sequence of records, each a 4-byte
//! big-endian length followed by an OSC bundle or message. The last record
//! is a bundle at time zero holding the engine options, so an offline
//! renderer can replay the file without the program that produced it.
//!
//! ```ignore
//! use ostinato_render::render;
//!
//! let summary = render("out.osc", EngineOptions::default(), registry, |engine| {
//!     let mut req = engine.request();
//!     req.group(NodePlacement::tail(ROOT_GROUP))?;
//!     req.send()
//! })?;
//! assert_eq!(summary.records, 2);
//! ```

mod engine;
mod reader;

pub use engine::{render, RenderEngine, RenderSummary};
pub use reader::{CommandFile, Record};
