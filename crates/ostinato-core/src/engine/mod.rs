//! Engine capability interface.
//!
//! An engine allocates node identifiers and packets, and accepts finished
//! packets for execution. The live engine hands them to the real-time
//! [`CommandProcessor`]; the render engine (in `ostinato-render`) writes them
//! to a command file.

mod clock;
mod live;

pub use clock::SampleClock;
pub use live::{CommandProcessor, Dispatch, LiveEngine};

use crate::error::Result;
use crate::node_ids::NodeIdAllocator;
use crate::packet::Packet;
use crate::plugin::PluginRegistry;
use crate::protocol::Time;
use crate::request::Request;

pub trait Engine {
    fn node_ids(&mut self) -> &mut NodeIdAllocator;

    fn alloc_packet(&mut self) -> Result<Packet>;

    /// Take ownership of a finished packet. The engine releases it.
    fn send_packet(&mut self, packet: Packet) -> Result<()>;

    /// Transport time used for scheduling relative to "now".
    fn current_time(&self) -> Time;

    /// Registry consulted when validating requests.
    fn plugins(&self) -> &PluginRegistry;

    /// Start a new request against this engine.
    fn request(&mut self) -> Request<'_, Self>
    where
        Self: Sized,
    {
        Request::new(self)
    }
}
