//! Request builder: commands grouped into (nested) timestamped bundles.
//!
//! Identifiers are allocated locally and returned right away; the remote
//! graph catches up once the packet executes. Arguments are validated
//! against the plugin registry and the node table before anything is
//! encoded, so a malformed command never reaches the engine.
//!
//! ```ignore
//! let now = engine.current_time();
//! let mut req = engine.request();
//! req.open_bundle(Timestamp::Immediate);
//! let synth = req.synth(uri, NodePlacement::tail(group), &[0.5], &[])?;
//! req.map_output(synth, 0, AudioBusId(0), BusMappingFlags::EXTERNAL)?;
//! req.close_bundle()?;
//! req.open_bundle(Timestamp::At(now + 0.1));
//! req.activate(synth)?;
//! req.close_bundle()?;
//! req.send()?;
//! ```

use crate::command::{BusMappingFlags, Command, NodePlacement};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::ids::{AudioBusId, GroupId, NodeId, ResourceId, SynthId};
use crate::node_ids::NodeKind;
use crate::protocol::{self, Bundle, Element, Time, Timestamp};
use crate::value::Value;

struct Ports {
    controls: usize,
    audio_inputs: u32,
    audio_outputs: u32,
}

/// One outgoing packet under construction.
///
/// Dropping a request without sending it rolls back the identifiers it
/// allocated.
pub struct Request<'a, E: Engine + ?Sized> {
    engine: &'a mut E,
    top: Vec<Element>,
    open: Vec<Bundle>,
    allocated: Vec<NodeId>,
    /// Freed nodes with the time their free executes (`None` = on arrival).
    freed: Vec<(NodeId, Option<Time>)>,
}

impl<'a, E: Engine + ?Sized> Request<'a, E> {
    pub fn new(engine: &'a mut E) -> Self {
        Self {
            engine,
            top: Vec::new(),
            open: Vec::new(),
            allocated: Vec::new(),
            freed: Vec::new(),
        }
    }

    pub fn open_bundle(&mut self, time: Timestamp) -> &mut Self {
        self.open.push(Bundle::new(time));
        self
    }

    pub fn close_bundle(&mut self) -> Result<&mut Self> {
        let bundle = self.open.pop().ok_or(Error::UnbalancedBundle)?;
        self.push_element(Element::Bundle(bundle));
        Ok(self)
    }

    /// Create a group.
    pub fn group(&mut self, placement: NodePlacement) -> Result<GroupId> {
        self.reclaim();
        let group = self.engine.node_ids().allocate_group(placement)?;
        self.allocated.push(group.id());
        self.push(Command::GroupNew { group, placement })?;
        Ok(group)
    }

    /// Create a synth. It stays silent until activated.
    pub fn synth(
        &mut self,
        uri: &str,
        placement: NodePlacement,
        controls: &[f32],
        options: &[Value],
    ) -> Result<SynthId> {
        {
            let factory = self.engine.plugins().get(uri)?;
            let expected = factory.definition().num_controls();
            if controls.len() != expected {
                return Err(Error::InvalidCommand(format!(
                    "{} takes {} controls, got {}",
                    uri,
                    expected,
                    controls.len()
                )));
            }
            factory.validate_options(options)?;
        }

        self.reclaim();
        let synth = self.engine.node_ids().allocate_synth(uri, placement)?;
        self.allocated.push(synth.id());
        self.push(Command::SynthNew {
            synth,
            uri: uri.to_string(),
            placement,
            controls: controls.to_vec(),
            options: options.to_vec(),
        })?;
        Ok(synth)
    }

    pub fn activate(&mut self, synth: SynthId) -> Result<()> {
        self.ports(synth)?;
        self.push(Command::SynthActivate { synth })
    }

    pub fn map_input(
        &mut self,
        synth: SynthId,
        index: u32,
        bus: AudioBusId,
        flags: BusMappingFlags,
    ) -> Result<()> {
        let ports = self.ports(synth)?;
        check_index("audio input", synth, index, ports.audio_inputs as usize)?;
        self.push(Command::SynthMapInput {
            synth,
            index,
            bus,
            flags,
        })
    }

    pub fn map_output(
        &mut self,
        synth: SynthId,
        index: u32,
        bus: AudioBusId,
        flags: BusMappingFlags,
    ) -> Result<()> {
        let ports = self.ports(synth)?;
        check_index("audio output", synth, index, ports.audio_outputs as usize)?;
        self.push(Command::SynthMapOutput {
            synth,
            index,
            bus,
            flags,
        })
    }

    /// Set control input `index` of a synth.
    pub fn set(&mut self, node: impl Into<NodeId>, index: u32, value: f32) -> Result<()> {
        let node = node.into();
        let ports = self.ports(SynthId(node))?;
        check_index("control", SynthId(node), index, ports.controls)?;
        self.push(Command::NodeSet { node, index, value })
    }

    /// Free a node (groups free their children). The identifier returns to
    /// the allocator once this request has been handed to the engine, or,
    /// inside a timestamped bundle, once the engine clock reaches that time.
    pub fn free(&mut self, node: impl Into<NodeId>) -> Result<()> {
        let node = node.into();
        let node_ids = self.engine.node_ids();
        if !node_ids.is_live(node)
            || node_ids.is_retiring(node)
            || self.freed.iter().any(|(n, _)| *n == node)
        {
            tracing::error!(node = node.0, "free of a node that is not live");
            return Err(Error::IdNotAllocated {
                kind: NodeId::KIND,
                id: node.0,
            });
        }
        self.push(Command::NodeFree { node })?;
        let at = self.scheduled_time();
        self.freed.push((node, at));
        Ok(())
    }

    /// Number of commands added so far.
    pub fn len(&self) -> usize {
        let open: usize = self.open.iter().map(|b| b.messages().len()).sum();
        let top: usize = self.top.iter().map(|e| e.messages().len()).sum();
        open + top
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encode and hand the packet to the engine.
    pub fn send(mut self) -> Result<()> {
        self.commit()
    }

    /// Send, then reuse the same engine binding for a follow-up request.
    pub fn send_and_continue(mut self) -> Result<Self> {
        self.commit()?;
        Ok(self)
    }

    fn commit(&mut self) -> Result<()> {
        if !self.open.is_empty() {
            return Err(Error::UnbalancedBundle);
        }
        let element = match self.top.len() {
            0 => return Err(Error::EmptyRequest),
            1 => self.top.remove(0),
            _ => Element::Bundle(Bundle {
                time: Timestamp::Immediate,
                elements: std::mem::take(&mut self.top),
            }),
        };

        let mut packet = self.engine.alloc_packet()?;
        let len = protocol::encode(&element, packet.buffer_mut())?;
        packet.check_size()?;
        self.engine.send_packet(packet)?;
        tracing::trace!(bytes = len, "request sent");

        // The packet is now irrevocably queued.
        self.top.clear();
        self.allocated.clear();
        let now = self.engine.current_time();
        for (node, at) in std::mem::take(&mut self.freed) {
            let node_ids = self.engine.node_ids();
            // Already gone if an ancestor group was freed first.
            if !node_ids.is_live(node) {
                continue;
            }
            match at {
                Some(time) if time > now => node_ids.retire(node, time)?,
                _ => {
                    node_ids.free(node)?;
                }
            }
        }
        Ok(())
    }

    /// Execution time of commands added now: the latest time tag among the
    /// open bundles.
    fn scheduled_time(&self) -> Option<Time> {
        self.open
            .iter()
            .filter_map(|bundle| match bundle.time {
                Timestamp::At(time) => Some(time),
                Timestamp::Immediate => None,
            })
            .reduce(f64::max)
    }

    fn reclaim(&mut self) {
        let now = self.engine.current_time();
        self.engine.node_ids().reclaim(now);
    }

    fn push(&mut self, command: Command) -> Result<()> {
        self.push_element(Element::Message(command.to_message()?));
        Ok(())
    }

    fn push_element(&mut self, element: Element) {
        match self.open.last_mut() {
            Some(bundle) => bundle.elements.push(element),
            None => self.top.push(element),
        }
    }

    fn ports(&mut self, synth: SynthId) -> Result<Ports> {
        let uri = match self.engine.node_ids().kind(synth.id()) {
            Some(NodeKind::Synth { uri }) => uri.clone(),
            Some(NodeKind::Group) => {
                return Err(Error::InvalidCommand(format!("node {} is not a synth", synth)))
            }
            None => {
                tracing::error!(node = synth.id().0, "command for a node that is not live");
                return Err(Error::UnknownNode(synth.id()));
            }
        };
        let def = self.engine.plugins().definition(&uri)?;
        Ok(Ports {
            controls: def.num_controls(),
            audio_inputs: def.audio_inputs,
            audio_outputs: def.audio_outputs,
        })
    }
}

fn check_index(what: &str, synth: SynthId, index: u32, count: usize) -> Result<()> {
    if (index as usize) < count {
        Ok(())
    } else {
        Err(Error::InvalidCommand(format!(
            "synth {} has {} {} ports, index {} out of range",
            synth, count, what, index
        )))
    }
}

impl<E: Engine + ?Sized> Drop for Request<'_, E> {
    fn drop(&mut self) {
        if self.allocated.is_empty() {
            return;
        }
        tracing::debug!(count = self.allocated.len(), "rolling back unsent allocations");
        let node_ids = self.engine.node_ids();
        for node in self.allocated.drain(..).rev() {
            if node_ids.is_live(node) {
                let _ = node_ids.free(node);
            }
        }
    }
}
