//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::{Error, Result};
use crate::ids::{AudioBusId, IdAllocator};
use crate::node_ids::NodeIdAllocator;
use crate::packet::{PacketPool, DEFAULT_PACKET_COUNT, DEFAULT_PACKET_SIZE};
use crate::value::Value;

/// Option keys as written to the options bundle.
pub mod keys {
    pub const SAMPLE_RATE: &str = "sample-rate";
    pub const BLOCK_SIZE: &str = "block-size";
    pub const MAX_NUM_NODES: &str = "max-num-nodes";
    pub const MAX_NUM_AUDIO_BUSES: &str = "max-num-audio-buses";
    pub const REALTIME_MEMORY_SIZE: &str = "realtime-memory-size";
    pub const PACKET_COUNT: &str = "packet-count";
    pub const PACKET_SIZE: &str = "packet-size";
    pub const PLUGIN_LIBRARY: &str = "plugin-library";
}

/// Engine options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub sample_rate: u32,
    pub block_size: u32,
    /// Node identifiers are `[1, max_num_nodes - 1]`; 0 is the root group.
    pub max_num_nodes: u32,
    pub max_num_audio_buses: u32,
    pub realtime_memory_size: u32,
    /// Packets in flight between control and audio context.
    pub packet_count: u32,
    /// Maximum size of one encoded packet in bytes.
    pub packet_size: u32,
    pub plugin_libraries: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            block_size: 512,
            max_num_nodes: 1024,
            max_num_audio_buses: 128,
            realtime_memory_size: 1024 * 1024,
            packet_count: DEFAULT_PACKET_COUNT as u32,
            packet_size: DEFAULT_PACKET_SIZE as u32,
            plugin_libraries: Vec::new(),
        }
    }
}

impl EngineOptions {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidCommand("sample rate must be positive".into()));
        }
        if self.max_num_nodes < 2 {
            return Err(Error::InvalidCommand(
                "max_num_nodes must leave room beside the root group".into(),
            ));
        }
        if self.max_num_audio_buses == 0 || self.packet_count == 0 || self.packet_size == 0 {
            return Err(Error::InvalidCommand(
                "bus count and packet pool sizes must be positive".into(),
            ));
        }
        // Options travel as OSC ints in the command file.
        for (key, value) in self.int_values() {
            if i32::try_from(value).is_err() {
                return Err(Error::InvalidCommand(format!(
                    "option {} = {} exceeds {}",
                    key,
                    value,
                    i32::MAX
                )));
            }
        }
        Ok(())
    }

    pub fn node_id_allocator(&self) -> NodeIdAllocator {
        NodeIdAllocator::new(1, self.max_num_nodes.saturating_sub(1).max(1))
    }

    pub fn audio_bus_allocator(&self) -> IdAllocator<AudioBusId> {
        IdAllocator::new(0, self.max_num_audio_buses.max(1) - 1)
    }

    pub fn packet_pool(&self) -> PacketPool {
        PacketPool::new(self.packet_count as usize, self.packet_size as usize)
    }

    /// Typed key/value pairs describing these options.
    ///
    /// Fails for an integer option above `i32::MAX`.
    pub fn to_values(&self) -> Result<Vec<(&'static str, Value)>> {
        let mut values = self
            .int_values()
            .into_iter()
            .map(|(key, value)| Ok((key, Value::try_from(value)?)))
            .collect::<Result<Vec<_>>>()?;
        values.extend(
            self.plugin_libraries
                .iter()
                .map(|lib| (keys::PLUGIN_LIBRARY, Value::from(lib.as_str()))),
        );
        Ok(values)
    }

    pub fn to_commands(&self) -> Result<Vec<Command>> {
        Ok(self
            .to_values()?
            .into_iter()
            .map(|(key, value)| Command::EngineOption {
                key: key.to_string(),
                value,
            })
            .collect())
    }

    fn int_values(&self) -> [(&'static str, u32); 7] {
        [
            (keys::SAMPLE_RATE, self.sample_rate),
            (keys::BLOCK_SIZE, self.block_size),
            (keys::MAX_NUM_NODES, self.max_num_nodes),
            (keys::MAX_NUM_AUDIO_BUSES, self.max_num_audio_buses),
            (keys::REALTIME_MEMORY_SIZE, self.realtime_memory_size),
            (keys::PACKET_COUNT, self.packet_count),
            (keys::PACKET_SIZE, self.packet_size),
        ]
    }

    /// Rebuild options from key/value pairs. Unknown keys are ignored with a
    /// warning; missing keys keep their defaults.
    pub fn from_values<'a>(values: impl IntoIterator<Item = (&'a str, &'a Value)>) -> Result<Self> {
        let mut options = Self {
            plugin_libraries: Vec::new(),
            ..Self::default()
        };
        for (key, value) in values {
            let int = || {
                value
                    .as_i32()
                    .and_then(|i| u32::try_from(i).ok())
                    .ok_or_else(|| Error::InvalidCommand(format!("option {}: bad value {}", key, value)))
            };
            match key {
                keys::SAMPLE_RATE => options.sample_rate = int()?,
                keys::BLOCK_SIZE => options.block_size = int()?,
                keys::MAX_NUM_NODES => options.max_num_nodes = int()?,
                keys::MAX_NUM_AUDIO_BUSES => options.max_num_audio_buses = int()?,
                keys::REALTIME_MEMORY_SIZE => options.realtime_memory_size = int()?,
                keys::PACKET_COUNT => options.packet_count = int()?,
                keys::PACKET_SIZE => options.packet_size = int()?,
                keys::PLUGIN_LIBRARY => match value.as_str() {
                    Some(lib) => options.plugin_libraries.push(lib.to_string()),
                    None => {
                        return Err(Error::InvalidCommand(format!(
                            "option {}: expected string",
                            key
                        )))
                    }
                },
                other => tracing::warn!(key = other, "ignoring unknown engine option"),
            }
        }
        Ok(options)
    }
}
