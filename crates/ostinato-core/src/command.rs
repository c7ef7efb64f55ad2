//! Typed engine commands and their OSC message encoding.

use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::{AudioBusId, GroupId, NodeId, SynthId};
use crate::protocol::Message;
use crate::value::Value;

/// Message addresses understood by the engine.
pub mod address {
    pub const GROUP_NEW: &str = "/group/new";
    pub const SYNTH_NEW: &str = "/synth/new";
    pub const SYNTH_ACTIVATE: &str = "/synth/activate";
    pub const SYNTH_MAP_INPUT: &str = "/synth/map/input";
    pub const SYNTH_MAP_OUTPUT: &str = "/synth/map/output";
    pub const NODE_SET: &str = "/node/set";
    pub const NODE_FREE: &str = "/node/free";
    pub const ENGINE_OPTION: &str = "/engine/option";
}

/// Where a new node goes relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AddAction {
    HeadOfGroup,
    #[default]
    TailOfGroup,
    Before,
    After,
}

impl AddAction {
    pub fn code(self) -> i32 {
        match self {
            AddAction::HeadOfGroup => 0,
            AddAction::TailOfGroup => 1,
            AddAction::Before => 2,
            AddAction::After => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(AddAction::HeadOfGroup),
            1 => Some(AddAction::TailOfGroup),
            2 => Some(AddAction::Before),
            3 => Some(AddAction::After),
            _ => None,
        }
    }

    /// Whether the target is the parent group rather than a sibling.
    pub fn targets_group(self) -> bool {
        matches!(self, AddAction::HeadOfGroup | AddAction::TailOfGroup)
    }
}

/// Target node plus add action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePlacement {
    pub target: NodeId,
    pub action: AddAction,
}

impl NodePlacement {
    pub fn head(group: GroupId) -> Self {
        Self {
            target: group.id(),
            action: AddAction::HeadOfGroup,
        }
    }

    pub fn tail(group: GroupId) -> Self {
        Self {
            target: group.id(),
            action: AddAction::TailOfGroup,
        }
    }

    pub fn before(node: impl Into<NodeId>) -> Self {
        Self {
            target: node.into(),
            action: AddAction::Before,
        }
    }

    pub fn after(node: impl Into<NodeId>) -> Self {
        Self {
            target: node.into(),
            action: AddAction::After,
        }
    }
}

/// How a synth port connects to a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct BusMappingFlags(u32);

impl BusMappingFlags {
    pub const INTERNAL: Self = Self(0);
    pub const EXTERNAL: Self = Self(1);
    pub const FEEDBACK: Self = Self(2);
    pub const REPLACE: Self = Self(4);

    const ALL: u32 = 1 | 2 | 4;

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        (bits & !Self::ALL == 0).then_some(Self(bits))
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for BusMappingFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A single engine command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    GroupNew {
        group: GroupId,
        placement: NodePlacement,
    },
    SynthNew {
        synth: SynthId,
        uri: String,
        placement: NodePlacement,
        controls: Vec<f32>,
        options: Vec<Value>,
    },
    SynthActivate {
        synth: SynthId,
    },
    SynthMapInput {
        synth: SynthId,
        index: u32,
        bus: AudioBusId,
        flags: BusMappingFlags,
    },
    SynthMapOutput {
        synth: SynthId,
        index: u32,
        bus: AudioBusId,
        flags: BusMappingFlags,
    },
    NodeSet {
        node: NodeId,
        index: u32,
        value: f32,
    },
    NodeFree {
        node: NodeId,
    },
    EngineOption {
        key: String,
        value: Value,
    },
}

impl Command {
    pub fn address(&self) -> &'static str {
        match self {
            Command::GroupNew { .. } => address::GROUP_NEW,
            Command::SynthNew { .. } => address::SYNTH_NEW,
            Command::SynthActivate { .. } => address::SYNTH_ACTIVATE,
            Command::SynthMapInput { .. } => address::SYNTH_MAP_INPUT,
            Command::SynthMapOutput { .. } => address::SYNTH_MAP_OUTPUT,
            Command::NodeSet { .. } => address::NODE_SET,
            Command::NodeFree { .. } => address::NODE_FREE,
            Command::EngineOption { .. } => address::ENGINE_OPTION,
        }
    }

    /// Encode as a message. Integers above `i32::MAX` have no OSC
    /// representation and are rejected.
    pub fn to_message(&self) -> Result<Message> {
        let mut args: Vec<Value> = Vec::new();
        match self {
            Command::GroupNew { group, placement } => {
                args.push(int_arg(group.id().0)?);
                push_placement(&mut args, placement)?;
            }
            Command::SynthNew {
                synth,
                uri,
                placement,
                controls,
                options,
            } => {
                args.push(Value::String(uri.clone()));
                args.push(int_arg(synth.id().0)?);
                push_placement(&mut args, placement)?;
                args.push(int_arg(controls.len())?);
                args.extend(controls.iter().map(|c| Value::Float(*c)));
                args.extend(options.iter().cloned());
            }
            Command::SynthActivate { synth } => args.push(int_arg(synth.id().0)?),
            Command::SynthMapInput {
                synth,
                index,
                bus,
                flags,
            }
            | Command::SynthMapOutput {
                synth,
                index,
                bus,
                flags,
            } => {
                args.push(int_arg(synth.id().0)?);
                args.push(int_arg(*index)?);
                args.push(int_arg(bus.0)?);
                args.push(int_arg(flags.bits())?);
            }
            Command::NodeSet { node, index, value } => {
                args.push(int_arg(node.0)?);
                args.push(int_arg(*index)?);
                args.push(Value::Float(*value));
            }
            Command::NodeFree { node } => args.push(int_arg(node.0)?),
            Command::EngineOption { key, value } => {
                args.push(Value::String(key.clone()));
                args.push(value.clone());
            }
        }
        Ok(Message::new(self.address(), args))
    }

    pub fn from_message(message: &Message) -> Result<Self> {
        let mut args = Args::new(message);
        let command = match message.address.as_str() {
            address::GROUP_NEW => Command::GroupNew {
                group: GroupId(args.node()?),
                placement: args.placement()?,
            },
            address::SYNTH_NEW => {
                let uri = args.string()?;
                let synth = SynthId(args.node()?);
                let placement = args.placement()?;
                let count = args.index()?;
                let controls = (0..count)
                    .map(|_| args.float())
                    .collect::<Result<Vec<_>>>()?;
                let options = args.rest();
                Command::SynthNew {
                    synth,
                    uri,
                    placement,
                    controls,
                    options,
                }
            }
            address::SYNTH_ACTIVATE => Command::SynthActivate {
                synth: SynthId(args.node()?),
            },
            address::SYNTH_MAP_INPUT => Command::SynthMapInput {
                synth: SynthId(args.node()?),
                index: args.index()?,
                bus: AudioBusId(args.index()?),
                flags: args.flags()?,
            },
            address::SYNTH_MAP_OUTPUT => Command::SynthMapOutput {
                synth: SynthId(args.node()?),
                index: args.index()?,
                bus: AudioBusId(args.index()?),
                flags: args.flags()?,
            },
            address::NODE_SET => Command::NodeSet {
                node: args.node()?,
                index: args.index()?,
                value: args.float()?,
            },
            address::NODE_FREE => Command::NodeFree { node: args.node()? },
            address::ENGINE_OPTION => Command::EngineOption {
                key: args.string()?,
                value: args.value()?,
            },
            other => {
                return Err(Error::InvalidCommand(format!("unknown address {}", other)));
            }
        };
        args.finish()?;
        Ok(command)
    }
}

fn int_arg<T>(value: T) -> Result<Value>
where
    T: TryInto<i32> + Copy + std::fmt::Display,
{
    value
        .try_into()
        .map(Value::Int)
        .map_err(|_| Error::InvalidCommand(format!("{} does not fit an OSC int", value)))
}

fn push_placement(args: &mut Vec<Value>, placement: &NodePlacement) -> Result<()> {
    args.push(int_arg(placement.target.0)?);
    args.push(Value::Int(placement.action.code()));
    Ok(())
}

/// Cursor over a message's arguments.
struct Args<'a> {
    address: &'a str,
    args: &'a [Value],
    pos: usize,
}

impl<'a> Args<'a> {
    fn new(message: &'a Message) -> Self {
        Self {
            address: &message.address,
            args: &message.args,
            pos: 0,
        }
    }

    fn error(&self, expected: &str) -> Error {
        Error::InvalidCommand(format!(
            "{}: expected {} at argument {}",
            self.address, expected, self.pos
        ))
    }

    fn value(&mut self) -> Result<Value> {
        let value = self.args.get(self.pos).cloned().ok_or_else(|| self.error("value"))?;
        self.pos += 1;
        Ok(value)
    }

    fn int(&mut self) -> Result<i32> {
        match self.args.get(self.pos) {
            Some(Value::Int(i)) => {
                self.pos += 1;
                Ok(*i)
            }
            _ => Err(self.error("int")),
        }
    }

    fn index(&mut self) -> Result<u32> {
        let i = self.int()?;
        u32::try_from(i).map_err(|_| self.error("non-negative int"))
    }

    fn node(&mut self) -> Result<NodeId> {
        self.index().map(NodeId)
    }

    fn float(&mut self) -> Result<f32> {
        match self.args.get(self.pos) {
            Some(Value::Float(f)) => {
                self.pos += 1;
                Ok(*f)
            }
            _ => Err(self.error("float")),
        }
    }

    fn string(&mut self) -> Result<String> {
        match self.args.get(self.pos) {
            Some(Value::String(s)) => {
                self.pos += 1;
                Ok(s.clone())
            }
            _ => Err(self.error("string")),
        }
    }

    fn placement(&mut self) -> Result<NodePlacement> {
        let target = self.node()?;
        let code = self.int()?;
        let action = AddAction::from_code(code).ok_or_else(|| self.error("add action"))?;
        Ok(NodePlacement { target, action })
    }

    fn flags(&mut self) -> Result<BusMappingFlags> {
        let bits = self.index()?;
        BusMappingFlags::from_bits(bits).ok_or_else(|| self.error("bus mapping flags"))
    }

    fn rest(&mut self) -> Vec<Value> {
        let rest = self.args[self.pos..].to_vec();
        self.pos = self.args.len();
        rest
    }

    fn finish(&self) -> Result<()> {
        if self.pos == self.args.len() {
            Ok(())
        } else {
            Err(Error::InvalidCommand(format!(
                "{}: {} unexpected trailing arguments",
                self.address,
                self.args.len() - self.pos
            )))
        }
    }
}
