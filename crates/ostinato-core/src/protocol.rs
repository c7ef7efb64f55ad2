//! OSC wire format for messages and (nested) bundles.
//!
//! Encoding and decoding go through `rosc`. Arguments are restricted to
//! string, 32-bit int and 32-bit float; anything else is rejected while
//! decoding so it never reaches the engine.

use std::ops::Range;

use rosc::{OscBundle, OscMessage, OscPacket, OscTime};

use crate::error::{Error, Result};
use crate::value::Value;

/// Seconds on the engine timeline.
pub type Time = f64;

const BUNDLE_TAG: &[u8; 8] = b"#bundle\0";
const FRACTION_SCALE: f64 = 4_294_967_296.0;

/// Resolution of an encoded time tag, in seconds.
pub const TIME_TAG_QUANTUM: Time = 1.0 / FRACTION_SCALE;

/// Execution time of a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Timestamp {
    /// Execute on arrival.
    #[default]
    Immediate,
    /// Execute no earlier than the given time.
    At(Time),
}

impl Timestamp {
    /// Time tag `(0, 1)` is the OSC "immediately" sentinel.
    pub fn to_osc(self) -> OscTime {
        match self {
            Timestamp::Immediate => OscTime {
                seconds: 0,
                fractional: 1,
            },
            Timestamp::At(time) => {
                let time = time.max(0.0);
                let whole = time.floor();
                let seconds = whole.min(u32::MAX as f64) as u32;
                let mut fractional = ((time - whole) * FRACTION_SCALE) as u64;
                // (0, 1) is reserved for Immediate.
                if seconds == 0 && fractional == 1 {
                    fractional = 2;
                }
                OscTime {
                    seconds,
                    fractional: fractional.min(u32::MAX as u64) as u32,
                }
            }
        }
    }

    pub fn from_osc(time: OscTime) -> Self {
        Self::from_parts(time.seconds, time.fractional)
    }

    fn from_parts(seconds: u32, fractional: u32) -> Self {
        if seconds == 0 && fractional == 1 {
            Timestamp::Immediate
        } else {
            Timestamp::At(seconds as f64 + fractional as f64 / FRACTION_SCALE)
        }
    }

    /// The later of two times; `Immediate` is earlier than any `At`.
    pub fn later(self, other: Timestamp) -> Timestamp {
        match (self, other) {
            (Timestamp::Immediate, t) | (t, Timestamp::Immediate) => t,
            (Timestamp::At(a), Timestamp::At(b)) => Timestamp::At(a.max(b)),
        }
    }

    /// Whether a bundle with this timestamp may run at `now`.
    pub fn is_due(self, now: Time) -> bool {
        match self {
            Timestamp::Immediate => true,
            Timestamp::At(t) => t <= now,
        }
    }
}

/// Address path plus typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub address: String,
    pub args: Vec<Value>,
}

impl Message {
    pub fn new(address: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// OSC type tag string without the leading comma.
    pub fn type_tags(&self) -> String {
        self.args.iter().map(Value::type_tag).collect()
    }
}

/// Messages and bundles executed together at one time.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub time: Timestamp,
    pub elements: Vec<Element>,
}

impl Bundle {
    pub fn new(time: Timestamp) -> Self {
        Self {
            time,
            elements: Vec::new(),
        }
    }

    /// All messages in depth-first order.
    pub fn messages(&self) -> Vec<&Message> {
        let mut out = Vec::new();
        for element in &self.elements {
            element.collect_messages(&mut out);
        }
        out
    }
}

/// Top-level content of a packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Message(Message),
    Bundle(Bundle),
}

impl Element {
    pub fn messages(&self) -> Vec<&Message> {
        let mut out = Vec::new();
        self.collect_messages(&mut out);
        out
    }

    fn collect_messages<'a>(&'a self, out: &mut Vec<&'a Message>) {
        match self {
            Element::Message(m) => out.push(m),
            Element::Bundle(b) => {
                for element in &b.elements {
                    element.collect_messages(out);
                }
            }
        }
    }

    fn to_osc(&self) -> OscPacket {
        match self {
            Element::Message(m) => OscPacket::Message(OscMessage {
                addr: m.address.clone(),
                args: m.args.iter().cloned().map(Into::into).collect(),
            }),
            Element::Bundle(b) => OscPacket::Bundle(OscBundle {
                timetag: b.time.to_osc(),
                content: b.elements.iter().map(Element::to_osc).collect(),
            }),
        }
    }

    fn from_osc(packet: OscPacket) -> Result<Self> {
        match packet {
            OscPacket::Message(m) => {
                let addr = m.addr;
                let args = m
                    .args
                    .into_iter()
                    .map(|arg| {
                        let tag = format!("{:?}", arg);
                        Value::from_osc(arg).ok_or_else(|| {
                            Error::Decode(format!("{}: unsupported argument {}", addr, tag))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Element::Message(Message::new(addr, args)))
            }
            OscPacket::Bundle(b) => Ok(Element::Bundle(Bundle {
                time: Timestamp::from_osc(b.timetag),
                elements: b
                    .content
                    .into_iter()
                    .map(Element::from_osc)
                    .collect::<Result<Vec<_>>>()?,
            })),
        }
    }
}

impl From<Message> for Element {
    fn from(m: Message) -> Self {
        Element::Message(m)
    }
}

impl From<Bundle> for Element {
    fn from(b: Bundle) -> Self {
        Element::Bundle(b)
    }
}

/// Append the encoding of `element` to `out`, returning the encoded length.
pub fn encode(element: &Element, out: &mut Vec<u8>) -> Result<usize> {
    let bytes = rosc::encoder::encode(&element.to_osc())?;
    out.extend_from_slice(&bytes);
    Ok(bytes.len())
}

pub fn decode(bytes: &[u8]) -> Result<Element> {
    let (rest, packet) = rosc::decoder::decode_udp(bytes)?;
    if !rest.is_empty() {
        return Err(Error::Decode(format!("{} trailing bytes", rest.len())));
    }
    Element::from_osc(packet)
}

/// Read the time tag of an encoded bundle without decoding it.
///
/// Returns `None` for messages. Does not allocate.
pub fn peek_timestamp(bytes: &[u8]) -> Option<Timestamp> {
    if bytes.len() < 16 || &bytes[..8] != BUNDLE_TAG {
        return None;
    }
    let seconds = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let fractional = u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
    Some(Timestamp::from_parts(seconds, fractional))
}

/// Locate the first message of an encoded packet that starts at or after
/// byte `from`.
///
/// Returns the message's byte range and its execution time: the latest time
/// tag among its enclosing bundles. `None` once no message is left or the
/// framing is malformed. Does not allocate.
pub fn next_message(bytes: &[u8], from: usize) -> Option<(Range<usize>, Timestamp)> {
    find_message(bytes, 0..bytes.len(), Timestamp::Immediate, from)
}

fn find_message(
    bytes: &[u8],
    span: Range<usize>,
    time: Timestamp,
    from: usize,
) -> Option<(Range<usize>, Timestamp)> {
    let is_bundle =
        span.len() >= 16 && &bytes[span.start..span.start + 8] == BUNDLE_TAG.as_slice();
    if !is_bundle {
        return (span.start >= from && !span.is_empty()).then_some((span, time));
    }

    let time = peek_timestamp(&bytes[span.start..span.end])
        .map_or(time, |own| time.later(own));
    let mut pos = span.start + 16;
    while pos + 4 <= span.end {
        let size = u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]]);
        let start = pos + 4;
        let end = start.checked_add(size as usize)?;
        if end > span.end {
            return None;
        }
        if end > from {
            if let Some(found) = find_message(bytes, start..end, time, from) {
                return Some(found);
            }
        }
        pos = end;
    }
    None
}
