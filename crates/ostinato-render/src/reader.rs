//! Command file reader for offline replay.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use ostinato_core::protocol::{self, Element, Timestamp};
use ostinato_core::{Command, EngineOptions, Error, Result};

/// One length-prefixed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub payload: Vec<u8>,
}

impl Record {
    pub fn decode(&self) -> Result<Element> {
        protocol::decode(&self.payload)
    }

    /// Time tag of a bundle record; `None` for a bare message.
    pub fn timestamp(&self) -> Option<Timestamp> {
        protocol::peek_timestamp(&self.payload)
    }

    /// Decode every message of the record as a command.
    pub fn commands(&self) -> Result<Vec<Command>> {
        self.decode()?
            .messages()
            .into_iter()
            .map(Command::from_message)
            .collect()
    }

    /// Interpret the record as an options bundle.
    pub fn engine_options(&self) -> Result<EngineOptions> {
        let commands = self.commands()?;
        let mut values = Vec::with_capacity(commands.len());
        for command in &commands {
            match command {
                Command::EngineOption { key, value } => values.push((key.as_str(), value)),
                other => {
                    return Err(Error::InvalidCommand(format!(
                        "{} in options record",
                        other.address()
                    )))
                }
            }
        }
        EngineOptions::from_values(values)
    }
}

/// Iterator over the records of a command file.
pub struct CommandFile<R> {
    reader: R,
    done: bool,
}

impl CommandFile<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> CommandFile<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }

    /// Read every record.
    pub fn read_all(self) -> Result<Vec<Record>> {
        self.collect()
    }

    fn read_record(&mut self) -> Result<Option<Record>> {
        let mut header = [0u8; 4];
        let mut filled = 0;
        while filled < header.len() {
            match self.reader.read(&mut header[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        match filled {
            0 => return Ok(None),
            4 => {}
            _ => return Err(Error::TruncatedRecord),
        }

        // The header is untrusted; the buffer only grows with bytes read.
        let len = u32::from_be_bytes(header) as u64;
        let mut payload = Vec::new();
        let read = (&mut self.reader)
            .take(len)
            .read_to_end(&mut payload)
            .map_err(Error::Io)?;
        if read as u64 != len {
            return Err(Error::TruncatedRecord);
        }
        Ok(Some(Record { payload }))
    }
}

impl<R: Read> Iterator for CommandFile<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(payloads: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for p in payloads {
            out.extend_from_slice(&(p.len() as u32).to_be_bytes());
            out.extend_from_slice(p);
        }
        out
    }

    #[test]
    fn test_reads_framed_records() {
        let bytes = framed(&[b"abcd", b"", b"12345678"]);
        let records = CommandFile::new(&bytes[..]).read_all().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].payload, b"abcd");
        assert!(records[1].payload.is_empty());
        assert_eq!(records[2].payload.len(), 8);
    }

    #[test]
    fn test_truncated_records() {
        let mut bytes = framed(&[b"abcd"]);
        bytes.extend_from_slice(&[0, 0]);
        let mut file = CommandFile::new(&bytes[..]);
        assert!(file.next().unwrap().is_ok());
        assert!(matches!(file.next(), Some(Err(Error::TruncatedRecord))));
        assert!(file.next().is_none());

        // A corrupt header claiming 4 GiB.
        let mut huge = vec![0xff, 0xff, 0xff, 0xff];
        huge.extend_from_slice(b"abcd");
        assert!(matches!(
            CommandFile::new(&huge[..]).read_all(),
            Err(Error::TruncatedRecord)
        ));

        let mut short = framed(&[b"abcdefgh"]);
        short.truncate(8);
        assert!(matches!(
            CommandFile::new(&short[..]).read_all(),
            Err(Error::TruncatedRecord)
        ));
    }

    #[test]
    fn test_non_option_record_rejected() {
        let message = Command::NodeFree {
            node: ostinato_core::NodeId(3),
        }
        .to_message()
        .unwrap();
        let mut payload = Vec::new();
        protocol::encode(&Element::Message(message), &mut payload).unwrap();
        let record = Record { payload };

        assert_eq!(record.timestamp(), None);
        assert_eq!(record.commands().unwrap().len(), 1);
        assert!(record.engine_options().is_err());
    }
}
