//! Render engine: writes every packet to a command file for offline
//! execution.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ostinato_core::protocol::{self, Bundle, Element, Time, Timestamp};
use ostinato_core::{
    Engine, EngineOptions, Error, NodeIdAllocator, Packet, PacketPool, PluginRegistry, Result,
};

/// Outcome of a finished render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub path: Option<PathBuf>,
    /// Records written, including the trailing options bundle.
    pub records: usize,
    /// Bytes written, including length prefixes.
    pub bytes: u64,
    /// Logical time reached by the render timeline.
    pub end_time: Time,
}

/// Engine that records packets instead of executing them.
///
/// Each packet becomes one record: a 4-byte big-endian length followed by
/// the payload. [`RenderEngine::finish`] appends the engine options as a
/// bundle at time zero so the file can be replayed on its own.
pub struct RenderEngine {
    path: Option<PathBuf>,
    writer: Box<dyn Write + Send>,
    options: EngineOptions,
    node_ids: NodeIdAllocator,
    pool: PacketPool,
    plugins: PluginRegistry,
    time: Time,
    records: usize,
    bytes: u64,
    failed: bool,
    finished: bool,
}

impl RenderEngine {
    /// Create the command file. Fails with [`Error::FileOpen`] if it cannot
    /// be created.
    pub fn create(
        path: impl AsRef<Path>,
        options: EngineOptions,
        plugins: PluginRegistry,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let mut engine = Self::with_writer(BufWriter::new(file), options, plugins)?;
        engine.path = Some(path.to_path_buf());
        tracing::info!(path = %path.display(), "render started");
        Ok(engine)
    }

    /// Render into an arbitrary sink.
    pub fn with_writer(
        writer: impl Write + Send + 'static,
        options: EngineOptions,
        plugins: PluginRegistry,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            path: None,
            writer: Box::new(writer),
            node_ids: options.node_id_allocator(),
            pool: options.packet_pool(),
            options,
            plugins,
            time: 0.0,
            records: 0,
            bytes: 0,
            failed: false,
            finished: false,
        })
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Move the logical timeline to `time` seconds.
    pub fn set_time(&mut self, time: Time) {
        self.time = time.max(0.0);
    }

    /// Move the logical timeline forward by `seconds`.
    pub fn advance(&mut self, seconds: Time) {
        self.set_time(self.time + seconds);
    }

    /// Records written so far.
    pub fn records_written(&self) -> usize {
        self.records
    }

    pub fn is_aborted(&self) -> bool {
        self.failed
    }

    /// Append the options bundle and flush.
    pub fn finish(mut self) -> Result<RenderSummary> {
        let mut bundle = Bundle::new(Timestamp::At(0.0));
        for command in self.options.to_commands()? {
            bundle.elements.push(Element::Message(command.to_message()?));
        }
        let mut payload = Vec::new();
        protocol::encode(&Element::Bundle(bundle), &mut payload)?;
        self.write_record(&payload)?;

        if let Err(e) = self.writer.flush() {
            self.failed = true;
            tracing::error!(error = %e, "command file flush failed");
            return Err(Error::Io(e));
        }
        self.finished = true;

        let summary = RenderSummary {
            path: self.path.clone(),
            records: self.records,
            bytes: self.bytes,
            end_time: self.time,
        };
        tracing::info!(
            records = summary.records,
            bytes = summary.bytes,
            end_time = summary.end_time,
            "render finished"
        );
        Ok(summary)
    }

    fn write_record(&mut self, payload: &[u8]) -> Result<()> {
        if self.failed {
            return Err(Error::RenderAborted);
        }
        let len = u32::try_from(payload.len())
            .map_err(|_| Error::InvalidCommand(format!("record of {} bytes", payload.len())))?;

        let result = self
            .writer
            .write_all(&len.to_be_bytes())
            .and_then(|()| self.writer.write_all(payload));
        if let Err(e) = result {
            // The file is corrupt from here on.
            self.failed = true;
            tracing::error!(error = %e, records = self.records, "command file write failed, render aborted");
            return Err(Error::Io(e));
        }

        self.records += 1;
        self.bytes += 4 + payload.len() as u64;
        Ok(())
    }
}

impl Engine for RenderEngine {
    fn node_ids(&mut self) -> &mut NodeIdAllocator {
        &mut self.node_ids
    }

    fn alloc_packet(&mut self) -> Result<Packet> {
        self.pool.allocate()
    }

    fn send_packet(&mut self, packet: Packet) -> Result<()> {
        self.write_record(packet.as_bytes())
    }

    fn current_time(&self) -> Time {
        self.time
    }

    fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }
}

impl Drop for RenderEngine {
    fn drop(&mut self) {
        if !self.finished && !self.failed {
            tracing::warn!(
                records = self.records,
                "render engine dropped before finish, options record missing"
            );
        }
    }
}

/// Create a command file, let `f` issue commands, then finish it.
pub fn render<F>(
    path: impl AsRef<Path>,
    options: EngineOptions,
    plugins: PluginRegistry,
    f: F,
) -> Result<RenderSummary>
where
    F: FnOnce(&mut RenderEngine) -> Result<()>,
{
    let mut engine = RenderEngine::create(path, options, plugins)?;
    f(&mut engine)?;
    engine.finish()
}
