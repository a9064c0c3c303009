//! Native file stream nodes
//!
//! `nfile-read` and `nfile-write` drive a [`NativeFile`] state machine that
//! holds at most one open handle. Opening always drops the previous handle
//! first; `close` and instance teardown release it.
//!
//! Every successful command except `read` emits a pulse on `done`. A read
//! reports completion through `data` instead, and emits nothing at all when
//! no bytes are available.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use node_engine::{
    ActorNode, CommandMachine, EngineConfig, ExecutionContext, Message, NodeDescriptor,
    NodeError, NodeFactory, NodeInstance, Result, Value, ERROR_PORT,
};

use crate::payload::Payload;

pub const READ_NODE_TYPE: &str = "nfile-read";
pub const WRITE_NODE_TYPE: &str = "nfile-write";

pub const PORT_OPEN: &str = "open";
pub const PORT_READ: &str = "read";
pub const PORT_WRITE: &str = "write";
pub const PORT_SKIP: &str = "skip";
pub const PORT_SEEK: &str = "seek";
pub const PORT_CLOSE: &str = "close";
pub const PORT_DATA: &str = "data";
pub const PORT_DONE: &str = "done";

/// Commands accepted by [`NativeFile`]
#[derive(Debug)]
pub enum FileCommand {
    OpenRead(PathBuf),
    OpenWrite(PathBuf),
    /// Read up to `count` bytes (everything available if `count <= 0`),
    /// optionally seeking to the absolute `offset` first
    Read {
        count: i64,
        offset: Option<u64>,
    },
    Write {
        payload: Payload,
        offset: Option<u64>,
    },
    SkipRead(i64),
    SkipWrite(i64),
    SeekRead(u64),
    SeekWrite(u64),
    Close,
}

enum FileState {
    Closed,
    Reading(File),
    Writing(File),
}

/// Observable phase of a [`NativeFile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Closed,
    Reading,
    Writing,
}

/// Sequential binary file handle
pub struct NativeFile {
    state: FileState,
    config: EngineConfig,
}

impl NativeFile {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: FileState::Closed,
            config: config.clone(),
        }
    }

    pub fn mode(&self) -> FileMode {
        match self.state {
            FileState::Closed => FileMode::Closed,
            FileState::Reading(_) => FileMode::Reading,
            FileState::Writing(_) => FileMode::Writing,
        }
    }

    fn close(&mut self) {
        if !matches!(self.state, FileState::Closed) {
            log::trace!("closing native file");
        }
        self.state = FileState::Closed;
    }

    fn reader(&mut self) -> Result<&mut File> {
        match &mut self.state {
            FileState::Reading(file) => Ok(file),
            _ => Err(NodeError::invalid_state("file is not open for reading")),
        }
    }

    fn writer(&mut self) -> Result<&mut File> {
        match &mut self.state {
            FileState::Writing(file) => Ok(file),
            _ => Err(NodeError::invalid_state("file is not open for writing")),
        }
    }

    fn open_read(&mut self, path: &Path) -> Result<()> {
        self.close();
        let path = self.config.resolve_path(path);
        let file = File::open(&path)
            .map_err(|e| NodeError::io(format!("failed to open '{}'", path.display()), e))?;
        self.state = FileState::Reading(file);
        Ok(())
    }

    fn open_write(&mut self, path: &Path) -> Result<()> {
        self.close();
        let path = self.config.resolve_path(path);
        if self.config.create_parent_dirs {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| {
                    NodeError::io(format!("failed to create '{}'", parent.display()), e)
                })?;
            }
        }
        let file = File::create(&path)
            .map_err(|e| NodeError::io(format!("failed to open '{}'", path.display()), e))?;
        self.state = FileState::Writing(file);
        Ok(())
    }

    fn read(&mut self, ctx: &ExecutionContext, count: i64, offset: Option<u64>) -> Result<()> {
        let file = self.reader()?;
        if let Some(offset) = offset {
            file.seek(SeekFrom::Start(offset))
                .map_err(|e| NodeError::io("failed to seek before reading", e))?;
        }

        let available = available(file)?;
        let wanted = match u64::try_from(count) {
            Ok(n) if n > 0 => n.min(available),
            _ => available,
        };
        if wanted == 0 {
            return Ok(());
        }

        let len = usize::try_from(wanted)
            .map_err(|_| NodeError::resource("read size exceeds addressable memory"))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)
            .map_err(|e| NodeError::io("failed to read", e))?;
        ctx.emit(PORT_DATA, Value::Vector(buf));
        Ok(())
    }

    fn write(&mut self, payload: &Payload, offset: Option<u64>) -> Result<()> {
        let file = self.writer()?;
        if let Some(offset) = offset {
            file.seek(SeekFrom::Start(offset))
                .map_err(|e| NodeError::io("failed to seek before writing", e))?;
        }
        file.write_all(payload.as_bytes())
            .map_err(|e| NodeError::io("failed to write", e))
    }
}

/// Bytes between the current position and the end of the file
fn available(file: &mut File) -> Result<u64> {
    let len = file
        .metadata()
        .map_err(|e| NodeError::io("failed to stat", e))?
        .len();
    let pos = file
        .stream_position()
        .map_err(|e| NodeError::io("failed to get position", e))?;
    Ok(len.saturating_sub(pos))
}

fn seek(file: &mut File, to: SeekFrom, what: &str) -> Result<()> {
    file.seek(to)
        .map(|_| ())
        .map_err(|e| NodeError::io(format!("failed to {}", what), e))
}

impl CommandMachine for NativeFile {
    type Command = FileCommand;

    fn handle(&mut self, ctx: &ExecutionContext, command: FileCommand) -> Result<()> {
        log::debug!("{}: {:?}", ctx.node_id(), command);
        match command {
            FileCommand::Read { count, offset } => return self.read(ctx, count, offset),
            FileCommand::OpenRead(path) => self.open_read(&path)?,
            FileCommand::OpenWrite(path) => self.open_write(&path)?,
            FileCommand::Write { payload, offset } => self.write(&payload, offset)?,
            FileCommand::SkipRead(delta) => seek(self.reader()?, SeekFrom::Current(delta), "skip")?,
            FileCommand::SkipWrite(delta) => {
                seek(self.writer()?, SeekFrom::Current(delta), "skip")?
            }
            FileCommand::SeekRead(offset) => seek(self.reader()?, SeekFrom::Start(offset), "seek")?,
            FileCommand::SeekWrite(offset) => {
                seek(self.writer()?, SeekFrom::Start(offset), "seek")?
            }
            FileCommand::Close => self.close(),
        }
        ctx.emit_pulse(PORT_DONE);
        Ok(())
    }
}

impl Drop for NativeFile {
    fn drop(&mut self) {
        self.close();
    }
}

fn parse_path(value: &Value) -> Result<PathBuf> {
    let path = value.as_str()?;
    if path.is_empty() {
        return Err(NodeError::validation("file path is empty"));
    }
    Ok(PathBuf::from(path))
}

fn parse_offset(value: &Value) -> Result<Option<u64>> {
    value
        .get("offset")
        .map(|offset| offset.integer_or_scalar::<u64>())
        .transpose()
}

fn translate_read(message: Message<'_>) -> Result<Option<FileCommand>> {
    let value = message.value;
    let command = match message.port {
        PORT_OPEN => FileCommand::OpenRead(parse_path(value)?),
        PORT_READ => match value {
            Value::Integer(_) | Value::Scalar(_) => FileCommand::Read {
                count: value.integer_or_scalar()?,
                offset: None,
            },
            Value::Tuple(_) => FileCommand::Read {
                count: value.field("size")?.integer_or_scalar()?,
                offset: parse_offset(value)?,
            },
            other => {
                return Err(NodeError::type_mismatch(
                    "integer, scalar or tuple",
                    other.value_type(),
                ))
            }
        },
        PORT_SKIP => FileCommand::SkipRead(value.integer_or_scalar()?),
        PORT_SEEK => FileCommand::SeekRead(value.integer_or_scalar()?),
        PORT_CLOSE => FileCommand::Close,
        _ => return Ok(None),
    };
    Ok(Some(command))
}

fn translate_write(message: Message<'_>) -> Result<Option<FileCommand>> {
    let value = message.value;
    let command = match message.port {
        PORT_OPEN => FileCommand::OpenWrite(parse_path(value)?),
        PORT_WRITE => match value {
            Value::Vector(_) | Value::String(_) => FileCommand::Write {
                payload: Payload::from_value(value)?,
                offset: None,
            },
            Value::Tuple(_) => FileCommand::Write {
                payload: Payload::from_value(value.field("buffer")?)?,
                offset: parse_offset(value)?,
            },
            other => {
                return Err(NodeError::type_mismatch(
                    "vector, string or tuple",
                    other.value_type(),
                ))
            }
        },
        PORT_SKIP => FileCommand::SkipWrite(value.integer_or_scalar()?),
        PORT_SEEK => FileCommand::SeekWrite(value.integer_or_scalar()?),
        PORT_CLOSE => FileCommand::Close,
        _ => return Ok(None),
    };
    Ok(Some(command))
}

/// Create an `nfile-read` instance without going through a registry
pub fn read_node(config: &EngineConfig) -> ActorNode<NativeFile> {
    ActorNode::new(NativeFile::new(config), translate_read)
}

/// Create an `nfile-write` instance without going through a registry
pub fn write_node(config: &EngineConfig) -> ActorNode<NativeFile> {
    ActorNode::new(NativeFile::new(config), translate_write)
}

/// Factory for `nfile-read`
pub struct NativeFileReadFactory {
    config: EngineConfig,
}

impl NativeFileReadFactory {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl NodeFactory for NativeFileReadFactory {
    fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor::new(
            READ_NODE_TYPE,
            "reads data from a native file specified by path",
        )
        .input(PORT_OPEN, "path of the file to open")
        .input(PORT_READ, "byte count, or tuple {size, offset?}")
        .input(PORT_SKIP, "relative seek")
        .input(PORT_SEEK, "absolute seek")
        .input(PORT_CLOSE, "closes the file")
        .output(PORT_DATA, "bytes read")
        .output(PORT_DONE, "pulse after each completed command")
        .output(ERROR_PORT, "error message")
    }

    fn create(&self) -> Box<dyn NodeInstance> {
        Box::new(read_node(&self.config))
    }
}

/// Factory for `nfile-write`
pub struct NativeFileWriteFactory {
    config: EngineConfig,
}

impl NativeFileWriteFactory {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl NodeFactory for NativeFileWriteFactory {
    fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor::new(
            WRITE_NODE_TYPE,
            "writes data to a native file specified by path",
        )
        .input(PORT_OPEN, "path of the file to create or truncate")
        .input(PORT_WRITE, "bytes, or tuple {buffer, offset?}")
        .input(PORT_SKIP, "relative seek")
        .input(PORT_SEEK, "absolute seek")
        .input(PORT_CLOSE, "closes the file")
        .output(PORT_DONE, "pulse after each completed command")
        .output(ERROR_PORT, "error message")
    }

    fn create(&self) -> Box<dyn NodeInstance> {
        Box::new(write_node(&self.config))
    }
}
