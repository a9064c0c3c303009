//! Zlib streaming codec nodes
//!
//! `zlib-inflate` and `zlib-deflate` share one state machine, [`ZlibCodec`],
//! that owns at most one flate2 stream at a time. Input arrives in arbitrary
//! slices; output is emitted on `out` in chunks of at most
//! `EngineConfig::chunk_size` bytes as soon as the stream produces it.
//!
//! # Ports
//!
//! | node | inputs | outputs |
//! |---|---|---|
//! | `zlib-inflate` | `init`, `in` | `out`, `error` |
//! | `zlib-deflate` | `start`, `in`, `end` | `out`, `error` |
//!
//! Feeding `in` before `init`/`start` starts the stream implicitly
//! (deflation then uses `EngineConfig::default_deflate_level`).

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use node_engine::{
    ActorNode, CommandMachine, EngineConfig, ExecutionContext, Message, NodeDescriptor,
    NodeError, NodeFactory, NodeInstance, Result, Value, ERROR_PORT,
};

use crate::payload::Payload;

pub const INFLATE_NODE_TYPE: &str = "zlib-inflate";
pub const DEFLATE_NODE_TYPE: &str = "zlib-deflate";

pub const PORT_INIT: &str = "init";
pub const PORT_START: &str = "start";
pub const PORT_IN: &str = "in";
pub const PORT_END: &str = "end";
pub const PORT_OUT: &str = "out";

/// Deflate compression level, `-1` (library default) or `0..=9`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(i32);

impl CompressionLevel {
    pub const DEFAULT: Self = Self(-1);

    pub fn new(level: i32) -> Result<Self> {
        if (-1..=9).contains(&level) {
            Ok(Self(level))
        } else {
            Err(NodeError::validation(format!(
                "compression level {} is out of range (0~9 or -1)",
                level
            )))
        }
    }

    pub fn get(self) -> i32 {
        self.0
    }

    fn compression(self) -> Compression {
        match u32::try_from(self.0) {
            Ok(level) => Compression::new(level),
            Err(_) => Compression::default(),
        }
    }
}

/// Commands accepted by [`ZlibCodec`]
#[derive(Debug)]
pub enum ZlibCommand {
    InitInflate,
    FeedInflate(Payload),
    InitDeflate(CompressionLevel),
    FeedDeflate(Payload),
    FinishDeflate,
}

enum CodecState {
    Idle,
    Inflating(Decompress),
    Deflating(Compress),
}

/// Observable phase of a [`ZlibCodec`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecMode {
    Idle,
    Inflating,
    Deflating,
}

/// Result of one call into the underlying stream
struct Step {
    consumed: usize,
    stream_end: bool,
}

/// Stateful inflate/deflate stream
pub struct ZlibCodec {
    state: CodecState,
    chunk_size: usize,
    default_level: CompressionLevel,
}

impl ZlibCodec {
    pub fn new(config: &EngineConfig) -> Self {
        let default_level =
            CompressionLevel::new(config.default_deflate_level).unwrap_or_else(|e| {
                log::warn!("{}; using the library default", e);
                CompressionLevel::DEFAULT
            });
        Self {
            state: CodecState::Idle,
            chunk_size: config.chunk_size.max(1),
            default_level,
        }
    }

    pub fn mode(&self) -> CodecMode {
        match self.state {
            CodecState::Idle => CodecMode::Idle,
            CodecState::Inflating(_) => CodecMode::Inflating,
            CodecState::Deflating(_) => CodecMode::Deflating,
        }
    }

    /// Release the current stream, if any
    fn tear_down(&mut self) {
        match std::mem::replace(&mut self.state, CodecState::Idle) {
            CodecState::Idle => {}
            CodecState::Inflating(_) => log::trace!("releasing inflate stream"),
            CodecState::Deflating(_) => log::trace!("releasing deflate stream"),
        }
    }

    fn init_inflate(&mut self) {
        self.tear_down();
        self.state = CodecState::Inflating(Decompress::new(true));
    }

    fn init_deflate(&mut self, level: CompressionLevel) {
        self.tear_down();
        self.state = CodecState::Deflating(Compress::new(level.compression(), true));
    }

    fn feed_inflate(&mut self, ctx: &ExecutionContext, payload: &Payload) -> Result<()> {
        if !matches!(self.state, CodecState::Inflating(_)) {
            log::debug!("{}: starting inflation implicitly", ctx.node_id());
            self.init_inflate();
        }
        let CodecState::Inflating(stream) = &mut self.state else {
            return Err(NodeError::invalid_state("inflation not started"));
        };
        pump(ctx, self.chunk_size, payload.as_bytes(), |input, out| {
            inflate_step(stream, input, out, FlushDecompress::None)
        })
    }

    fn feed_deflate(&mut self, ctx: &ExecutionContext, payload: &Payload) -> Result<()> {
        if !matches!(self.state, CodecState::Deflating(_)) {
            log::debug!(
                "{}: starting deflation implicitly at level {}",
                ctx.node_id(),
                self.default_level.get()
            );
            self.init_deflate(self.default_level);
        }
        let CodecState::Deflating(stream) = &mut self.state else {
            return Err(NodeError::invalid_state("deflation not started"));
        };
        pump(ctx, self.chunk_size, payload.as_bytes(), |input, out| {
            deflate_step(stream, input, out, FlushCompress::None)
        })
    }

    fn finish_deflate(&mut self, ctx: &ExecutionContext) -> Result<()> {
        let CodecState::Deflating(stream) = &mut self.state else {
            return Err(NodeError::invalid_state("deflation not started"));
        };
        pump(ctx, self.chunk_size, &[], |input, out| {
            deflate_step(stream, input, out, FlushCompress::Finish)
        })?;
        self.tear_down();
        Ok(())
    }
}

impl CommandMachine for ZlibCodec {
    type Command = ZlibCommand;

    fn handle(&mut self, ctx: &ExecutionContext, command: ZlibCommand) -> Result<()> {
        log::debug!("{}: {:?}", ctx.node_id(), command);
        match command {
            ZlibCommand::InitInflate => {
                self.init_inflate();
                Ok(())
            }
            ZlibCommand::FeedInflate(payload) => self.feed_inflate(ctx, &payload),
            ZlibCommand::InitDeflate(level) => {
                self.init_deflate(level);
                Ok(())
            }
            ZlibCommand::FeedDeflate(payload) => self.feed_deflate(ctx, &payload),
            ZlibCommand::FinishDeflate => self.finish_deflate(ctx),
        }
    }
}

/// Run the stream over `input`, emitting each non-empty output chunk
///
/// A short chunk does not mean the stream is drained: the backend may stop
/// at its internal window boundary with more output pending. Stepping
/// continues until stream end, or until a call with all input consumed
/// yields nothing. A call that makes no progress at all also stops.
fn pump<F>(ctx: &ExecutionContext, chunk_size: usize, mut input: &[u8], mut step: F) -> Result<()>
where
    F: FnMut(&[u8], &mut Vec<u8>) -> Result<Step>,
{
    loop {
        let mut chunk = Vec::with_capacity(chunk_size);
        let result = step(input, &mut chunk)?;
        let consumed = result.consumed.min(input.len());
        input = &input[consumed..];

        let produced = chunk.len();
        if produced > 0 {
            ctx.emit(PORT_OUT, Value::Vector(chunk));
        }
        if result.stream_end || (produced == 0 && (input.is_empty() || consumed == 0)) {
            return Ok(());
        }
    }
}

fn inflate_step(
    stream: &mut Decompress,
    input: &[u8],
    out: &mut Vec<u8>,
    flush: FlushDecompress,
) -> Result<Step> {
    let before = stream.total_in();
    let status = stream
        .decompress_vec(input, out, flush)
        .map_err(|e| NodeError::resource(format!("inflate failed: {}", e)))?;
    Ok(Step {
        consumed: consumed_since(before, stream.total_in()),
        stream_end: status == Status::StreamEnd,
    })
}

fn deflate_step(
    stream: &mut Compress,
    input: &[u8],
    out: &mut Vec<u8>,
    flush: FlushCompress,
) -> Result<Step> {
    let before = stream.total_in();
    let status = stream
        .compress_vec(input, out, flush)
        .map_err(|e| NodeError::resource(format!("deflate failed: {}", e)))?;
    Ok(Step {
        consumed: consumed_since(before, stream.total_in()),
        stream_end: status == Status::StreamEnd,
    })
}

fn consumed_since(before: u64, after: u64) -> usize {
    usize::try_from(after.saturating_sub(before)).unwrap_or(usize::MAX)
}

fn translate_inflate(message: Message<'_>) -> Result<Option<ZlibCommand>> {
    match message.port {
        PORT_INIT => Ok(Some(ZlibCommand::InitInflate)),
        PORT_IN => Ok(Some(ZlibCommand::FeedInflate(Payload::from_value(
            message.value,
        )?))),
        _ => Ok(None),
    }
}

fn translate_deflate(message: Message<'_>) -> Result<Option<ZlibCommand>> {
    match message.port {
        PORT_START => {
            let level = if message.value.is_pulse() {
                CompressionLevel::DEFAULT
            } else {
                CompressionLevel::new(message.value.integer_or_scalar::<i32>()?)?
            };
            Ok(Some(ZlibCommand::InitDeflate(level)))
        }
        PORT_IN => Ok(Some(ZlibCommand::FeedDeflate(Payload::from_value(
            message.value,
        )?))),
        PORT_END => Ok(Some(ZlibCommand::FinishDeflate)),
        _ => Ok(None),
    }
}

/// Create a `zlib-inflate` instance without going through a registry
pub fn inflate_node(config: &EngineConfig) -> ActorNode<ZlibCodec> {
    ActorNode::new(ZlibCodec::new(config), translate_inflate)
}

/// Create a `zlib-deflate` instance without going through a registry
pub fn deflate_node(config: &EngineConfig) -> ActorNode<ZlibCodec> {
    ActorNode::new(ZlibCodec::new(config), translate_deflate)
}

/// Factory for `zlib-inflate`
pub struct ZlibInflateFactory {
    config: EngineConfig,
}

impl ZlibInflateFactory {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl NodeFactory for ZlibInflateFactory {
    fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor::new(INFLATE_NODE_TYPE, "decompresses a zlib stream")
            .input(PORT_INIT, "resets the stream")
            .input(PORT_IN, "compressed bytes (vector or string)")
            .output(PORT_OUT, "decompressed bytes")
            .output(ERROR_PORT, "error message")
    }

    fn create(&self) -> Box<dyn NodeInstance> {
        Box::new(inflate_node(&self.config))
    }
}

/// Factory for `zlib-deflate`
pub struct ZlibDeflateFactory {
    config: EngineConfig,
}

impl ZlibDeflateFactory {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl NodeFactory for ZlibDeflateFactory {
    fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor::new(DEFLATE_NODE_TYPE, "compresses bytes into a zlib stream")
            .input(PORT_START, "resets the stream with a level (0~9 or -1)")
            .input(PORT_IN, "bytes to compress (vector or string)")
            .input(PORT_END, "flushes and ends the stream")
            .output(PORT_OUT, "compressed bytes")
            .output(ERROR_PORT, "error message")
    }

    fn create(&self) -> Box<dyn NodeInstance> {
        Box::new(deflate_node(&self.config))
    }
}
