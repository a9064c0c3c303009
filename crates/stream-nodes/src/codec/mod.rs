//! Streaming codecs

pub mod zlib;

pub use zlib::{
    CodecMode, CompressionLevel, ZlibCodec, ZlibCommand, ZlibDeflateFactory, ZlibInflateFactory,
};
