//! Native I/O nodes

pub mod nfile;

pub use nfile::{
    FileCommand, FileMode, NativeFile, NativeFileReadFactory, NativeFileWriteFactory,
};
