use std::path::PathBuf;

use thiserror::Error;

/// Fatal failure opening the root archive. Everything else during a load is
/// recorded per entry and never aborts the run.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("archive not found: {path}")]
    NotFound { path: PathBuf },

    #[error("not a ZIP archive: {path}")]
    NotAZip { path: PathBuf },

    #[error("failed to read archive {path}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Non-fatal failure parsing one class-file entry. The entry is skipped and
/// the error travels with the load result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("bad magic number {found:#010x}")]
    BadMagic { found: u32 },

    #[error("unsupported class file major version {major}")]
    UnsupportedVersion { major: u16 },

    #[error("truncated class file: needed {needed} byte(s) at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("invalid constant pool entry {index}: {detail}")]
    ConstantPool { index: u16, detail: String },

    #[error("malformed {name} attribute: {detail}")]
    Attribute { name: &'static str, detail: String },

    #[error("invalid descriptor '{descriptor}'")]
    Descriptor { descriptor: String },

    #[error("unknown opcode {opcode:#04x} at bytecode offset {offset}")]
    UnknownOpcode { opcode: u8, offset: u32 },

    #[error("unreadable nested archive: {detail}")]
    NestedArchive { detail: String },
}

impl ParseError {
    pub fn pool(index: u16, detail: impl Into<String>) -> Self {
        ParseError::ConstantPool {
            index,
            detail: detail.into(),
        }
    }
}
