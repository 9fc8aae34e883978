//! Archive ingestion and raw JVM class-file parsing.
//!
//! Turns a JAR (plain or Spring Boot fat layout) into immutable raw
//! structural records: constant-pool-resolved classes, fields, methods,
//! annotations and per-call-site loop facts. Nothing here loads or
//! executes target classes.

pub mod archive;
pub mod classfile;
pub mod code;
pub mod descriptor;
pub mod error;
pub mod pool;
pub mod reader;

#[cfg(test)]
pub(crate) mod asm;

pub use archive::{load, load_with, ArchiveLayout, ClassEntry, EntryError, LoadOptions, RawArchive};
pub use classfile::{
    parse_class, ParseDepth, RawAnnotation, RawCall, RawClass, RawCodeSummary, RawField,
    RawFieldOp, RawMethod, RawValue,
};
pub use error::{LoadError, ParseError};
