//! Archive ingestion: enumerate a JAR (plain or Spring Boot fat layout),
//! parse every class entry in parallel and merge into one immutable result.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::classfile::{parse_class, ParseDepth, RawClass};
use crate::error::{LoadError, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveLayout {
    PlainJar,
    SpringBootFatJar,
}

impl std::fmt::Display for ArchiveLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveLayout::PlainJar => write!(f, "plain jar"),
            ArchiveLayout::SpringBootFatJar => write!(f, "Spring Boot fat jar"),
        }
    }
}

/// One successfully parsed class entry.
#[derive(Debug)]
pub struct ClassEntry {
    /// Entry path inside the archive; nested-lib entries use the
    /// `BOOT-INF/lib/x.jar!/com/acme/Y.class` form.
    pub path: String,
    pub application: bool,
    pub class: RawClass,
}

/// One skipped entry with the reason it failed to parse.
#[derive(Debug)]
pub struct EntryError {
    pub path: String,
    pub error: ParseError,
}

/// Immutable result of ingesting one archive.
#[derive(Debug)]
pub struct RawArchive {
    pub layout: ArchiveLayout,
    pub classes: Vec<ClassEntry>,
    pub errors: Vec<EntryError>,
    /// Total `.class` entries seen; always `classes.len() + errors.len()`.
    pub total_class_entries: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Parse method bodies of nested-library classes too. Default is
    /// structural-only for libraries.
    pub deep_library_scan: bool,
}

struct PendingEntry {
    path: String,
    application: bool,
    depth: ParseDepth,
    bytes: Vec<u8>,
}

pub fn load(path: &Path) -> Result<RawArchive, LoadError> {
    load_with(path, &LoadOptions::default())
}

pub fn load_with(path: &Path, options: &LoadOptions) -> Result<RawArchive, LoadError> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let mut archive = ZipArchive::new(file).map_err(|e| match e {
        ZipError::Io(source) => LoadError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
        _ => LoadError::NotAZip {
            path: path.to_path_buf(),
        },
    })?;

    let names: Vec<String> = archive.file_names().map(String::from).collect();
    let layout = detect_layout(&names);

    // The archive bytes are read once, sequentially; parsing is the
    // parallel part.
    let mut pending: Vec<PendingEntry> = Vec::new();
    let mut errors: Vec<EntryError> = Vec::new();

    for name in &names {
        if name.ends_with(".class") {
            let application = match layout {
                ArchiveLayout::PlainJar => true,
                ArchiveLayout::SpringBootFatJar => name.starts_with("BOOT-INF/classes/"),
            };
            match read_entry(&mut archive, name) {
                Ok(bytes) => pending.push(PendingEntry {
                    path: name.clone(),
                    application,
                    depth: ParseDepth::Full,
                    bytes,
                }),
                Err(error) => errors.push(EntryError {
                    path: name.clone(),
                    error,
                }),
            }
        } else if layout == ArchiveLayout::SpringBootFatJar
            && name.starts_with("BOOT-INF/lib/")
            && name.ends_with(".jar")
        {
            match read_entry(&mut archive, name) {
                Ok(bytes) => collect_nested(name, bytes, options, &mut pending, &mut errors),
                Err(error) => errors.push(EntryError {
                    path: name.clone(),
                    error,
                }),
            }
        }
    }

    let total_class_entries = pending.len() + errors.len();

    // Entries have no cross-entry dependency; parse them in parallel and
    // merge afterwards, preserving enumeration order.
    let parsed: Vec<(PendingEntry, Result<RawClass, ParseError>)> = pending
        .into_par_iter()
        .map(|entry| {
            let result = parse_class(&entry.bytes, entry.depth);
            (entry, result)
        })
        .collect();

    let mut classes = Vec::new();
    for (entry, result) in parsed {
        match result {
            Ok(class) => classes.push(ClassEntry {
                path: entry.path,
                application: entry.application,
                class,
            }),
            Err(error) => errors.push(EntryError {
                path: entry.path,
                error,
            }),
        }
    }

    Ok(RawArchive {
        layout,
        classes,
        errors,
        total_class_entries,
    })
}

fn detect_layout(names: &[String]) -> ArchiveLayout {
    let boot = names.iter().any(|n| {
        n.starts_with("BOOT-INF/") || n.starts_with("org/springframework/boot/loader/")
    });
    if boot {
        ArchiveLayout::SpringBootFatJar
    } else {
        ArchiveLayout::PlainJar
    }
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<Vec<u8>, ParseError> {
    let mut file = archive.by_name(name).map_err(|e| ParseError::NestedArchive {
        detail: format!("cannot open entry '{name}': {e}"),
    })?;
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes)
        .map_err(|e| ParseError::NestedArchive {
            detail: format!("cannot read entry '{name}': {e}"),
        })?;
    Ok(bytes)
}

/// Enumerate class entries of one nested library jar. A corrupt nested jar
/// is a per-entry error, never fatal.
fn collect_nested(
    jar_name: &str,
    bytes: Vec<u8>,
    options: &LoadOptions,
    pending: &mut Vec<PendingEntry>,
    errors: &mut Vec<EntryError>,
) {
    let depth = if options.deep_library_scan {
        ParseDepth::Full
    } else {
        ParseDepth::Structural
    };

    let mut nested = match ZipArchive::new(Cursor::new(bytes)) {
        Ok(z) => z,
        Err(e) => {
            errors.push(EntryError {
                path: jar_name.to_string(),
                error: ParseError::NestedArchive {
                    detail: e.to_string(),
                },
            });
            return;
        }
    };

    let inner_names: Vec<String> = nested.file_names().map(String::from).collect();
    for inner in inner_names {
        if !inner.ends_with(".class") {
            continue;
        }
        let path = format!("{jar_name}!/{inner}");
        let mut file = match nested.by_name(&inner) {
            Ok(f) => f,
            Err(e) => {
                errors.push(EntryError {
                    path,
                    error: ParseError::NestedArchive {
                        detail: e.to_string(),
                    },
                });
                continue;
            }
        };
        let mut bytes = Vec::with_capacity(file.size() as usize);
        if let Err(e) = file.read_to_end(&mut bytes) {
            errors.push(EntryError {
                path,
                error: ParseError::NestedArchive {
                    detail: e.to_string(),
                },
            });
            continue;
        }
        pending.push(PendingEntry {
            path,
            application: false,
            depth,
            bytes,
        });
    }
}
