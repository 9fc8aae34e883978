//! Parsing of one `.class` entry into an immutable raw structural record.
//!
//! The record is binary-layout free: constant-pool indices are resolved
//! here, call sites are already paired with their loop facts, and the
//! semantic model builder downstream never sees a byte offset it did not
//! ask for.

use crate::code::{self, InstrKind, InvokeStyle};
use crate::descriptor;
use crate::error::ParseError;
use crate::pool::ConstantPool;
use crate::reader::ByteReader;

pub const MAGIC: u32 = 0xCAFE_BABE;
/// JDK 1.0 through the latest released class-file format.
pub const MIN_MAJOR: u16 = 45;
pub const MAX_MAJOR: u16 = 69;

/// How much of an entry to parse. `Structural` skips method bodies; nested
/// library jars are parsed this way unless deep scanning is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseDepth {
    Structural,
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Enum { type_name: String, value: String },
    Class(String),
    Annotation(RawAnnotation),
    Array(Vec<RawValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawAnnotation {
    /// Dotted annotation type name, e.g. `org.springframework.stereotype.Service`.
    pub type_name: String,
    /// Member name/value pairs in declaration order.
    pub elements: Vec<(String, RawValue)>,
}

#[derive(Debug, Clone)]
pub struct RawField {
    pub name: String,
    pub descriptor: String,
    pub access_flags: u16,
    pub annotations: Vec<RawAnnotation>,
    pub signature: Option<String>,
}

/// One resolved invoke instruction inside a method body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCall {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub offset: u32,
    pub line: Option<u32>,
    pub inside_loop: bool,
}

/// One resolved field access inside a method body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFieldOp {
    pub owner: String,
    pub name: String,
    pub write: bool,
    pub offset: u32,
    pub inside_loop: bool,
}

/// Reduction of a method's `Code` attribute. Raw bytes are not retained.
#[derive(Debug, Clone, Default)]
pub struct RawCodeSummary {
    pub calls: Vec<RawCall>,
    pub field_ops: Vec<RawFieldOp>,
    pub complexity: u32,
}

#[derive(Debug, Clone)]
pub struct RawMethod {
    pub name: String,
    pub descriptor: String,
    pub access_flags: u16,
    pub annotations: Vec<RawAnnotation>,
    pub parameter_annotations: Vec<Vec<RawAnnotation>>,
    pub exceptions: Vec<String>,
    pub signature: Option<String>,
    pub code: Option<RawCodeSummary>,
}

#[derive(Debug, Clone)]
pub struct RawClass {
    pub minor: u16,
    pub major: u16,
    pub access_flags: u16,
    /// Dotted qualified name.
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<RawField>,
    pub methods: Vec<RawMethod>,
    pub annotations: Vec<RawAnnotation>,
    pub source_file: Option<String>,
    /// Non-fatal problems hit after the class header was read. A class
    /// with entries here has empty member lists; the name, superclass
    /// and interfaces are still trustworthy.
    pub errors: Vec<String>,
}

#[derive(Default)]
struct RawBody {
    fields: Vec<RawField>,
    methods: Vec<RawMethod>,
    annotations: Vec<RawAnnotation>,
    source_file: Option<String>,
}

pub fn parse_class(bytes: &[u8], depth: ParseDepth) -> Result<RawClass, ParseError> {
    let mut r = ByteReader::new(bytes);

    let magic = r.u32()?;
    if magic != MAGIC {
        return Err(ParseError::BadMagic { found: magic });
    }
    let minor = r.u16()?;
    let major = r.u16()?;
    if !(MIN_MAJOR..=MAX_MAJOR).contains(&major) {
        return Err(ParseError::UnsupportedVersion { major });
    }

    let pool = ConstantPool::parse(&mut r)?;

    let access_flags = r.u16()?;
    let this_class = r.u16()?;
    let super_class = r.u16()?;
    let name = pool.class_name(this_class)?;
    let super_name = if super_class == 0 {
        None
    } else {
        Some(pool.class_name(super_class)?)
    };

    let interface_count = r.u16()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(pool.class_name(r.u16()?)?);
    }

    // From here on the entry carries a usable identity. A constant pool
    // that is internally inconsistent at the member level degrades the
    // class to its header instead of dropping it from the pool; the byte
    // stream cannot be resynchronized past the first bad member.
    let (body, errors) = match parse_body(&mut r, &pool, depth) {
        Ok(body) => (body, Vec::new()),
        Err(e) => (RawBody::default(), vec![e.to_string()]),
    };

    Ok(RawClass {
        minor,
        major,
        access_flags,
        name,
        super_name,
        interfaces,
        fields: body.fields,
        methods: body.methods,
        annotations: body.annotations,
        source_file: body.source_file,
        errors,
    })
}

fn parse_body(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
    depth: ParseDepth,
) -> Result<RawBody, ParseError> {
    let field_count = r.u16()?;
    let mut fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        fields.push(parse_field(r, pool)?);
    }

    let method_count = r.u16()?;
    let mut methods = Vec::with_capacity(method_count as usize);
    for _ in 0..method_count {
        methods.push(parse_method(r, pool, depth)?);
    }

    let mut annotations = Vec::new();
    let mut source_file = None;
    let attr_count = r.u16()?;
    for _ in 0..attr_count {
        let attr_name = pool.utf8(r.u16()?)?.to_string();
        let len = r.u32()? as usize;
        let body = r.bytes(len)?;
        let mut ar = ByteReader::new(body);
        match attr_name.as_str() {
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                annotations.extend(parse_annotations(&mut ar, pool)?);
            }
            "SourceFile" => {
                source_file = Some(pool.utf8(ar.u16()?)?.to_string());
            }
            _ => {}
        }
    }

    Ok(RawBody {
        fields,
        methods,
        annotations,
        source_file,
    })
}

fn parse_field(r: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<RawField, ParseError> {
    let access_flags = r.u16()?;
    let name = pool.utf8(r.u16()?)?.to_string();
    let descriptor = pool.utf8(r.u16()?)?.to_string();

    let mut annotations = Vec::new();
    let mut signature = None;
    let attr_count = r.u16()?;
    for _ in 0..attr_count {
        let attr_name = pool.utf8(r.u16()?)?.to_string();
        let len = r.u32()? as usize;
        let body = r.bytes(len)?;
        let mut ar = ByteReader::new(body);
        match attr_name.as_str() {
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                annotations.extend(parse_annotations(&mut ar, pool)?);
            }
            "Signature" => {
                signature = Some(pool.utf8(ar.u16()?)?.to_string());
            }
            _ => {}
        }
    }

    Ok(RawField {
        name,
        descriptor,
        access_flags,
        annotations,
        signature,
    })
}

fn parse_method(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
    depth: ParseDepth,
) -> Result<RawMethod, ParseError> {
    let access_flags = r.u16()?;
    let name = pool.utf8(r.u16()?)?.to_string();
    let descriptor = pool.utf8(r.u16()?)?.to_string();

    let mut annotations = Vec::new();
    let mut parameter_annotations = Vec::new();
    let mut exceptions = Vec::new();
    let mut signature = None;
    let mut code = None;

    let attr_count = r.u16()?;
    for _ in 0..attr_count {
        let attr_name = pool.utf8(r.u16()?)?.to_string();
        let len = r.u32()? as usize;
        let body = r.bytes(len)?;
        let mut ar = ByteReader::new(body);
        match attr_name.as_str() {
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                annotations.extend(parse_annotations(&mut ar, pool)?);
            }
            "RuntimeVisibleParameterAnnotations" => {
                let param_count = ar.u8()?;
                for _ in 0..param_count {
                    parameter_annotations.push(parse_annotations(&mut ar, pool)?);
                }
            }
            "Exceptions" => {
                let count = ar.u16()?;
                for _ in 0..count {
                    exceptions.push(pool.class_name(ar.u16()?)?);
                }
            }
            "Signature" => {
                signature = Some(pool.utf8(ar.u16()?)?.to_string());
            }
            "Code" if depth == ParseDepth::Full => {
                code = Some(parse_code(&mut ar, pool)?);
            }
            _ => {}
        }
    }

    Ok(RawMethod {
        name,
        descriptor,
        access_flags,
        annotations,
        parameter_annotations,
        exceptions,
        signature,
        code,
    })
}

fn parse_code(r: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<RawCodeSummary, ParseError> {
    let _max_stack = r.u16()?;
    let _max_locals = r.u16()?;
    let code_length = r.u32()? as usize;
    let bytes = r.bytes(code_length)?;

    let exception_count = r.u16()?;
    r.skip(exception_count as usize * 8)?;

    let mut line_table: Vec<(u32, u32)> = Vec::new();
    let attr_count = r.u16()?;
    for _ in 0..attr_count {
        let attr_name = pool.utf8(r.u16()?)?.to_string();
        let len = r.u32()? as usize;
        let body = r.bytes(len)?;
        if attr_name == "LineNumberTable" {
            let mut ar = ByteReader::new(body);
            let entries = ar.u16()?;
            for _ in 0..entries {
                let start_pc = ar.u16()? as u32;
                let line = ar.u16()? as u32;
                line_table.push((start_pc, line));
            }
        }
    }
    line_table.sort_unstable();

    let instructions = code::decode(bytes)?;
    let spans = code::loop_spans(&instructions);
    let complexity = code::cyclomatic_complexity(&instructions);

    let line_for = |offset: u32| -> Option<u32> {
        line_table
            .iter()
            .take_while(|&&(pc, _)| pc <= offset)
            .last()
            .map(|&(_, line)| line)
    };

    let mut calls = Vec::new();
    let mut field_ops = Vec::new();
    for instr in &instructions {
        match &instr.kind {
            InstrKind::Invoke { target, style } => {
                let (owner, name, descriptor) = if *style == InvokeStyle::Dynamic {
                    let (name, descriptor) = pool.invoke_dynamic(*target)?;
                    // indy call sites have no static owner class
                    (String::new(), name, descriptor)
                } else {
                    pool.member_ref(*target)?
                };
                calls.push(RawCall {
                    owner,
                    name,
                    descriptor,
                    offset: instr.offset,
                    line: line_for(instr.offset),
                    inside_loop: code::offset_in_loop(&spans, instr.offset),
                });
            }
            InstrKind::Field { target, write, .. } => {
                let (owner, name, _descriptor) = pool.member_ref(*target)?;
                field_ops.push(RawFieldOp {
                    owner,
                    name,
                    write: *write,
                    offset: instr.offset,
                    inside_loop: code::offset_in_loop(&spans, instr.offset),
                });
            }
            _ => {}
        }
    }

    Ok(RawCodeSummary {
        calls,
        field_ops,
        complexity,
    })
}

fn parse_annotations(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<RawAnnotation>, ParseError> {
    let count = r.u16()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        out.push(parse_annotation(r, pool)?);
    }
    Ok(out)
}

fn parse_annotation(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<RawAnnotation, ParseError> {
    let type_descriptor = pool.utf8(r.u16()?)?;
    let type_name = descriptor::annotation_type(type_descriptor);
    let pair_count = r.u16()?;
    let mut elements = Vec::with_capacity(pair_count as usize);
    for _ in 0..pair_count {
        let name = pool.utf8(r.u16()?)?.to_string();
        let value = parse_element_value(r, pool)?;
        elements.push((name, value));
    }
    Ok(RawAnnotation {
        type_name,
        elements,
    })
}

fn parse_element_value(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<RawValue, ParseError> {
    let tag = r.u8()?;
    Ok(match tag {
        b'B' | b'C' | b'I' | b'S' => RawValue::Int(pool.integer(r.u16()?)?),
        b'J' => RawValue::Int(pool.integer(r.u16()?)?),
        b'F' | b'D' => RawValue::Float(pool.float(r.u16()?)?),
        b'Z' => RawValue::Bool(pool.integer(r.u16()?)? != 0),
        b's' => RawValue::Str(pool.utf8(r.u16()?)?.to_string()),
        b'e' => {
            let type_descriptor = pool.utf8(r.u16()?)?;
            let value = pool.utf8(r.u16()?)?.to_string();
            RawValue::Enum {
                type_name: descriptor::annotation_type(type_descriptor),
                value,
            }
        }
        b'c' => {
            let class_descriptor = pool.utf8(r.u16()?)?;
            RawValue::Class(descriptor::annotation_type(class_descriptor))
        }
        b'@' => RawValue::Annotation(parse_annotation(r, pool)?),
        b'[' => {
            let count = r.u16()?;
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(parse_element_value(r, pool)?);
            }
            RawValue::Array(values)
        }
        other => {
            return Err(ParseError::Attribute {
                name: "RuntimeVisibleAnnotations",
                detail: format!("unknown element_value tag {:?}", other as char),
            });
        }
    })
}
