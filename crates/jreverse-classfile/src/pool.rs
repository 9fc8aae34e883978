use crate::error::ParseError;
use crate::reader::ByteReader;

/// One constant-pool entry. Reference entries keep their raw indices; the
/// lookup helpers below resolve them on demand.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name: u16 },
    Str { utf8: u16 },
    FieldRef { class: u16, name_and_type: u16 },
    MethodRef { class: u16, name_and_type: u16 },
    InterfaceMethodRef { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    MethodHandle { kind: u8, reference: u16 },
    MethodType { descriptor: u16 },
    Dynamic { bootstrap: u16, name_and_type: u16 },
    InvokeDynamic { bootstrap: u16, name_and_type: u16 },
    Module { name: u16 },
    Package { name: u16 },
}

/// The class-file constant pool. Indices are 1-based; `Long` and `Double`
/// occupy two slots, the second of which is `None`.
pub struct ConstantPool {
    entries: Vec<Option<Constant>>,
}

impl ConstantPool {
    pub fn parse(r: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let count = r.u16()?;
        let mut entries: Vec<Option<Constant>> = Vec::with_capacity(count as usize);
        entries.push(None); // slot 0 is unused

        let mut index = 1u16;
        while index < count {
            let tag = r.u8()?;
            let constant = match tag {
                1 => {
                    let len = r.u16()? as usize;
                    let bytes = r.bytes(len)?;
                    // JVM "modified UTF-8" differs from UTF-8 only for NUL
                    // and supplementary characters; lossy decoding keeps the
                    // rest of the entry usable.
                    Constant::Utf8(String::from_utf8_lossy(bytes).into_owned())
                }
                3 => Constant::Integer(r.i32()?),
                4 => Constant::Float(f32::from_bits(r.u32()?)),
                5 => Constant::Long(r.u64()? as i64),
                6 => Constant::Double(f64::from_bits(r.u64()?)),
                7 => Constant::Class { name: r.u16()? },
                8 => Constant::Str { utf8: r.u16()? },
                9 => Constant::FieldRef {
                    class: r.u16()?,
                    name_and_type: r.u16()?,
                },
                10 => Constant::MethodRef {
                    class: r.u16()?,
                    name_and_type: r.u16()?,
                },
                11 => Constant::InterfaceMethodRef {
                    class: r.u16()?,
                    name_and_type: r.u16()?,
                },
                12 => Constant::NameAndType {
                    name: r.u16()?,
                    descriptor: r.u16()?,
                },
                15 => Constant::MethodHandle {
                    kind: r.u8()?,
                    reference: r.u16()?,
                },
                16 => Constant::MethodType {
                    descriptor: r.u16()?,
                },
                17 => Constant::Dynamic {
                    bootstrap: r.u16()?,
                    name_and_type: r.u16()?,
                },
                18 => Constant::InvokeDynamic {
                    bootstrap: r.u16()?,
                    name_and_type: r.u16()?,
                },
                19 => Constant::Module { name: r.u16()? },
                20 => Constant::Package { name: r.u16()? },
                other => {
                    return Err(ParseError::pool(index, format!("unknown tag {other}")));
                }
            };

            let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
            entries.push(Some(constant));
            index += 1;
            if wide {
                entries.push(None);
                index += 1;
            }
        }

        Ok(Self { entries })
    }

    fn get(&self, index: u16) -> Result<&Constant, ParseError> {
        self.entries
            .get(index as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or_else(|| ParseError::pool(index, "index out of range or second wide slot"))
    }

    pub fn utf8(&self, index: u16) -> Result<&str, ParseError> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            other => Err(ParseError::pool(index, format!("expected Utf8, found {other:?}"))),
        }
    }

    /// Resolve a `Class` entry into a dotted class name.
    pub fn class_name(&self, index: u16) -> Result<String, ParseError> {
        match self.get(index)? {
            Constant::Class { name } => Ok(self.utf8(*name)?.replace('/', ".")),
            other => Err(ParseError::pool(index, format!("expected Class, found {other:?}"))),
        }
    }

    fn name_and_type(&self, index: u16) -> Result<(&str, &str), ParseError> {
        match self.get(index)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            other => Err(ParseError::pool(
                index,
                format!("expected NameAndType, found {other:?}"),
            )),
        }
    }

    /// Resolve a field/method/interface-method reference into
    /// `(owner class, member name, descriptor)`.
    pub fn member_ref(&self, index: u16) -> Result<(String, String, String), ParseError> {
        let (class, name_and_type) = match self.get(index)? {
            Constant::FieldRef {
                class,
                name_and_type,
            }
            | Constant::MethodRef {
                class,
                name_and_type,
            }
            | Constant::InterfaceMethodRef {
                class,
                name_and_type,
            } => (*class, *name_and_type),
            other => {
                return Err(ParseError::pool(
                    index,
                    format!("expected member reference, found {other:?}"),
                ));
            }
        };
        let owner = self.class_name(class)?;
        let (name, descriptor) = self.name_and_type(name_and_type)?;
        Ok((owner, name.to_string(), descriptor.to_string()))
    }

    /// Resolve an `InvokeDynamic` entry into `(method name, descriptor)`.
    pub fn invoke_dynamic(&self, index: u16) -> Result<(String, String), ParseError> {
        match self.get(index)? {
            Constant::InvokeDynamic { name_and_type, .. }
            | Constant::Dynamic { name_and_type, .. } => {
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Ok((name.to_string(), descriptor.to_string()))
            }
            other => Err(ParseError::pool(
                index,
                format!("expected InvokeDynamic, found {other:?}"),
            )),
        }
    }

    pub fn integer(&self, index: u16) -> Result<i64, ParseError> {
        match self.get(index)? {
            Constant::Integer(v) => Ok(*v as i64),
            Constant::Long(v) => Ok(*v),
            other => Err(ParseError::pool(
                index,
                format!("expected integer constant, found {other:?}"),
            )),
        }
    }

    pub fn float(&self, index: u16) -> Result<f64, ParseError> {
        match self.get(index)? {
            Constant::Float(v) => Ok(*v as f64),
            Constant::Double(v) => Ok(*v),
            other => Err(ParseError::pool(
                index,
                format!("expected float constant, found {other:?}"),
            )),
        }
    }
}
