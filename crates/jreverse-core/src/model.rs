//! The typed semantic model: classes, members, annotations and the
//! immutable `ClassPool`. Built once per analysis run and read-only
//! thereafter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use jreverse_classfile::ArchiveLayout;

/// JVM access-flag bits used by the model and the analyzers.
pub mod access {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const ANNOTATION: u16 = 0x2000;
    pub const ENUM: u16 = 0x4000;
}

/// Fully-typed annotation member value. Nested and array-valued members
/// keep their structure; nothing collapses into an untyped string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    EnumRef { type_name: String, value: String },
    ClassRef(String),
    Array(Vec<AnnotationValue>),
    Nested(AnnotationModel),
}

impl AnnotationValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnnotationValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AnnotationValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The enum constant name, e.g. `EAGER` for `FetchType.EAGER`.
    pub fn as_enum_value(&self) -> Option<&str> {
        match self {
            AnnotationValue::EnumRef { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Flatten a member that may be a single value or an array of values.
    pub fn iter_flat(&self) -> Box<dyn Iterator<Item = &AnnotationValue> + '_> {
        match self {
            AnnotationValue::Array(values) => Box::new(values.iter()),
            other => Box::new(std::iter::once(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationModel {
    /// Dotted annotation type name.
    pub type_name: String,
    /// Member name/value pairs in declaration order.
    pub members: Vec<(String, AnnotationValue)>,
}

impl AnnotationModel {
    pub fn member(&self, name: &str) -> Option<&AnnotationValue> {
        self.members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn string_member(&self, name: &str) -> Option<&str> {
        self.member(name).and_then(AnnotationValue::as_str)
    }
}

/// Match an annotation type name against a query that is either a simple
/// name (`Autowired`) or fully qualified.
pub fn annotation_matches(type_name: &str, query: &str) -> bool {
    if query.contains('.') {
        type_name == query
    } else {
        type_name.rsplit('.').next() == Some(query)
    }
}

fn find_annotation<'a>(
    annotations: &'a [AnnotationModel],
    query: &str,
) -> Option<&'a AnnotationModel> {
    annotations
        .iter()
        .find(|a| annotation_matches(&a.type_name, query))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldModel {
    pub name: String,
    pub type_name: String,
    pub access_flags: u16,
    pub annotations: Vec<AnnotationModel>,
    /// Generic signature when present; used to resolve collection element
    /// types for JPA associations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl FieldModel {
    pub fn has_annotation(&self, query: &str) -> bool {
        find_annotation(&self.annotations, query).is_some()
    }

    pub fn annotation(&self, query: &str) -> Option<&AnnotationModel> {
        find_annotation(&self.annotations, query)
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & access::STATIC != 0
    }
}

/// One call site inside a method body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSite {
    pub target_class: String,
    pub target_method: String,
    pub target_descriptor: String,
    pub offset: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub inside_loop: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAccess {
    pub owner: String,
    pub field: String,
    pub write: bool,
    pub offset: u32,
    pub inside_loop: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodModel {
    pub name: String,
    pub descriptor: String,
    pub return_type: String,
    pub parameter_types: Vec<String>,
    pub access_flags: u16,
    pub annotations: Vec<AnnotationModel>,
    /// Per-parameter annotation lists, indexed by parameter position.
    pub parameter_annotations: Vec<Vec<AnnotationModel>>,
    pub throws: Vec<String>,
    pub call_sites: Vec<CallSite>,
    pub field_accesses: Vec<FieldAccess>,
    pub complexity: u32,
}

impl MethodModel {
    pub fn has_annotation(&self, query: &str) -> bool {
        find_annotation(&self.annotations, query).is_some()
    }

    pub fn annotation(&self, query: &str) -> Option<&AnnotationModel> {
        find_annotation(&self.annotations, query)
    }

    pub fn parameter_annotations(&self, index: usize) -> &[AnnotationModel] {
        self.parameter_annotations
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & access::STATIC != 0
    }

    /// Heuristic setter shape: `setX` with one parameter.
    pub fn is_setter(&self) -> bool {
        self.name.starts_with("set") && self.parameter_types.len() == 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassModel {
    /// Qualified dotted name; the unique pool key.
    pub name: String,
    pub simple_name: String,
    pub package: String,
    pub access_flags: u16,
    /// By-name reference, not ownership. May point outside the pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub annotations: Vec<AnnotationModel>,
    pub fields: Vec<FieldModel>,
    pub methods: Vec<MethodModel>,
    /// Archive entry path this class came from.
    pub origin: String,
    pub application: bool,
    /// Non-fatal problems met while modeling this class.
    pub errors: Vec<String>,
}

impl ClassModel {
    pub fn has_annotation(&self, query: &str) -> bool {
        find_annotation(&self.annotations, query).is_some()
    }

    pub fn annotation(&self, query: &str) -> Option<&AnnotationModel> {
        find_annotation(&self.annotations, query)
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags & access::INTERFACE != 0
    }

    pub fn field(&self, name: &str) -> Option<&FieldModel> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Spring stereotype simple name, when annotated with one.
    pub fn stereotype(&self) -> Option<&'static str> {
        const STEREOTYPES: &[&str] = &[
            "RestController",
            "Controller",
            "Service",
            "Repository",
            "Configuration",
            "Component",
        ];
        STEREOTYPES
            .iter()
            .find(|s| self.has_annotation(s))
            .copied()
    }
}

/// A class name seen more than once; the first occurrence wins and the
/// later one is recorded here, never silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateClass {
    pub name: String,
    pub kept_origin: String,
    pub ignored_origin: String,
}

/// The immutable collection of all modeled classes from one archive,
/// keyed by qualified name. Iteration order is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassPool {
    classes: BTreeMap<String, ClassModel>,
    pub duplicates: Vec<DuplicateClass>,
    pub layout: ArchiveLayout,
}

impl ClassPool {
    pub fn new(layout: ArchiveLayout) -> Self {
        Self {
            classes: BTreeMap::new(),
            duplicates: Vec::new(),
            layout,
        }
    }

    /// Insert a class; on a name collision the first occurrence wins and
    /// the duplicate is recorded as a conflict.
    pub fn insert(&mut self, class: ClassModel) {
        match self.classes.get(&class.name) {
            Some(existing) => self.duplicates.push(DuplicateClass {
                name: class.name.clone(),
                kept_origin: existing.origin.clone(),
                ignored_origin: class.origin,
            }),
            None => {
                self.classes.insert(class.name.clone(), class);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ClassModel> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassModel> {
        self.classes.values()
    }

    pub fn application_classes(&self) -> impl Iterator<Item = &ClassModel> {
        self.iter().filter(|c| c.application)
    }

    /// Application classes implementing the given interface name.
    pub fn implementations_of(&self, interface: &str) -> Vec<&ClassModel> {
        self.application_classes()
            .filter(|c| c.interfaces.iter().any(|i| i == interface))
            .collect()
    }
}
