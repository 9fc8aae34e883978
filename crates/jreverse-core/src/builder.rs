//! Raw-archive to semantic-model conversion.
//!
//! Each raw class becomes a `ClassModel` independently, so the conversion
//! fans out across a thread pool and merges into the pool afterwards. A
//! malformed member degrades that one class, never the run.

use rayon::prelude::*;

use jreverse_classfile::{descriptor, RawAnnotation, RawArchive, RawClass, RawValue};

use crate::cancel::CancelToken;
use crate::model::{
    AnnotationModel, AnnotationValue, CallSite, ClassModel, ClassPool, FieldAccess, FieldModel,
    MethodModel,
};

/// Build the class pool from a loaded archive. Honors the cancel token
/// between batches; a cancelled build returns whatever was modeled so far.
pub fn build_pool(archive: &RawArchive, cancel: &CancelToken) -> ClassPool {
    let mut pool = ClassPool::new(archive.layout);

    let models: Vec<ClassModel> = archive
        .classes
        .par_iter()
        .filter_map(|entry| {
            if cancel.is_cancelled() {
                return None;
            }
            Some(build_class(&entry.class, &entry.path, entry.application))
        })
        .collect();

    for model in models {
        pool.insert(model);
    }
    pool
}

fn build_class(raw: &RawClass, origin: &str, application: bool) -> ClassModel {
    let mut errors = raw.errors.clone();

    let simple_name = raw
        .name
        .rsplit('.')
        .next()
        .unwrap_or(&raw.name)
        .to_string();
    let package = raw
        .name
        .rsplit_once('.')
        .map(|(p, _)| p.to_string())
        .unwrap_or_default();

    let fields = raw
        .fields
        .iter()
        .map(|f| {
            let type_name = match descriptor::field_type(&f.descriptor) {
                Ok(t) => t,
                Err(e) => {
                    errors.push(format!("field {}: {}", f.name, e));
                    f.descriptor.clone()
                }
            };
            FieldModel {
                name: f.name.clone(),
                type_name,
                access_flags: f.access_flags,
                annotations: convert_annotations(&f.annotations),
                signature: f.signature.clone(),
            }
        })
        .collect();

    let methods = raw
        .methods
        .iter()
        .map(|m| {
            let (parameter_types, return_type) = match descriptor::method_signature(&m.descriptor)
            {
                Ok(sig) => sig,
                Err(e) => {
                    errors.push(format!("method {}: {}", m.name, e));
                    (Vec::new(), "void".to_string())
                }
            };
            let (call_sites, field_accesses, complexity) = match &m.code {
                Some(code) => (
                    code.calls
                        .iter()
                        .map(|c| CallSite {
                            target_class: c.owner.clone(),
                            target_method: c.name.clone(),
                            target_descriptor: c.descriptor.clone(),
                            offset: c.offset,
                            line: c.line,
                            inside_loop: c.inside_loop,
                        })
                        .collect(),
                    code.field_ops
                        .iter()
                        .map(|op| FieldAccess {
                            owner: op.owner.clone(),
                            field: op.name.clone(),
                            write: op.write,
                            offset: op.offset,
                            inside_loop: op.inside_loop,
                        })
                        .collect(),
                    code.complexity,
                ),
                None => (Vec::new(), Vec::new(), 1),
            };
            MethodModel {
                name: m.name.clone(),
                descriptor: m.descriptor.clone(),
                return_type,
                parameter_types,
                access_flags: m.access_flags,
                annotations: convert_annotations(&m.annotations),
                parameter_annotations: m
                    .parameter_annotations
                    .iter()
                    .map(|anns| convert_annotations(anns))
                    .collect(),
                throws: m.exceptions.clone(),
                call_sites,
                field_accesses,
                complexity,
            }
        })
        .collect();

    ClassModel {
        name: raw.name.clone(),
        simple_name,
        package,
        access_flags: raw.access_flags,
        super_name: raw.super_name.clone(),
        interfaces: raw.interfaces.clone(),
        annotations: convert_annotations(&raw.annotations),
        fields,
        methods,
        origin: origin.to_string(),
        application,
        errors,
    }
}

fn convert_annotations(raw: &[RawAnnotation]) -> Vec<AnnotationModel> {
    raw.iter().map(convert_annotation).collect()
}

fn convert_annotation(raw: &RawAnnotation) -> AnnotationModel {
    AnnotationModel {
        type_name: raw.type_name.clone(),
        members: raw
            .elements
            .iter()
            .map(|(name, value)| (name.clone(), convert_value(value)))
            .collect(),
    }
}

fn convert_value(raw: &RawValue) -> AnnotationValue {
    match raw {
        RawValue::Int(v) => AnnotationValue::Int(*v),
        RawValue::Float(v) => AnnotationValue::Float(*v),
        RawValue::Bool(v) => AnnotationValue::Bool(*v),
        RawValue::Str(v) => AnnotationValue::Str(v.clone()),
        RawValue::Enum { type_name, value } => AnnotationValue::EnumRef {
            type_name: type_name.clone(),
            value: value.clone(),
        },
        RawValue::Class(v) => AnnotationValue::ClassRef(v.clone()),
        RawValue::Annotation(a) => AnnotationValue::Nested(convert_annotation(a)),
        RawValue::Array(values) => {
            AnnotationValue::Array(values.iter().map(convert_value).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jreverse_classfile::{ArchiveLayout, ClassEntry, RawCall, RawCodeSummary};

    fn raw_class(name: &str) -> RawClass {
        RawClass {
            minor: 0,
            major: 61,
            access_flags: 0x0021,
            name: name.to_string(),
            super_name: Some("java.lang.Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            annotations: Vec::new(),
            source_file: None,
            errors: Vec::new(),
        }
    }

    fn archive_of(classes: Vec<(&str, RawClass)>) -> RawArchive {
        RawArchive {
            layout: ArchiveLayout::PlainJar,
            total_class_entries: classes.len(),
            classes: classes
                .into_iter()
                .map(|(path, class)| ClassEntry {
                    path: path.to_string(),
                    application: true,
                    class,
                })
                .collect(),
            errors: Vec::new(),
        }
    }

    #[test]
    fn test_build_basic_pool() {
        let archive = archive_of(vec![
            ("com/acme/A.class", raw_class("com.acme.A")),
            ("com/acme/B.class", raw_class("com.acme.B")),
        ]);
        let pool = build_pool(&archive, &CancelToken::new());
        assert_eq!(pool.len(), 2);
        let a = pool.get("com.acme.A").unwrap();
        assert_eq!(a.simple_name, "A");
        assert_eq!(a.package, "com.acme");
        assert!(a.errors.is_empty());
    }

    #[test]
    fn test_bad_field_descriptor_degrades_not_fails() {
        let mut raw = raw_class("com.acme.Broken");
        raw.fields.push(jreverse_classfile::RawField {
            name: "x".to_string(),
            descriptor: "Q".to_string(),
            access_flags: 0x0002,
            annotations: Vec::new(),
            signature: None,
        });
        let archive = archive_of(vec![("com/acme/Broken.class", raw)]);
        let pool = build_pool(&archive, &CancelToken::new());
        let class = pool.get("com.acme.Broken").unwrap();
        assert_eq!(class.fields.len(), 1);
        assert_eq!(class.errors.len(), 1);
        assert!(class.errors[0].starts_with("field x"));
    }

    #[test]
    fn test_parser_errors_surface_on_model() {
        let mut raw = raw_class("com.acme.Partial");
        raw.errors
            .push("constant pool index 65535: missing Utf8".to_string());
        let archive = archive_of(vec![("com/acme/Partial.class", raw)]);
        let pool = build_pool(&archive, &CancelToken::new());
        let class = pool.get("com.acme.Partial").unwrap();
        assert!(class.fields.is_empty());
        assert_eq!(class.errors.len(), 1);
        assert!(class.errors[0].contains("65535"));
    }

    #[test]
    fn test_code_summary_carried_into_method_model() {
        let mut raw = raw_class("com.acme.Job");
        raw.methods.push(jreverse_classfile::RawMethod {
            name: "run".to_string(),
            descriptor: "()V".to_string(),
            access_flags: 0x0001,
            annotations: Vec::new(),
            parameter_annotations: Vec::new(),
            exceptions: Vec::new(),
            signature: None,
            code: Some(RawCodeSummary {
                calls: vec![RawCall {
                    owner: "com.acme.Repo".to_string(),
                    name: "findById".to_string(),
                    descriptor: "(J)Lcom/acme/Order;".to_string(),
                    offset: 4,
                    line: Some(17),
                    inside_loop: true,
                }],
                field_ops: Vec::new(),
                complexity: 3,
            }),
        });
        let archive = archive_of(vec![("com/acme/Job.class", raw)]);
        let pool = build_pool(&archive, &CancelToken::new());
        let method = &pool.get("com.acme.Job").unwrap().methods[0];
        assert_eq!(method.complexity, 3);
        assert_eq!(method.call_sites.len(), 1);
        assert!(method.call_sites[0].inside_loop);
        assert_eq!(method.call_sites[0].line, Some(17));
    }

    #[test]
    fn test_cancel_stops_modeling() {
        let archive = archive_of(vec![("com/acme/A.class", raw_class("com.acme.A"))]);
        let token = CancelToken::new();
        token.cancel();
        let pool = build_pool(&archive, &token);
        assert!(pool.is_empty());
    }
}
