//! JVM descriptor decoding into readable dotted type names.

use crate::error::ParseError;

fn err(descriptor: &str) -> ParseError {
    ParseError::Descriptor {
        descriptor: descriptor.to_string(),
    }
}

/// Parse one type starting at `chars`, returning the readable name and the
/// number of descriptor characters consumed.
fn parse_one(descriptor: &str, full: &str) -> Result<(String, usize), ParseError> {
    let mut chars = descriptor.chars();
    match chars.next().ok_or_else(|| err(full))? {
        'B' => Ok(("byte".to_string(), 1)),
        'C' => Ok(("char".to_string(), 1)),
        'D' => Ok(("double".to_string(), 1)),
        'F' => Ok(("float".to_string(), 1)),
        'I' => Ok(("int".to_string(), 1)),
        'J' => Ok(("long".to_string(), 1)),
        'S' => Ok(("short".to_string(), 1)),
        'Z' => Ok(("boolean".to_string(), 1)),
        'V' => Ok(("void".to_string(), 1)),
        'L' => {
            let end = descriptor.find(';').ok_or_else(|| err(full))?;
            let name = descriptor[1..end].replace('/', ".");
            Ok((name, end + 1))
        }
        '[' => {
            let (inner, consumed) = parse_one(&descriptor[1..], full)?;
            Ok((format!("{inner}[]"), consumed + 1))
        }
        _ => Err(err(full)),
    }
}

/// Decode a field descriptor, e.g. `[Ljava/lang/String;` → `java.lang.String[]`.
pub fn field_type(descriptor: &str) -> Result<String, ParseError> {
    let (name, consumed) = parse_one(descriptor, descriptor)?;
    if consumed != descriptor.len() {
        return Err(err(descriptor));
    }
    Ok(name)
}

/// Decode a method descriptor into `(parameter types, return type)`.
pub fn method_signature(descriptor: &str) -> Result<(Vec<String>, String), ParseError> {
    let rest = descriptor.strip_prefix('(').ok_or_else(|| err(descriptor))?;
    let close = rest.find(')').ok_or_else(|| err(descriptor))?;
    let (mut params_desc, return_desc) = (&rest[..close], &rest[close + 1..]);

    let mut params = Vec::new();
    while !params_desc.is_empty() {
        let (name, consumed) = parse_one(params_desc, descriptor)?;
        params.push(name);
        params_desc = &params_desc[consumed..];
    }
    let ret = field_type(return_desc).map_err(|_| err(descriptor))?;
    Ok((params, ret))
}

/// Decode an annotation type descriptor (`Lx/y/Z;` → `x.y.Z`), tolerating a
/// bare internal name as some older compilers emit.
pub fn annotation_type(descriptor: &str) -> String {
    match field_type(descriptor) {
        Ok(name) => name,
        Err(_) => descriptor.replace('/', "."),
    }
}

/// Extract the first reference type argument from a generic field signature,
/// e.g. `Ljava/util/List<Lcom/acme/Order;>;` → `com.acme.Order`. Used to
/// resolve collection-valued JPA association targets.
pub fn generic_element_type(signature: &str) -> Option<String> {
    let open = signature.find('<')?;
    let inner = &signature[open + 1..];
    let start = inner.find('L')?;
    let tail = &inner[start + 1..];
    let end = tail.find(|c| c == ';' || c == '<')?;
    let name = &tail[..end];
    if name.is_empty() {
        return None;
    }
    Some(name.replace('/', "."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_types() {
        assert_eq!(field_type("I").unwrap(), "int");
        assert_eq!(field_type("Ljava/lang/String;").unwrap(), "java.lang.String");
        assert_eq!(
            field_type("[Ljava/lang/String;").unwrap(),
            "java.lang.String[]"
        );
        assert_eq!(field_type("[[I").unwrap(), "int[][]");
        assert!(field_type("Q").is_err());
        assert!(field_type("II").is_err(), "trailing characters rejected");
    }

    #[test]
    fn test_method_signatures() {
        let (params, ret) =
            method_signature("(ILjava/lang/String;[J)Lcom/acme/Widget;").unwrap();
        assert_eq!(params, vec!["int", "java.lang.String", "long[]"]);
        assert_eq!(ret, "com.acme.Widget");

        let (params, ret) = method_signature("()V").unwrap();
        assert!(params.is_empty());
        assert_eq!(ret, "void");

        assert!(method_signature("I)V").is_err());
    }

    #[test]
    fn test_annotation_type_tolerates_bare_names() {
        assert_eq!(
            annotation_type("Lorg/springframework/stereotype/Service;"),
            "org.springframework.stereotype.Service"
        );
        assert_eq!(annotation_type("org/x/Y"), "org.x.Y");
    }

    #[test]
    fn test_generic_element_type() {
        assert_eq!(
            generic_element_type("Ljava/util/List<Lcom/acme/Order;>;").as_deref(),
            Some("com.acme.Order")
        );
        assert_eq!(
            generic_element_type("Ljava/util/Map<Ljava/lang/String;Lcom/acme/Order;>;").as_deref(),
            Some("java.lang.String")
        );
        assert_eq!(generic_element_type("Ljava/util/List;"), None);
    }
}
