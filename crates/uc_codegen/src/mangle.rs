// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

//! Name mangling shared by every emission phase.
//!
//! Source identifiers are always wrapped in a runtime-header macro so the
//! header controls the eventual C++ identifier: `UC_TYPEDEF` names the
//! struct generated for a class, `UC_REFERENCE` its handle type,
//! `UC_ARRAY`/`UC_PRIMITIVE` compound and primitive types, `UC_VAR`
//! variables and fields, and `UC_FUNCTION` free functions.

use uc_frontend::types::{TypeId, TypeKind, TypeTable};

/// The C++ type text for a semantic type.
pub fn mangle_type(table: &TypeTable, id: TypeId) -> String {
    match table.kind(id) {
        TypeKind::Primitive(p) => format!("UC_PRIMITIVE({})", p.name()),
        TypeKind::Class(cid) => format!("UC_REFERENCE({})", table.class(*cid).name),
        TypeKind::Array(elem) => format!("UC_ARRAY({})", mangle_type(table, *elem)),
        TypeKind::Function { params, ret } => {
            let params: Vec<String> = params.iter().map(|p| mangle_type(table, *p)).collect();
            format!("{} ({})", mangle_type(table, *ret), params.join(", "))
        }
        TypeKind::Null => panic!("the null type has no emitted form"),
    }
}

/// The struct name emitted for a class or source typedef.
pub fn type_def(name: &str) -> String {
    format!("UC_TYPEDEF({name})")
}

pub fn var(name: &str) -> String {
    format!("UC_VAR({name})")
}

pub fn function(name: &str) -> String {
    format!("UC_FUNCTION({name})")
}
