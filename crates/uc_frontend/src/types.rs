// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

//! Semantic types.
//!
//! Types are interned in a [`TypeTable`] and referred to by dense
//! [`TypeId`]s, so structural equality of types is id equality. Class
//! definitions live in the same arena and are referred to by [`ClassId`];
//! semantic type values carry ids rather than owning pointers, which keeps
//! the (cyclic) class reference graph simple to traverse.

use std::collections::HashMap;

use crate::diag::Pos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn from_index(index: usize) -> Self {
        ClassId(index as u32)
    }
}

/// Primitive types of the language. `Void` is only legal as a return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int,
    Long,
    Float,
    Boolean,
    String,
    Void,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Boolean => "boolean",
            Primitive::String => "string",
            Primitive::Void => "void",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Primitive(Primitive),
    /// The type of the `null` literal, assignable to any reference type.
    Null,
    Class(ClassId),
    Array(TypeId),
    Function { params: Vec<TypeId>, ret: TypeId },
}

/// A field of a class, either declared or inherited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub pos: Pos,
    pub ty: TypeId,
}

/// A method signature. Bodies stay in the AST; the signature is all the
/// checker and the emitter need for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    pub name: String,
    pub pos: Pos,
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub pos: Pos,
    pub superclass: Option<ClassId>,
    /// Declared fields, in source order.
    pub fields: Vec<Field>,
    /// Inherited fields first, then declared ones. Computed by the type
    /// resolver once the superclass links are in place.
    pub field_table: Vec<Field>,
    /// Declared method signatures, in source order.
    pub methods: Vec<MethodSig>,
    /// Proper ancestors, nearest first. Cached by the resolver.
    pub ancestors: Vec<ClassId>,
}

pub const INT: TypeId = TypeId(0);
pub const LONG: TypeId = TypeId(1);
pub const FLOAT: TypeId = TypeId(2);
pub const BOOLEAN: TypeId = TypeId(3);
pub const STRING: TypeId = TypeId(4);
pub const VOID: TypeId = TypeId(5);
pub const NULL: TypeId = TypeId(6);

pub struct TypeTable {
    kinds: Vec<TypeKind>,
    arrays: HashMap<TypeId, TypeId>,
    functions: HashMap<(Vec<TypeId>, TypeId), TypeId>,
    classes: Vec<ClassInfo>,
    class_types: Vec<TypeId>,
}

impl TypeTable {
    pub fn new() -> Self {
        let kinds = vec![
            TypeKind::Primitive(Primitive::Int),
            TypeKind::Primitive(Primitive::Long),
            TypeKind::Primitive(Primitive::Float),
            TypeKind::Primitive(Primitive::Boolean),
            TypeKind::Primitive(Primitive::String),
            TypeKind::Primitive(Primitive::Void),
            TypeKind::Null,
        ];
        Self {
            kinds,
            arrays: HashMap::new(),
            functions: HashMap::new(),
            classes: Vec::new(),
            class_types: Vec::new(),
        }
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.kinds[id.0 as usize]
    }

    fn intern(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.kinds.len() as u32);
        self.kinds.push(kind);
        id
    }

    /// The array type over `elem`, interned once.
    pub fn array_of(&mut self, elem: TypeId) -> TypeId {
        if let Some(&id) = self.arrays.get(&elem) {
            return id;
        }
        let id = self.intern(TypeKind::Array(elem));
        self.arrays.insert(elem, id);
        id
    }

    pub fn function_of(&mut self, params: Vec<TypeId>, ret: TypeId) -> TypeId {
        if let Some(&id) = self.functions.get(&(params.clone(), ret)) {
            return id;
        }
        let id = self.intern(TypeKind::Function { params: params.clone(), ret });
        self.functions.insert((params, ret), id);
        id
    }

    pub fn add_class(&mut self, name: impl Into<String>, pos: Pos) -> ClassId {
        let cid = ClassId(self.classes.len() as u32);
        self.classes.push(ClassInfo {
            name: name.into(),
            pos,
            superclass: None,
            fields: Vec::new(),
            field_table: Vec::new(),
            methods: Vec::new(),
            ancestors: Vec::new(),
        });
        let tid = self.intern(TypeKind::Class(cid));
        self.class_types.push(tid);
        cid
    }

    pub fn class(&self, id: ClassId) -> &ClassInfo {
        &self.classes[id.index()]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassInfo {
        &mut self.classes[id.index()]
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn class_type(&self, id: ClassId) -> TypeId {
        self.class_types[id.index()]
    }

    /// Human-readable name of a type, used in diagnostics.
    pub fn name(&self, id: TypeId) -> String {
        match self.kind(id) {
            TypeKind::Primitive(p) => p.name().to_string(),
            TypeKind::Null => "null".to_string(),
            TypeKind::Class(c) => self.class(*c).name.clone(),
            TypeKind::Array(e) => format!("{}[]", self.name(*e)),
            TypeKind::Function { params, ret } => {
                let params: Vec<String> = params.iter().map(|p| self.name(*p)).collect();
                format!("{}({})", self.name(*ret), params.join(", "))
            }
        }
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        id == INT || id == LONG || id == FLOAT
    }

    pub fn is_integral(&self, id: TypeId) -> bool {
        id == INT || id == LONG
    }

    /// Reference types are class and array types: everything handled
    /// through a handle in the emitted C++.
    pub fn is_reference(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Class(_) | TypeKind::Array(_))
    }

    /// Whether `sub` is `ancestor` or a descendant of it.
    pub fn is_subclass(&self, sub: ClassId, ancestor: ClassId) -> bool {
        sub == ancestor || self.class(sub).ancestors.contains(&ancestor)
    }

    /// Assignability of a value of type `from` to a slot of type `to`:
    /// identical types, null to a reference type, numeric widening, or a
    /// subclass to one of its ancestors.
    pub fn is_assignable(&self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return true;
        }
        if from == NULL && self.is_reference(to) {
            return true;
        }
        if from == INT && (to == LONG || to == FLOAT) {
            return true;
        }
        if from == LONG && to == FLOAT {
            return true;
        }
        if let (TypeKind::Class(a), TypeKind::Class(b)) = (self.kind(from), self.kind(to)) {
            return self.is_subclass(*a, *b);
        }
        false
    }

    /// Numeric promotion for arithmetic: float dominates, then long.
    pub fn join_numeric(&self, a: TypeId, b: TypeId) -> Option<TypeId> {
        if !self.is_numeric(a) || !self.is_numeric(b) {
            return None;
        }
        if a == FLOAT || b == FLOAT {
            Some(FLOAT)
        } else if a == LONG || b == LONG {
            Some(LONG)
        } else {
            Some(INT)
        }
    }

    /// Whether `==`/`!=` may compare the two types: identical non-void
    /// types, assignability in either direction (numeric widening, null
    /// against a reference), or two classes sharing an ancestor.
    pub fn is_comparable(&self, a: TypeId, b: TypeId) -> bool {
        if a == VOID || b == VOID {
            return false;
        }
        if a == b {
            return true;
        }
        if self.is_assignable(a, b) || self.is_assignable(b, a) {
            return true;
        }
        if let (TypeKind::Class(ca), TypeKind::Class(cb)) = (self.kind(a), self.kind(b)) {
            let cb_chain = &self.class(*cb).ancestors;
            if self.class(*ca).ancestors.iter().any(|anc| *anc == *cb || cb_chain.contains(anc)) {
                return true;
            }
        }
        false
    }

    /// The field named `name` in the class's field table (declared or
    /// inherited).
    pub fn lookup_field(&self, class: ClassId, name: &str) -> Option<&Field> {
        self.class(class).field_table.iter().find(|f| f.name == name)
    }

    /// All method signatures named `name` visible on `class`, nearest
    /// class first. An override (identical parameter list) shadows the
    /// inherited signature.
    pub fn lookup_methods(&self, class: ClassId, name: &str) -> Vec<&MethodSig> {
        let mut out: Vec<&MethodSig> = Vec::new();
        let chain = std::iter::once(class).chain(self.class(class).ancestors.iter().copied());
        for cid in chain {
            for sig in self.class(cid).methods.iter().filter(|m| m.name == name) {
                if !out.iter().any(|seen| seen.params == sig.params) {
                    out.push(sig);
                }
            }
        }
        out
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}
