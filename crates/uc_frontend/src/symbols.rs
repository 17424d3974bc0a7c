// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

//! The file-scope symbol environment and the symbol-collection pass.
//!
//! Pass A is a single left-to-right traversal over the top-level
//! declarations that interns every type name (class or typedef) so that
//! references may appear before declarations. Member lookup happens
//! later, in the type resolver.

use std::collections::HashMap;

use crate::ast::{Decl, Program, TypeExpr};
use crate::diag::{Diagnostic, Pos};
use crate::types::{
    ClassId, TypeId, TypeTable, BOOLEAN, FLOAT, INT, LONG, STRING, VOID,
};

/// What a type name refers to at file scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeEntry {
    Primitive(TypeId),
    Class(ClassId),
    Typedef(usize),
}

/// Memoization state of a typedef; `InProgress` marks the alias as being
/// unwound so the resolver can detect cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedefState {
    Unresolved,
    InProgress,
    Resolved(TypeId),
}

#[derive(Debug, Clone)]
pub struct TypedefInfo {
    pub name: String,
    pub pos: Pos,
    pub aliased: TypeExpr,
    pub state: TypedefState,
}

/// A free-function signature. Builtins come from the runtime library
/// header and have no declaration in the AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncSig {
    pub name: String,
    pub pos: Pos,
    pub params: Vec<TypeId>,
    pub ret: TypeId,
    pub builtin: bool,
}

/// The global environment of a uC program: type names and function
/// overload sets. Reset per compilation; nothing persists across runs.
pub struct GlobalEnv {
    pub types: HashMap<String, TypeEntry>,
    pub typedefs: Vec<TypedefInfo>,
    pub functions: HashMap<String, Vec<FuncSig>>,
}

impl GlobalEnv {
    pub fn new() -> Self {
        let mut env = GlobalEnv {
            types: HashMap::new(),
            typedefs: Vec::new(),
            functions: HashMap::new(),
        };
        env.install_builtin_types();
        env.install_builtin_functions();
        env
    }

    fn install_builtin_types(&mut self) {
        for (name, id) in [
            ("int", INT),
            ("long", LONG),
            ("float", FLOAT),
            ("boolean", BOOLEAN),
            ("string", STRING),
            ("void", VOID),
        ] {
            self.types.insert(name.to_string(), TypeEntry::Primitive(id));
        }
    }

    fn add_builtin(&mut self, name: &str, params: &[TypeId], ret: TypeId) {
        self.functions.entry(name.to_string()).or_default().push(FuncSig {
            name: name.to_string(),
            pos: Pos::default(),
            params: params.to_vec(),
            ret,
            builtin: true,
        });
    }

    /// The functions provided by the runtime library header, callable
    /// without declaration. The pairwise conversions are the language's
    /// cast mechanism.
    fn install_builtin_functions(&mut self) {
        let convertible = [("int", INT), ("long", LONG), ("float", FLOAT), ("string", STRING)];
        for (from_name, from) in convertible {
            for (to_name, to) in convertible {
                if from != to {
                    self.add_builtin(&format!("{from_name}_to_{to_name}"), &[from], to);
                }
            }
        }
        self.add_builtin("string_to_boolean", &[STRING], BOOLEAN);
        self.add_builtin("boolean_to_string", &[BOOLEAN], STRING);

        // string functions
        self.add_builtin("length", &[STRING], INT);
        self.add_builtin("substr", &[STRING, INT, INT], STRING);
        self.add_builtin("ordinal", &[STRING], INT);
        self.add_builtin("character", &[INT], STRING);

        // numerical functions
        self.add_builtin("pow", &[FLOAT, FLOAT], FLOAT);
        self.add_builtin("sqrt", &[FLOAT], FLOAT);
        self.add_builtin("ceil", &[FLOAT], FLOAT);
        self.add_builtin("floor", &[FLOAT], FLOAT);

        // print functions
        self.add_builtin("print", &[STRING], VOID);
        self.add_builtin("println", &[STRING], VOID);

        // input functions
        self.add_builtin("peekchar", &[], STRING);
        self.add_builtin("readchar", &[], STRING);
        self.add_builtin("readline", &[], STRING);
    }

    pub fn lookup_type(&self, name: &str) -> Option<TypeEntry> {
        self.types.get(name).copied()
    }

    pub fn overloads(&self, name: &str) -> Option<&[FuncSig]> {
        self.functions.get(name).map(|v| v.as_slice())
    }
}

impl Default for GlobalEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Pass A: intern every top-level type name so forward references
/// resolve. Function signatures are registered by the resolver once
/// parameter types are known.
pub fn collect_symbols(
    program: &mut Program,
    table: &mut TypeTable,
    env: &mut GlobalEnv,
    diags: &mut Vec<Diagnostic>,
) {
    for decl in &mut program.decls {
        match decl {
            Decl::Class(class) => {
                let name = class.name.raw.clone();
                if env.types.contains_key(&name) {
                    diags.push(Diagnostic::symbol(
                        class.name.pos,
                        format!("redefinition of type {name}"),
                    ));
                    continue;
                }
                let cid = table.add_class(name.clone(), class.pos);
                env.types.insert(name, TypeEntry::Class(cid));
                class.id = Some(cid);
            }
            Decl::Typedef(td) => {
                let name = td.name.raw.clone();
                if env.types.contains_key(&name) {
                    diags.push(Diagnostic::symbol(
                        td.name.pos,
                        format!("redefinition of type {name}"),
                    ));
                    continue;
                }
                let idx = env.typedefs.len();
                env.typedefs.push(TypedefInfo {
                    name: name.clone(),
                    pos: td.pos,
                    aliased: td.aliased.clone(),
                    state: TypedefState::Unresolved,
                });
                env.types.insert(name, TypeEntry::Typedef(idx));
            }
            Decl::Function(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse_program;

    fn collect(src: &str) -> (Program, TypeTable, GlobalEnv, Vec<Diagnostic>) {
        let toks = lex(src).unwrap();
        let mut prog = parse_program(&toks).unwrap();
        let mut table = TypeTable::new();
        let mut env = GlobalEnv::new();
        let mut diags = Vec::new();
        collect_symbols(&mut prog, &mut table, &mut env, &mut diags);
        (prog, table, env, diags)
    }

    #[test]
    fn interns_classes_and_typedefs() {
        let (prog, table, env, diags) = collect("class foo { int x; } typedef int[] row;");
        assert!(diags.is_empty());
        assert!(matches!(env.lookup_type("foo"), Some(TypeEntry::Class(_))));
        assert!(matches!(env.lookup_type("row"), Some(TypeEntry::Typedef(0))));
        assert_eq!(table.class_count(), 1);
        match &prog.decls[0] {
            Decl::Class(c) => assert!(c.id.is_some()),
            other => panic!("expected class, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_type_names_are_an_error() {
        let (_, _, _, diags) = collect("class foo { int x; } typedef int foo;");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("redefinition of type foo"));
    }

    #[test]
    fn builtin_functions_are_registered() {
        let env = GlobalEnv::new();
        assert!(env.overloads("println").is_some());
        assert!(env.overloads("int_to_string").is_some());
        assert!(env.overloads("string_to_boolean").is_some());
        assert_eq!(env.overloads("substr").unwrap()[0].params.len(), 3);
    }
}
