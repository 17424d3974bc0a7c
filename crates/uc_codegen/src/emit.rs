// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

//! The output writer, the fixed header/footer, and the declaration
//! sections (forward type declarations, typedef aliases, and function
//! signatures). Emission is deterministic: identifier order follows
//! source order and two runs over the same input produce byte-identical
//! text.

use uc_frontend::ast::{Decl, FunctionDecl, Program};

use crate::mangle;
use crate::{Codegen, Phase};

pub struct Writer {
    out: String,
    pub indent: usize,
}

impl Writer {
    pub fn new() -> Self {
        Self { out: String::new(), indent: 0 }
    }

    /// A line at the current indent (two spaces per level).
    pub fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    /// A line with no indent, for the header/footer skeleton.
    pub fn raw_line(&mut self, text: impl AsRef<str>) {
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    pub fn finish(self) -> String {
        self.out
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

/// The runtime-library includes, and the `uc` namespace that wraps all
/// emitted content.
pub fn gen_header(w: &mut Writer) {
    w.raw_line("#include \"defs.h\"");
    w.raw_line("#include \"ref.h\"");
    w.raw_line("#include \"array.h\"");
    w.raw_line("#include \"library.h\"");
    w.raw_line("#include \"expr.h\"");
    w.blank();
    w.raw_line("namespace uc {");
    w.blank();
}

/// Close the namespace; the full phase also bootstraps execution by
/// marshalling `argv` into a uC string array and calling `main`.
pub fn gen_footer(w: &mut Writer, phase: Phase) {
    w.raw_line("} // namespace uc");
    if phase >= Phase::Full {
        w.blank();
        w.raw_line("int main(int argc, char **argv) {");
        w.raw_line(
            "  uc::UC_ARRAY(uc::UC_PRIMITIVE(string)) args = \
             uc::uc_make_array_of<uc::UC_PRIMITIVE(string)>();",
        );
        w.raw_line("  for (int i = 1; i < argc; i++) {");
        w.raw_line("    uc::uc_array_push(args, uc::UC_PRIMITIVE(string)(argv[i]));");
        w.raw_line("  }");
        w.raw_line("  uc::UC_FUNCTION(main)(args);");
        w.raw_line("  return 0;");
        w.raw_line("}");
    }
}

/// Forward type declarations: one `struct` line per class, then the
/// `using` alias for every source typedef, each group in source order.
pub fn gen_type_decls(cg: &Codegen<'_>, program: &Program, w: &mut Writer) {
    w.indent = 1;
    w.line("// Forward type declarations");
    w.blank();
    for decl in &program.decls {
        if let Decl::Class(class) = decl {
            w.line(format!("struct {};", mangle::type_def(&class.name.raw)));
        }
    }
    for decl in &program.decls {
        if let Decl::Typedef(td) = decl {
            let aliased = td.aliased.resolved.expect("typedef unresolved after analysis");
            w.line(format!(
                "using {} = {};",
                mangle::type_def(&td.name.raw),
                mangle::mangle_type(cg.table, aliased)
            ));
        }
    }
    w.blank();
}

/// Forward function declarations (signatures only), in source order.
pub fn gen_function_decls(cg: &Codegen<'_>, program: &Program, w: &mut Writer) {
    w.indent = 1;
    w.line("// Forward function declarations");
    w.blank();
    for decl in &program.decls {
        if let Decl::Function(func) = decl {
            let ret = func.ret.resolved.expect("return type unresolved after analysis");
            w.line(mangle::mangle_type(cg.table, ret));
            w.indent += 1;
            w.line(format!(
                "{}({});",
                mangle::function(&func.name.raw),
                param_text(cg, func)
            ));
            w.indent -= 1;
        }
    }
    w.blank();
}

/// The parameter list of a function or method, macro-wrapped, joined
/// with bare commas.
pub fn param_text(cg: &Codegen<'_>, func: &FunctionDecl) -> String {
    let params: Vec<String> = func
        .params
        .iter()
        .map(|p| {
            let ty = p.ty.resolved.expect("parameter type unresolved after analysis");
            format!("{} {}", mangle::mangle_type(cg.table, ty), mangle::var(&p.name.raw))
        })
        .collect();
    params.join(",")
}
