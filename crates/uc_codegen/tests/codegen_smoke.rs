use uc_codegen::{Codegen, Phase};
use uc_frontend::compile_frontend;

fn generate(src: &str, phase: Phase) -> String {
    let (program, analysis) = compile_frontend(src).expect("frontend should succeed");
    Codegen::new(&analysis.table, phase).generate(&program)
}

#[test]
fn hello_world_full_output_is_exact() {
    let out = generate(
        r#"void main(string[] args)() { println("Hello world!"); }"#,
        Phase::Full,
    );
    let expected = r#"#include "defs.h"
#include "ref.h"
#include "array.h"
#include "library.h"
#include "expr.h"

namespace uc {

  // Forward type declarations


  // Forward function declarations

  UC_PRIMITIVE(void)
    UC_FUNCTION(main)(UC_ARRAY(UC_PRIMITIVE(string)) UC_VAR(args));

  // Full type definitions

  // Full function definitions

  UC_PRIMITIVE(void)
    UC_FUNCTION(main)(UC_ARRAY(UC_PRIMITIVE(string)) UC_VAR(args)) {
      UC_FUNCTION(println)("Hello world!"s);
  }

} // namespace uc

int main(int argc, char **argv) {
  uc::UC_ARRAY(uc::UC_PRIMITIVE(string)) args = uc::uc_make_array_of<uc::UC_PRIMITIVE(string)>();
  for (int i = 1; i < argc; i++) {
    uc::uc_array_push(args, uc::UC_PRIMITIVE(string)(argv[i]));
  }
  uc::UC_FUNCTION(main)(args);
  return 0;
}
"#;
    assert_eq!(out, expected);
}

#[test]
fn emission_is_byte_identical_across_runs() {
    let src = "class foo { int x; } \
               int get(foo f)() { return f.x; } \
               void main(string[] args)() { println(\"\" + get(new foo(1))); }";
    let a = generate(src, Phase::Full);
    let b = generate(src, Phase::Full);
    assert_eq!(a, b);
}

#[test]
fn phase1_emits_types_only() {
    let src = "class foo { int x; int get() { return x; } } \
               void main(string[] args)() { }";
    let out = generate(src, Phase::Types);

    assert!(out.contains("struct UC_TYPEDEF(foo);"));
    assert!(out.contains("  struct UC_TYPEDEF(foo) {"));
    assert!(out.contains("    UC_PRIMITIVE(int) UC_VAR(x);"));
    assert!(out.contains("    UC_TYPEDEF(foo)() = default;"));
    assert!(out.contains("    UC_TYPEDEF(foo)(const UC_PRIMITIVE(int) &var0) {"));
    assert!(out.contains("      UC_VAR(x) = var0;"));
    assert!(out.contains("operator==(const UC_TYPEDEF(foo) &rhs) const {"));
    assert!(out.contains("      return UC_VAR(x) == rhs.UC_VAR(x);"));
    assert!(out.contains("return !((*this)==rhs);"));

    // no signatures, no bodies, no bootstrap
    assert!(!out.contains("// Forward function declarations"));
    assert!(!out.contains("virtual"));
    assert!(!out.contains("UC_FUNCTION(main)"));
    assert!(!out.contains("int main("));
}

#[test]
fn phase2_adds_signatures_without_bodies() {
    let src = "class foo { int x; int get() { return x; } } \
               void main(string[] args)() { println(\"hi\"); }";
    let out = generate(src, Phase::Signatures);

    assert!(out.contains("// Forward function declarations"));
    assert!(out.contains("  UC_PRIMITIVE(void)"));
    assert!(out.contains("    UC_FUNCTION(main)(UC_ARRAY(UC_PRIMITIVE(string)) UC_VAR(args));"));
    assert!(out.contains("    virtual UC_PRIMITIVE(int) UC_VAR(get)();"));

    assert!(!out.contains("// Full function definitions"));
    assert!(!out.contains("UC_FUNCTION(println)"));
    assert!(!out.contains("int main("));
}

#[test]
fn inherited_fields_come_first_in_constructor_and_equality() {
    let src = "class base { int a; } class derived : base { string b; } \
               void main(string[] args)() { }";
    let out = generate(src, Phase::Types);

    assert!(out.contains("struct UC_TYPEDEF(derived) : UC_TYPEDEF(base) {"));
    assert!(out.contains(
        "UC_TYPEDEF(derived)(const UC_PRIMITIVE(int) &var0, const UC_PRIMITIVE(string) &var1) {"
    ));
    assert!(out.contains("      UC_VAR(a) = var0;"));
    assert!(out.contains("      UC_VAR(b) = var1;"));
    assert!(out.contains("return UC_VAR(a) == rhs.UC_VAR(a) && UC_VAR(b) == rhs.UC_VAR(b);"));
}

#[test]
fn field_defaults_become_member_initializers() {
    let src = "class counter { int start = 5; } void main(string[] args)() { }";
    let out = generate(src, Phase::Types);
    assert!(out.contains("    UC_PRIMITIVE(int) UC_VAR(start) = 5;"));
}

#[test]
fn typedefs_emit_using_aliases() {
    let src = "typedef int[] row; typedef int(int, int) binop; \
               void main(string[] args)() { }";
    let out = generate(src, Phase::Types);
    assert!(out.contains("  using UC_TYPEDEF(row) = UC_ARRAY(UC_PRIMITIVE(int));"));
    assert!(out.contains(
        "  using UC_TYPEDEF(binop) = UC_PRIMITIVE(int) (UC_PRIMITIVE(int), UC_PRIMITIVE(int));"
    ));
}

#[test]
fn forward_references_emit_before_definitions() {
    let src = "class foo { baz b; } class baz { string s; } \
               void main(string[] args)() { }";
    let out = generate(src, Phase::Types);
    let fwd_foo = out.find("struct UC_TYPEDEF(foo);").expect("foo forward decl");
    let fwd_baz = out.find("struct UC_TYPEDEF(baz);").expect("baz forward decl");
    let def_foo = out.find("struct UC_TYPEDEF(foo) {").expect("foo definition");
    assert!(fwd_foo < def_foo);
    assert!(fwd_baz < def_foo);
    assert!(out.contains("    UC_REFERENCE(baz) UC_VAR(b);"));
}

#[test]
fn null_lowers_to_default_constructed_reference() {
    let src = "class foo { int x; } \
               foo make()() { return null; } \
               void main(string[] args)() { foo f; f = null; int[] a; a = null; }";
    let out = generate(src, Phase::Full);
    assert!(out.contains("return UC_REFERENCE(foo){};"));
    assert!(out.contains("UC_VAR(f) = UC_REFERENCE(foo){};"));
    assert!(out.contains("UC_VAR(a) = UC_ARRAY(UC_PRIMITIVE(int)){};"));
}

#[test]
fn plus_lowers_to_uc_add() {
    let src = "string greet(int n)() { return \"n = \" + n; } \
               void main(string[] args)() { }";
    let out = generate(src, Phase::Full);
    assert!(out.contains("return uc_add(\"n = \"s, UC_VAR(n));"));
}

#[test]
fn length_access_lowers_to_uc_length_field_for_both_overloads() {
    let src = "class sized { int length; } \
               int f(sized s, int[] a)() { return s.length + a.length; } \
               void main(string[] args)() { }";
    let out = generate(src, Phase::Full);
    assert!(out
        .contains("return uc_add(uc_length_field(UC_VAR(s)), uc_length_field(UC_VAR(a)));"));
}

#[test]
fn allocation_and_indexing_lower_to_runtime_helpers() {
    let src = "class foo { int x; } \
               void main(string[] args)() { \
                 foo f; f = new foo(7); \
                 int[] a; a = new int[5]; \
                 string[] s; s = new string[]; \
                 a[0] = f.x; \
                 a << 1; \
                 a >> null; \
               }";
    let out = generate(src, Phase::Full);
    assert!(out.contains("UC_VAR(f) = uc_make_object<UC_REFERENCE(foo)>(7);"));
    assert!(out.contains("UC_VAR(a) = uc_make_array_of<UC_PRIMITIVE(int)>(5);"));
    assert!(out.contains("UC_VAR(s) = uc_make_array_of<UC_PRIMITIVE(string)>();"));
    assert!(out.contains("uc_array_index(UC_VAR(a), 0) = UC_VAR(f)->UC_VAR(x);"));
    assert!(out.contains("uc_array_push(UC_VAR(a), 1);"));
    assert!(out.contains("uc_array_pop(UC_VAR(a), nullptr);"));
}

#[test]
fn method_calls_lower_through_the_receiver_handle() {
    let src = "class counter { \
                 int n; \
                 int bump(int by) { n = n + by; return n; } \
                 int twice() { return bump(2); } \
               } \
               void main(string[] args)() { \
                 counter c; c = new counter(0); \
                 c.bump(1); \
               }";
    let out = generate(src, Phase::Full);
    // explicit receiver
    assert!(out.contains("UC_VAR(c)->UC_VAR(bump)(1);"));
    // implicit receiver inside a method
    assert!(out.contains("return UC_VAR(bump)(2);"));
    // out-of-line definition
    assert!(out.contains("    UC_TYPEDEF(counter)::UC_VAR(bump)(UC_PRIMITIVE(int) UC_VAR(by)) {"));
}

#[test]
fn object_id_lowers_to_uc_id() {
    let src = "class foo { } long f(foo p)() { return #p; } void main(string[] args)() { }";
    let out = generate(src, Phase::Full);
    assert!(out.contains("return uc_id(UC_VAR(p));"));
}

#[test]
fn control_flow_maps_one_to_one() {
    let src = "int f(int x)() { \
                 for (int i = 0; i < x; ++i) { \
                   if (i % 2 == 0) { continue; } else { break; } \
                 } \
                 while (x > 0) { x = x - 1; } \
                 return x; \
               } \
               void main(string[] args)() { }";
    let out = generate(src, Phase::Full);
    assert!(out.contains(
        "for (UC_PRIMITIVE(int) UC_VAR(i) = 0; (UC_VAR(i)) < (UC_VAR(x)); ++(UC_VAR(i))) {"
    ));
    assert!(out.contains("if (((UC_VAR(i)) % (2)) == (0)) {"));
    assert!(out.contains("continue;"));
    assert!(out.contains("break;"));
    assert!(out.contains("while ((UC_VAR(x)) > (0)) {"));
    assert!(out.contains("UC_VAR(x) = (UC_VAR(x)) - (1);"));
}

#[test]
fn locals_group_is_declared_at_the_top_of_the_body() {
    let src = "int f(int x)(int tmp) { tmp = x; return tmp; } void main(string[] args)() { }";
    let out = generate(src, Phase::Full);
    assert!(out.contains("      UC_PRIMITIVE(int) UC_VAR(tmp);\n      UC_VAR(tmp) = UC_VAR(x);"));
}

#[test]
fn hidden_inherited_overloads_are_reexposed() {
    let src = "class base { int get() { return 0; } } \
               class derived : base { int get(int bump) { return bump; } } \
               void main(string[] args)() { }";
    let out = generate(src, Phase::Signatures);
    assert!(out.contains("    using UC_TYPEDEF(base)::UC_VAR(get);"));
}
