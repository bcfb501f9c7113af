//! End-to-end scenarios asserted against the generated assembly's
//! structure and text. None of these invoke an assembler or linker —
//! there's no ARM64 macOS host to run the result on here, so each test
//! checks that the right instruction sequences and label relationships
//! were emitted.

use tpc::config::CompilerConfig;
use tpc::compile_source_to_asm;

fn compile(src: &str) -> String {
    compile_source_to_asm(src, "t.pas", &CompilerConfig::new())
        .unwrap_or_else(|e| panic!("expected successful compile, got: {e}"))
}

/// Every `b L<n>` / `bl L<n>` in the output names a label that is also
/// defined exactly once as `L<n>:`.
fn assert_labels_resolve(asm: &str) {
    for line in asm.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("b L").or_else(|| line.strip_prefix("bl L")) {
            let label = rest.split_whitespace().next().unwrap_or(rest);
            let def = format!("L{label}:");
            assert_eq!(
                asm.matches(&def).count(),
                1,
                "label {label} referenced but not defined exactly once in:\n{asm}"
            );
        }
    }
}

#[test]
fn arithmetic_precedence_and_print() {
    let asm = compile("program P; begin writeln(1+2*3) end.");
    assert_labels_resolve(&asm);
    assert_eq!(asm.matches("_main:").count(), 1);

    let mul_pos = asm.find("mul x0, x0, x1").expect("multiply emitted");
    let add_pos = asm.find("add x0, x0, x1").expect("add emitted");
    assert!(mul_pos < add_pos, "multiplication must bind tighter than addition");
}

#[test]
fn for_loop_structure_is_present() {
    let asm = compile("program P; var i:integer; begin for i:=1 to 3 do write(i); writeln end.");
    assert_labels_resolve(&asm);
    assert!(asm.contains("b.gt"), "ascending for-loop compares with b.gt to exit");
}

#[test]
fn recursive_function_call_compiles_with_a_static_link_walk() {
    let src = "program P; \
               function fact(n:integer):integer; \
               begin if n<=1 then fact:=1 else fact:=n*fact(n-1) end; \
               begin writeln(fact(5)) end.";
    let asm = compile(src);
    assert_labels_resolve(&asm);

    // The top-level call site (`fact(5)` from main, same level as `fact`'s
    // declaration) passes its static link with zero hops: `mov x9, x29`
    // directly followed by `bl`.
    assert!(asm.contains("mov x9, x29\n    bl L"));

    // The self-call inside `fact`'s own body executes one level deeper
    // than `fact` was declared at, so it walks exactly one static link hop.
    assert!(asm.contains("mov x9, x29\n    ldur x9, [x9, #-8]\n    bl L"));
}

#[test]
fn array_indexing_emits_address_arithmetic_and_interns_literal() {
    let src = "program P; var a:array[1..3] of integer; i:integer; \
               begin for i:=1 to 3 do a[i]:=i*i; \
               for i:=1 to 3 do write(a[i],' '); writeln end.";
    let asm = compile(src);
    assert_labels_resolve(&asm);
    assert!(asm.contains("lsl x0, x0, #3"), "array stride is 8 bytes (shift by 3)");
    assert!(asm.contains(".ascii \" \""), "space literal interned in the string pool");
}

#[test]
fn nested_procedure_reaches_enclosing_local_with_one_hop() {
    let src = "program P; \
               procedure outer; var x:integer; \
               procedure inner; begin x:=x+1 end; \
               begin x:=10; inner; inner; writeln(x) end; \
               begin outer end.";
    let asm = compile(src);
    assert_labels_resolve(&asm);
    // inner's access to outer's `x` walks exactly one static link hop.
    assert!(asm.contains("ldur x8, [x8, #-8]"));
}

#[test]
fn readchar_and_writechar_builtins_compile() {
    let src = "program P; var c:integer; \
               begin c:=readchar; while c<>-1 do begin writechar(c); c:=readchar end end.";
    let asm = compile(src);
    assert_labels_resolve(&asm);
    // Two `readchar` call sites and one `writechar` call site in source.
    assert!(asm.matches("bl L").count() >= 3);
}

#[test]
fn case_insensitive_symbol_resolution() {
    let asm = compile("program P; var Count:integer; begin COUNT := 1; writeln(count) end.");
    assert_labels_resolve(&asm);
}

#[test]
fn forward_declaration_shares_a_single_label_with_its_body() {
    let src = "program P; \
               procedure greet(name:integer); forward; \
               procedure greet(name:integer); begin writeln(name) end; \
               begin greet(1) end.";
    let asm = compile(src);
    assert_labels_resolve(&asm);
    assert_eq!(asm.matches("// Procedure greet").count(), 1);
}

#[test]
fn large_integer_literal_uses_movz_movk_ladder() {
    let asm = compile("program P; begin writeln(4611686018427387904) end.");
    assert!(asm.contains("movz"));
}

#[test]
fn negative_large_integer_literal_negates_after_ladder() {
    let asm = compile("program P; begin writeln(-4611686018427387904) end.");
    assert!(asm.contains("movz"));
    assert!(asm.contains("neg x0, x0"));
}

#[test]
fn more_than_eight_parameters_is_rejected() {
    let src = "program P; \
               procedure p(a,b,c,d,e,f,g,h,i:integer); begin end; \
               begin end.";
    let err = compile_source_to_asm(src, "t.pas", &CompilerConfig::new()).unwrap_err();
    assert!(err.to_string().contains("more than 8 parameters"));
}

#[test]
fn undefined_identifier_is_a_semantic_error() {
    let src = "program P; begin writeln(nope) end.";
    let err = compile_source_to_asm(src, "t.pas", &CompilerConfig::new()).unwrap_err();
    assert!(err.to_string().contains("undefined identifier"));
}
