//! The four fixed runtime subroutines emitted once at the start of every
//! compiled program: integer printing, newline, a single read-char, and a
//! single write-char. Each is an ordinary ARM64 routine with its own
//! prologue/epilogue; none of them use the static-link convention since
//! they never access Pascal-level variables.

use crate::codegen::emitter::Emitter;
use crate::error::CompileError;

pub struct RuntimeLabels {
    pub print_int: u32,
    pub newline: u32,
    pub readchar: u32,
    pub print_char: u32,
}

pub fn emit_runtime_prelude(e: &mut Emitter) -> Result<RuntimeLabels, CompileError> {
    let print_int = emit_print_int_routine(e)?;
    let newline = emit_newline_routine(e)?;
    let readchar = emit_readchar_routine(e)?;
    let print_char = emit_print_char_routine(e)?;
    Ok(RuntimeLabels {
        print_int,
        newline,
        readchar,
        print_char,
    })
}

fn emit_print_int_routine(e: &mut Emitter) -> Result<u32, CompileError> {
    let label = e.new_label();
    e.raw(format_args!("\n// Print integer routine"))?;
    e.label(label)?;

    e.instr(format_args!("stp x29, x30, [sp, #-16]!"))?;
    e.instr(format_args!("mov x29, sp"))?;
    e.instr(format_args!("sub sp, sp, #32"))?;

    e.instr(format_args!("mov x19, x0"))?;
    e.instr(format_args!("mov x20, #0"))?;

    let positive = e.new_label();
    e.instr(format_args!("cmp x19, #0"))?;
    e.instr(format_args!("b.ge L{positive}"))?;

    e.instr(format_args!("mov x0, #'-'"))?;
    e.instr(format_args!("strb w0, [sp]"))?;
    e.instr(format_args!("mov x0, #1"))?;
    e.instr(format_args!("mov x1, sp"))?;
    e.instr(format_args!("mov x2, #1"))?;
    e.write_syscall()?;
    e.instr(format_args!("neg x19, x19"))?;

    e.label(positive)?;

    let not_zero = e.new_label();
    e.instr(format_args!("cmp x19, #0"))?;
    e.instr(format_args!("b.ne L{not_zero}"))?;

    e.instr(format_args!("mov x0, #'0'"))?;
    e.instr(format_args!("strb w0, [sp]"))?;
    e.instr(format_args!("mov x0, #1"))?;
    e.instr(format_args!("mov x1, sp"))?;
    e.instr(format_args!("mov x2, #1"))?;
    e.write_syscall()?;
    let done = e.new_label();
    e.instr(format_args!("b L{done}"))?;

    e.label(not_zero)?;

    let loop_ = e.new_label();
    let loop_done = e.new_label();
    e.label(loop_)?;

    e.instr(format_args!("cmp x19, #0"))?;
    e.instr(format_args!("b.eq L{loop_done}"))?;

    e.instr(format_args!("mov x21, #10"))?;
    e.instr(format_args!("sdiv x22, x19, x21"))?;
    e.instr(format_args!("msub x23, x22, x21, x19"))?;
    e.instr(format_args!("add x23, x23, #'0'"))?;

    e.instr(format_args!("add x24, sp, x20"))?;
    e.instr(format_args!("strb w23, [x24]"))?;

    e.instr(format_args!("add x20, x20, #1"))?;
    e.instr(format_args!("mov x19, x22"))?;
    e.instr(format_args!("b L{loop_}"))?;

    e.label(loop_done)?;

    let print_loop = e.new_label();
    let print_done = e.new_label();
    e.label(print_loop)?;

    e.instr(format_args!("cmp x20, #0"))?;
    e.instr(format_args!("b.eq L{print_done}"))?;

    e.instr(format_args!("sub x20, x20, #1"))?;
    e.instr(format_args!("add x24, sp, x20"))?;
    e.instr(format_args!("ldrb w0, [x24]"))?;
    e.instr(format_args!("strb w0, [sp, #31]"))?;

    e.instr(format_args!("mov x0, #1"))?;
    e.instr(format_args!("add x1, sp, #31"))?;
    e.instr(format_args!("mov x2, #1"))?;
    e.write_syscall()?;

    e.instr(format_args!("b L{print_loop}"))?;

    e.label(print_done)?;
    e.label(done)?;

    e.instr(format_args!("add sp, sp, #32"))?;
    e.instr(format_args!("ldp x29, x30, [sp], #16"))?;
    e.instr(format_args!("ret"))?;

    Ok(label)
}

fn emit_newline_routine(e: &mut Emitter) -> Result<u32, CompileError> {
    let label = e.new_label();
    e.raw(format_args!("\n// Print newline routine"))?;
    e.label(label)?;

    e.instr(format_args!("stp x29, x30, [sp, #-16]!"))?;
    e.instr(format_args!("mov x29, sp"))?;
    e.instr(format_args!("sub sp, sp, #16"))?;

    e.instr(format_args!("mov x0, #10"))?;
    e.instr(format_args!("strb w0, [sp]"))?;
    e.instr(format_args!("mov x0, #1"))?;
    e.instr(format_args!("mov x1, sp"))?;
    e.instr(format_args!("mov x2, #1"))?;
    e.write_syscall()?;

    e.instr(format_args!("add sp, sp, #16"))?;
    e.instr(format_args!("ldp x29, x30, [sp], #16"))?;
    e.instr(format_args!("ret"))?;

    Ok(label)
}

fn emit_readchar_routine(e: &mut Emitter) -> Result<u32, CompileError> {
    let label = e.new_label();
    e.raw(format_args!("\n// Read char routine"))?;
    e.label(label)?;

    e.instr(format_args!("stp x29, x30, [sp, #-16]!"))?;
    e.instr(format_args!("mov x29, sp"))?;
    e.instr(format_args!("sub sp, sp, #16"))?;

    e.instr(format_args!("mov x0, #0"))?;
    e.instr(format_args!("mov x1, sp"))?;
    e.instr(format_args!("mov x2, #1"))?;
    e.instr(format_args!("mov x16, #3"))?;
    e.instr(format_args!("movk x16, #0x200, lsl #16"))?;
    e.instr(format_args!("svc #0x80"))?;

    e.instr(format_args!("cmp x0, #1"))?;
    let got_char = e.new_label();
    e.instr(format_args!("b.ge L{got_char}"))?;
    e.instr(format_args!("mov x0, #-1"))?;
    let done = e.new_label();
    e.instr(format_args!("b L{done}"))?;

    e.label(got_char)?;
    e.instr(format_args!("ldrb w0, [sp]"))?;

    e.label(done)?;
    e.instr(format_args!("add sp, sp, #16"))?;
    e.instr(format_args!("ldp x29, x30, [sp], #16"))?;
    e.instr(format_args!("ret"))?;

    Ok(label)
}

fn emit_print_char_routine(e: &mut Emitter) -> Result<u32, CompileError> {
    let label = e.new_label();
    e.raw(format_args!("\n// Print char routine"))?;
    e.label(label)?;

    e.instr(format_args!("stp x29, x30, [sp, #-16]!"))?;
    e.instr(format_args!("mov x29, sp"))?;
    e.instr(format_args!("sub sp, sp, #16"))?;

    e.instr(format_args!("strb w0, [sp]"))?;
    e.instr(format_args!("mov x0, #1"))?;
    e.instr(format_args!("mov x1, sp"))?;
    e.instr(format_args!("mov x2, #1"))?;
    e.instr(format_args!("mov x16, #4"))?;
    e.instr(format_args!("movk x16, #0x200, lsl #16"))?;
    e.instr(format_args!("svc #0x80"))?;

    e.instr(format_args!("add sp, sp, #16"))?;
    e.instr(format_args!("ldp x29, x30, [sp], #16"))?;
    e.instr(format_args!("ret"))?;

    Ok(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prelude_emits_all_four_routines_with_ret() {
        let mut e = Emitter::new();
        emit_runtime_prelude(&mut e).unwrap();
        let text = e.into_text();
        assert_eq!(text.matches("ret").count(), 4);
        assert!(text.contains("Print integer routine"));
        assert!(text.contains("Print newline routine") || text.contains("Print newline"));
        assert!(text.contains("Read char routine"));
        assert!(text.contains("Print char routine"));
    }
}
