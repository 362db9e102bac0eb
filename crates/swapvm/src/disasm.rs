//! Human-readable listing of a program

use crate::asm::decode_program;
use crate::error::Result;

/// One line per record: offset, opcode byte, mnemonic and arguments.
/// Fails with the same faults the interpreter would raise.
pub fn disassemble(program: &[u8]) -> Result<String> {
    let mut out = String::new();
    for (pc, instruction) in decode_program(program)? {
        out.push_str(&format!("{:04x}  {:02x}  {}\n", pc, instruction.opcode() as u8, instruction));
    }
    if out.is_empty() {
        out.push_str("(empty program)\n");
    }
    Ok(out)
}
