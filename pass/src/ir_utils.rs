//! Small helpers over `InstructionValue::get_operand`, grounded in the
//! `get_operand`/`get_bb_operand` pair from
//! `examples/other_examples/*wasm-pvm*control_flow.rs`: inkwell represents
//! an operand generically as `Either<BasicValueEnum, BasicBlock>` since a
//! terminator's operand can be either a value or a target block.

use either::Either;
use inkwell::basic_block::BasicBlock;
use inkwell::values::{BasicValueEnum, InstructionValue};

pub fn operand_value<'ctx>(instr: InstructionValue<'ctx>, index: u32) -> Option<BasicValueEnum<'ctx>> {
    match instr.get_operand(index) {
        Some(Either::Left(value)) => Some(value),
        _ => None,
    }
}

pub fn operand_block<'ctx>(instr: InstructionValue<'ctx>, index: u32) -> Option<BasicBlock<'ctx>> {
    match instr.get_operand(index) {
        Some(Either::Right(block)) => Some(block),
        _ => None,
    }
}

/// Reads a previously attached `BB_ID` metadata string back off a block's
/// terminator and parses it to the integer it encodes.
pub fn read_bb_id(block: BasicBlock<'_>, kind: u32) -> Option<u32> {
    let terminator = block.get_terminator()?;
    let node = terminator.get_metadata(kind)?;
    let values = node.get_node_values();
    let first = values.first()?;
    let raw = first.get_string_value()?;
    raw.to_str().ok()?.parse().ok()
}
