//! S1 — Switch Splitter.
//!
//! Lowers every `switch` terminator to a balanced binary tree of byte-wise
//! `icmp`s, via the byte-decomposition divide-and-conquer algorithm in
//! `spec` §4.1. This stage has no precedent in the original prototype
//! (`examples/original_source/.../Skeleton.cpp` treats a surviving `switch`
//! as a hard error); the algorithm below is this pass's own contribution.

use std::collections::BTreeSet;

use bitvec::prelude::{BitVec, Lsb0};
use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::values::{FunctionValue, InstructionOpcode, IntValue};
use inkwell::IntPredicate;
use smallvec::SmallVec;

use crate::error::{PassError, Result};
use crate::ir_utils::{operand_block, operand_value};
use crate::phi_repair::rewrite_first_incoming;

#[derive(Clone, Copy)]
struct CaseEntry<'ctx> {
    val: u64,
    target: BasicBlock<'ctx>,
}

/// Lowers every `switch` terminator in `module` to a tree of two-way
/// branches. Must run before the labeller (S2) so the newly created blocks
/// receive ids.
pub fn run<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> Result<()> {
    let builder = context.create_builder();

    for function in module.get_functions() {
        let function_name = function.get_name().to_string_lossy().into_owned();

        // Snapshot the block list before mutating the CFG (`spec` §9):
        // iterate a vector of handles, not a live view.
        let blocks: Vec<_> = function.get_basic_blocks();

        for block in blocks {
            let Some(terminator) = block.get_terminator() else {
                continue;
            };
            if terminator.get_opcode() != InstructionOpcode::Switch {
                continue;
            }

            lower_switch(context, &builder, function, block, &function_name)?;
        }
    }

    Ok(())
}

fn lower_switch<'ctx>(
    context: &'ctx Context,
    builder: &Builder<'ctx>,
    function: FunctionValue<'ctx>,
    switch_block: BasicBlock<'ctx>,
    function_name: &str,
) -> Result<()> {
    let switch_instr = switch_block.get_terminator().expect("caller verified a terminator exists");

    let scrutinee = match operand_value(switch_instr, 0) {
        Some(inkwell::values::BasicValueEnum::IntValue(v)) => v,
        _ => return Err(PassError::builder(function_name, "switch scrutinee is not an integer")),
    };
    let default_target =
        operand_block(switch_instr, 1).ok_or_else(|| PassError::builder(function_name, "switch has no default target"))?;

    let num_operands = switch_instr.get_num_operands();
    let mut cases: SmallVec<[CaseEntry; 8]> = SmallVec::new();
    let mut i = 2;
    while i + 1 < num_operands {
        let case_val = match operand_value(switch_instr, i) {
            Some(inkwell::values::BasicValueEnum::IntValue(v)) => v
                .get_zero_extended_constant()
                .ok_or_else(|| PassError::builder(function_name, "switch case value is not a constant integer"))?,
            _ => return Err(PassError::builder(function_name, "switch case value is not an integer")),
        };
        let case_target = operand_block(switch_instr, i + 1)
            .ok_or_else(|| PassError::builder(function_name, "switch case has no target block"))?;
        cases.push(CaseEntry {
            val: case_val,
            target: case_target,
        });
        i += 2;
    }

    let width = scrutinee.get_type().get_bit_width();
    let byte_count = width.div_ceil(8) as usize;

    let new_default = context.append_basic_block(function, "cmplog.switch.default");
    builder.position_at_end(new_default);
    builder
        .build_unconditional_branch(default_target)
        .map_err(|e| PassError::builder(function_name, e.to_string()))?;

    let switch_root = if cases.is_empty() {
        new_default
    } else {
        let checked: BitVec<usize, Lsb0> = BitVec::repeat(false, byte_count);
        convert(
            context,
            builder,
            function,
            &cases,
            checked,
            switch_block,
            new_default,
            scrutinee,
            byte_count,
            function_name,
        )?
    };

    unsafe { switch_instr.erase_from_basic_block() };
    builder.position_at_end(switch_block);
    builder
        .build_unconditional_branch(switch_root)
        .map_err(|e| PassError::builder(function_name, e.to_string()))?;

    rewrite_first_incoming(builder, default_target, switch_block, new_default, function_name)?;

    Ok(())
}

/// The `Convert` recursion from `spec` §4.1. Returns the entry block of a
/// freshly built subtree (`NodeBlock`); the caller wires the enclosing
/// branch or terminator to point at it.
#[allow(clippy::too_many_arguments)]
fn convert<'ctx>(
    context: &'ctx Context,
    builder: &Builder<'ctx>,
    function: FunctionValue<'ctx>,
    cases: &[CaseEntry<'ctx>],
    checked: BitVec<usize, Lsb0>,
    origin: BasicBlock<'ctx>,
    new_default: BasicBlock<'ctx>,
    scrutinee: IntValue<'ctx>,
    byte_count: usize,
    function_name: &str,
) -> Result<BasicBlock<'ctx>> {
    let (j, byte_set) = select_split_byte(cases, &checked, byte_count);

    let node_block = context.append_basic_block(function, "cmplog.switch.node");
    builder.position_at_end(node_block);

    let b8 = extract_byte(context, builder, scrutinee, j, function_name)?;

    if byte_set.len() == 1 {
        let b = *byte_set.iter().next().expect("k == 1 has exactly one element");
        let b_const = context.i8_type().const_int(b as u64, false);
        let cmp = builder
            .build_int_compare(IntPredicate::EQ, b8, b_const, "cmplog.switch.eq")
            .map_err(|e| PassError::builder(function_name, e.to_string()))?;

        let mut next_checked = checked;
        next_checked.set(j, true);

        if next_checked.all() {
            let target = cases[0].target;
            builder
                .build_conditional_branch(cmp, target, new_default)
                .map_err(|e| PassError::builder(function_name, e.to_string()))?;
            rewrite_first_incoming(builder, target, origin, node_block, function_name)?;
        } else {
            let inner = convert(
                context,
                builder,
                function,
                cases,
                next_checked,
                origin,
                new_default,
                scrutinee,
                byte_count,
                function_name,
            )?;
            builder.position_at_end(node_block);
            builder
                .build_conditional_branch(cmp, inner, new_default)
                .map_err(|e| PassError::builder(function_name, e.to_string()))?;
        }

        return Ok(node_block);
    }

    let sorted: Vec<u8> = byte_set.into_iter().collect();
    let pivot = sorted[sorted.len() / 2];
    let pivot_const = context.i8_type().const_int(pivot as u64, false);
    let cmp = builder
        .build_int_compare(IntPredicate::ULT, b8, pivot_const, "cmplog.switch.lt")
        .map_err(|e| PassError::builder(function_name, e.to_string()))?;

    let (lhs, rhs): (Vec<CaseEntry>, Vec<CaseEntry>) =
        cases.iter().copied().partition(|c| byte_at(c.val, j) < pivot);

    let lbb = convert(
        context,
        builder,
        function,
        &lhs,
        checked.clone(),
        origin,
        new_default,
        scrutinee,
        byte_count,
        function_name,
    )?;
    let rbb = convert(
        context, builder, function, &rhs, checked, origin, new_default, scrutinee, byte_count, function_name,
    )?;

    builder.position_at_end(node_block);
    builder
        .build_conditional_branch(cmp, lbb, rbb)
        .map_err(|e| PassError::builder(function_name, e.to_string()))?;

    Ok(node_block)
}

fn byte_at(val: u64, index: usize) -> u8 {
    ((val >> (index * 8)) & 0xFF) as u8
}

/// Picks the unchecked byte position with the smallest distinct-value set,
/// ties broken by the smaller index (`spec` §4.1 step 1: sentinel 257).
fn select_split_byte(cases: &[CaseEntry<'_>], checked: &BitVec<usize, Lsb0>, byte_count: usize) -> (usize, BTreeSet<u8>) {
    let mut best: Option<(usize, BTreeSet<u8>)> = None;
    let mut best_len = 257usize;

    for i in 0..byte_count {
        if checked[i] {
            continue;
        }
        let set: BTreeSet<u8> = cases.iter().map(|c| byte_at(c.val, i)).collect();
        if set.len() < best_len {
            best_len = set.len();
            best = Some((i, set));
        }
    }

    best.expect("convert is only called while at least one byte position remains unchecked")
}

fn extract_byte<'ctx>(
    context: &'ctx Context,
    builder: &Builder<'ctx>,
    scrutinee: IntValue<'ctx>,
    byte_index: usize,
    function_name: &str,
) -> Result<IntValue<'ctx>> {
    let width = scrutinee.get_type().get_bit_width();

    let shifted = if byte_index == 0 {
        scrutinee
    } else {
        let shift_amount = scrutinee.get_type().const_int((byte_index * 8) as u64, false);
        builder
            .build_right_shift(scrutinee, shift_amount, false, "cmplog.switch.shift")
            .map_err(|e| PassError::builder(function_name, e.to_string()))?
    };

    match width.cmp(&8) {
        std::cmp::Ordering::Greater => builder
            .build_int_truncate(shifted, context.i8_type(), "cmplog.switch.trunc")
            .map_err(|e| PassError::builder(function_name, e.to_string())),
        std::cmp::Ordering::Equal => Ok(shifted),
        std::cmp::Ordering::Less => builder
            .build_int_z_extend(shifted, context.i8_type(), "cmplog.switch.zext")
            .map_err(|e| PassError::builder(function_name, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_at_extracts_little_endian_bytes() {
        let v: u64 = 0x0001_0000;
        assert_eq!(byte_at(v, 0), 0x00);
        assert_eq!(byte_at(v, 1), 0x00);
        assert_eq!(byte_at(v, 2), 0x01);
    }

    #[test]
    fn select_split_byte_picks_smallest_set_with_index_tiebreak() {
        let context = Context::create();
        let module = context.create_module("t");
        let function = module.add_function("f", context.void_type().fn_type(&[], false), None);
        let block = context.append_basic_block(function, "entry");

        // byte 0 has 2 distinct values ({0x00,0x01}), byte 1 has 1 ({0x00}).
        let cases = [
            CaseEntry { val: 0x0000, target: block },
            CaseEntry { val: 0x0001, target: block },
            CaseEntry { val: 0x0100, target: block },
        ];
        let checked: BitVec<usize, Lsb0> = BitVec::repeat(false, 4);

        let (picked, set) = select_split_byte(&cases, &checked, 4);
        assert_eq!(picked, 1);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn empty_switch_funnels_to_new_default() {
        let context = Context::create();
        let module = context.create_module("t");
        let function = module.add_function("f", context.void_type().fn_type(&[], false), None);
        let entry = context.append_basic_block(function, "entry");
        let default_bb = context.append_basic_block(function, "default");
        let builder = context.create_builder();

        builder.position_at_end(entry);
        let scrutinee = context.i32_type().const_int(0, false);
        builder.build_switch(scrutinee, default_bb, &[]).unwrap();
        builder.position_at_end(default_bb);
        builder.build_return(None).unwrap();

        lower_switch(&context, &builder, function, entry, "f").unwrap();

        let terminator = entry.get_terminator().unwrap();
        assert_eq!(terminator.get_opcode(), InstructionOpcode::Br);
        assert_eq!(terminator.get_num_operands(), 1);
    }
}
