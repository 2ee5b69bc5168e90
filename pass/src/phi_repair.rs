//! PHI-node repair after CFG rewriting (used by the switch splitter).
//!
//! LLVM-C has no `LLVMSetIncomingBlock`, only `LLVMAddIncoming` — there is
//! no documented way to mutate a single incoming edge of an existing PHI in
//! place. This module works around that by rebuilding a fresh PHI with the
//! corrected incoming list, redirecting every use of the old PHI to it, and
//! erasing the old one.

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::values::{BasicValue, InstructionOpcode, PhiValue};

use crate::error::{PassError, Result};

/// Rewrites the first incoming edge of every PHI at the head of `target`
/// that names `old_pred` as predecessor, to instead name `new_pred`.
///
/// Only the first matching entry is touched, per the splitter's contract
/// (`spec` §4.1, §9 "PHI first-occurrence rule"): a target reached by
/// several new leaf blocks gets patched once per leaf, in creation order.
pub fn rewrite_first_incoming<'ctx>(
    builder: &Builder<'ctx>,
    target: BasicBlock<'ctx>,
    old_pred: BasicBlock<'ctx>,
    new_pred: BasicBlock<'ctx>,
    function_name: &str,
) -> Result<()> {
    let phis: Vec<_> = target
        .get_instructions()
        .take_while(|instr| instr.get_opcode() == InstructionOpcode::Phi)
        .collect();

    for instr in phis {
        let phi: PhiValue<'ctx> = match instr.try_into() {
            Ok(phi) => phi,
            Err(()) => continue,
        };

        let incoming: Vec<_> = (0..phi.count_incoming())
            .filter_map(|i| phi.get_incoming(i))
            .collect();

        let Some(match_pos) = incoming.iter().position(|(_, block)| *block == old_pred) else {
            continue;
        };

        builder.position_before(&instr);
        let new_phi = builder
            .build_phi(phi.get_type(), "cmplog.phi")
            .map_err(|e| PassError::builder(function_name, e.to_string()))?;
        for (i, (value, block)) in incoming.into_iter().enumerate() {
            let block = if i == match_pos { new_pred } else { block };
            new_phi.add_incoming(&[(&value, block)]);
        }

        instr.replace_all_uses_with(&new_phi.as_instruction());
        unsafe { instr.erase_from_basic_block() };
    }

    Ok(())
}
