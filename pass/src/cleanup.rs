//! S4 — Cleanup.
//!
//! Erases every `fake_func` call site inserted by the labeller (S2). By
//! construction these calls have no users (the `i1` result is discarded);
//! this stage's only job is dropping the now-pointless instructions.

use inkwell::module::Module;
use inkwell::values::{CallSiteValue, InstructionOpcode};

use crate::callbacks::Callbacks;
use crate::error::{PassError, Result};

pub fn run<'ctx>(module: &Module<'ctx>, callbacks: &Callbacks<'ctx>) -> Result<()> {
    let mut removed = 0u32;

    for function in module.get_functions() {
        let function_name = function.get_name().to_string_lossy().into_owned();
        let mut to_erase = Vec::new();

        for block in function.get_basic_blocks() {
            for instr in block.get_instructions() {
                if instr.get_opcode() != InstructionOpcode::Call {
                    continue;
                }
                let Ok(call_site): std::result::Result<CallSiteValue, _> = instr.try_into() else {
                    continue;
                };
                if call_site.get_called_fn_value() == Some(callbacks.fake_func) {
                    to_erase.push(instr);
                }
            }
        }

        for instr in to_erase {
            if instr.get_first_use().is_some() {
                return Err(PassError::FakeFuncCallHasUses {
                    function: function_name,
                });
            }
            unsafe { instr.erase_from_basic_block() };
            removed += 1;
        }
    }

    log::debug!(target: "cmplog::cleanup", "removed {removed} fake_func scaffolding calls");
    Ok(())
}
