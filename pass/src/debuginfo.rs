//! Debug-location recovery for the labeller's `Loc` metadata.
//!
//! inkwell has no safe wrapper for reading an instruction's `!dbg` location
//! back out, so this module drops to `llvm-sys`'s `llvm-c/DebugInfo.h`
//! bindings directly, reached through inkwell's `AsValueRef` escape hatch —
//! the same pattern used to pair `llvm-sys` with `inkwell` in
//! `examples/other_examples/*solang*` and `*wasm-pvm*`.

use inkwell::values::{AsValueRef, InstructionValue};
use llvm_sys::debuginfo::{
    LLVMDIFileGetFilename, LLVMDILocationGetLine, LLVMDILocationGetScope, LLVMDIScopeGetFile,
    LLVMInstructionGetDebugLoc,
};

/// A recovered `<file>:<line>` pair, or `None` when the instruction carries
/// no `!dbg` attachment (the labeller then emits the `"UNKNOWN"` literal,
/// per `spec` §3).
pub fn source_location(instr: InstructionValue<'_>) -> Option<(String, u32)> {
    unsafe {
        let loc = LLVMInstructionGetDebugLoc(instr.as_value_ref());
        if loc.is_null() {
            return None;
        }

        let line = LLVMDILocationGetLine(loc);
        let scope = LLVMDILocationGetScope(loc);
        if scope.is_null() {
            return None;
        }

        let file = LLVMDIScopeGetFile(scope);
        if file.is_null() {
            return None;
        }

        let mut len: std::os::raw::c_uint = 0;
        let name_ptr = LLVMDIFileGetFilename(file, &mut len);
        if name_ptr.is_null() {
            return None;
        }

        let bytes = std::slice::from_raw_parts(name_ptr as *const u8, len as usize);
        let name = String::from_utf8_lossy(bytes).into_owned();
        Some((name, line))
    }
}
