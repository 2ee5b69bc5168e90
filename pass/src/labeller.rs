//! S2 — BB Labeller.
//!
//! Walks every basic block in module → function → block order, assigns the
//! next sequential id, attaches `BB_ID`/`Loc` metadata to its terminator,
//! inserts the `fake_func(id)` scaffolding call, and appends one report
//! line per block.

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::values::InstructionValue;
use std::io::Write;

use crate::callbacks::Callbacks;
use crate::debuginfo;
use crate::error::{PassError, Result};
use crate::ids::MAX_BLOCK_ID;
use crate::metadata::MetadataKinds;
use crate::report::{Location, ReportWriter};

/// Runs S2 over every function already present in `module` (S1 must have
/// run first so the lowered switch blocks get ids too).
pub fn run<'ctx, W: Write>(
    context: &'ctx Context,
    module: &Module<'ctx>,
    callbacks: &Callbacks<'ctx>,
    kinds: &MetadataKinds,
    report: &mut ReportWriter<W>,
) -> Result<u32> {
    let builder = context.create_builder();
    let mut next_id: u32 = 0;

    for function in module.get_functions() {
        let function_name = function.get_name().to_string_lossy().into_owned();

        for block in function.get_basic_blocks() {
            let Some(terminator) = block.get_terminator() else {
                continue;
            };

            if next_id >= MAX_BLOCK_ID {
                return Err(PassError::TooManyBlocks {
                    function: function_name,
                });
            }
            let id = next_id;
            next_id += 1;

            attach_bb_id(context, &terminator, kinds.bb_id, id);
            let location = attach_location(context, &terminator, kinds.loc);
            insert_fake_call(context, &builder, &terminator, callbacks, id, &function_name)?;

            report.block_line(&function_name, id, &location)?;

            log::trace!(
                target: "cmplog::labeller",
                "labelled block in `{function_name}` as bb{id} (loc {location})"
            );
        }
    }

    log::debug!(target: "cmplog::labeller", "labelled {next_id} basic blocks");
    Ok(next_id)
}

fn attach_bb_id(context: &Context, terminator: &InstructionValue<'_>, kind: u32, id: u32) {
    let id_str = context.metadata_string(&id.to_string());
    let node = context.metadata_node(&[id_str.into()]);
    terminator
        .set_metadata(node, kind)
        .expect("terminator instructions accept metadata attachments");
}

fn attach_location(context: &Context, terminator: &InstructionValue<'_>, kind: u32) -> Location {
    match debuginfo::source_location(*terminator) {
        Some((file, line)) => {
            let loc_str = context.metadata_string(&format!("{file}:{line}"));
            let node = context.metadata_node(&[loc_str.into()]);
            terminator
                .set_metadata(node, kind)
                .expect("terminator instructions accept metadata attachments");
            Location::Known { file, line }
        }
        None => Location::Unknown,
    }
}

fn insert_fake_call<'ctx>(
    context: &'ctx Context,
    builder: &Builder<'ctx>,
    terminator: &InstructionValue<'ctx>,
    callbacks: &Callbacks<'ctx>,
    id: u32,
    function_name: &str,
) -> Result<()> {
    builder.position_before(terminator);
    let id_const = context.i32_type().const_int(id as u64, false);
    builder
        .build_call(callbacks.fake_func, &[id_const.into()], "")
        .map_err(|e| PassError::builder(function_name, e.to_string()))?;
    Ok(())
}
