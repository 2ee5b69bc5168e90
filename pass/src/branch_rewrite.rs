//! S3 — Branch Rewriter.
//!
//! Walks every two-way conditional branch, classifies its condition,
//! rewrites it to the result of an external logging callback, and appends
//! the edge-report lines the fuzzer's CFG reconstruction consumes.

use std::io::Write;

use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::targets::TargetData;
use inkwell::values::{BasicValueEnum, InstructionOpcode, InstructionValue};

use crate::callbacks::{Callbacks, IntWidth};
use crate::error::{PassError, Result};
use crate::ir_utils::{operand_block, operand_value, read_bb_id};
use crate::metadata::MetadataKinds;
use crate::predicates::{classify_float, classify_int};
use crate::report::ReportWriter;

pub fn run<'ctx, W: Write>(
    context: &'ctx Context,
    module: &Module<'ctx>,
    callbacks: &Callbacks<'ctx>,
    kinds: &MetadataKinds,
    report: &mut ReportWriter<W>,
) -> Result<()> {
    let data_layout = module.get_data_layout();
    let layout_str = data_layout.as_str().to_str().unwrap_or_default();
    let target_data = TargetData::create(layout_str);
    let builder = context.create_builder();

    for function in module.get_functions() {
        let function_name = function.get_name().to_string_lossy().into_owned();

        for block in function.get_basic_blocks() {
            let Some(terminator) = block.get_terminator() else {
                continue;
            };

            match terminator.get_opcode() {
                InstructionOpcode::Br if terminator.get_num_operands() == 3 => {
                    rewrite_conditional_branch(
                        context,
                        &builder,
                        &target_data,
                        callbacks,
                        kinds,
                        terminator,
                        &function_name,
                        report,
                    )?;
                }
                InstructionOpcode::Switch => {
                    return Err(PassError::SwitchSurvivedToS3 {
                        function: function_name,
                    });
                }
                _ => {}
            }
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn rewrite_conditional_branch<'ctx, W: Write>(
    context: &'ctx Context,
    builder: &inkwell::builder::Builder<'ctx>,
    target_data: &TargetData,
    callbacks: &Callbacks<'ctx>,
    kinds: &MetadataKinds,
    terminator: InstructionValue<'ctx>,
    function_name: &str,
    report: &mut ReportWriter<W>,
) -> Result<()> {
    let cond = operand_value(terminator, 0).expect("conditional br always has a condition operand");
    let else_bb = operand_block(terminator, 1).expect("conditional br always has a false target");
    let then_bb = operand_block(terminator, 2).expect("conditional br always has a true target");

    let pred_id = read_bb_id(terminator.get_parent().expect("terminator has a parent block"), kinds.bb_id)
        .ok_or_else(|| missing_id(function_name, "current"))?;
    let true_id = read_bb_id(then_bb, kinds.bb_id).ok_or_else(|| missing_id(function_name, "true target"))?;
    let false_id = read_bb_id(else_bb, kinds.bb_id).ok_or_else(|| missing_id(function_name, "false target"))?;

    let Some(cond_instr) = cond.as_instruction_value() else {
        return unsupported(report, function_name, "<constant>");
    };

    if let Some(int_pred) = cond_instr.get_icmp_predicate() {
        let info = classify_int(int_pred).expect("all IntPredicate variants are classified");
        let a = operand_value(cond_instr, 0).expect("icmp has a lhs operand");
        let b = operand_value(cond_instr, 1).expect("icmp has a rhs operand");

        let (a_cast, b_cast, width, signed) =
            cast_int_operands(context, builder, target_data, a, b, info.signed, function_name)?;

        let callback = callbacks.log_for_width(width);
        let new_cond = emit_callback_call(
            context,
            builder,
            terminator,
            callback,
            pred_id,
            cond,
            a_cast.into(),
            b_cast.into(),
            signed,
            info.code,
            function_name,
        )?;
        terminator.set_operand(0, new_cond);

        report.edge_line(pred_id, true_id, info.true_mnemonic, true)?;
        report.edge_line(pred_id, false_id, info.false_mnemonic, false)?;
        return Ok(());
    }

    if let Some(float_pred) = cond_instr.get_fcmp_predicate() {
        let info = classify_float(float_pred);
        let a = operand_value(cond_instr, 0).expect("fcmp has a lhs operand");
        let b = operand_value(cond_instr, 1).expect("fcmp has a rhs operand");

        let callback = match a.get_type() {
            inkwell::types::BasicTypeEnum::FloatType(ty) if ty == context.f32_type() => callbacks.log_f32,
            inkwell::types::BasicTypeEnum::FloatType(ty) if ty == context.f64_type() => callbacks.log_f64,
            other => {
                return Err(PassError::UnsupportedOperandType {
                    function: function_name.to_string(),
                    ty: format!("{other:?}"),
                });
            }
        };

        let new_cond = emit_callback_call(
            context,
            builder,
            terminator,
            callback,
            pred_id,
            cond,
            a,
            b,
            true,
            info.code,
            function_name,
        )?;
        terminator.set_operand(0, new_cond);

        report.edge_line(pred_id, true_id, info.true_mnemonic, true)?;
        report.edge_line(pred_id, false_id, info.false_mnemonic, false)?;
        return Ok(());
    }

    unsupported(report, function_name, &format!("{:?}", cond_instr.get_opcode()))
}

fn unsupported<W: Write>(report: &mut ReportWriter<W>, function_name: &str, kind: &str) -> Result<()> {
    report.diagnostic(&format!(
        "ERROR {kind} is not a ICMP nor FCMP condition in function `{function_name}`"
    ))?;
    Err(PassError::UnsupportedCondition {
        function: function_name.to_string(),
        kind: kind.to_string(),
    })
}

fn missing_id(function_name: &str, which: &str) -> PassError {
    PassError::MissingBlockId {
        function: function_name.to_string(),
        block: which.to_string(),
    }
}

/// Casts both icmp operands to the callback width selected from the
/// module's data layout, sign-extending regardless of the predicate's own
/// signedness (the sign-extend is intentional, per `spec` §4.3: the runtime
/// reinterprets based on the separately-passed `is_signed` flag).
///
/// Pointer operands are special-cased to the 64-bit callback with
/// `is_signed` forced to zero, matching the original prototype.
fn cast_int_operands<'ctx>(
    context: &'ctx Context,
    builder: &inkwell::builder::Builder<'ctx>,
    target_data: &TargetData,
    a: BasicValueEnum<'ctx>,
    b: BasicValueEnum<'ctx>,
    signed: bool,
    function_name: &str,
) -> Result<(inkwell::values::IntValue<'ctx>, inkwell::values::IntValue<'ctx>, IntWidth, bool)> {
    match (a, b) {
        (BasicValueEnum::PointerValue(pa), BasicValueEnum::PointerValue(pb)) => {
            if signed {
                return Err(PassError::SignedPointerComparison {
                    function: function_name.to_string(),
                });
            }
            let i64_ty = context.i64_type();
            let a_cast = builder
                .build_ptr_to_int(pa, i64_ty, "cmplog.ptr2int")
                .map_err(|e| PassError::builder(function_name, e.to_string()))?;
            let b_cast = builder
                .build_ptr_to_int(pb, i64_ty, "cmplog.ptr2int")
                .map_err(|e| PassError::builder(function_name, e.to_string()))?;
            Ok((a_cast, b_cast, IntWidth::W64, false))
        }
        (BasicValueEnum::IntValue(ia), BasicValueEnum::IntValue(ib)) => {
            // Store size, not ABI bit size: a sub-byte or non-byte-aligned
            // integer (`i1`, `i7`, `i24`, ...) is routed through the next
            // wider callback, matching `DL->getTypeStoreSizeInBits` in the
            // modeled system (`Skeleton.cpp:289`) rather than
            // `getTypeSizeInBits`, which would leave the sign-extend path
            // in `build_int_cast_sign_flag` below unreachable.
            let bits = (target_data.get_store_size(&ia.get_type()) * 8) as u32;
            let width = IntWidth::from_bits(bits).ok_or_else(|| PassError::UnsupportedOperandType {
                function: function_name.to_string(),
                ty: format!("i{bits}"),
            })?;
            let target_ty = context.custom_width_int_type(width.bits());
            let a_cast = builder
                .build_int_cast_sign_flag(ia, target_ty, true, "cmplog.cast")
                .map_err(|e| PassError::builder(function_name, e.to_string()))?;
            let b_cast = builder
                .build_int_cast_sign_flag(ib, target_ty, true, "cmplog.cast")
                .map_err(|e| PassError::builder(function_name, e.to_string()))?;
            Ok((a_cast, b_cast, width, signed))
        }
        (other, _) => Err(PassError::UnsupportedOperandType {
            function: function_name.to_string(),
            ty: format!("{other:?}"),
        }),
    }
}

#[allow(clippy::too_many_arguments)]
fn emit_callback_call<'ctx>(
    context: &'ctx Context,
    builder: &inkwell::builder::Builder<'ctx>,
    terminator: InstructionValue<'ctx>,
    callback: inkwell::values::FunctionValue<'ctx>,
    branch_id: u32,
    orig_cond: BasicValueEnum<'ctx>,
    a: BasicValueEnum<'ctx>,
    b: BasicValueEnum<'ctx>,
    signed: bool,
    pred_code: u8,
    function_name: &str,
) -> Result<inkwell::values::BasicValueEnum<'ctx>> {
    builder.position_before(&terminator);

    let branch_id_const = context.i32_type().const_int(branch_id as u64, false);
    let signed_const = context.i8_type().const_int(signed as u64, false);
    let pred_const = context.i8_type().const_int(pred_code as u64, false);

    let call = builder
        .build_call(
            callback,
            &[
                branch_id_const.into(),
                orig_cond.into(),
                a.into(),
                b.into(),
                signed_const.into(),
                pred_const.into(),
            ],
            "cmplog.call",
        )
        .map_err(|e| PassError::builder(function_name, e.to_string()))?;

    call.try_as_basic_value()
        .left()
        .ok_or_else(|| PassError::builder(function_name, "callback call produced no value"))
}
