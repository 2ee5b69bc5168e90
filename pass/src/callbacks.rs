//! Declarations of the external symbols the instrumented module links
//! against at runtime (`spec` §6, "External symbol contract").
//!
//! None of these functions are defined by this crate — they are resolved at
//! link time by the fuzzer's callback runtime. We only need their
//! `FunctionValue` handles to build `call` instructions against them.

use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::values::FunctionValue;

/// Which integer-width callback a comparison should route through.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::W8),
            16 => Some(Self::W16),
            32 => Some(Self::W32),
            64 => Some(Self::W64),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::W8 => 8,
            Self::W16 => 16,
            Self::W32 => 32,
            Self::W64 => 64,
        }
    }
}

/// Handles to the six logging callbacks plus the two vestigial scaffolding
/// symbols, declared (not defined) in the module being instrumented.
pub struct Callbacks<'ctx> {
    pub log_int: [FunctionValue<'ctx>; 4],
    pub log_f32: FunctionValue<'ctx>,
    pub log_f64: FunctionValue<'ctx>,
    pub fake_func: FunctionValue<'ctx>,
    /// Declared but never called after S4, per `spec` §9 Open Question (a).
    pub switch_func: FunctionValue<'ctx>,
}

impl<'ctx> Callbacks<'ctx> {
    /// Declares every external symbol this pass may call, reusing an
    /// existing declaration if the module already has one under that name
    /// (mirrors LLVM's `getOrInsertFunction`, which is idempotent).
    pub fn declare(context: &'ctx Context, module: &Module<'ctx>) -> Self {
        let i1 = context.bool_type();
        let i8 = context.i8_type();
        let i16 = context.i16_type();
        let i32 = context.i32_type();
        let i64 = context.i64_type();
        let f32 = context.f32_type();
        let f64 = context.f64_type();

        let log_fn = |name: &str, operand: inkwell::types::BasicTypeEnum<'ctx>| {
            let fn_ty = i1.fn_type(
                &[i32.into(), i1.into(), operand.into(), operand.into(), i8.into(), i8.into()],
                false,
            );
            get_or_insert(module, name, fn_ty)
        };

        let log_int = [
            log_fn("log_func8", i8.into()),
            log_fn("log_func16", i16.into()),
            log_fn("log_func32", i32.into()),
            log_fn("log_func64", i64.into()),
        ];
        let log_f32 = log_fn("log_func_f32", f32.into());
        let log_f64 = log_fn("log_func_f64", f64.into());

        let fake_func_ty = i1.fn_type(&[i32.into()], false);
        let fake_func = get_or_insert(module, "fake_func", fake_func_ty);

        let switch_func_ty = i64.fn_type(&[i32.into(), i64.into()], false);
        let switch_func = get_or_insert(module, "switch_func", switch_func_ty);

        Self {
            log_int,
            log_f32,
            log_f64,
            fake_func,
            switch_func,
        }
    }

    pub fn log_for_width(&self, width: IntWidth) -> FunctionValue<'ctx> {
        match width {
            IntWidth::W8 => self.log_int[0],
            IntWidth::W16 => self.log_int[1],
            IntWidth::W32 => self.log_int[2],
            IntWidth::W64 => self.log_int[3],
        }
    }
}

fn get_or_insert<'ctx>(
    module: &Module<'ctx>,
    name: &str,
    fn_ty: inkwell::types::FunctionType<'ctx>,
) -> FunctionValue<'ctx> {
    module.get_function(name).unwrap_or_else(|| module.add_function(name, fn_ty, None))
}
