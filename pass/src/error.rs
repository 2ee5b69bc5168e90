//! Error type shared by every stage of the pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Failure modes of the switch-splitting / branch-instrumentation pipeline.
///
/// Every error here is fatal: the original prototype this pass is modeled on
/// treats all of these conditions as `assert(0)` aborts, so there is no
/// partial-success path to recover into. Each variant is produced after the
/// offending state has already been written to the `branches.txt` report,
/// matching the original's "diagnose, then abort" ordering.
#[derive(Debug, Error)]
pub enum PassError {
    #[error("basic block {block:?} in function `{function}` has no BB_ID metadata")]
    MissingBlockId { function: String, block: String },

    #[error(
        "conditional branch in function `{function}` has a condition that is neither icmp nor fcmp: {kind}"
    )]
    UnsupportedCondition { function: String, kind: String },

    #[error(
        "icmp/fcmp operand in function `{function}` has unsupported type `{ty}` (expected integer \
         of width 8/16/32/64, a float/double, or a pointer)"
    )]
    UnsupportedOperandType { function: String, ty: String },

    #[error("switch terminator in function `{function}` has no cases to split")]
    EmptySwitch { function: String },

    #[error("basic block count reached the {} cap while labelling function `{function}`", crate::ids::MAX_BLOCK_ID)]
    TooManyBlocks { function: String },

    #[error("pointer comparison in function `{function}` produced a signed predicate (pointer comparisons are always unsigned)")]
    SignedPointerComparison { function: String },

    #[error("fake_func scaffolding call in function `{function}` still has uses; S4 cannot safely erase it")]
    FakeFuncCallHasUses { function: String },

    #[error("switch terminator survived into the branch rewriter in function `{function}` (S1 should have eliminated it)")]
    SwitchSurvivedToS3 { function: String },

    #[error("failed to build instruction while lowering function `{function}`: {message}")]
    Builder { function: String, message: String },

    #[error("failed to write report: {0}")]
    Report(#[from] std::io::Error),

    #[error("module contains no target data layout; cannot size icmp operands")]
    MissingDataLayout,

    #[error("report path {0:?} could not be truncated for writing")]
    ReportPath(PathBuf),
}

impl PassError {
    pub(crate) fn builder(function: &str, message: impl Into<String>) -> Self {
        Self::Builder {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PassError>;
