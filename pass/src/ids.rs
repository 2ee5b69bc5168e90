//! Block-id bookkeeping shared by the labeller (S2) and the branch
//! rewriter (S3).
//!
//! Ids are plain `u32`s end-to-end: the labeller assigns them, attaches
//! them to a terminator's `BB_ID` metadata as a string, and the branch
//! rewriter reads them back via `ir_utils::read_bb_id`. A typed newtype
//! would add no safety here — the only boundary the ids cross is a
//! metadata string round-trip — so this module is just the shared cap.

/// Upper bound on the number of basic blocks a single function may have.
/// `labeller::run` refuses to assign an id at or beyond this cap.
pub const MAX_BLOCK_ID: u32 = 2_000_000_000;
