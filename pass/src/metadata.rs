//! Custom metadata kind ids shared by the labeller and the branch rewriter.

use inkwell::context::Context;

/// `LLVMGetMDKindIDInContext` handles for the two custom metadata keys this
/// pass defines. Looked up once per run and threaded through both stages
/// rather than re-interning the strings on every block.
pub struct MetadataKinds {
    pub bb_id: u32,
    pub loc: u32,
}

impl MetadataKinds {
    pub fn new(context: &Context) -> Self {
        Self {
            bb_id: context.get_kind_id("BB_ID"),
            loc: context.get_kind_id("Loc"),
        }
    }
}
