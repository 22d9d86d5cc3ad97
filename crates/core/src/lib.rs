#![forbid(unsafe_code)]

pub mod content;
pub mod error;
pub mod ids;
pub mod order_key;
pub mod patch;

pub use content::{BlockContent, BlockType, ContentError, ContentRef};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use ids::{BlockId, IdError, ObjectId};
pub use order_key::{
    OrderKeyError, key_after, key_before, key_between, validate_explicit_order_key, validate_order_key,
};
pub use patch::{
    API_VERSION, AppliedBlocks, BlockOp, BlockPatch, DeleteBlock, InsertBlock,
    MAX_IDEMPOTENCY_KEY_LEN, MoveBlock, PatchInput, PatchResult, Place, Placement, UpdateBlock,
    parse_block_type, patch_response_json,
};
