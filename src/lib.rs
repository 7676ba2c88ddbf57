pub mod block;
pub mod chain;
pub mod demo;
pub mod error;

pub use block::{Block, BlockHash};
pub use chain::{make_genesis_block, next_block, validate_chain};
pub use error::{LedgerError, Result};
