//! Summary vectors: header index and payload rows.

pub mod category;
pub mod data;
pub mod header;
pub mod index;
pub mod key;

pub use category::VarCategory;
pub use data::{SummaryCase, SummaryData};
pub use header::SummaryHeader;
pub use index::{wildcard_match, SummaryIndex, SummaryNode};
pub use key::{Qualifier, SummaryKey, DUMMY_WELL};
