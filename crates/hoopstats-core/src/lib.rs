// Core of the stats scraper: turns one stats page into a normalized table,
// joins two tables on player identity and correlates their numeric columns.
//
// Nothing in this crate touches the network or the filesystem.

#[macro_use]
mod macros;

pub mod correlation;
pub mod extract;
pub mod merge;
pub mod model;
pub mod normalize;

pub use correlation::CorrelationMatrix;
pub use extract::extract;
pub use merge::{merge, merge_labeled, MergeError};
pub use model::{
    CellValue, Column, ColumnKind, IdentityKey, MergedTable, NormalizedTable, PlayerRecord,
    RawTable, StatCategory, Tabular,
};
pub use normalize::normalize;
