//! Reader and writer for reservoir simulator keyword files.
//!
//! The [`core`] module holds the keyword record codec shared by every file
//! kind: binary (Fortran sequential) and formatted (ASCII) streams of named,
//! typed records. On top of it sit the [`summary`] index and payload reader,
//! the [`restart`] stream with lazy per-step random access, and the [`grid`]
//! geometry reader. With the `tabular` feature, CSV, Parquet, IRAP surface
//! and RMS well-path files can be imported into the same [`NamedSeries`]
//! currency as summary vectors.

pub mod core;
pub mod error;
pub mod grid;
pub mod restart;
pub mod series;
pub mod summary;
#[cfg(feature = "tabular")]
pub mod tabular;

pub use crate::core::{ElementData, FileKind, FileMode, KeywordReader, KeywordWriter, Record, StreamConfig, TypeTag};
pub use error::{Error, Result};
pub use grid::Grid;
pub use restart::{RestartReader, RestartWriter, TimeStepBlock};
pub use series::{ImportReport, NamedSeries};
pub use summary::{SummaryCase, SummaryIndex, SummaryKey, VarCategory};
