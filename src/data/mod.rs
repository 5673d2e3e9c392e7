//! Fetched pages: null bitmaps, decoded column batches and rows.

mod batch;
mod bitmap;
mod row;

pub use batch::{BatchRows, ColumnBatch};
pub use bitmap::NullBitmap;
pub use row::Row;
