//! Arrow data format conversion.
//!
//! Decoded result pages are converted column by column into Apache Arrow
//! record batches.

mod builders;
mod converter;

pub use builders::build_array;
pub use converter::ArrowConverter;
