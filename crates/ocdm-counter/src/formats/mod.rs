//! # Formats
//!
//! On-disk encodings. File I/O lives in `storage`.

pub mod record;

pub use record::RecordFault;
