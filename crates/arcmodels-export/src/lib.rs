//! Writes validated models as ONNX files.
//!
//! [`Exporter::export`] validates the core model, lowers it to an ONNX
//! message, re-checks the message, and writes it. The encoding has a fixed
//! field order, so exporting an unchanged model always yields the same bytes.

pub mod checker;
pub mod encode;
pub mod exporter;

pub use checker::*;
pub use encode::*;
pub use exporter::*;
