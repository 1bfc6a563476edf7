//! EPUB parsing and extraction module
//!
//! Container extraction, OPF parsing and HTML text handling. Vendor-specific
//! interpretation lives in `crate::transform`.

pub mod container;
pub mod html;
pub mod opf;
mod types;

pub use container::RawContainer;
pub use opf::{ManifestItem, OpfMetadata, OpfPackage};
pub use types::*;
