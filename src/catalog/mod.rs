//! Read-only reference data loaded once at startup
//!
//! - `labels`: class name ↔ classifier output index
//! - `disease`: cause/cure text per class

pub mod disease;
pub mod labels;

pub use disease::{DiseaseRecord, DiseaseTable};
pub use labels::LabelCatalog;
