//! Band resolution and validation
//!
//! Maps semantic band names (`red`, `nir`, `thermal`, ...) to the physical
//! bands of a source product by their description strings, and derives the
//! QA validity mask.

mod mapping;
mod name;
mod qa;
mod resolver;

pub use mapping::BandMapping;
pub use name::BandName;
pub use qa::{qa_valid_mask, QaParams};
pub use resolver::{BandResolver, BandSet, BandStatus};
