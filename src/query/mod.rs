//! Query translation and batch execution.
//!
//! Host documents are parsed into descriptors, translated for one of the two
//! backends and run by the executor.

pub mod descriptor;
pub mod executor;

pub use descriptor::{join_tags, QueryDescriptor, Tag, Target, TimeRange, TranslatedQuery};
pub use executor::{QueryExecutor, QueryPayload, ResultEnvelope, FIXED_REF_ID};
