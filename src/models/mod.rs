//! # Models
//!
//! The cached artifact ([`ContentRecord`]) and the composite key it is stored and
//! locked under ([`ContentKey`]).

pub mod content_key;
pub mod content_record;

pub use content_key::ContentKey;
pub use content_record::{Annotation, ContentRecord, GeneratedContent, NewContentRecord};
