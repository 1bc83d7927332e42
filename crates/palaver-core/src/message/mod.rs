//! Message domain module.
//!
//! - `model`: the canonical `Message` record and its `MessageKind`
//!
//! Legacy field aliases never reach this module; they are resolved by the
//! normalizer in the infrastructure layer.

mod model;

pub use model::{Message, MessageIdentity, MessageKind};
