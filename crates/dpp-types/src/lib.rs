//! Foundation types for the DPP core.
//!
//! A Digital Product Passport (DPP) describes a physical product, its
//! ownership and activity history, its attachments, and nested
//! sub-products. Everything here is held **by reference**: a
//! [`PassportRecord`] carries only the identifiers of its attachments,
//! events, and sub-passports, never the objects themselves. The stores own
//! the objects; resolution back into nested documents happens in the
//! expansion engine.
//!
//! # Type groups
//!
//! - [`PassportRecord`], [`EventType`], [`EventRefs`] -- the normalized
//!   passport and its per-type event reference lists
//! - [`Entity`], [`Facility`] -- embedded-by-value relational parties
//! - [`AttachmentReference`] -- metadata record pointing at stored bytes
//! - [`ContentFormat`], [`OutputShape`], [`SignatureMode`] -- response
//!   format selectors
//! - [`ident`] -- identifier extraction and generation helpers

pub mod attachment;
pub mod entity;
pub mod error;
pub mod formats;
pub mod ident;
pub mod passport;
pub mod time;

// Re-export primary types at crate root for ergonomic imports.
pub use attachment::{AttachmentReference, AttachmentSource, AttachmentType};
pub use entity::{Entity, Facility, RepositoryAddress};
pub use error::{TypeError, TypeResult};
pub use formats::{ContentFormat, OutputShape, SignatureMode};
pub use passport::{EventRefs, EventType, PassportRecord};
