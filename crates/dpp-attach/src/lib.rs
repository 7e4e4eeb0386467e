//! Attachment index and byte storage for the DPP core.
//!
//! Attachments are split across two layers. The [`AttachmentIndex`] owns
//! the metadata records ([`dpp_types::AttachmentReference`]) keyed by
//! attachment identifier; the [`BlobStore`] collaborator owns the bytes,
//! addressed by an opaque path the index derives deterministically from
//! the reference. Passports hold only attachment identifiers.
//!
//! # Design rules
//!
//! 1. The index lock is never held across blob I/O. Metadata is cloned
//!    out, bytes move, then the index is updated.
//! 2. Storage paths are derived from the reference, never supplied by the
//!    caller: `dpps/<source_id>/<file_name>` for instance attachments,
//!    `templates/<template_id>/vLatest/<file_name>` for template
//!    attachments (published versions would get a version-qualified path;
//!    only the latest case exists today).
//! 3. A reference whose `path` is `None` is known-but-unavailable:
//!    retrieval fails `Unavailable`, distinctly from `NotFound`.

pub mod blob;
pub mod error;
pub mod index;
pub mod thumbnail;

// Re-export primary types at crate root for ergonomic imports.
pub use blob::{BlobStore, FilesystemBlobStore};
pub use error::{AttachError, AttachResult};
pub use index::{AttachmentIndex, ManifestEntry};
pub use thumbnail::render_thumbnail;
