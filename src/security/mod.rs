//! Data-protection layers: audit-record encryption and PII scrubbing.
//!
//! - `encryption` holds the AES-256-GCM engine and key-file lifecycle used
//!   by the audit trail.
//! - `privacy` redacts PII from prompts before any cloud upload.

pub mod encryption;
pub mod privacy;

pub use encryption::AesEncryptor;
pub use privacy::scrub_text;
