//! Media handling: reference classification and the upload store.

pub mod classify;
pub mod store;

pub use classify::{classify, MediaReference};
pub use store::{content_type_for, is_allowed_filename, sanitize_filename, MediaStore};
