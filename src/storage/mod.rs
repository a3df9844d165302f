// Media storage module
//
// Split into focused files:
// - overwrite.rs: File system storage that replaces files on name collision
// - file_ref.rs: Reference from a record to a stored file

pub mod overwrite;
pub mod file_ref;

pub use overwrite::{sanitize_file_name, OverwriteStorage};
pub use file_ref::FileRef;
