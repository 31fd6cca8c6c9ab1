// Utility Module
// File access and the signed-file format

pub mod file_ops;
pub mod signed_file;

pub use file_ops::{default_signed_path, load_signed_message, save_signed_message};
pub use signed_file::{DecodedSignedFile, DEFAULT_TAIL_WINDOW, SIGNATURE_DELIMITER};
