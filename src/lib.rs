// Textbook RSA file signing
// Keyed block hash, raw RSA signatures and the appended-signature file format

pub mod config;
pub mod error;
pub mod ops;
pub mod rsa;
pub mod util;

pub use config::Config;
pub use error::{Error, Result};
