pub mod audio;
pub mod config;
pub mod error;
#[cfg(feature = "native")]
pub mod input;
#[cfg(feature = "native")]
pub mod runtime;
pub mod synth;

pub use error::{Error, Result};
