//! Utility functions for media-tool

pub mod filename;
pub mod process;
pub mod url;

pub use filename::*;
pub use process::*;
pub use self::url::*;
