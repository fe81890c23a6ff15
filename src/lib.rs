//! fwforge library.
//!
//! Two independent build hooks sharing only configuration:
//! - [`version`] derives the build version from the checkout and writes it as
//!   compiled constants
//! - [`factory`] merges the built images into one flashable factory image

pub mod clean;
pub mod commands;
pub mod config;
pub mod download;
pub mod error;
pub mod factory;
pub mod preflight;
pub mod process;
pub mod report;
pub mod timing;
pub mod version;

pub use error::BuildError;
