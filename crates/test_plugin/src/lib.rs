//! This crate extends the Volition AI library with a plugin used to standardize testing the library itself.

mod helpers;
mod plugin;

pub use helpers::*;
pub use plugin::VolitionTestPlugin;
