/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/

//! This crate extends the Volition AI library with a solution for loading
//! `ActionSets` from any available Bevy [`AssetSource`](https://docs.rs/bevy/latest/bevy/asset/io/struct.AssetSource.html).
//!
//! For stock Bevy, this includes in-memory, local filesystem, or web URLs,
//! depending on the enabled features and the platform you are building for.
//!
//! ActionSet manifests are pure data - kind names and score weights - so a
//! loaded set still needs an `ActionRegistry` with matching factories before
//! it can be spawned onto a brain.

mod loader;

pub use loader::*;
