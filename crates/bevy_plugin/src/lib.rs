/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/

//! This crate extends the Volition AI library with a plugin that streamlines
//! the integration of Volition into an existing Bevy application.
//!
//! The plugin handles the basic gruntwork - registering the decision-loop
//! System on a fixed cadence, the shared Resources, and the notification
//! Messages that form the 'framework' part of the AI.
//!
//! What's left for you to do after adding it in is registering your action
//! kinds (via `RegistersActionKinds`) and spawning agents with a
//! `UtilityBrain` (plus, usually, a `TagContainer` and a `Blackboard`).

mod plugin;

pub use plugin::VolitionPlugin;
