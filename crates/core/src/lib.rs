/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/

pub mod action;
pub mod actionset;
pub mod blackboard;
pub mod brain;
pub mod debugger;
pub mod decision_loop;
pub mod errors;
pub mod events;
pub mod score;
pub mod tags;
pub mod types;
