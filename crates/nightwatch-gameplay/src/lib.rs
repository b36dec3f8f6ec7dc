//! # Nightwatch Gameplay
//!
//! Guard AI for Nightwatch.
//!
//! This crate provides everything a guard needs to patrol, doze, get
//! suspicious, chase, search and catch the player:
//! - Guard behaviour state machine with table-driven entry/exit actions
//! - Guard profiles loaded from TOML
//! - Named timer slots behind an injectable timer service
//! - Perception facts buffered from engine callbacks
//! - Random search point generation around the last known location
//! - Deferred catch resolution
//! - Signals delivered to observers for every side effect

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod catch;
pub mod guard;
pub mod perception;
pub mod profile;
pub mod search;
pub mod signals;
pub mod state;
pub mod timer;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::catch::*;
    pub use crate::guard::*;
    pub use crate::perception::*;
    pub use crate::profile::*;
    pub use crate::search::*;
    pub use crate::signals::*;
    pub use crate::state::*;
    pub use crate::timer::*;
}

pub use prelude::*;
