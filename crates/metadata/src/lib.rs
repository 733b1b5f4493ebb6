#![deny(unsafe_code)]

//! Permission, ownership and timestamp handling for the hsync engine.
//!
//! Three concerns live here:
//!
//! - [`ChmodSet`]: per-kind permission mutations parsed from `chmod`-style
//!   commands (an octal replacement or a chain of symbolic edits);
//! - [`NameMapping`]: ordered first-match-wins remapping of owner and group
//!   names, with `*` wildcards and the `chown` shorthand;
//! - [`MetadataPlanner`]: applies modification time, permissions and
//!   ownership to a processed entry, in that order, after any descent into
//!   the entry has completed.

mod chmod;
mod mapping;
mod planner;

pub use chmod::{ChmodParseError, ChmodSet};
pub use mapping::{parse_chown, MappingParseError, NameMapping};
pub use planner::{MetadataOptions, MetadataPlanner};
