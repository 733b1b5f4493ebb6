#![deny(unsafe_code)]

//! The include/exclude rule language controlling copying and deletion.
//!
//! Rules are written as `<polarity>[<modifiers>] <pattern>` where the
//! polarity is `+` (include) or `-` (exclude), the modifiers are `!`
//! (negate: the rule applies when the pattern does *not* match) and `/`
//! (force matching against the full path) in any order, and the pattern is a
//! glob. A leading `/` on the pattern anchors it to the entry's base path; a
//! trailing `/` restricts it to directories.
//!
//! Rule strings are compiled once, up front; matching never re-parses them.
//! Selection is first-match-wins over the rule list, and an entry with no
//! applicable rule is kept.

mod rule;
mod set;

pub use rule::{FilterParseError, FilterRule, Polarity};
pub use set::FilterSet;
