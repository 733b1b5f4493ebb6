use std::sync::OnceLock;

use fsio::EntryKind;
use regex::Regex;
use thiserror::Error;

/// Failures raised while parsing chmod commands.
#[derive(Debug, Error)]
pub enum ChmodParseError {
    /// The command does not match the accepted grammar.
    #[error("invalid chmod command '{command}'")]
    Invalid {
        /// The rejected command.
        command: String,
    },

    /// More than one octal replacement was given for the same kind.
    #[error("multiple octal chmod commands for {kind}")]
    DuplicateOctal {
        /// `files` or `directories`.
        kind: &'static str,
    },

    /// Octal and symbolic commands were mixed for the same kind.
    #[error("octal and symbolic chmod commands mixed for {kind}")]
    Mixed {
        /// `files` or `directories`.
        kind: &'static str,
    },
}

/// One symbolic edit: who, operator, permission letters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct SymbolicEdit {
    user: bool,
    group: bool,
    other: bool,
    op: char,
    read: bool,
    write: bool,
    execute: bool,
    execute_if_meaningful: bool,
    sticky: bool,
}

impl SymbolicEdit {
    fn apply(self, mode: u32, kind: EntryKind) -> u32 {
        let execute = self.execute
            || (self.execute_if_meaningful
                && (kind == EntryKind::Directory || mode & 0o111 != 0));

        let mut bits = 0;
        if self.read {
            bits |= 0o4;
        }
        if self.write {
            bits |= 0o2;
        }
        if execute {
            bits |= 0o1;
        }

        let mut mask = 0;
        let mut value = 0;
        if self.user {
            mask |= 0o700;
            value |= bits << 6;
        }
        if self.group {
            mask |= 0o070;
            value |= bits << 3;
        }
        if self.other {
            mask |= 0o007;
            value |= bits;
        }

        let mut mode = mode;
        match self.op {
            '+' => mode |= value,
            '-' => mode &= !value,
            '=' => mode = (mode & !mask) | value,
            _ => unreachable!("operator is validated at parse time"),
        }

        if self.sticky {
            match self.op {
                '+' | '=' => mode |= 0o1000,
                '-' => mode &= !0o1000,
                _ => {}
            }
        }

        mode
    }
}

/// The mutation configured for one entry kind.
#[derive(Clone, Debug)]
enum KindRule {
    Octal(u32),
    Symbolic(Vec<SymbolicEdit>),
}

/// Compiled per-kind permission mutations.
///
/// Commands take an optional `F` (files) or `D` (directories) prefix; an
/// unprefixed command applies to both kinds. The body is either a 3-4 digit
/// octal replacement or a symbolic edit `[ugoa]{0,3}[+=-][rwxXt]{1,4}`.
/// Symbolic edits accumulate in command order; `X` grants execute only to
/// directories and to entries that already carry an execute bit.
#[derive(Clone, Debug, Default)]
pub struct ChmodSet {
    file: Option<KindRule>,
    dir: Option<KindRule>,
}

fn command_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[FD]?([01]?[0-7]{3}|[ugoa]{0,3}[+=\-][rwxXt]{1,4})$")
            .expect("chmod grammar regex is valid")
    })
}

impl ChmodSet {
    /// An empty set; applies no mutation.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a list of chmod commands into a per-kind rule set.
    pub fn parse<I, S>(commands: I) -> Result<Self, ChmodParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for command in commands {
            let command = command.as_ref();
            if !command_regex().is_match(command) {
                return Err(ChmodParseError::Invalid {
                    command: command.to_owned(),
                });
            }

            let (kinds, body) = match command.as_bytes()[0] {
                b'F' => ((true, false), &command[1..]),
                b'D' => ((false, true), &command[1..]),
                _ => ((true, true), command),
            };

            if body.as_bytes()[0].is_ascii_digit() {
                let mode = u32::from_str_radix(body, 8).map_err(|_| ChmodParseError::Invalid {
                    command: command.to_owned(),
                })?;
                if kinds.0 {
                    Self::push_octal(&mut set.file, mode, "files")?;
                }
                if kinds.1 {
                    Self::push_octal(&mut set.dir, mode, "directories")?;
                }
            } else {
                let edit = parse_symbolic(body).ok_or_else(|| ChmodParseError::Invalid {
                    command: command.to_owned(),
                })?;
                if kinds.0 {
                    Self::push_symbolic(&mut set.file, edit, "files")?;
                }
                if kinds.1 {
                    Self::push_symbolic(&mut set.dir, edit, "directories")?;
                }
            }
        }
        Ok(set)
    }

    fn push_octal(
        slot: &mut Option<KindRule>,
        mode: u32,
        kind: &'static str,
    ) -> Result<(), ChmodParseError> {
        match slot {
            None => {
                *slot = Some(KindRule::Octal(mode));
                Ok(())
            }
            Some(KindRule::Octal(_)) => Err(ChmodParseError::DuplicateOctal { kind }),
            Some(KindRule::Symbolic(_)) => Err(ChmodParseError::Mixed { kind }),
        }
    }

    fn push_symbolic(
        slot: &mut Option<KindRule>,
        edit: SymbolicEdit,
        kind: &'static str,
    ) -> Result<(), ChmodParseError> {
        match slot {
            None => {
                *slot = Some(KindRule::Symbolic(vec![edit]));
                Ok(())
            }
            Some(KindRule::Symbolic(chain)) => {
                chain.push(edit);
                Ok(())
            }
            Some(KindRule::Octal(_)) => Err(ChmodParseError::Mixed { kind }),
        }
    }

    /// Whether a mutation is configured for `kind`.
    #[must_use]
    pub fn has_rule_for(&self, kind: EntryKind) -> bool {
        match kind {
            EntryKind::File => self.file.is_some(),
            EntryKind::Directory => self.dir.is_some(),
        }
    }

    /// Evaluates the mutation for `kind` against `base` permission bits.
    /// Returns `base` unchanged when no rule is configured.
    #[must_use]
    pub fn apply(&self, kind: EntryKind, base: u32) -> u32 {
        let rule = match kind {
            EntryKind::File => self.file.as_ref(),
            EntryKind::Directory => self.dir.as_ref(),
        };
        match rule {
            None => base,
            Some(KindRule::Octal(mode)) => *mode,
            Some(KindRule::Symbolic(chain)) => chain
                .iter()
                .fold(base, |mode, edit| edit.apply(mode, kind)),
        }
    }
}

fn parse_symbolic(body: &str) -> Option<SymbolicEdit> {
    let op_idx = body.find(['+', '=', '-'])?;
    let (who, rest) = body.split_at(op_idx);
    let op = rest.chars().next()?;
    let perms = &rest[1..];

    let mut edit = SymbolicEdit {
        user: false,
        group: false,
        other: false,
        op,
        read: false,
        write: false,
        execute: false,
        execute_if_meaningful: false,
        sticky: false,
    };

    if who.is_empty() {
        edit.user = true;
        edit.group = true;
        edit.other = true;
    }
    for ch in who.chars() {
        match ch {
            'u' => edit.user = true,
            'g' => edit.group = true,
            'o' => edit.other = true,
            'a' => {
                edit.user = true;
                edit.group = true;
                edit.other = true;
            }
            _ => return None,
        }
    }
    for ch in perms.chars() {
        match ch {
            'r' => edit.read = true,
            'w' => edit.write = true,
            'x' => edit.execute = true,
            'X' => edit.execute_if_meaningful = true,
            't' => edit.sticky = true,
            _ => return None,
        }
    }
    Some(edit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octal_replaces_for_the_named_kind() {
        let set = ChmodSet::parse(["F644", "D755"]).expect("parse");
        assert_eq!(set.apply(EntryKind::File, 0o777), 0o644);
        assert_eq!(set.apply(EntryKind::Directory, 0o700), 0o755);
    }

    #[test]
    fn unprefixed_octal_applies_to_both_kinds() {
        let set = ChmodSet::parse(["700"]).expect("parse");
        assert_eq!(set.apply(EntryKind::File, 0o644), 0o700);
        assert_eq!(set.apply(EntryKind::Directory, 0o755), 0o700);
    }

    #[test]
    fn symbolic_chain_accumulates_in_order() {
        let set = ChmodSet::parse(["Fu+w", "Fo-r"]).expect("parse");
        assert_eq!(set.apply(EntryKind::File, 0o444), 0o640);
    }

    #[test]
    fn equals_clears_before_setting() {
        let set = ChmodSet::parse(["Fu=rw"]).expect("parse");
        assert_eq!(set.apply(EntryKind::File, 0o755), 0o655);
    }

    #[test]
    fn capital_x_only_grants_execute_where_meaningful() {
        let set = ChmodSet::parse(["a+X"]).expect("parse");
        // A directory always gains execute.
        assert_eq!(set.apply(EntryKind::Directory, 0o644), 0o755);
        // A file without any execute bit stays as it was.
        assert_eq!(set.apply(EntryKind::File, 0o644), 0o644);
        // A file with an execute bit gains it everywhere.
        assert_eq!(set.apply(EntryKind::File, 0o744), 0o755);
    }

    #[test]
    fn sticky_bit_toggles_with_t() {
        let set = ChmodSet::parse(["D+t"]).expect("parse");
        assert_eq!(set.apply(EntryKind::Directory, 0o755), 0o1755);
        let set = ChmodSet::parse(["D-t"]).expect("parse");
        assert_eq!(set.apply(EntryKind::Directory, 0o1755), 0o755);
    }

    #[test]
    fn four_digit_octal_keeps_sticky() {
        let set = ChmodSet::parse(["D1777"]).expect("parse");
        assert_eq!(set.apply(EntryKind::Directory, 0o755), 0o1777);
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(matches!(
            ChmodSet::parse(["F9999"]),
            Err(ChmodParseError::Invalid { .. })
        ));
        assert!(matches!(
            ChmodSet::parse(["u+q"]),
            Err(ChmodParseError::Invalid { .. })
        ));
        assert!(matches!(
            ChmodSet::parse(["banana"]),
            Err(ChmodParseError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_octal_per_kind() {
        assert!(matches!(
            ChmodSet::parse(["F644", "F600"]),
            Err(ChmodParseError::DuplicateOctal { kind: "files" })
        ));
        // Distinct kinds are fine.
        assert!(ChmodSet::parse(["F644", "D755"]).is_ok());
    }

    #[test]
    fn rejects_mixing_octal_and_symbolic_per_kind() {
        assert!(matches!(
            ChmodSet::parse(["F644", "Fu+w"]),
            Err(ChmodParseError::Mixed { kind: "files" })
        ));
        // An unprefixed symbolic after a file-octal collides on the file kind.
        assert!(matches!(
            ChmodSet::parse(["F644", "u+w"]),
            Err(ChmodParseError::Mixed { kind: "files" })
        ));
    }
}
