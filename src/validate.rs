//! Construction checks for command trees
//!
//! Mistakes in how a tree is put together are programmer errors. They are
//! collected in one walk so a CLI can report all of them at startup instead
//! of failing on whichever path a user happens to take.

use std::collections::HashSet;

use thiserror::Error;

use crate::command::Command;

/// A single problem found in a command tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("command under '{parent}' has an empty name")]
    EmptyName { parent: String },
    #[error("command '{path}' has whitespace in its name")]
    NameWhitespace { path: String },
    #[error("command '{path}' is missing documentation: {field}")]
    MissingDocumentation { path: String, field: &'static str },
    #[error("command '{path}': short description must begin with its name")]
    ShortNameMismatch { path: String },
    #[error("command '{path}' has more than one subcommand named '{name}'")]
    DuplicateName { path: String, name: String },
    #[error("command '{path}' has neither an action nor subcommands")]
    NotRunnable { path: String },
}

/// Every [`Violation`] found in a tree, in depth-first order
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid command tree: {}", join_violations(.0))]
pub struct ValidationErrors(pub Vec<Violation>);

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Command {
    /// Check this command and all of its descendants for construction
    /// mistakes.
    ///
    /// # Errors
    ///
    /// Returns every violation found in the tree.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut violations = Vec::new();
        check_command(self, "", &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(violations))
        }
    }
}

fn check_command(cmd: &Command, parent: &str, violations: &mut Vec<Violation>) {
    let path = match (parent.is_empty(), cmd.name().is_empty()) {
        (_, true) => {
            violations.push(Violation::EmptyName {
                parent: parent.to_string(),
            });
            format!("{parent} <unnamed>").trim_start().to_string()
        }
        (true, false) => cmd.name().to_string(),
        (false, false) => format!("{parent} {}", cmd.name()),
    };

    if cmd.name().chars().any(char::is_whitespace) {
        violations.push(Violation::NameWhitespace { path: path.clone() });
    }

    for (field, text) in [
        ("short", cmd.short()),
        ("usage line", cmd.usage_line()),
        ("long", cmd.long()),
    ] {
        if text.trim().is_empty() {
            violations.push(Violation::MissingDocumentation {
                path: path.clone(),
                field,
            });
        }
    }

    if !cmd.short().trim().is_empty() && cmd.short().split_whitespace().next() != Some(cmd.name())
    {
        violations.push(Violation::ShortNameMismatch { path: path.clone() });
    }

    if !cmd.has_action() && cmd.children().is_empty() {
        violations.push(Violation::NotRunnable { path: path.clone() });
    }

    let mut seen = HashSet::new();
    for child in cmd.children() {
        if !seen.insert(child.name()) {
            violations.push(Violation::DuplicateName {
                path: path.clone(),
                name: child.name().to_string(),
            });
        }
    }

    for child in cmd.children() {
        check_command(child, &path, violations);
    }
}
