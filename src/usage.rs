//! Help text rendering
//!
//! The layout is fixed: long description, `Usage:` line, an optional
//! `Commands:` table and an optional `Flags:` listing. Tools and tests may
//! compare it byte for byte.

use std::io::{self, Write};

use crate::command::Command;

/// Width of the name column in the `Commands:` table.
pub const NAME_COLUMN_WIDTH: usize = 25;

impl Command {
    /// Write this command's help text to `w`.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    ///
    /// # Panics
    ///
    /// Panics if the short description, usage line or long description is
    /// empty. [`Command::validate`] reports these before anything is run.
    pub fn write_usage(&self, w: &mut dyn Write) -> io::Result<()> {
        assert!(
            !self.short().is_empty() && !self.usage_line().is_empty() && !self.long().is_empty(),
            "command {:?} is missing documentation",
            self.name()
        );

        write!(w, "{}\n\n", self.long())?;
        write!(w, "Usage:\n  {}", self.usage_line())?;
        if !self.children().is_empty() {
            write!(w, "\n\nCommands:\n")?;
            for child in self.children() {
                write!(
                    w,
                    "\n  {:<width$}  {}",
                    child.name(),
                    summary(child.short()),
                    width = NAME_COLUMN_WIDTH
                )?;
            }
        }
        if !self.flags().is_empty() {
            write!(w, "\n\nFlags:\n")?;
            self.flags().write_defaults(w)?;
        }
        write!(w, "\n\n")
    }

    /// Help text as a string.
    ///
    /// # Panics
    ///
    /// Same as [`Command::write_usage`].
    #[must_use]
    pub fn usage(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_usage(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// A short description without its leading name, with runs of whitespace
/// collapsed to one space.
fn summary(short: &str) -> String {
    short.split_whitespace().skip(1).collect::<Vec<_>>().join(" ")
}
