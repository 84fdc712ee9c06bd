//! Command tree and argument dispatch
//!
//! A [`Command`] either runs an action or dispatches to one of its children by
//! name. Dispatch consumes one token per level: the command parses its own
//! flags, then the first positional argument selects the child that handles
//! the rest. There is no backtracking, so a wrong turn surfaces as a lookup or
//! flag error further down.

use std::error::Error as StdError;
use std::fmt;
use std::io::{self, Write};

use log::{debug, warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::flags::{FlagError, FlagSet};
use crate::validate::ValidationErrors;

/// Terminal behavior of a command.
///
/// Receives the cancellation token passed to [`Command::run`], the command
/// itself and the positional arguments left after flag parsing.
pub type Action = Box<
    dyn Fn(&CancellationToken, &Command, &[String]) -> Result<(), CommandError> + Send + Sync,
>;

/// Errors returned while resolving and running a command
#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Flag(FlagError),
    #[error("help requested")]
    Help,
    #[error("no arguments provided")]
    NoArguments,
    #[error("invalid command: {0:?}")]
    InvalidCommand(String),
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Action(Box<dyn StdError + Send + Sync>),
}

impl CommandError {
    /// Wrap an error raised inside an action.
    pub fn action(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        CommandError::Action(err.into())
    }

    /// Whether the error comes from the command line itself rather than from
    /// running an action.
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            CommandError::Flag(_) | CommandError::NoArguments | CommandError::InvalidCommand(_)
        )
    }
}

impl From<FlagError> for CommandError {
    fn from(err: FlagError) -> Self {
        match err {
            FlagError::Help => CommandError::Help,
            other => CommandError::Flag(other),
        }
    }
}

/// A node in a command tree
#[derive(Default)]
pub struct Command {
    name: String,
    short: String,
    usage_line: String,
    long: String,
    action: Option<Action>,
    children: Vec<Command>,
    flags: FlagSet,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("short", &self.short)
            .field("usage_line", &self.usage_line)
            .field("action", &self.action.is_some())
            .field("children", &self.children)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl Command {
    /// Create a command named `name`. Its short description must start with
    /// the same word, see [`Command::validate`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Command {
            name: name.into(),
            ..Default::default()
        }
    }

    /// One-line summary, beginning with the command name.
    #[must_use]
    pub fn with_short(mut self, short: impl Into<String>) -> Self {
        self.short = short.into();
        self
    }

    /// One-line invocation syntax shown under `Usage:`.
    #[must_use]
    pub fn with_usage_line(mut self, usage_line: impl Into<String>) -> Self {
        self.usage_line = usage_line.into();
        self
    }

    /// Full help text shown at the top of the usage output.
    #[must_use]
    pub fn with_long(mut self, long: impl Into<String>) -> Self {
        self.long = long.into();
        self
    }

    #[must_use]
    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&CancellationToken, &Command, &[String]) -> Result<(), CommandError>
            + Send
            + Sync
            + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    /// Append a child command. Children are listed in insertion order.
    #[must_use]
    pub fn with_subcommand(mut self, child: Command) -> Self {
        self.children.push(child);
        self
    }

    /// Declare flags on this command's local flag set.
    #[must_use]
    pub fn with_flags(mut self, declare: impl FnOnce(&mut FlagSet)) -> Self {
        declare(&mut self.flags);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn short(&self) -> &str {
        &self.short
    }

    #[must_use]
    pub fn usage_line(&self) -> &str {
        &self.usage_line
    }

    #[must_use]
    pub fn long(&self) -> &str {
        &self.long
    }

    #[must_use]
    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    #[must_use]
    pub fn children(&self) -> &[Command] {
        &self.children
    }

    #[must_use]
    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut FlagSet {
        &mut self.flags
    }

    /// Find the first child named `name`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidCommand` if no child has that name.
    pub fn lookup(&self, name: &str) -> Result<&Command, CommandError> {
        self.children
            .iter()
            .find(|child| child.name == name)
            .ok_or_else(|| CommandError::InvalidCommand(name.to_string()))
    }

    /// Mutable variant of [`Command::lookup`].
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidCommand` if no child has that name.
    pub fn lookup_mut(&mut self, name: &str) -> Result<&mut Command, CommandError> {
        self.children
            .iter_mut()
            .find(|child| child.name == name)
            .ok_or_else(|| CommandError::InvalidCommand(name.to_string()))
    }

    /// Validate the tree, then resolve `args` to an action and run it. Usage
    /// text is written to standard error.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Invalid` for a malformed tree, a user error
    /// (`Flag`, `Help`, `NoArguments`, `InvalidCommand`) if the arguments do
    /// not resolve, or whatever the action returns.
    pub fn run(&mut self, ctx: &CancellationToken, args: &[String]) -> Result<(), CommandError> {
        self.run_with_output(ctx, args, &mut io::stderr())
    }

    /// Like [`Command::run`], writing usage text to `out`.
    ///
    /// # Errors
    ///
    /// See [`Command::run`].
    pub fn run_with_output(
        &mut self,
        ctx: &CancellationToken,
        args: &[String],
        out: &mut dyn Write,
    ) -> Result<(), CommandError> {
        self.validate()?;
        self.dispatch(ctx, args, out)
    }

    fn dispatch(
        &mut self,
        ctx: &CancellationToken,
        args: &[String],
        out: &mut dyn Write,
    ) -> Result<(), CommandError> {
        debug!("Parsing {} argument(s) for '{}'", args.len(), self.name);
        if let Err(err) = self.flags.parse(args) {
            if err != FlagError::Help
                && let Err(e) = writeln!(out, "{err}")
            {
                warn!("Unable to write flag error for '{}': {e}", self.name);
            }
            self.report_usage(out);
            return Err(err.into());
        }

        if let Some(action) = &self.action {
            debug!("Running action of '{}'", self.name);
            return action(ctx, self, self.flags.args());
        }

        let remaining = self.flags.args().to_vec();
        let Some((first, rest)) = remaining.split_first() else {
            self.report_usage(out);
            return Err(CommandError::NoArguments);
        };
        let child = self.lookup_mut(first)?;
        debug!("Dispatching to '{}'", child.name);
        child.dispatch(ctx, rest, out)
    }

    fn report_usage(&self, out: &mut dyn Write) {
        if let Err(e) = self.write_usage(out) {
            warn!("Unable to write usage for '{}': {e}", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn documented(name: &str) -> Command {
        Command::new(name)
            .with_short(format!("{name} runs the {name} command"))
            .with_usage_line(format!("{name} [flags]"))
            .with_long(format!("The {name} command."))
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_lookup() {
        let root = documented("root")
            .with_subcommand(documented("foo"))
            .with_subcommand(documented("bar"));
        for name in ["foo", "bar"] {
            assert_eq!(root.lookup(name).unwrap().name(), name);
        }
        match root.lookup("baz") {
            Err(CommandError::InvalidCommand(name)) => assert_eq!(name, "baz"),
            other => panic!("Expected InvalidCommand, got: {other:?}"),
        }
    }

    #[test]
    fn test_lookup_first_match_wins() {
        let mut root = documented("root")
            .with_subcommand(documented("dup").with_long("first"))
            .with_subcommand(documented("dup").with_long("second"));
        assert_eq!(root.lookup("dup").unwrap().long(), "first");
        assert_eq!(root.lookup_mut("dup").unwrap().long(), "first");
    }

    #[test]
    fn test_action_receives_command_and_remainder() {
        let mut cmd = documented("echo")
            .with_flags(|f| {
                f.bool("upper", false, "uppercase output");
            })
            .with_action(|_ctx, cmd, args| {
                assert_eq!(cmd.name(), "echo");
                assert_eq!(cmd.flags().get_bool("upper"), Some(true));
                assert_eq!(args, ["hello".to_string(), "world".to_string()]);
                Ok(())
            });
        let mut out = Vec::new();
        cmd.run_with_output(
            &CancellationToken::new(),
            &args(&["-upper", "hello", "world"]),
            &mut out,
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_flag_error_writes_message_and_usage() {
        let mut cmd = documented("leaf").with_action(|_, _, _| Ok(()));
        let mut out = Vec::new();
        let err = cmd
            .run_with_output(&CancellationToken::new(), &args(&["-bogus"]), &mut out)
            .unwrap_err();
        assert!(matches!(err, CommandError::Flag(FlagError::NotDefined(_))));
        assert!(err.is_usage_error());
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with(
            "flag provided but not defined: -bogus\nThe leaf command.\n"
        ));
    }

    #[test]
    fn test_help_writes_usage_only() {
        let mut cmd = documented("leaf").with_action(|_, _, _| Ok(()));
        let mut out = Vec::new();
        let err = cmd
            .run_with_output(&CancellationToken::new(), &args(&["-h"]), &mut out)
            .unwrap_err();
        assert!(matches!(err, CommandError::Help));
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "The leaf command.\n\nUsage:\n  leaf [flags]\n\n"
        );
    }

    /// A sink that rejects every write.
    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("sink closed"))
        }
    }

    #[test]
    fn test_unwritable_output_keeps_dispatch_errors() {
        let ctx = CancellationToken::new();
        let mut root = documented("root")
            .with_subcommand(documented("leaf").with_action(|_, _, _| Ok(())));

        let err = root
            .run_with_output(&ctx, &[], &mut FailingWriter)
            .unwrap_err();
        assert!(matches!(err, CommandError::NoArguments));

        let err = root
            .run_with_output(&ctx, &args(&["leaf", "-bogus"]), &mut FailingWriter)
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Flag(FlagError::NotDefined(ref name)) if name == "bogus"
        ));

        let err = root
            .run_with_output(&ctx, &args(&["-h"]), &mut FailingWriter)
            .unwrap_err();
        assert!(matches!(err, CommandError::Help));
    }

    #[test]
    fn test_invalid_tree_is_rejected_before_dispatch() {
        let mut root = documented("root").with_subcommand(Command::new("bare"));
        let err = root
            .run_with_output(
                &CancellationToken::new(),
                &args(&["bare"]),
                &mut Vec::new(),
            )
            .unwrap_err();
        assert!(matches!(err, CommandError::Invalid(_)));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            CommandError::InvalidCommand("unknown".to_string()).to_string(),
            "invalid command: \"unknown\""
        );
        assert_eq!(
            CommandError::NoArguments.to_string(),
            "no arguments provided"
        );
        assert_eq!(CommandError::action("boom").to_string(), "boom");
    }
}
