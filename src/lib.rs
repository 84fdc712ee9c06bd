//! A minimal command-tree framework for command line tools
//!
//! A tool is a tree of [`Command`]s. Internal nodes dispatch on the next
//! positional argument, leaves run an action, and every node parses its own
//! [`FlagSet`] before looking further. Each node can render its help text,
//! and [`version`] derives a display version from build metadata captured by
//! [`build_info!`].
//!
//! ```no_run
//! use verbtree::{CancellationToken, Command};
//!
//! let mut root = Command::new("tool")
//!     .with_short("tool does useful things")
//!     .with_usage_line("tool <command> [arguments]")
//!     .with_long("Tool does useful things.")
//!     .with_subcommand(
//!         Command::new("greet")
//!             .with_short("greet prints a greeting")
//!             .with_usage_line("tool greet [-name name]")
//!             .with_long("Greet prints a greeting.")
//!             .with_flags(|f| {
//!                 f.string("name", "world", "who to greet");
//!             })
//!             .with_action(|_ctx, cmd, _args| {
//!                 println!("hello {}", cmd.flags().get_string("name").unwrap_or_default());
//!                 Ok(())
//!             }),
//!     );
//! let args: Vec<String> = std::env::args().skip(1).collect();
//! root.run(&CancellationToken::new(), &args).unwrap();
//! ```

pub mod command;
pub mod flags;
pub mod logger;
pub mod usage;
pub mod validate;
pub mod vcs;
pub mod version;

pub use command::{Action, Command, CommandError};
pub use flags::{Flag, FlagError, FlagSet, FlagValue};
pub use tokio_util::sync::CancellationToken;
pub use validate::{ValidationErrors, Violation};
pub use version::{BuildInfo, BuildSetting, version};

/// Build information of this crate, as embedded by its build script.
#[must_use]
pub fn build_info() -> BuildInfo {
    crate::build_info!()
}

/// Version string of this crate's build.
#[must_use]
pub fn current_version() -> String {
    version(&build_info())
}
