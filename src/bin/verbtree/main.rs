mod info;
mod wait;

use std::fs::File;
use std::io::Write;
use std::process::ExitCode;

use log::debug;

use verbtree::{CancellationToken, Command, CommandError};

fn cli() -> Command {
    Command::new("verbtree")
        .with_short("verbtree reports build metadata and runs cancellable work")
        .with_usage_line("verbtree <command> [arguments]")
        .with_long(
            "Verbtree is a small tool built on the verbtree command framework.\n\
             It reports how it was built and demonstrates cancellable commands.",
        )
        .with_subcommand(version_command())
        .with_subcommand(info::command())
        .with_subcommand(wait::command())
}

fn version_command() -> Command {
    Command::new("version")
        .with_short("version prints the version of this binary")
        .with_usage_line("verbtree version")
        .with_long(
            "Version prints the release tag this binary was built from, or a\n\
             pseudo-version derived from its commit when there is no tag.",
        )
        .with_action(|_ctx, _cmd, _args| {
            writeln!(std::io::stdout(), "{}", verbtree::current_version())?;
            Ok(())
        })
}

fn main() -> ExitCode {
    let log_file = match std::env::var_os("VERBTREE_LOG_FILE")
        .map(File::create)
        .transpose()
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error: unable to create log file: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = verbtree::logger::init(log_file) {
        eprintln!("Error: {e}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(()) | Err(CommandError::Help) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if e.is_usage_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Exit status of a process stopped by SIGINT.
const INTERRUPTED: i32 = 130;

/// Cancel `token` on the first interrupt. Returns `true` once a second
/// interrupt arrives and `false` if the signal cannot be received.
///
/// Listening for Ctrl+C replaces the default SIGINT handler, so an action that
/// ignores cancellation would otherwise leave no way to stop the process.
async fn watch_interrupts<F>(token: CancellationToken, mut interrupted: impl FnMut() -> F) -> bool
where
    F: Future<Output = std::io::Result<()>>,
{
    if interrupted().await.is_err() {
        return false;
    }
    debug!("Received Ctrl+C signal");
    token.cancel();
    interrupted().await.is_ok()
}

#[tokio::main]
async fn run(args: Vec<String>) -> Result<(), CommandError> {
    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if watch_interrupts(signal_token, tokio::signal::ctrl_c).await {
            std::process::exit(INTERRUPTED);
        }
    });

    // Actions are synchronous; keep them off the async workers
    let mut root = cli();
    tokio::task::spawn_blocking(move || root.run(&token, &args))
        .await
        .map_err(CommandError::action)?
}
