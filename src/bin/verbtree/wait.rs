use std::time::Duration;

use log::info;

use verbtree::{CancellationToken, Command, CommandError};

const DEFAULT_SECONDS: i64 = 10;

pub fn command() -> Command {
    Command::new("wait")
        .with_short("wait sleeps until a timeout or until interrupted")
        .with_usage_line("verbtree wait [-seconds n]")
        .with_long(
            "Wait sleeps for the given number of seconds. Pressing Ctrl+C cancels\n\
             the wait and makes the command fail.",
        )
        .with_flags(|f| {
            f.int("seconds", DEFAULT_SECONDS, "how long to wait, in seconds");
        })
        .with_action(run)
}

fn run(ctx: &CancellationToken, cmd: &Command, _args: &[String]) -> Result<(), CommandError> {
    let seconds = cmd.flags().get_int("seconds").unwrap_or(DEFAULT_SECONDS);
    let seconds = u64::try_from(seconds).map_err(|_| {
        CommandError::action(format!("-seconds must not be negative, got {seconds}"))
    })?;

    let handle = tokio::runtime::Handle::try_current().map_err(CommandError::action)?;
    handle.block_on(async {
        tokio::select! {
            () = ctx.cancelled() => Err(CommandError::action("wait cancelled")),
            () = tokio::time::sleep(Duration::from_secs(seconds)) => {
                info!("Waited {seconds}s");
                Ok(())
            }
        }
    })
}
