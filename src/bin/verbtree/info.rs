use std::io::Write;

use verbtree::{CancellationToken, Command, CommandError, version};

pub fn command() -> Command {
    Command::new("build")
        .with_short("build inspects how this binary was built")
        .with_usage_line("verbtree build <command> [arguments]")
        .with_long("Build inspects the metadata embedded into this binary at compile time.")
        .with_subcommand(
            Command::new("info")
                .with_short("info prints the embedded build settings")
                .with_usage_line("verbtree build info [-json]")
                .with_long(
                    "Info prints the module version and the source control settings\n\
                     recorded when this binary was compiled.",
                )
                .with_flags(|f| {
                    f.bool("json", false, "print the build information as JSON");
                })
                .with_action(run),
        )
}

fn run(_ctx: &CancellationToken, cmd: &Command, _args: &[String]) -> Result<(), CommandError> {
    let info = verbtree::build_info();
    let mut stdout = std::io::stdout().lock();
    if cmd.flags().get_bool("json").unwrap_or_default() {
        serde_json::to_writer_pretty(&mut stdout, &info).map_err(CommandError::action)?;
        writeln!(stdout)?;
        return Ok(());
    }

    writeln!(stdout, "version\t{}", version(&info))?;
    writeln!(stdout, "main\t{}", info.main_version)?;
    for setting in &info.settings {
        writeln!(stdout, "{}\t{}", setting.key, setting.value)?;
    }
    Ok(())
}
