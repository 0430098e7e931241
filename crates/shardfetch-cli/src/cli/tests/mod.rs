//! CLI parse and report formatting tests.

use super::{Cli, CliCommand, RunArgs};
use clap::Parser;

pub(super) fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

pub(super) fn parse_run(args: &[&str]) -> RunArgs {
    match parse(args) {
        CliCommand::Run(run) => run,
        other => panic!("expected Run, got {other:?}"),
    }
}
