pub mod apply;
pub mod check;
pub mod plan;
pub mod validate;

use super::args::{Cli, Command};
use crate::exit_codes::SUCCESS;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Plan(args) => plan::run(args).await,
        Command::Validate(args) => validate::run(args).await,
        Command::Apply(args) => apply::run(args).await,
        Command::Check(args) => check::run(args).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}
