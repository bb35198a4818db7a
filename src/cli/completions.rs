use clap::CommandFactory;
use clap_complete::Shell;

use crate::error::Result;

pub fn run(shell: Shell) -> Result<()> {
    let mut cmd = super::Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}
