use cotador_core::config::LoadOptions;

use crate::commands::{block_on, finish, load_config, open_store, CommandResult};

pub fn run(options: LoadOptions) -> CommandResult {
    finish(execute(options))
}

fn execute(options: LoadOptions) -> Result<CommandResult, CommandResult> {
    const COMMAND: &str = "migrate";
    let config = load_config(COMMAND, options)?;

    block_on(COMMAND, async {
        let pool = open_store(COMMAND, &config).await?;
        pool.close().await;
        Ok(CommandResult::success(COMMAND, "applied pending migrations"))
    })
}
