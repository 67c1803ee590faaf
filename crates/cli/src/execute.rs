use crate::commands::Commands;
use keystone_core::CoordinationConfig;

impl Commands {
    pub async fn execute(self, config: CoordinationConfig) -> eyre::Result<()> {
        match self {
            Commands::Cache { command } => command.execute(&config.cache).await,
            Commands::Lock { command } => command.execute(&config.lock).await,
            Commands::Config => crate::commands::config::show(&config),
        }
    }
}
