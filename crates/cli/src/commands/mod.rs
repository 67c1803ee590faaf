use clap::Subcommand;

pub mod cache;
pub mod config;
pub mod lock;

use self::cache::CacheCommands;
use self::lock::LockCommands;

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect and maintain cache entries
    #[command(visible_alias = "c")]
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Inspect and maintain lock records
    #[command(visible_alias = "l")]
    Lock {
        #[command(subcommand)]
        command: LockCommands,
    },

    /// Print the effective configuration
    Config,
}
