//! User commands

use clap::{Args, Subcommand};
use reviewer_core::Engine;

use super::print_json;

/// User management commands
#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Mark a user as available for review
    Activate {
        /// User id
        user_id: String,
    },

    /// Mark a user as unavailable for future reviews
    Deactivate {
        /// User id
        user_id: String,
    },

    /// List pull requests the user is assigned to review
    Reviews {
        /// User id
        user_id: String,
    },
}

impl UserArgs {
    /// Execute the user command
    pub async fn execute(&self, engine: &Engine) -> anyhow::Result<()> {
        match &self.command {
            UserCommand::Activate { user_id } => {
                print_json(&engine.set_user_active(user_id, true).await?)
            }
            UserCommand::Deactivate { user_id } => {
                print_json(&engine.set_user_active(user_id, false).await?)
            }
            UserCommand::Reviews { user_id } => print_json(&engine.user_reviews(user_id).await?),
        }
    }
}
