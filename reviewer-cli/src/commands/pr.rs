//! Pull request commands

use clap::{Args, Subcommand};
use reviewer_core::Engine;

use super::print_json;

/// Pull request commands
#[derive(Args, Debug)]
pub struct PrArgs {
    #[command(subcommand)]
    pub command: PrCommand,
}

#[derive(Subcommand, Debug)]
pub enum PrCommand {
    /// Open a pull request and assign reviewers
    Create {
        /// Pull request id
        id: String,

        /// Pull request title
        #[arg(short, long)]
        name: String,

        /// Author user id
        #[arg(short, long)]
        author: String,
    },

    /// Mark a pull request as merged
    Merge {
        /// Pull request id
        id: String,
    },

    /// Replace one reviewer with another active teammate
    Reassign {
        /// Pull request id
        id: String,

        /// Reviewer to replace
        #[arg(long = "old")]
        old_reviewer: String,
    },

    /// Show a pull request and its reviewers
    Show {
        /// Pull request id
        id: String,
    },
}

impl PrArgs {
    /// Execute the pull request command
    pub async fn execute(&self, engine: &Engine) -> anyhow::Result<()> {
        match &self.command {
            PrCommand::Create { id, name, author } => {
                print_json(&engine.create_pr(id, name, author).await?)
            }
            PrCommand::Merge { id } => print_json(&engine.merge_pr(id).await?),
            PrCommand::Reassign { id, old_reviewer } => {
                print_json(&engine.reassign_reviewer(id, old_reviewer).await?)
            }
            PrCommand::Show { id } => print_json(&engine.get_pr(id).await?),
        }
    }
}
