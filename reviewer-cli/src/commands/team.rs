//! Team commands

use clap::{Args, Subcommand};
use reviewer_core::{Engine, TeamMember};

use super::print_json;

/// Team management commands
#[derive(Args, Debug)]
pub struct TeamArgs {
    #[command(subcommand)]
    pub command: TeamCommand,
}

#[derive(Subcommand, Debug)]
pub enum TeamCommand {
    /// Create a team with its members
    Add {
        /// Team name
        name: String,

        /// Member as ID:USERNAME, or ID:USERNAME:inactive (repeatable)
        #[arg(short, long = "member", value_parser = parse_member)]
        members: Vec<TeamMember>,
    },

    /// Show a team and its members
    Get {
        /// Team name
        name: String,
    },

    /// Deactivate team members and reassign their open reviews
    Deactivate {
        /// Team name
        name: String,

        /// User ids to deactivate
        #[arg(required = true)]
        user_ids: Vec<String>,
    },
}

impl TeamArgs {
    /// Execute the team command
    pub async fn execute(&self, engine: &Engine) -> anyhow::Result<()> {
        match &self.command {
            TeamCommand::Add { name, members } => {
                let team = engine.create_team(name, members.clone()).await?;
                print_json(&team)
            }
            TeamCommand::Get { name } => print_json(&engine.get_team(name).await?),
            TeamCommand::Deactivate { name, user_ids } => {
                let report = engine.deactivate_team_users(name, user_ids).await?;
                print_json(&report)
            }
        }
    }
}

/// Parse `ID:USERNAME[:inactive]`
fn parse_member(value: &str) -> Result<TeamMember, String> {
    let mut parts = value.splitn(3, ':');
    let user_id = parts.next().unwrap_or_default().trim();
    let username = parts
        .next()
        .map(str::trim)
        .ok_or_else(|| format!("expected ID:USERNAME, got '{}'", value))?;

    if user_id.is_empty() || username.is_empty() {
        return Err(format!("expected ID:USERNAME, got '{}'", value));
    }

    let member = TeamMember::new(user_id, username);
    match parts.next().map(str::trim) {
        None | Some("active") => Ok(member),
        Some("inactive") => Ok(member.with_active(false)),
        Some(other) => Err(format!(
            "unknown member flag '{}', expected 'active' or 'inactive'",
            other
        )),
    }
}
