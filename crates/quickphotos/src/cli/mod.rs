//! CLI command definitions.

mod run;

pub use run::execute;

use clap::{Parser, Subcommand, ValueEnum};
use quickphotos_core::social::{ReactionKind, Timestamp, Username};

use crate::config::Config;

/// Query and update the quick-photos table.
#[derive(Debug, Parser)]
#[command(name = "quickphotos")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// DynamoDB table name.
    #[arg(long, env = "QUICKPHOTOS_TABLE")]
    pub table: Option<String>,

    /// Name of the inverted index.
    #[arg(long, env = "QUICKPHOTOS_INDEX")]
    pub index: Option<String>,

    /// AWS region.
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Endpoint override, e.g. `http://localhost:8000` for DynamoDB Local.
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Output format.
    #[arg(long, default_value = "pretty")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Layers command-line flags over environment configuration.
    pub fn config(&self) -> Config {
        self.apply(Config::from_env())
    }

    fn apply(&self, mut config: Config) -> Config {
        if let Some(table) = &self.table {
            config.table_name = table.clone();
        }
        if let Some(index) = &self.index {
            config.index_name = index.clone();
        }
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(endpoint) = &self.endpoint_url {
            config.endpoint_url = Some(endpoint.clone());
        }
        config
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Raw JSON output.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show a user profile.
    User {
        /// Username to look up.
        username: Username,
        /// Include every photo the user has posted.
        #[arg(long)]
        photos: bool,
    },
    /// Show a photo followed by every reaction left on it.
    Photo {
        /// Username of the photo owner.
        owner: Username,
        /// Upload timestamp, e.g. 2019-04-14T08:09:34.
        timestamp: Timestamp,
    },
    /// List the users a user follows.
    Following {
        /// Username whose follows to list.
        username: Username,
        /// Attach each followed user's profile.
        #[arg(long)]
        enrich: bool,
    },
    /// List a user's followers.
    Followers {
        /// Username whose followers to list.
        username: Username,
        /// Attach each follower's profile.
        #[arg(long)]
        enrich: bool,
    },
    /// React to a photo.
    React {
        /// Username of the reacting user.
        user: Username,
        /// Reaction type: +1, smiley, sunglasses or heart.
        kind: ReactionKind,
        /// Username of the photo owner.
        owner: Username,
        /// Upload timestamp of the photo.
        timestamp: Timestamp,
    },
    /// Follow a user.
    Follow {
        /// Username to follow.
        followed: Username,
        /// Username of the follower.
        following: Username,
    },
}
