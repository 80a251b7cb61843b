//! Command dispatch.

use quickphotos_core::social::{FollowDirection, PhotoRef, Username};
use quickphotos_core::storage::{RepositoryError, Result, SocialRepository};

use crate::output::{pretty, render};
use crate::storage::{ItemStore, Repository};

use super::{Commands, OutputFormat};

/// Runs one command against the repository and renders its result.
pub async fn execute<S: ItemStore>(
    repo: &Repository<S>,
    command: Commands,
    format: OutputFormat,
) -> Result<String> {
    let output = match command {
        Commands::User {
            username,
            photos: true,
        } => {
            let value = repo.fetch_user_with_photos(&username).await?;
            render(&value, format, pretty::format_user_with_photos)
        }
        Commands::User { username, .. } => {
            let user = repo
                .fetch_user(&username)
                .await?
                .ok_or_else(|| RepositoryError::NotFound {
                    entity_type: "User",
                    id: username.to_string(),
                })?;
            render(&user, format, pretty::format_user)
        }
        Commands::Photo { owner, timestamp } => {
            let photo = PhotoRef::new(owner, timestamp);
            let value = repo
                .fetch_photo_with_reactions(&photo)
                .await?
                .ok_or_else(|| RepositoryError::NotFound {
                    entity_type: "Photo",
                    id: format!("{}@{}", photo.owner, photo.timestamp),
                })?;
            render(&value, format, pretty::format_photo_with_reactions)
        }
        Commands::Following { username, enrich } => {
            connections(repo, &username, FollowDirection::Following, enrich, format).await?
        }
        Commands::Followers { username, enrich } => {
            connections(repo, &username, FollowDirection::Followers, enrich, format).await?
        }
        Commands::React {
            user,
            kind,
            owner,
            timestamp,
        } => {
            let reaction = repo
                .add_reaction(&user, kind, &PhotoRef::new(owner, timestamp))
                .await?;
            render(&reaction, format, pretty::format_reaction)
        }
        Commands::Follow {
            followed,
            following,
        } => {
            let edge = repo.follow_user(&followed, &following).await?;
            render(&edge, format, pretty::format_friendship)
        }
    };
    Ok(output)
}

async fn connections<S: ItemStore>(
    repo: &Repository<S>,
    username: &Username,
    direction: FollowDirection,
    enrich: bool,
    format: OutputFormat,
) -> Result<String> {
    if enrich {
        let edges = repo.fetch_connections_enriched(username, direction).await?;
        return Ok(render(&edges, format, |edges| pretty::format_enriched(edges, direction)));
    }
    let edges = repo.fetch_connections(username, direction).await?;
    Ok(render(&edges, format, |edges| pretty::format_friendships(edges, direction)))
}
