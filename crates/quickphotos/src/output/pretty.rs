//! Pretty output formatting.

use quickphotos_core::social::{
    EnrichedFriendship, FollowDirection, Friendship, Photo, PhotoWithReactions, Reaction, User,
    UserWithPhotos,
};

/// Format a user for display.
pub fn format_user(user: &User) -> String {
    let mut output = format!(
        "{}\n  Followers: {}\n  Following: {}",
        user.username, user.followers, user.following
    );
    if let Some(name) = &user.name {
        output.push_str(&format!("\n  Name: {}", name));
    }
    if let Some(email) = &user.email {
        output.push_str(&format!("\n  Email: {}", email));
    }
    if let Some(status) = &user.status {
        output.push_str(&format!("\n  Status: {}", status));
    }
    if !user.interests.is_empty() {
        output.push_str(&format!("\n  Interests: {}", user.interests.join(", ")));
    }
    if let Some(pinned) = &user.pinned_image {
        output.push_str(&format!("\n  Pinned: {}", pinned));
    }
    output
}

/// Format a photo for display.
pub fn format_photo(photo: &Photo) -> String {
    let mut output = format!("{} by {}", photo.timestamp, photo.owner);
    if let Some(location) = &photo.location {
        output.push_str(&format!("\n  Location: {}", location));
    }
    let counts: Vec<String> = photo
        .reactions
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(kind, count)| format!("{kind} x{count}"))
        .collect();
    if !counts.is_empty() {
        output.push_str(&format!("\n  Reactions: {}", counts.join(", ")));
    }
    output
}

/// Format a user with their photos for display.
pub fn format_user_with_photos(value: &UserWithPhotos) -> String {
    let mut output = format_user(&value.user);
    if value.photos.is_empty() {
        output.push_str("\n\nNo photos found.");
        return output;
    }
    output.push_str(&format!("\n\nPHOTOS ({})\n", value.photos.len()));
    output.push_str(&"-".repeat(40));
    for photo in &value.photos {
        output.push_str(&format!("\n{}", format_photo(photo)));
    }
    output
}

/// Format a reaction for display.
pub fn format_reaction(reaction: &Reaction) -> String {
    format!(
        "{} reacted {} at {}",
        reaction.reacting_user, reaction.kind, reaction.timestamp
    )
}

/// Format a photo with its reactions for display.
pub fn format_photo_with_reactions(value: &PhotoWithReactions) -> String {
    let mut output = format_photo(&value.photo);
    if value.reactions.is_empty() {
        output.push_str("\n\nNo reactions yet.");
        return output;
    }
    output.push_str(&format!("\n\nREACTIONS ({})\n", value.reactions.len()));
    output.push_str(&"-".repeat(40));
    for reaction in &value.reactions {
        output.push_str(&format!("\n{}", format_reaction(reaction)));
    }
    output
}

/// Format a friendship edge for display.
pub fn format_friendship(edge: &Friendship) -> String {
    format!(
        "{} follows {} since {}",
        edge.following_user, edge.followed_user, edge.timestamp
    )
}

fn heading(direction: FollowDirection) -> &'static str {
    match direction {
        FollowDirection::Followers => "FOLLOWERS",
        FollowDirection::Following => "FOLLOWING",
    }
}

/// Format friendship edges for display.
pub fn format_friendships(edges: &[Friendship], direction: FollowDirection) -> String {
    if edges.is_empty() {
        return "No connections found.".to_string();
    }
    let mut output = format!("{} ({})\n", heading(direction), edges.len());
    output.push_str(&"-".repeat(40));
    for edge in edges {
        output.push_str(&format!(
            "\n{} (since {})",
            edge.counterpart(direction),
            edge.timestamp
        ));
    }
    output
}

/// Format enriched friendship edges for display.
pub fn format_enriched(edges: &[EnrichedFriendship], direction: FollowDirection) -> String {
    if edges.is_empty() {
        return "No connections found.".to_string();
    }
    let mut output = format!("{} ({})\n", heading(direction), edges.len());
    output.push_str(&"-".repeat(40));
    for edge in edges {
        output.push_str(&format!(
            "\n{}\n  Since: {}",
            format_user(&edge.user),
            edge.friendship.timestamp
        ));
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickphotos_core::social::{ReactionKind, Timestamp, Username};

    fn username(value: &str) -> Username {
        Username::parse(value).unwrap()
    }

    #[test]
    fn test_user_lists_present_profile_fields() {
        let mut user = User::new(username("haroldwatkins"))
            .with_name("Harold Watkins")
            .with_email("harold@example.com")
            .with_pinned_image("PHOTO#haroldwatkins#2019-01-01T00:00:00");
        user.followers = 2;

        let output = format_user(&user);

        assert!(output.starts_with("haroldwatkins\n  Followers: 2"));
        assert!(output.contains("Email: harold@example.com"));
        assert!(output.contains("Pinned: PHOTO#haroldwatkins#2019-01-01T00:00:00"));
        assert!(!output.contains("Status:"));
    }

    #[test]
    fn test_photo_lists_only_nonzero_reactions() {
        let mut photo = Photo::new(
            username("ppierce"),
            Timestamp::parse("2019-04-14T08:09:34").unwrap(),
        )
        .with_location("Kyoto");
        photo.reactions.set(ReactionKind::Heart, 3);

        let output = format_photo(&photo);

        assert!(output.contains("Location: Kyoto"));
        assert!(output.contains("heart x3"));
        assert!(!output.contains("smiley"));
    }

    #[test]
    fn test_friendships_show_counterpart() {
        let edge = Friendship {
            followed_user: username("haroldwatkins"),
            following_user: username("ppierce"),
            timestamp: Timestamp::parse("2018-12-01T10:00:00").unwrap(),
        };

        let followers = format_friendships(std::slice::from_ref(&edge), FollowDirection::Followers);
        let following = format_friendships(&[edge], FollowDirection::Following);

        assert!(followers.starts_with("FOLLOWERS (1)"));
        assert!(followers.contains("\nppierce (since"));
        assert!(following.contains("\nharoldwatkins (since"));
    }

    #[test]
    fn test_empty_connections() {
        assert_eq!(
            format_friendships(&[], FollowDirection::Following),
            "No connections found."
        );
    }
}
