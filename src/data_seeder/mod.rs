// Sample data for local development, written through the regular services
// so counters and edges come out consistent.

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::{
    app_state::AppState,
    core::Id,
    error::AppResult,
    infrastructure::viewer::ViewerContext,
    models::{CommentRequest, RegisterUserRequest},
};

const SAMPLE_PASSWORD: &str = "weak";

// 1x1 transparent PNG, stands in for real uploads
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

struct SampleUser {
    login_name: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    location: &'static str,
    description: &'static str,
    occupation: &'static str,
}

const SAMPLE_USERS: &[SampleUser] = &[
    SampleUser {
        login_name: "malcolm",
        first_name: "Ian",
        last_name: "Malcolm",
        location: "Austin, TX",
        description: "Should have stayed home with the dinosaurs.",
        occupation: "Mathematician",
    },
    SampleUser {
        login_name: "ripley",
        first_name: "Ellen",
        last_name: "Ripley",
        location: "Nostromo",
        description: "Lvl 6 rating. Pilot.",
        occupation: "Warrant Officer",
    },
    SampleUser {
        login_name: "took",
        first_name: "Peregrin",
        last_name: "Took",
        location: "Gondor",
        description: "Home is behind, the world ahead.",
        occupation: "Thane",
    },
    SampleUser {
        login_name: "kenobi",
        first_name: "Rey",
        last_name: "Kenobi",
        location: "D'Qar",
        description: "Excited to be here!",
        occupation: "Rebel",
    },
    SampleUser {
        login_name: "ludgate",
        first_name: "April",
        last_name: "Ludgate",
        location: "Pawnee, IN",
        description: "Witch",
        occupation: "Animal Control",
    },
];

/// (owner index, file name, hours ago)
const SAMPLE_PHOTOS: &[(usize, &str, i64)] = &[
    (0, "malcolm1.png", 72),
    (0, "malcolm2.png", 30),
    (1, "ripley1.png", 50),
    (1, "ripley2.png", 5),
    (2, "took1.png", 40),
    (3, "kenobi1.png", 20),
    (3, "kenobi2.png", 2),
    (4, "ludgate1.png", 10),
];

/// (author index, photo index, text)
const SAMPLE_COMMENTS: &[(usize, usize, &str)] = &[
    (1, 0, "Life, uh, finds a way."),
    (2, 0, "Is that a velociraptor?"),
    (0, 2, "Nice ship. Shame about the cat."),
    (3, 2, "Game over, man!"),
    (4, 4, "Second breakfast looks great"),
    (0, 5, "That's one big lightsaber."),
    (2, 6, "100% the best view in the galaxy"),
    (1, 7, "Is that a three-legged dog?"),
];

/// (liker index, photo index)
const SAMPLE_LIKES: &[(usize, usize)] = &[(1, 0), (2, 0), (3, 0), (0, 2), (4, 2), (2, 5), (0, 7)];

/// Friend pairs by user index
const SAMPLE_FRIENDSHIPS: &[(usize, usize)] = &[(0, 1), (0, 2), (1, 3), (2, 4), (3, 4)];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub photos: usize,
    pub comments: usize,
    pub likes: usize,
    pub friendships: usize,
    /// (login_name, bearer token) for every user in the database
    pub tokens: Vec<(String, String)>,
}

/// Seeds an empty database. A database that already has users is left as
/// is and only gets fresh development tokens.
pub async fn seed_sample_data(state: &AppState) -> AppResult<SeedSummary> {
    let mut summary = SeedSummary::default();

    if state.db.list_users().await?.is_empty() {
        seed_users_and_content(state, &mut summary).await?;
    } else {
        warn!("Database already has users, skipping sample data");
    }

    for user in state.db.list_users().await? {
        let token = state.security.issue_token(user.id, &user.login_name)?;
        info!("Dev token for {} ({}): {}", user.login_name, user.id, token);
        summary.tokens.push((user.login_name, token));
    }
    Ok(summary)
}

async fn seed_users_and_content(state: &AppState, summary: &mut SeedSummary) -> AppResult<()> {
    let mut viewers = Vec::with_capacity(SAMPLE_USERS.len());
    for sample in SAMPLE_USERS {
        let user = state
            .user_service
            .register(RegisterUserRequest {
                login_name: Some(sample.login_name.to_string()),
                password: Some(SAMPLE_PASSWORD.to_string()),
                first_name: Some(sample.first_name.to_string()),
                last_name: Some(sample.last_name.to_string()),
                location: Some(sample.location.to_string()),
                description: Some(sample.description.to_string()),
                occupation: Some(sample.occupation.to_string()),
            })
            .await?;
        viewers.push(ViewerContext::new(user.id, user.login_name, "seed"));
    }
    summary.users = viewers.len();
    info!("Seeded {} users", summary.users);

    let mut photo_ids: Vec<Id> = Vec::with_capacity(SAMPLE_PHOTOS.len());
    for &(owner, file_name, hours_ago) in SAMPLE_PHOTOS {
        if !state.images.exists(file_name).await? {
            state.images.save(file_name, PLACEHOLDER_PNG).await?;
        }
        let photo = state
            .photo_service
            .create_photo(
                viewers[owner].user_id,
                file_name,
                Some(Utc::now() - Duration::hours(hours_ago)),
            )
            .await?;
        photo_ids.push(photo.id);
    }
    summary.photos = photo_ids.len();
    info!("Seeded {} photos", summary.photos);

    for &(author, photo, text) in SAMPLE_COMMENTS {
        state
            .photo_service
            .add_comment(
                &viewers[author],
                photo_ids[photo],
                CommentRequest {
                    comment: Some(text.to_string()),
                },
            )
            .await?;
        summary.comments += 1;
    }

    for &(liker, photo) in SAMPLE_LIKES {
        state
            .photo_service
            .toggle_like(&viewers[liker], photo_ids[photo])
            .await?;
        summary.likes += 1;
    }

    for &(a, b) in SAMPLE_FRIENDSHIPS {
        state
            .friend_service
            .add_friend(&viewers[a], viewers[b].user_id)
            .await?;
        summary.friendships += 1;
    }
    info!(
        "Seeded {} comments, {} likes, {} friendships",
        summary.comments, summary.likes, summary.friendships
    );
    Ok(())
}
