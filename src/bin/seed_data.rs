// Populates the configured database with sample users, photos, comments,
// likes and friendships, and logs a development token per user.

use tracing_subscriber::EnvFilter;

use photo_sharing::{app_state::AppState, config::Config, data_seeder::seed_sample_data};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let state = AppState::new(config).await?;

    let summary = seed_sample_data(&state).await?;
    println!(
        "Seeded {} users, {} photos, {} comments, {} likes, {} friendships",
        summary.users, summary.photos, summary.comments, summary.likes, summary.friendships
    );
    for (login_name, token) in &summary.tokens {
        println!("{:<12} {}", login_name, token);
    }

    Ok(())
}
