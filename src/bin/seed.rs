//! Mock data seeding CLI
//!
//! Run with: cargo run --bin ultralearn-seed -- seed

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ultralearn::{config::AppConfig, seed::MockDataManager, Database};

#[derive(Parser)]
#[command(name = "ultralearn-seed", about = "Manage mock data in the database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Seed the database with mock data
    Seed,
    /// Remove all mock data
    Flush,
    /// Flush then seed fresh mock data
    Reset,
    /// Show current mock data counts
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ultralearn=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load();
    let db = Database::new(&config.database.path)?;
    let manager = MockDataManager::new(db);

    match cli.command {
        Command::Seed => {
            let created = manager.seed_all().await?;
            println!("Seeded {} mock objects", created);
            print_stats(&manager)?;
        }
        Command::Flush => {
            let removed = manager.flush_all()?;
            println!("Removed {} mock objects", removed);
        }
        Command::Reset => {
            let removed = manager.flush_all()?;
            let created = manager.seed_all().await?;
            println!("Reset complete: removed {}, seeded {}", removed, created);
            print_stats(&manager)?;
        }
        Command::Stats => {
            print_stats(&manager)?;
        }
    }

    Ok(())
}

fn print_stats(manager: &MockDataManager) -> anyhow::Result<()> {
    let stats = manager.stats()?;
    println!("Mock data stats:");
    println!("  users:           {}", stats.users);
    println!("  flashcard packs: {}", stats.flashcard_packs);
    println!("  flashcards:      {}", stats.flashcards);
    println!("  chat rooms:      {}", stats.chat_rooms);
    println!("  activities:      {}", stats.activities);
    println!("  study sessions:  {}", stats.study_sessions);
    Ok(())
}
