use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};

use campus_api::database::{bootstrap, DatabaseManager};
use campus_api::services::AuditService;

#[derive(Parser)]
#[command(name = "campus-admin")]
#[command(about = "Campus admin CLI - database bootstrap and maintenance")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Apply the schema and install baseline roles, permissions, and an admin account")]
    Seed {
        #[arg(long, default_value = "admin@campus.local")]
        admin_email: String,

        #[arg(long, help = "Admin password; a random one is generated and printed if omitted")]
        admin_password: Option<String>,
    },

    #[command(about = "Delete audit log rows older than the given age")]
    AuditCleanup {
        #[arg(long, default_value_t = 90)]
        days: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result = run(cli).await;
    DatabaseManager::close_all().await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Seed {
            admin_email,
            admin_password,
        } => {
            let pool = DatabaseManager::main_pool().await?;
            bootstrap::apply_schema(&pool).await?;
            bootstrap::seed_baseline(&pool).await?;

            let (password, generated) = match admin_password {
                Some(password) => (password, false),
                None => (generate_password(), true),
            };

            if bootstrap::seed_admin(&pool, &admin_email, &password).await? {
                if generated {
                    println!("Created admin account {} with password: {}", admin_email, password);
                } else {
                    println!("Created admin account {}", admin_email);
                }
            } else {
                println!("Admin account {} already exists, leaving it untouched", admin_email);
            }
        }

        Commands::AuditCleanup { days } => {
            let cutoff = Utc::now() - Duration::days(days);
            let audit = AuditService::new().await?;
            let removed = audit.cleanup_before(cutoff).await?;
            println!("Removed {} audit rows older than {} days", removed, days);
        }
    }

    Ok(())
}

/// Random initial password, printed once and never stored in the clear.
fn generate_password() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";
    let mut rng = rand::rng();
    (0..20)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
