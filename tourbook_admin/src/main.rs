//! Operator CLI for the tourbook backend.
//!
//! Applies migrations, reconciles tour rating summaries after reported aggregation
//! failures, and issues password reset links to the operator's terminal.

mod config;
mod logging;
mod notify;

use std::sync::Arc;

use anyhow::{Context, Error, bail};
use log::{info, warn};
use pico_args::Arguments;
use tourbook::{
    auth::AuthManager,
    db::{Database, TourScope},
    reviews::RatingAggregator,
    tours::TourCatalog,
};

use config::{AdminConfig, Command, Invocation, RecomputeTarget};
use notify::OperatorNotifier;

const HELP: &str = "\
Operate a tourbook deployment

USAGE:
  tourbook_admin [OPTIONS] <COMMAND>

COMMANDS:
  migrate                           Apply database migrations
  recompute-ratings --tour ID       Recompute one tour's rating summary
  recompute-ratings --all           Recompute every tour's rating summary
  send-reset --email ADDRESS        Issue a password reset link and print it to stdout

OPTIONS:
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               JWT signing secret (send-reset)
  PASSWORD_PEPPER          Password hashing pepper (send-reset)
  RUST_LOG                 Log filter [default: info,sqlx=warn]
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let invocation = Invocation::parse(pargs)?;

    logging::init();

    let config = AdminConfig::from_env(invocation.database_url.clone())
        .context("Failed to load configuration")?;

    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected successfully");

    let result = match invocation.command {
        Command::Migrate => migrate(&db).await,
        Command::RecomputeRatings(target) => recompute_ratings(&db, target).await,
        Command::SendReset { email } => send_reset(&db, &config, &email).await,
    };

    db.close().await;
    result
}

async fn migrate(db: &Database) -> Result<(), Error> {
    db.migrate().await.context("Failed to run migrations")?;
    info!("Migrations applied");
    Ok(())
}

async fn recompute_ratings(db: &Database, target: RecomputeTarget) -> Result<(), Error> {
    let aggregator = RatingAggregator::new(Arc::new(db.reviews()), Arc::new(db.tours()));

    let tour_ids = match target {
        RecomputeTarget::One(id) => vec![id],
        RecomputeTarget::All => TourCatalog::new(Arc::new(db.tours()), Arc::new(db.users()))
            .list(TourScope::All)
            .await?
            .into_iter()
            .map(|tour| tour.id)
            .collect(),
    };

    let mut failed = 0usize;
    for tour_id in &tour_ids {
        match aggregator.recompute(*tour_id).await {
            Ok(summary) => info!(
                "Tour {}: {} ratings, average {}",
                tour_id, summary.quantity, summary.average
            ),
            Err(e) => {
                warn!("Tour {}: {}", tour_id, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} tours could not be recomputed", failed, tour_ids.len());
    }
    info!("Recomputed {} tours", tour_ids.len());
    Ok(())
}

async fn send_reset(db: &Database, config: &AdminConfig, email: &str) -> Result<(), Error> {
    let auth_config = config.auth().context("Failed to load auth configuration")?;
    let auth = AuthManager::new(
        Arc::new(db.users()),
        Arc::new(OperatorNotifier::stdout()),
        &auth_config,
    );

    auth.forgot_password(email)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to issue reset token: {}", e))?;

    logging::log_security_event(
        "password_reset_issued",
        Some(email),
        "Reset link issued by operator and printed to stdout",
    );
    Ok(())
}
