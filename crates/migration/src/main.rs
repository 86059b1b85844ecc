//! Schema management for the balance service database.
//!
//! Reads the target from `DATABASE_URL` (defaults to the service's local
//! `balance_service.db`) and applies one of `up`, `down`, `fresh`, `status`.
use sea_orm::Database;
use sea_orm_migration::prelude::*;

const DEFAULT_DATABASE_URL: &str = "sqlite:./balance_service.db?mode=rwc";
const USAGE: &str = "balance_service schema migrations\n\
                     \n\
                     usage: cargo run -p migration -- [up|down|fresh|status]\n\
                     \n\
                     DATABASE_URL selects the ledger database \
                     (default: sqlite:./balance_service.db?mode=rwc)";

enum Action {
    Up,
    Down,
    Fresh,
    Status,
}

impl Action {
    fn parse(arg: Option<&str>) -> Option<Self> {
        match arg.unwrap_or("up") {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "fresh" => Some(Self::Fresh),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let arg = std::env::args().nth(1);
    let Some(action) = Action::parse(arg.as_deref()) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let db_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let db = Database::connect(&db_url).await?;

    match action {
        Action::Up => migration::Migrator::up(&db, None).await?,
        // Rolls back the ledger tables; balances and entries are lost.
        Action::Down => migration::Migrator::down(&db, None).await?,
        Action::Fresh => migration::Migrator::fresh(&db).await?,
        Action::Status => migration::Migrator::status(&db).await?,
    }

    Ok(())
}
