use std::{env, sync::Arc};

use colored::Colorize;
use log::{error, info};
use roost_market::{DatabaseError, Marketplace, PgDatabase};
use roost_server::{run_server, ServerContext};
use thiserror::Error;

mod logging;

#[derive(Debug, Error)]
enum RoostError {
    #[error("DATABASE_URL must be set")]
    MissingDatabaseUrl,

    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),
}

impl RoostError {
    fn hint(&self) -> String {
        match self {
            RoostError::MissingDatabaseUrl => {
                "Set DATABASE_URL to a postgres connection string, for example postgres://roost@localhost/roost.".to_string()
            }
            RoostError::Database(_) => {
                "This is a database error. Make sure the postgres instance is running and reachable, then try again.".to_string()
            }
        }
    }
}

async fn init() -> Result<ServerContext, RoostError> {
    let url = env::var("DATABASE_URL").map_err(|_| RoostError::MissingDatabaseUrl)?;

    info!("Connecting to database...");
    let database = PgDatabase::new(&url).await?;

    let market = Marketplace::new(database);

    Ok(ServerContext {
        market: Arc::new(market),
    })
}

#[tokio::main]
async fn main() {
    logging::init_logger();

    match init().await {
        Ok(context) => {
            info!("Initialized successfully.");
            run_server(context).await;
        }
        Err(error) => {
            error!(
                "{} Read the error below to troubleshoot the issue. If you think this might be a bug, please report it by making a GitHub issue.",
                "Roost failed to start!".bold().red()
            );
            error!("{}", error);
            error!(
                "{}",
                format!("Hint: {}", error.hint()).bright_black().italic()
            );
        }
    }
}
