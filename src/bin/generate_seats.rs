//! Пересоздаёт места автобуса по его схеме салона.
//!
//! Использование: `generate_seats <bus_id>`

use std::process::ExitCode;
use tracing::error;

use bus_booking::{config::Config, init_tracing, services::layout, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let Some(bus_id) = std::env::args().nth(1).and_then(|arg| arg.parse::<i64>().ok()) else {
        eprintln!("usage: generate_seats <bus_id>");
        return ExitCode::from(2);
    };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.app);

    let state = match AppState::new(config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Startup failed: {:?}", e);
            return ExitCode::FAILURE;
        }
    };

    match layout::regenerate_seats(&state.store, bus_id).await {
        Ok(seats) => {
            println!("Successfully generated {} seats for bus {}", seats.len(), bus_id);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to generate seats for bus {bus_id}: {e}");
            ExitCode::FAILURE
        }
    }
}
