use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use kestrel_booking::BookingService;
use kestrel_core::{BookingRequest, CancelPassengersRequest, FlightAvailability, PassengerRequest};
use kestrel_shared::{FlightId, ReferenceId, TicketNumber, UserId};
use kestrel_store::app_config::Config;
use kestrel_store::DbClient;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kestrel")]
#[command(about = "Operator console for the flight booking engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create the seat inventory of a flight date, or resize it keeping sold seats
    Seed {
        flight_id: String,
        date: NaiveDate,
        #[arg(short, long)]
        capacity: u32,
        /// Price of one seat
        #[arg(long)]
        cost: Decimal,
    },
    /// Show seats left on a flight date
    Availability { flight_id: String, date: NaiveDate },
    /// Book seats for a user
    Book {
        #[arg(short, long)]
        user: i64,
        flight_id: String,
        date: NaiveDate,
        /// Passenger as NAME:AGE (repeatable)
        #[arg(short, long = "passenger", value_parser = parse_passenger, required = true)]
        passengers: Vec<PassengerRequest>,
    },
    /// Cancel a whole booking
    Cancel { reference_id: i64 },
    /// Cancel individual passengers by ticket number
    CancelPassengers {
        reference_id: i64,
        #[arg(required = true)]
        tickets: Vec<i64>,
    },
    /// Show a booking with its passengers
    Show { reference_id: i64 },
    /// List the passengers of a booking
    Passengers { reference_id: i64 },
    /// List every booking held by a user
    List {
        #[arg(short, long)]
        user: i64,
    },
}

fn parse_passenger(raw: &str) -> Result<PassengerRequest, String> {
    let (name, age) = raw
        .rsplit_once(':')
        .ok_or_else(|| format!("expected NAME:AGE, got '{}'", raw))?;
    let age = age
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid age '{}': {}", age, e))?;
    Ok(PassengerRequest::booked(name.trim(), age))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("Failed to load config")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to database")?;

    if let Commands::Migrate = cli.command {
        db.migrate().await.context("Failed to run migrations")?;
        tracing::info!("Migrations applied");
        return Ok(());
    }

    if let Commands::Seed {
        flight_id,
        date,
        capacity,
        cost,
    } = &cli.command
    {
        if cost.is_sign_negative() {
            bail!("Seat cost must not be negative");
        }
        let row = FlightAvailability::new(FlightId::new(flight_id.as_str()), *date, *capacity, *cost);
        let stored = db.inventory_store().upsert(&row).await?;
        return print_json(&stored);
    }

    let service = BookingService::new(
        Arc::new(db.inventory_store()),
        Arc::new(db.booking_store()),
        Arc::new(db.passenger_store()),
    );

    match cli.command {
        Commands::Availability { flight_id, date } => {
            let availability = service
                .get_flight_availability(Some(FlightId::new(flight_id)), Some(date))
                .await?;
            print_json(&availability)
        }
        Commands::Book {
            user,
            flight_id,
            date,
            passengers,
        } => {
            let request = BookingRequest {
                user_id: Some(UserId(user)),
                flight_id: Some(FlightId::new(flight_id)),
                flight_date: Some(date),
                booked_seats: Some(passengers.len() as i64),
                total_cost: None,
                status: Some("Booked".to_string()),
                passengers,
            };
            print_json(&service.save_booking(&request).await?)
        }
        Commands::Cancel { reference_id } => {
            print_json(&service.cancel_booking(Some(ReferenceId(reference_id))).await?)
        }
        Commands::CancelPassengers { reference_id, tickets } => {
            let request = CancelPassengersRequest::new(
                ReferenceId(reference_id),
                tickets.into_iter().map(TicketNumber),
            );
            print_json(&service.cancel_passengers_by_ticket(&request).await?)
        }
        Commands::Show { reference_id } => {
            print_json(&service.get_booking_by_reference(Some(ReferenceId(reference_id))).await?)
        }
        Commands::Passengers { reference_id } => {
            print_json(&service.get_passengers_for_booking(Some(ReferenceId(reference_id))).await?)
        }
        Commands::List { user } => print_json(&service.get_bookings_for_user(Some(UserId(user))).await?),
        Commands::Migrate | Commands::Seed { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_passenger() {
        let passenger = parse_passenger("Mary Ann:42").unwrap();
        assert_eq!(passenger.name.as_deref(), Some("Mary Ann"));
        assert_eq!(passenger.age, Some(42));

        assert!(parse_passenger("NoAge").is_err());
        assert!(parse_passenger("Bob:old").is_err());
    }

    #[test]
    fn test_cli_parses_book() {
        let cli = Cli::try_parse_from([
            "kestrel", "book", "--user", "7", "A1", "2024-05-01", "-p", "Alice:30", "-p", "Bob:31",
        ])
        .unwrap();
        match cli.command {
            Commands::Book { user, passengers, date, .. } => {
                assert_eq!(user, 7);
                assert_eq!(passengers.len(), 2);
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
            }
            _ => panic!("expected book"),
        }
    }
}
