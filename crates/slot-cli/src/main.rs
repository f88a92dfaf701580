//! `slots` CLI: manage doctor availability windows and bookings stored in a
//! JSON state file.
//!
//! ## Usage
//!
//! ```sh
//! # List a doctor's windows with next dates and free places
//! slots --state clinic.json availability --doctor d1
//!
//! # Book against a window, as a patient, and keep the result
//! slots --state clinic.json --as patient:p7 --save \
//!     book --window w-1 --doctor d1 --department cardiology \
//!     --patient p7 --date 2026-10-19 --time 09:40
//!
//! # Move a window and carry its booked patients along
//! slots --state clinic.json --save \
//!     reschedule --window w-1 --day Tuesday --start 14:00 --end 15:00
//! ```
//!
//! The state file is only rewritten when `--save` is given.

mod config;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use slot_engine::model::{Booking, NewPatient, RescheduleNotice};
use slot_engine::projection::parse_date;
use slot_engine::schedule::{create_window, delete_window, list_availability, windows_for_doctor};
use slot_engine::store::Notifier;
use slot_engine::{
    Actor, BookingEngine, BookingRequest, BookingTarget, MemoryStore, PatientRef,
    RescheduleEngine, Services, WindowDraft,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Doctor schedule windows and appointment booking"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON state file holding doctors, windows and bookings
    #[arg(long, global = true)]
    state: Option<String>,

    /// JSON config file (timezone, engine switches)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Override today's date (YYYY-MM-DD)
    #[arg(long, global = true)]
    today: Option<String>,

    /// Acting user: admin, doctor:<id> or patient:<id>
    #[arg(long = "as", global = true, default_value = "admin")]
    actor: String,

    /// Write changes back to the state file
    #[arg(long, global = true)]
    save: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List a doctor's availability windows
    Windows {
        #[arg(long)]
        doctor: String,
    },
    /// Show each window's next date and remaining places
    Availability {
        #[arg(long)]
        doctor: String,
    },
    /// Add a weekly availability window
    AddWindow {
        #[arg(long)]
        doctor: String,
        /// Day of week, e.g. Monday
        #[arg(long)]
        day: String,
        /// Start time, HH:MM
        #[arg(long)]
        start: String,
        /// End time, HH:MM
        #[arg(long)]
        end: String,
        /// Maximum bookings per occurrence (0 or omitted = unlimited)
        #[arg(long)]
        max: Option<u32>,
    },
    /// Delete an availability window
    RemoveWindow {
        #[arg(long)]
        id: String,
    },
    /// Book an appointment
    Book {
        #[arg(long)]
        doctor: Option<String>,
        #[arg(long)]
        department: Option<String>,
        /// Existing patient id
        #[arg(long, conflicts_with = "new_patient_name")]
        patient: Option<String>,
        /// Register a new patient with this name
        #[arg(long, requires = "new_patient_contact")]
        new_patient_name: Option<String>,
        #[arg(long)]
        new_patient_contact: Option<String>,
        /// Date, YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
        /// Time, HH:MM
        #[arg(long)]
        time: Option<String>,
        /// Book against this window (capacity and range rules apply)
        #[arg(long)]
        window: Option<String>,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Cancel a booking
    Cancel {
        #[arg(long)]
        id: String,
    },
    /// Change a window and move its booked patients with it
    Reschedule {
        #[arg(long)]
        window: String,
        #[arg(long)]
        day: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        max: Option<u32>,
    },
}

/// Notifications go to the log; delivery is someone else's problem.
struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_doctor(&self, booking: &Booking) -> slot_engine::error::Result<()> {
        info!(
            doctor = %booking.doctor_id,
            booking = %booking.id,
            "notify doctor: new appointment on {} at {}",
            booking.date,
            booking.time
        );
        Ok(())
    }

    fn notify_affected_patients(
        &self,
        notice: &RescheduleNotice,
    ) -> slot_engine::error::Result<()> {
        info!(
            window = %notice.window_id,
            bookings = ?notice.booking_ids,
            "notify patients: {} moved to {}",
            notice.old_window,
            notice.new_window
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct RescheduleReport<'a> {
    summary: String,
    outcome: &'a slot_engine::RescheduleOutcome,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = CliConfig::load(cli.config.as_deref())?;
    let today = resolve_today(cli.today.as_deref(), &config)?;
    let actor: Actor = cli.actor.parse()?;

    let state_path = match cli.state.as_deref() {
        Some(path) => path,
        None => anyhow::bail!("--state <file> is required"),
    };
    let raw = std::fs::read_to_string(state_path)
        .with_context(|| format!("Failed to read state file: {}", state_path))?;
    let store = MemoryStore::from_json(&raw)
        .with_context(|| format!("Invalid state file: {}", state_path))?;

    let notifier = LogNotifier;
    let services = Services {
        appointments: &store,
        schedules: &store,
        directory: &store,
        notifier: &notifier,
    };

    let output = match cli.command {
        Commands::Windows { doctor } => to_json(&windows_for_doctor(&store, &doctor)?)?,
        Commands::Availability { doctor } => {
            to_json(&list_availability(services, &doctor, today)?)?
        }
        Commands::AddWindow {
            doctor,
            day,
            start,
            end,
            max,
        } => {
            let draft = WindowDraft::new(&day, &start, &end, max);
            to_json(&create_window(services, &actor, &doctor, draft)?)?
        }
        Commands::RemoveWindow { id } => {
            delete_window(services, &actor, &id)?;
            format!("Removed window {}", id)
        }
        Commands::Book {
            doctor,
            department,
            patient,
            new_patient_name,
            new_patient_contact,
            date,
            time,
            window,
            reason,
        } => {
            let patient = match (patient, new_patient_name) {
                (Some(id), _) => Some(PatientRef::Existing(id)),
                (None, Some(name)) => Some(PatientRef::New(NewPatient {
                    name,
                    contact: new_patient_contact.unwrap_or_default(),
                })),
                (None, None) => None,
            };
            let request = BookingRequest {
                target: window.map_or(BookingTarget::Manual, BookingTarget::Window),
                patient,
                doctor_id: doctor,
                department_id: department,
                date,
                time,
                reason,
            };
            let engine = BookingEngine::new(services, config.engine.clone());
            to_json(&engine.book(&actor, request)?)?
        }
        Commands::Cancel { id } => {
            let engine = BookingEngine::new(services, config.engine.clone());
            to_json(&engine.cancel(&actor, &id)?)?
        }
        Commands::Reschedule {
            window,
            day,
            start,
            end,
            max,
        } => {
            let draft = WindowDraft::new(&day, &start, &end, max);
            let outcome =
                RescheduleEngine::new(services).reschedule(&actor, &window, draft, today)?;
            to_json(&RescheduleReport {
                summary: outcome.summary(),
                outcome: &outcome,
            })?
        }
    };

    println!("{}", output);

    if cli.save {
        std::fs::write(state_path, store.to_json()?)
            .with_context(|| format!("Failed to write state file: {}", state_path))?;
    }

    Ok(())
}

/// Logs go to stderr so stdout stays parseable.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("slots=info,slot_engine=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_today(flag: Option<&str>, config: &CliConfig) -> Result<NaiveDate> {
    match flag {
        Some(raw) => Ok(parse_date(raw)?),
        None => Ok(Utc::now().with_timezone(&config.timezone()?).date_naive()),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to render JSON output")
}
