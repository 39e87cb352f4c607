use chrono::Local;
use clap::Subcommand;
use serde_json::json;
use zonekeeper_core::zone::{age_on, boundaries, BirthDate, MaxRate, ZoneBand, FALLBACK_AGE};
use zonekeeper_core::Config;

#[derive(Subcommand)]
pub enum ZoneAction {
    /// Inclusive bounds of a zone
    Boundaries {
        /// Zone number (1-5)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        zone: u8,
        /// Maximum heart rate; defaults to the configured profile
        #[arg(long)]
        max_rate: Option<u32>,
    },
    /// Maximum heart rate from a birth date
    MaxRate {
        #[arg(long)]
        birth_year: Option<i32>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        birth_month: Option<u32>,
    },
    /// Bounds of every zone
    Table {
        #[arg(long)]
        max_rate: Option<u32>,
    },
}

fn configured_max_rate() -> u32 {
    Config::load_or_default()
        .profile
        .max_rate(Local::now().date_naive())
}

pub fn run(action: ZoneAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ZoneAction::Boundaries { zone, max_rate } => {
            let zone = ZoneBand::from_number(zone).ok_or("zone must be between 1 and 5")?;
            let max_rate = max_rate.unwrap_or_else(configured_max_rate);
            let bounds = boundaries(zone, max_rate);
            let out = json!({
                "zone": zone.number(),
                "max_rate": max_rate,
                "lower": bounds.lower,
                "upper": bounds.upper,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        ZoneAction::MaxRate {
            birth_year,
            birth_month,
        } => {
            let today = Local::now().date_naive();
            let birth = birth_year.map(|year| BirthDate {
                year,
                month: birth_month,
            });
            let age = birth.map_or(FALLBACK_AGE, |b| age_on(b, today));
            let out = json!({
                "age": age,
                "max_rate": MaxRate::resolve(birth, today),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        ZoneAction::Table { max_rate } => {
            let max_rate = max_rate.unwrap_or_else(configured_max_rate);
            let rows: Vec<_> = ZoneBand::ALL
                .iter()
                .map(|zone| {
                    let bounds = boundaries(*zone, max_rate);
                    json!({ "zone": zone.number(), "lower": bounds.lower, "upper": bounds.upper })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}
