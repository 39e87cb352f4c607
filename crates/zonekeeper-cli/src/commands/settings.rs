use clap::Subcommand;
use zonekeeper_core::settings::{HapticPattern, SettingsEdit};
use zonekeeper_core::storage::Database;
use zonekeeper_core::sync::{get_or_create_device_id, SettingsSynchronizer};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the stored settings document
    Show,
    /// Edit one field
    Set {
        /// Field name (e.g. "heart_rate_zone", "in_zone_alerts")
        field: String,
        /// New value
        value: String,
    },
    /// Restore factory values
    Reset,
    /// List the haptic patterns
    Patterns,
}

fn open() -> Result<SettingsSynchronizer, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let origin = get_or_create_device_id()?;
    Ok(SettingsSynchronizer::load(Box::new(db), origin))
}

pub fn run(action: SettingsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SettingsAction::Show => {
            let doc = open()?.document();
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        SettingsAction::Set { field, value } => {
            let edit = SettingsEdit::parse(&field, &value).map_err(|e| {
                format!("{e} (fields: {})", SettingsEdit::FIELDS.join(", "))
            })?;
            let doc = open()?.apply_local_edit(edit);
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        SettingsAction::Reset => {
            open()?.reset();
            println!("settings reset to defaults");
        }
        SettingsAction::Patterns => {
            for pattern in HapticPattern::ALL {
                println!("{:<14} {}", pattern.name(), pattern.label());
            }
        }
    }
    Ok(())
}
