//! The shared settings document and its field types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamped::TimestampedValue;
use crate::error::ConfigError;
use crate::zone::ZoneBand;

/// RGBA color. Channels may exceed 1.0 for extended-range displays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorSetting {
    #[serde(default)]
    pub red: f64,
    #[serde(default)]
    pub green: f64,
    #[serde(default)]
    pub blue: f64,
    #[serde(default)]
    pub opacity: f64,
}

impl ColorSetting {
    pub const fn rgba(red: f64, green: f64, blue: f64, opacity: f64) -> Self {
        Self {
            red,
            green,
            blue,
            opacity,
        }
    }

    /// Largest accepted red, green or blue channel.
    pub const MAX_CHANNEL: f64 = 2.0;

    /// Parse `"r,g,b"` or `"r,g,b,a"`.
    ///
    /// Channels must lie in `0..=MAX_CHANNEL` and opacity in `0..=1`.
    /// Non-finite values are rejected since JSON cannot carry them.
    pub fn parse(input: &str) -> Option<Self> {
        let parts: Vec<f64> = input
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        let color = match parts.as_slice() {
            [r, g, b] => Self::rgba(*r, *g, *b, 1.0),
            [r, g, b, a] => Self::rgba(*r, *g, *b, *a),
            _ => return None,
        };
        color.is_valid().then_some(color)
    }

    pub fn is_valid(&self) -> bool {
        let channel = |c: f64| (0.0..=Self::MAX_CHANNEL).contains(&c);
        channel(self.red) && channel(self.green) && channel(self.blue) && (0.0..=1.0).contains(&self.opacity)
    }
}

/// Output pattern played by the wearable's haptic engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum HapticPattern {
    Start,
    Stop,
    DirectionUp,
    Success,
    Notification,
    Retry,
}

impl HapticPattern {
    pub const ALL: [HapticPattern; 6] = [
        HapticPattern::Start,
        HapticPattern::Stop,
        HapticPattern::DirectionUp,
        HapticPattern::Success,
        HapticPattern::Notification,
        HapticPattern::Retry,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HapticPattern::Start => "start",
            HapticPattern::Stop => "stop",
            HapticPattern::DirectionUp => "direction_up",
            HapticPattern::Success => "success",
            HapticPattern::Notification => "notification",
            HapticPattern::Retry => "retry",
        }
    }

    /// Label shown in the pattern picker.
    pub fn label(self) -> &'static str {
        match self {
            HapticPattern::Start => "Single tap",
            HapticPattern::Stop => "Double slow tap",
            HapticPattern::DirectionUp => "Double fast tap",
            HapticPattern::Success => "Fast tap series",
            HapticPattern::Notification => "Tap + vibration",
            HapticPattern::Retry => "Long vibration",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        HapticPattern::ALL
            .into_iter()
            .find(|p| p.name() == name || p.label() == name)
    }
}

/// Unknown names decode to `Success`.
impl From<String> for HapticPattern {
    fn from(name: String) -> Self {
        HapticPattern::from_name(&name).unwrap_or(HapticPattern::Success)
    }
}

impl From<HapticPattern> for &'static str {
    fn from(pattern: HapticPattern) -> Self {
        pattern.name()
    }
}

impl std::fmt::Display for HapticPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// User preferences shared between the phone and the wearable.
///
/// Every field is an independent LWW register, so two copies can be edited
/// concurrently and reconciled field by field. Fields missing from an
/// encoded document decode to their epoch-stamped defaults, so a partial
/// snapshot never overrides a real local edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDocument {
    pub heart_rate_zone: TimestampedValue<ZoneBand>,
    pub below_zone_color: TimestampedValue<ColorSetting>,
    pub in_zone_color: TimestampedValue<ColorSetting>,
    pub above_zone_color: TimestampedValue<ColorSetting>,
    pub faster_haptic: TimestampedValue<HapticPattern>,
    pub in_zone_haptic: TimestampedValue<HapticPattern>,
    pub slower_haptic: TimestampedValue<HapticPattern>,
    pub in_zone_alerts: TimestampedValue<bool>,
}

/// Defaults carry the Unix epoch so any real edit wins over them.
impl Default for SettingsDocument {
    fn default() -> Self {
        let epoch = DateTime::<Utc>::default();
        Self {
            heart_rate_zone: TimestampedValue::at(ZoneBand::Zone3, epoch),
            below_zone_color: TimestampedValue::at(ColorSetting::rgba(0.96, 0.8, 0.27, 1.0), epoch),
            in_zone_color: TimestampedValue::at(ColorSetting::rgba(0.39, 0.76, 0.4, 1.0), epoch),
            above_zone_color: TimestampedValue::at(ColorSetting::rgba(0.15, 0.3, 1.5, 1.0), epoch),
            faster_haptic: TimestampedValue::at(HapticPattern::Success, epoch),
            in_zone_haptic: TimestampedValue::at(HapticPattern::Notification, epoch),
            slower_haptic: TimestampedValue::at(HapticPattern::Stop, epoch),
            in_zone_alerts: TimestampedValue::at(false, epoch),
        }
    }
}

/// A single-field change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum SettingsEdit {
    HeartRateZone(ZoneBand),
    BelowZoneColor(ColorSetting),
    InZoneColor(ColorSetting),
    AboveZoneColor(ColorSetting),
    FasterHaptic(HapticPattern),
    InZoneHaptic(HapticPattern),
    SlowerHaptic(HapticPattern),
    InZoneAlerts(bool),
}

impl SettingsEdit {
    pub const FIELDS: [&'static str; 8] = [
        "heart_rate_zone",
        "below_zone_color",
        "in_zone_color",
        "above_zone_color",
        "faster_haptic",
        "in_zone_haptic",
        "slower_haptic",
        "in_zone_alerts",
    ];

    /// Parse a field name and a textual value, as typed on the command line.
    pub fn parse(field: &str, value: &str) -> Result<Self, ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidValue {
            key: field.to_string(),
            message: message.to_string(),
        };
        let zone = || {
            value
                .parse::<u8>()
                .ok()
                .and_then(ZoneBand::from_number)
                .ok_or_else(|| invalid("expected a zone number 1-5"))
        };
        let color = || {
            ColorSetting::parse(value)
                .ok_or_else(|| invalid("expected r,g,b[,a] with channels 0-2 and opacity 0-1"))
        };
        let haptic = || HapticPattern::from_name(value).ok_or_else(|| invalid("unknown haptic pattern"));

        let edit = match field {
            "heart_rate_zone" => SettingsEdit::HeartRateZone(zone()?),
            "below_zone_color" => SettingsEdit::BelowZoneColor(color()?),
            "in_zone_color" => SettingsEdit::InZoneColor(color()?),
            "above_zone_color" => SettingsEdit::AboveZoneColor(color()?),
            "faster_haptic" => SettingsEdit::FasterHaptic(haptic()?),
            "in_zone_haptic" => SettingsEdit::InZoneHaptic(haptic()?),
            "slower_haptic" => SettingsEdit::SlowerHaptic(haptic()?),
            "in_zone_alerts" => SettingsEdit::InZoneAlerts(
                value.parse::<bool>().map_err(|_| invalid("expected true or false"))?,
            ),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
        Ok(edit)
    }
}

impl SettingsDocument {
    /// Apply `edit`, stamping only the touched field.
    pub fn apply(&mut self, edit: SettingsEdit) {
        self.apply_at(edit, Utc::now());
    }

    pub fn apply_at(&mut self, edit: SettingsEdit, now: DateTime<Utc>) {
        match edit {
            SettingsEdit::HeartRateZone(v) => self.heart_rate_zone.update_at(v, now),
            SettingsEdit::BelowZoneColor(v) => self.below_zone_color.update_at(v, now),
            SettingsEdit::InZoneColor(v) => self.in_zone_color.update_at(v, now),
            SettingsEdit::AboveZoneColor(v) => self.above_zone_color.update_at(v, now),
            SettingsEdit::FasterHaptic(v) => self.faster_haptic.update_at(v, now),
            SettingsEdit::InZoneHaptic(v) => self.in_zone_haptic.update_at(v, now),
            SettingsEdit::SlowerHaptic(v) => self.slower_haptic.update_at(v, now),
            SettingsEdit::InZoneAlerts(v) => self.in_zone_alerts.update_at(v, now),
        }
    }

    /// One edit per field reproducing this document's values.
    pub fn edits(&self) -> Vec<SettingsEdit> {
        vec![
            SettingsEdit::HeartRateZone(self.heart_rate_zone.value),
            SettingsEdit::BelowZoneColor(self.below_zone_color.value),
            SettingsEdit::InZoneColor(self.in_zone_color.value),
            SettingsEdit::AboveZoneColor(self.above_zone_color.value),
            SettingsEdit::FasterHaptic(self.faster_haptic.value),
            SettingsEdit::InZoneHaptic(self.in_zone_haptic.value),
            SettingsEdit::SlowerHaptic(self.slower_haptic.value),
            SettingsEdit::InZoneAlerts(self.in_zone_alerts.value),
        ]
    }

    /// Latest timestamp across all fields.
    pub fn last_modified(&self) -> DateTime<Utc> {
        [
            self.heart_rate_zone.timestamp,
            self.below_zone_color.timestamp,
            self.in_zone_color.timestamp,
            self.above_zone_color.timestamp,
            self.faster_haptic.timestamp,
            self.in_zone_haptic.timestamp,
            self.slower_haptic.timestamp,
            self.in_zone_alerts.timestamp,
        ]
        .into_iter()
        .max()
        .unwrap_or_default()
    }
}

/// Field-wise LWW merge. Exact ties resolve the same way on both devices.
pub fn merge(local: &SettingsDocument, remote: &SettingsDocument) -> SettingsDocument {
    SettingsDocument {
        heart_rate_zone: local.heart_rate_zone.merge(&remote.heart_rate_zone),
        below_zone_color: local.below_zone_color.merge(&remote.below_zone_color),
        in_zone_color: local.in_zone_color.merge(&remote.in_zone_color),
        above_zone_color: local.above_zone_color.merge(&remote.above_zone_color),
        faster_haptic: local.faster_haptic.merge(&remote.faster_haptic),
        in_zone_haptic: local.in_zone_haptic.merge(&remote.in_zone_haptic),
        slower_haptic: local.slower_haptic.merge(&remote.slower_haptic),
        in_zone_alerts: local.in_zone_alerts.merge(&remote.in_zone_alerts),
    }
}
