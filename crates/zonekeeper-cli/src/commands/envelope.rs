use clap::Subcommand;
use serde_json::json;
use zonekeeper_core::sync::SyncEnvelope;

#[derive(Subcommand)]
pub enum EnvelopeAction {
    /// Decode a wire envelope and print what it carries
    Decode {
        /// Envelope JSON
        json: String,
    },
}

pub fn run(action: EnvelopeAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        EnvelopeAction::Decode { json } => {
            let decoded = SyncEnvelope::decode(json.as_bytes())?;
            let payload = match &decoded.envelope {
                SyncEnvelope::Settings(doc) => serde_json::to_value(doc)?,
                SyncEnvelope::SessionSignal(started) => json!(started),
                SyncEnvelope::HapticDemo(request) => serde_json::to_value(request)?,
                SyncEnvelope::LegacyBounds { lower, upper } => json!({ "lower": lower, "upper": upper }),
            };
            let out = json!({
                "kind": decoded.envelope.kind(),
                "origin": decoded.origin,
                "payload": payload,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}
