//! Algebraic properties of the settings merge.
//!
//! `document(residue)` stamps edited fields from one residue class mod 3.
//! Documents drawn from different classes never tie on an edited field;
//! `tied_document` draws from a tiny stamp range so ties are common.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use zonekeeper_core::settings::{merge, HapticPattern, SettingsDocument, SettingsEdit, TimestampedValue};
use zonekeeper_core::zone::ZoneBand;

fn stamp(slot: i64, residue: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(slot * 3 + residue)
}

fn document(residue: i64) -> impl Strategy<Value = SettingsDocument> {
    (
        (1u8..=5, 0i64..500),
        (any::<bool>(), 0i64..500),
        (0usize..HapticPattern::ALL.len(), 0i64..500),
    )
        .prop_map(move |((zone, t1), (alerts, t2), (pattern, t3))| {
            let mut doc = SettingsDocument::default();
            let zone = ZoneBand::from_number(zone).unwrap_or_default();
            doc.apply_at(SettingsEdit::HeartRateZone(zone), stamp(t1, residue));
            doc.apply_at(SettingsEdit::InZoneAlerts(alerts), stamp(t2, residue));
            doc.apply_at(SettingsEdit::FasterHaptic(HapticPattern::ALL[pattern]), stamp(t3, residue));
            doc
        })
}

fn tied_document() -> impl Strategy<Value = SettingsDocument> {
    ((1u8..=5, 0i64..3), (any::<bool>(), 0i64..3)).prop_map(|((zone, t1), (alerts, t2))| {
        let mut doc = SettingsDocument::default();
        let zone = ZoneBand::from_number(zone).unwrap_or_default();
        doc.apply_at(SettingsEdit::HeartRateZone(zone), stamp(t1, 0));
        doc.apply_at(SettingsEdit::InZoneAlerts(alerts), stamp(t2, 0));
        doc
    })
}

proptest! {
    #[test]
    fn merge_is_commutative_without_ties(a in document(0), b in document(1)) {
        prop_assert_eq!(merge(&a, &b), merge(&b, &a));
    }

    #[test]
    fn merge_is_idempotent(a in document(0)) {
        prop_assert_eq!(merge(&a, &a), a);
    }

    #[test]
    fn merge_is_associative_without_ties(a in document(0), b in document(1), c in document(2)) {
        prop_assert_eq!(merge(&merge(&a, &b), &c), merge(&a, &merge(&b, &c)));
    }

    #[test]
    fn merged_stamps_are_pointwise_maxima(a in document(0), b in document(1)) {
        let merged = merge(&a, &b);
        prop_assert_eq!(
            merged.heart_rate_zone.timestamp,
            a.heart_rate_zone.timestamp.max(b.heart_rate_zone.timestamp)
        );
        prop_assert_eq!(
            merged.in_zone_alerts.timestamp,
            a.in_zone_alerts.timestamp.max(b.in_zone_alerts.timestamp)
        );
        prop_assert!(merged.last_modified() >= a.last_modified());
        prop_assert!(merged.last_modified() >= b.last_modified());
    }

    #[test]
    fn merge_is_commutative_with_ties(a in tied_document(), b in tied_document()) {
        prop_assert_eq!(merge(&a, &b), merge(&b, &a));
    }

    #[test]
    fn merge_is_associative_with_ties(a in tied_document(), b in tied_document(), c in tied_document()) {
        prop_assert_eq!(merge(&merge(&a, &b), &c), merge(&a, &merge(&b, &c)));
    }

    #[test]
    fn register_ties_pick_one_value_from_either_side(
        left in any::<u16>(),
        right in any::<u16>(),
        secs in 0i64..10_000,
    ) {
        let at = stamp(secs, 0);
        let l = TimestampedValue::at(left, at);
        let r = TimestampedValue::at(right, at);
        let kept = l.merge(&r).value;
        prop_assert_eq!(kept, r.merge(&l).value);
        prop_assert!(kept == left || kept == right);
    }

    #[test]
    fn update_always_moves_stamp_forward(secs in 0i64..10_000, back in 0i64..10_000) {
        let mut value = TimestampedValue::at(0u8, stamp(secs, 0));
        let before = value.timestamp;
        value.update_at(1, stamp(secs, 0) - Duration::seconds(back));
        prop_assert!(value.timestamp > before);
    }
}
