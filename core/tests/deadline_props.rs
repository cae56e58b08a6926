use disclosure_core::deadline::engine::{compute_deadlines, DeadlineProfile, TierFilings};
use disclosure_core::incident::model::OrganizationClass;
use disclosure_core::report::tier::ReportTier;
use proptest::prelude::*;
use time::OffsetDateTime;

fn unix_seconds() -> impl Strategy<Value = i64> {
    // 2000-01-01 .. 2100-01-01, comfortably clear of OffsetDateTime range
    // limits even after the 30-day final offset.
    946_684_800i64..4_102_444_800i64
}

fn class_strategy() -> impl Strategy<Value = OrganizationClass> {
    prop_oneof![
        Just(OrganizationClass::EssentialEntity),
        Just(OrganizationClass::ImportantEntity),
    ]
}

proptest! {
    #[test]
    fn deadline_is_detection_plus_fixed_offset(
        detection_s in unix_seconds(),
        now_s in unix_seconds(),
        class in class_strategy(),
    ) {
        let detection = OffsetDateTime::from_unix_timestamp(detection_s).unwrap();
        let now = OffsetDateTime::from_unix_timestamp(now_s).unwrap();
        let profile = DeadlineProfile::for_class(class);

        let statuses = compute_deadlines(detection, class, &TierFilings::default(), now);
        for tier in ReportTier::ALL {
            prop_assert_eq!(statuses[&tier].deadline, detection + profile.offset(tier));
        }
    }

    #[test]
    fn hours_remaining_is_monotone_and_clamped(
        detection_s in unix_seconds(),
        now_s in unix_seconds(),
        advance_s in 0i64..100_000_000i64,
    ) {
        let detection = OffsetDateTime::from_unix_timestamp(detection_s).unwrap();
        let now = OffsetDateTime::from_unix_timestamp(now_s).unwrap();
        let later = now + time::Duration::seconds(advance_s);
        let filings = TierFilings::default();
        let class = OrganizationClass::EssentialEntity;

        let at_now = compute_deadlines(detection, class, &filings, now);
        let at_later = compute_deadlines(detection, class, &filings, later);
        for tier in ReportTier::ALL {
            prop_assert!(at_later[&tier].hours_remaining <= at_now[&tier].hours_remaining);
        }
    }

    #[test]
    fn filed_tiers_are_never_overdue(
        detection_s in unix_seconds(),
        filed_offset_s in 0i64..10_000_000i64,
        now_offset_s in 0i64..100_000_000i64,
    ) {
        let detection = OffsetDateTime::from_unix_timestamp(detection_s).unwrap();
        let filed = detection + time::Duration::seconds(filed_offset_s);
        let now = detection + time::Duration::seconds(now_offset_s);

        let mut filings = TierFilings::default();
        for tier in ReportTier::ALL {
            filings.record(tier, filed);
        }
        let statuses =
            compute_deadlines(detection, OrganizationClass::ImportantEntity, &filings, now);
        for tier in ReportTier::ALL {
            prop_assert!(!statuses[&tier].overdue);
            prop_assert!(statuses[&tier].report_exists);
        }
    }

    #[test]
    fn computation_is_pure(
        detection_s in unix_seconds(),
        now_s in unix_seconds(),
        class in class_strategy(),
    ) {
        let detection = OffsetDateTime::from_unix_timestamp(detection_s).unwrap();
        let now = OffsetDateTime::from_unix_timestamp(now_s).unwrap();
        let filings = TierFilings::default();

        let a = compute_deadlines(detection, class, &filings, now);
        let b = compute_deadlines(detection, class, &filings, now);
        prop_assert_eq!(a, b);
    }
}
