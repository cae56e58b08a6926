use crate::incident::model::OrganizationClass;
use crate::report::tier::ReportTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::{Duration, OffsetDateTime};

/// Deadline offsets keyed by organization class. Both classes currently share
/// one profile; keeping the table keyed by class means a divergent
/// preliminary window is a data change, not a code change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineProfile {
    pub preliminary: Duration,
    pub complete: Duration,
    pub final_report: Duration,
}

impl DeadlineProfile {
    pub fn for_class(class: OrganizationClass) -> Self {
        match class {
            OrganizationClass::EssentialEntity | OrganizationClass::ImportantEntity => Self {
                preliminary: Duration::hours(24),
                complete: Duration::hours(72),
                final_report: Duration::days(30),
            },
        }
    }

    pub fn offset(&self, tier: ReportTier) -> Duration {
        match tier {
            ReportTier::Preliminary => self.preliminary,
            ReportTier::Complete => self.complete,
            ReportTier::Final => self.final_report,
        }
    }
}

/// Derived per-tier compliance view. Never persisted; recomputed on demand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeadlineStatus {
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    pub report_exists: bool,
    pub overdue: bool,
    pub hours_remaining: u64,
    /// The report exists but its first generation came after the deadline.
    /// Filing late clears `overdue` without erasing the historical lateness.
    pub filed_late: bool,
}

/// Per-tier filing facts the registry supplies: first generation timestamp of
/// an active report, when one exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierFilings {
    first_filed: BTreeMap<ReportTier, OffsetDateTime>,
}

impl TierFilings {
    pub fn record(&mut self, tier: ReportTier, generated_at: OffsetDateTime) {
        self.first_filed
            .entry(tier)
            .and_modify(|ts| {
                if generated_at < *ts {
                    *ts = generated_at;
                }
            })
            .or_insert(generated_at);
    }

    pub fn first_filed(&self, tier: ReportTier) -> Option<OffsetDateTime> {
        self.first_filed.get(&tier).copied()
    }

    pub fn exists(&self, tier: ReportTier) -> bool {
        self.first_filed.contains_key(&tier)
    }
}

/// Pure deadline computation: identical inputs always produce identical
/// output, and nothing is mutated.
pub fn compute_deadlines(
    detection: OffsetDateTime,
    class: OrganizationClass,
    filings: &TierFilings,
    now: OffsetDateTime,
) -> BTreeMap<ReportTier, DeadlineStatus> {
    let profile = DeadlineProfile::for_class(class);
    let mut out = BTreeMap::new();
    for tier in ReportTier::ALL {
        let deadline = detection + profile.offset(tier);
        let report_exists = filings.exists(tier);
        let overdue = now > deadline && !report_exists;
        let filed_late = filings
            .first_filed(tier)
            .map(|filed| filed > deadline)
            .unwrap_or(false);
        out.insert(
            tier,
            DeadlineStatus {
                deadline,
                report_exists,
                overdue,
                hours_remaining: hours_remaining(deadline, now),
                filed_late,
            },
        );
    }
    out
}

/// Whole hours until the deadline, floored at zero.
pub fn hours_remaining(deadline: OffsetDateTime, now: OffsetDateTime) -> u64 {
    let remaining = deadline - now;
    if remaining.is_negative() {
        0
    } else {
        remaining.whole_hours() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::format_description::well_known::Rfc3339;

    fn ts(s: &str) -> OffsetDateTime {
        OffsetDateTime::parse(s, &Rfc3339).unwrap()
    }

    #[test]
    fn deadlines_are_detection_plus_fixed_offsets() {
        let detection = ts("2024-01-10T09:00:00Z");
        let statuses = compute_deadlines(
            detection,
            OrganizationClass::EssentialEntity,
            &TierFilings::default(),
            detection,
        );
        assert_eq!(
            statuses[&ReportTier::Preliminary].deadline,
            ts("2024-01-11T09:00:00Z")
        );
        assert_eq!(
            statuses[&ReportTier::Complete].deadline,
            ts("2024-01-13T09:00:00Z")
        );
        assert_eq!(
            statuses[&ReportTier::Final].deadline,
            ts("2024-02-09T09:00:00Z")
        );
    }

    #[test]
    fn only_elapsed_unfiled_tiers_are_overdue() {
        // Detection 2024-01-10T09:00Z, now 25h later: preliminary overdue,
        // complete and final not.
        let detection = ts("2024-01-10T09:00:00Z");
        let now = ts("2024-01-11T10:00:00Z");
        let statuses = compute_deadlines(
            detection,
            OrganizationClass::ImportantEntity,
            &TierFilings::default(),
            now,
        );
        assert!(statuses[&ReportTier::Preliminary].overdue);
        assert!(!statuses[&ReportTier::Complete].overdue);
        assert!(!statuses[&ReportTier::Final].overdue);
        assert_eq!(statuses[&ReportTier::Preliminary].hours_remaining, 0);
        assert_eq!(statuses[&ReportTier::Complete].hours_remaining, 47);
    }

    #[test]
    fn existing_report_clears_overdue_but_keeps_lateness() {
        let detection = ts("2024-01-10T09:00:00Z");
        let mut filings = TierFilings::default();
        // Filed 6 hours past the preliminary deadline.
        filings.record(ReportTier::Preliminary, ts("2024-01-11T15:00:00Z"));

        let now = ts("2024-03-01T00:00:00Z");
        let statuses = compute_deadlines(
            detection,
            OrganizationClass::EssentialEntity,
            &filings,
            now,
        );
        let preliminary = &statuses[&ReportTier::Preliminary];
        assert!(preliminary.report_exists);
        assert!(!preliminary.overdue);
        assert!(preliminary.filed_late);
    }

    #[test]
    fn on_time_filing_is_not_late() {
        let detection = ts("2024-01-10T09:00:00Z");
        let mut filings = TierFilings::default();
        filings.record(ReportTier::Preliminary, ts("2024-01-10T20:00:00Z"));
        let statuses = compute_deadlines(
            detection,
            OrganizationClass::EssentialEntity,
            &filings,
            ts("2024-06-01T00:00:00Z"),
        );
        assert!(!statuses[&ReportTier::Preliminary].filed_late);
    }

    #[test]
    fn filings_keep_the_earliest_generation() {
        let mut filings = TierFilings::default();
        filings.record(ReportTier::Complete, ts("2024-01-12T10:00:00Z"));
        filings.record(ReportTier::Complete, ts("2024-01-11T10:00:00Z"));
        filings.record(ReportTier::Complete, ts("2024-01-13T10:00:00Z"));
        assert_eq!(
            filings.first_filed(ReportTier::Complete),
            Some(ts("2024-01-11T10:00:00Z"))
        );
    }

    #[test]
    fn hours_remaining_floors_partial_hours_and_clamps() {
        let deadline = ts("2024-01-11T09:00:00Z");
        assert_eq!(hours_remaining(deadline, ts("2024-01-11T08:30:00Z")), 0);
        assert_eq!(hours_remaining(deadline, ts("2024-01-10T09:30:00Z")), 23);
        assert_eq!(hours_remaining(deadline, ts("2024-01-12T09:00:00Z")), 0);
    }
}
