//! Period resolution
//!
//! Turns declared [`PeriodSpec`]s into resolved [`Period`]s for an evaluation
//! instant and picks the one that applies.
//!
//! Rules:
//! - Periods are evaluated in declaration order; the first active one wins.
//! - When none is active (or the list is empty) the default restore period
//!   applies. It is active every day from 00:00 to 00:00.
//! - A restore request (deletion with `restoreOnDelete`) overrides the choice.
//! - A one-shot period whose fingerprint is already recorded in status is
//!   reported as [`PeriodError::AlreadyRun`].
//!
//! Resolution is pure: the previous status is read, never written. The caller
//! gets both snapshots back in [`Resolution`].

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc, Weekday,
};
use crds::{CurrentPeriod, FixedPeriod, PeriodSpec, PeriodTime, PeriodType, RecurringPeriod};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Name of the fallback period
pub const DEFAULT_RESTORE_PERIOD_NAME: &str = "default-restore";

const ALL_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Period resolution failures
#[derive(Debug, Clone, Error)]
pub enum PeriodError {
    /// The winning period is one-shot and has already been executed
    #[error("one-shot period '{}' already ran; its window ends at {}", .0.name, .0.end_time)]
    AlreadyRun(Box<Period>),

    /// The declared period cannot be evaluated
    #[error("invalid period '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

/// A period evaluated against a specific instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub name: String,
    pub period_type: PeriodType,
    /// Whether the evaluation instant falls inside the window
    pub is_active: bool,
    /// Start of the current occurrence, or of the next one when inactive
    pub start_time: DateTime<Utc>,
    /// End of the current (or next) occurrence
    pub end_time: DateTime<Utc>,
    pub once: bool,
    /// Hash of the declaration, stable across occurrences
    pub fingerprint: String,
}

impl Period {
    /// Evaluate a declared period at `now`
    pub fn from_spec(spec: &PeriodSpec, now: DateTime<Utc>) -> Result<Self, PeriodError> {
        let invalid = |reason: String| PeriodError::Invalid {
            name: spec.name.clone(),
            reason,
        };

        let offset = parse_offset(spec.time.time_zone()).map_err(invalid)?;
        let (is_active, start_time, end_time) = match &spec.time {
            PeriodTime::Recurring(recurring) => recurring_window(recurring, offset, now),
            PeriodTime::Fixed(fixed) => fixed_window(fixed, offset, now),
        }
        .map_err(invalid)?;

        Ok(Self {
            name: spec.name.clone(),
            period_type: spec.period_type,
            is_active,
            start_time,
            end_time,
            once: spec.time.once(),
            fingerprint: fingerprint(spec)?,
        })
    }

    /// Delay before a finished one-shot period should be looked at again:
    /// the time left in its window plus `grace`.
    pub fn rerun_delay(&self, now: DateTime<Utc>, grace: std::time::Duration) -> std::time::Duration {
        // Negative remainders (window already over) collapse to zero.
        let remaining = (self.end_time - now).to_std().unwrap_or_default();
        remaining + grace
    }

    /// Status snapshot for this period, with no results yet
    pub fn snapshot(&self) -> CurrentPeriod {
        CurrentPeriod {
            name: self.name.clone(),
            period_type: self.period_type,
            spec_fingerprint: self.fingerprint.clone(),
            successful: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Outcome of [`resolve`]
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The period that applies now
    pub period: Period,
    /// Status recorded by the previous cycle, as it was before resolution
    pub previous: Option<CurrentPeriod>,
    /// Status snapshot for the resolved period
    pub next: CurrentPeriod,
}

impl Resolution {
    /// Both the previous and the new period are "noaction": nothing to do.
    pub fn is_noaction_steady_state(&self) -> bool {
        self.period.period_type == PeriodType::NoAction
            && self
                .previous
                .as_ref()
                .is_some_and(|previous| previous.period_type == PeriodType::NoAction)
    }

    /// Whether the resolved period differs from the recorded one
    pub fn period_changed(&self) -> bool {
        self.previous
            .as_ref()
            .map_or(true, |previous| previous.spec_fingerprint != self.next.spec_fingerprint)
    }
}

/// The fallback period: restore, every day, 00:00 to 00:00, repeatable.
pub fn default_restore_period() -> PeriodSpec {
    PeriodSpec {
        name: DEFAULT_RESTORE_PERIOD_NAME.to_string(),
        period_type: PeriodType::Restore,
        time: PeriodTime::Recurring(RecurringPeriod {
            days: vec!["all".to_string()],
            start_time: "00:00".to_string(),
            end_time: "00:00".to_string(),
            once: false,
            time_zone: None,
        }),
    }
}

/// SHA-256 (hex) of the canonical JSON encoding of a period declaration
pub fn fingerprint(spec: &PeriodSpec) -> Result<String, PeriodError> {
    let encoded = serde_json::to_vec(spec).map_err(|e| PeriodError::Invalid {
        name: spec.name.clone(),
        reason: format!("cannot encode period: {}", e),
    })?;
    let hash = Sha256::digest(&encoded);
    Ok(format!("{hash:x}"))
}

/// Pick the period that applies at `now`.
///
/// # Arguments
/// * `periods` - declared periods, in order
/// * `previous` - `status.currentPeriod` recorded by the last cycle
/// * `restore_requested` - the Scaler is being deleted and must restore resources
pub fn resolve(
    periods: &[PeriodSpec],
    previous: Option<&CurrentPeriod>,
    restore_requested: bool,
    now: DateTime<Utc>,
) -> Result<Resolution, PeriodError> {
    let restore = Period::from_spec(&default_restore_period(), now)?;

    let period = if restore_requested {
        restore
    } else {
        let mut selected = None;
        for spec in periods {
            let candidate = Period::from_spec(spec, now)?;
            if candidate.is_active {
                selected = Some(candidate);
                break;
            }
        }
        selected.unwrap_or(restore)
    };

    if period.once
        && previous.is_some_and(|previous| previous.spec_fingerprint == period.fingerprint)
    {
        return Err(PeriodError::AlreadyRun(Box::new(period)));
    }

    Ok(Resolution {
        next: period.snapshot(),
        previous: previous.cloned(),
        period,
    })
}

/// Parse a fixed UTC offset: "UTC", "Z", "+02:00", "-0530", "UTC+1".
fn parse_offset(time_zone: Option<&str>) -> Result<FixedOffset, String> {
    let raw = time_zone.map(str::trim).unwrap_or_default().to_ascii_uppercase();
    let rest = raw
        .strip_prefix("UTC")
        .or_else(|| raw.strip_prefix("GMT"))
        .unwrap_or(raw.as_str());
    if rest.is_empty() || rest == "Z" {
        return Ok(Utc.fix());
    }

    let (sign, digits) = if let Some(digits) = rest.strip_prefix('+') {
        (1, digits)
    } else if let Some(digits) = rest.strip_prefix('-') {
        (-1, digits)
    } else {
        return Err(format!("unsupported time zone '{}', expected a UTC offset", raw));
    };

    let (hours, minutes) = match digits.split_once(':') {
        Some(parts) => parts,
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };
    let hours: i32 = hours
        .parse()
        .map_err(|_| format!("invalid UTC offset '{}'", raw))?;
    let minutes: i32 = minutes
        .parse()
        .map_err(|_| format!("invalid UTC offset '{}'", raw))?;
    if hours > 14 || minutes >= 60 {
        return Err(format!("UTC offset '{}' out of range", raw));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| format!("UTC offset '{}' out of range", raw))
}

fn parse_days(days: &[String]) -> Result<Vec<Weekday>, String> {
    if days.is_empty() {
        return Err("days must not be empty".to_string());
    }
    let mut parsed = Vec::with_capacity(days.len());
    for day in days {
        let day = day.trim();
        if day.eq_ignore_ascii_case("all") {
            return Ok(ALL_DAYS.to_vec());
        }
        let weekday = day
            .parse::<Weekday>()
            .map_err(|_| format!("unknown weekday '{}'", day))?;
        if !parsed.contains(&weekday) {
            parsed.push(weekday);
        }
    }
    Ok(parsed)
}

fn parse_clock(raw: &str) -> Result<NaiveTime, String> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| format!("invalid time of day '{}', expected HH:MM", raw))
}

fn parse_instant(raw: &str, offset: FixedOffset) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return to_utc(offset, naive);
        }
    }
    Err(format!("invalid instant '{}', expected 'YYYY-MM-DD HH:MM:SS' or RFC 3339", raw))
}

fn to_utc(offset: FixedOffset, local: NaiveDateTime) -> Result<DateTime<Utc>, String> {
    offset
        .from_local_datetime(&local)
        .single()
        .map(|instant| instant.with_timezone(&Utc))
        .ok_or_else(|| format!("local time {} does not exist at offset {}", local, offset))
}

/// Occurrence starting on `date`. An end at or before the start wraps into
/// the next day, so equal times give a full 24h window.
fn occurrence(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> (NaiveDateTime, NaiveDateTime) {
    let from = date.and_time(start);
    let to = if end > start {
        date.and_time(end)
    } else {
        (date + Duration::days(1)).and_time(end)
    };
    (from, to)
}

fn recurring_window(
    recurring: &RecurringPeriod,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> Result<(bool, DateTime<Utc>, DateTime<Utc>), String> {
    let days = parse_days(&recurring.days)?;
    let start = parse_clock(&recurring.start_time)?;
    let end = parse_clock(&recurring.end_time)?;

    let local = now.with_timezone(&offset).naive_local();
    let today = local.date();

    // Today's occurrence, or yesterday's if it wraps past midnight.
    for days_back in [0, 1] {
        let date = today - Duration::days(days_back);
        if !days.contains(&date.weekday()) {
            continue;
        }
        let (from, to) = occurrence(date, start, end);
        if from <= local && local < to {
            return Ok((true, to_utc(offset, from)?, to_utc(offset, to)?));
        }
    }

    for days_ahead in 0..=7 {
        let date = today + Duration::days(days_ahead);
        if !days.contains(&date.weekday()) {
            continue;
        }
        let (from, to) = occurrence(date, start, end);
        if from > local {
            return Ok((false, to_utc(offset, from)?, to_utc(offset, to)?));
        }
    }

    Err("no upcoming occurrence".to_string())
}

fn fixed_window(
    fixed: &FixedPeriod,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> Result<(bool, DateTime<Utc>, DateTime<Utc>), String> {
    let start = parse_instant(&fixed.start_time, offset)?;
    let end = parse_instant(&fixed.end_time, offset)?;
    if end <= start {
        return Err(format!(
            "end time {} must be after start time {}",
            fixed.end_time, fixed.start_time
        ));
    }
    Ok((start <= now && now < end, start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn recurring(name: &str, period_type: PeriodType, days: &[&str], start: &str, end: &str) -> PeriodSpec {
        PeriodSpec {
            name: name.to_string(),
            period_type,
            time: PeriodTime::Recurring(RecurringPeriod {
                days: days.iter().map(|d| d.to_string()).collect(),
                start_time: start.to_string(),
                end_time: end.to_string(),
                once: false,
                time_zone: None,
            }),
        }
    }

    fn fixed(name: &str, period_type: PeriodType, start: &str, end: &str, once: bool) -> PeriodSpec {
        PeriodSpec {
            name: name.to_string(),
            period_type,
            time: PeriodTime::Fixed(FixedPeriod {
                start_time: start.to_string(),
                end_time: end.to_string(),
                once,
                time_zone: None,
            }),
        }
    }

    fn with_once(mut spec: PeriodSpec) -> PeriodSpec {
        match &mut spec.time {
            PeriodTime::Recurring(r) => r.once = true,
            PeriodTime::Fixed(f) => f.once = true,
        }
        spec
    }

    // 2024-06-03 is a Monday.

    #[test]
    fn test_empty_list_resolves_to_restore() {
        let now = at("2024-06-03T10:00:00Z");
        let resolution = resolve(&[], None, false, now).unwrap();
        assert_eq!(resolution.period.period_type, PeriodType::Restore);
        assert_eq!(resolution.period.name, DEFAULT_RESTORE_PERIOD_NAME);
        assert!(resolution.period.is_active);
        assert!(!resolution.period.once);
        assert_eq!(resolution.period.start_time, at("2024-06-03T00:00:00Z"));
        assert_eq!(resolution.period.end_time, at("2024-06-04T00:00:00Z"));
    }

    #[test]
    fn test_first_active_period_wins() {
        let now = at("2024-06-03T10:00:00Z");
        let periods = vec![
            recurring("evenings", PeriodType::Down, &["all"], "19:00", "23:00"),
            recurring("office", PeriodType::Up, &["mon"], "08:00", "18:00"),
            recurring("all-day", PeriodType::Down, &["all"], "00:00", "23:59"),
        ];
        let resolution = resolve(&periods, None, false, now).unwrap();
        assert_eq!(resolution.period.name, "office");
        assert_eq!(resolution.period.period_type, PeriodType::Up);
    }

    #[test]
    fn test_no_active_period_falls_back_to_restore() {
        let now = at("2024-06-03T10:00:00Z");
        let periods = vec![recurring("weekend", PeriodType::Down, &["sat", "sun"], "00:00", "00:00")];
        let resolution = resolve(&periods, None, false, now).unwrap();
        assert_eq!(resolution.period.period_type, PeriodType::Restore);
    }

    #[test]
    fn test_down_all_day_scenario() {
        let now = at("2024-06-03T10:00:00Z");
        let periods = vec![recurring("", PeriodType::Down, &["all"], "00:00", "23:59")];
        let resolution = resolve(&periods, None, false, now).unwrap();
        assert_eq!(resolution.period.period_type, PeriodType::Down);
        assert!(resolution.period.is_active);
        assert!(resolution.previous.is_none());
    }

    #[test]
    fn test_window_wrapping_midnight_started_yesterday() {
        // Monday 03:00, window opened Sunday 22:00
        let now = at("2024-06-03T03:00:00Z");
        let spec = recurring("nights", PeriodType::Down, &["Sunday"], "22:00", "06:00");
        let period = Period::from_spec(&spec, now).unwrap();
        assert!(period.is_active);
        assert_eq!(period.start_time, at("2024-06-02T22:00:00Z"));
        assert_eq!(period.end_time, at("2024-06-03T06:00:00Z"));
    }

    #[test]
    fn test_wrapping_window_requires_start_day() {
        let now = at("2024-06-03T03:00:00Z");
        let spec = recurring("nights", PeriodType::Down, &["MON"], "22:00", "06:00");
        let period = Period::from_spec(&spec, now).unwrap();
        assert!(!period.is_active);
        assert_eq!(period.start_time, at("2024-06-03T22:00:00Z"));
        assert_eq!(period.end_time, at("2024-06-04T06:00:00Z"));
    }

    #[test]
    fn test_inactive_period_reports_next_occurrence_a_week_ahead() {
        // Monday 10:00, window Monday 08:00-09:00 already passed
        let now = at("2024-06-03T10:00:00Z");
        let spec = recurring("standup", PeriodType::Up, &["monday"], "08:00", "09:00");
        let period = Period::from_spec(&spec, now).unwrap();
        assert!(!period.is_active);
        assert_eq!(period.start_time, at("2024-06-10T08:00:00Z"));
    }

    #[test]
    fn test_end_time_is_exclusive() {
        let spec = recurring("morning", PeriodType::Up, &["all"], "08:00", "10:00");
        assert!(!Period::from_spec(&spec, at("2024-06-03T10:00:00Z")).unwrap().is_active);
        assert!(Period::from_spec(&spec, at("2024-06-03T08:00:00Z")).unwrap().is_active);
    }

    #[test]
    fn test_invalid_days_and_times() {
        let now = at("2024-06-03T10:00:00Z");
        let empty_days = recurring("p", PeriodType::Up, &[], "08:00", "10:00");
        assert!(matches!(Period::from_spec(&empty_days, now), Err(PeriodError::Invalid { .. })));

        let bad_day = recurring("p", PeriodType::Up, &["funday"], "08:00", "10:00");
        let err = Period::from_spec(&bad_day, now).unwrap_err();
        assert!(err.to_string().contains("funday"));

        let bad_time = recurring("p", PeriodType::Up, &["all"], "25:00", "10:00");
        assert!(matches!(Period::from_spec(&bad_time, now), Err(PeriodError::Invalid { .. })));
    }

    #[test]
    fn test_malformed_period_is_a_hard_error() {
        let now = at("2024-06-03T10:00:00Z");
        let periods = vec![recurring("broken", PeriodType::Up, &["all"], "8am", "10:00")];
        assert!(matches!(
            resolve(&periods, None, false, now),
            Err(PeriodError::Invalid { name, .. }) if name == "broken"
        ));
    }

    #[test]
    fn test_time_zone_offset() {
        // 10:00Z is 12:00 at +02:00
        let now = at("2024-06-03T10:00:00Z");
        let mut spec = recurring("lunch", PeriodType::Down, &["mon"], "11:00", "13:00");
        if let PeriodTime::Recurring(r) = &mut spec.time {
            r.time_zone = Some("+02:00".to_string());
        }
        let period = Period::from_spec(&spec, now).unwrap();
        assert!(period.is_active);
        assert_eq!(period.start_time, at("2024-06-03T09:00:00Z"));
        assert_eq!(period.end_time, at("2024-06-03T11:00:00Z"));
    }

    #[test]
    fn test_parse_offset_forms() {
        assert_eq!(parse_offset(None).unwrap().local_minus_utc(), 0);
        assert_eq!(parse_offset(Some("utc")).unwrap().local_minus_utc(), 0);
        assert_eq!(parse_offset(Some("Z")).unwrap().local_minus_utc(), 0);
        assert_eq!(parse_offset(Some("-05:30")).unwrap().local_minus_utc(), -(5 * 3600 + 1800));
        assert_eq!(parse_offset(Some("+0100")).unwrap().local_minus_utc(), 3600);
        assert_eq!(parse_offset(Some("UTC+2")).unwrap().local_minus_utc(), 7200);
        assert!(parse_offset(Some("Europe/Paris")).is_err());
        assert!(parse_offset(Some("+25:00")).is_err());
    }

    #[test]
    fn test_fixed_window() {
        let now = at("2024-06-03T10:00:00Z");
        let active = fixed("release", PeriodType::Up, "2024-06-03 09:00:00", "2024-06-03T11:00:00Z", false);
        let period = Period::from_spec(&active, now).unwrap();
        assert!(period.is_active);
        assert_eq!(period.end_time, at("2024-06-03T11:00:00Z"));

        let past = fixed("old", PeriodType::Up, "2024-06-01 09:00:00", "2024-06-01 11:00:00", false);
        assert!(!Period::from_spec(&past, now).unwrap().is_active);

        let inverted = fixed("bad", PeriodType::Up, "2024-06-03 11:00:00", "2024-06-03 09:00:00", false);
        assert!(matches!(Period::from_spec(&inverted, now), Err(PeriodError::Invalid { .. })));
    }

    #[test]
    fn test_restore_request_overrides_selection() {
        let now = at("2024-06-03T10:00:00Z");
        let periods = vec![recurring("down", PeriodType::Down, &["all"], "00:00", "23:59")];
        let resolution = resolve(&periods, None, true, now).unwrap();
        assert_eq!(resolution.period.period_type, PeriodType::Restore);
        assert_eq!(resolution.period.name, DEFAULT_RESTORE_PERIOD_NAME);
    }

    #[test]
    fn test_run_once_period_already_run() {
        let now = at("2024-06-03T10:00:00Z");
        let periods = vec![with_once(recurring("once", PeriodType::Down, &["all"], "09:00", "12:00"))];

        let first = resolve(&periods, None, false, now).unwrap();
        assert!(first.period.once);

        let mut recorded = first.next.clone();
        recorded.successful.push(crds::ScalingSuccess {
            kind: "deployments".to_string(),
            name: "default/web".to_string(),
            comment: "scaled down from 3".to_string(),
        });

        match resolve(&periods, Some(&recorded), false, now) {
            Err(PeriodError::AlreadyRun(period)) => {
                assert_eq!(period.name, "once");
                assert_eq!(period.end_time, at("2024-06-03T12:00:00Z"));
                let grace = std::time::Duration::from_secs(60);
                assert_eq!(
                    period.rerun_delay(now, grace),
                    std::time::Duration::from_secs(2 * 3600 + 60)
                );
            }
            other => panic!("expected AlreadyRun, got {:?}", other),
        }
    }

    #[test]
    fn test_run_once_period_runs_again_after_edit() {
        let now = at("2024-06-03T10:00:00Z");
        let original = vec![with_once(recurring("once", PeriodType::Down, &["all"], "09:00", "12:00"))];
        let recorded = resolve(&original, None, false, now).unwrap().next;

        let edited = vec![with_once(recurring("once", PeriodType::Down, &["all"], "09:00", "12:30"))];
        let resolution = resolve(&edited, Some(&recorded), false, now).unwrap();
        assert!(resolution.period_changed());
    }

    #[test]
    fn test_rerun_delay_after_window_is_grace() {
        let now = at("2024-06-03T10:00:00Z");
        let spec = fixed("done", PeriodType::Up, "2024-06-03 08:00:00", "2024-06-03 09:00:00", true);
        let period = Period::from_spec(&spec, now).unwrap();
        let grace = std::time::Duration::from_secs(60);
        assert_eq!(period.rerun_delay(now, grace), grace);
    }

    #[test]
    fn test_fingerprint_is_stable_across_occurrences() {
        let spec = recurring("nights", PeriodType::Down, &["all"], "22:00", "06:00");
        let monday = Period::from_spec(&spec, at("2024-06-03T23:00:00Z")).unwrap();
        let tuesday = Period::from_spec(&spec, at("2024-06-04T23:00:00Z")).unwrap();
        assert_ne!(monday.start_time, tuesday.start_time);
        assert_eq!(monday.fingerprint, tuesday.fingerprint);
        assert_eq!(monday.fingerprint.len(), 64);

        let renamed = recurring("late", PeriodType::Down, &["all"], "22:00", "06:00");
        assert_ne!(fingerprint(&renamed).unwrap(), monday.fingerprint);
    }

    #[test]
    fn test_noaction_steady_state() {
        let now = at("2024-06-03T10:00:00Z");
        let periods = vec![recurring("freeze", PeriodType::NoAction, &["all"], "00:00", "00:00")];

        let first = resolve(&periods, None, false, now).unwrap();
        assert!(!first.is_noaction_steady_state());

        let second = resolve(&periods, Some(&first.next), false, now).unwrap();
        assert!(second.is_noaction_steady_state());
        assert!(!second.period_changed());

        let previous_down = CurrentPeriod {
            period_type: PeriodType::Down,
            ..first.next.clone()
        };
        let third = resolve(&periods, Some(&previous_down), false, now).unwrap();
        assert!(!third.is_noaction_steady_state());
    }

    #[test]
    fn test_resolution_keeps_previous_snapshot() {
        let now = at("2024-06-03T10:00:00Z");
        let previous = CurrentPeriod {
            name: "old".to_string(),
            period_type: PeriodType::Down,
            spec_fingerprint: "abc".to_string(),
            successful: vec![],
            failed: vec![],
        };
        let periods = vec![recurring("new", PeriodType::Up, &["all"], "00:00", "00:00")];
        let resolution = resolve(&periods, Some(&previous), false, now).unwrap();
        assert_eq!(resolution.previous.as_ref().map(|p| p.name.as_str()), Some("old"));
        assert_eq!(resolution.next.name, "new");
        assert_eq!(resolution.next.period_type, PeriodType::Up);
        assert_eq!(resolution.next.spec_fingerprint, resolution.period.fingerprint);
        assert!(resolution.period_changed());
    }
}
