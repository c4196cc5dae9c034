//! Pure queue policy decisions.
//!
//! This module answers the questions the mutation service asks inside its
//! transaction: is the queue open, may this student sign up, what priority
//! does a new entry get, and how are entries ordered for display. It holds
//! no state and performs no I/O; the db crate feeds it the values it needs.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Local, Timelike, Utc};

use crate::types::Id;

/// Number of half-hour slots in a schedule day string.
pub const HALF_HOURS_PER_DAY: usize = 48;

/// Schedule slot characters.
pub const SLOT_OPEN: u8 = b'o';
pub const SLOT_CLOSED: u8 = b'c';
pub const SLOT_PRIORITY: u8 = b'p';

/// Index of the current half-hour slot in local time, 0..47.
pub fn current_half_hour(now: DateTime<Local>) -> usize {
    (now.hour() * 60 + now.minute()) as usize / 30
}

/// Whether a queue is open right now.
///
/// Scheduled queues are open when today's slot is `o` or `p`; `p`
/// ("priority-open") admits exactly like `o`. Unscheduled queues follow the
/// manual flag.
pub fn is_open(scheduled: bool, manual_open: bool, today: &str, half_hour: usize) -> bool {
    if scheduled {
        matches!(
            today.as_bytes().get(half_hour),
            Some(&SLOT_OPEN) | Some(&SLOT_PRIORITY)
        )
    } else {
        manual_open
    }
}

// ---------------------------------------------------------------------------
// Signup eligibility
// ---------------------------------------------------------------------------

/// Why a signup was refused. The `Display` text is shown to students.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupDenial {
    Closed,
    NotOnRoster,
    TeammateInQueue,
    Cooldown { remaining_seconds: i64 },
}

impl fmt::Display for SignupDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignupDenial::Closed => f.write_str("the queue is closed"),
            SignupDenial::NotOnRoster => f.write_str("you are not in the course roster"),
            SignupDenial::TeammateInQueue => f.write_str("your teammate is in the queue"),
            SignupDenial::Cooldown { remaining_seconds } => write!(
                f,
                "you are attempting to sign up too soon after you were last helped. \
                 Try again in {}",
                format_wait(*remaining_seconds)
            ),
        }
    }
}

/// Seconds left on the cooldown, or `None` when the student may sign up.
pub fn cooldown_remaining(
    last_helped: DateTime<Utc>,
    cooldown_seconds: i64,
    now: DateTime<Utc>,
) -> Option<i64> {
    let elapsed = (now - last_helped).num_seconds();
    if elapsed < cooldown_seconds {
        Some(cooldown_seconds - elapsed)
    } else {
        None
    }
}

/// Human wait duration: `"N seconds"`, `"a minute"`, or `"N minutes"`.
pub fn format_wait(seconds: i64) -> String {
    match seconds / 60 {
        0 => format!("{seconds} seconds"),
        1 => "a minute".to_string(),
        minutes => format!("{minutes} minutes"),
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Priority for a newly inserted entry.
///
/// The boost rewards the first helped question of the day: it is withheld
/// once the student (or, when the group check is on, any teammate) has
/// already been helped today.
pub fn new_entry_priority(
    prioritize_new: bool,
    helped_today: bool,
    teammate_helped_today: bool,
) -> i32 {
    if prioritize_new && !helped_today && !teammate_helped_today {
        1
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Display order
// ---------------------------------------------------------------------------

/// The fields an entry is ordered by for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayKey {
    pub pinned: bool,
    pub being_helped: bool,
    pub priority: i32,
    pub id: Id,
}

impl DisplayKey {
    /// Total display order: pinned entries first, then entries being helped,
    /// then descending priority, then ascending id (insertion order).
    pub fn display_order(&self, other: &Self) -> Ordering {
        other
            .pinned
            .cmp(&self.pinned)
            .then_with(|| other.being_helped.cmp(&self.being_helped))
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    // -- Half-hour index ---------------------------------------------------

    #[test]
    fn half_hour_covers_the_day() {
        let morning = Local.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        assert_eq!(current_half_hour(morning), 0);

        let noonish = Local.with_ymd_and_hms(2026, 3, 2, 12, 29, 59).unwrap();
        assert_eq!(current_half_hour(noonish), 24);

        let night = Local.with_ymd_and_hms(2026, 3, 2, 23, 30, 0).unwrap();
        assert_eq!(current_half_hour(night), 47);
    }

    // -- Open decision -----------------------------------------------------

    #[test]
    fn scheduled_queue_follows_the_slot_character() {
        let mut day = "c".repeat(48);
        day.replace_range(10..11, "o");
        day.replace_range(11..12, "p");

        assert!(is_open(true, false, &day, 10));
        assert!(is_open(true, false, &day, 11), "p admits like o");
        assert!(!is_open(true, true, &day, 12), "manual flag ignored when scheduled");
    }

    #[test]
    fn unscheduled_queue_follows_the_manual_flag() {
        let day = "o".repeat(48);
        assert!(is_open(false, true, &day, 0));
        assert!(!is_open(false, false, &day, 0));
    }

    #[test]
    fn out_of_range_slot_reads_closed() {
        assert!(!is_open(true, true, "", 5));
    }

    // -- Cooldown ----------------------------------------------------------

    #[test]
    fn cooldown_expires_after_the_window() {
        let helped = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();

        let during = helped + chrono::Duration::seconds(30);
        assert_eq!(cooldown_remaining(helped, 60, during), Some(30));

        let after = helped + chrono::Duration::seconds(60);
        assert_eq!(cooldown_remaining(helped, 60, after), None);
    }

    #[test]
    fn wait_formatting_matches_the_minute_breaks() {
        assert_eq!(format_wait(30), "30 seconds");
        assert_eq!(format_wait(59), "59 seconds");
        assert_eq!(format_wait(60), "a minute");
        assert_eq!(format_wait(119), "a minute");
        assert_eq!(format_wait(120), "2 minutes");
        assert_eq!(format_wait(601), "10 minutes");
    }

    #[test]
    fn cooldown_denial_names_the_remaining_time() {
        let denial = SignupDenial::Cooldown {
            remaining_seconds: 30,
        };
        assert!(denial.to_string().contains("Try again in 30 seconds"));
    }

    // -- Priority ----------------------------------------------------------

    #[test]
    fn first_question_of_the_day_is_boosted() {
        assert_eq!(new_entry_priority(true, false, false), 1);
    }

    #[test]
    fn boost_withheld_after_being_helped_today() {
        assert_eq!(new_entry_priority(true, true, false), 0);
    }

    #[test]
    fn boost_withheld_when_a_teammate_was_helped_today() {
        assert_eq!(new_entry_priority(true, false, true), 0);
    }

    #[test]
    fn no_boost_when_disabled() {
        assert_eq!(new_entry_priority(false, false, false), 0);
    }

    // -- Display order -----------------------------------------------------

    fn key(pinned: bool, helped: bool, priority: i32, seconds: i64) -> DisplayKey {
        DisplayKey {
            pinned,
            being_helped: helped,
            priority,
            id: Id::from_unix_seconds(seconds),
        }
    }

    #[test]
    fn display_order_layers_pinned_helping_priority_id() {
        let pinned = key(true, false, 0, 400);
        let helped = key(false, true, 0, 300);
        let boosted = key(false, false, 1, 200);
        let older = key(false, false, 0, 100);
        let newer = key(false, false, 0, 150);

        let mut entries = vec![
            newer.clone(),
            boosted.clone(),
            pinned.clone(),
            older.clone(),
            helped.clone(),
        ];
        entries.sort_by(|a, b| a.display_order(b));

        assert_eq!(entries, vec![pinned, helped, boosted, older, newer]);
    }

    #[test]
    fn display_order_is_idempotent() {
        let mut entries = vec![
            key(false, false, 2, 100),
            key(true, false, 0, 300),
            key(false, true, 5, 200),
            key(false, false, 0, 50),
        ];
        entries.sort_by(|a, b| a.display_order(b));
        let once = entries.clone();
        entries.sort_by(|a, b| a.display_order(b));
        assert_eq!(entries, once);
    }

    #[test]
    fn display_order_is_total_on_distinct_ids() {
        let a = key(false, false, 0, 100);
        let b = key(false, false, 0, 101);
        assert_eq!(a.display_order(&b), Ordering::Less);
        assert_eq!(b.display_order(&a), Ordering::Greater);
        assert_eq!(a.display_order(&a), Ordering::Equal);
    }
}
