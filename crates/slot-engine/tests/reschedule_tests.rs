//! Reschedule propagation: offset preservation, clamping, partial failure.

mod common;

use std::collections::HashSet;

use common::*;
use slot_engine::reschedule::{migrated_time, MigrationStatus, NotificationStatus, WindowUpdate};
use slot_engine::store::{AppointmentStore, ScheduleStore};
use slot_engine::{Actor, BookingError, ClockTime, RescheduleEngine, Services, WindowDraft};

fn draft(day: &str, start: &str, end: &str, max: Option<u32>) -> WindowDraft {
    WindowDraft::new(day, start, end, max)
}

#[test]
fn booking_keeps_its_offset_in_the_new_window() {
    let store = clinic();
    let notifier = RecordingNotifier::default();
    let window = add_window(&store, "d1", "Monday", "09:00", "10:00", None);
    seed_booking(&store, "b1", "d1", "2026-10-19", "09:30");

    let outcome = RescheduleEngine::new(services(&store, &notifier))
        .reschedule(
            &Actor::Admin,
            &window.id,
            draft("Tuesday", "14:00", "15:00", None),
            today(),
        )
        .unwrap();

    let moved = store.find_booking("b1").unwrap();
    assert_eq!(moved.date, date("2026-10-20"));
    assert_eq!(moved.time.to_string(), "14:30");

    assert!(outcome.window_updated());
    assert_eq!(outcome.updated_count(), 1);
    assert_eq!(outcome.failed_count(), 0);
    assert_eq!(outcome.notification, NotificationStatus::Dispatched);
    assert_eq!(outcome.summary(), "schedule updated; 1 of 1 appointments updated");

    let saved = store.find_window(&window.id).unwrap();
    assert_eq!(saved.to_string(), "Tuesday 14:00 - 15:00");
}

#[test]
fn offset_past_a_shorter_window_clamps_to_its_end() {
    let store = clinic();
    let notifier = RecordingNotifier::default();
    let window = add_window(&store, "d1", "Monday", "09:00", "10:00", None);
    seed_booking(&store, "b1", "d1", "2026-10-19", "09:55");

    let outcome = RescheduleEngine::new(services(&store, &notifier))
        .reschedule(
            &Actor::Admin,
            &window.id,
            draft("Tuesday", "14:00", "14:30", None),
            today(),
        )
        .unwrap();

    assert_eq!(store.find_booking("b1").unwrap().time.to_string(), "14:30");
    assert_eq!(outcome.migrations[0].to_time.to_string(), "14:30");
    assert_eq!(outcome.migrations[0].from_time.to_string(), "09:55");
}

#[test]
fn migrated_time_is_pure_offset_then_clamp() {
    let store = clinic();
    let old = add_window(&store, "d1", "Monday", "09:00", "10:00", None);
    let t = |s: &str| -> ClockTime { s.parse().unwrap() };

    assert_eq!(migrated_time(t("09:00"), &old, t("13:00"), t("13:20")), t("13:00"));
    assert_eq!(migrated_time(t("09:10"), &old, t("13:00"), t("13:20")), t("13:10"));
    assert_eq!(migrated_time(t("10:00"), &old, t("13:00"), t("13:20")), t("13:20"));
    // Late start that would run past midnight still clamps inside the window.
    assert_eq!(migrated_time(t("09:50"), &old, t("23:30"), t("23:59")), t("23:59"));
}

#[test]
fn no_affected_bookings_skips_notification() {
    let store = clinic();
    let notifier = RecordingNotifier::default();
    let window = add_window(&store, "d1", "Monday", "09:00", "10:00", None);
    // Outside the window and on another doctor's calendar: neither is affected.
    seed_booking(&store, "b-outside", "d1", "2026-10-19", "11:00");
    seed_booking(&store, "b-other", "d2", "2026-10-19", "09:30");

    let outcome = RescheduleEngine::new(services(&store, &notifier))
        .reschedule(
            &Actor::Admin,
            &window.id,
            draft("Wednesday", "08:00", "09:00", Some(4)),
            today(),
        )
        .unwrap();

    assert!(outcome.window_updated());
    assert!(outcome.migrations.is_empty());
    assert_eq!(outcome.notification, NotificationStatus::Skipped);
    assert_eq!(outcome.summary(), "no appointments found for this schedule.");
    assert_eq!(notifier.notice_count(), 0);
    assert_eq!(
        store.find_window(&window.id).unwrap().to_string(),
        "Wednesday 08:00 - 09:00 (max 4)"
    );
    assert_eq!(store.find_booking("b-outside").unwrap().time.to_string(), "11:00");
}

#[test]
fn only_the_projected_occurrence_is_affected() {
    let store = clinic();
    let notifier = RecordingNotifier::default();
    let window = add_window(&store, "d1", "Monday", "09:00", "10:00", None);
    seed_booking(&store, "b-next", "d1", "2026-10-19", "09:30");
    seed_booking(&store, "b-later", "d1", "2026-10-26", "09:30");

    let outcome = RescheduleEngine::new(services(&store, &notifier))
        .reschedule(
            &Actor::Admin,
            &window.id,
            draft("Tuesday", "14:00", "15:00", None),
            today(),
        )
        .unwrap();

    assert_eq!(outcome.migrations.len(), 1);
    assert_eq!(store.find_booking("b-later").unwrap().date, date("2026-10-26"));
}

#[test]
fn one_failed_update_does_not_block_the_others() {
    let store = FlakyStore {
        failing_bookings: HashSet::from(["b2".to_string()]),
        ..Default::default()
    };
    store.inner.add_doctor("d1", "Dr. Amara Okafor").unwrap();
    let window = add_window(&store, "d1", "Monday", "09:00", "10:00", None);
    seed_booking(&store.inner, "b1", "d1", "2026-10-19", "09:00");
    seed_booking(&store.inner, "b2", "d1", "2026-10-19", "09:20");
    seed_booking(&store.inner, "b3", "d1", "2026-10-19", "09:40");
    let notifier = RecordingNotifier::default();
    let services = Services {
        appointments: &store,
        schedules: &store,
        directory: &store,
        notifier: &notifier,
    };

    let outcome = RescheduleEngine::new(services)
        .reschedule(
            &Actor::Admin,
            &window.id,
            draft("Tuesday", "14:00", "15:00", None),
            today(),
        )
        .unwrap();

    assert_eq!(outcome.updated_count(), 2);
    assert_eq!(outcome.failed_count(), 1);
    let failed: Vec<_> = outcome
        .migrations
        .iter()
        .filter(|m| matches!(m.status, MigrationStatus::Failed(_)))
        .map(|m| m.booking_id.as_str())
        .collect();
    assert_eq!(failed, vec!["b2"]);

    assert!(outcome.window_updated());
    assert_eq!(store.find_window(&window.id).unwrap().to_string(), "Tuesday 14:00 - 15:00");
    assert_eq!(store.find_booking("b1").unwrap().time.to_string(), "14:00");
    assert_eq!(store.find_booking("b2").unwrap().date, date("2026-10-19"));
    assert_eq!(store.find_booking("b3").unwrap().time.to_string(), "14:40");
    assert_eq!(outcome.summary(), "schedule updated; 2 of 3 appointments updated");

    // Everyone affected is listed in the notice, including the one left behind.
    let notices = notifier.notices.lock().unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].booking_ids, vec!["b1", "b2", "b3"]);
}

#[test]
fn notification_failure_is_reported_not_rolled_back() {
    let store = clinic();
    let notifier = RecordingNotifier::failing("sms gateway timeout");
    let window = add_window(&store, "d1", "Monday", "09:00", "10:00", None);
    seed_booking(&store, "b1", "d1", "2026-10-19", "09:30");
    seed_booking(&store, "b2", "d1", "2026-10-19", "09:45");

    let outcome = RescheduleEngine::new(services(&store, &notifier))
        .reschedule(
            &Actor::Admin,
            &window.id,
            draft("Tuesday", "14:00", "15:00", None),
            today(),
        )
        .unwrap();

    assert_eq!(
        outcome.notification,
        NotificationStatus::Failed("sms gateway timeout".to_string())
    );
    assert_eq!(
        outcome.summary(),
        "schedule updated; 2 of 2 appointments updated; notifications failed: sms gateway timeout"
    );
    assert_eq!(store.find_booking("b2").unwrap().time.to_string(), "14:45");
}

#[test]
fn window_write_failure_still_moves_bookings() {
    let store = FlakyStore {
        fail_window_writes: true,
        ..Default::default()
    };
    let window = add_window(&store, "d1", "Monday", "09:00", "10:00", None);
    seed_booking(&store.inner, "b1", "d1", "2026-10-19", "09:30");
    let notifier = RecordingNotifier::default();
    let services = Services {
        appointments: &store,
        schedules: &store,
        directory: &store,
        notifier: &notifier,
    };

    let outcome = RescheduleEngine::new(services)
        .reschedule(
            &Actor::Admin,
            &window.id,
            draft("Tuesday", "14:00", "15:00", None),
            today(),
        )
        .unwrap();

    assert!(!outcome.window_updated());
    assert!(matches!(outcome.window, WindowUpdate::Failed(_)));
    assert_eq!(outcome.updated_count(), 1);
    assert!(outcome.summary().starts_with("schedule update failed: "));
    let notices = notifier.notices.lock().unwrap();
    assert_eq!(notices[0].new_window.to_string(), "Tuesday 14:00 - 15:00");
}

#[test]
fn compressed_offsets_are_flagged_as_collisions() {
    let store = clinic();
    let notifier = RecordingNotifier::default();
    let window = add_window(&store, "d1", "Monday", "09:00", "10:00", None);
    seed_booking(&store, "b1", "d1", "2026-10-19", "09:10");
    seed_booking(&store, "b2", "d1", "2026-10-19", "09:40");
    seed_booking(&store, "b3", "d1", "2026-10-19", "09:50");

    let outcome = RescheduleEngine::new(services(&store, &notifier))
        .reschedule(
            &Actor::Admin,
            &window.id,
            draft("Tuesday", "14:00", "14:30", None),
            today(),
        )
        .unwrap();

    assert_eq!(outcome.collisions.len(), 1);
    assert_eq!(outcome.collisions[0].time.to_string(), "14:30");
    assert_eq!(outcome.collisions[0].booking_ids, vec!["b2", "b3"]);
    // The store's slot constraint lets the first one through and rejects the second.
    assert_eq!(outcome.updated_count(), 2);
    assert_eq!(outcome.failed_count(), 1);
}

#[test]
fn same_day_shift_later_does_not_trip_over_neighbours() {
    let store = clinic();
    let notifier = RecordingNotifier::default();
    let window = add_window(&store, "d1", "Monday", "09:00", "10:00", None);
    seed_booking(&store, "b1", "d1", "2026-10-19", "09:00");
    seed_booking(&store, "b2", "d1", "2026-10-19", "09:30");

    let outcome = RescheduleEngine::new(services(&store, &notifier))
        .reschedule(
            &Actor::Admin,
            &window.id,
            draft("Monday", "09:30", "10:30", None),
            today(),
        )
        .unwrap();

    assert_eq!(outcome.failed_count(), 0);
    assert_eq!(store.find_booking("b1").unwrap().time.to_string(), "09:30");
    assert_eq!(store.find_booking("b2").unwrap().time.to_string(), "10:00");
}

#[test]
fn unchanged_window_is_saved_without_migrating() {
    let store = clinic();
    let notifier = RecordingNotifier::default();
    let window = add_window(&store, "d1", "Monday", "09:00", "10:00", Some(3));
    seed_booking(&store, "b1", "d1", "2026-10-19", "09:30");

    let outcome = RescheduleEngine::new(services(&store, &notifier))
        .reschedule(
            &Actor::Admin,
            &window.id,
            draft("mon", "09:00", "10:00", Some(3)),
            today(),
        )
        .unwrap();

    assert!(!outcome.changed);
    assert!(outcome.migrations.is_empty());
    assert_eq!(outcome.notification, NotificationStatus::Skipped);
    assert_eq!(notifier.notice_count(), 0);
}

#[test]
fn synchronous_failures_write_nothing() {
    let store = clinic();
    let notifier = RecordingNotifier::default();
    let window = add_window(&store, "d1", "Monday", "09:00", "10:00", None);
    seed_booking(&store, "b1", "d1", "2026-10-19", "09:30");
    let engine = RescheduleEngine::new(services(&store, &notifier));

    let err = engine
        .reschedule(&Actor::Admin, "w-404", draft("Tuesday", "14:00", "15:00", None), today())
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound(_)));

    let err = engine
        .reschedule(&Actor::Admin, &window.id, draft("Tuesday", "15:00", "14:00", None), today())
        .unwrap_err();
    assert!(matches!(err, BookingError::Format(_)));

    let err = engine
        .reschedule(
            &Actor::Doctor("d2".to_string()),
            &window.id,
            draft("Tuesday", "14:00", "15:00", None),
            today(),
        )
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));

    assert_eq!(store.find_window(&window.id).unwrap(), window);
    assert_eq!(store.find_booking("b1").unwrap().time.to_string(), "09:30");
    assert_eq!(notifier.notice_count(), 0);
}
