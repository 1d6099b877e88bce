use huddle_core::db::open_db_in_memory;
use huddle_core::{
    AttendeeEntry, AttendeeStatus, Meeting, MeetingRepository, RepoError,
    SqliteMeetingRepository, ValidationError,
};
use rusqlite::Connection;
use uuid::Uuid;

const HOUR: i64 = 60 * 60 * 1000;

fn meeting(organizer: Uuid, title: &str, start_hour: i64, end_hour: i64) -> Meeting {
    Meeting::new(organizer, title, start_hour * HOUR, end_hour * HOUR).unwrap()
}

fn with_attendee(mut meeting: Meeting, user_id: Uuid, status: AttendeeStatus) -> Meeting {
    meeting.attendees.push(AttendeeEntry { user_id, status });
    meeting
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let result = SqliteMeetingRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        })
    ));
}

#[test]
fn save_and_find_by_id_preserve_fields_and_roster_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::try_new(&conn).unwrap();
    let organizer = Uuid::new_v4();
    let second = Uuid::new_v4();
    let first = Uuid::new_v4();

    let mut draft = meeting(organizer, "Quarterly planning", 9, 11);
    draft.description = Some("budget".to_string());
    draft.location = Some("Room 7".to_string());
    let draft = with_attendee(draft, second, AttendeeStatus::Accepted);
    let draft = with_attendee(draft, first, AttendeeStatus::Pending);

    let saved = repo.save(&draft).unwrap();
    assert!(saved.created_at.is_some());
    assert!(saved.updated_at.is_some());

    let loaded = repo.find_by_id(draft.id).unwrap().unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(loaded.title, "Quarterly planning");
    assert_eq!(loaded.description.as_deref(), Some("budget"));
    assert_eq!(loaded.location.as_deref(), Some("Room 7"));
    let order: Vec<_> = loaded.attendees.iter().map(|entry| entry.user_id).collect();
    assert_eq!(order, vec![second, first]);
}

#[test]
fn find_by_id_returns_none_for_unknown_meeting() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::try_new(&conn).unwrap();
    assert!(repo.find_by_id(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn save_replaces_existing_row_and_roster() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::try_new(&conn).unwrap();
    let organizer = Uuid::new_v4();
    let dropped = Uuid::new_v4();
    let kept = Uuid::new_v4();

    let original = with_attendee(
        with_attendee(meeting(organizer, "Sync", 9, 10), dropped, AttendeeStatus::Pending),
        kept,
        AttendeeStatus::Pending,
    );
    let saved = repo.save(&original).unwrap();

    let mut edited = saved.clone();
    edited.title = "Sync (moved)".to_string();
    edited.start_at = 13 * HOUR;
    edited.end_at = 14 * HOUR;
    edited.attendees = vec![AttendeeEntry {
        user_id: kept,
        status: AttendeeStatus::Declined,
    }];
    let updated = repo.save(&edited).unwrap();

    assert_eq!(updated.title, "Sync (moved)");
    assert_eq!(updated.start_at, 13 * HOUR);
    assert_eq!(updated.created_at, saved.created_at);
    assert_eq!(
        updated.attendees,
        vec![AttendeeEntry {
            user_id: kept,
            status: AttendeeStatus::Declined,
        }]
    );

    let rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM meeting_attendees WHERE meeting_uuid = ?1;",
            [original.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn save_rejects_invalid_meeting_before_writing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::try_new(&conn).unwrap();
    let organizer = Uuid::new_v4();

    let mut bad = meeting(organizer, "Loop", 9, 10);
    bad.attendees.push(AttendeeEntry::invited(organizer));

    let err = repo.save(&bad).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::OrganizerIsAttendee)
    ));
    assert!(repo.find_by_id(bad.id).unwrap().is_none());
}

#[test]
fn find_committed_includes_organized_and_accepted_only() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::try_new(&conn).unwrap();
    let user = Uuid::new_v4();
    let other = Uuid::new_v4();

    let organized = repo.save(&meeting(user, "Own", 8, 9)).unwrap();
    let accepted = repo
        .save(&with_attendee(
            meeting(other, "Accepted", 10, 11),
            user,
            AttendeeStatus::Accepted,
        ))
        .unwrap();
    repo.save(&with_attendee(
        meeting(other, "Pending", 12, 13),
        user,
        AttendeeStatus::Pending,
    ))
    .unwrap();
    repo.save(&with_attendee(
        meeting(other, "Declined", 14, 15),
        user,
        AttendeeStatus::Declined,
    ))
    .unwrap();
    repo.save(&meeting(other, "Unrelated", 8, 9)).unwrap();

    let ids: Vec<_> = repo
        .find_committed(user, None)
        .unwrap()
        .into_iter()
        .map(|meeting| meeting.id)
        .collect();
    assert_eq!(ids, vec![organized.id, accepted.id]);

    let ids: Vec<_> = repo
        .find_committed(user, Some(organized.id))
        .unwrap()
        .into_iter()
        .map(|meeting| meeting.id)
        .collect();
    assert_eq!(ids, vec![accepted.id]);
}

#[test]
fn find_for_participant_includes_every_invite_status() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::try_new(&conn).unwrap();
    let user = Uuid::new_v4();
    let other = Uuid::new_v4();

    repo.save(&with_attendee(
        meeting(other, "Declined", 14, 15),
        user,
        AttendeeStatus::Declined,
    ))
    .unwrap();
    repo.save(&with_attendee(
        meeting(other, "Pending", 10, 11),
        user,
        AttendeeStatus::Pending,
    ))
    .unwrap();
    repo.save(&meeting(user, "Own", 12, 13)).unwrap();
    repo.save(&meeting(other, "Unrelated", 9, 10)).unwrap();

    let titles: Vec<_> = repo
        .find_for_participant(user)
        .unwrap()
        .into_iter()
        .map(|meeting| meeting.title)
        .collect();
    assert_eq!(titles, vec!["Pending", "Own", "Declined"]);
}

#[test]
fn delete_by_id_cascades_roster_and_reports_missing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::try_new(&conn).unwrap();
    let organizer = Uuid::new_v4();

    let saved = repo
        .save(&with_attendee(
            meeting(organizer, "Gone", 9, 10),
            Uuid::new_v4(),
            AttendeeStatus::Accepted,
        ))
        .unwrap();

    repo.delete_by_id(saved.id).unwrap();
    assert!(repo.find_by_id(saved.id).unwrap().is_none());

    let orphans: i64 = conn
        .query_row("SELECT COUNT(*) FROM meeting_attendees;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(orphans, 0);

    let err = repo.delete_by_id(saved.id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == saved.id));
}

#[test]
fn unit_of_work_rolls_back_every_write_on_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::try_new(&conn).unwrap();
    let organizer = Uuid::new_v4();
    let first = meeting(organizer, "First", 9, 10);
    let second = meeting(organizer, "Second", 10, 11);

    let result: Result<(), RepoError> = repo.in_unit_of_work(|| {
        repo.save(&first)?;
        repo.save(&second)?;
        Err(RepoError::InvalidData("abort".to_string()))
    });
    assert!(result.is_err());
    assert!(conn.is_autocommit());
    assert!(repo.find_by_id(first.id).unwrap().is_none());
    assert!(repo.find_by_id(second.id).unwrap().is_none());

    let saved: Result<_, RepoError> = repo.in_unit_of_work(|| repo.save(&first));
    assert_eq!(saved.unwrap().id, first.id);
    assert!(repo.find_by_id(first.id).unwrap().is_some());
}

#[test]
fn corrupted_organizer_is_reported_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::try_new(&conn).unwrap();
    let saved = repo
        .save(&meeting(Uuid::new_v4(), "Tampered", 9, 10))
        .unwrap();

    conn.execute(
        "UPDATE meetings SET organizer_uuid = 'not-a-uuid' WHERE uuid = ?1;",
        [saved.id.to_string()],
    )
    .unwrap();

    let err = repo.find_by_id(saved.id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(message) if message.contains("organizer_uuid")));
}
