mod common;

use common::*;
use timetable_core::data::{
    CourseId, DataProvider, EntityIds, ProfessorId, ProgrammeId, RoomId, SessionId,
};
use timetable_core::model::ConstraintFamily;
use timetable_core::{
    Catalog, Dataset, ImprovementOutcome, MemoryScheduleStore, Result, ScheduleStore,
    SolvePass, TimetableError, Timetabler, two_stage_schedule,
};

#[test]
fn test_single_two_hour_session_is_placed_contiguously() {
    let catalog = Catalog::new(Dataset {
        professors: vec![professor(1)],
        courses: vec![course(10, 1)],
        sessions: vec![session(1, 2, 10)],
        programmes: vec![programme(20, 50)],
        memberships: vec![member(10, 20)],
        rooms: vec![room(30, 100)],
    })
    .unwrap();
    let config = config(14, 6);
    let mut store = MemoryScheduleStore::new();

    let report = two_stage_schedule(&catalog, &config, &mut store).unwrap();

    let entries = store.read().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].timeslot, entries[0].timeslot + 1);
    assert_eq!(config.day_of(entries[0].timeslot), config.day_of(entries[1].timeslot));
    assert!(entries.iter().all(|e| e.session == 1 && e.room == 30));
    assert_eq!(report.schedule.entries(), entries.as_slice());
    assert!(report.schedule.verify(&catalog, &config).unwrap().is_empty());
}

#[test]
fn test_same_professor_with_one_slot_is_infeasible() {
    let catalog = Catalog::new(Dataset {
        professors: vec![professor(1)],
        courses: vec![course(10, 1), course(11, 1)],
        sessions: vec![session(1, 1, 10), session(2, 1, 11)],
        rooms: vec![room(30, 100), room(31, 100)],
        ..Default::default()
    })
    .unwrap();
    let mut store = MemoryScheduleStore::new();

    let err = two_stage_schedule(&catalog, &config(1, 1), &mut store).unwrap_err();

    match err {
        TimetableError::Infeasible { conflicting } => {
            assert_eq!(conflicting, vec!["C3 (professor exclusivity)".to_string()]);
        }
        other => panic!("expected infeasibility, got {other:?}"),
    }
    assert!(store.read().unwrap().is_empty());
}

#[test]
fn test_session_longer_than_a_day_is_reported_distinctly() {
    let catalog = Catalog::new(Dataset {
        professors: vec![professor(1)],
        courses: vec![course(10, 1)],
        sessions: vec![session(1, 2, 10), session(2, 8, 10)],
        rooms: vec![room(30, 100)],
        ..Default::default()
    })
    .unwrap();
    let mut store = MemoryScheduleStore::new();

    let err = two_stage_schedule(&catalog, &config(7, 6), &mut store).unwrap_err();

    assert!(matches!(
        err,
        TimetableError::SessionTooLong { session: 2, hours: 8, longest_window: 7 }
    ));
    assert!(store.read().unwrap().is_empty());
}

#[test]
fn test_absurd_session_length_is_too_long_not_a_crash() {
    let catalog = Catalog::new(Dataset {
        professors: vec![professor(1)],
        courses: vec![course(10, 1)],
        sessions: vec![session(1, u32::MAX, 10)],
        rooms: vec![room(30, 100)],
        ..Default::default()
    })
    .unwrap();
    let mut store = MemoryScheduleStore::new();

    let err = two_stage_schedule(&catalog, &config(7, 2), &mut store).unwrap_err();

    assert!(matches!(
        err,
        TimetableError::SessionTooLong { session: 1, hours: u32::MAX, longest_window: 7 }
    ));
    assert!(store.read().unwrap().is_empty());
}

#[test]
fn test_exhausted_budget_is_a_timeout() {
    let catalog = sample_catalog();
    let mut config = config(14, 6);
    config.time_limit_secs = 1e-6;
    let mut store = MemoryScheduleStore::new();

    let err = two_stage_schedule(&catalog, &config, &mut store).unwrap_err();

    assert!(matches!(err, TimetableError::Timeout { pass: SolvePass::Feasibility, .. }));
    assert!(store.read().unwrap().is_empty());
}

#[test]
fn test_excluded_slots_can_make_a_session_too_long() {
    let catalog = Catalog::new(Dataset {
        professors: vec![professor(1)],
        courses: vec![course(10, 1)],
        sessions: vec![session(1, 4, 10)],
        rooms: vec![room(30, 100)],
        ..Default::default()
    })
    .unwrap();
    let mut config = config(5, 2);
    // Lunch break in the middle of both days.
    config.excluded_slots = [2, 7].into_iter().collect();
    let mut store = MemoryScheduleStore::new();

    let err = two_stage_schedule(&catalog, &config, &mut store).unwrap_err();
    assert!(matches!(
        err,
        TimetableError::SessionTooLong { session: 1, hours: 4, longest_window: 2 }
    ));
}

#[test]
fn test_course_larger_than_every_room_is_infeasible() {
    let catalog = Catalog::new(Dataset {
        professors: vec![professor(1)],
        courses: vec![course(10, 1)],
        sessions: vec![session(1, 1, 10)],
        programmes: vec![programme(20, 150), programme(21, 100)],
        memberships: vec![member(10, 20), member(10, 21)],
        rooms: vec![room(30, 200), room(31, 120)],
    })
    .unwrap();
    assert_eq!(catalog.total_students(10).unwrap(), 250);
    let mut store = MemoryScheduleStore::new();

    let err = two_stage_schedule(&catalog, &config(7, 6), &mut store).unwrap_err();

    match err {
        TimetableError::Infeasible { conflicting } => {
            assert_eq!(conflicting, vec!["C5 (capacity)".to_string()]);
        }
        other => panic!("expected infeasibility, got {other:?}"),
    }
}

#[test]
fn test_room_must_hold_at_least_the_enrolled_students() {
    let catalog = Catalog::new(Dataset {
        professors: vec![professor(1)],
        courses: vec![course(10, 1)],
        sessions: vec![session(1, 2, 10)],
        programmes: vec![programme(20, 90)],
        memberships: vec![member(10, 20)],
        rooms: vec![room(30, 20), room(31, 90), room(32, 60)],
    })
    .unwrap();
    let mut store = MemoryScheduleStore::new();

    two_stage_schedule(&catalog, &config(7, 6), &mut store).unwrap();

    assert!(store.read().unwrap().iter().all(|e| e.room == 31));
}

#[test]
fn test_programme_siblings_never_overlap() {
    let catalog = Catalog::new(Dataset {
        professors: vec![professor(1), professor(2)],
        courses: vec![course(10, 1), course(11, 2)],
        sessions: vec![session(1, 1, 10), session(2, 1, 11)],
        programmes: vec![programme(20, 30)],
        memberships: vec![member(10, 20), member(11, 20)],
        rooms: vec![room(30, 100), room(31, 100)],
    })
    .unwrap();
    let config = config(2, 1);
    let mut store = MemoryScheduleStore::new();

    two_stage_schedule(&catalog, &config, &mut store).unwrap();

    let entries = store.read().unwrap();
    assert_eq!(entries.len(), 2);
    assert_ne!(entries[0].timeslot, entries[1].timeslot);
}

#[test]
fn test_programme_conflict_alone_can_be_blamed() {
    let catalog = Catalog::new(Dataset {
        professors: vec![professor(1), professor(2)],
        courses: vec![course(10, 1), course(11, 2)],
        sessions: vec![session(1, 1, 10), session(2, 1, 11)],
        programmes: vec![programme(20, 30)],
        memberships: vec![member(10, 20), member(11, 20)],
        rooms: vec![room(30, 100), room(31, 100)],
    })
    .unwrap();
    let mut store = MemoryScheduleStore::new();

    let err = two_stage_schedule(&catalog, &config(1, 1), &mut store).unwrap_err();
    match err {
        TimetableError::Infeasible { conflicting } => {
            assert_eq!(conflicting, vec!["C4 (programme conflict)".to_string()]);
        }
        other => panic!("expected infeasibility, got {other:?}"),
    }
}

#[test]
fn test_improvement_spreads_a_course_over_days() {
    let catalog = Catalog::new(Dataset {
        professors: vec![professor(1)],
        courses: vec![course(10, 1)],
        sessions: vec![session(1, 1, 10), session(2, 1, 10)],
        rooms: vec![room(30, 100)],
        ..Default::default()
    })
    .unwrap();
    let config = config(3, 2);
    let mut store = MemoryScheduleStore::new();

    let report = two_stage_schedule(&catalog, &config, &mut store).unwrap();

    assert_eq!(report.improvement, ImprovementOutcome::Applied);
    let entries = store.read().unwrap();
    assert_eq!(entries.len(), 2);
    assert_ne!(config.day_of(entries[0].timeslot), config.day_of(entries[1].timeslot));
    assert_eq!(report.schedule.entries(), entries.as_slice());
}

#[test]
fn test_unavailable_improvement_keeps_first_schedule() {
    let catalog = Catalog::new(Dataset {
        professors: vec![professor(1)],
        courses: vec![course(10, 1)],
        sessions: vec![session(1, 2, 10), session(2, 1, 10)],
        rooms: vec![room(30, 100)],
        ..Default::default()
    })
    .unwrap();
    // A single day: the course cannot avoid two blocks on it.
    let config = config(4, 1);
    let mut store = MemoryScheduleStore::new();

    let report = two_stage_schedule(&catalog, &config, &mut store).unwrap();

    assert_eq!(report.improvement, ImprovementOutcome::Unavailable);
    assert_eq!(report.first_pass_entries, 3);
    let entries = store.read().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(report.schedule.entries(), entries.as_slice());
    assert!(report.schedule.verify(&catalog, &config).unwrap().is_empty());
}

#[test]
fn test_improvement_can_be_disabled() {
    let catalog = Catalog::new(Dataset {
        professors: vec![professor(1)],
        courses: vec![course(10, 1)],
        sessions: vec![session(1, 1, 10), session(2, 1, 10)],
        rooms: vec![room(30, 100)],
        ..Default::default()
    })
    .unwrap();
    let mut config = config(3, 2);
    config.improve = false;
    let mut store = MemoryScheduleStore::new();

    let report = two_stage_schedule(&catalog, &config, &mut store).unwrap();
    assert_eq!(report.improvement, ImprovementOutcome::Skipped);
    assert_eq!(store.read().unwrap().len(), 2);
}

#[test]
fn test_excluded_day_is_never_used() {
    let catalog = Catalog::new(Dataset {
        professors: vec![professor(1)],
        courses: vec![course(10, 1)],
        sessions: vec![session(1, 2, 10), session(2, 2, 10)],
        rooms: vec![room(30, 100)],
        ..Default::default()
    })
    .unwrap();
    let mut config = config(2, 3);
    config.excluded_days = [0].into_iter().collect();
    let mut store = MemoryScheduleStore::new();

    let report = two_stage_schedule(&catalog, &config, &mut store).unwrap();

    assert_eq!(report.improvement, ImprovementOutcome::Applied);
    let entries = store.read().unwrap();
    assert_eq!(entries.len(), 4);
    assert!(entries.iter().all(|e| config.day_of(e.timeslot) != 0));
}

#[test]
fn test_no_rooms_is_infeasible() {
    let catalog = Catalog::new(Dataset {
        professors: vec![professor(1)],
        courses: vec![course(10, 1)],
        sessions: vec![session(1, 1, 10)],
        ..Default::default()
    })
    .unwrap();
    let mut config = config(3, 1);
    config.diagnose = false;
    let mut store = MemoryScheduleStore::new();

    let err = two_stage_schedule(&catalog, &config, &mut store).unwrap_err();
    assert!(matches!(err, TimetableError::Infeasible { conflicting } if conflicting.is_empty()));
}

#[test]
fn test_invalid_configuration_is_a_usage_error() {
    let catalog = sample_catalog();
    let mut store = MemoryScheduleStore::new();
    let err = two_stage_schedule(&catalog, &config(0, 6), &mut store).unwrap_err();
    assert!(matches!(err, TimetableError::Usage(_)));
}

#[test]
fn test_labelled_constraints_name_their_keys() {
    let catalog = Catalog::new(Dataset {
        professors: vec![professor(1)],
        courses: vec![course(10, 1)],
        sessions: vec![session(1, 1, 10)],
        rooms: vec![room(30, 100)],
        ..Default::default()
    })
    .unwrap();
    let mut config = config(2, 1);
    config.label_constraints = true;

    let encoded = Timetabler::new(&catalog, &config).load().unwrap().encode();
    let labels: Vec<String> = encoded.context().labels().map(|l| l.to_string()).collect();

    assert!(labels.contains(&"C6-amo-1".to_string()));
    assert!(labels.contains(&"C6-alo-1".to_string()));
    assert!(labels.contains(&"C2-fit-1%0%30".to_string()));
    assert_eq!(encoded.context().counts()[&ConstraintFamily::SinglePlacement], 2);

    let mut store = MemoryScheduleStore::new();
    let report = encoded.solve(&mut store).unwrap();
    assert_eq!(report.schedule.len(), 1);
}

#[test]
fn test_unlabelled_run_still_counts_constraints() {
    let catalog = sample_catalog();
    let config = config(7, 6);
    let encoded = Timetabler::new(&catalog, &config).load().unwrap().encode();
    assert_eq!(encoded.context().labels().count(), 0);
    assert_eq!(encoded.context().counts()[&ConstraintFamily::SinglePlacement], 20);
    assert!(!encoded.context().counts().contains_key(&ConstraintFamily::CourseDaySpread));
}

/// Catalog whose room capacities cannot be read.
struct BrokenRooms(Catalog);

impl DataProvider for BrokenRooms {
    fn list_ids(&self) -> EntityIds {
        self.0.list_ids()
    }
    fn hours_of(&self, session: SessionId) -> Result<u32> {
        self.0.hours_of(session)
    }
    fn course_of(&self, session: SessionId) -> Result<CourseId> {
        self.0.course_of(session)
    }
    fn professor_of(&self, session: SessionId) -> Result<ProfessorId> {
        self.0.professor_of(session)
    }
    fn total_students(&self, course: CourseId) -> Result<u32> {
        self.0.total_students(course)
    }
    fn capacity_of(&self, room: RoomId) -> Result<u32> {
        Err(TimetableError::DataAccess(format!("room table unreachable for {room}")))
    }
    fn sessions_of(&self, course: CourseId) -> Result<Vec<SessionId>> {
        self.0.sessions_of(course)
    }
    fn conflicting_sessions(&self, session: SessionId) -> Result<Vec<SessionId>> {
        self.0.conflicting_sessions(session)
    }
    fn courses_in_programme(&self, programme: ProgrammeId) -> Result<Vec<CourseId>> {
        self.0.courses_in_programme(programme)
    }
    fn course_name(&self, course: CourseId) -> Result<String> {
        self.0.course_name(course)
    }
    fn room_name(&self, room: RoomId) -> Result<String> {
        self.0.room_name(room)
    }
    fn programme_name(&self, programme: ProgrammeId) -> Result<String> {
        self.0.programme_name(programme)
    }
    fn professor_name(&self, professor: ProfessorId) -> Result<String> {
        self.0.professor_name(professor)
    }
}

#[test]
fn test_provider_failure_aborts_before_solving() {
    let provider = BrokenRooms(sample_catalog());
    let config = config(7, 6);
    let mut store = MemoryScheduleStore::new();

    assert!(matches!(
        Timetabler::new(&provider, &config).load(),
        Err(TimetableError::DataAccess(_))
    ));
    let err = two_stage_schedule(&provider, &config, &mut store).unwrap_err();
    assert!(matches!(err, TimetableError::DataAccess(_)));
    assert!(store.read().unwrap().is_empty());
}
