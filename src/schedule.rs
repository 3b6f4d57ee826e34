//! The solved timetable: entries, persistence and read-side views.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use log::debug;
use savefile_derive::Savefile;
use serde::{Deserialize, Serialize};

use crate::config::{Timeslot, TimetableConfig};
use crate::data::{CourseId, DataProvider, ProfessorId, ProgrammeId, RoomId, SessionId};
use crate::error::TimetableError;

/// One occupied (timeslot, session, room) cell.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Savefile,
)]
pub struct ScheduleEntry {
    pub timeslot: Timeslot,
    pub session: SessionId,
    pub room: RoomId,
}

/// Entries ordered by timeslot, then session, then room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    entries: Vec<ScheduleEntry>,
}

impl Schedule {
    pub fn new(mut entries: Vec<ScheduleEntry>) -> Self {
        entries.sort();
        entries.dedup();
        Self { entries }
    }

    pub fn from_cells(cells: Vec<(Timeslot, SessionId, RoomId)>) -> Self {
        Self::new(
            cells
                .into_iter()
                .map(|(timeslot, session, room)| ScheduleEntry { timeslot, session, room })
                .collect(),
        )
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces whatever `store` held with this schedule.
    pub fn persist(&self, store: &mut impl ScheduleStore) -> crate::error::Result<()> {
        store.reset()?;
        for entry in &self.entries {
            store.append(*entry)?;
        }
        store.commit()?;
        debug!("persisted {} schedule entries", self.entries.len());
        Ok(())
    }

    pub fn load(store: &impl ScheduleStore) -> crate::error::Result<Self> {
        Ok(Self::new(store.read()?))
    }

    /// Entries of one programme, professor, course or room, as
    /// (timeslot, course, room) ordered by timeslot.
    pub fn filtered(
        &self,
        provider: &impl DataProvider,
        filter: ScheduleFilter,
    ) -> crate::error::Result<Vec<FilteredEntry>> {
        let ids = provider.list_ids();
        let known = match filter {
            ScheduleFilter::Programme(id) => ids.programmes.contains(&id),
            ScheduleFilter::Professor(id) => ids.professors.contains(&id),
            ScheduleFilter::Course(id) => ids.courses.contains(&id),
            ScheduleFilter::Room(id) => ids.rooms.contains(&id),
        };
        if !known {
            return Err(TimetableError::Usage(format!("unknown filter target {filter:?}")));
        }

        let programme_courses: BTreeSet<CourseId> = match filter {
            ScheduleFilter::Programme(id) => provider.courses_in_programme(id)?.into_iter().collect(),
            _ => BTreeSet::new(),
        };

        let mut out = Vec::new();
        for entry in &self.entries {
            let course = provider.course_of(entry.session)?;
            let keep = match filter {
                ScheduleFilter::Programme(_) => programme_courses.contains(&course),
                ScheduleFilter::Professor(id) => provider.professor_of(entry.session)? == id,
                ScheduleFilter::Course(id) => course == id,
                ScheduleFilter::Room(id) => entry.room == id,
            };
            if keep {
                out.push(FilteredEntry { timeslot: entry.timeslot, course, room: entry.room });
            }
        }
        Ok(out)
    }

    /// Checks every structural property a valid timetable must have.
    pub fn verify(
        &self,
        provider: &impl DataProvider,
        config: &TimetableConfig,
    ) -> crate::error::Result<Vec<Violation>> {
        let ids = provider.list_ids();
        let mut violations = Vec::new();

        let mut by_session: BTreeMap<SessionId, Vec<&ScheduleEntry>> = BTreeMap::new();
        let mut by_cell: HashMap<(Timeslot, RoomId), Vec<SessionId>> = HashMap::new();
        let mut by_slot: BTreeMap<Timeslot, BTreeSet<SessionId>> = BTreeMap::new();
        for entry in &self.entries {
            if !ids.sessions.contains(&entry.session) {
                return Err(TimetableError::DataAccess(format!(
                    "schedule references unknown session {}",
                    entry.session
                )));
            }
            if !config.slot_available(entry.timeslot) {
                violations.push(Violation::UnavailableSlot {
                    session: entry.session,
                    timeslot: entry.timeslot,
                });
            }
            by_session.entry(entry.session).or_default().push(entry);
            by_cell.entry((entry.timeslot, entry.room)).or_default().push(entry.session);
            by_slot.entry(entry.timeslot).or_default().insert(entry.session);
        }

        for &session in &ids.sessions {
            let hours = provider.hours_of(session)?;
            let cells = by_session.get(&session).map(Vec::as_slice).unwrap_or(&[]);
            if cells.len() != hours as usize {
                violations.push(Violation::WrongLength {
                    session,
                    expected: hours,
                    found: cells.len(),
                });
                continue;
            }
            let first = cells[0];
            let contiguous = cells.iter().enumerate().all(|(k, e)| {
                e.timeslot == first.timeslot + k as u32
                    && e.room == first.room
                    && config.day_of(e.timeslot) == config.day_of(first.timeslot)
            });
            if !contiguous {
                violations.push(Violation::NotContiguous { session });
            }

            let students = provider.total_students(provider.course_of(session)?)?;
            let rooms: BTreeSet<RoomId> = cells.iter().map(|e| e.room).collect();
            for room in rooms {
                if students > provider.capacity_of(room)? {
                    violations.push(Violation::OverCapacity { session, room, students });
                }
            }
        }

        let mut cells: Vec<_> = by_cell.into_iter().filter(|(_, s)| s.len() > 1).collect();
        cells.sort();
        for ((timeslot, room), sessions) in cells {
            violations.push(Violation::RoomDoubleBooked { timeslot, room, sessions });
        }

        for (&timeslot, sessions) in &by_slot {
            let mut professors: BTreeMap<ProfessorId, SessionId> = BTreeMap::new();
            for &s in sessions {
                let rooms = self
                    .entries
                    .iter()
                    .filter(|e| e.timeslot == timeslot && e.session == s)
                    .count();
                if rooms > 1 {
                    violations.push(Violation::SessionInTwoRooms { session: s, timeslot });
                }
                let professor = provider.professor_of(s)?;
                if let Some(&other) = professors.get(&professor) {
                    violations.push(Violation::ProfessorClash { timeslot, professor, sessions: (other, s) });
                } else {
                    professors.insert(professor, s);
                }
                for sibling in provider.conflicting_sessions(s)? {
                    if sibling > s && sessions.contains(&sibling) {
                        violations.push(Violation::ProgrammeClash { timeslot, sessions: (s, sibling) });
                    }
                }
            }
        }

        Ok(violations)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleFilter {
    Programme(ProgrammeId),
    Professor(ProfessorId),
    Course(CourseId),
    Room(RoomId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilteredEntry {
    pub timeslot: Timeslot,
    pub course: CourseId,
    pub room: RoomId,
}

/// A broken timetable property found by [`Schedule::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    WrongLength { session: SessionId, expected: u32, found: usize },
    NotContiguous { session: SessionId },
    UnavailableSlot { session: SessionId, timeslot: Timeslot },
    RoomDoubleBooked { timeslot: Timeslot, room: RoomId, sessions: Vec<SessionId> },
    SessionInTwoRooms { session: SessionId, timeslot: Timeslot },
    ProfessorClash { timeslot: Timeslot, professor: ProfessorId, sessions: (SessionId, SessionId) },
    ProgrammeClash { timeslot: Timeslot, sessions: (SessionId, SessionId) },
    OverCapacity { session: SessionId, room: RoomId, students: u32 },
}

/// Write side and read side of the schedule table.
pub trait ScheduleStore {
    /// Drops every entry of the previous run.
    fn reset(&mut self) -> crate::error::Result<()>;
    fn append(&mut self, entry: ScheduleEntry) -> crate::error::Result<()>;
    /// Makes the entries appended since the last reset durable.
    fn commit(&mut self) -> crate::error::Result<()> {
        Ok(())
    }
    /// All committed entries, ordered by timeslot.
    fn read(&self) -> crate::error::Result<Vec<ScheduleEntry>>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryScheduleStore {
    entries: Vec<ScheduleEntry>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScheduleStore for MemoryScheduleStore {
    fn reset(&mut self) -> crate::error::Result<()> {
        self.entries.clear();
        Ok(())
    }

    fn append(&mut self, entry: ScheduleEntry) -> crate::error::Result<()> {
        self.entries.push(entry);
        Ok(())
    }

    fn read(&self) -> crate::error::Result<Vec<ScheduleEntry>> {
        let mut entries = self.entries.clone();
        entries.sort();
        Ok(entries)
    }
}

/// Savefile-backed store. Appends are buffered; `commit` rewrites the file
/// with the whole entry set so readers never see a partial schedule.
#[derive(Debug)]
pub struct FileScheduleStore {
    path: PathBuf,
    pending: Vec<ScheduleEntry>,
}

impl FileScheduleStore {
    pub const VERSION: u32 = 1;

    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), pending: Vec::new() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScheduleStore for FileScheduleStore {
    fn reset(&mut self) -> crate::error::Result<()> {
        self.pending.clear();
        Ok(())
    }

    fn append(&mut self, entry: ScheduleEntry) -> crate::error::Result<()> {
        self.pending.push(entry);
        Ok(())
    }

    fn commit(&mut self) -> crate::error::Result<()> {
        let tmp = self.path.with_extension("tmp");
        savefile::save_file(&tmp, Self::VERSION, &self.pending)
            .map_err(|e| TimetableError::Storage(format!("cannot write {}: {e:?}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| TimetableError::Storage(format!("cannot replace {}: {e}", self.path.display())))
    }

    fn read(&self) -> crate::error::Result<Vec<ScheduleEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut entries: Vec<ScheduleEntry> = savefile::load_file(&self.path, Self::VERSION)
            .map_err(|e| TimetableError::Storage(format!("cannot read {}: {e:?}", self.path.display())))?;
        entries.sort();
        Ok(entries)
    }
}
