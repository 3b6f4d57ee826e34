//! Entities of the timetabling problem and the read-only data contract the
//! model builder consumes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TimetableError};

pub type ProfessorId = u32;
pub type CourseId = u32;
pub type SessionId = u32;
pub type ProgrammeId = u32;
pub type RoomId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professor {
    pub id: ProfessorId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub professor: ProfessorId,
    pub name: String,
}

/// An indivisible teaching unit occupying `hours` contiguous slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub hours: u32,
    pub course: CourseId,
}

/// A degree programme (CdS).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Programme {
    pub id: ProgrammeId,
    pub name: String,
    pub students: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseProgramme {
    pub course: CourseId,
    pub programme: ProgrammeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub capacity: u32,
    pub name: String,
}

/// Raw rows as loaded from a file, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub professors: Vec<Professor>,
    pub courses: Vec<Course>,
    pub sessions: Vec<Session>,
    pub programmes: Vec<Programme>,
    pub memberships: Vec<CourseProgramme>,
    pub rooms: Vec<Room>,
}

impl Dataset {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TimetableError::DataAccess(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| TimetableError::DataAccess(format!("invalid dataset {}: {e}", path.display())))
    }
}

/// All primary keys, in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityIds {
    pub sessions: Vec<SessionId>,
    pub courses: Vec<CourseId>,
    pub professors: Vec<ProfessorId>,
    pub programmes: Vec<ProgrammeId>,
    pub rooms: Vec<RoomId>,
}

/// Read-only access to the entities of one solving run.
///
/// Every lookup fails with [`TimetableError::DataAccess`] when the referenced
/// entity does not exist; callers never receive a guessed default.
pub trait DataProvider {
    fn list_ids(&self) -> EntityIds;
    fn hours_of(&self, session: SessionId) -> Result<u32>;
    fn course_of(&self, session: SessionId) -> Result<CourseId>;
    fn professor_of(&self, session: SessionId) -> Result<ProfessorId>;
    /// Sum of the enrolled students of every programme the course belongs to.
    fn total_students(&self, course: CourseId) -> Result<u32>;
    fn capacity_of(&self, room: RoomId) -> Result<u32>;
    fn sessions_of(&self, course: CourseId) -> Result<Vec<SessionId>>;
    /// Sessions of other courses sharing at least one programme with the
    /// session's course.
    fn conflicting_sessions(&self, session: SessionId) -> Result<Vec<SessionId>>;
    fn courses_in_programme(&self, programme: ProgrammeId) -> Result<Vec<CourseId>>;

    fn course_name(&self, course: CourseId) -> Result<String>;
    fn room_name(&self, room: RoomId) -> Result<String>;
    fn programme_name(&self, programme: ProgrammeId) -> Result<String>;
    fn professor_name(&self, professor: ProfessorId) -> Result<String>;
}

fn missing(kind: &str, id: u32) -> TimetableError {
    TimetableError::DataAccess(format!("unknown {kind} {id}"))
}

/// Validated in-memory provider. Construction fails unless every reference
/// resolves, so a `Catalog` is always ready to be queried.
#[derive(Debug, Clone)]
pub struct Catalog {
    dataset: Dataset,
    ids: EntityIds,
    professors: HashMap<ProfessorId, usize>,
    courses: HashMap<CourseId, usize>,
    sessions: HashMap<SessionId, usize>,
    programmes: HashMap<ProgrammeId, usize>,
    rooms: HashMap<RoomId, usize>,
    course_sessions: HashMap<CourseId, Vec<SessionId>>,
    course_programmes: BTreeMap<CourseId, BTreeSet<ProgrammeId>>,
    programme_courses: BTreeMap<ProgrammeId, BTreeSet<CourseId>>,
}

fn index_by<T>(
    kind: &str,
    rows: &[T],
    id: impl Fn(&T) -> u32,
) -> Result<(HashMap<u32, usize>, Vec<u32>)> {
    let mut index = HashMap::with_capacity(rows.len());
    let mut order = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let key = id(row);
        if index.insert(key, i).is_some() {
            return Err(TimetableError::DataAccess(format!("duplicate {kind} id {key}")));
        }
        order.push(key);
    }
    Ok((index, order))
}

impl Catalog {
    pub fn new(dataset: Dataset) -> Result<Self> {
        let (professors, professor_ids) = index_by("professor", &dataset.professors, |p| p.id)?;
        let (courses, course_ids) = index_by("course", &dataset.courses, |c| c.id)?;
        let (sessions, session_ids) = index_by("session", &dataset.sessions, |s| s.id)?;
        let (programmes, programme_ids) = index_by("programme", &dataset.programmes, |p| p.id)?;
        let (rooms, room_ids) = index_by("room", &dataset.rooms, |r| r.id)?;

        for course in &dataset.courses {
            if !professors.contains_key(&course.professor) {
                return Err(TimetableError::DataAccess(format!(
                    "course {} references unknown professor {}",
                    course.id, course.professor
                )));
            }
        }

        let mut course_sessions: HashMap<CourseId, Vec<SessionId>> = HashMap::new();
        for session in &dataset.sessions {
            if session.hours == 0 {
                return Err(TimetableError::DataAccess(format!(
                    "session {} must last at least one slot",
                    session.id
                )));
            }
            if !courses.contains_key(&session.course) {
                return Err(TimetableError::DataAccess(format!(
                    "session {} references unknown course {}",
                    session.id, session.course
                )));
            }
            course_sessions.entry(session.course).or_default().push(session.id);
        }

        let mut course_programmes: BTreeMap<CourseId, BTreeSet<ProgrammeId>> = BTreeMap::new();
        let mut programme_courses: BTreeMap<ProgrammeId, BTreeSet<CourseId>> = BTreeMap::new();
        for m in &dataset.memberships {
            if !courses.contains_key(&m.course) {
                return Err(missing("course", m.course));
            }
            if !programmes.contains_key(&m.programme) {
                return Err(missing("programme", m.programme));
            }
            course_programmes.entry(m.course).or_default().insert(m.programme);
            programme_courses.entry(m.programme).or_default().insert(m.course);
        }

        Ok(Self {
            ids: EntityIds {
                sessions: session_ids,
                courses: course_ids,
                professors: professor_ids,
                programmes: programme_ids,
                rooms: room_ids,
            },
            dataset,
            professors,
            courses,
            sessions,
            programmes,
            rooms,
            course_sessions,
            course_programmes,
            programme_courses,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn session(&self, id: SessionId) -> Result<&Session> {
        self.sessions
            .get(&id)
            .map(|&i| &self.dataset.sessions[i])
            .ok_or_else(|| missing("session", id))
    }

    fn course(&self, id: CourseId) -> Result<&Course> {
        self.courses
            .get(&id)
            .map(|&i| &self.dataset.courses[i])
            .ok_or_else(|| missing("course", id))
    }

    fn room(&self, id: RoomId) -> Result<&Room> {
        self.rooms
            .get(&id)
            .map(|&i| &self.dataset.rooms[i])
            .ok_or_else(|| missing("room", id))
    }

    fn programme(&self, id: ProgrammeId) -> Result<&Programme> {
        self.programmes
            .get(&id)
            .map(|&i| &self.dataset.programmes[i])
            .ok_or_else(|| missing("programme", id))
    }
}

impl DataProvider for Catalog {
    fn list_ids(&self) -> EntityIds {
        self.ids.clone()
    }

    fn hours_of(&self, session: SessionId) -> Result<u32> {
        Ok(self.session(session)?.hours)
    }

    fn course_of(&self, session: SessionId) -> Result<CourseId> {
        Ok(self.session(session)?.course)
    }

    fn professor_of(&self, session: SessionId) -> Result<ProfessorId> {
        let course = self.course_of(session)?;
        Ok(self.course(course)?.professor)
    }

    fn total_students(&self, course: CourseId) -> Result<u32> {
        self.course(course)?;
        let Some(programmes) = self.course_programmes.get(&course) else {
            return Ok(0);
        };
        let mut total: u32 = 0;
        for &p in programmes {
            total = total.checked_add(self.programme(p)?.students).ok_or_else(|| {
                TimetableError::DataAccess(format!(
                    "course {course} enrols more than {} students",
                    u32::MAX
                ))
            })?;
        }
        Ok(total)
    }

    fn capacity_of(&self, room: RoomId) -> Result<u32> {
        Ok(self.room(room)?.capacity)
    }

    fn sessions_of(&self, course: CourseId) -> Result<Vec<SessionId>> {
        self.course(course)?;
        Ok(self.course_sessions.get(&course).cloned().unwrap_or_default())
    }

    fn conflicting_sessions(&self, session: SessionId) -> Result<Vec<SessionId>> {
        let course = self.course_of(session)?;
        let Some(programmes) = self.course_programmes.get(&course) else {
            return Ok(Vec::new());
        };
        let siblings: BTreeSet<CourseId> = programmes
            .iter()
            .filter_map(|p| self.programme_courses.get(p))
            .flatten()
            .copied()
            .filter(|&c| c != course)
            .collect();
        Ok(self
            .ids
            .sessions
            .iter()
            .copied()
            .filter(|s| {
                self.session(*s)
                    .map(|s| siblings.contains(&s.course))
                    .unwrap_or(false)
            })
            .collect())
    }

    fn courses_in_programme(&self, programme: ProgrammeId) -> Result<Vec<CourseId>> {
        self.programme(programme)?;
        Ok(self
            .programme_courses
            .get(&programme)
            .map(|c| c.iter().copied().collect())
            .unwrap_or_default())
    }

    fn course_name(&self, course: CourseId) -> Result<String> {
        Ok(self.course(course)?.name.clone())
    }

    fn room_name(&self, room: RoomId) -> Result<String> {
        Ok(self.room(room)?.name.clone())
    }

    fn programme_name(&self, programme: ProgrammeId) -> Result<String> {
        Ok(self.programme(programme)?.name.clone())
    }

    fn professor_name(&self, professor: ProfessorId) -> Result<String> {
        self.professors
            .get(&professor)
            .map(|&i| self.dataset.professors[i].name.clone())
            .ok_or_else(|| missing("professor", professor))
    }
}
