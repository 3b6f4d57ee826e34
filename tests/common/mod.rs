#![allow(dead_code)]

use timetable_core::data::{Course, CourseProgramme, Professor, Programme, Room, Session};
use timetable_core::{Catalog, Dataset, TimetableConfig};

pub fn config(slots_per_day: u32, days: u32) -> TimetableConfig {
    TimetableConfig {
        slots_per_day,
        days,
        time_limit_secs: 30.0,
        workers: 1,
        ..Default::default()
    }
}

pub fn professor(id: u32) -> Professor {
    Professor { id, name: format!("Prof {id}") }
}

pub fn course(id: u32, professor: u32) -> Course {
    Course { id, professor, name: format!("Course {id}") }
}

pub fn session(id: u32, hours: u32, course: u32) -> Session {
    Session { id, hours, course }
}

pub fn programme(id: u32, students: u32) -> Programme {
    Programme { id, name: format!("CdS {id}"), students }
}

pub fn member(course: u32, programme: u32) -> CourseProgramme {
    CourseProgramme { course, programme }
}

pub fn room(id: u32, capacity: u32) -> Room {
    Room { id, capacity, name: format!("Room {id}") }
}

/// Three professors, five courses, ten sessions, three programmes and eight
/// rooms of very different sizes.
pub fn sample_dataset() -> Dataset {
    Dataset {
        professors: vec![professor(1), professor(2), professor(3)],
        courses: vec![
            Course { id: 101, professor: 1, name: "ANALISI 1".into() },
            Course { id: 102, professor: 2, name: "PROGRAMMAZIONE".into() },
            Course { id: 103, professor: 2, name: "SISTEMI OPERATIVI".into() },
            Course { id: 104, professor: 3, name: "GEOMETRIA".into() },
            Course { id: 105, professor: 3, name: "ANALISI 2".into() },
        ],
        sessions: vec![
            session(1, 2, 101),
            session(2, 3, 101),
            session(3, 3, 102),
            session(4, 4, 102),
            session(5, 2, 103),
            session(6, 2, 103),
            session(7, 2, 103),
            session(8, 3, 104),
            session(9, 2, 104),
            session(10, 3, 105),
        ],
        programmes: vec![
            Programme { id: 201, name: "AIDA".into(), students: 80 },
            Programme { id: 202, name: "MATEMATICA".into(), students: 40 },
            Programme { id: 203, name: "INGEGNERIA INFORMATICA".into(), students: 70 },
        ],
        memberships: vec![
            member(101, 201),
            member(101, 202),
            member(101, 203),
            member(102, 201),
            member(102, 203),
            member(103, 203),
            member(104, 201),
            member(104, 202),
            member(105, 202),
        ],
        rooms: vec![
            Room { id: 301, capacity: 120, name: "Aula Morin".into() },
            Room { id: 302, capacity: 60, name: "Aula 4B H2 Bis".into() },
            Room { id: 303, capacity: 200, name: "Aula Ciamician".into() },
            Room { id: 304, capacity: 30, name: "Laboratorio Informatico".into() },
            Room { id: 305, capacity: 100, name: "Aula Magna H3".into() },
            Room { id: 306, capacity: 10, name: "Edificio Economo Aula 1".into() },
            Room { id: 307, capacity: 80, name: "Aula 3A H2 Bis".into() },
            Room { id: 308, capacity: 80, name: "Aula I Edificio Tutankhamon".into() },
        ],
    }
}

pub fn sample_catalog() -> Catalog {
    Catalog::new(sample_dataset()).expect("sample dataset is consistent")
}

pub fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("timetable-{}-{}", std::process::id(), name))
}
