//! Weekly university timetabling on top of a boolean satisfiability engine.
//!
//! A run loads entities through a [`data::DataProvider`], allocates the
//! occupancy / block-start literals, asserts the constraint families, and
//! solves in two passes: feasibility first, then an opportunistic
//! tightening that is kept only when it stays satisfiable.

pub mod calendar;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod schedule;
pub mod spreadsheet;

pub use config::{Timeslot, TimetableConfig};
pub use data::{Catalog, DataProvider, Dataset};
pub use error::{Result, SolvePass, TimetableError};
pub use model::{ImprovementOutcome, SolveReport, Timetabler, two_stage_schedule};
pub use schedule::{
    FileScheduleStore, MemoryScheduleStore, Schedule, ScheduleEntry, ScheduleFilter, ScheduleStore,
};
