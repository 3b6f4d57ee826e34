//! Shared state for model construction: the engine's model builder, the
//! variable registry, per-session facts pulled from the data provider and the
//! ledger of asserted constraint families.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use cp_sat::builder::{BoolVar, Constraint, CpModelBuilder};
use log::debug;

use super::model_vars::{Index, VariableRegistry};
use crate::config::{Timeslot, TimetableConfig};
use crate::data::{CourseId, DataProvider, EntityIds, ProfessorId, SessionId};
use crate::error::{Result, TimetableError};

/// The constraint families asserted into the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstraintFamily {
    RoomExclusivity,
    Contiguity,
    ProfessorExclusivity,
    ProgrammeConflict,
    Capacity,
    SinglePlacement,
    SingleRoom,
    CourseDaySpread,
}

impl ConstraintFamily {
    pub const ALL: [ConstraintFamily; 8] = [
        ConstraintFamily::RoomExclusivity,
        ConstraintFamily::Contiguity,
        ConstraintFamily::ProfessorExclusivity,
        ConstraintFamily::ProgrammeConflict,
        ConstraintFamily::Capacity,
        ConstraintFamily::SinglePlacement,
        ConstraintFamily::SingleRoom,
        ConstraintFamily::CourseDaySpread,
    ];

    /// Families that can be switched off to diagnose an infeasible instance.
    /// Contiguity and placement define what a schedule is, so they always stay.
    pub const RELAXABLE: [ConstraintFamily; 5] = [
        ConstraintFamily::RoomExclusivity,
        ConstraintFamily::ProfessorExclusivity,
        ConstraintFamily::ProgrammeConflict,
        ConstraintFamily::Capacity,
        ConstraintFamily::SingleRoom,
    ];

    pub fn code(self) -> &'static str {
        match self {
            ConstraintFamily::RoomExclusivity => "C1",
            ConstraintFamily::Contiguity => "C2",
            ConstraintFamily::ProfessorExclusivity => "C3",
            ConstraintFamily::ProgrammeConflict => "C4",
            ConstraintFamily::Capacity => "C5",
            ConstraintFamily::SinglePlacement => "C6",
            ConstraintFamily::SingleRoom => "C7",
            ConstraintFamily::CourseDaySpread => "C8",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            ConstraintFamily::RoomExclusivity => "room exclusivity",
            ConstraintFamily::Contiguity => "contiguity",
            ConstraintFamily::ProfessorExclusivity => "professor exclusivity",
            ConstraintFamily::ProgrammeConflict => "programme conflict",
            ConstraintFamily::Capacity => "capacity",
            ConstraintFamily::SinglePlacement => "exact single placement",
            ConstraintFamily::SingleRoom => "single-room occupancy",
            ConstraintFamily::CourseDaySpread => "one block per course per day",
        }
    }
}

impl fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.describe())
    }
}

/// Stable label of one asserted constraint, e.g. `C1-4%301` or `C2-fit-7%3%301`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintLabel {
    pub family: ConstraintFamily,
    pub tag: &'static str,
    pub keys: Vec<u32>,
}

impl fmt::Display for ConstraintLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.family.code())?;
        if !self.tag.is_empty() {
            write!(f, "-{}", self.tag)?;
        }
        for (i, k) in self.keys.iter().enumerate() {
            write!(f, "{}{k}", if i == 0 { "-" } else { "%" })?;
        }
        Ok(())
    }
}

/// Which families the pipeline asserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyToggles {
    disabled: BTreeSet<ConstraintFamily>,
}

impl FamilyToggles {
    pub fn all() -> Self {
        Self { disabled: BTreeSet::new() }
    }

    pub fn without(family: ConstraintFamily) -> Self {
        Self { disabled: [family].into_iter().collect() }
    }

    pub fn enabled(&self, family: ConstraintFamily) -> bool {
        !self.disabled.contains(&family)
    }
}

/// Facts about one session, resolved once through the data provider.
#[derive(Debug, Clone)]
pub struct SessionFacts {
    pub id: SessionId,
    pub hours: u32,
    pub course: CourseId,
    pub professor: ProfessorId,
    pub students: u32,
    /// Dense indices of sessions of other courses sharing a programme.
    pub siblings: Vec<Index>,
}

pub struct ModelBuilderContext<'a> {
    pub config: &'a TimetableConfig,
    pub ids: EntityIds,
    pub model: CpModelBuilder,
    pub vars: VariableRegistry,
    pub sessions: Vec<SessionFacts>,
    pub capacities: Vec<u32>,
    /// Dense session indices per course, in load order.
    pub course_sessions: BTreeMap<CourseId, Vec<Index>>,
    pub toggles: FamilyToggles,
    /// Sessions for which no block start fits in any day.
    pub overflowing: Vec<Index>,
    counts: BTreeMap<ConstraintFamily, usize>,
    labels: Vec<(Constraint, ConstraintLabel)>,
    busy: Vec<Option<BoolVar>>,
}

impl<'a> ModelBuilderContext<'a> {
    /// Resolves every fact the encoder needs and allocates the variables.
    pub fn new(provider: &impl DataProvider, config: &'a TimetableConfig) -> Result<Self> {
        Self::new_with_toggles(provider, config, FamilyToggles::all())
    }

    pub fn new_with_toggles(
        provider: &impl DataProvider,
        config: &'a TimetableConfig,
        toggles: FamilyToggles,
    ) -> Result<Self> {
        config.validate()?;
        let ids = provider.list_ids();

        let mut model = CpModelBuilder::default();
        let vars = VariableRegistry::allocate(
            &mut model,
            &ids.sessions,
            config.num_slots(),
            &ids.rooms,
            config.label_constraints,
        );
        debug!(
            "allocated {} literals for {} sessions x {} slots x {} rooms",
            vars.len(),
            ids.sessions.len(),
            config.num_slots(),
            ids.rooms.len()
        );

        let index_of = |owner: &str, session: SessionId| {
            vars.session_index(session).ok_or_else(|| {
                TimetableError::DataAccess(format!("{owner} refers to unknown session {session}"))
            })
        };

        let mut sessions = Vec::with_capacity(ids.sessions.len());
        for &s in &ids.sessions {
            let course = provider.course_of(s)?;
            let owner = format!("session {s}");
            let siblings = provider
                .conflicting_sessions(s)?
                .into_iter()
                .map(|other| index_of(&owner, other))
                .collect::<Result<Vec<_>>>()?;
            sessions.push(SessionFacts {
                id: s,
                hours: provider.hours_of(s)?,
                course,
                professor: provider.professor_of(s)?,
                students: provider.total_students(course)?,
                siblings,
            });
        }

        let mut course_sessions: BTreeMap<CourseId, Vec<Index>> = BTreeMap::new();
        for &course in &ids.courses {
            let owner = format!("course {course}");
            let members = provider
                .sessions_of(course)?
                .into_iter()
                .map(|s| index_of(&owner, s))
                .collect::<Result<Vec<_>>>()?;
            if !members.is_empty() {
                course_sessions.insert(course, members);
            }
        }

        let capacities = ids
            .rooms
            .iter()
            .map(|&r| provider.capacity_of(r))
            .collect::<Result<Vec<_>>>()?;

        let busy = vec![None; sessions.len() * config.num_slots() as usize];
        Ok(Self {
            config,
            ids,
            model,
            vars,
            sessions,
            capacities,
            course_sessions,
            toggles,
            overflowing: Vec::new(),
            counts: BTreeMap::new(),
            labels: Vec::new(),
            busy,
        })
    }

    pub fn num_slots(&self) -> u32 {
        self.config.num_slots()
    }

    pub fn num_rooms(&self) -> usize {
        self.ids.rooms.len()
    }

    /// Records a freshly asserted constraint under its label.
    pub fn track(&mut self, constraint: Constraint, label: ConstraintLabel) {
        *self.counts.entry(label.family).or_default() += 1;
        if self.config.label_constraints {
            self.model.set_constraint_name(constraint.clone(), &label.to_string());
            self.labels.push((constraint, label));
        }
    }

    /// Number of constraints asserted per family so far.
    pub fn counts(&self) -> &BTreeMap<ConstraintFamily, usize> {
        &self.counts
    }

    /// Labelled constraints, populated only when labelling is enabled.
    pub fn labels(&self) -> impl Iterator<Item = &ConstraintLabel> {
        self.labels.iter().map(|(_, label)| label)
    }

    /// Literal true exactly when session `s` occupies some room at `t`.
    /// Created on first use and defined by clauses over the occupancy row.
    /// The defining clauses are tracked under `family`, the first family to
    /// ask for the literal.
    pub fn busy(&mut self, s: Index, t: Timeslot, family: ConstraintFamily) -> BoolVar {
        let slot = s * self.num_slots() as usize + t as usize;
        if let Some(lit) = &self.busy[slot] {
            return lit.clone();
        }
        let lit = self.model.new_bool_var();
        let label = ConstraintLabel {
            family,
            tag: "busy",
            keys: vec![self.sessions[s].id, t],
        };
        let row: Vec<BoolVar> = (0..self.num_rooms()).map(|r| self.vars.occupied(s, t, r)).collect();
        for x in &row {
            let c = self.model.add_or([!x.clone(), lit.clone()]);
            self.track(c, label.clone());
        }
        let c = self.model.add_or(std::iter::once(!lit.clone()).chain(row));
        self.track(c, label);
        self.busy[slot] = Some(lit.clone());
        lit
    }

    pub fn log_counts(&self, stage: &str) {
        for (family, count) in &self.counts {
            debug!("[{stage}] {family}: {count} constraints");
        }
    }
}
