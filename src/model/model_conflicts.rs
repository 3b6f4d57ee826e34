//! People-side constraints: a professor teaches one session at a time (C3)
//! and sessions of courses sharing a programme never overlap (C4).
use std::collections::{BTreeMap, BTreeSet};

use cp_sat::builder::BoolVar;

use super::model_context::{ConstraintFamily, ConstraintLabel, ModelBuilderContext};
use super::model_vars::Index;
use crate::data::ProfessorId;

/// C3: among all sessions taught by the same professor, at most one is busy
/// (in any room) at each timeslot.
pub fn add_professor_constraints(ctx: &mut ModelBuilderContext<'_>) {
    if !ctx.toggles.enabled(ConstraintFamily::ProfessorExclusivity) {
        return;
    }
    let mut by_professor: BTreeMap<ProfessorId, Vec<Index>> = BTreeMap::new();
    for (s, facts) in ctx.sessions.iter().enumerate() {
        by_professor.entry(facts.professor).or_default().push(s);
    }
    for (professor, sessions) in by_professor {
        if sessions.len() < 2 {
            continue;
        }
        for t in 0..ctx.num_slots() {
            let busy: Vec<BoolVar> = sessions
                .iter()
                .map(|&s| ctx.busy(s, t, ConstraintFamily::ProfessorExclusivity))
                .collect();
            let c = ctx.model.add_at_most_one(busy);
            ctx.track(
                c,
                ConstraintLabel {
                    family: ConstraintFamily::ProfessorExclusivity,
                    tag: "",
                    keys: vec![professor, t],
                },
            );
        }
    }
}

/// C4: a session and any sibling session (other course, shared programme)
/// are never busy at the same timeslot.
pub fn add_programme_constraints(ctx: &mut ModelBuilderContext<'_>) {
    if !ctx.toggles.enabled(ConstraintFamily::ProgrammeConflict) {
        return;
    }
    let pairs: BTreeSet<(Index, Index)> = ctx
        .sessions
        .iter()
        .enumerate()
        .flat_map(|(s, facts)| {
            facts
                .siblings
                .iter()
                .filter(move |&&other| other != s)
                .map(move |&other| (s.min(other), s.max(other)))
        })
        .collect();

    for (a, b) in pairs {
        let (id_a, id_b) = (ctx.sessions[a].id, ctx.sessions[b].id);
        for t in 0..ctx.num_slots() {
            let busy_a = ctx.busy(a, t, ConstraintFamily::ProgrammeConflict);
            let busy_b = ctx.busy(b, t, ConstraintFamily::ProgrammeConflict);
            let c = ctx.model.add_or([!busy_a, !busy_b]);
            ctx.track(
                c,
                ConstraintLabel {
                    family: ConstraintFamily::ProgrammeConflict,
                    tag: "",
                    keys: vec![id_a, id_b, t],
                },
            );
        }
    }
}
