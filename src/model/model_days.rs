//! Tightening family used by the improvement pass.
use cp_sat::builder::BoolVar;

use super::model_context::{ConstraintFamily, ConstraintLabel, ModelBuilderContext};

/// C8: for every course and every day, at most one of the course's sessions
/// starts a block that day, so a course is not split into several blocks on
/// the same day.
pub fn add_course_day_constraints(ctx: &mut ModelBuilderContext<'_>) {
    let config = ctx.config;
    let groups: Vec<(u32, Vec<usize>)> = ctx
        .course_sessions
        .iter()
        .filter(|(_, sessions)| sessions.len() > 1)
        .map(|(&course, sessions)| (course, sessions.clone()))
        .collect();

    for (course, sessions) in groups {
        for day in 0..config.days {
            let first = day * config.slots_per_day;
            let mut starts: Vec<BoolVar> = Vec::new();
            for &s in &sessions {
                for t in first..first + config.slots_per_day {
                    if !config.window_fits(t, ctx.sessions[s].hours) {
                        continue;
                    }
                    for r in 0..ctx.num_rooms() {
                        starts.push(ctx.vars.starts(s, t, r));
                    }
                }
            }
            if starts.len() < 2 {
                continue;
            }
            let c = ctx.model.add_at_most_one(starts);
            ctx.track(
                c,
                ConstraintLabel {
                    family: ConstraintFamily::CourseDaySpread,
                    tag: "",
                    keys: vec![course, day],
                },
            );
        }
    }
}
