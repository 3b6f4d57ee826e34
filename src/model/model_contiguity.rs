//! Temporal structure of a session: contiguous same-room blocks (C2) and
//! exactly one block per session (C6).
use cp_sat::builder::BoolVar;
use log::warn;

use super::model_context::{ConstraintFamily, ConstraintLabel, ModelBuilderContext};

/// C2: a block start is legal only when its whole window fits in one day on
/// available slots; a legal start occupies every slot of its window in the
/// same room, and every occupied cell is covered by some legal start.
///
/// Sessions with no legal start anywhere are recorded in `ctx.overflowing`.
pub fn add_contiguity_constraints(ctx: &mut ModelBuilderContext<'_>) {
    let config = ctx.config;
    let num_slots = ctx.num_slots();
    for s in 0..ctx.sessions.len() {
        let (session, hours) = (ctx.sessions[s].id, ctx.sessions[s].hours);
        let legal: Vec<bool> = (0..num_slots).map(|t| config.window_fits(t, hours)).collect();
        if !legal.iter().any(|&ok| ok) {
            warn!(
                "session {session} needs {hours} contiguous slots, no day has room for it"
            );
            ctx.overflowing.push(s);
        }

        for r in 0..ctx.num_rooms() {
            let room = ctx.ids.rooms[r];
            for t in 0..num_slots {
                let start = ctx.vars.starts(s, t, r);
                if !legal[t as usize] {
                    let c = ctx.model.add_and([!start]);
                    ctx.track(
                        c,
                        ConstraintLabel {
                            family: ConstraintFamily::Contiguity,
                            tag: "unfit",
                            keys: vec![session, t, room],
                        },
                    );
                } else {
                    for k in 0..hours {
                        let cell = ctx.vars.occupied(s, t + k, r);
                        let c = ctx.model.add_or([!start.clone(), cell]);
                        ctx.track(
                            c,
                            ConstraintLabel {
                                family: ConstraintFamily::Contiguity,
                                tag: "fit",
                                keys: vec![session, t, room],
                            },
                        );
                    }
                }

                // The cell at t must belong to a block starting in (t - hours, t].
                let first = (t + 1).saturating_sub(hours);
                let covering: Vec<BoolVar> = (first..=t)
                    .filter(|&t0| legal[t0 as usize])
                    .map(|t0| ctx.vars.starts(s, t0, r))
                    .collect();
                let cell = ctx.vars.occupied(s, t, r);
                let c = if covering.is_empty() {
                    ctx.model.add_and([!cell])
                } else {
                    ctx.model.add_or(std::iter::once(!cell).chain(covering))
                };
                ctx.track(
                    c,
                    ConstraintLabel {
                        family: ConstraintFamily::Contiguity,
                        tag: "cover",
                        keys: vec![session, t, room],
                    },
                );
            }
        }
    }
}

/// C6: exactly one block start per session, as an at-most-one /
/// at-least-one pair over all of the session's start literals.
pub fn add_single_placement_constraints(ctx: &mut ModelBuilderContext<'_>) {
    for s in 0..ctx.sessions.len() {
        let session = ctx.sessions[s].id;
        let mut starts: Vec<BoolVar> = Vec::with_capacity(ctx.num_slots() as usize * ctx.num_rooms());
        for t in 0..ctx.num_slots() {
            for r in 0..ctx.num_rooms() {
                starts.push(ctx.vars.starts(s, t, r));
            }
        }

        let c = ctx.model.add_at_most_one(starts.clone());
        ctx.track(
            c,
            ConstraintLabel {
                family: ConstraintFamily::SinglePlacement,
                tag: "amo",
                keys: vec![session],
            },
        );
        let c = ctx.model.add_or(starts);
        ctx.track(
            c,
            ConstraintLabel {
                family: ConstraintFamily::SinglePlacement,
                tag: "alo",
                keys: vec![session],
            },
        );
    }
}
