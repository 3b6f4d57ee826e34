//! Room-side constraints: exclusivity of a room per slot (C1), one room per
//! session per slot (C7) and room capacity (C5).
use cp_sat::builder::BoolVar;

use super::model_context::{ConstraintFamily, ConstraintLabel, ModelBuilderContext};

/// C1: at most one session in a given room at a given timeslot.
pub fn add_room_exclusivity_constraints(ctx: &mut ModelBuilderContext<'_>) {
    if !ctx.toggles.enabled(ConstraintFamily::RoomExclusivity) || ctx.sessions.len() < 2 {
        return;
    }
    for t in 0..ctx.num_slots() {
        for r in 0..ctx.num_rooms() {
            let column: Vec<BoolVar> = (0..ctx.sessions.len())
                .map(|s| ctx.vars.occupied(s, t, r))
                .collect();
            let c = ctx.model.add_at_most_one(column);
            let room = ctx.ids.rooms[r];
            ctx.track(
                c,
                ConstraintLabel {
                    family: ConstraintFamily::RoomExclusivity,
                    tag: "",
                    keys: vec![t, room],
                },
            );
        }
    }
}

/// C7: a session occupies at most one room at a given timeslot.
pub fn add_single_room_constraints(ctx: &mut ModelBuilderContext<'_>) {
    if !ctx.toggles.enabled(ConstraintFamily::SingleRoom) || ctx.num_rooms() < 2 {
        return;
    }
    for s in 0..ctx.sessions.len() {
        for t in 0..ctx.num_slots() {
            let row: Vec<BoolVar> = (0..ctx.num_rooms())
                .map(|r| ctx.vars.occupied(s, t, r))
                .collect();
            let c = ctx.model.add_at_most_one(row);
            let session = ctx.sessions[s].id;
            ctx.track(
                c,
                ConstraintLabel {
                    family: ConstraintFamily::SingleRoom,
                    tag: "",
                    keys: vec![session, t],
                },
            );
        }
    }
}

/// C5: a session may only use rooms holding every enrolled student of its
/// course (`students <= capacity`). Rooms that are too small are closed to
/// the session for the whole week.
pub fn add_capacity_constraints(ctx: &mut ModelBuilderContext<'_>) {
    if !ctx.toggles.enabled(ConstraintFamily::Capacity) {
        return;
    }
    for s in 0..ctx.sessions.len() {
        let students = ctx.sessions[s].students;
        for r in 0..ctx.num_rooms() {
            if students <= ctx.capacities[r] {
                continue;
            }
            let closed: Vec<BoolVar> = (0..ctx.num_slots())
                .map(|t| !ctx.vars.occupied(s, t, r))
                .collect();
            let c = ctx.model.add_and(closed);
            let (session, room) = (ctx.sessions[s].id, ctx.ids.rooms[r]);
            ctx.track(
                c,
                ConstraintLabel {
                    family: ConstraintFamily::Capacity,
                    tag: "",
                    keys: vec![session, room],
                },
            );
        }
    }
}
