//! Boolean model of the weekly timetable and the two-pass solve driver.

mod model_conflicts;
mod model_context;
mod model_contiguity;
mod model_days;
mod model_rooms;
mod model_vars;
mod two_stage_schedule;

pub use model_context::{ConstraintFamily, ConstraintLabel, FamilyToggles, ModelBuilderContext, SessionFacts};
pub use model_vars::VariableRegistry;
pub use two_stage_schedule::*;

use model_conflicts::*;
use model_contiguity::*;
use model_days::*;
use model_rooms::*;

/// Asserts every base family (C1–C7) allowed by the context's toggles.
pub fn build_model_pipeline(ctx: &mut ModelBuilderContext<'_>) {
    add_room_exclusivity_constraints(ctx);
    add_single_room_constraints(ctx);
    add_contiguity_constraints(ctx);
    add_professor_constraints(ctx);
    add_programme_constraints(ctx);
    add_capacity_constraints(ctx);
    add_single_placement_constraints(ctx);
}
