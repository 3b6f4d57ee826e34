use std::time::Instant;

use cp_sat::proto::{CpSolverResponse, CpSolverStatus, SatParameters};
use log::{info, warn};

use super::model_context::{ConstraintFamily, FamilyToggles, ModelBuilderContext};
use super::{add_course_day_constraints, build_model_pipeline};
use crate::config::TimetableConfig;
use crate::data::DataProvider;
use crate::error::{Result, SolvePass, TimetableError};
use crate::schedule::{Schedule, ScheduleStore};

/// What became of the opportunistic second pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImprovementOutcome {
    /// The tightened model was satisfiable; its schedule replaced the first one.
    Applied,
    /// The tightened model was unsatisfiable; the first-pass schedule stands.
    Unavailable,
    /// The second check ran out of budget; the first-pass schedule stands.
    TimedOut,
    /// Disabled by configuration.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct SolveReport {
    /// The schedule that was persisted last.
    pub schedule: Schedule,
    pub first_pass_entries: usize,
    pub improvement: ImprovementOutcome,
    pub seconds: f64,
}

fn solver_parameters(config: &TimetableConfig) -> SatParameters {
    let mut params = SatParameters::default();
    params.max_time_in_seconds = Some(config.time_limit_secs);
    params.max_deterministic_time = Some(config.time_limit_secs);
    params.num_search_workers = Some(config.workers);
    params.random_seed = Some(config.random_seed);
    params.log_search_progress = Some(false);
    params
}

enum Verdict {
    Sat(CpSolverResponse),
    Unsat,
    Unknown,
}

fn check(ctx: &ModelBuilderContext<'_>, params: &SatParameters) -> Result<Verdict> {
    let response = ctx.model.solve_with_parameters(params);
    match response.status() {
        CpSolverStatus::Optimal | CpSolverStatus::Feasible => Ok(Verdict::Sat(response)),
        CpSolverStatus::Infeasible => Ok(Verdict::Unsat),
        CpSolverStatus::Unknown => Ok(Verdict::Unknown),
        CpSolverStatus::ModelInvalid => Err(TimetableError::ModelInvalid(format!(
            "{:?} with {} literals",
            response.status(),
            ctx.vars.len()
        ))),
    }
}

/// Entry point of a run: nothing is loaded yet.
pub struct Timetabler<'a, P: DataProvider> {
    provider: &'a P,
    config: &'a TimetableConfig,
}

/// Variables allocated and every fact resolved; no constraint asserted.
pub struct LoadedModel<'a, P: DataProvider> {
    provider: &'a P,
    ctx: ModelBuilderContext<'a>,
}

/// All base families asserted; ready to solve.
pub struct EncodedModel<'a, P: DataProvider> {
    provider: &'a P,
    ctx: ModelBuilderContext<'a>,
}

impl<'a, P: DataProvider> Timetabler<'a, P> {
    pub fn new(provider: &'a P, config: &'a TimetableConfig) -> Self {
        Self { provider, config }
    }

    pub fn load(self) -> Result<LoadedModel<'a, P>> {
        let ctx = ModelBuilderContext::new(self.provider, self.config)?;
        Ok(LoadedModel { provider: self.provider, ctx })
    }
}

impl<'a, P: DataProvider> LoadedModel<'a, P> {
    pub fn encode(mut self) -> EncodedModel<'a, P> {
        build_model_pipeline(&mut self.ctx);
        self.ctx.log_counts("encode");
        EncodedModel { provider: self.provider, ctx: self.ctx }
    }
}

impl<'a, P: DataProvider> EncodedModel<'a, P> {
    pub fn context(&self) -> &ModelBuilderContext<'a> {
        &self.ctx
    }

    /// Feasibility pass, then the opportunistic tightening pass over the same
    /// model. Only a satisfying assignment is ever written to `store`, and a
    /// failed second pass leaves the first one in place.
    pub fn solve(mut self, store: &mut impl ScheduleStore) -> Result<SolveReport> {
        let started = Instant::now();
        let config = self.ctx.config;

        if let Some(&s) = self.ctx.overflowing.first() {
            let facts = &self.ctx.sessions[s];
            return Err(TimetableError::SessionTooLong {
                session: facts.id,
                hours: facts.hours,
                longest_window: config.longest_window(),
            });
        }

        let params = solver_parameters(config);
        let response = match check(&self.ctx, &params)? {
            Verdict::Sat(response) => response,
            Verdict::Unsat => {
                info!("TIME TABLE FAILED: model is unsatisfiable");
                let conflicting = if config.diagnose {
                    diagnose_infeasibility(self.provider, config)?
                } else {
                    Vec::new()
                };
                return Err(TimetableError::Infeasible { conflicting });
            }
            Verdict::Unknown => {
                return Err(TimetableError::Timeout {
                    pass: SolvePass::Feasibility,
                    seconds: started.elapsed().as_secs_f64(),
                });
            }
        };

        let mut schedule = Schedule::from_cells(self.ctx.vars.occupied_cells(&response));
        schedule.persist(store)?;
        let first_pass_entries = schedule.len();
        info!(
            "TIME TABLE SUCCESSFULLY CREATED: {} entries after {:.2}s",
            first_pass_entries,
            started.elapsed().as_secs_f64()
        );

        let improvement = if !config.improve {
            ImprovementOutcome::Skipped
        } else {
            add_course_day_constraints(&mut self.ctx);
            self.ctx.log_counts("improve");
            let pass_started = Instant::now();
            match check(&self.ctx, &params)? {
                Verdict::Sat(response) => {
                    let improved = Schedule::from_cells(self.ctx.vars.occupied_cells(&response));
                    improved.persist(store)?;
                    schedule = improved;
                    info!("improvement pass applied: one block per course per day");
                    ImprovementOutcome::Applied
                }
                Verdict::Unsat => {
                    info!("improvement pass unsatisfiable, keeping the first schedule");
                    ImprovementOutcome::Unavailable
                }
                Verdict::Unknown => {
                    warn!(
                        "improvement pass timed out after {:.2}s, keeping the first schedule",
                        pass_started.elapsed().as_secs_f64()
                    );
                    ImprovementOutcome::TimedOut
                }
            }
        };

        Ok(SolveReport {
            schedule,
            first_pass_entries,
            improvement,
            seconds: started.elapsed().as_secs_f64(),
        })
    }
}

/// Load, encode and solve in one call.
pub fn two_stage_schedule<P: DataProvider>(
    provider: &P,
    config: &TimetableConfig,
    store: &mut impl ScheduleStore,
) -> Result<SolveReport> {
    Timetabler::new(provider, config).load()?.encode().solve(store)
}

/// Rebuilds the model once per relaxable family with that family switched
/// off, and returns the labels of the families whose removal makes the
/// instance satisfiable.
pub fn diagnose_infeasibility<P: DataProvider>(
    provider: &P,
    config: &TimetableConfig,
) -> Result<Vec<String>> {
    let params = solver_parameters(config);
    let mut responsible = Vec::new();
    for family in ConstraintFamily::RELAXABLE {
        let mut ctx = ModelBuilderContext::new_with_toggles(provider, config, FamilyToggles::without(family))?;
        build_model_pipeline(&mut ctx);
        let verdict = check(&ctx, &params)?;
        let status = match verdict {
            Verdict::Sat(_) => "sat",
            Verdict::Unsat => "unsat",
            Verdict::Unknown => "unknown",
        };
        info!("[DIAG] without {family} => {status}");
        if let Verdict::Sat(_) = verdict {
            responsible.push(family.to_string());
        }
    }
    Ok(responsible)
}
