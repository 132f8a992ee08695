//! Experiment runner: one reproducible trial per call.
//!
//! A trial builds a fresh [`TrialContext`], wires the scenario around the
//! model, drives arrivals until every request is answered, reduces the
//! recording to [`SlimRow`]s and writes them to
//! `<output_dir>/<model>-<trial>-<scenario>.csv` (plus `.json` when enabled).
//! A trial that aborts still exports whatever was recorded.

use std::cell::Cell;
use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use des_core::{trial_span, Executor, SimError, SimTime};
use des_metrics::{export_csv, export_json, reduce, SlimRow};

use crate::config::RunnerConfig;
use crate::context::TrialContext;
use crate::error::ExperimentError;
use crate::injectors::InjectorKind;
use crate::models::ModelKind;
use crate::scenario::{self, Pipeline, Throttle};

/// File stem of a trial's output, `<model>-<trial>-<scenario>`.
pub fn trial_name(model: ModelKind, trial: u32, scenario: &str) -> String {
    format!("{}-{}-{}", model.id(), trial, scenario)
}

/// Result of simulating one trial, before export.
pub struct TrialRun {
    pub name: String,
    pub rows: Vec<SlimRow>,
    pub final_time: SimTime,
    /// The abort that ended the trial early, if any.
    pub aborted: Option<SimError>,
    /// Whether the clock stopped below the expected minimum.
    pub short: bool,
    pub context: TrialContext,
    pub pipeline: Pipeline,
}

/// An exported trial.
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    pub name: String,
    pub rows: usize,
    pub final_time: SimTime,
    pub aborted: bool,
    pub short: bool,
    pub csv_path: PathBuf,
    pub json_path: Option<PathBuf>,
}

pub struct ExperimentRunner {
    config: RunnerConfig,
}

impl ExperimentRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Build a trial's pipeline without running it.
    pub fn prepare(
        &self,
        model: ModelKind,
        injector: InjectorKind,
        params: &[f64],
        trial: u32,
    ) -> Result<(TrialContext, Pipeline, Option<Throttle>), ExperimentError> {
        let plan = injector.plan(params, self.config.tick_dilation)?;
        let mut ctx = TrialContext::new(&self.config, self.config.trial_seed(trial));
        let pipeline = scenario::build(
            &mut ctx,
            &plan,
            model,
            self.config.arrivals,
            self.config.watchdog(),
        );
        Ok((ctx, pipeline, plan.throttle_for(model)))
    }

    /// Run one trial to completion and reduce its recording.
    pub fn simulate(
        &self,
        model: ModelKind,
        injector: InjectorKind,
        params: &[f64],
        trial: u32,
    ) -> Result<TrialRun, ExperimentError> {
        let name = trial_name(model, trial, injector.scenario_name());
        let span = trial_span(model.id(), trial, injector.scenario_name());
        let _guard = span.enter();

        let (mut ctx, pipeline, throttle) = self.prepare(model, injector, params, trial)?;
        info!(%name, seed = self.config.trial_seed(trial), "Starting trial");

        let result = match throttle {
            Some(throttle) => {
                let steps = Cell::new(0u64);
                ctx.sim.try_execute(Executor::unbound().side_effect(|_| {
                    steps.set(steps.get() + 1);
                    if steps.get() % throttle.every_steps == 0 {
                        std::thread::sleep(throttle.pause);
                    }
                }))
            }
            None => ctx.sim.try_execute(Executor::unbound()),
        };
        let aborted = result.err();
        if let Some(err) = &aborted {
            warn!(%name, %err, "Caught simulation abort");
        }

        let final_time = ctx.sim.time();
        info!(%name, %final_time, "Experiment finished");
        let short = final_time.as_ticks_f64() < self.config.expected_min_ticks;
        if short {
            warn!(%name, %final_time, "SHORT {name}");
        }

        let rows = reduce(&ctx.recorder.snapshot());
        Ok(TrialRun {
            name,
            rows,
            final_time,
            aborted,
            short,
            context: ctx,
            pipeline,
        })
    }

    /// Run one trial and export its rows.
    pub fn run_trial(
        &self,
        model: ModelKind,
        injector: InjectorKind,
        params: &[f64],
        trial: u32,
    ) -> Result<TrialOutcome, ExperimentError> {
        let run = self.simulate(model, injector, params, trial)?;

        fs::create_dir_all(&self.config.output_dir)?;
        let csv_path = self.config.output_dir.join(format!("{}.csv", run.name));
        export_csv(&run.rows, &csv_path)?;
        let json_path = if self.config.export_json {
            let path = self.config.output_dir.join(format!("{}.json", run.name));
            export_json(&run.rows, &path, true)?;
            Some(path)
        } else {
            None
        };
        info!(name = %run.name, rows = run.rows.len(), path = %csv_path.display(), "Exported rows");

        Ok(TrialOutcome {
            name: run.name,
            rows: run.rows.len(),
            final_time: run.final_time,
            aborted: run.aborted.is_some(),
            short: run.short,
            csv_path,
            json_path,
        })
    }

    /// Run `trials` trials, numbered from zero.
    pub fn run_batch(
        &self,
        model: ModelKind,
        injector: InjectorKind,
        params: &[f64],
        trials: u32,
    ) -> Result<Vec<TrialOutcome>, ExperimentError> {
        (0..trials)
            .map(|trial| self.run_trial(model, injector, params, trial))
            .collect()
    }
}
