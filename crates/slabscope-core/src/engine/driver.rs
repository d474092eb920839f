use super::analysis::{Analysis, FrameContext, StepOutcome};
use super::assembler::MoleculeAssembler;
use super::config::AnalysisConfig;
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::surface::SurfaceLocator;
use crate::core::io::traits::FrameSource;
use crate::core::models::system::MolecularSystem;
use tracing::{error, info, instrument, trace, warn};

/// Upper bound on the number of times analyses may restart the trajectory in one run.
pub const MAX_REWINDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverState {
    #[default]
    Initializing,
    LoadingFrame,
    Analyzing,
    Checkpointing,
    Rewinding,
    Terminal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames analysed in the final pass.
    pub timesteps: usize,
    /// Frames analysed over all passes.
    pub frames_analyzed: usize,
    pub passes: usize,
    pub reparses: usize,
    pub checkpoints: usize,
    /// The trajectory ended before the requested number of timesteps.
    pub truncated: bool,
}

/// Runs a set of analyses over every frame of a trajectory.
pub struct TimestepDriver<'a> {
    config: &'a AnalysisConfig,
    reporter: &'a ProgressReporter<'a>,
    assembler: MoleculeAssembler,
    locator: SurfaceLocator,
    state: DriverState,
}

impl<'a> TimestepDriver<'a> {
    pub fn new(config: &'a AnalysisConfig, reporter: &'a ProgressReporter<'a>) -> Self {
        Self {
            config,
            reporter,
            assembler: MoleculeAssembler::new(config.templates.clone(), config.bonds.clone()),
            locator: SurfaceLocator::new(config),
            state: DriverState::Initializing,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    fn transition(&mut self, next: DriverState) {
        trace!(from = ?self.state, to = ?next, "Driver state change.");
        self.state = next;
    }

    /// Processes the trajectory frame by frame until end of file or the configured
    /// number of timesteps.
    ///
    /// # Errors
    ///
    /// Any failure aborts the run at once: setup failures before the first frame,
    /// trajectory, topology and analysis failures with the timestep at which they
    /// occurred. Nothing is flushed after an analysis failure.
    #[instrument(skip_all, name = "timestep_driver")]
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        system: &mut MolecularSystem,
        analyses: &mut [Box<dyn Analysis + '_>],
    ) -> Result<RunSummary, EngineError> {
        self.transition(DriverState::Initializing);
        self.reporter.report(Progress::PhaseStart { name: "Setup" });
        for analysis in analyses.iter_mut() {
            analysis
                .setup(self.config)
                .map_err(|source| EngineError::Setup {
                    analysis: analysis.name(),
                    source,
                })?;
        }
        self.reporter.report(Progress::PhaseFinish);

        let target = self.config.system.timesteps;
        let checkpoint_interval = self.config.checkpoint_interval();
        let mut summary = RunSummary {
            passes: 1,
            ..Default::default()
        };
        let mut timestep = 0;
        let mut since_reparse = 0;
        let mut reparse_due = true;

        info!(
            analyses = analyses.len(),
            timesteps = ?target,
            "Starting trajectory analysis."
        );
        self.reporter.report(Progress::PhaseStart { name: "Analysis" });
        self.reporter.report(Progress::TaskStart {
            total_steps: target.unwrap_or(0) as u64,
        });

        loop {
            if target.is_some_and(|n| timestep >= n) {
                break;
            }

            self.transition(DriverState::LoadingFrame);
            let loaded = source
                .load_next(system)
                .map_err(|source| EngineError::Trajectory { timestep, source })?;
            if !loaded {
                if let Some(n) = target {
                    warn!(
                        requested = n,
                        read = timestep,
                        "Trajectory ended before the requested number of timesteps."
                    );
                    summary.truncated = true;
                    self.reporter.report(Progress::Message(format!(
                        "Trajectory ended after {timestep} of {n} requested timesteps"
                    )));
                }
                break;
            }

            if reparse_due || since_reparse >= self.config.reparse_interval {
                self.assembler
                    .reparse(system)
                    .and_then(|report| report.ensure_complete())
                    .map_err(|source| EngineError::Topology { timestep, source })?;
                summary.reparses += 1;
                since_reparse = 0;
                reparse_due = false;
            }
            since_reparse += 1;

            self.transition(DriverState::Analyzing);
            let outcome = self.analyze_frame(system, analyses, timestep, summary.passes - 1)?;
            summary.frames_analyzed += 1;
            self.reporter.report(Progress::TaskIncrement);

            if outcome == StepOutcome::Rewind {
                self.transition(DriverState::Rewinding);
                if summary.passes > MAX_REWINDS {
                    return Err(EngineError::RewindLimit { limit: MAX_REWINDS });
                }
                source
                    .rewind()
                    .map_err(|source| EngineError::Trajectory { timestep, source })?;
                summary.passes += 1;
                timestep = 0;
                reparse_due = true;
                info!(pass = summary.passes, "Rewinding trajectory for another pass.");
                self.reporter.report(Progress::TaskFinish);
                self.reporter.report(Progress::Rewind {
                    pass: summary.passes,
                });
                self.reporter.report(Progress::TaskStart {
                    total_steps: target.unwrap_or(0) as u64,
                });
                continue;
            }

            self.transition(DriverState::Checkpointing);
            if timestep != 0 && timestep % checkpoint_interval == 0 {
                Self::flush_all(analyses)?;
                summary.checkpoints += 1;
                self.reporter.report(Progress::Checkpoint { timestep });
            }
            timestep += 1;
        }

        self.transition(DriverState::Terminal);
        self.reporter.report(Progress::TaskFinish);
        Self::flush_all(analyses)?;
        for analysis in analyses.iter_mut() {
            analysis
                .post_process()
                .map_err(|source| EngineError::Output {
                    analysis: analysis.name(),
                    source,
                })?;
        }
        self.reporter.report(Progress::PhaseFinish);

        summary.timesteps = timestep;
        info!(
            timesteps = summary.timesteps,
            passes = summary.passes,
            reparses = summary.reparses,
            "Trajectory analysis complete."
        );
        Ok(summary)
    }

    fn analyze_frame(
        &self,
        system: &MolecularSystem,
        analyses: &mut [Box<dyn Analysis + '_>],
        timestep: usize,
        pass: usize,
    ) -> Result<StepOutcome, EngineError> {
        let ctx = FrameContext::new(system, self.config, &self.locator, timestep, pass);
        let mut outcome = StepOutcome::Continue;
        for analysis in analyses.iter_mut() {
            match analysis.analyze(&ctx) {
                Ok(StepOutcome::Rewind) => outcome = StepOutcome::Rewind,
                Ok(StepOutcome::Continue) => {}
                Err(source) => {
                    error!(timestep, analysis = analysis.name(), "{source}");
                    return Err(EngineError::Analysis {
                        timestep,
                        analysis: analysis.name(),
                        source,
                    });
                }
            }
        }
        Ok(outcome)
    }

    fn flush_all(analyses: &mut [Box<dyn Analysis + '_>]) -> Result<(), EngineError> {
        for analysis in analyses.iter_mut() {
            analysis.flush().map_err(|source| EngineError::Output {
                analysis: analysis.name(),
                source,
            })?;
        }
        Ok(())
    }
}
