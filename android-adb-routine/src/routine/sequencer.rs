// Stage sequencer: strings matches and taps into rounds
use super::plan::{PlanStep, SequencePlan, Stage};
use super::types::{PlanOutcome, RoutineState, RoutineStatus};
use crate::adb::{CaptureProvider, DeviceController};
use crate::config::RunConfig;
use crate::template_matching::{MatchResult, Point, TemplateMatcher, TemplateStore};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Pause after tapping a matched template, giving the UI time to react.
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Mutable state of one run.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Result of the most recent match call
    pub last_match: MatchResult,
    /// Rounds started so far
    pub round: u32,
    pub cancel: CancellationToken,
}

pub struct StageSequencer<'a, S, C, D> {
    matcher: TemplateMatcher<'a, S, C>,
    device: &'a D,
    config: RunConfig,
    state: RoutineState,
    run_state: RunState,
    transitions: Vec<RoutineState>,
    status_tx: watch::Sender<RoutineStatus>,
}

impl<'a, S, C, D> StageSequencer<'a, S, C, D>
where
    S: TemplateStore,
    C: CaptureProvider,
    D: DeviceController,
{
    pub fn new(
        store: &'a S,
        capture: &'a C,
        device: &'a D,
        config: RunConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (status_tx, _) = watch::channel(RoutineStatus::default());
        Self {
            matcher: TemplateMatcher::new(store, capture),
            device,
            config,
            state: RoutineState::Idle,
            run_state: RunState {
                last_match: MatchResult::default(),
                round: 0,
                cancel,
            },
            transitions: Vec::new(),
            status_tx,
        }
    }

    /// Follow state and round changes from another task.
    pub fn subscribe(&self) -> watch::Receiver<RoutineStatus> {
        self.status_tx.subscribe()
    }

    pub fn state(&self) -> RoutineState {
        self.state
    }

    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    /// Every state entered since construction, in order.
    pub fn transitions(&self) -> &[RoutineState] {
        &self.transitions
    }

    fn change_state(&mut self, new_state: RoutineState) {
        if self.state != new_state {
            log::debug!("🎮 Routine state: {:?} -> {:?}", self.state, new_state);
            self.state = new_state;
            self.transitions.push(new_state);
            self.publish();
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(RoutineStatus {
            state: self.state,
            round: self.run_state.round,
        });
    }

    /// Play `plan` round after round until the round limit is reached or
    /// cancellation is seen at a polling point.
    ///
    /// Returns why the run ended (`Cancelled` or `RoundLimitReached`); the
    /// sequencer itself is `Stopped` afterwards.
    pub async fn run(&mut self, plan: &SequencePlan) -> RoutineState {
        log::info!(
            "🚀 Running '{}' on {} (threshold {:.2}, up to {} rounds)",
            plan.name,
            self.config.device_id,
            self.config.threshold,
            self.config.round_limit
        );
        self.change_state(RoutineState::Running);

        let end = loop {
            if self.run_state.round >= self.config.round_limit {
                log::info!("🏁 Round limit {} reached", self.config.round_limit);
                break RoutineState::RoundLimitReached;
            }
            if self.run_state.cancel.is_cancelled() {
                log::info!("⏹️ Cancelled before round {}", self.run_state.round + 1);
                break RoutineState::Cancelled;
            }

            self.run_state.round += 1;
            self.publish();
            log::info!("===== Round {} =====", self.run_state.round);

            if self.run_plan(plan).await == PlanOutcome::Cancelled {
                break RoutineState::Cancelled;
            }
        };

        self.change_state(end);
        self.change_state(RoutineState::Stopped);
        log::info!(
            "🛑 Routine stopped after {} rounds ({end:?})",
            self.run_state.round
        );
        end
    }

    /// Execute every step of `plan` once.
    pub async fn run_plan(&mut self, plan: &SequencePlan) -> PlanOutcome {
        self.run_steps(&plan.steps).await
    }

    async fn run_steps(&mut self, steps: &[PlanStep]) -> PlanOutcome {
        for step in steps {
            match step {
                PlanStep::Stage(stage) => {
                    self.run_stage(stage).await;
                }
                PlanStep::Taps { points, pause } => {
                    let pause = pause.resolve(&self.config);
                    for point in points {
                        self.tap(*point).await;
                        sleep(pause).await;
                    }
                }
                PlanStep::TapFound {
                    stage,
                    count,
                    pause,
                } => {
                    let found = self
                        .detect(stage)
                        .await
                        .into_iter()
                        .find_map(|result| result.position());
                    match found {
                        Some(point) => {
                            let pause = pause.resolve(&self.config);
                            for i in 1..=*count {
                                log::info!("👆 {} tap {i}/{count}", stage.name);
                                self.tap(point).await;
                                sleep(pause).await;
                            }
                        }
                        None => log::info!("⏭️ {} not found, skipping taps", stage.name),
                    }
                }
                PlanStep::Swipe {
                    from,
                    to,
                    duration_ms,
                    pause,
                } => {
                    let duration = Duration::from_millis(*duration_ms);
                    match self
                        .device
                        .swipe(from.x, from.y, to.x, to.y, duration)
                        .await
                    {
                        Ok(()) => log::info!("👉 Swipe {from} -> {to} ({duration_ms}ms)"),
                        Err(e) => log::warn!("❌ Swipe {from} -> {to} failed: {e}"),
                    }
                    sleep(pause.resolve(&self.config)).await;
                }
                PlanStep::Repeat { times, steps } => {
                    for i in 0..*times {
                        if self.run_state.cancel.is_cancelled() {
                            log::info!("⏹️ Cancelled before repetition {}/{times}", i + 1);
                            return PlanOutcome::Cancelled;
                        }
                        if Box::pin(self.run_steps(steps)).await == PlanOutcome::Cancelled {
                            return PlanOutcome::Cancelled;
                        }
                        log::info!("🔁 Repetition {}/{times} done", i + 1);
                    }
                }
                PlanStep::Wait { pause } => {
                    sleep(pause.resolve(&self.config)).await;
                }
            }
        }
        PlanOutcome::Completed
    }

    /// Match every template of `stage` in order, tapping each hit when the
    /// stage acts on matches. One result per template.
    pub async fn run_stage(&mut self, stage: &Stage) -> Vec<MatchResult> {
        self.match_stage(stage, stage.act_on_match).await
    }

    /// Match every template of `stage` without dispatching anything.
    pub async fn detect(&mut self, stage: &Stage) -> Vec<MatchResult> {
        self.match_stage(stage, false).await
    }

    async fn match_stage(&mut self, stage: &Stage, act: bool) -> Vec<MatchResult> {
        log::info!("===== Stage {} =====", stage.name);
        let policy = self.config.match_policy();
        let mut results = Vec::with_capacity(stage.templates.len());

        for name in &stage.templates {
            let result = self.matcher.find(name, &policy).await;
            self.run_state.last_match = result;

            match result.position() {
                Some(point) if act => {
                    self.tap(point).await;
                    sleep(SETTLE_DELAY).await;
                }
                Some(_) => {}
                None => log::info!("⏭️ Skipping {name} (no valid position)"),
            }
            results.push(result);
        }
        results
    }

    /// Dispatch failures are logged and otherwise ignored.
    async fn tap(&self, point: Point) {
        match self.device.tap(point.x, point.y).await {
            Ok(()) => log::info!("👆 Tap {point}"),
            Err(e) => log::warn!("❌ Tap {point} failed: {e}"),
        }
    }
}
