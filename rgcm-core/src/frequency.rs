//! Piecewise-constant coupling.
//!
//! Expensive components such as radiative transfer can run less often than the
//! host model steps. A wrapper calls its component on the first call and then
//! every `period` calls. In between it returns a clone of the last result
//! without looking at the inputs, so the replayed arrays are identical to the
//! computed ones.
//!
//! ```rust
//! use rgcm_core::frequency::ResultCache;
//!
//! let mut cache = ResultCache::new(3).unwrap();
//! let mut computed = 0;
//! for _ in 0..6 {
//!     cache
//!         .call(|| {
//!             computed += 1;
//!             Ok(computed)
//!         })
//!         .unwrap();
//! }
//! assert_eq!(computed, 2);
//! ```

use crate::component::{
    Component, DiagnosticComponent, ImplicitComponent, ImplicitOutput, PrognosticComponent,
    PrognosticOutput, RequirementDefinition,
};
use crate::errors::{RGCMError, RGCMResult};
use crate::state::{InputState, OutputState};
use crate::Time;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Call counter and last result of a piecewise-constant component.
///
/// The cached result is not serialized. A deserialized cache recomputes on
/// its next call and then follows its counter as before.
///
/// Calls since the last [`commit`](ResultCache::commit) can be undone with
/// [`rollback`](ResultCache::rollback).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultCache<R> {
    period: usize,
    counter: usize,
    #[serde(skip)]
    last: Option<R>,
    #[serde(skip)]
    undo: Option<Undo<R>>,
}

/// What a cache looked like at its last commit.
#[derive(Debug, Clone)]
struct Undo<R> {
    counter: usize,
    /// Set once a refresh has replaced the committed result.
    last: Option<Option<R>>,
}

impl<R: Clone> ResultCache<R> {
    /// # Errors
    ///
    /// [`RGCMError::InvalidConfiguration`] if `period` is zero.
    pub fn new(period: usize) -> RGCMResult<Self> {
        if period == 0 {
            return Err(RGCMError::InvalidConfiguration(
                "piecewise-constant period must be at least one call".to_string(),
            ));
        }
        Ok(Self {
            period,
            counter: 0,
            last: None,
            undo: None,
        })
    }

    /// A cache refreshing once per `duration` of model time.
    ///
    /// `duration` must be a positive whole multiple of `time_step`.
    pub fn from_duration(duration: Time, time_step: Time) -> RGCMResult<Self> {
        if !(time_step > 0.0 && duration > 0.0) {
            return Err(RGCMError::InvalidConfiguration(format!(
                "duration {duration} s and time step {time_step} s must both be positive"
            )));
        }
        let ratio = duration / time_step;
        let period = ratio.round();
        if (ratio - period).abs() > 1e-9 * ratio.max(1.0) {
            return Err(RGCMError::InvalidConfiguration(format!(
                "duration {duration} s is not a whole multiple of the time step {time_step} s"
            )));
        }
        Self::new(period as usize)
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Number of calls made so far.
    pub fn counter(&self) -> usize {
        self.counter
    }

    /// Whether the next call will compute rather than replay.
    pub fn is_due(&self) -> bool {
        self.last.is_none() || self.counter % self.period == 0
    }

    /// Forgets the cached result and restarts the count.
    pub fn reset(&mut self) {
        self.counter = 0;
        self.last = None;
        self.undo = None;
    }

    /// Keeps the calls made since the last commit or rollback.
    pub fn commit(&mut self) {
        self.undo = None;
    }

    /// Restores the counter and cached result of the last commit.
    pub fn rollback(&mut self) {
        if let Some(undo) = self.undo.take() {
            self.counter = undo.counter;
            if let Some(last) = undo.last {
                self.last = last;
            }
        }
    }

    /// Computes with `compute` when due and otherwise replays the cached
    /// result.
    ///
    /// A failed computation leaves the counter and cache untouched.
    pub fn call(&mut self, compute: impl FnOnce() -> RGCMResult<R>) -> RGCMResult<R> {
        let result = match &self.last {
            Some(last) if self.counter % self.period != 0 => {
                trace!(counter = self.counter, period = self.period, "replaying cached result");
                last.clone()
            }
            _ => {
                trace!(counter = self.counter, period = self.period, "refreshing cached result");
                let fresh = compute()?;
                let previous = self.last.replace(fresh.clone());
                let undo = self.undo_entry();
                if undo.last.is_none() {
                    undo.last = Some(previous);
                }
                fresh
            }
        };
        self.undo_entry();
        self.counter += 1;
        Ok(result)
    }

    fn undo_entry(&mut self) -> &mut Undo<R> {
        let counter = self.counter;
        self.undo.get_or_insert_with(|| Undo {
            counter,
            last: None,
        })
    }
}

/// Runs a prognostic component once every `period` calls.
#[derive(Debug, Serialize, Deserialize)]
pub struct PiecewiseConstantPrognostic {
    component: Box<dyn PrognosticComponent>,
    cache: ResultCache<PrognosticOutput>,
}

impl PiecewiseConstantPrognostic {
    pub fn new(component: Box<dyn PrognosticComponent>, period: usize) -> RGCMResult<Self> {
        Ok(Self {
            component,
            cache: ResultCache::new(period)?,
        })
    }

    pub fn from_duration(
        component: Box<dyn PrognosticComponent>,
        duration: Time,
        time_step: Time,
    ) -> RGCMResult<Self> {
        Ok(Self {
            component,
            cache: ResultCache::from_duration(duration, time_step)?,
        })
    }

    pub fn cache(&self) -> &ResultCache<PrognosticOutput> {
        &self.cache
    }
}

impl Component for PiecewiseConstantPrognostic {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        self.component.definitions()
    }

    fn name(&self) -> String {
        self.component.name()
    }

    fn commit_step(&mut self) {
        self.cache.commit();
        self.component.commit_step();
    }

    fn rollback_step(&mut self) {
        self.cache.rollback();
        self.component.rollback_step();
    }
}

#[typetag::serde]
impl PrognosticComponent for PiecewiseConstantPrognostic {
    fn compute(
        &mut self,
        input_state: &InputState,
        time_step: Time,
    ) -> RGCMResult<PrognosticOutput> {
        let component = &mut self.component;
        self.cache
            .call(|| component.compute(input_state, time_step))
    }
}

/// Runs an implicit component once every `period` calls.
#[derive(Debug, Serialize, Deserialize)]
pub struct PiecewiseConstantImplicit {
    component: Box<dyn ImplicitComponent>,
    cache: ResultCache<ImplicitOutput>,
}

impl PiecewiseConstantImplicit {
    pub fn new(component: Box<dyn ImplicitComponent>, period: usize) -> RGCMResult<Self> {
        Ok(Self {
            component,
            cache: ResultCache::new(period)?,
        })
    }

    pub fn from_duration(
        component: Box<dyn ImplicitComponent>,
        duration: Time,
        time_step: Time,
    ) -> RGCMResult<Self> {
        Ok(Self {
            component,
            cache: ResultCache::from_duration(duration, time_step)?,
        })
    }

    pub fn cache(&self) -> &ResultCache<ImplicitOutput> {
        &self.cache
    }
}

impl Component for PiecewiseConstantImplicit {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        self.component.definitions()
    }

    fn name(&self) -> String {
        self.component.name()
    }

    fn commit_step(&mut self) {
        self.cache.commit();
        self.component.commit_step();
    }

    fn rollback_step(&mut self) {
        self.cache.rollback();
        self.component.rollback_step();
    }
}

#[typetag::serde]
impl ImplicitComponent for PiecewiseConstantImplicit {
    fn compute(&mut self, input_state: &InputState, time_step: Time) -> RGCMResult<ImplicitOutput> {
        let component = &mut self.component;
        self.cache
            .call(|| component.compute(input_state, time_step))
    }
}

/// Runs a diagnostic component once every `period` calls.
#[derive(Debug, Serialize, Deserialize)]
pub struct PiecewiseConstantDiagnostic {
    component: Box<dyn DiagnosticComponent>,
    cache: ResultCache<OutputState>,
}

impl PiecewiseConstantDiagnostic {
    pub fn new(component: Box<dyn DiagnosticComponent>, period: usize) -> RGCMResult<Self> {
        Ok(Self {
            component,
            cache: ResultCache::new(period)?,
        })
    }

    pub fn from_duration(
        component: Box<dyn DiagnosticComponent>,
        duration: Time,
        time_step: Time,
    ) -> RGCMResult<Self> {
        Ok(Self {
            component,
            cache: ResultCache::from_duration(duration, time_step)?,
        })
    }

    pub fn cache(&self) -> &ResultCache<OutputState> {
        &self.cache
    }
}

impl Component for PiecewiseConstantDiagnostic {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        self.component.definitions()
    }

    fn name(&self) -> String {
        self.component.name()
    }

    fn commit_step(&mut self) {
        self.cache.commit();
        self.component.commit_step();
    }

    fn rollback_step(&mut self) {
        self.cache.rollback();
        self.component.rollback_step();
    }
}

#[typetag::serde]
impl DiagnosticComponent for PiecewiseConstantDiagnostic {
    fn compute(&mut self, input_state: &InputState) -> RGCMResult<OutputState> {
        let component = &mut self.component;
        self.cache.call(|| component.compute(input_state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    /// Returns its call count as the tendency so replays are detectable.
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct CountingTendency {
        calls: usize,
        time_steps: Vec<Time>,
    }

    impl Component for CountingTendency {
        fn definitions(&self) -> Vec<RequirementDefinition> {
            vec![
                RequirementDefinition::input("air_temperature", "K"),
                RequirementDefinition::tendency("air_temperature", "K s^-1"),
            ]
        }
    }

    #[typetag::serde]
    impl PrognosticComponent for CountingTendency {
        fn compute(
            &mut self,
            _input_state: &InputState,
            time_step: Time,
        ) -> RGCMResult<PrognosticOutput> {
            self.calls += 1;
            self.time_steps.push(time_step);
            let mut tendencies = OutputState::new();
            tendencies.insert(
                "air_temperature".to_string(),
                ArrayD::from_elem(IxDyn(&[1, 1, 1]), self.calls as f64),
            );
            Ok(PrognosticOutput {
                tendencies,
                diagnostics: OutputState::new(),
            })
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct FailingDiagnostic {
        fail: bool,
    }

    impl Component for FailingDiagnostic {
        fn definitions(&self) -> Vec<RequirementDefinition> {
            vec![RequirementDefinition::diagnostic("relative_humidity", "1")]
        }
    }

    #[typetag::serde]
    impl DiagnosticComponent for FailingDiagnostic {
        fn compute(&mut self, _input_state: &InputState) -> RGCMResult<OutputState> {
            if self.fail {
                self.fail = false;
                return Err(RGCMError::Error("transient".to_string()));
            }
            Ok(OutputState::new())
        }
    }

    #[test]
    fn test_zero_period_rejected() {
        let err = PiecewiseConstantPrognostic::new(Box::new(CountingTendency::default()), 0)
            .unwrap_err();
        assert!(matches!(err, RGCMError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_from_duration() {
        let cache = ResultCache::<f64>::from_duration(3600.0, 600.0).unwrap();
        assert_eq!(cache.period(), 6);

        assert!(ResultCache::<f64>::from_duration(1000.0, 600.0).is_err());
        assert!(ResultCache::<f64>::from_duration(0.0, 600.0).is_err());
        assert!(ResultCache::<f64>::from_duration(600.0, -1.0).is_err());
    }

    #[test]
    fn test_computes_on_calls_one_and_every_period_after() {
        for period in 1..=5 {
            for k in 1..=3 {
                let mut cache = ResultCache::new(period).unwrap();
                let mut computed_at = vec![];
                for call in 1..=period * k {
                    cache
                        .call(|| {
                            computed_at.push(call);
                            Ok(call)
                        })
                        .unwrap();
                }
                let expected: Vec<usize> = (0..k).map(|i| i * period + 1).collect();
                assert_eq!(computed_at, expected, "period {period}, k {k}");
            }
        }
    }

    #[test]
    fn test_replays_identical_result() {
        let mut wrapped =
            PiecewiseConstantPrognostic::new(Box::new(CountingTendency::default()), 3).unwrap();
        let input = InputState::empty();

        let first = wrapped.compute(&input, 10.0).unwrap();
        let second = wrapped.compute(&input, 20.0).unwrap();
        let third = wrapped.compute(&input, 30.0).unwrap();
        let fourth = wrapped.compute(&input, 40.0).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(fourth.tendencies["air_temperature"][[0, 0, 0]], 2.0);
        assert_eq!(wrapped.cache().counter(), 4);
    }

    #[test]
    fn test_refresh_sees_current_time_step() {
        let mut inner = CountingTendency::default();
        let mut cache = ResultCache::new(2).unwrap();
        let input = InputState::empty();
        for dt in [10.0, 20.0, 30.0, 40.0] {
            cache.call(|| inner.compute(&input, dt)).unwrap();
        }
        assert_eq!(inner.time_steps, vec![10.0, 30.0]);
    }

    #[test]
    fn test_period_one_is_pass_through() {
        let mut wrapped =
            PiecewiseConstantPrognostic::new(Box::new(CountingTendency::default()), 1).unwrap();
        let input = InputState::empty();
        for expected in 1..=4 {
            let out = wrapped.compute(&input, 10.0).unwrap();
            assert_eq!(out.tendencies["air_temperature"][[0, 0, 0]], expected as f64);
        }
    }

    #[test]
    fn test_failure_does_not_advance_counter() {
        let mut wrapped =
            PiecewiseConstantDiagnostic::new(Box::new(FailingDiagnostic { fail: true }), 4)
                .unwrap();
        let input = InputState::empty();
        assert!(wrapped.compute(&input).is_err());
        assert_eq!(wrapped.cache().counter(), 0);
        assert!(wrapped.compute(&input).is_ok());
        assert_eq!(wrapped.cache().counter(), 1);
    }

    #[test]
    fn test_rollback_restores_last_commit() {
        let mut wrapped =
            PiecewiseConstantPrognostic::new(Box::new(CountingTendency::default()), 2).unwrap();
        let input = InputState::empty();
        wrapped.compute(&input, 10.0).unwrap();
        wrapped.commit_step();

        // A replay and then a refresh, both abandoned
        wrapped.compute(&input, 10.0).unwrap();
        let refreshed = wrapped.compute(&input, 10.0).unwrap();
        assert_eq!(refreshed.tendencies["air_temperature"][[0, 0, 0]], 2.0);
        wrapped.rollback_step();

        assert_eq!(wrapped.cache().counter(), 1);
        assert!(!wrapped.cache().is_due());
        let replayed = wrapped.compute(&input, 10.0).unwrap();
        assert_eq!(replayed.tendencies["air_temperature"][[0, 0, 0]], 1.0);
    }

    #[test]
    fn test_rollback_after_commit_keeps_calls() {
        let mut cache = ResultCache::new(3).unwrap();
        cache.call(|| Ok(1)).unwrap();
        cache.call(|| Ok(2)).unwrap();
        cache.commit();
        cache.rollback();
        assert_eq!(cache.counter(), 2);
        assert_eq!(cache.call(|| Ok(3)).unwrap(), 1);
    }

    #[test]
    fn test_rollback_of_first_call_forgets_result() {
        let mut cache = ResultCache::new(3).unwrap();
        cache.call(|| Ok(1)).unwrap();
        cache.rollback();
        assert_eq!(cache.counter(), 0);
        assert!(cache.is_due());
        assert_eq!(cache.call(|| Ok(5)).unwrap(), 5);
    }

    #[test]
    fn test_wrapper_forwards_declarations_and_name() {
        let wrapped =
            PiecewiseConstantPrognostic::new(Box::new(CountingTendency::default()), 2).unwrap();
        assert_eq!(wrapped.name(), "CountingTendency");
        assert_eq!(wrapped.tendencies().len(), 1);
        assert_eq!(wrapped.input_names(), vec!["air_temperature".to_string()]);
    }

    #[test]
    fn test_serialized_wrapper_recomputes_after_restore() {
        let mut wrapped =
            PiecewiseConstantPrognostic::new(Box::new(CountingTendency::default()), 3).unwrap();
        let input = InputState::empty();
        wrapped.compute(&input, 10.0).unwrap();

        let json = serde_json::to_string(&wrapped).unwrap();
        let mut restored: PiecewiseConstantPrognostic = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.cache().counter(), 1);
        assert!(restored.cache().is_due());
        let out = restored.compute(&input, 10.0).unwrap();
        assert_eq!(out.tendencies["air_temperature"][[0, 0, 0]], 2.0);
    }
}
