use crate::config::Config;
use crate::engine::ExecutionEngine;
use crate::error::{MotionError, Result};
use crate::handlers::Endpoints;
use crate::lifecycle::{resolve, LifecycleState, Transition, TransitionOutcome};
use crate::orchestrator::{GoalEvent, GoalObservers, Orchestrator};
use crate::playback::PlaybackEngine;
use crate::registry::MotionRegistry;
use crate::sync::lock;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{error, info, warn};

/// Builds the execution engine from the loaded configuration.
pub type EngineFactory =
    Box<dyn Fn(&Config) -> Result<Arc<dyn ExecutionEngine>> + Send + Sync>;

/// Where `configure` reads motion definitions from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    File(PathBuf),
    Inline(Config),
}

impl ConfigSource {
    fn load(&self) -> Result<Config> {
        match self {
            ConfigSource::File(path) => Config::load(path),
            ConfigSource::Inline(config) => Ok(config.clone()),
        }
    }
}

/// Registry and engine created by `configure`.
struct Bindings {
    registry: Arc<RwLock<MotionRegistry>>,
    engine: Arc<dyn ExecutionEngine>,
}

struct Inner {
    state: LifecycleState,
    bindings: Option<Bindings>,
    endpoints: Option<Endpoints>,
}

/// The motion service as a managed lifecycle node.
pub struct MotionService {
    source: ConfigSource,
    factory: EngineFactory,
    observers: GoalObservers,
    inner: Mutex<Inner>,
}

impl MotionService {
    pub fn new(source: ConfigSource, factory: EngineFactory) -> Self {
        Self {
            source,
            factory,
            observers: GoalObservers::default(),
            inner: Mutex::new(Inner {
                state: LifecycleState::Unconfigured,
                bindings: None,
                endpoints: None,
            }),
        }
    }

    /// A service backed by the in-process [`PlaybackEngine`].
    pub fn with_playback(source: ConfigSource) -> Self {
        Self::new(
            source,
            Box::new(|config: &Config| {
                let engine: Arc<dyn ExecutionEngine> =
                    Arc::new(PlaybackEngine::from_config(config)?);
                Ok(engine)
            }),
        )
    }

    /// Register a callback for goal events. Applies to goals admitted after
    /// the call, across activations.
    pub fn observe(&self, observer: impl Fn(&GoalEvent) + Send + Sync + 'static) {
        self.observers.add(observer);
    }

    pub fn state(&self) -> LifecycleState {
        lock(&self.inner).state
    }

    /// Request endpoints; only available while active.
    pub fn endpoints(&self) -> Result<Endpoints> {
        let inner = lock(&self.inner);
        match (&inner.endpoints, inner.state) {
            (Some(endpoints), LifecycleState::Active) => Ok(endpoints.clone()),
            (_, state) => Err(MotionError::NotActive(state)),
        }
    }

    /// Run a lifecycle transition. Illegal transitions fail without touching
    /// the state; otherwise the callback outcome decides the next state.
    pub fn transition(&self, transition: Transition) -> Result<TransitionOutcome> {
        let mut inner = lock(&self.inner);
        let from = inner.state;
        if transition.target(from).is_none() {
            return Err(MotionError::InvalidTransition { from, transition });
        }

        let outcome = match transition {
            Transition::Configure => self.on_configure(&mut inner),
            Transition::Activate => self.on_activate(&mut inner),
            Transition::Deactivate => on_deactivate(&mut inner),
            Transition::Cleanup => on_cleanup(&mut inner),
            Transition::Shutdown => on_shutdown(&mut inner),
        };

        inner.state = resolve(from, transition, outcome);
        if inner.state == LifecycleState::ErrorProcessing {
            on_error(&mut inner);
            inner.state = LifecycleState::Finalized;
        }
        info!(%transition, %from, to = %inner.state, %outcome, "lifecycle transition");
        Ok(outcome)
    }

    fn on_configure(&self, inner: &mut Inner) -> TransitionOutcome {
        let config = match self.source.load() {
            Ok(config) => config,
            Err(e) => {
                error!("failed to load motions: {e}");
                return TransitionOutcome::Failure;
            }
        };
        let registry = match MotionRegistry::from_config(&config) {
            Ok(registry) => registry,
            Err(e) => {
                error!("{e}");
                return TransitionOutcome::Failure;
            }
        };
        let engine = match (self.factory)(&config) {
            Ok(engine) => engine,
            Err(e) => {
                error!("{e}");
                return TransitionOutcome::Error;
            }
        };
        inner.bindings = Some(Bindings {
            registry: Arc::new(RwLock::new(registry)),
            engine,
        });
        TransitionOutcome::Success
    }

    fn on_activate(&self, inner: &mut Inner) -> TransitionOutcome {
        let Some(bindings) = &inner.bindings else {
            error!("activate requested without a configured registry");
            return TransitionOutcome::Failure;
        };
        let orchestrator = Orchestrator::new(
            bindings.registry.clone(),
            bindings.engine.clone(),
            self.observers.clone(),
        );
        inner.endpoints = Some(Endpoints::new(
            bindings.registry.clone(),
            Arc::new(orchestrator),
        ));
        TransitionOutcome::Success
    }
}

/// Withdraw the endpoints after draining the in-flight goal.
fn withdraw_endpoints(inner: &mut Inner) {
    if let Some(endpoints) = inner.endpoints.take() {
        if endpoints.is_busy() {
            warn!("motion in progress, canceling before withdrawing endpoints");
        }
        endpoints.shutdown();
    }
}

fn on_deactivate(inner: &mut Inner) -> TransitionOutcome {
    withdraw_endpoints(inner);
    TransitionOutcome::Success
}

fn on_cleanup(inner: &mut Inner) -> TransitionOutcome {
    inner.bindings = None;
    TransitionOutcome::Success
}

fn on_shutdown(inner: &mut Inner) -> TransitionOutcome {
    withdraw_endpoints(inner);
    inner.bindings = None;
    TransitionOutcome::Success
}

fn on_error(inner: &mut Inner) {
    warn!("lifecycle error, releasing resources");
    withdraw_endpoints(inner);
    inner.bindings = None;
}
