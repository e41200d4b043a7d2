//! Frequency derivation engine

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use triggers_clock::TokioScheduler;
use triggers_core::Frequency;
use triggers_ports::Scheduler;

use crate::base_clock::BaseClock;
use crate::config::TriggerConfig;
use crate::decimator::decimation_factor;
use crate::error::{TriggerError, TriggerResult};
use crate::trigger::{Recipe, Trigger};

/// Port for anything that hands out triggers
///
/// Consumers should depend on this rather than on `TriggerProvider` so a
/// different source can be injected.
pub trait TriggerSource: Send + Sync {
    /// Get a trigger that pulses at the requested frequency
    fn on_frequency(&self, frequency: Frequency) -> TriggerResult<Trigger>;
}

/// Provides triggers at every [`Frequency`] from a single base clock
///
/// Rather than run one timer per frequency, every trigger counts the ticks of
/// one base interval (20 ms by default) and emits a pulse every N ticks.
///
/// ```text
///   base clock (20 ms)
///        │
///        ├── At10Hz:      pulse every 5 ticks
///        ├── EverySecond: pulse every 50 ticks
///        └── EveryMinute: pulse every 3000 ticks
/// ```
///
/// The decimation recipe for each frequency is built on first request and
/// cached. The cache holds recipes, not running timers: each subscription
/// starts counting at its own subscription time.
pub struct TriggerProvider {
    name: String,
    base: BaseClock,
    cache: DashMap<Frequency, Arc<Recipe>>,
    recipes_built: AtomicUsize,
}

impl TriggerProvider {
    pub const DEFAULT_BASE_INTERVAL: Duration = BaseClock::DEFAULT_INTERVAL;

    /// Create a provider with the default 20 ms base interval
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self::build("triggers", BaseClock::with_default_interval(scheduler))
    }

    /// Create a provider with a custom base interval
    pub fn with_base_interval(
        scheduler: Arc<dyn Scheduler>,
        base_interval: Duration,
    ) -> TriggerResult<Self> {
        Ok(Self::build("triggers", BaseClock::new(scheduler, base_interval)?))
    }

    /// Create a provider on the current tokio runtime
    pub fn with_tokio() -> TriggerResult<Self> {
        let scheduler = TokioScheduler::current()?;
        Ok(Self::new(Arc::new(scheduler)))
    }

    /// Create a provider from configuration
    ///
    /// The configuration is validated and every `warm_up` frequency is built
    /// up front, so misconfiguration surfaces here rather than on first use.
    pub fn from_config(config: &TriggerConfig, scheduler: Arc<dyn Scheduler>) -> TriggerResult<Self> {
        config.validate()?;

        let base = BaseClock::new(scheduler, config.base_interval())?;
        let provider = Self::build(&config.name, base);
        provider.warm_up(&config.warm_up)?;
        Ok(provider)
    }

    fn build(name: &str, base: BaseClock) -> Self {
        log::info!(
            "Trigger provider '{}' running on {} with a {:?} base interval",
            name,
            base.scheduler().name(),
            base.interval()
        );

        Self {
            name: name.to_string(),
            base,
            cache: DashMap::new(),
            recipes_built: AtomicUsize::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_interval(&self) -> Duration {
        self.base.interval()
    }

    /// Get a trigger that pulses at the requested frequency
    ///
    /// `Never` yields a trigger that stays silent forever. Any other
    /// frequency must have a period that is an exact multiple of the base
    /// interval, otherwise `TriggerError::Misconfigured` is returned and
    /// nothing is cached.
    pub fn on_frequency(&self, frequency: Frequency) -> TriggerResult<Trigger> {
        if frequency.is_never() {
            return Ok(Trigger::never());
        }
        Ok(Trigger::from_recipe(self.recipe(frequency)?))
    }

    /// Get a trigger from a raw period in milliseconds
    ///
    /// Only the periods of the enumerated frequencies are accepted.
    pub fn on_period_ms(&self, period_ms: u64) -> TriggerResult<Trigger> {
        let frequency = Frequency::try_from(period_ms)?;
        self.on_frequency(frequency)
    }

    /// Build the recipes for `frequencies` ahead of their first request
    pub fn warm_up(&self, frequencies: &[Frequency]) -> TriggerResult<()> {
        for &frequency in frequencies {
            self.on_frequency(frequency)?;
        }
        Ok(())
    }

    /// Number of recipes built since creation
    ///
    /// Stays at one per frequency however many times it is requested.
    pub fn recipes_built(&self) -> usize {
        self.recipes_built.load(Ordering::SeqCst)
    }

    /// Frequencies with a cached recipe, in ascending period order
    pub fn cached_frequencies(&self) -> Vec<Frequency> {
        let mut frequencies: Vec<Frequency> = self.cache.iter().map(|entry| *entry.key()).collect();
        frequencies.sort();
        frequencies
    }

    fn recipe(&self, frequency: Frequency) -> TriggerResult<Arc<Recipe>> {
        if let Some(recipe) = self.cache.get(&frequency) {
            log::debug!("Recipe cache hit for {}", frequency);
            return Ok(Arc::clone(recipe.value()));
        }

        let period = frequency.period().ok_or_else(|| {
            TriggerError::Misconfigured(format!("{} has no period", frequency))
        })?;
        let cycles = decimation_factor(period, self.base.interval()).ok_or_else(|| {
            TriggerError::Misconfigured(format!(
                "{} period {:?} is not a multiple of the {:?} base interval",
                frequency,
                period,
                self.base.interval()
            ))
        })?;

        // Insert-if-absent: concurrent first requests all end up with one recipe
        let recipe = self
            .cache
            .entry(frequency)
            .or_insert_with(|| {
                self.recipes_built.fetch_add(1, Ordering::SeqCst);
                log::debug!(
                    "Built recipe for {}: one pulse every {} base ticks",
                    frequency,
                    cycles
                );
                Arc::new(Recipe {
                    frequency,
                    cycles,
                    ticks: self.base.ticks(),
                })
            })
            .value()
            .clone();

        Ok(recipe)
    }
}

impl TriggerSource for TriggerProvider {
    fn on_frequency(&self, frequency: Frequency) -> TriggerResult<Trigger> {
        TriggerProvider::on_frequency(self, frequency)
    }
}
