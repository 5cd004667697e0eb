use crate::{
    Cached,
    Collector,
    CustomCommand,
    EngineError,
    HardwareProbe,
    NetworkStats,
    PerformanceSnapshot,
    Transport,
};
use cluster_report_config::CustomCollectorConfig;
use std::{
    sync::Arc,
    time::Duration,
};

/// Lookup table of the collectors available to a run, in registration order.
#[derive(Default, Clone)]
pub struct Registry {
    collectors: Vec<Arc<dyn Collector>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the built-in hardware, performance and network collectors followed by the
    /// configured custom ones. Every collector is wrapped in [`Cached`] when `cache_ttl` is set.
    pub fn builtin(
        transport: Arc<dyn Transport>,
        custom: &[CustomCollectorConfig],
        cache_ttl: Option<Duration>,
    ) -> Result<Self, EngineError> {
        let mut collectors: Vec<Arc<dyn Collector>> = vec![
            Arc::new(HardwareProbe::new(transport.clone())),
            Arc::new(PerformanceSnapshot::new(transport.clone())),
            Arc::new(NetworkStats::new(transport.clone())),
        ];
        for config in custom {
            if config.command.trim().is_empty() {
                return Err(EngineError::configuration(format!(
                    "custom collector {:?} has no command",
                    config.name
                )));
            }
            collectors.push(Arc::new(CustomCommand::new(config, transport.clone())));
        }

        let mut registry = Self::new();
        for collector in collectors {
            let collector = match cache_ttl {
                Some(ttl) => Arc::new(Cached::new(collector, ttl)) as Arc<dyn Collector>,
                None => collector,
            };
            registry.register(collector)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, collector: Arc<dyn Collector>) -> Result<(), EngineError> {
        let name = collector.name();
        if name.trim().is_empty() {
            return Err(EngineError::configuration("collector names must not be empty"));
        }
        if self.get(name).is_some() {
            return Err(EngineError::configuration(format!(
                "collector {name:?} is already registered"
            )));
        }
        debug!(collector = name, kinds = ?collector.kinds(), "registered collector");
        self.collectors.push(collector);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Collector>> {
        self.collectors
            .iter()
            .find(|collector| collector.name() == name)
            .cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.collectors.iter().map(|collector| collector.name()).collect()
    }

    /// Looks up `names` in the given order. An empty selection means every registered collector.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Arc<dyn Collector>>, EngineError> {
        if names.is_empty() {
            return Ok(self.collectors.clone());
        }
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name).ok_or_else(|| {
                    EngineError::configuration(format!(
                        "unknown collector {name:?}, available: {}",
                        self.names().join(", ")
                    ))
                })
            })
            .collect()
    }
}
