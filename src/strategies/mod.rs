// ABOUTME: Pluggable implementations of deployment capabilities, selected by name from config.
// ABOUTME: The registry maps each capability to one strategy; unknown names are config errors.

mod dependencies;
mod deploy;
mod migrate;
mod scm;

pub use dependencies::{PackageManager, Polyglot};
pub use deploy::{CloneDeploy, CopyDeploy};
pub use migrate::Artisan;
pub use scm::{Git, Scm};

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::config::StrategiesConfig;
use crate::tasks::{StepOutcome, TaskContext, TaskError};

/// A deployment capability a strategy can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Put the application's code into the new release.
    Deploy,
    /// Source control operations.
    Scm,
    /// Install the application's dependencies.
    Dependencies,
    /// Run database migrations.
    Migrate,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Deploy,
        Capability::Scm,
        Capability::Dependencies,
        Capability::Migrate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Deploy => "deploy",
            Capability::Scm => "scm",
            Capability::Dependencies => "dependencies",
            Capability::Migrate => "migrate",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|capability| capability.as_str() == s)
            .ok_or_else(|| StrategyError::UnknownCapability(s.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    #[error("unknown {capability} strategy '{name}' (available: {available})")]
    UnknownStrategy {
        capability: String,
        name: String,
        available: String,
    },

    #[error("no {capability} strategy is configured")]
    Unconfigured { capability: String },
}

/// One implementation of a capability.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn capability(&self) -> Capability;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Binary the strategy shells out to, if any.
    fn binary(&self) -> Option<&str> {
        None
    }

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError>;
}

/// Strategy per capability.
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<Capability, Arc<dyn Strategy>>,
    scm: Option<Arc<dyn Scm>>,
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for capability in Capability::ALL {
            if let Some(strategy) = self.strategies.get(&capability) {
                map.entry(&capability.as_str(), &strategy.name());
            }
        }
        map.finish()
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the strategies named in the config.
    pub fn from_config(config: &StrategiesConfig) -> Result<Self, StrategyError> {
        let mut registry = Self::new();

        if let Some(name) = &config.scm {
            let scm: Arc<Git> = match name.as_str() {
                "git" => Arc::new(Git),
                _ => return Err(unknown(Capability::Scm, name)),
            };
            registry.register_scm(scm);
        }

        if let Some(name) = &config.deploy {
            let strategy: Arc<dyn Strategy> = match name.as_str() {
                "clone" => Arc::new(CloneDeploy),
                "copy" => Arc::new(CopyDeploy),
                _ => return Err(unknown(Capability::Deploy, name)),
            };
            registry.register(strategy);
        }

        if let Some(name) = &config.dependencies {
            let strategy: Arc<dyn Strategy> = match name.as_str() {
                "polyglot" => Arc::new(Polyglot::default()),
                _ => match PackageManager::named(name) {
                    Some(manager) => Arc::new(manager),
                    None => return Err(unknown(Capability::Dependencies, name)),
                },
            };
            registry.register(strategy);
        }

        if let Some(name) = &config.migrate {
            let strategy: Arc<dyn Strategy> = match name.as_str() {
                "artisan" => Arc::new(Artisan),
                _ => return Err(unknown(Capability::Migrate, name)),
            };
            registry.register(strategy);
        }

        Ok(registry)
    }

    /// Register a strategy for its capability, replacing any previous one.
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategies.insert(strategy.capability(), strategy);
    }

    /// Register a source control strategy, usable both as a step and by
    /// deploy strategies.
    pub fn register_scm<S: Scm + Strategy + 'static>(&mut self, scm: Arc<S>) {
        self.strategies.insert(Capability::Scm, scm.clone());
        self.scm = Some(scm);
    }

    pub fn resolve(&self, capability: Capability) -> Result<Arc<dyn Strategy>, StrategyError> {
        self.strategies
            .get(&capability)
            .cloned()
            .ok_or_else(|| StrategyError::Unconfigured {
                capability: capability.to_string(),
            })
    }

    pub fn scm(&self) -> Result<Arc<dyn Scm>, StrategyError> {
        self.scm.clone().ok_or_else(|| StrategyError::Unconfigured {
            capability: Capability::Scm.to_string(),
        })
    }

    /// Names accepted for a capability in the config.
    pub fn available(capability: Capability) -> &'static [&'static str] {
        match capability {
            Capability::Deploy => &["clone", "copy"],
            Capability::Scm => &["git"],
            Capability::Dependencies => {
                &["polyglot", "npm", "yarn", "composer", "bundler", "bower"]
            }
            Capability::Migrate => &["artisan"],
        }
    }
}

fn unknown(capability: Capability, name: &str) -> StrategyError {
    StrategyError::UnknownStrategy {
        capability: capability.to_string(),
        name: name.to_string(),
        available: StrategyRegistry::available(capability).join(", "),
    }
}

/// Look up `binary` on the target.
///
/// Returns the step outcome to report when it is missing, so every strategy
/// fails with the same message.
pub async fn require_binary(
    context: &TaskContext,
    binary: &str,
) -> Result<Result<String, StepOutcome>, TaskError> {
    match context.shell.which(binary).await? {
        Some(path) => Ok(Ok(path)),
        None => Ok(Err(StepOutcome::failed(
            context.shell.binary_missing_message(binary),
        ))),
    }
}
