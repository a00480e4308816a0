use std::collections::HashMap;
use std::sync::Arc;

use luisbot_core::{BotConfiguration, EndpointService, Error, Result};
use tracing::info;

use crate::{LuisRecognizer, Recognizer};

/// Immutable service table built once at process start and shared
/// read-only (via `Arc`) with every per-turn handler. Never mutated after
/// construction, so concurrent turns need no locking.
pub struct ServiceRegistry {
    endpoint: EndpointService,
    recognizers: HashMap<String, Arc<dyn Recognizer>>,
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("endpoint", &self.endpoint)
            .field("recognizers", &self.recognizers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ServiceRegistry {
    pub fn new(endpoint: EndpointService) -> Self {
        Self {
            endpoint,
            recognizers: HashMap::new(),
        }
    }

    /// Resolve the endpoint descriptor for `environment` and connect one
    /// recognizer per declared LUIS service. A bot file that names no
    /// endpoint for the environment aborts launch.
    pub fn from_bot_config(config: &BotConfiguration, environment: &str) -> Result<Self> {
        let endpoint = config
            .endpoints()
            .find(|e| e.name == environment)
            .cloned()
            .ok_or_else(|| {
                Error::BotFile(format!(
                    "Bot file has no endpoint service named '{}'",
                    environment
                ))
            })?;

        let mut registry = Self::new(endpoint);
        for luis in config.luis_services() {
            info!(service = %luis.name, region = %luis.region, "Connecting LUIS service");
            registry.insert(&luis.name, Arc::new(LuisRecognizer::new(luis)));
        }
        Ok(registry)
    }

    /// Register a recognizer under its logical service name. Only called
    /// during construction, before the registry is shared.
    pub fn insert(&mut self, name: &str, recognizer: Arc<dyn Recognizer>) {
        self.recognizers.insert(name.to_string(), recognizer);
    }

    pub fn recognizer(&self, name: &str) -> Option<Arc<dyn Recognizer>> {
        self.recognizers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.recognizers.contains_key(name)
    }

    pub fn endpoint(&self) -> &EndpointService {
        &self.endpoint
    }
}
