use std::collections::HashMap;

use crate::errors::ConfigError;
use crate::model::Target;

/// Read-only mapping from target name to its configuration. Built once at
/// startup; safe to share across concurrent requests without locking.
#[derive(Debug)]
pub struct TargetRegistry {
    targets: HashMap<String, Target>,
}

impl TargetRegistry {
    pub fn new(targets: Vec<Target>) -> Result<Self, ConfigError> {
        let mut map = HashMap::with_capacity(targets.len());
        for target in targets {
            if map.contains_key(&target.name) {
                return Err(ConfigError::DuplicateTarget(target.name));
            }
            map.insert(target.name.clone(), target);
        }
        Ok(TargetRegistry { targets: map })
    }

    /// Absence is a first-class outcome: callers decide whether it is fatal
    /// (backup/restore) or merely "unhealthy" (health checks).
    pub fn resolve(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
