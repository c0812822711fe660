//! Action routing table
//!
//! Maps an inbound action name to the service, resource family, and
//! handler that serve it. The set of actions is closed; unknown names
//! are rejected at dispatch instead of failing deep inside a handler.
//! The table ships built in and can also be loaded from a JSON lookup
//! file at startup.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use strato_common::{Result, StratoError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    RunInstances,
    StartInstances,
    StopInstances,
    TerminateInstances,
    CreateKeyPair,
    CreateTags,
}

impl Action {
    fn from_name(name: &str) -> Option<Action> {
        match name {
            "RunInstances" => Some(Action::RunInstances),
            "StartInstances" => Some(Action::StartInstances),
            "StopInstances" => Some(Action::StopInstances),
            "TerminateInstances" => Some(Action::TerminateInstances),
            "CreateKeyPair" => Some(Action::CreateKeyPair),
            "CreateTags" => Some(Action::CreateTags),
            _ => None,
        }
    }
}

/// The provider service an action belongs to. Only the compute service
/// is emulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Ec2,
}

/// The group of actions within a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceFamily {
    Instance,
    KeyPair,
    Resource,
}

#[derive(Debug, Clone, Copy)]
pub struct ActionRoute {
    pub service: Service,
    pub family: ResourceFamily,
    pub action: Action,
}

pub struct ActionTable {
    routes: HashMap<String, ActionRoute>,
}

impl ActionTable {
    pub fn builtin() -> Self {
        let entries = [
            ("RunInstances", ResourceFamily::Instance, Action::RunInstances),
            ("StartInstances", ResourceFamily::Instance, Action::StartInstances),
            ("StopInstances", ResourceFamily::Instance, Action::StopInstances),
            (
                "TerminateInstances",
                ResourceFamily::Instance,
                Action::TerminateInstances,
            ),
            ("CreateKeyPair", ResourceFamily::KeyPair, Action::CreateKeyPair),
            ("CreateTags", ResourceFamily::Resource, Action::CreateTags),
        ];
        let routes = entries
            .into_iter()
            .map(|(name, family, action)| {
                (
                    name.to_string(),
                    ActionRoute {
                        service: Service::Ec2,
                        family,
                        action,
                    },
                )
            })
            .collect();
        Self { routes }
    }

    /// Load a lookup file mapping action names to `{service, family}`
    /// pairs. Names the engine has no handler for are rejected here,
    /// at startup, rather than at request time.
    pub fn from_lookup_file(path: &Path) -> Result<Self> {
        #[derive(Deserialize)]
        struct LookupEntry {
            service: Service,
            family: ResourceFamily,
        }

        let raw = std::fs::read_to_string(path)?;
        let entries: HashMap<String, LookupEntry> = serde_json::from_str(&raw)?;

        let mut routes = HashMap::new();
        for (name, entry) in entries {
            let action = Action::from_name(&name)
                .ok_or_else(|| StratoError::UnknownAction(name.clone()))?;
            routes.insert(
                name,
                ActionRoute {
                    service: entry.service,
                    family: entry.family,
                    action,
                },
            );
        }
        Ok(Self { routes })
    }

    pub fn resolve(&self, name: &str) -> Result<ActionRoute> {
        self.routes
            .get(name)
            .copied()
            .ok_or_else(|| StratoError::UnknownAction(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_resolves_every_action() {
        let table = ActionTable::builtin();
        for name in [
            "RunInstances",
            "StartInstances",
            "StopInstances",
            "TerminateInstances",
            "CreateKeyPair",
            "CreateTags",
        ] {
            let route = table.resolve(name).unwrap();
            assert_eq!(route.service, Service::Ec2);
        }
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let table = ActionTable::builtin();
        let err = table.resolve("DescribeInstances").unwrap_err();
        assert!(matches!(err, StratoError::UnknownAction(_)));
    }
}
