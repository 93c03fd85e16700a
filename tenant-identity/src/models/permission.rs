use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Action that grants every other action on a resource.
pub const WILDCARD_ACTION: &str = "manage";

/// One resource with the actions the role may perform on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub resource: String,
    pub actions: Vec<String>,
}

impl PermissionEntry {
    pub fn allows(&self, action: &str) -> bool {
        self.actions
            .iter()
            .any(|a| a == action || a == WILDCARD_ACTION)
    }
}

/// A required `resource:action` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionRequirement {
    pub resource: String,
    pub action: String,
}

impl PermissionRequirement {
    /// Parse `resource:action`. Anything else is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let (resource, action) = raw.trim().split_once(':')?;
        if resource.is_empty() || action.is_empty() || action.contains(':') {
            return None;
        }
        Some(Self {
            resource: resource.to_string(),
            action: action.to_string(),
        })
    }
}

/// Effective permission set of the current user in the active tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RolePermissions {
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default, alias = "permissions")]
    pub entries: Vec<PermissionEntry>,
}

impl RolePermissions {
    /// Build from membership `resource:action` strings, grouping by resource.
    pub fn from_strings<'a>(
        roles: BTreeSet<String>,
        permissions: impl IntoIterator<Item = &'a String>,
    ) -> Self {
        let mut entries: Vec<PermissionEntry> = Vec::new();
        for requirement in permissions
            .into_iter()
            .filter_map(|p| PermissionRequirement::parse(p))
        {
            match entries
                .iter_mut()
                .find(|e| e.resource == requirement.resource)
            {
                Some(entry) => entry.actions.push(requirement.action),
                None => entries.push(PermissionEntry {
                    resource: requirement.resource,
                    actions: vec![requirement.action],
                }),
            }
        }
        Self { roles, entries }
    }

    pub fn satisfies(&self, requirement: &PermissionRequirement) -> bool {
        self.entries
            .iter()
            .filter(|e| e.resource == requirement.resource)
            .any(|e| e.allows(&requirement.action))
    }

    /// AND semantics: every requirement must hold. Unparseable requirements fail.
    pub fn satisfies_all(&self, required: &[String]) -> bool {
        required.iter().all(|raw| {
            PermissionRequirement::parse(raw)
                .map(|req| self.satisfies(&req))
                .unwrap_or(false)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edition {
    pub id: String,
    pub name: String,
}

/// Edition and feature flags purchased by the active tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Entitlements {
    #[serde(default)]
    pub edition: Option<Edition>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Entitlements {
    pub fn has_edition(&self) -> bool {
        self.edition.is_some()
    }
}
