use super::{DirectoryError, GroupMembershipProvider};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

/// On-disk layout of a static directory file.
///
/// ```json
/// {
///   "users":  { "CORP\\alice": ["Ops"] },
///   "groups": { "Ops": ["Domain Admins"] }
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    users: HashMap<String, Vec<String>>,
    #[serde(default)]
    groups: HashMap<String, Vec<String>>,
}

/// In-memory directory: account → groups, group → parent groups.
///
/// Names compare case-insensitively, as directory names do.
#[derive(Debug, Default)]
pub struct StaticGroupMembership {
    users: HashMap<String, Vec<String>>,
    groups: HashMap<String, Vec<String>>,
    admin_groups: HashSet<String>,
}

impl StaticGroupMembership {
    pub fn new<I, S>(admin_groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            users: HashMap::new(),
            groups: HashMap::new(),
            admin_groups: admin_groups.into_iter().map(|g| normalize(g.as_ref())).collect(),
        }
    }

    /// Load users and nested groups from a JSON directory file
    pub fn from_file<I, S>(path: impl AsRef<Path>, admin_groups: I) -> Result<Self, DirectoryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let raw = std::fs::read_to_string(path)?;
        let file: DirectoryFile = serde_json::from_str(&raw)?;

        let mut directory = Self::new(admin_groups);
        for (user, groups) in file.users {
            directory = directory.with_user(user, groups);
        }
        for (group, parents) in file.groups {
            directory = directory.with_group(group, parents);
        }
        Ok(directory)
    }

    pub fn with_user<I, S>(mut self, name: impl AsRef<str>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.users
            .entry(normalize(name.as_ref()))
            .or_default()
            .extend(groups.into_iter().map(|g| normalize(g.as_ref())));
        self
    }

    /// Declare `group` as a member of each of `parents`
    pub fn with_group<I, S>(mut self, group: impl AsRef<str>, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.groups
            .entry(normalize(group.as_ref()))
            .or_default()
            .extend(parents.into_iter().map(|g| normalize(g.as_ref())));
        self
    }

    /// Every group `name` belongs to, directly or through nesting.
    pub fn transitive_groups(&self, name: &str) -> Option<HashSet<String>> {
        let direct = self.users.get(&normalize(name))?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<&String> = direct.iter().collect();
        while let Some(group) = queue.pop_front() {
            if !seen.insert(group.clone()) {
                continue;
            }
            if let Some(parents) = self.groups.get(group) {
                queue.extend(parents.iter());
            }
        }
        Some(seen)
    }
}

#[async_trait]
impl GroupMembershipProvider for StaticGroupMembership {
    async fn is_admin_equivalent(&self, name: &str) -> Result<bool, DirectoryError> {
        let groups = self
            .transitive_groups(name)
            .ok_or_else(|| DirectoryError::UnknownIdentity(name.to_string()))?;

        Ok(groups.iter().any(|g| self.admin_groups.contains(g)))
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
