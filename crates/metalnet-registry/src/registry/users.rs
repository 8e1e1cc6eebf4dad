use std::collections::BTreeSet;

use tracing::{info, instrument, warn};

use super::Registry;
use crate::error::{RegistryError, RegistryResult};
use crate::model::{Group, User};

impl Registry {
    #[instrument(skip(self, secret))]
    pub async fn user_create(&self, label: &str, secret: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        state.graph.users.insert(User::new(label, secret))?;
        info!(user = label, "User created");
        Ok(())
    }

    /// Deletes a user. Its group memberships dissolve with it.
    #[instrument(skip(self))]
    pub async fn user_delete(&self, label: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let user = state.graph.users.require(label)?;
        state.graph.remove_user(user)?;
        info!(user = label, "User deleted");
        Ok(())
    }

    /// Returns true if `label` names a user whose secret is `secret`.
    #[instrument(skip(self, secret))]
    pub async fn user_authenticate(&self, label: &str, secret: &str) -> bool {
        let state = self.state.read().await;
        let users = &state.graph.users;
        let accepted = users
            .find(label)
            .and_then(|id| users.get(id))
            .is_some_and(|user| user.check_secret(secret));
        if !accepted {
            warn!(user = label, "Authentication rejected");
        }
        accepted
    }

    #[instrument(skip(self))]
    pub async fn group_create(&self, label: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        state.graph.groups.insert(Group {
            label: label.to_string(),
            users: BTreeSet::new(),
            projects: BTreeSet::new(),
        })?;
        info!(group = label, "Group created");
        Ok(())
    }

    /// Deletes a group that owns no projects. Memberships dissolve.
    #[instrument(skip(self))]
    pub async fn group_delete(&self, label: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let group = state.graph.groups.require(label)?;
        let owned = &state.graph.groups.at(group)?.projects;
        if !owned.is_empty() {
            let projects = state.graph.projects.labels(owned).join(", ");
            return Err(RegistryError::blocked(
                "group",
                label,
                format!("still owns projects {projects}"),
            ));
        }
        state.graph.remove_group(group)?;
        info!(group = label, "Group deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn group_add_user(&self, group: &str, user: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let group_id = state.graph.groups.require(group)?;
        let user_id = state.graph.users.require(user)?;
        state.graph.add_membership(user_id, group_id)?;
        info!(group, user, "User added to group");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn group_remove_user(&self, group: &str, user: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let group_id = state.graph.groups.require(group)?;
        let user_id = state.graph.users.require(user)?;
        state.graph.remove_membership(user_id, group_id)?;
        info!(group, user, "User removed from group");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_registry;
    use crate::error::RegistryError;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_membership_round_trip() {
        let (registry, _) = test_registry();
        registry.group_create("acme-corp").await.unwrap();
        registry.user_create("alice", "secret").await.unwrap();

        registry.group_add_user("acme-corp", "alice").await.unwrap();
        assert_eq!(registry.list_group_users("acme-corp").await.unwrap(), vec!["alice"]);
        assert_eq!(registry.list_user_groups("alice").await.unwrap(), vec!["acme-corp"]);
        assert!(matches!(
            registry.group_add_user("acme-corp", "alice").await,
            Err(RegistryError::Duplicate { .. })
        ));

        registry.group_remove_user("acme-corp", "alice").await.unwrap();
        assert!(registry.list_group_users("acme-corp").await.unwrap().is_empty());
        assert!(registry.list_user_groups("alice").await.unwrap().is_empty());
        assert!(matches!(
            registry.group_remove_user("acme-corp", "alice").await,
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_membership_missing_entities() {
        let (registry, _) = test_registry();
        registry.group_create("acme-corp").await.unwrap();
        assert_eq!(
            registry.group_add_user("acme-corp", "alice").await,
            Err(RegistryError::not_found("user", "alice"))
        );
        assert_eq!(
            registry.group_add_user("acme-code", "alice").await,
            Err(RegistryError::not_found("group", "acme-code"))
        );
    }

    #[tokio::test]
    async fn test_delete_dissolves_memberships() {
        let (registry, _) = test_registry();
        registry.group_create("acme-corp").await.unwrap();
        registry.user_create("alice", "secret").await.unwrap();
        registry.group_add_user("acme-corp", "alice").await.unwrap();

        registry.group_delete("acme-corp").await.unwrap();
        assert!(registry.list_user_groups("alice").await.unwrap().is_empty());
        registry.user_delete("alice").await.unwrap();
        assert!(matches!(
            registry.user_delete("alice").await,
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_group_with_projects_blocked() {
        let (registry, _) = test_registry();
        registry.group_create("acme-code").await.unwrap();
        registry.project_create("anvil-nextgen", "acme-code").await.unwrap();

        assert!(matches!(
            registry.group_delete("acme-code").await,
            Err(RegistryError::Blocked { .. })
        ));
        registry.project_delete("anvil-nextgen").await.unwrap();
        registry.group_delete("acme-code").await.unwrap();
    }

    #[tokio::test]
    async fn test_authenticate() {
        let (registry, _) = test_registry();
        registry.user_create("alice", "secret").await.unwrap();
        assert!(registry.user_authenticate("alice", "secret").await);
        assert!(!registry.user_authenticate("alice", "guess").await);
        assert!(!registry.user_authenticate("bob", "secret").await);
    }

    #[tokio::test]
    async fn test_user_label_reusable_after_delete() {
        let (registry, _) = test_registry();
        registry.user_create("alice", "secret").await.unwrap();
        assert!(matches!(
            registry.user_create("alice", "other").await,
            Err(RegistryError::Duplicate { .. })
        ));
        registry.user_delete("alice").await.unwrap();
        registry.user_create("alice", "other").await.unwrap();
        assert!(registry.user_authenticate("alice", "other").await);
    }
}
