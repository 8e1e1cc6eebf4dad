use std::collections::BTreeSet;

use tracing::{info, instrument};

use super::Registry;
use crate::error::{RegistryError, RegistryResult};
use crate::model::Project;

impl Registry {
    #[instrument(skip(self))]
    pub async fn project_create(&self, label: &str, group: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let group_id = state.graph.groups.require(group)?;
        state.graph.add_project(Project {
            label: label.to_string(),
            group: group_id,
            nodes: BTreeSet::new(),
            networks: BTreeSet::new(),
            headnode: None,
        })?;
        info!(project = label, group, "Project created");
        Ok(())
    }

    /// Deletes a project with no connected nodes, networks or headnode.
    #[instrument(skip(self))]
    pub async fn project_delete(&self, label: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let graph = &state.graph;
        let project_id = graph.projects.require(label)?;
        let project = graph.projects.at(project_id)?;

        if !project.nodes.is_empty() {
            let nodes = graph.nodes.labels(&project.nodes).join(", ");
            return Err(RegistryError::blocked(
                "project",
                label,
                format!("nodes {nodes} are still connected"),
            ));
        }
        if !project.networks.is_empty() {
            let networks = graph.networks.labels(&project.networks).join(", ");
            return Err(RegistryError::blocked(
                "project",
                label,
                format!("still owns networks {networks}"),
            ));
        }
        if let Some(headnode) = project.headnode {
            return Err(RegistryError::blocked(
                "project",
                label,
                format!("still owns headnode {}", graph.headnodes.at(headnode)?.label),
            ));
        }

        state.graph.remove_project(project_id)?;
        info!(project = label, "Project deleted");
        Ok(())
    }

    /// Connects a free node to a project.
    ///
    /// A node already owned by any project is a `Duplicate`, including the
    /// project it is being connected to again.
    #[instrument(skip(self))]
    pub async fn project_connect_node(&self, project: &str, node: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let project_id = state.graph.projects.require(project)?;
        let node_id = state.graph.nodes.require(node)?;
        state.graph.link_node(project_id, node_id)?;
        info!(project, node, "Node connected to project");
        Ok(())
    }

    /// Returns a node to the free pool.
    ///
    /// Refused while any of the node's nics is attached to a network, so an
    /// attached nic always belongs to a node of the network's project.
    #[instrument(skip(self))]
    pub async fn project_detach_node(&self, project: &str, node: &str) -> RegistryResult<()> {
        let mut state = self.state.write().await;
        let graph = &state.graph;
        let project_id = graph.projects.require(project)?;
        let node_id = graph.nodes.require(node)?;
        let entity = graph.nodes.at(node_id)?;
        if entity.project != Some(project_id) {
            return Err(RegistryError::not_found(
                "project connection",
                format!("{node} in {project}"),
            ));
        }

        let mut attached = Vec::new();
        for nic in &entity.nics {
            let nic = graph.nics.at(*nic)?;
            if nic.attachment.is_some() {
                attached.push(nic.label.clone());
            }
        }
        if !attached.is_empty() {
            attached.sort();
            return Err(RegistryError::blocked(
                "project connection",
                format!("{node} in {project}"),
                format!("nics {} are attached to networks", attached.join(", ")),
            ));
        }

        state.graph.unlink_node(project_id, node_id)?;
        info!(project, node, "Node detached from project");
        Ok(())
    }
}
