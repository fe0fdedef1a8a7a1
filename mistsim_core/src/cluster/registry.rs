//! Cluster membership arena.
//!
//! Every clustering node has one record holding its parent. A node is an
//! orchestrator iff its parent is itself. Roots are resolved by walking
//! parent links iteratively, bounded by the number of records, so a broken
//! forest is reported instead of looping.

use std::collections::{BTreeMap, BTreeSet};

use mistsim_env::NodeId;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ClusterRecord {
    parent: NodeId,

    /// Best weight this node saw on its last update.
    cached_weight: f64,
}

/// Parent links of every clustering node.
///
/// The single owner of cluster state: there are no global lists, every
/// protocol operation receives the registry explicitly.
#[derive(Debug, Clone, Default)]
pub struct ClusterRegistry {
    records: BTreeMap<NodeId, ClusterRecord>,

    /// Number of parent changes since creation.
    parent_changes: u64,
}

impl ClusterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry where every node starts as its own orchestrator.
    pub fn with_members(members: impl IntoIterator<Item = NodeId>) -> Self {
        let mut registry = Self::new();
        for id in members {
            registry.insert(id);
        }
        registry
    }

    /// Adds `id` as a singleton cluster. No-op if already present.
    pub fn insert(&mut self, id: NodeId) {
        self.records.entry(id).or_insert(ClusterRecord {
            parent: id,
            cached_weight: 0.0,
        });
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Member ids in ascending order.
    pub fn members(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.records.keys().copied()
    }

    pub fn parent_of(&self, id: NodeId) -> Result<NodeId, CoreError> {
        self.record(id).map(|r| r.parent)
    }

    pub fn is_orchestrator(&self, id: NodeId) -> bool {
        self.records.get(&id).map_or(false, |r| r.parent == id)
    }

    pub fn cached_weight(&self, id: NodeId) -> Result<f64, CoreError> {
        self.record(id).map(|r| r.cached_weight)
    }

    pub fn set_cached_weight(&mut self, id: NodeId, weight: f64) -> Result<(), CoreError> {
        self.record_mut(id)?.cached_weight = weight;
        Ok(())
    }

    pub fn parent_changes(&self) -> u64 {
        self.parent_changes
    }

    /// Walks up from `id`, returning the root and the number of hops.
    fn resolve(&self, id: NodeId) -> Result<(NodeId, usize), CoreError> {
        let mut current = id;
        for depth in 0..=self.records.len() {
            let parent = self.parent_of(current)?;
            if parent == current {
                return Ok((current, depth));
            }
            current = parent;
        }
        Err(CoreError::BrokenForest(id))
    }

    /// The root reached by following parent links from `id`.
    pub fn orchestrator_of(&self, id: NodeId) -> Result<NodeId, CoreError> {
        self.resolve(id).map(|(root, _)| root)
    }

    /// Hops between `id` and its orchestrator (zero for a root).
    pub fn depth_of(&self, id: NodeId) -> Result<usize, CoreError> {
        self.resolve(id).map(|(_, depth)| depth)
    }

    /// Returns true if `ancestor` lies on the parent chain of `id`
    /// (including `id` itself).
    pub fn is_in_subtree(&self, id: NodeId, ancestor: NodeId) -> Result<bool, CoreError> {
        let mut current = id;
        for _ in 0..=self.records.len() {
            if current == ancestor {
                return Ok(true);
            }
            let parent = self.parent_of(current)?;
            if parent == current {
                return Ok(false);
            }
            current = parent;
        }
        Err(CoreError::BrokenForest(id))
    }

    /// Every node sharing `id`'s orchestrator, in ascending order.
    pub fn cluster_members_of(&self, id: NodeId) -> Result<Vec<NodeId>, CoreError> {
        let root = self.orchestrator_of(id)?;
        let mut members = Vec::new();
        for m in self.members() {
            if self.orchestrator_of(m)? == root {
                members.push(m);
            }
        }
        Ok(members)
    }

    pub fn orchestrators(&self) -> Vec<NodeId> {
        self.records
            .iter()
            .filter(|(id, r)| r.parent == **id)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Orchestrator → members, both ordered.
    pub fn clusters(&self) -> Result<BTreeMap<NodeId, Vec<NodeId>>, CoreError> {
        let mut clusters: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for m in self.members() {
            clusters.entry(self.orchestrator_of(m)?).or_default().push(m);
        }
        Ok(clusters)
    }

    /// Makes `id` its own orchestrator. Its subtree moves with it.
    pub fn make_root(&mut self, id: NodeId) -> Result<bool, CoreError> {
        self.set_parent(id, id)
    }

    /// Points `id` at `parent`. Returns whether the link changed.
    ///
    /// Rejects links that would close a cycle, i.e. when `parent` is
    /// inside `id`'s own subtree.
    pub fn set_parent(&mut self, id: NodeId, parent: NodeId) -> Result<bool, CoreError> {
        self.record(parent)?;
        if self.parent_of(id)? == parent {
            return Ok(false);
        }
        if parent != id && self.is_in_subtree(parent, id)? {
            return Err(CoreError::BrokenForest(id));
        }
        self.record_mut(id)?.parent = parent;
        self.parent_changes += 1;
        Ok(true)
    }

    /// Verifies that every parent chain terminates at a root.
    ///
    /// Uses a visited set per walk, independent of `resolve`'s hop bound.
    pub fn check_forest(&self) -> Result<(), CoreError> {
        for start in self.members() {
            let mut visited = BTreeSet::new();
            let mut current = start;
            loop {
                if !visited.insert(current) {
                    return Err(CoreError::BrokenForest(start));
                }
                let parent = self.parent_of(current)?;
                if parent == current {
                    break;
                }
                current = parent;
            }
        }
        Ok(())
    }

    fn record(&self, id: NodeId) -> Result<&ClusterRecord, CoreError> {
        self.records.get(&id).ok_or(CoreError::UnknownNode(id))
    }

    fn record_mut(&mut self, id: NodeId) -> Result<&mut ClusterRecord, CoreError> {
        self.records.get_mut(&id).ok_or(CoreError::UnknownNode(id))
    }

    #[cfg(test)]
    pub(crate) fn force_parent(&mut self, id: NodeId, parent: NodeId) {
        if let Some(r) = self.records.get_mut(&id) {
            r.parent = parent;
        }
    }
}
