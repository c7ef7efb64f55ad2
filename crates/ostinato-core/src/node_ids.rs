//! Client-side view of the node tree.
//!
//! The engine mutates its graph asynchronously; this table tracks which node
//! identifiers are live, what they are and where they sit, so requests can
//! be validated before they are encoded and so freeing a group can release
//! the identifiers of everything below it.

use std::collections::HashMap;

use crate::command::{AddAction, NodePlacement};
use crate::error::{Error, Result};
use crate::ids::{GroupId, IdAllocator, NodeId, ResourceId, SynthId, ROOT_GROUP};
use crate::protocol::Time;

/// What a live node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Synth { uri: String },
    Group,
}

#[derive(Debug, Clone)]
struct NodeEntry {
    kind: NodeKind,
    parent: Option<GroupId>,
    children: Vec<NodeId>,
}

/// Node identifier allocator with tree bookkeeping.
#[derive(Debug, Clone)]
pub struct NodeIdAllocator {
    ids: IdAllocator<NodeId>,
    nodes: HashMap<NodeId, NodeEntry>,
    /// Nodes freed by a scheduled command, released once their time passes.
    retiring: Vec<(Time, NodeId)>,
}

impl NodeIdAllocator {
    /// `min` must be above the root group id.
    pub fn new(min: u32, max: u32) -> Self {
        let min = min.max(ROOT_GROUP.id().0 + 1);
        let mut nodes = HashMap::new();
        nodes.insert(
            ROOT_GROUP.id(),
            NodeEntry {
                kind: NodeKind::Group,
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            ids: IdAllocator::new(min, max.max(min)),
            nodes,
            retiring: Vec::new(),
        }
    }

    pub fn allocate_synth(&mut self, uri: &str, placement: NodePlacement) -> Result<SynthId> {
        let id = self.insert(
            NodeKind::Synth {
                uri: uri.to_string(),
            },
            placement,
        )?;
        Ok(SynthId(id))
    }

    pub fn allocate_group(&mut self, placement: NodePlacement) -> Result<GroupId> {
        let id = self.insert(NodeKind::Group, placement)?;
        Ok(GroupId(id))
    }

    fn insert(&mut self, kind: NodeKind, placement: NodePlacement) -> Result<NodeId> {
        let (parent, position) = self.resolve(placement)?;
        let id = self.ids.allocate()?;
        if let Some(entry) = self.nodes.get_mut(&parent.id()) {
            let position = position.min(entry.children.len());
            entry.children.insert(position, id);
        }
        self.nodes.insert(
            id,
            NodeEntry {
                kind,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Parent group and child position for a placement.
    fn resolve(&self, placement: NodePlacement) -> Result<(GroupId, usize)> {
        let target = self
            .nodes
            .get(&placement.target)
            .ok_or(Error::UnknownNode(placement.target))?;

        if placement.action.targets_group() {
            if target.kind != NodeKind::Group {
                return Err(Error::InvalidCommand(format!(
                    "placement target {} is not a group",
                    placement.target
                )));
            }
            let position = match placement.action {
                AddAction::HeadOfGroup => 0,
                _ => target.children.len(),
            };
            return Ok((GroupId(placement.target), position));
        }

        let parent = target.parent.ok_or_else(|| {
            Error::InvalidCommand("cannot place a node beside the root group".into())
        })?;
        let siblings = &self
            .nodes
            .get(&parent.id())
            .ok_or(Error::UnknownNode(parent.id()))?
            .children;
        let index = siblings
            .iter()
            .position(|n| *n == placement.target)
            .unwrap_or(siblings.len());
        let position = match placement.action {
            AddAction::Before => index,
            _ => index + 1,
        };
        Ok((parent, position))
    }

    /// Release a node and, for groups, every descendant.
    ///
    /// Returns the released identifiers, parent first.
    pub fn free(&mut self, node: NodeId) -> Result<Vec<NodeId>> {
        if node == ROOT_GROUP.id() {
            return Err(Error::InvalidCommand("the root group cannot be freed".into()));
        }
        let Some(entry) = self.nodes.get(&node) else {
            // Reports out-of-range or not-allocated with the right kind.
            self.ids.free(node)?;
            return Err(Error::IdNotAllocated {
                kind: NodeId::KIND,
                id: node.0,
            });
        };

        if let Some(parent) = entry.parent {
            if let Some(p) = self.nodes.get_mut(&parent.id()) {
                p.children.retain(|c| *c != node);
            }
        }

        let mut released = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(entry) = self.nodes.remove(&id) {
                stack.extend(entry.children.iter().rev());
                self.ids.free(id)?;
                released.push(id);
            }
        }
        if !self.retiring.is_empty() {
            self.retiring.retain(|(_, n)| !released.contains(n));
        }
        Ok(released)
    }

    /// Schedule a release at `time`. The node stays addressable until then,
    /// so its identifier cannot be handed out while the engine still has it.
    pub fn retire(&mut self, node: NodeId, time: Time) -> Result<()> {
        if node == ROOT_GROUP.id() {
            return Err(Error::InvalidCommand("the root group cannot be freed".into()));
        }
        if !self.is_live(node) || self.is_retiring(node) {
            tracing::error!(node = node.0, "retire of a node that is not live");
            return Err(Error::IdNotAllocated {
                kind: NodeId::KIND,
                id: node.0,
            });
        }
        self.retiring.push((time, node));
        Ok(())
    }

    pub fn is_retiring(&self, node: NodeId) -> bool {
        self.retiring.iter().any(|(_, n)| *n == node)
    }

    /// Release every retiring node whose time is at or before `now`.
    ///
    /// Returns the number of identifiers released.
    pub fn reclaim(&mut self, now: Time) -> usize {
        if self.retiring.is_empty() {
            return 0;
        }
        let mut due = Vec::new();
        self.retiring.retain(|&(time, node)| {
            if time <= now {
                due.push(node);
                false
            } else {
                true
            }
        });
        let mut released = 0;
        for node in due {
            // A retired group may already have taken this node with it.
            if self.is_live(node) {
                released += self.free(node).map(|ids| ids.len()).unwrap_or(0);
            }
        }
        released
    }

    pub fn is_live(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.nodes.get(&node).map(|e| &e.kind)
    }

    pub fn synth_uri(&self, synth: SynthId) -> Option<&str> {
        match self.kind(synth.id()) {
            Some(NodeKind::Synth { uri }) => Some(uri.as_str()),
            _ => None,
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<GroupId> {
        self.nodes.get(&node).and_then(|e| e.parent)
    }

    pub fn children(&self, group: GroupId) -> &[NodeId] {
        self.nodes
            .get(&group.id())
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    /// Live nodes, not counting the root group.
    pub fn live_count(&self) -> usize {
        self.ids.live_count()
    }

    pub fn available(&self) -> usize {
        self.ids.available()
    }

    pub fn range(&self) -> (u32, u32) {
        (self.ids.min(), self.ids.max())
    }
}

impl Default for NodeIdAllocator {
    fn default() -> Self {
        Self::new(1, 1023)
    }
}
