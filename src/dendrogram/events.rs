//! Notifications sent to a display layer while the active set changes.

use super::NodeId;
use geo::Point;
use smallvec::SmallVec;

/// Node lists carried by split and merge events. Splits always produce at
/// least two nodes and usually only a handful.
pub type NodeList = SmallVec<[NodeId; 4]>;

/// A change to what should be drawn.
///
/// Within one evaluation, every `Deactivate` for a node is emitted before the
/// `Activate` of the node(s) replacing it.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterEvent {
    /// `node` became visible; `observations` lists the input indices it covers.
    Activate {
        node: NodeId,
        position: Point,
        observations: Vec<usize>,
    },
    /// `node` is no longer visible.
    Deactivate { node: NodeId, position: Point },
    /// `node` was replaced by its active descendants `into`.
    Split {
        node: NodeId,
        position: Point,
        into: NodeList,
    },
    /// The nodes in `from` were absorbed by their common ancestor `to`.
    MergeUp {
        from: NodeList,
        to: NodeId,
        position: Point,
    },
}

impl ClusterEvent {
    /// The node the event is primarily about.
    pub fn node(&self) -> NodeId {
        match self {
            Self::Activate { node, .. } | Self::Deactivate { node, .. } | Self::Split { node, .. } => *node,
            Self::MergeUp { to, .. } => *to,
        }
    }

    pub fn position(&self) -> Point {
        match self {
            Self::Activate { position, .. }
            | Self::Deactivate { position, .. }
            | Self::Split { position, .. }
            | Self::MergeUp { position, .. } => *position,
        }
    }
}

/// Receiver of [`ClusterEvent`]s.
///
/// Events are delivered synchronously from inside an evaluation. The
/// evaluator holds the active set mutably for the whole call, so a renderer
/// cannot trigger a nested evaluation on the same set.
pub trait Renderer {
    fn on_event(&mut self, event: ClusterEvent);
}

impl<F> Renderer for F
where
    F: FnMut(ClusterEvent),
{
    fn on_event(&mut self, event: ClusterEvent) {
        self(event)
    }
}

/// Renderer that records every event, mostly for tests and replay.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<ClusterEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ClusterEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Takes the recorded events, leaving the log empty.
    pub fn drain(&mut self) -> Vec<ClusterEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn activated(&self) -> Vec<NodeId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ClusterEvent::Activate { node, .. } => Some(*node),
                _ => None,
            })
            .collect()
    }

    pub fn deactivated(&self) -> Vec<NodeId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ClusterEvent::Deactivate { node, .. } => Some(*node),
                _ => None,
            })
            .collect()
    }
}

impl Renderer for EventLog {
    fn on_event(&mut self, event: ClusterEvent) {
        self.events.push(event);
    }
}
