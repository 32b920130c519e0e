use std::fmt;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, trace};

use crate::common::collections::HashMap;
use crate::model::NodeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Sent after every committed mutation. `config` is `None` once the node's
/// config has been deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChange {
    pub node_id: String,
    pub config: Option<NodeConfig>,
}

pub type ChangeCallback = Box<dyn FnMut(&ConfigChange) + Send>;

enum Sink {
    Callback(ChangeCallback),
    Channel(Sender<ConfigChange>),
}

struct Subscriber {
    id: SubscriptionId,
    sink: Sink,
}

impl Subscriber {
    /// Returns false once the subscriber can no longer be reached.
    fn deliver(&mut self, change: &ConfigChange) -> bool {
        match &mut self.sink {
            Sink::Callback(callback) => {
                callback(change);
                true
            }
            Sink::Channel(sender) => sender.send(change.clone()).is_ok(),
        }
    }
}

/// Listener lists keyed by node id, plus listeners for every node.
#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: u64,
    by_node: HashMap<String, Vec<Subscriber>>,
    all_nodes: Vec<Subscriber>,
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("nodes", &self.by_node.len())
            .field("all_nodes", &self.all_nodes.len())
            .finish()
    }
}

impl Subscribers {
    pub(crate) fn add_callback(
        &mut self,
        node_id: Option<&str>,
        callback: ChangeCallback,
    ) -> SubscriptionId {
        self.add(node_id, Sink::Callback(callback))
    }

    pub(crate) fn add_channel(
        &mut self,
        node_id: Option<&str>,
    ) -> (SubscriptionId, Receiver<ConfigChange>) {
        let (tx, rx) = unbounded();
        (self.add(node_id, Sink::Channel(tx)), rx)
    }

    fn add(&mut self, node_id: Option<&str>, sink: Sink) -> SubscriptionId {
        self.next_id += 1;
        let subscriber = Subscriber { id: SubscriptionId(self.next_id), sink };
        let id = subscriber.id;
        match node_id {
            Some(node_id) => self.by_node.entry(node_id.to_owned()).or_default().push(subscriber),
            None => self.all_nodes.push(subscriber),
        }
        trace!(?id, node = ?node_id, "added subscriber");
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.len();
        self.all_nodes.retain(|s| s.id != id);
        for list in self.by_node.values_mut() {
            list.retain(|s| s.id != id);
        }
        self.by_node.retain(|_, list| !list.is_empty());
        self.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.all_nodes.len() + self.by_node.values().map(Vec::len).sum::<usize>()
    }

    /// Delivers `change` to the node's listeners and then to the global ones,
    /// dropping channel subscribers whose receiver is gone.
    pub(crate) fn notify(&mut self, change: &ConfigChange) {
        if let Some(list) = self.by_node.get_mut(&change.node_id) {
            list.retain_mut(|s| s.deliver(change));
            if list.is_empty() {
                self.by_node.remove(&change.node_id);
            }
        }
        let before = self.all_nodes.len();
        self.all_nodes.retain_mut(|s| s.deliver(change));
        if self.all_nodes.len() != before {
            debug!(dropped = before - self.all_nodes.len(), "pruned disconnected subscribers");
        }
    }
}
