use std::collections::HashMap;

use petgraph::algo::has_path_connecting;
use petgraph::graph::NodeIndex;
use petgraph::Graph;

use crate::walker::{FieldId, MessageId, Schema};

/// `MessageGraph` builds a graph of messages whose edges correspond to nesting.
/// The goal is to recognize when message types are recursively nested, so
/// that the plans of such fields can be marked as boxed.
#[derive(Debug)]
pub struct MessageGraph {
    index: HashMap<MessageId, NodeIndex>,
    graph: Graph<MessageId, ()>,
}

impl MessageGraph {
    pub fn new(schema: &Schema) -> MessageGraph {
        let mut msg_graph = MessageGraph {
            index: HashMap::new(),
            graph: Graph::new(),
        };

        for (id, message) in schema.messages() {
            msg_graph.add_message(schema, id, &message.fields);
        }

        msg_graph
    }

    fn get_or_insert_index(&mut self, message: MessageId) -> NodeIndex {
        let MessageGraph {
            ref mut index,
            ref mut graph,
        } = *self;
        *index
            .entry(message)
            .or_insert_with(|| graph.add_node(message))
    }

    /// Adds an edge for every non-repeated message field.
    /// Repeated and map fields already sit behind a collection, so a
    /// recursive reference through them needs no indirection.
    fn add_message(&mut self, schema: &Schema, message: MessageId, fields: &[FieldId]) {
        let msg_index = self.get_or_insert_index(message);

        for field in fields.iter().map(|id| schema.field(*id)) {
            if field.is_repeated() {
                continue;
            }
            if let Some(target) = field.message_target() {
                let field_index = self.get_or_insert_index(target);
                self.graph.add_edge(msg_index, field_index, ());
            }
        }
    }

    /// Returns true if message type `inner` is nested in message type `outer`.
    pub fn is_nested(&self, outer: MessageId, inner: MessageId) -> bool {
        let outer = match self.index.get(&outer) {
            Some(outer) => *outer,
            None => return false,
        };
        let inner = match self.index.get(&inner) {
            Some(inner) => *inner,
            None => return false,
        };

        has_path_connecting(&self.graph, outer, inner, None)
    }

    /// Returns `true` if the singular message field `field` refers back to its own message.
    pub fn is_recursive_field(&self, schema: &Schema, field: FieldId) -> bool {
        let field = schema.field(field);
        match field.message_target() {
            Some(target) if !field.is_repeated() => self.is_nested(target, field.message),
            _ => false,
        }
    }
}
