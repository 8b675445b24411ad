use log::debug;

use crate::annotations::Annotations;
use crate::fully_qualified_name::FullyQualifiedName;
use crate::message_graph::MessageGraph;
use crate::unwrap_index::GlobalUnwrapIndex;
use crate::walker::{MessageId, Schema};
use crate::Config;

/// The context providing all the global information needed to plan a schema.
///
/// A `Context` is built once per run, before any plan is requested: the walked schema, its
/// decoded annotations, the global unwrap index over every loaded file and the nesting graph.
/// Nothing in it changes afterwards.
#[derive(Debug)]
pub struct Context {
    config: Config,
    schema: Schema,
    annotations: Annotations,
    unwrap_index: GlobalUnwrapIndex,
    message_graph: MessageGraph,
    timestamp: Option<MessageId>,
}

impl Context {
    pub fn new(config: Config, schema: Schema) -> Self {
        let annotations = Annotations::extract(&schema, config.extension_package_name());
        let unwrap_index = GlobalUnwrapIndex::build(&schema, &annotations);
        debug!(
            "indexed {} unwrap wrapper(s) across {} file(s)",
            unwrap_index.len(),
            schema.file_count()
        );
        let message_graph = MessageGraph::new(&schema);
        let timestamp = schema.lookup_message(&FullyQualifiedName::from_type_name(
            config.timestamp_type_name(),
        ));
        Self {
            config,
            schema,
            annotations,
            unwrap_index,
            message_graph,
            timestamp,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn unwrap_index(&self) -> &GlobalUnwrapIndex {
        &self.unwrap_index
    }

    pub fn message_graph(&self) -> &MessageGraph {
        &self.message_graph
    }

    /// Returns `true` if `message` is the configured well-known timestamp type.
    pub fn is_timestamp(&self, message: MessageId) -> bool {
        self.timestamp == Some(message)
    }
}
