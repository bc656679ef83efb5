//! Directed flow of nodes keyed by transition action.
//!
//! The flow is a small static multigraph: an edge maps
//! `(source node, action)` to the next node, and a missing edge terminates
//! the run. This is deliberately not a general DAG framework; `Flow::run`
//! is a loop.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::instrument;

use crate::event_bus::Logger;
use crate::node::{DynNode, Node, NodeContext};
use crate::snapshot::SnapshotWriter;
use crate::state::SharedContext;
use crate::types::{Action, NodeKind};

#[derive(Debug, Error, Diagnostic)]
pub enum FlowError {
    #[error("no start node configured")]
    #[diagnostic(code(alphasolve::flow::no_start))]
    NoStart,

    #[error("edge references unregistered node: {kind}")]
    #[diagnostic(
        code(alphasolve::flow::unknown_node),
        help("Register the node with add_node before wiring edges to it.")
    )]
    UnknownNode { kind: NodeKind },
}

/// Fluent builder for a [`Flow`].
#[derive(Default)]
pub struct FlowBuilder {
    nodes: FxHashMap<NodeKind, Arc<dyn DynNode>>,
    edges: FxHashMap<(NodeKind, Action), NodeKind>,
    start: Option<NodeKind>,
}

impl FlowBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add_node<N>(mut self, kind: NodeKind, node: N) -> Self
    where
        N: Node + 'static,
    {
        self.nodes.insert(kind, Arc::new(node));
        self
    }

    /// Route `action` out of `from` into `to`.
    #[must_use]
    pub fn on(mut self, from: NodeKind, action: Action, to: NodeKind) -> Self {
        self.edges.insert((from, action), to);
        self
    }

    #[must_use]
    pub fn start(mut self, kind: NodeKind) -> Self {
        self.start = Some(kind);
        self
    }

    pub fn build(self) -> Result<Flow, FlowError> {
        let start = self.start.ok_or(FlowError::NoStart)?;
        if !self.nodes.contains_key(&start) {
            return Err(FlowError::UnknownNode { kind: start });
        }
        for ((from, _), to) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(FlowError::UnknownNode { kind: *from });
            }
            if !self.nodes.contains_key(to) {
                return Err(FlowError::UnknownNode { kind: *to });
            }
        }
        Ok(Flow {
            nodes: self.nodes,
            edges: self.edges,
            start,
        })
    }
}

/// A compiled workflow graph.
pub struct Flow {
    nodes: FxHashMap<NodeKind, Arc<dyn DynNode>>,
    edges: FxHashMap<(NodeKind, Action), NodeKind>,
    start: NodeKind,
}

impl Flow {
    /// Run the flow to termination.
    ///
    /// Each step executes the current node's three phases and follows the
    /// returned action's edge. A node failure never escapes the flow: a
    /// `post` error is logged and the run ends with the shared context in
    /// whatever state the completed nodes left it.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        shared: &mut SharedContext,
        logger: &Logger,
        snapshots: Option<&SnapshotWriter>,
    ) {
        let mut current = self.start;
        loop {
            // Builder validation guarantees the lookup; bail rather than
            // panic if that invariant is ever broken.
            let Some(node) = self.nodes.get(&current) else {
                logger.error(current.as_str(), "node not registered; terminating flow");
                break;
            };
            let ctx = NodeContext::new(current, logger.clone());

            let action = match node.run(shared, &ctx).await {
                Ok(action) => action,
                Err(err) => {
                    logger.error(
                        current.as_str(),
                        format!("event=post_exception error={err}; terminating flow"),
                    );
                    break;
                }
            };
            logger.info(
                current.as_str(),
                format!("event=node_done action={action}"),
            );
            if let Some(writer) = snapshots {
                if let Err(err) = writer.append(shared, current, action.as_str()) {
                    logger.warning(current.as_str(), format!("snapshot write failed: {err}"));
                }
            }

            match self.edges.get(&(current, action)) {
                Some(next) => current = *next,
                None => {
                    logger.info(
                        current.as_str(),
                        format!("event=flow_end last_action={action}"),
                    );
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Counts visits and emits a fixed action sequence.
    struct Scripted {
        visits: Arc<AtomicU32>,
        actions: Vec<Action>,
    }

    #[async_trait]
    impl Node for Scripted {
        type Prep = ();
        type Exec = usize;

        async fn prep(&self, _: &SharedContext, _: &NodeContext) -> Result<(), NodeError> {
            Ok(())
        }

        async fn exec(&self, _: &(), _: &NodeContext) -> Result<usize, NodeError> {
            Ok(self.visits.fetch_add(1, Ordering::SeqCst) as usize)
        }

        async fn post(
            &self,
            _: &mut SharedContext,
            _: (),
            visit: usize,
            _: &NodeContext,
        ) -> Result<Action, NodeError> {
            Ok(self.actions[visit.min(self.actions.len() - 1)])
        }
    }

    #[tokio::test]
    async fn missing_edge_terminates() {
        let visits = Arc::new(AtomicU32::new(0));
        let flow = FlowBuilder::new()
            .add_node(
                NodeKind::Solver,
                Scripted {
                    visits: visits.clone(),
                    actions: vec![Action::ExitOnError, Action::Done],
                },
            )
            .on(NodeKind::Solver, Action::ExitOnError, NodeKind::Solver)
            .start(NodeKind::Solver)
            .build()
            .unwrap();

        let mut shared = SharedContext::private("p", None);
        flow.run(&mut shared, &Logger::disabled(), None).await;
        // First visit loops back via the error edge, second hits Done which
        // has no edge and terminates.
        assert_eq!(visits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn build_rejects_dangling_edges() {
        let err = FlowBuilder::new()
            .add_node(
                NodeKind::Solver,
                Scripted {
                    visits: Arc::new(AtomicU32::new(0)),
                    actions: vec![Action::Done],
                },
            )
            .on(NodeKind::Solver, Action::Done, NodeKind::Verifier)
            .start(NodeKind::Solver)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, FlowError::UnknownNode { kind: NodeKind::Verifier }));
    }

    #[test]
    fn build_requires_start() {
        assert!(matches!(
            FlowBuilder::new().build().err().unwrap(),
            FlowError::NoStart
        ));
    }
}
