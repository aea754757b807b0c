// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow Registry & Runtime (C5) — a process-wide, read-only-after-init
//! map from workflow-type name to a factory yielding a
//! [`Workflow`] (spec.md §4.3, §9 "Dynamic dispatch of workflows").

use crate::node::Node;
use crate::nodes::{BuildNode, InstallDependenciesNode, NoopNode, PrepNode, ProvisionContainerNode, PushNode, SelectNode};
use devteam_adapters::ContainerAdapter;
use std::collections::HashMap;
use std::sync::Arc;

/// An ordered sequence of [`Node`]s (spec.md §9: "a workflow is a slice of
/// nodes").
pub type Workflow = Vec<Box<dyn Node>>;

pub const DEVTEAM_AUTOMATION: &str = "DEVTEAM_AUTOMATION";
pub const PLACEHOLDER: &str = "PLACEHOLDER";

/// Lookup is by exact, case-sensitive name. Built once via
/// [`WorkflowRegistry::with_defaults`] and never mutated after (spec.md
/// §9 "Global mutable state": the registry is one of three process-wide
/// pieces, and this one is immutable).
pub struct WorkflowRegistry {
    factories: HashMap<&'static str, Arc<dyn Fn() -> Workflow + Send + Sync>>,
}

impl WorkflowRegistry {
    /// Registers `DEVTEAM_AUTOMATION` and `PLACEHOLDER`, parameterized by
    /// the container adapter the execution nodes need.
    pub fn with_defaults<A>(adapter: Arc<A>) -> Self
    where
        A: ContainerAdapter + 'static,
    {
        let mut factories: HashMap<&'static str, Arc<dyn Fn() -> Workflow + Send + Sync>> = HashMap::new();

        factories.insert(PLACEHOLDER, Arc::new(|| -> Workflow { vec![Box::new(NoopNode)] }));

        factories.insert(DEVTEAM_AUTOMATION, {
            let adapter = adapter.clone();
            Arc::new(move || -> Workflow {
                vec![
                    Box::new(SelectNode),
                    Box::new(PrepNode),
                    Box::new(ProvisionContainerNode::new(adapter.clone())),
                    Box::new(InstallDependenciesNode::new(adapter.clone())),
                    Box::new(BuildNode::new(adapter.clone())),
                    Box::new(PushNode::new(adapter.clone())),
                ]
            })
        });

        Self { factories }
    }

    /// Resolve `workflow_type`, falling back to `PLACEHOLDER` if unknown
    /// (spec.md §4.2 step 2).
    pub fn resolve(&self, workflow_type: &str) -> Workflow {
        let factory = self.factories.get(workflow_type).or_else(|| self.factories.get(PLACEHOLDER));
        match factory {
            Some(factory) => factory(),
            None => Vec::new(),
        }
    }
}
