//! Dependency graph between session inputs and derived nodes
//!
//! Every derived value is produced by one [`Node`] that declares the signals
//! it reads and the signals it writes. [`schedule`] returns the nodes affected
//! by a change, in topological order, each at most once.

use std::collections::BTreeSet;

/// Observable values a node can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    Year,
    Weights,
    SumVar,
    By,
    AggFunc,
    IsCategorical,
    HouseholdLevel,
    AxisBindings,
    SearchTerm,
    /// Fully-loaded flag plus catalog
    Loaded,
    /// The summary artifact
    SumData,
}

/// Derived computations, see the sibling modules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    LoadGate,
    Dictionary,
    Summary,
    ChartOptions,
    Sanitize,
    Render,
}

impl Node {
    /// Nodes in dependency order
    pub const TOPOLOGICAL: [Node; 6] = [
        Node::LoadGate,
        Node::Dictionary,
        Node::Summary,
        Node::ChartOptions,
        Node::Sanitize,
        Node::Render,
    ];

    pub fn inputs(self) -> &'static [Signal] {
        match self {
            Node::LoadGate => &[Signal::Year, Signal::Weights],
            Node::Dictionary => &[Signal::SearchTerm, Signal::Loaded],
            Node::Summary => &[
                Signal::SumVar,
                Signal::By,
                Signal::AggFunc,
                Signal::IsCategorical,
                Signal::HouseholdLevel,
                Signal::Weights,
                Signal::Loaded,
            ],
            Node::ChartOptions => &[Signal::By, Signal::SumData, Signal::SumVar],
            Node::Sanitize => &[Signal::SumData, Signal::AxisBindings, Signal::SumVar],
            Node::Render => &[Signal::SumData, Signal::SumVar, Signal::AxisBindings],
        }
    }

    pub fn outputs(self) -> &'static [Signal] {
        match self {
            // Loading resets the variable and grouping selections
            Node::LoadGate => &[Signal::Loaded, Signal::SumVar, Signal::By],
            Node::Dictionary => &[],
            Node::Summary => &[Signal::SumData],
            Node::ChartOptions => &[],
            Node::Sanitize => &[Signal::AxisBindings],
            Node::Render => &[],
        }
    }
}

/// Nodes to rerun after `changed`, in topological order
pub fn schedule(changed: Signal) -> Vec<Node> {
    let mut dirty = BTreeSet::from([changed]);
    let mut plan = Vec::new();
    for node in Node::TOPOLOGICAL {
        if node.inputs().iter().any(|s| dirty.contains(s)) {
            plan.push(node);
            dirty.extend(node.outputs().iter().copied());
        }
    }
    plan
}
