// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};

use crate::beta::{BetaReducer, ReductionMode, ReductionStats, contains_redex};
use crate::node_manager::{NodeManager, NodeManagerOptions};
use crate::node_text::{parse_text, to_text};
use crate::topo::cone_size;

pub struct Options {
    pub mode: ReductionMode,
    pub fold: bool,
}

#[derive(Debug)]
pub struct ReduceOutput {
    /// Text form of the reduced root.
    pub text: String,
    pub stats: ReductionStats,
    pub is_normal_form: bool,
    pub input_nodes: usize,
    pub output_nodes: usize,
}

/// Parses `text`, reduces its root in the requested mode and prints the
/// result.
pub fn process_text(text: &str, options: &Options) -> Result<ReduceOutput> {
    let node_options = if options.fold {
        NodeManagerOptions::opt()
    } else {
        NodeManagerOptions::no_opt()
    };
    let mut mgr = NodeManager::new(node_options);
    let root = parse_text(&mut mgr, text)?;
    let input_nodes = cone_size(root, &mgr);
    log::info!(
        "parsed root {} with {} nodes; reducing in {} mode",
        root,
        input_nodes,
        options.mode
    );

    let mut reducer = BetaReducer::new();
    let reduced = reducer
        .reduce(&mut mgr, root, options.mode)
        .with_context(|| format!("{} reduction of {} failed", options.mode, root))?;
    let output_nodes = cone_size(reduced, &mgr);
    log::info!(
        "reduced to {} with {} nodes: {:?}",
        reduced,
        output_nodes,
        reducer.last_stats()
    );
    Ok(ReduceOutput {
        text: to_text(&mgr, reduced),
        stats: reducer.last_stats().clone(),
        is_normal_form: !contains_redex(&mgr, reduced),
        input_nodes,
        output_nodes,
    })
}

pub fn process_path(path: &std::path::Path, options: &Options) -> Result<ReduceOutput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    process_text(&text, options).with_context(|| format!("while processing {}", path.display()))
}
