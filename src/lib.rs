// SPDX-License-Identifier: Apache-2.0

pub mod beta;
pub mod eval;
pub mod int_hash_map;
pub mod int_hash_table;
pub mod node;
pub mod node_manager;
pub mod node_text;
pub mod param_assignment;
pub mod process_path;
pub mod test_utils;
pub mod topo;
