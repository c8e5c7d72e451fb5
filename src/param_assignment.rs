// SPDX-License-Identifier: Apache-2.0

//! Substitution environment for lambda parameters.
//!
//! Bindings follow the recursion of the reducer: a parameter is assigned right
//! before a lambda body is reduced and unassigned right after. Assigning a
//! parameter twice, or unassigning one that is not bound, is a misuse and is
//! reported as an error rather than silently overwritten.

use crate::int_hash_map::IntToNodeMap;
use crate::int_hash_table::IntHashError;
use crate::node::{Node, NodeRef};
use crate::node_manager::NodeManager;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    AlreadyAssigned(NodeRef),
    NotAssigned(NodeRef),
    ArityMismatch { expected: usize, got: usize },
    NotAnApply(NodeRef),
}

impl std::fmt::Display for AssignmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentError::AlreadyAssigned(param) => {
                write!(f, "parameter {} is already assigned", param)
            }
            AssignmentError::NotAssigned(param) => {
                write!(f, "parameter {} is not assigned", param)
            }
            AssignmentError::ArityMismatch { expected, got } => write!(
                f,
                "arity mismatch: {} parameters, {} arguments",
                expected, got
            ),
            AssignmentError::NotAnApply(node) => write!(f, "{} is not an application", node),
        }
    }
}

impl std::error::Error for AssignmentError {}

impl From<IntHashError> for AssignmentError {
    fn from(e: IntHashError) -> Self {
        match e {
            IntHashError::DuplicateKey(key) => {
                AssignmentError::AlreadyAssigned(NodeRef { id: key as u32 })
            }
            IntHashError::MissingKey(key) => {
                AssignmentError::NotAssigned(NodeRef { id: key as u32 })
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ParamAssignments {
    current: IntToNodeMap,
    /// Parameters in binding order; the most recent binding is last.
    stack: Vec<NodeRef>,
}

impl ParamAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, param: NodeRef, value: NodeRef) -> Result<(), AssignmentError> {
        self.current.insert(param.key(), value)?;
        self.stack.push(param);
        Ok(())
    }

    /// Binds `params` positionally to `args`; the counts must agree. On
    /// failure no binding made by this call remains.
    pub fn assign_args(
        &mut self,
        params: &[NodeRef],
        args: &[NodeRef],
    ) -> Result<(), AssignmentError> {
        if params.len() != args.len() {
            return Err(AssignmentError::ArityMismatch {
                expected: params.len(),
                got: args.len(),
            });
        }
        for (i, (param, arg)) in params.iter().zip(args.iter()).enumerate() {
            if let Err(e) = self.assign(*param, *arg) {
                for bound in params[..i].iter().rev() {
                    self.unassign(*bound)?;
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Binds `params` to the actual arguments carried by the application
    /// node `app`.
    pub fn assign_many(
        &mut self,
        mgr: &NodeManager,
        params: &[NodeRef],
        app: NodeRef,
    ) -> Result<(), AssignmentError> {
        match mgr.get(app) {
            Node::Apply { args, .. } => self.assign_args(params, args),
            _ => Err(AssignmentError::NotAnApply(app)),
        }
    }

    pub fn unassign(&mut self, param: NodeRef) -> Result<NodeRef, AssignmentError> {
        let value = self.current.remove(param.key())?;
        if let Some(pos) = self.stack.iter().rposition(|p| *p == param) {
            self.stack.remove(pos);
        }
        Ok(value)
    }

    /// Unassigns `params` in reverse binding order.
    pub fn unassign_all(&mut self, params: &[NodeRef]) -> Result<(), AssignmentError> {
        for param in params.iter().rev() {
            self.unassign(*param)?;
        }
        Ok(())
    }

    pub fn current_assignment(&self, param: NodeRef) -> Option<NodeRef> {
        self.current.get(param.key()).copied()
    }

    pub fn is_assigned(&self, param: NodeRef) -> bool {
        self.current.contains(param.key())
    }

    /// Number of live bindings.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn bound_params(&self) -> &[NodeRef] {
        &self.stack
    }

    pub fn size_in_bytes(&self) -> usize {
        self.current.size_in_bytes() + self.stack.capacity() * std::mem::size_of::<NodeRef>()
    }
}
