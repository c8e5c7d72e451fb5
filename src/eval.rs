// SPDX-License-Identifier: Apache-2.0

//! Concrete evaluation of bit-vector nodes.
//!
//! Applications are evaluated by extending a parameter environment, without
//! going through the beta-reduction engine, so the evaluator can serve as an
//! independent oracle for it.

use std::collections::HashMap;

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

use crate::node::{Node, NodeRef, Op, Sort, width_mask};
use crate::node_manager::NodeManager;

/// Computes `op` over concrete operand values of the given widths.
pub fn eval_op(op: Op, values: &[u64], widths: &[u32]) -> u64 {
    let mask = width_mask(widths[0]);
    match op {
        Op::Not => !values[0] & mask,
        Op::Neg => values[0].wrapping_neg() & mask,
        Op::And => values[0] & values[1],
        Op::Or => values[0] | values[1],
        Op::Xor => values[0] ^ values[1],
        Op::Add => values[0].wrapping_add(values[1]) & mask,
        Op::Mul => values[0].wrapping_mul(values[1]) & mask,
        Op::Eq => (values[0] == values[1]) as u64,
        Op::Ult => (values[0] < values[1]) as u64,
        Op::Concat => (values[0] << widths[1]) | values[1],
        Op::Slice { hi, lo } => (values[0] >> lo) & width_mask(hi - lo + 1),
        Op::Cond => {
            if values[0] != 0 {
                values[1]
            } else {
                values[2]
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    MissingInput(NodeRef),
    UnboundParam(NodeRef),
    NotBitVector(NodeRef),
    NotAFunction(NodeRef),
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::MissingInput(node) => write!(f, "no input value for variable {}", node),
            EvalError::UnboundParam(node) => write!(f, "parameter {} is not bound", node),
            EvalError::NotBitVector(node) => write!(f, "{} does not have bit-vector sort", node),
            EvalError::NotAFunction(node) => write!(f, "{} can not be called", node),
        }
    }
}

impl std::error::Error for EvalError {}

/// Deterministic interpretation of uninterpreted functions: explicit entries
/// first, otherwise a pseudo-random value derived from the function and its
/// arguments.
#[derive(Debug, Clone, Default)]
pub struct UfModel {
    seed: u64,
    entries: HashMap<(NodeRef, Vec<u64>), u64>,
}

impl UfModel {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            entries: HashMap::new(),
        }
    }

    pub fn set(&mut self, uf: NodeRef, args: Vec<u64>, value: u64) {
        self.entries.insert((uf, args), value);
    }

    pub fn call(&self, uf: NodeRef, args: &[u64], width: u32) -> u64 {
        if let Some(value) = self.entries.get(&(uf, args.to_vec())) {
            return *value & width_mask(width);
        }
        let mut h = self.seed ^ (uf.id as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        for arg in args {
            h = (h ^ arg).wrapping_mul(0xbf58_476d_1ce4_e5b9).rotate_left(29);
        }
        let mut rng = Pcg64Mcg::seed_from_u64(h);
        rng.next_u64() & width_mask(width)
    }
}

pub struct Evaluator<'a> {
    mgr: &'a NodeManager,
    inputs: &'a HashMap<NodeRef, u64>,
    ufs: &'a UfModel,
    /// Values of parameter-free nodes; these do not depend on the environment.
    closed: HashMap<NodeRef, u64>,
    env: Vec<(NodeRef, u64)>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        mgr: &'a NodeManager,
        inputs: &'a HashMap<NodeRef, u64>,
        ufs: &'a UfModel,
    ) -> Self {
        Self {
            mgr,
            inputs,
            ufs,
            closed: HashMap::new(),
            env: Vec::new(),
        }
    }

    pub fn eval(&mut self, node: NodeRef) -> Result<u64, EvalError> {
        let mgr = self.mgr;
        if mgr.sort(node).is_fun() {
            return Err(EvalError::NotBitVector(node));
        }
        let closed = !mgr.is_parameterized(node);
        if closed {
            if let Some(value) = self.closed.get(&node) {
                return Ok(*value);
            }
        }
        let value = match mgr.get(node) {
            Node::Const { value, .. } => *value,
            Node::Var { .. } => *self
                .inputs
                .get(&node)
                .ok_or(EvalError::MissingInput(node))?,
            Node::Param { .. } => self
                .env
                .iter()
                .rev()
                .find(|(param, _)| *param == node)
                .map(|(_, value)| *value)
                .ok_or(EvalError::UnboundParam(node))?,
            Node::Op {
                op: Op::Cond,
                operands,
            } => {
                if self.eval(operands[0])? != 0 {
                    self.eval(operands[1])?
                } else {
                    self.eval(operands[2])?
                }
            }
            Node::Op { op, operands } => {
                let values = operands
                    .iter()
                    .map(|o| self.eval(*o))
                    .collect::<Result<Vec<u64>, EvalError>>()?;
                let widths: Vec<u32> = operands
                    .iter()
                    .map(|o| mgr.sort(*o).bit_width().unwrap_or(0))
                    .collect();
                eval_op(*op, &values, &widths)
            }
            Node::Apply { fun, args } => {
                let values = self.eval_args(args)?;
                self.call(*fun, values)?
            }
            Node::Lambda { .. } => return Err(EvalError::NotBitVector(node)),
        };
        if closed {
            self.closed.insert(node, value);
        }
        Ok(value)
    }

    fn eval_args(&mut self, args: &[NodeRef]) -> Result<Vec<u64>, EvalError> {
        args.iter().map(|a| self.eval(*a)).collect()
    }

    /// Calls the function-sorted node `fun` with already evaluated arguments.
    fn call(&mut self, fun: NodeRef, args: Vec<u64>) -> Result<u64, EvalError> {
        let mgr = self.mgr;
        match mgr.get(fun) {
            Node::Lambda { param, body } => {
                let Some((first, rest)) = args.split_first() else {
                    return Err(EvalError::NotBitVector(fun));
                };
                self.env.push((*param, *first));
                let result = if rest.is_empty() {
                    self.eval(*body)
                } else {
                    self.call(*body, rest.to_vec())
                };
                self.env.pop();
                result
            }
            Node::Var {
                sort: Sort::Fun { codomain, .. },
                ..
            } => Ok(self.ufs.call(fun, &args, *codomain)),
            Node::Apply {
                fun: inner,
                args: inner_args,
            } => {
                let mut all = self.eval_args(inner_args)?;
                all.extend(args);
                self.call(*inner, all)
            }
            Node::Op {
                op: Op::Cond,
                operands,
            } => {
                if self.eval(operands[0])? != 0 {
                    self.call(operands[1], args)
                } else {
                    self.call(operands[2], args)
                }
            }
            _ => Err(EvalError::NotAFunction(fun)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_manager::NodeManagerOptions;
    use test_case::test_case;

    #[test_case(Op::Add, &[0xff, 0x01], &[8, 8], 0x00; "add wraps")]
    #[test_case(Op::Neg, &[1], &[4], 0xf; "neg")]
    #[test_case(Op::Not, &[0b1010], &[4], 0b0101; "not")]
    #[test_case(Op::Mul, &[0x10, 0x10], &[8, 8], 0x00; "mul wraps")]
    #[test_case(Op::Concat, &[0b10, 0b011], &[2, 3], 0b10011; "concat")]
    #[test_case(Op::Slice { hi: 5, lo: 2 }, &[0b111100], &[8], 0b1111; "slice")]
    #[test_case(Op::Ult, &[3, 4], &[8, 8], 1; "ult")]
    #[test_case(Op::Cond, &[0, 7, 9], &[1, 8, 8], 9; "cond")]
    fn test_eval_op(op: Op, values: &[u64], widths: &[u32], want: u64) {
        assert_eq!(eval_op(op, values, widths), want);
    }

    #[test]
    fn test_eval_lambda_application() {
        let mut mgr = NodeManager::new(NodeManagerOptions::no_opt());
        let x = mgr.mk_param("x", 8).unwrap();
        let y = mgr.mk_param("y", 8).unwrap();
        let body = mgr.mk_op(Op::Mul, &[x, y]).unwrap();
        let f = mgr.mk_fun(&[x, y], body).unwrap();
        let a = mgr.mk_var("a", 8).unwrap();
        let three = mgr.mk_const(3, 8).unwrap();
        let partial = mgr.mk_apply(f, &[a]).unwrap();
        let app = mgr.mk_apply(partial, &[three]).unwrap();

        let inputs = HashMap::from([(a, 5)]);
        let ufs = UfModel::new(0);
        let mut evaluator = Evaluator::new(&mgr, &inputs, &ufs);
        assert_eq!(evaluator.eval(app), Ok(15));
    }

    #[test]
    fn test_eval_uf_is_deterministic() {
        let mut mgr = NodeManager::default();
        let f = mgr.mk_uf("f", &[8, 8], 4).unwrap();
        let a = mgr.mk_var("a", 8).unwrap();
        let app = mgr.mk_apply(f, &[a, a]).unwrap();
        let partial = mgr.mk_apply(f, &[a]).unwrap();
        let curried = mgr.mk_apply(partial, &[a]).unwrap();

        let inputs = HashMap::from([(a, 9)]);
        let mut ufs = UfModel::new(1);
        let mut evaluator = Evaluator::new(&mgr, &inputs, &ufs);
        let v = evaluator.eval(app).unwrap();
        assert!(v < 16);
        assert_eq!(evaluator.eval(curried), Ok(v));

        ufs.set(f, vec![9, 9], 0x1f);
        let mut evaluator = Evaluator::new(&mgr, &inputs, &ufs);
        assert_eq!(evaluator.eval(app), Ok(0xf));
    }

    #[test]
    fn test_eval_errors() {
        let mut mgr = NodeManager::default();
        let a = mgr.mk_var("a", 8).unwrap();
        let x = mgr.mk_param("x", 8).unwrap();
        let f = mgr.mk_lambda(x, x).unwrap();
        let inputs = HashMap::new();
        let ufs = UfModel::default();
        let mut evaluator = Evaluator::new(&mgr, &inputs, &ufs);
        assert_eq!(evaluator.eval(a), Err(EvalError::MissingInput(a)));
        assert_eq!(evaluator.eval(x), Err(EvalError::UnboundParam(x)));
        assert_eq!(evaluator.eval(f), Err(EvalError::NotBitVector(f)));
    }
}
