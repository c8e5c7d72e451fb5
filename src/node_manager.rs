// SPDX-License-Identifier: Apache-2.0

//! The `NodeManager` owns the expression DAG that the beta-reduction engine
//! walks: an arena of immutable nodes addressed by `NodeRef`, with
//! hash-consing of structural nodes so that structurally identical
//! expressions share one id.
//!
//! Like the gate builder it can be created with folding (opportunistic
//! simplification) on or off. Every fold rewrites a node to a constant or to
//! one of its operands.
//!
//! ```
//! use xlsynth_beta::node_manager::{NodeManager, NodeManagerOptions};
//! use xlsynth_beta::node::Op;
//!
//! let mut mgr = NodeManager::new(NodeManagerOptions::opt());
//! let a = mgr.mk_var("a", 8).unwrap();
//! let b = mgr.mk_var("b", 8).unwrap();
//! let ab = mgr.mk_op(Op::Add, &[a, b]).unwrap();
//! let ba = mgr.mk_op(Op::Add, &[b, a]).unwrap();
//! assert_eq!(ab, ba);
//! ```

use ahash::AHashMap;
use string_interner::{StringInterner, backend::StringBackend, symbol::SymbolU32};

use crate::eval::eval_op;
use crate::node::{MAX_WIDTH, Node, NodeKind, NodeRef, Op, Sort, Symbol, width_mask};

#[derive(Debug, Clone)]
pub struct SortError {
    msg: String,
}

impl SortError {
    fn new(msg: String) -> Self {
        Self { msg }
    }
}

impl std::fmt::Display for SortError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SortError: {}", self.msg)
    }
}

impl std::error::Error for SortError {}

#[derive(Debug, Clone, Copy)]
pub struct NodeManagerOptions {
    pub fold: bool,
}

impl NodeManagerOptions {
    /// Returns an "optimizing" `NodeManagerOptions` with folding enabled.
    pub fn opt() -> Self {
        Self { fold: true }
    }

    pub fn no_opt() -> Self {
        Self { fold: false }
    }
}

#[derive(Debug, Clone)]
pub struct NodeEntry {
    pub node: Node,
    pub sort: Sort,
    /// Some parameter occurs in the cone of this node.
    pub parameterized: bool,
    /// Some application occurs in the cone of this node.
    pub has_apply: bool,
    /// Parameters occurring free in this node, sorted.
    pub free_params: Vec<NodeRef>,
    /// A lambda, or a function `cond` with a lambda among its nested branches.
    pub reducible_fun: bool,
}

pub struct NodeManager {
    entries: Vec<NodeEntry>,
    unique: AHashMap<Node, NodeRef>,
    interner: StringInterner<StringBackend<SymbolU32>>,
    options: NodeManagerOptions,
}

impl Default for NodeManager {
    fn default() -> Self {
        Self::new(NodeManagerOptions::opt())
    }
}

fn check_width(width: u32) -> Result<(), SortError> {
    if width == 0 || width > MAX_WIDTH {
        return Err(SortError::new(format!(
            "bit width {} is outside of [1, {}]",
            width, MAX_WIDTH
        )));
    }
    Ok(())
}

impl NodeManager {
    pub fn new(options: NodeManagerOptions) -> Self {
        Self {
            entries: Vec::new(),
            unique: AHashMap::new(),
            interner: StringInterner::new(),
            options,
        }
    }

    pub fn options(&self) -> NodeManagerOptions {
        self.options
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, node: NodeRef) -> &NodeEntry {
        debug_assert!(
            (node.id as usize) < self.entries.len(),
            "node reference out of bounds: {} (len = {})",
            node,
            self.entries.len()
        );
        &self.entries[node.id as usize]
    }

    pub fn get(&self, node: NodeRef) -> &Node {
        &self.entry(node).node
    }

    pub fn kind(&self, node: NodeRef) -> NodeKind {
        self.get(node).kind()
    }

    pub fn sort(&self, node: NodeRef) -> &Sort {
        &self.entry(node).sort
    }

    pub fn is_parameterized(&self, node: NodeRef) -> bool {
        self.entry(node).parameterized
    }

    pub fn has_apply(&self, node: NodeRef) -> bool {
        self.entry(node).has_apply
    }

    /// Parameters with a free occurrence in `node`, in ascending order.
    pub fn free_params(&self, node: NodeRef) -> &[NodeRef] {
        &self.entry(node).free_params
    }

    pub fn is_param(&self, node: NodeRef) -> bool {
        self.kind(node) == NodeKind::Param
    }

    pub fn is_lambda(&self, node: NodeRef) -> bool {
        self.kind(node) == NodeKind::Lambda
    }

    /// Returns the actual arguments of an application node.
    pub fn apply_args(&self, node: NodeRef) -> Option<&[NodeRef]> {
        match self.get(node) {
            Node::Apply { args, .. } => Some(args),
            _ => None,
        }
    }

    pub fn const_value(&self, node: NodeRef) -> Option<u64> {
        match self.get(node) {
            Node::Const { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Returns the name of a variable or parameter node.
    pub fn name(&self, node: NodeRef) -> Option<&str> {
        match self.get(node) {
            Node::Var { name, .. } | Node::Param { name, .. } => self.interner.resolve(*name),
            _ => None,
        }
    }

    pub fn resolve_symbol(&self, symbol: Symbol) -> Option<&str> {
        self.interner.resolve(symbol)
    }

    /// Walks the curried lambda chain starting at `fun`, collecting at most
    /// `max` parameters. Returns the parameters and the body under the last
    /// collected lambda; the parameter list is empty if `fun` is not a lambda.
    pub fn lambda_chain(&self, fun: NodeRef, max: usize) -> (Vec<NodeRef>, NodeRef) {
        let mut params = Vec::new();
        let mut current = fun;
        while params.len() < max {
            match self.get(current) {
                Node::Lambda { param, body } => {
                    params.push(*param);
                    current = *body;
                }
                _ => break,
            }
        }
        (params, current)
    }

    /// Whether applying `fun` can be contracted: it is a lambda, or a function
    /// `cond` with a lambda somewhere among its (nested) branches.
    pub fn is_reducible_fun(&self, fun: NodeRef) -> bool {
        self.entry(fun).reducible_fun
    }

    /// Whether `node` itself is a beta-redex.
    pub fn is_redex(&self, node: NodeRef) -> bool {
        match self.get(node) {
            Node::Apply { fun, .. } => self.is_reducible_fun(*fun),
            _ => false,
        }
    }

    fn push_entry(&mut self, node: Node, sort: Sort) -> NodeRef {
        assert!(
            self.entries.len() < i32::MAX as usize,
            "node arena exhausted: {} nodes",
            self.entries.len()
        );
        let children = node.children();
        let parameterized = matches!(node, Node::Param { .. })
            || children.iter().any(|c| self.entries[c.id as usize].parameterized);
        let has_apply = matches!(node, Node::Apply { .. })
            || children.iter().any(|c| self.entries[c.id as usize].has_apply);
        let node_ref = NodeRef {
            id: self.entries.len() as u32,
        };
        let mut free_params: Vec<NodeRef> = match &node {
            Node::Param { .. } => vec![node_ref],
            _ => children
                .iter()
                .flat_map(|c| self.entries[c.id as usize].free_params.iter().copied())
                .collect(),
        };
        if let Node::Lambda { param, .. } = &node {
            free_params.retain(|p| p != param);
        }
        free_params.sort();
        free_params.dedup();
        let reducible_fun = match &node {
            Node::Lambda { .. } => true,
            Node::Op {
                op: Op::Cond,
                operands,
            } => operands[1..]
                .iter()
                .any(|branch| self.entries[branch.id as usize].reducible_fun),
            _ => false,
        };
        self.entries.push(NodeEntry {
            node,
            sort,
            parameterized,
            has_apply,
            free_params,
            reducible_fun,
        });
        node_ref
    }

    /// Returns the canonical node for `node`, creating it if needed.
    fn hash_cons(&mut self, node: Node, sort: Sort) -> NodeRef {
        if let Some(existing) = self.unique.get(&node) {
            return *existing;
        }
        let node_ref = self.push_entry(node.clone(), sort);
        self.unique.insert(node, node_ref);
        node_ref
    }

    fn check_ref(&self, node: NodeRef) -> Result<(), SortError> {
        if (node.id as usize) < self.entries.len() {
            Ok(())
        } else {
            Err(SortError::new(format!("{} does not name a node", node)))
        }
    }

    fn bv_width(&self, node: NodeRef) -> Result<u32, SortError> {
        self.check_ref(node)?;
        self.sort(node).bit_width().ok_or_else(|| {
            SortError::new(format!(
                "{} has function sort {} where a bit-vector is required",
                node,
                self.sort(node)
            ))
        })
    }

    pub fn mk_const(&mut self, value: u64, width: u32) -> Result<NodeRef, SortError> {
        check_width(width)?;
        let value = value & width_mask(width);
        Ok(self.hash_cons(Node::Const { value, width }, Sort::BitVec(width)))
    }

    pub fn mk_bool(&mut self, value: bool) -> NodeRef {
        self.hash_cons(
            Node::Const {
                value: value as u64,
                width: 1,
            },
            Sort::BitVec(1),
        )
    }

    /// Creates a fresh bit-vector variable.
    pub fn mk_var(&mut self, name: &str, width: u32) -> Result<NodeRef, SortError> {
        check_width(width)?;
        let name = self.interner.get_or_intern(name);
        Ok(self.push_entry(
            Node::Var {
                name,
                sort: Sort::BitVec(width),
            },
            Sort::BitVec(width),
        ))
    }

    /// Creates a fresh uninterpreted function (or array variable when the
    /// domain has a single element).
    pub fn mk_uf(
        &mut self,
        name: &str,
        domain: &[u32],
        codomain: u32,
    ) -> Result<NodeRef, SortError> {
        if domain.is_empty() {
            return Err(SortError::new(format!(
                "uninterpreted function {} needs at least one argument",
                name
            )));
        }
        for width in domain.iter().chain(std::iter::once(&codomain)) {
            check_width(*width)?;
        }
        let sort = Sort::Fun {
            domain: domain.to_vec(),
            codomain,
        };
        let name = self.interner.get_or_intern(name);
        Ok(self.push_entry(
            Node::Var {
                name,
                sort: sort.clone(),
            },
            sort,
        ))
    }

    /// Creates a fresh lambda parameter.
    pub fn mk_param(&mut self, name: &str, width: u32) -> Result<NodeRef, SortError> {
        check_width(width)?;
        let name = self.interner.get_or_intern(name);
        Ok(self.push_entry(Node::Param { name, width }, Sort::BitVec(width)))
    }

    fn op_sort(&self, op: Op, operands: &[NodeRef]) -> Result<Sort, SortError> {
        if operands.len() != op.operand_count() {
            return Err(SortError::new(format!(
                "{} expects {} operands, got {}",
                op.mnemonic(),
                op.operand_count(),
                operands.len()
            )));
        }
        match op {
            Op::Not | Op::Neg => Ok(Sort::BitVec(self.bv_width(operands[0])?)),
            Op::And | Op::Or | Op::Xor | Op::Add | Op::Mul | Op::Eq | Op::Ult => {
                let lhs = self.bv_width(operands[0])?;
                let rhs = self.bv_width(operands[1])?;
                if lhs != rhs {
                    return Err(SortError::new(format!(
                        "{} operand widths differ: {} vs {}",
                        op.mnemonic(),
                        lhs,
                        rhs
                    )));
                }
                if matches!(op, Op::Eq | Op::Ult) {
                    Ok(Sort::BitVec(1))
                } else {
                    Ok(Sort::BitVec(lhs))
                }
            }
            Op::Concat => {
                let width = self.bv_width(operands[0])? + self.bv_width(operands[1])?;
                check_width(width)?;
                Ok(Sort::BitVec(width))
            }
            Op::Slice { hi, lo } => {
                let width = self.bv_width(operands[0])?;
                if lo > hi || hi >= width {
                    return Err(SortError::new(format!(
                        "slice [{}:{}] out of range for width {}",
                        hi, lo, width
                    )));
                }
                Ok(Sort::BitVec(hi - lo + 1))
            }
            Op::Cond => {
                if self.bv_width(operands[0])? != 1 {
                    return Err(SortError::new(format!(
                        "cond selector {} must be one bit wide",
                        operands[0]
                    )));
                }
                self.check_ref(operands[1])?;
                self.check_ref(operands[2])?;
                let then_sort = self.sort(operands[1]);
                let else_sort = self.sort(operands[2]);
                if then_sort != else_sort {
                    return Err(SortError::new(format!(
                        "cond branches have different sorts: {} vs {}",
                        then_sort, else_sort
                    )));
                }
                Ok(then_sort.clone())
            }
        }
    }

    /// Attempts to simplify `op(operands)` to a constant or an existing node.
    fn fold_op(&mut self, op: Op, operands: &[NodeRef], sort: &Sort) -> Option<NodeRef> {
        let consts: Vec<Option<u64>> = operands.iter().map(|o| self.const_value(*o)).collect();
        if op == Op::Cond {
            if let Some(selector) = consts[0] {
                return Some(if selector != 0 {
                    operands[1]
                } else {
                    operands[2]
                });
            }
            if operands[1] == operands[2] {
                return Some(operands[1]);
            }
            return None;
        }
        let width = sort.bit_width()?;
        if consts.iter().all(|c| c.is_some()) {
            let values: Vec<u64> = consts.iter().map(|c| c.unwrap_or(0)).collect();
            let widths: Vec<u32> = operands
                .iter()
                .map(|o| self.sort(*o).bit_width().unwrap_or(0))
                .collect();
            let value = eval_op(op, &values, &widths);
            return self.mk_const(value, width).ok();
        }
        let ones = width_mask(width);
        let is_const = |i: usize, v: u64| consts[i] == Some(v);
        match op {
            Op::Not | Op::Neg => match self.get(operands[0]) {
                Node::Op {
                    op: inner,
                    operands: inner_operands,
                } if *inner == op => Some(inner_operands[0]),
                _ => None,
            },
            Op::And | Op::Or | Op::Xor | Op::Add | Op::Mul => {
                let (a, b) = (operands[0], operands[1]);
                let absorbing = match op {
                    Op::And | Op::Mul => Some(0),
                    Op::Or => Some(ones),
                    _ => None,
                };
                let identity = match op {
                    Op::And => ones,
                    Op::Mul => 1,
                    _ => 0,
                };
                if let Some(absorbing) = absorbing {
                    if is_const(0, absorbing) {
                        return Some(a);
                    }
                    if is_const(1, absorbing) {
                        return Some(b);
                    }
                }
                if is_const(0, identity) {
                    return Some(b);
                }
                if is_const(1, identity) {
                    return Some(a);
                }
                if a == b {
                    return match op {
                        Op::And | Op::Or => Some(a),
                        Op::Xor => self.mk_const(0, width).ok(),
                        _ => None,
                    };
                }
                None
            }
            Op::Eq => {
                if operands[0] == operands[1] {
                    Some(self.mk_bool(true))
                } else {
                    None
                }
            }
            Op::Ult => {
                if operands[0] == operands[1] || is_const(1, 0) {
                    Some(self.mk_bool(false))
                } else {
                    None
                }
            }
            Op::Slice { hi, lo } => {
                if lo == 0 && Some(hi + 1) == self.sort(operands[0]).bit_width() {
                    Some(operands[0])
                } else {
                    None
                }
            }
            Op::Concat | Op::Cond => None,
        }
    }

    pub fn mk_op(&mut self, op: Op, operands: &[NodeRef]) -> Result<NodeRef, SortError> {
        let sort = self.op_sort(op, operands)?;
        let mut operands = operands.to_vec();
        if self.options.fold {
            if let Some(folded) = self.fold_op(op, &operands, &sort) {
                return Ok(folded);
            }
            if op.is_commutative() {
                operands.sort();
            }
        }
        Ok(self.hash_cons(Node::Op { op, operands }, sort))
    }

    pub fn mk_not(&mut self, a: NodeRef) -> Result<NodeRef, SortError> {
        self.mk_op(Op::Not, &[a])
    }

    pub fn mk_and(&mut self, a: NodeRef, b: NodeRef) -> Result<NodeRef, SortError> {
        self.mk_op(Op::And, &[a, b])
    }

    pub fn mk_add(&mut self, a: NodeRef, b: NodeRef) -> Result<NodeRef, SortError> {
        self.mk_op(Op::Add, &[a, b])
    }

    pub fn mk_eq(&mut self, a: NodeRef, b: NodeRef) -> Result<NodeRef, SortError> {
        self.mk_op(Op::Eq, &[a, b])
    }

    pub fn mk_cond(
        &mut self,
        selector: NodeRef,
        then_node: NodeRef,
        else_node: NodeRef,
    ) -> Result<NodeRef, SortError> {
        self.mk_op(Op::Cond, &[selector, then_node, else_node])
    }

    pub fn mk_slice(&mut self, a: NodeRef, hi: u32, lo: u32) -> Result<NodeRef, SortError> {
        self.mk_op(Op::Slice { hi, lo }, &[a])
    }

    /// Sort of `fun` applied to `args`, checking the arguments.
    pub fn apply_sort(&self, fun: NodeRef, args: &[NodeRef]) -> Result<Sort, SortError> {
        self.check_ref(fun)?;
        let (domain, codomain) = match self.sort(fun) {
            Sort::Fun { domain, codomain } => (domain, *codomain),
            sort => {
                return Err(SortError::new(format!(
                    "{} of sort {} can not be applied",
                    fun, sort
                )));
            }
        };
        if args.is_empty() || args.len() > domain.len() {
            return Err(SortError::new(format!(
                "{} takes up to {} arguments, got {}",
                fun,
                domain.len(),
                args.len()
            )));
        }
        for (i, (arg, expected)) in args.iter().zip(domain.iter()).enumerate() {
            let width = self.bv_width(*arg)?;
            if width != *expected {
                return Err(SortError::new(format!(
                    "argument {} of {} has width {}, expected {}",
                    i, fun, width, expected
                )));
            }
        }
        if args.len() == domain.len() {
            Ok(Sort::BitVec(codomain))
        } else {
            Ok(Sort::Fun {
                domain: domain[args.len()..].to_vec(),
                codomain,
            })
        }
    }

    pub fn mk_apply(&mut self, fun: NodeRef, args: &[NodeRef]) -> Result<NodeRef, SortError> {
        let sort = self.apply_sort(fun, args)?;
        Ok(self.hash_cons(
            Node::Apply {
                fun,
                args: args.to_vec(),
            },
            sort,
        ))
    }

    pub fn mk_lambda(&mut self, param: NodeRef, body: NodeRef) -> Result<NodeRef, SortError> {
        self.check_ref(param)?;
        self.check_ref(body)?;
        let param_width = match self.get(param) {
            Node::Param { width, .. } => *width,
            _ => {
                return Err(SortError::new(format!(
                    "lambda binder {} is not a parameter",
                    param
                )));
            }
        };
        let sort = match self.sort(body) {
            Sort::BitVec(width) => Sort::Fun {
                domain: vec![param_width],
                codomain: *width,
            },
            Sort::Fun { domain, codomain } => {
                let mut curried = Vec::with_capacity(domain.len() + 1);
                curried.push(param_width);
                curried.extend(domain.iter().copied());
                Sort::Fun {
                    domain: curried,
                    codomain: *codomain,
                }
            }
        };
        Ok(self.hash_cons(Node::Lambda { param, body }, sort))
    }

    /// Builds the curried chain `λp0. λp1. ... body`.
    pub fn mk_fun(&mut self, params: &[NodeRef], body: NodeRef) -> Result<NodeRef, SortError> {
        if params.is_empty() {
            return Err(SortError::new(
                "function definition needs at least one parameter".to_string(),
            ));
        }
        let mut result = body;
        for param in params.iter().rev() {
            result = self.mk_lambda(*param, result)?;
        }
        Ok(result)
    }

    /// Rebuilds `node` with `children` in place of its current children (in
    /// the order produced by `Node::children`). Returns `node` itself when the
    /// children are unchanged.
    pub fn rebuild(&mut self, node: NodeRef, children: &[NodeRef]) -> Result<NodeRef, SortError> {
        if self.get(node).children() == children {
            return Ok(node);
        }
        match self.get(node).clone() {
            Node::Op { op, .. } => self.mk_op(op, children),
            Node::Apply { .. } => self.mk_apply(children[0], &children[1..]),
            Node::Lambda { .. } => self.mk_lambda(children[0], children[1]),
            Node::Const { .. } | Node::Var { .. } | Node::Param { .. } => Ok(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_structural_nodes_are_shared() {
        let mut mgr = NodeManager::new(NodeManagerOptions::no_opt());
        let a = mgr.mk_var("a", 4).unwrap();
        let c = mgr.mk_const(3, 4).unwrap();
        let x = mgr.mk_add(a, c).unwrap();
        let y = mgr.mk_add(a, c).unwrap();
        assert_eq!(x, y);
        assert_eq!(mgr.mk_const(3, 4).unwrap(), c);
        let before = mgr.len();
        let _ = mgr.mk_add(a, c).unwrap();
        assert_eq!(mgr.len(), before);
    }

    #[test]
    fn test_variables_are_fresh() {
        let mut mgr = NodeManager::default();
        let a0 = mgr.mk_var("a", 4).unwrap();
        let a1 = mgr.mk_var("a", 4).unwrap();
        assert_ne!(a0, a1);
        assert_eq!(mgr.name(a0), Some("a"));
        assert_eq!(mgr.name(a1), Some("a"));
    }

    #[test]
    fn test_const_is_masked() {
        let mut mgr = NodeManager::default();
        let c = mgr.mk_const(0x1ff, 8).unwrap();
        assert_eq!(mgr.const_value(c), Some(0xff));
    }

    #[test_case(0; "zero width")]
    #[test_case(65; "too wide")]
    fn test_bad_width(width: u32) {
        let mut mgr = NodeManager::default();
        assert!(mgr.mk_var("a", width).is_err());
        assert!(mgr.mk_const(0, width).is_err());
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let mut mgr = NodeManager::default();
        let a = mgr.mk_var("a", 4).unwrap();
        let b = mgr.mk_var("b", 8).unwrap();
        let err = mgr.mk_add(a, b).unwrap_err();
        assert!(err.to_string().contains("widths differ"), "{}", err);
    }

    #[test]
    fn test_fold_constants() {
        let mut mgr = NodeManager::default();
        let c3 = mgr.mk_const(3, 4).unwrap();
        let c14 = mgr.mk_const(14, 4).unwrap();
        let sum = mgr.mk_add(c3, c14).unwrap();
        assert_eq!(mgr.const_value(sum), Some(1));
        let eq = mgr.mk_eq(c3, c3).unwrap();
        assert_eq!(mgr.const_value(eq), Some(1));
    }

    #[test]
    fn test_fold_identities() {
        let mut mgr = NodeManager::default();
        let a = mgr.mk_var("a", 4).unwrap();
        let zero = mgr.mk_const(0, 4).unwrap();
        let ones = mgr.mk_const(0xf, 4).unwrap();
        assert_eq!(mgr.mk_add(a, zero).unwrap(), a);
        assert_eq!(mgr.mk_and(a, ones).unwrap(), a);
        assert_eq!(mgr.mk_and(zero, a).unwrap(), zero);
        assert_eq!(mgr.mk_and(a, a).unwrap(), a);
        let x = mgr.mk_op(Op::Xor, &[a, a]).unwrap();
        assert_eq!(x, zero);
        let not_a = mgr.mk_not(a).unwrap();
        assert_eq!(mgr.mk_not(not_a).unwrap(), a);
        assert_eq!(mgr.mk_slice(a, 3, 0).unwrap(), a);
    }

    #[test]
    fn test_fold_cond() {
        let mut mgr = NodeManager::default();
        let a = mgr.mk_var("a", 4).unwrap();
        let b = mgr.mk_var("b", 4).unwrap();
        let s = mgr.mk_var("s", 1).unwrap();
        let t = mgr.mk_bool(true);
        assert_eq!(mgr.mk_cond(t, a, b).unwrap(), a);
        assert_eq!(mgr.mk_cond(s, a, a).unwrap(), a);
        let c = mgr.mk_cond(s, a, b).unwrap();
        assert_eq!(mgr.kind(c), NodeKind::Op);
    }

    #[test]
    fn test_no_fold_keeps_structure() {
        let mut mgr = NodeManager::new(NodeManagerOptions::no_opt());
        let a = mgr.mk_var("a", 4).unwrap();
        let zero = mgr.mk_const(0, 4).unwrap();
        let sum = mgr.mk_add(a, zero).unwrap();
        assert_ne!(sum, a);
        assert_eq!(mgr.kind(sum), NodeKind::Op);
    }

    #[test]
    fn test_lambda_and_apply_sorts() {
        let mut mgr = NodeManager::default();
        let x = mgr.mk_param("x", 8).unwrap();
        let y = mgr.mk_param("y", 4).unwrap();
        let y_ext = mgr.mk_op(Op::Concat, &[y, y]).unwrap();
        let body = mgr.mk_add(x, y_ext).unwrap();
        let f = mgr.mk_fun(&[x, y], body).unwrap();
        assert_eq!(
            mgr.sort(f),
            &Sort::Fun {
                domain: vec![8, 4],
                codomain: 8
            }
        );
        let a = mgr.mk_var("a", 8).unwrap();
        let b = mgr.mk_var("b", 4).unwrap();
        let partial = mgr.mk_apply(f, &[a]).unwrap();
        assert_eq!(
            mgr.sort(partial),
            &Sort::Fun {
                domain: vec![4],
                codomain: 8
            }
        );
        let full = mgr.mk_apply(partial, &[b]).unwrap();
        assert_eq!(mgr.sort(full), &Sort::BitVec(8));
        assert!(mgr.mk_apply(f, &[b]).is_err(), "width mismatch");
        assert!(mgr.mk_apply(f, &[a, b, b]).is_err(), "too many args");
        assert!(!mgr.is_redex(full));
        assert!(mgr.is_redex(partial));
    }

    #[test]
    fn test_flags() {
        let mut mgr = NodeManager::default();
        let x = mgr.mk_param("x", 8).unwrap();
        let a = mgr.mk_var("a", 8).unwrap();
        let sum = mgr.mk_add(x, a).unwrap();
        assert!(mgr.is_parameterized(sum));
        assert!(!mgr.has_apply(sum));
        let f = mgr.mk_lambda(x, sum).unwrap();
        let app = mgr.mk_apply(f, &[a]).unwrap();
        assert!(mgr.has_apply(app));
        let closed = mgr.mk_add(a, a).unwrap();
        assert!(!mgr.is_parameterized(closed));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "node reference out of bounds: %7 (len = 1)")]
    fn test_foreign_node_ref_is_reported() {
        let mut mgr = NodeManager::default();
        mgr.mk_var("a", 8).unwrap();
        let _ = mgr.entry(NodeRef { id: 7 });
    }

    #[test]
    fn test_free_params_exclude_bound_ones() {
        let mut mgr = NodeManager::default();
        let x = mgr.mk_param("x", 8).unwrap();
        let y = mgr.mk_param("y", 8).unwrap();
        let a = mgr.mk_var("a", 8).unwrap();
        let xy = mgr.mk_add(x, y).unwrap();
        assert_eq!(mgr.free_params(xy), &[x, y]);
        let inner = mgr.mk_lambda(y, xy).unwrap();
        assert_eq!(mgr.free_params(inner), &[x]);
        let outer = mgr.mk_lambda(x, inner).unwrap();
        assert!(mgr.free_params(outer).is_empty());
        assert!(mgr.is_parameterized(outer));
        let app = mgr.mk_apply(inner, &[a]).unwrap();
        assert_eq!(mgr.free_params(app), &[x]);
    }

    #[test]
    fn test_reducible_fun_through_shared_conds() {
        let mut mgr = NodeManager::default();
        let x = mgr.mk_param("x", 8).unwrap();
        let one = mgr.mk_const(1, 8).unwrap();
        let body = mgr.mk_add(x, one).unwrap();
        let inc = mgr.mk_lambda(x, body).unwrap();
        let f = mgr.mk_uf("f", &[8], 8).unwrap();
        let g = mgr.mk_uf("g", &[8], 8).unwrap();
        let s = mgr.mk_var("s", 1).unwrap();
        let t = mgr.mk_var("t", 1).unwrap();
        let ufs_only = mgr.mk_cond(s, f, g).unwrap();
        assert!(!mgr.is_reducible_fun(ufs_only));
        let mut current = mgr.mk_cond(t, ufs_only, inc).unwrap();
        assert!(mgr.is_reducible_fun(current));
        for level in 0..64 {
            let sel = mgr.mk_var(&format!("s{}", level), 1).unwrap();
            let inner = mgr.mk_cond(sel, ufs_only, current).unwrap();
            let sel = mgr.mk_var(&format!("t{}", level), 1).unwrap();
            current = mgr.mk_cond(sel, current, inner).unwrap();
        }
        assert!(mgr.is_reducible_fun(current));
        assert!(!mgr.is_reducible_fun(f));
    }

    #[test]
    fn test_lambda_requires_param() {
        let mut mgr = NodeManager::default();
        let a = mgr.mk_var("a", 8).unwrap();
        assert!(mgr.mk_lambda(a, a).is_err());
    }

    #[test]
    fn test_lambda_chain() {
        let mut mgr = NodeManager::default();
        let x = mgr.mk_param("x", 8).unwrap();
        let y = mgr.mk_param("y", 8).unwrap();
        let body = mgr.mk_add(x, y).unwrap();
        let f = mgr.mk_fun(&[x, y], body).unwrap();
        let (params, inner) = mgr.lambda_chain(f, 2);
        assert_eq!(params, vec![x, y]);
        assert_eq!(inner, body);
        let (params, inner) = mgr.lambda_chain(f, 1);
        assert_eq!(params, vec![x]);
        assert!(mgr.is_lambda(inner));
    }
}
