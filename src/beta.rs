// SPDX-License-Identifier: Apache-2.0

//! Beta-reduction of applications over the node DAG.
//!
//! A `BetaReducer` owns the parameter assignment store. Each entry point
//! creates a `Reduction` run that owns its memo tables for the duration of
//! the call: one `IntToNodeMap` per binding scope, keyed by node id. A new
//! scope is opened whenever parameters are bound (or a bound parameter is
//! shadowed) and closed when they are unbound. The result for a node depends
//! only on the bindings of its free parameters, so it is memoized in the
//! outermost open scope that none of the inner scopes rebinds those
//! parameters in. Sibling contractions that share a subterm independent of
//! their own parameters therefore reduce it once.
//!
//! Modes share the substitution core and differ in when an application is
//! contracted:
//!
//! * `Full`: every redex, link by link for curried applications.
//! * `Chains`: like `Full`, but a curried spine `f(a)(b)...` whose head is a
//!   lambda is contracted in one step without building the intermediate
//!   partial applications.
//! * `Cutoff`: weak-head reduction. Redexes at the head of the root are
//!   contracted until the head is not a lambda; everything else is only
//!   substituted. The result reports whether it reached normal form.
//! * `Bounded(n)`: at most `n` nested contractions; deeper applications are
//!   rebuilt with substituted operands and left unexpanded.

use serde::Serialize;

use crate::int_hash_map::IntToNodeMap;
use crate::int_hash_table::{IntHashError, IntHashTable};
use crate::node::{Node, NodeRef, Op};
use crate::node_manager::{NodeManager, SortError};
use crate::param_assignment::{AssignmentError, ParamAssignments};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionMode {
    Full,
    Chains,
    Cutoff,
    Bounded(u32),
}

impl std::fmt::Display for ReductionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReductionMode::Full => write!(f, "full"),
            ReductionMode::Chains => write!(f, "chains"),
            ReductionMode::Cutoff => write!(f, "cutoff"),
            ReductionMode::Bounded(bound) => write!(f, "bounded({})", bound),
        }
    }
}

#[derive(Debug)]
pub enum BetaError {
    Assignment(AssignmentError),
    Sort(SortError),
    Table(IntHashError),
}

impl std::fmt::Display for BetaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BetaError::Assignment(e) => write!(f, "beta reduction: {}", e),
            BetaError::Sort(e) => write!(f, "beta reduction: {}", e),
            BetaError::Table(e) => write!(f, "beta reduction memo: {}", e),
        }
    }
}

impl std::error::Error for BetaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BetaError::Assignment(e) => Some(e),
            BetaError::Sort(e) => Some(e),
            BetaError::Table(e) => Some(e),
        }
    }
}

impl From<AssignmentError> for BetaError {
    fn from(e: AssignmentError) -> Self {
        BetaError::Assignment(e)
    }
}

impl From<SortError> for BetaError {
    fn from(e: SortError) -> Self {
        BetaError::Sort(e)
    }
}

impl From<IntHashError> for BetaError {
    fn from(e: IntHashError) -> Self {
        BetaError::Table(e)
    }
}

/// Result of a cutoff reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoffResult {
    pub node: NodeRef,
    /// The node contains no beta-redex.
    pub is_normal_form: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReductionStats {
    pub contractions: usize,
    pub memo_hits: usize,
    pub memo_misses: usize,
    /// Deepest nesting of contractions.
    pub max_depth: usize,
    pub peak_memo_bytes: usize,
}

/// Returns whether any beta-redex is reachable from `root`.
pub fn contains_redex(mgr: &NodeManager, root: NodeRef) -> bool {
    let mut worklist = vec![root];
    let mut visited = IntHashTable::new();
    while let Some(current) = worklist.pop() {
        // Redexes need a lambda, and every lambda cone holds its parameter.
        if !mgr.is_parameterized(current) || visited.add(current.key()).is_err() {
            continue;
        }
        if mgr.is_redex(current) {
            return true;
        }
        worklist.extend(mgr.get(current).children());
    }
    false
}

/// A binding scope of one reduction run.
struct Scope {
    /// Parameters whose binding differs from the enclosing scope.
    rebound: Vec<NodeRef>,
    /// Contraction depth when the scope was opened.
    depth: u32,
    /// Memo tables indexed by contraction depth relative to `depth`. Only
    /// `Bounded` runs use more than the first.
    memos: Vec<IntToNodeMap>,
}

impl Scope {
    fn new(rebound: Vec<NodeRef>, depth: u32) -> Self {
        Self {
            rebound,
            depth,
            memos: vec![IntToNodeMap::new()],
        }
    }

    fn rebinds_any(&self, free_params: &[NodeRef]) -> bool {
        self.rebound.iter().any(|p| free_params.binary_search(p).is_ok())
    }
}

/// One reduction call: the DAG, the binding store, and the memo scopes.
struct Reduction<'a> {
    mgr: &'a mut NodeManager,
    assignments: &'a mut ParamAssignments,
    mode: ReductionMode,
    /// Never empty; the first scope holds the bindings the caller made.
    scopes: Vec<Scope>,
    depth: u32,
    stats: ReductionStats,
}

impl<'a> Reduction<'a> {
    fn new(
        mgr: &'a mut NodeManager,
        assignments: &'a mut ParamAssignments,
        mode: ReductionMode,
    ) -> Self {
        Self {
            mgr,
            assignments,
            mode,
            scopes: vec![Scope::new(Vec::new(), 0)],
            depth: 0,
            stats: ReductionStats::default(),
        }
    }

    fn memo_bytes(&self) -> usize {
        self.scopes
            .iter()
            .flat_map(|scope| scope.memos.iter())
            .map(|m| m.size_in_bytes())
            .sum()
    }

    fn note_memo_bytes(&mut self) {
        self.stats.peak_memo_bytes = self.stats.peak_memo_bytes.max(self.memo_bytes());
    }

    fn push_scope(&mut self, rebound: Vec<NodeRef>) {
        self.scopes.push(Scope::new(rebound, self.depth));
    }

    fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "popped the caller's scope");
        self.note_memo_bytes();
        self.scopes.pop();
    }

    /// Index of the outermost scope in which `node` reduces to the same
    /// result as in the innermost one: no scope inside it rebinds a free
    /// parameter of `node`.
    fn memo_home(&self, node: NodeRef) -> usize {
        let free_params = self.mgr.free_params(node);
        let mut home = self.scopes.len() - 1;
        while home > 0 && !self.scopes[home].rebinds_any(free_params) {
            home -= 1;
        }
        home
    }

    fn memo_table(&mut self, home: usize) -> &mut IntToNodeMap {
        let scope = &mut self.scopes[home];
        let offset = match self.mode {
            ReductionMode::Bounded(_) => (self.depth - scope.depth) as usize,
            _ => 0,
        };
        if scope.memos.len() <= offset {
            scope.memos.resize_with(offset + 1, IntToNodeMap::new);
        }
        &mut scope.memos[offset]
    }

    fn finish(mut self) -> ReductionStats {
        self.note_memo_bytes();
        self.stats
    }

    fn can_contract(&self) -> bool {
        match self.mode {
            ReductionMode::Full | ReductionMode::Chains => true,
            ReductionMode::Cutoff => false,
            ReductionMode::Bounded(bound) => self.depth < bound,
        }
    }

    fn reduce_all(&mut self, nodes: &[NodeRef]) -> Result<Vec<NodeRef>, BetaError> {
        nodes.iter().map(|n| self.reduce(*n)).collect()
    }

    fn reduce(&mut self, node: NodeRef) -> Result<NodeRef, BetaError> {
        if !self.mgr.is_parameterized(node) {
            return Ok(node);
        }
        let home = self.memo_home(node);
        if let Some(result) = self.memo_table(home).get(node.key()).copied() {
            self.stats.memo_hits += 1;
            return Ok(result);
        }
        self.stats.memo_misses += 1;
        let result = match self.mgr.get(node).clone() {
            Node::Param { .. } => self.assignments.current_assignment(node).unwrap_or(node),
            Node::Lambda { param, body } => self.reduce_lambda(node, param, body)?,
            Node::Apply { fun, args } => self.reduce_apply(node, fun, &args)?,
            Node::Op { operands, .. } => {
                let operands = self.reduce_all(&operands)?;
                self.mgr.rebuild(node, &operands)?
            }
            Node::Const { .. } | Node::Var { .. } => node,
        };
        self.memo_table(home).insert(node.key(), result)?;
        Ok(result)
    }

    /// Substitutes into a lambda that is not being applied.
    fn reduce_lambda(
        &mut self,
        node: NodeRef,
        param: NodeRef,
        body: NodeRef,
    ) -> Result<NodeRef, BetaError> {
        let Some(outer) = self.assignments.current_assignment(param) else {
            let body = self.reduce(body)?;
            return Ok(self.mgr.rebuild(node, &[param, body])?);
        };
        // The parameter is bound further out; it is free again inside.
        self.assignments.unassign(param)?;
        self.push_scope(vec![param]);
        let body = self.reduce(body);
        self.pop_scope();
        self.assignments.assign(param, outer)?;
        let body = body?;
        Ok(self.mgr.rebuild(node, &[param, body])?)
    }

    fn reduce_apply(
        &mut self,
        node: NodeRef,
        fun: NodeRef,
        args: &[NodeRef],
    ) -> Result<NodeRef, BetaError> {
        if self.mode == ReductionMode::Chains {
            if let Some(result) = self.reduce_chain(node)? {
                return Ok(result);
            }
        }
        let args = self.reduce_all(args)?;
        if self.can_contract() && self.mgr.is_lambda(fun) {
            return self.contract(fun, &args);
        }
        let fun = self.reduce(fun)?;
        self.apply_reduced(fun, &args)
    }

    /// Contracts the curried spine rooted at `node` in one step when its head
    /// is a lambda and it has more than one link.
    fn reduce_chain(&mut self, node: NodeRef) -> Result<Option<NodeRef>, BetaError> {
        let mut links: Vec<Vec<NodeRef>> = Vec::new();
        let mut head = node;
        while let Node::Apply { fun, args } = self.mgr.get(head) {
            links.push(args.clone());
            head = *fun;
        }
        if links.len() < 2 || !self.mgr.is_lambda(head) {
            return Ok(None);
        }
        let mut args = Vec::new();
        for link in links.iter().rev() {
            args.extend(self.reduce_all(link)?);
        }
        log::trace!(
            "collapsing chain of {} applications at {}",
            links.len(),
            node
        );
        Ok(Some(self.contract(head, &args)?))
    }

    /// Applies `fun` to `args`, both already reduced in the current scope.
    fn apply_reduced(&mut self, fun: NodeRef, args: &[NodeRef]) -> Result<NodeRef, BetaError> {
        if self.can_contract() && self.mgr.is_reducible_fun(fun) {
            let mut distributed = IntToNodeMap::new();
            return self.distribute(fun, args, &mut distributed);
        }
        Ok(self.mgr.mk_apply(fun, args)?)
    }

    /// Pushes the application of `args` through the `cond` DAG at `fun`
    /// down to its branches. `distributed` maps each function already
    /// applied to `args` to its result, so shared branches are applied once.
    fn distribute(
        &mut self,
        fun: NodeRef,
        args: &[NodeRef],
        distributed: &mut IntToNodeMap,
    ) -> Result<NodeRef, BetaError> {
        if let Some(result) = distributed.get(fun.key()) {
            return Ok(*result);
        }
        let result = match self.mgr.get(fun).clone() {
            Node::Lambda { .. } => self.contract(fun, args)?,
            Node::Op {
                op: Op::Cond,
                operands,
            } if self.mgr.is_reducible_fun(fun) => {
                let then_node = self.distribute(operands[1], args, distributed)?;
                let else_node = self.distribute(operands[2], args, distributed)?;
                self.mgr.mk_cond(operands[0], then_node, else_node)?
            }
            _ => self.mgr.mk_apply(fun, args)?,
        };
        distributed.insert(fun.key(), result)?;
        Ok(result)
    }

    /// Parameters of the lambda chain at `fun` to bind for `max` arguments,
    /// and the body under the last of them. Collection stops at a parameter
    /// that repeats within the chain; the inner lambda then shadows it.
    fn chain_params(&self, fun: NodeRef, max: usize) -> (Vec<NodeRef>, NodeRef) {
        let (mut params, mut body) = self.mgr.lambda_chain(fun, max);
        if let Some(dup) = (1..params.len()).find(|i| params[..*i].contains(&params[*i])) {
            params.truncate(dup);
            body = self.mgr.lambda_chain(fun, dup).1;
        }
        (params, body)
    }

    /// Binds the parameters of lambda `fun` to `args`, reduces the body and
    /// applies what is left of `args` to the result. Bindings and the memo
    /// scope are unwound on every path.
    fn contract(&mut self, fun: NodeRef, args: &[NodeRef]) -> Result<NodeRef, BetaError> {
        let (params, body) = self.chain_params(fun, args.len());
        let bound = params.len();

        let mut shadowed = Vec::new();
        for param in &params {
            if let Some(outer) = self.assignments.current_assignment(*param) {
                self.assignments.unassign(*param)?;
                shadowed.push((*param, outer));
            }
        }
        if let Err(e) = self.assignments.assign_args(&params, &args[..bound]) {
            for (param, outer) in shadowed {
                self.assignments.assign(param, outer)?;
            }
            return Err(e.into());
        }

        self.stats.contractions += 1;
        self.depth += 1;
        self.stats.max_depth = self.stats.max_depth.max(self.depth as usize);
        log::trace!(
            "contracting {} with {} of {} args at depth {}",
            fun,
            bound,
            args.len(),
            self.depth
        );
        self.push_scope(params.clone());
        let result = self.reduce(body);
        self.pop_scope();
        self.depth -= 1;

        let unbound = self.assignments.unassign_all(&params);
        for (param, outer) in shadowed {
            self.assignments.assign(param, outer)?;
        }
        let result = result?;
        unbound?;

        if bound < args.len() {
            return self.apply_reduced(result, &args[bound..]);
        }
        Ok(result)
    }

    /// Substitutes `node`, then contracts head redexes until the head of the
    /// result is not a lambda.
    fn weak_head_normalize(&mut self, node: NodeRef) -> Result<NodeRef, BetaError> {
        let mut current = self.reduce(node)?;
        loop {
            let mut links: Vec<Vec<NodeRef>> = Vec::new();
            let mut head = current;
            while let Node::Apply { fun, args } = self.mgr.get(head) {
                links.push(args.clone());
                head = *fun;
            }
            if !self.mgr.is_lambda(head) {
                return Ok(current);
            }
            let args: Vec<NodeRef> = links.into_iter().rev().flatten().collect();
            current = self.contract(head, &args)?;
        }
    }
}

/// Reduction context: the parameter assignment store plus statistics of the
/// most recent call.
#[derive(Debug, Default)]
pub struct BetaReducer {
    assignments: ParamAssignments,
    stats: ReductionStats,
}

impl BetaReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assignments(&self) -> &ParamAssignments {
        &self.assignments
    }

    /// Bindings made here are substituted by subsequent reductions.
    pub fn assignments_mut(&mut self) -> &mut ParamAssignments {
        &mut self.assignments
    }

    pub fn last_stats(&self) -> &ReductionStats {
        &self.stats
    }

    fn run<T>(
        &mut self,
        mgr: &mut NodeManager,
        mode: ReductionMode,
        f: impl FnOnce(&mut Reduction<'_>) -> Result<T, BetaError>,
    ) -> Result<T, BetaError> {
        let bindings_before = self.assignments.depth();
        let mut reduction = Reduction::new(mgr, &mut self.assignments, mode);
        let result = f(&mut reduction);
        let stats = reduction.finish();
        debug_assert_eq!(
            self.assignments.depth(),
            bindings_before,
            "reduction leaked parameter bindings"
        );
        log::debug!("{} reduction: ok={} {:?}", mode, result.is_ok(), stats);
        self.stats = stats;
        result
    }

    /// Reduces `node` in `mode`; for `Cutoff` only the node is returned.
    pub fn reduce(
        &mut self,
        mgr: &mut NodeManager,
        node: NodeRef,
        mode: ReductionMode,
    ) -> Result<NodeRef, BetaError> {
        match mode {
            ReductionMode::Full => self.full_reduce(mgr, node),
            ReductionMode::Chains => self.chain_reduce(mgr, node),
            ReductionMode::Cutoff => Ok(self.cutoff_reduce(mgr, node)?.node),
            ReductionMode::Bounded(bound) => self.bounded_reduce(mgr, node, bound),
        }
    }

    pub fn full_reduce(
        &mut self,
        mgr: &mut NodeManager,
        node: NodeRef,
    ) -> Result<NodeRef, BetaError> {
        self.run(mgr, ReductionMode::Full, |r| r.reduce(node))
    }

    pub fn chain_reduce(
        &mut self,
        mgr: &mut NodeManager,
        node: NodeRef,
    ) -> Result<NodeRef, BetaError> {
        self.run(mgr, ReductionMode::Chains, |r| r.reduce(node))
    }

    pub fn cutoff_reduce(
        &mut self,
        mgr: &mut NodeManager,
        node: NodeRef,
    ) -> Result<CutoffResult, BetaError> {
        let node = self.run(mgr, ReductionMode::Cutoff, |r| r.weak_head_normalize(node))?;
        Ok(CutoffResult {
            node,
            is_normal_form: !contains_redex(mgr, node),
        })
    }

    /// Reduces with at most `bound` nested contractions; `bound == 0` returns
    /// `node` unchanged.
    pub fn bounded_reduce(
        &mut self,
        mgr: &mut NodeManager,
        node: NodeRef,
        bound: u32,
    ) -> Result<NodeRef, BetaError> {
        if bound == 0 {
            self.stats = ReductionStats::default();
            return Ok(node);
        }
        self.run(mgr, ReductionMode::Bounded(bound), |r| r.reduce(node))
    }

    /// Fully reduces the application of `fun` to `args` without creating the
    /// unreduced application node.
    pub fn apply_and_reduce(
        &mut self,
        mgr: &mut NodeManager,
        fun: NodeRef,
        args: &[NodeRef],
    ) -> Result<NodeRef, BetaError> {
        mgr.apply_sort(fun, args)?;
        self.run(mgr, ReductionMode::Full, |r| {
            let args = r.reduce_all(args)?;
            if r.mgr.is_lambda(fun) {
                return r.contract(fun, &args);
            }
            let fun = r.reduce(fun)?;
            r.apply_reduced(fun, &args)
        })
    }
}
