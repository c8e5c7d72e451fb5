// SPDX-License-Identifier: Apache-2.0

//! Builders for DAGs used by tests and benchmarks.

use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg64Mcg;

use crate::node::{NodeRef, Op};
use crate::node_manager::NodeManager;

pub const WIDTH: u32 = 8;

/// `λx. f(x, x)` applied to a constant.
pub struct Duplicator {
    pub uf: NodeRef,
    pub lambda: NodeRef,
    pub arg: NodeRef,
    pub app: NodeRef,
}

pub fn make_duplicator(mgr: &mut NodeManager) -> Duplicator {
    let uf = mgr.mk_uf("f", &[WIDTH, WIDTH], WIDTH).unwrap();
    let x = mgr.mk_param("x", WIDTH).unwrap();
    let body = mgr.mk_apply(uf, &[x, x]).unwrap();
    let lambda = mgr.mk_lambda(x, body).unwrap();
    let arg = mgr.mk_const(0x5a, WIDTH).unwrap();
    let app = mgr.mk_apply(lambda, &[arg]).unwrap();
    Duplicator {
        uf,
        lambda,
        arg,
        app,
    }
}

/// A lambda whose body is a chain of `levels` diamonds over its parameter:
/// every level uses the previous one twice, so the body has a tree expansion
/// exponential in `levels`.
pub struct Diamonds {
    pub lambda: NodeRef,
    pub arg: NodeRef,
    pub app: NodeRef,
}

pub fn make_shared_diamonds(mgr: &mut NodeManager, levels: usize) -> Diamonds {
    let x = mgr.mk_param("x", WIDTH).unwrap();
    let mut current = x;
    for _ in 0..levels {
        let lhs = mgr.mk_not(current).unwrap();
        let rhs = mgr.mk_op(Op::Neg, &[current]).unwrap();
        current = mgr.mk_add(lhs, rhs).unwrap();
    }
    let lambda = mgr.mk_lambda(x, current).unwrap();
    let arg = mgr.mk_var("a", WIDTH).unwrap();
    let app = mgr.mk_apply(lambda, &[arg]).unwrap();
    Diamonds { lambda, arg, app }
}

/// `λp0. ... λp{arity-1}. p0 + ... + p{arity-1}`.
pub fn make_curried_sum(mgr: &mut NodeManager, arity: usize) -> NodeRef {
    let params: Vec<NodeRef> = (0..arity)
        .map(|i| mgr.mk_param(&format!("p{}", i), WIDTH).unwrap())
        .collect();
    let mut body = params[0];
    for param in &params[1..] {
        body = mgr.mk_add(body, *param).unwrap();
    }
    mgr.mk_fun(&params, body).unwrap()
}

/// Sibling redexes sharing the previous level as an operand that does not
/// mention their own parameters:
///
/// `s0 = (λq. q + 1)(a)`, `sk = (λy. s{k-1} + y)(a) ^ (λz. s{k-1} * z)(b)`.
///
/// The DAG holds `2 * levels + 1` redexes while its tree expansion holds
/// exponentially many.
pub struct RedexLadder {
    pub root: NodeRef,
    pub a: NodeRef,
    pub b: NodeRef,
    pub redexes: usize,
}

pub fn make_redex_ladder(mgr: &mut NodeManager, levels: usize) -> RedexLadder {
    let a = mgr.mk_var("a", WIDTH).unwrap();
    let b = mgr.mk_var("b", WIDTH).unwrap();
    let one = mgr.mk_const(1, WIDTH).unwrap();
    let q = mgr.mk_param("q", WIDTH).unwrap();
    let inc = mgr.mk_add(q, one).unwrap();
    let inc = mgr.mk_lambda(q, inc).unwrap();
    let mut current = mgr.mk_apply(inc, &[a]).unwrap();
    for level in 0..levels {
        let y = mgr.mk_param(&format!("y{}", level), WIDTH).unwrap();
        let sum = mgr.mk_add(current, y).unwrap();
        let sum = mgr.mk_lambda(y, sum).unwrap();
        let sum = mgr.mk_apply(sum, &[a]).unwrap();
        let z = mgr.mk_param(&format!("z{}", level), WIDTH).unwrap();
        let prod = mgr.mk_op(Op::Mul, &[current, z]).unwrap();
        let prod = mgr.mk_lambda(z, prod).unwrap();
        let prod = mgr.mk_apply(prod, &[b]).unwrap();
        current = mgr.mk_op(Op::Xor, &[sum, prod]).unwrap();
    }
    RedexLadder {
        root: current,
        a,
        b,
        redexes: 2 * levels + 1,
    }
}

/// `c0 = λx. x + 1`, `ck = cond(sk, c{k-1}, cond(tk, c{k-1}, g))`, applied
/// to `a`. Every level refers to the previous one twice, so the function has
/// exponentially many paths down to its single lambda.
pub struct CondLadder {
    pub fun: NodeRef,
    pub uf: NodeRef,
    pub arg: NodeRef,
    pub app: NodeRef,
    /// `(sk, tk)` per level, innermost first.
    pub selectors: Vec<(NodeRef, NodeRef)>,
}

pub fn make_cond_ladder(mgr: &mut NodeManager, levels: usize) -> CondLadder {
    let x = mgr.mk_param("x", WIDTH).unwrap();
    let one = mgr.mk_const(1, WIDTH).unwrap();
    let body = mgr.mk_add(x, one).unwrap();
    let mut fun = mgr.mk_lambda(x, body).unwrap();
    let uf = mgr.mk_uf("g", &[WIDTH], WIDTH).unwrap();
    let mut selectors = Vec::with_capacity(levels);
    for level in 0..levels {
        let s = mgr.mk_var(&format!("s{}", level), 1).unwrap();
        let t = mgr.mk_var(&format!("t{}", level), 1).unwrap();
        let inner = mgr.mk_cond(t, fun, uf).unwrap();
        fun = mgr.mk_cond(s, fun, inner).unwrap();
        selectors.push((s, t));
    }
    let arg = mgr.mk_var("a", WIDTH).unwrap();
    let app = mgr.mk_apply(fun, &[arg]).unwrap();
    CondLadder {
        fun,
        uf,
        arg,
        app,
        selectors,
    }
}

pub struct RandomDag {
    pub root: NodeRef,
    pub vars: Vec<NodeRef>,
}

struct RandomDagBuilder<'a> {
    mgr: &'a mut NodeManager,
    rng: &'a mut Pcg64Mcg,
    binary_uf: NodeRef,
    unary_uf: NodeRef,
    next_param: usize,
}

impl<'a> RandomDagBuilder<'a> {
    fn pick(&mut self, pool: &[NodeRef]) -> NodeRef {
        *pool.choose(&mut *self.rng).unwrap()
    }

    fn fresh_param(&mut self) -> NodeRef {
        self.next_param += 1;
        let name = format!("p{}", self.next_param);
        self.mgr.mk_param(&name, WIDTH).unwrap()
    }

    fn random_lambda(&mut self, pool: &[NodeRef], arity: usize, nesting: usize) -> NodeRef {
        let params: Vec<NodeRef> = (0..arity).map(|_| self.fresh_param()).collect();
        let mut local: Vec<NodeRef> = pool.to_vec();
        local.extend(params.iter().copied());
        let steps = self.rng.gen_range(1..=4);
        for _ in 0..steps {
            let term = self.random_term(&local, nesting);
            local.push(term);
        }
        let body = *local.last().unwrap();
        self.mgr.mk_fun(&params, body).unwrap()
    }

    fn random_application(&mut self, pool: &[NodeRef], nesting: usize) -> NodeRef {
        let arity = self.rng.gen_range(1..=2);
        let mut fun = self.random_lambda(pool, arity, nesting - 1);
        if self.rng.gen_bool(0.25) {
            let other = self.random_lambda(pool, arity, nesting - 1);
            let a = self.pick(pool);
            let b = self.pick(pool);
            let sel = self.mgr.mk_op(Op::Ult, &[a, b]).unwrap();
            fun = self.mgr.mk_cond(sel, fun, other).unwrap();
        }
        let args: Vec<NodeRef> = (0..arity).map(|_| self.pick(pool)).collect();
        if arity == 2 && self.rng.gen_bool(0.5) {
            let partial = self.mgr.mk_apply(fun, &args[..1]).unwrap();
            self.mgr.mk_apply(partial, &args[1..]).unwrap()
        } else {
            self.mgr.mk_apply(fun, &args).unwrap()
        }
    }

    fn random_term(&mut self, pool: &[NodeRef], nesting: usize) -> NodeRef {
        let a = self.pick(pool);
        let b = self.pick(pool);
        match self.rng.gen_range(0..10) {
            0 => self.mgr.mk_not(a).unwrap(),
            1 => self.mgr.mk_op(Op::Neg, &[a]).unwrap(),
            2 => {
                let c = self.pick(pool);
                let sel = self.mgr.mk_eq(a, b).unwrap();
                self.mgr.mk_cond(sel, c, a).unwrap()
            }
            3 => {
                let hi = self.mgr.mk_slice(a, 3, 0).unwrap();
                let lo = self.mgr.mk_slice(b, 7, 4).unwrap();
                self.mgr.mk_op(Op::Concat, &[hi, lo]).unwrap()
            }
            4 => self.mgr.mk_apply(self.binary_uf, &[a, b]).unwrap(),
            5 => self.mgr.mk_apply(self.unary_uf, &[a]).unwrap(),
            6 | 7 if nesting > 0 => self.random_application(pool, nesting),
            choice => {
                let ops = [Op::And, Op::Or, Op::Xor, Op::Add, Op::Mul];
                self.mgr.mk_op(ops[choice % ops.len()], &[a, b]).unwrap()
            }
        }
    }
}

/// Builds a random closed bit-vector DAG of `steps` terms over a few
/// variables and two uninterpreted functions, with applied (and sometimes
/// curried, partially applied, or `cond`-selected) lambdas nested up to
/// `nesting` deep.
pub fn random_dag(
    mgr: &mut NodeManager,
    rng: &mut Pcg64Mcg,
    steps: usize,
    nesting: usize,
) -> RandomDag {
    let vars: Vec<NodeRef> = ["a", "b", "c"]
        .iter()
        .map(|name| mgr.mk_var(name, WIDTH).unwrap())
        .collect();
    let binary_uf = mgr.mk_uf("f", &[WIDTH, WIDTH], WIDTH).unwrap();
    let unary_uf = mgr.mk_uf("g", &[WIDTH], WIDTH).unwrap();
    let one = mgr.mk_const(1, WIDTH).unwrap();
    let mut pool = vars.clone();
    pool.push(one);
    let mut builder = RandomDagBuilder {
        mgr,
        rng,
        binary_uf,
        unary_uf,
        next_param: 0,
    };
    let mut root = vars[0];
    for _ in 0..steps {
        root = builder.random_term(&pool, nesting);
        pool.push(root);
    }
    RandomDag { root, vars }
}

/// Random values for every variable of `dag`.
pub fn random_inputs(dag: &RandomDag, rng: &mut Pcg64Mcg) -> HashMap<NodeRef, u64> {
    dag.vars
        .iter()
        .map(|v| (*v, rng.gen_range(0..=u8::MAX as u64)))
        .collect()
}
