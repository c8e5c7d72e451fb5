// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use string_interner::symbol::SymbolU32;

/// Handle to a node owned by a `NodeManager`.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeRef {
    pub id: u32,
}

impl NodeRef {
    /// Key under which this node is stored in the int hash tables.
    #[inline]
    pub fn key(&self) -> i32 {
        self.id as i32
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.id)
    }
}

pub type Symbol = SymbolU32;

pub const MAX_WIDTH: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sort {
    BitVec(u32),
    /// Curried function sort: applying `domain.len()` arguments yields a
    /// bit-vector of width `codomain`.
    Fun { domain: Vec<u32>, codomain: u32 },
}

impl Sort {
    pub fn is_fun(&self) -> bool {
        matches!(self, Sort::Fun { .. })
    }

    pub fn bit_width(&self) -> Option<u32> {
        match self {
            Sort::BitVec(width) => Some(*width),
            Sort::Fun { .. } => None,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Sort::BitVec(_) => 0,
            Sort::Fun { domain, .. } => domain.len(),
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::BitVec(width) => write!(f, "bv{}", width),
            Sort::Fun { domain, codomain } => {
                for width in domain {
                    write!(f, "bv{} ", width)?;
                }
                write!(f, "-> bv{}", codomain)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Not,
    Neg,
    And,
    Or,
    Xor,
    Add,
    Mul,
    Eq,
    Ult,
    Concat,
    Slice { hi: u32, lo: u32 },
    /// If-then-else over bit-vectors or over functions of the same sort.
    Cond,
}

impl Op {
    pub fn operand_count(&self) -> usize {
        match self {
            Op::Not | Op::Neg | Op::Slice { .. } => 1,
            Op::Cond => 3,
            _ => 2,
        }
    }

    pub fn is_commutative(&self) -> bool {
        matches!(
            self,
            Op::And | Op::Or | Op::Xor | Op::Add | Op::Mul | Op::Eq
        )
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Not => "not",
            Op::Neg => "neg",
            Op::And => "and",
            Op::Or => "or",
            Op::Xor => "xor",
            Op::Add => "add",
            Op::Mul => "mul",
            Op::Eq => "eq",
            Op::Ult => "ult",
            Op::Concat => "concat",
            Op::Slice { .. } => "slice",
            Op::Cond => "cond",
        }
    }

    /// Parses a mnemonic for the operators that carry no attributes.
    pub fn from_mnemonic(s: &str) -> Option<Op> {
        Some(match s {
            "not" => Op::Not,
            "neg" => Op::Neg,
            "and" => Op::And,
            "or" => Op::Or,
            "xor" => Op::Xor,
            "add" => Op::Add,
            "mul" => Op::Mul,
            "eq" => Op::Eq,
            "ult" => Op::Ult,
            "concat" => Op::Concat,
            "cond" => Op::Cond,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Const,
    Var,
    Param,
    Op,
    Apply,
    Lambda,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Const {
        value: u64,
        width: u32,
    },
    /// Free bit-vector variable, or uninterpreted function / array variable
    /// when `sort` is a function sort.
    Var {
        name: Symbol,
        sort: Sort,
    },
    /// Lambda-bound variable.
    Param {
        name: Symbol,
        width: u32,
    },
    Op {
        op: Op,
        operands: Vec<NodeRef>,
    },
    Apply {
        fun: NodeRef,
        args: Vec<NodeRef>,
    },
    Lambda {
        param: NodeRef,
        body: NodeRef,
    },
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Const { .. } => NodeKind::Const,
            Node::Var { .. } => NodeKind::Var,
            Node::Param { .. } => NodeKind::Param,
            Node::Op { .. } => NodeKind::Op,
            Node::Apply { .. } => NodeKind::Apply,
            Node::Lambda { .. } => NodeKind::Lambda,
        }
    }

    /// Returns the nodes this node directly references, in order.
    pub fn children(&self) -> Vec<NodeRef> {
        match self {
            Node::Const { .. } | Node::Var { .. } | Node::Param { .. } => vec![],
            Node::Op { operands, .. } => operands.clone(),
            Node::Apply { fun, args } => {
                let mut children = Vec::with_capacity(args.len() + 1);
                children.push(*fun);
                children.extend(args.iter().copied());
                children
            }
            Node::Lambda { param, body } => vec![*param, *body],
        }
    }
}

/// Mask with the low `width` bits set.
#[inline]
pub fn width_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}
