// SPDX-License-Identifier: Apache-2.0

//! Line-oriented text form of a node cone.
//!
//! ```text
//! %1 = uf f : bv8 bv8 -> bv8
//! %2 = param x : bv8
//! %3 = apply %1 %2 %2
//! %4 = lambda %2 %3
//! %5 = const 7 : bv8
//! %6 = apply %4 %5
//! ```
//!
//! Every line defines one node in terms of nodes defined on earlier lines;
//! the node on the last line is the root.

use std::fmt::Write;

use crate::int_hash_map::{IntToIntMap, IntToNodeMap};
use crate::node::{Node, NodeRef, Op, Sort};
use crate::node_manager::NodeManager;
use crate::topo::postorder;

#[derive(Debug)]
pub struct ParseError {
    msg: String,
}

impl ParseError {
    fn new(msg: String) -> Self {
        Self { msg }
    }

    fn new_at_line(msg: String, lineno: usize) -> Self {
        Self {
            msg: format!("{} at line {}", msg, lineno),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ParseError: {}", self.msg)
    }
}

impl std::error::Error for ParseError {}

fn bv_sort_text(width: u32) -> String {
    format!("bv{}", width)
}

/// Prints the cone of `root` in topological order, numbering nodes densely
/// from 1.
pub fn to_text(mgr: &NodeManager, root: NodeRef) -> String {
    let order = postorder(&[root], mgr);
    let mut numbering = IntToIntMap::new();
    let mut out = String::new();
    for (i, node) in order.iter().enumerate() {
        let number = (i + 1) as i32;
        if numbering.insert(node.key(), number).is_err() {
            unreachable!("postorder repeated {}", node);
        }
        let num = |r: &NodeRef| -> String {
            match numbering.get(r.key()) {
                Some(n) => format!("%{}", n),
                None => unreachable!("child {} printed before being numbered", r),
            }
        };
        let name = mgr.name(*node).unwrap_or("");
        let rhs = match mgr.get(*node) {
            Node::Const { value, width } => {
                format!("const {} : {}", value, bv_sort_text(*width))
            }
            Node::Var {
                sort: Sort::BitVec(width),
                ..
            } => format!("var {} : {}", name, bv_sort_text(*width)),
            Node::Var { sort, .. } => format!("uf {} : {}", name, sort),
            Node::Param { width, .. } => format!("param {} : {}", name, bv_sort_text(*width)),
            Node::Op {
                op: Op::Slice { hi, lo },
                operands,
            } => format!("slice {} {} {}", num(&operands[0]), hi, lo),
            Node::Op { op, operands } => {
                let operands: Vec<String> = operands.iter().map(num).collect();
                format!("{} {}", op.mnemonic(), operands.join(" "))
            }
            Node::Apply { fun, args } => {
                let args: Vec<String> = args.iter().map(num).collect();
                format!("apply {} {}", num(fun), args.join(" "))
            }
            Node::Lambda { param, body } => format!("lambda {} {}", num(param), num(body)),
        };
        let _ = writeln!(out, "%{} = {}", number, rhs);
    }
    out
}

struct LineParser<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
    lineno: usize,
}

impl<'a> LineParser<'a> {
    fn new(line: &'a str, lineno: usize) -> Self {
        Self {
            tokens: line.split_whitespace().collect(),
            pos: 0,
            lineno,
        }
    }

    fn err(&self, msg: &str) -> ParseError {
        ParseError::new_at_line(msg.to_string(), self.lineno)
    }

    fn next(&mut self) -> Result<&'a str, ParseError> {
        let tok = self
            .tokens
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.err("unexpected end of line"))?;
        self.pos += 1;
        Ok(tok)
    }

    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn drop_or_error(&mut self, want: &str) -> Result<(), ParseError> {
        let tok = self.next()?;
        if tok == want {
            Ok(())
        } else {
            Err(self.err(&format!("expected '{}' got '{}'", want, tok)))
        }
    }

    fn parse_number(&mut self) -> Result<u64, ParseError> {
        let tok = self.next()?;
        let parsed = match tok.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => tok.parse::<u64>(),
        };
        parsed.map_err(|e| self.err(&format!("invalid number '{}': {}", tok, e)))
    }

    fn parse_u32(&mut self) -> Result<u32, ParseError> {
        let value = self.parse_number()?;
        u32::try_from(value).map_err(|_| self.err(&format!("{} is too large", value)))
    }

    fn parse_id(&mut self) -> Result<i32, ParseError> {
        let tok = self.next()?;
        let digits = tok
            .strip_prefix('%')
            .ok_or_else(|| self.err(&format!("expected node reference, got '{}'", tok)))?;
        digits
            .parse::<i32>()
            .map_err(|e| self.err(&format!("invalid node reference '{}': {}", tok, e)))
    }

    fn parse_width(&mut self) -> Result<u32, ParseError> {
        let tok = self.next()?;
        tok.strip_prefix("bv")
            .and_then(|w| w.parse::<u32>().ok())
            .ok_or_else(|| self.err(&format!("expected bit-vector sort, got '{}'", tok)))
    }
}

/// Parses the text form, building every node through `mgr`; returns the
/// node defined on the last line.
pub fn parse_text(mgr: &mut NodeManager, text: &str) -> Result<NodeRef, ParseError> {
    let mut defined = IntToNodeMap::new();
    let mut root = None;
    for (index, line) in text.lines().enumerate() {
        let lineno = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let mut p = LineParser::new(line, lineno);
        let id = p.parse_id()?;
        p.drop_or_error("=")?;
        let lookup = |p: &mut LineParser, defined: &IntToNodeMap| -> Result<NodeRef, ParseError> {
            let id = p.parse_id()?;
            defined
                .get(id)
                .copied()
                .ok_or_else(|| p.err(&format!("reference to undefined node %{}", id)))
        };
        let sort_err = |e: crate::node_manager::SortError| ParseError::new_at_line(e.to_string(), lineno);
        let keyword = p.next()?;
        let node = match keyword {
            "var" | "param" => {
                let name = p.next()?;
                p.drop_or_error(":")?;
                let width = p.parse_width()?;
                if keyword == "var" {
                    mgr.mk_var(name, width).map_err(sort_err)?
                } else {
                    mgr.mk_param(name, width).map_err(sort_err)?
                }
            }
            "uf" => {
                let name = p.next()?;
                p.drop_or_error(":")?;
                let mut domain = Vec::new();
                while p.peek() != Some("->") {
                    domain.push(p.parse_width()?);
                }
                p.drop_or_error("->")?;
                let codomain = p.parse_width()?;
                mgr.mk_uf(name, &domain, codomain).map_err(sort_err)?
            }
            "const" => {
                let value = p.parse_number()?;
                p.drop_or_error(":")?;
                let width = p.parse_width()?;
                mgr.mk_const(value, width).map_err(sort_err)?
            }
            "slice" => {
                let operand = lookup(&mut p, &defined)?;
                let hi = p.parse_u32()?;
                let lo = p.parse_u32()?;
                mgr.mk_slice(operand, hi, lo).map_err(sort_err)?
            }
            "apply" => {
                let fun = lookup(&mut p, &defined)?;
                let mut args = Vec::new();
                while !p.at_end() {
                    args.push(lookup(&mut p, &defined)?);
                }
                mgr.mk_apply(fun, &args).map_err(sort_err)?
            }
            "lambda" => {
                let param = lookup(&mut p, &defined)?;
                let body = lookup(&mut p, &defined)?;
                mgr.mk_lambda(param, body).map_err(sort_err)?
            }
            mnemonic => {
                let op = Op::from_mnemonic(mnemonic)
                    .ok_or_else(|| p.err(&format!("unknown operation '{}'", mnemonic)))?;
                let mut operands = Vec::new();
                while !p.at_end() {
                    operands.push(lookup(&mut p, &defined)?);
                }
                mgr.mk_op(op, &operands).map_err(sort_err)?
            }
        };
        if !p.at_end() {
            return Err(p.err(&format!("trailing tokens after definition of %{}", id)));
        }
        if defined.insert(id, node).is_err() {
            return Err(p.err(&format!("%{} is defined more than once", id)));
        }
        root = Some(node);
    }
    root.ok_or_else(|| ParseError::new("no node definitions".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use crate::node_manager::NodeManagerOptions;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "%1 = var a : bv8
%2 = uf f : bv8 bv8 -> bv8
%3 = param x : bv8
%4 = const 5 : bv8
%5 = add %3 %4
%6 = apply %2 %5 %3
%7 = lambda %3 %6
%8 = apply %7 %1
";

    #[test]
    fn test_print_renumbers_in_postorder() {
        let mut mgr = NodeManager::new(NodeManagerOptions::no_opt());
        let root = parse_text(&mut mgr, SAMPLE).unwrap();
        assert_eq!(mgr.kind(root), NodeKind::Apply);
        let want = "%1 = param x : bv8
%2 = uf f : bv8 bv8 -> bv8
%3 = const 5 : bv8
%4 = add %1 %3
%5 = apply %2 %4 %1
%6 = lambda %1 %5
%7 = var a : bv8
%8 = apply %6 %7
";
        assert_eq!(to_text(&mgr, root), want);
    }

    #[test]
    fn test_printed_text_is_stable() {
        let mut mgr = NodeManager::new(NodeManagerOptions::no_opt());
        let root = parse_text(&mut mgr, SAMPLE).unwrap();
        let printed = to_text(&mgr, root);
        let reparsed = parse_text(&mut mgr, &printed).unwrap();
        assert_eq!(to_text(&mgr, reparsed), printed);
    }

    #[test]
    fn test_slice_and_hex_const() {
        let text = "%1 = var a : bv8\n%2 = slice %1 7 4\n%3 = const 0xf : bv4\n%4 = xor %2 %3\n";
        let mut mgr = NodeManager::new(NodeManagerOptions::no_opt());
        let root = parse_text(&mut mgr, text).unwrap();
        assert_eq!(
            to_text(&mgr, root),
            "%1 = var a : bv8\n%2 = slice %1 7 4\n%3 = const 15 : bv4\n%4 = xor %2 %3\n"
        );
    }

    #[test]
    fn test_parse_folds_when_enabled() {
        let text = "%1 = var a : bv8\n%2 = const 0 : bv8\n%3 = add %1 %2\n";
        let mut mgr = NodeManager::new(NodeManagerOptions::opt());
        let root = parse_text(&mut mgr, text).unwrap();
        assert_eq!(mgr.kind(root), NodeKind::Var);
    }

    #[test]
    fn test_undefined_reference_reports_line() {
        let text = "%1 = var a : bv8\n\n%2 = add %1 %7\n";
        let mut mgr = NodeManager::default();
        let err = parse_text(&mut mgr, text).unwrap_err();
        assert!(err.to_string().contains("undefined node %7"), "{}", err);
        assert!(err.to_string().contains("line 3"), "{}", err);
    }

    #[test]
    fn test_sort_error_is_parse_error() {
        let text = "%1 = var a : bv8\n%2 = var b : bv4\n%3 = add %1 %2\n";
        let mut mgr = NodeManager::default();
        let err = parse_text(&mut mgr, text).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{}", err);
    }

    #[test]
    fn test_malformed_lines() {
        let mut mgr = NodeManager::default();
        assert!(parse_text(&mut mgr, "").is_err());
        assert!(parse_text(&mut mgr, "%1 = frob a : bv8").is_err());
        assert!(parse_text(&mut mgr, "%1 = var a : bv8 extra").is_err());
        assert!(parse_text(&mut mgr, "%1 = var a : bv8\n%1 = var b : bv8").is_err());
        assert!(parse_text(&mut mgr, "%1 = var a : int").is_err());
    }
}
