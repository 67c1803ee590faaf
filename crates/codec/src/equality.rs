//! Structural equality between documents
//!
//! Two documents are equal when their graphs are bisimilar: node identity
//! and arena layout do not matter, neither does the order of object keys or
//! set members, and `NaN` equals `NaN`. Pairs of nodes already under comparison are assumed
//! equal, which is what lets cyclic graphs terminate.

use crate::document::{Document, Node, Value};
use std::collections::HashSet;

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        Comparison {
            left: self,
            right: other,
            assumed: HashSet::new(),
        }
        .values(&self.root, &other.root)
    }
}

struct Comparison<'a> {
    left: &'a Document,
    right: &'a Document,
    assumed: HashSet<(usize, usize)>,
}

impl Comparison<'_> {
    fn values(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
            (Value::String(x), Value::String(y)) => x == y,
            (Value::Date(x), Value::Date(y)) => x == y,
            (Value::Regex(x), Value::Regex(y)) => x == y,
            (Value::Node(x), Value::Node(y)) => {
                if !self.assumed.insert((x.0, y.0)) {
                    return true;
                }
                match (self.left.node(*x), self.right.node(*y)) {
                    (Some(l), Some(r)) => self.nodes(l, r),
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn nodes(&mut self, a: &Node, b: &Node) -> bool {
        match (a, b) {
            (Node::Array(x), Node::Array(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(l, r)| self.values(l, r))
            }
            (Node::Set(x), Node::Set(y)) => x.len() == y.len() && self.members(x, y),
            (Node::Object(x), Node::Object(y)) => {
                x.len() == y.len()
                    && x
                        .iter()
                        .all(|(key, l)| y.get(key).is_some_and(|r| self.values(l, r)))
            }
            _ => false,
        }
    }

    /// Every member on the left pairs off with a distinct equal member on the right
    fn members(&mut self, x: &[Value], y: &[Value]) -> bool {
        let mut unused: Vec<&Value> = y.iter().collect();
        for l in x {
            let mut matched = None;
            for (index, r) in unused.iter().enumerate() {
                // Assumptions made by a failed pairing must not leak into the next
                let before = self.assumed.clone();
                if self.values(l, r) {
                    matched = Some(index);
                    break;
                }
                self.assumed = before;
            }
            match matched {
                Some(index) => {
                    unused.swap_remove(index);
                }
                None => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::document::{Document, Node, Value};

    #[test]
    fn test_key_order_is_irrelevant() {
        let a = Document::object([("a", Value::from(1)), ("b", Value::from(2))]);
        let b = Document::object([("b", Value::from(2)), ("a", Value::from(1))]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_nan_equals_nan() {
        assert_eq!(Document::from(f64::NAN), Document::from(f64::NAN));
        assert_ne!(Document::from(f64::INFINITY), Document::from(f64::NEG_INFINITY));
    }

    #[test]
    fn test_array_and_set_differ() {
        assert_ne!(Document::array([1, 2]), Document::set([1, 2]));
    }

    #[test]
    fn test_set_member_order_is_irrelevant() {
        assert_eq!(Document::set([1, 2, 3]), Document::set([3, 1, 2]));
        assert_ne!(Document::set([1, 1, 2]), Document::set([1, 2, 2]));
        assert_ne!(Document::array([1, 2]), Document::array([2, 1]));
    }

    #[test]
    fn test_cycles_with_different_layout() {
        // a = { next: a }
        let mut a = Document::new();
        let a_id = a.alloc(Node::object());
        a.insert(a_id, "next", a_id.into());
        a.set_root(a_id.into());

        // b = { next: { next: b' } } where b' loops to itself, built with padding nodes
        let mut b = Document::new();
        b.alloc(Node::array());
        let outer = b.alloc(Node::object());
        let inner = b.alloc(Node::object());
        b.insert(outer, "next", inner.into());
        b.insert(inner, "next", inner.into());
        b.set_root(outer.into());

        assert_eq!(a, b);
    }

    #[test]
    fn test_cycle_against_finite_tree() {
        let mut a = Document::new();
        let a_id = a.alloc(Node::object());
        a.insert(a_id, "next", a_id.into());
        a.set_root(a_id.into());

        let mut b = Document::new();
        let outer = b.alloc(Node::object());
        let inner = b.alloc(Node::object());
        b.insert(outer, "next", inner.into());
        b.insert(inner, "next", Value::Null);
        b.set_root(outer.into());

        assert_ne!(a, b);
    }
}
