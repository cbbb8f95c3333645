//! Graphviz rendering of WPBDDs.
//!
//! Terminals sit on the sink rank, roots on the source rank. Decision nodes
//! testing the same variable share a rank. High edges are solid and carry the
//! weight ids attached to the node; low edges are dashed.
//!
//! # Examples
//!
//! ```
//! use bnc_rs::bdd::Bdd;
//! use bnc_rs::reference::Ref;
//! use bnc_rs::types::Literal;
//!
//! let mut bdd = Bdd::default();
//! let x = bdd.mk_node(Literal::new(1), Ref::TRUE, Ref::FALSE, vec![7]);
//! let x = bdd.reference(x);
//!
//! let dot = bdd.to_dot(&[x]).unwrap();
//! assert!(dot.contains("label=\"7\""));
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! ```

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt::Write as _;

use crate::bdd::Bdd;
use crate::reference::Ref;

/// Shapes and edge styles used by [`Bdd::to_dot_with_config`].
#[derive(Debug, Clone)]
pub struct DotConfig {
    pub node_shape: &'static str,
    pub terminal_shape: &'static str,
    pub root_shape: &'static str,
    pub high_edge_style: &'static str,
    pub low_edge_style: &'static str,
    /// Label high edges with their weight ids.
    pub show_weights: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "circle",
            terminal_shape: "square",
            root_shape: "rect",
            high_edge_style: "solid",
            low_edge_style: "dashed",
            show_weights: true,
        }
    }
}

impl Bdd {
    /// Converts the diagrams under `roots` to DOT format.
    ///
    /// Shared nodes are displayed once.
    pub fn to_dot(&self, roots: &[Ref]) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(roots, &DotConfig::default())
    }

    pub fn to_dot_with_config(&self, roots: &[Ref], config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut nodes = HashSet::new();
        for &root in roots {
            nodes.extend(self.descendants(root));
        }
        self.render(roots, &nodes, config)
    }

    /// Render at most `width` nodes per level for `depth` levels below each root.
    ///
    /// Edges leaving the bounded context point at a `...` placeholder.
    pub fn context_to_dot(&self, roots: &[Ref], depth: usize, width: usize) -> Result<String, std::fmt::Error> {
        let mut nodes = HashSet::from([Ref::FALSE, Ref::TRUE]);
        let mut per_level = vec![0usize; depth + 1];
        let mut queue: VecDeque<(Ref, usize)> = roots.iter().map(|&r| (r, 0)).collect();
        while let Some((n, d)) = queue.pop_front() {
            if d > depth || nodes.contains(&n) || per_level[d] >= width {
                continue;
            }
            per_level[d] += 1;
            nodes.insert(n);
            if !n.is_terminal() {
                queue.push_back((self.high(n), d + 1));
                queue.push_back((self.low(n), d + 1));
            }
        }
        self.render(roots, &nodes, &DotConfig::default())
    }

    fn render(&self, roots: &[Ref], nodes: &HashSet<Ref>, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}, fixedsize=true];", config.node_shape)?;

        writeln!(dot, "{{ rank=sink")?;
        writeln!(dot, "0 [shape={}, label=\"F\"];", config.terminal_shape)?;
        writeln!(dot, "1 [shape={}, label=\"T\"];", config.terminal_shape)?;
        writeln!(dot, "}}")?;

        let mut groups = BTreeMap::<u32, Vec<Ref>>::new();
        for &n in nodes.iter().filter(|n| !n.is_terminal()) {
            let v = self.variable_of(self.literal(n)).unwrap_or_default();
            groups.entry(v).or_default().push(n);
        }
        for group in groups.values_mut() {
            group.sort();
            writeln!(dot, "{{ rank=same")?;
            for &n in group.iter() {
                writeln!(dot, "{} [label=\"{}\"];", n.get(), self.literal(n))?;
            }
            writeln!(dot, "}}")?;
        }

        let mut truncated = false;
        for group in groups.values() {
            for &n in group {
                let (high, low) = (self.high(n), self.low(n));
                let high_target = if nodes.contains(&high) {
                    high.get().to_string()
                } else {
                    truncated = true;
                    "more".to_string()
                };
                let weights = self.weights(n);
                if config.show_weights && !weights.is_empty() {
                    let label: Vec<String> = weights.iter().map(|w| w.to_string()).collect();
                    writeln!(
                        dot,
                        "{} -> {} [style={}, label=\"{}\"];",
                        n.get(),
                        high_target,
                        config.high_edge_style,
                        label.join(",")
                    )?;
                } else {
                    writeln!(dot, "{} -> {} [style={}];", n.get(), high_target, config.high_edge_style)?;
                }
                let low_target = if nodes.contains(&low) {
                    low.get().to_string()
                } else {
                    truncated = true;
                    "more".to_string()
                };
                writeln!(dot, "{} -> {} [style={}];", n.get(), low_target, config.low_edge_style)?;
            }
        }
        if truncated {
            writeln!(dot, "more [shape=none, label=\"...\"];")?;
        }

        writeln!(dot, "{{ rank=source")?;
        for (i, root) in roots.iter().enumerate() {
            writeln!(dot, "r{} [shape={}, label=\"{}\"];", i, config.root_shape, root)?;
        }
        writeln!(dot, "}}")?;
        for (i, &root) in roots.iter().enumerate() {
            writeln!(dot, "r{} -> {};", i, root.get())?;
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::Literal;

    fn chain(bdd: &mut Bdd, len: i32) -> Ref {
        let mut root = Ref::TRUE;
        for l in (1..=len).rev() {
            root = bdd.mk_node(Literal::new(l), root, Ref::FALSE, vec![]);
        }
        bdd.reference(root)
    }

    #[test]
    fn test_to_dot_basic() {
        let mut bdd = Bdd::default();
        let f = chain(&mut bdd, 3);
        let dot = bdd.to_dot(&[f]).unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.ends_with("}\n"));
        assert!(!dot.contains("more"));
    }

    #[test]
    fn test_to_dot_constants() {
        let bdd = Bdd::default();
        let dot = bdd.to_dot(&[Ref::FALSE, Ref::TRUE]).unwrap();
        assert!(dot.contains("r0 -> 0;"));
        assert!(dot.contains("r1 -> 1;"));
    }

    #[test]
    fn test_to_dot_without_weights() {
        let mut bdd = Bdd::default();
        let x = bdd.mk_node(Literal::new(1), Ref::TRUE, Ref::FALSE, vec![5]);
        let x = bdd.reference(x);
        let config = DotConfig {
            show_weights: false,
            ..DotConfig::default()
        };
        let dot = bdd.to_dot_with_config(&[x], &config).unwrap();
        assert!(!dot.contains("label=\"5\""));
    }

    #[test]
    fn test_context_is_bounded() {
        let mut bdd = Bdd::default();
        let f = chain(&mut bdd, 10);
        let dot = bdd.context_to_dot(&[f], 4, 20).unwrap();
        assert!(dot.contains("more"));
        assert!(!dot.contains("label=\"9\""));
    }
}
