//! Parallel multigraph compilation.
//!
//! Without local structure, the OR node of context `c` in a chain layer is
//! node `c`, and its edges point at child contexts computed from `c` alone.
//! Layers therefore do not depend on each other and workers can fill them in
//! any order. Work is split at one of three levels:
//!
//! | Level | Task                                  |
//! |-------|---------------------------------------|
//! | 1     | a whole partition                     |
//! | 2     | a whole layer                         |
//! | 3     | a range of contexts within a layer    |
//!
//! Tasks travel either over one bounded single-consumer channel per worker,
//! filled round-robin, or through one shared multi-consumer queue. Workers
//! on the shared queue sleep on a bounded doorbell channel that carries one
//! token per task. A full channel makes the dispatcher wait. Workers stop
//! once the dispatcher hangs up.

use std::str::FromStr;
use std::thread;

use concurrent_queue::{ConcurrentQueue, PopError};
use crossbeam_channel::TrySendError;
use log::{debug, info, warn};

use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::literals::LiteralMap;
use crate::multigraph::{child_context, edge_weight, Edge, EdgeWeight, Layer, MgNode, MultiGraph, NodeId};
use crate::spanning::SpanningTree;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QueueKind {
    /// One bounded channel per worker.
    Spsc,
    /// One bounded queue shared by every worker.
    Mpmc,
}

impl FromStr for QueueKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "spsc" | "0" => Ok(QueueKind::Spsc),
            "mpmc" | "1" => Ok(QueueKind::Mpmc),
            _ => Err(format!("unknown queue kind '{}'", s)),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParallelLevel {
    Partition = 1,
    Layer = 2,
    Node = 3,
}

impl ParallelLevel {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            1 => Some(ParallelLevel::Partition),
            2 => Some(ParallelLevel::Layer),
            3 => Some(ParallelLevel::Node),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct ParallelOptions {
    /// `0` means one per CPU.
    pub workers: usize,
    pub queue: QueueKind,
    pub level: ParallelLevel,
    /// Tasks a queue holds before the dispatcher waits.
    pub capacity: usize,
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self {
            workers: 0,
            queue: QueueKind::Spsc,
            level: ParallelLevel::Layer,
            capacity: 64,
        }
    }
}

impl ParallelOptions {
    pub fn nr_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }
}

/// Run `work` on every task over `workers` threads; results come back in
/// completion order.
fn run_pool<T, R, F>(options: &ParallelOptions, tasks: impl IntoIterator<Item = T>, work: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let n = options.nr_workers();
    let capacity = options.capacity.max(1);
    let work = &work;
    let (results_tx, results_rx) = crossbeam_channel::unbounded();
    // Shared task queue; one doorbell token per pushed task.
    let queue = ConcurrentQueue::<T>::unbounded();
    let queue = &queue;

    thread::scope(|s| match options.queue {
        QueueKind::Spsc => {
            let mut senders = Vec::with_capacity(n);
            for _ in 0..n {
                let (tx, rx) = crossbeam_channel::bounded::<T>(capacity);
                senders.push(tx);
                let results = results_tx.clone();
                s.spawn(move || {
                    for task in rx {
                        if results.send(work(task)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(results_tx);

            let mut next = 0;
            for task in tasks {
                let mut pending = Some(task);
                for k in 0..n {
                    let Some(task) = pending.take() else {
                        break;
                    };
                    match senders[(next + k) % n].try_send(task) {
                        Ok(()) => {}
                        Err(TrySendError::Full(t)) | Err(TrySendError::Disconnected(t)) => pending = Some(t),
                    }
                }
                if let Some(task) = pending {
                    if senders[next].send(task).is_err() {
                        warn!("worker {} hung up, dropping its task", next);
                    }
                }
                next = (next + 1) % n;
            }
            drop(senders);
            results_rx.iter().collect()
        }
        QueueKind::Mpmc => {
            let (bell_tx, bell_rx) = crossbeam_channel::bounded::<()>(capacity);
            for _ in 0..n {
                let results = results_tx.clone();
                let bell = bell_rx.clone();
                s.spawn(move || {
                    for () in bell {
                        match queue.pop() {
                            Ok(task) => {
                                if results.send(work(task)).is_err() {
                                    break;
                                }
                            }
                            Err(PopError::Empty) | Err(PopError::Closed) => {
                                warn!("task queue is empty after a doorbell");
                                break;
                            }
                        }
                    }
                });
            }
            drop(bell_rx);
            drop(results_tx);

            for task in tasks {
                if queue.push(task).is_err() || bell_tx.send(()).is_err() {
                    warn!("all workers hung up, stopping dispatch");
                    break;
                }
            }
            drop(bell_tx);
            queue.close();
            results_rx.iter().collect()
        }
    })
}

fn check_supported(tree: &SpanningTree, structure: bool) -> Result<()> {
    if structure {
        return Err(Error::Unsupported(
            "parallel multigraph compilation with local structure".to_string(),
        ));
    }
    if tree.is_tree() {
        return Err(Error::Unsupported("parallel multigraph compilation of a tree".to_string()));
    }
    Ok(())
}

/// OR nodes of contexts `start..end` of chain layer `index`.
fn or_nodes<W: EdgeWeight>(tree: &SpanningTree, map: &LiteralMap, index: usize, start: usize, end: usize) -> Vec<MgNode<W>> {
    let node = tree.node(index);
    let terminal = NodeId::new(tree.len() - 1, 0);
    let child = node.children[0];
    let mut ctx = node.counter();
    let mut nodes = Vec::with_capacity(end - start);
    for c in start..end {
        ctx.set_decimal(c);
        let edges = (0..node.dimension)
            .map(|value| match edge_weight::<W>(tree, map, node, &ctx, value) {
                None => Edge {
                    to: terminal,
                    weight: W::zero(),
                },
                Some(weight) => {
                    let to = if tree.node(child).is_terminal() {
                        terminal
                    } else {
                        NodeId::new(child, child_context(tree, child, &ctx, value))
                    };
                    Edge { to, weight }
                }
            })
            .collect();
        nodes.push(MgNode {
            variable: node.variable,
            and: false,
            edges,
        });
    }
    nodes
}

/// Compile a chain with the layers or contexts spread over a worker pool.
pub fn compile_parallel<W: EdgeWeight>(
    tree: &SpanningTree,
    map: &LiteralMap,
    structure: bool,
    options: &ParallelOptions,
    deadline: &Deadline,
) -> Result<MultiGraph<W>> {
    check_supported(tree, structure)?;
    let workers = options.nr_workers();
    let layers = 1..tree.len() - 1;

    let mut tasks = Vec::new();
    for index in layers.clone() {
        let cardinality = tree.node(index).cardinality;
        let chunk = match options.level {
            ParallelLevel::Node => cardinality.div_ceil(workers * 4).max(1),
            ParallelLevel::Partition | ParallelLevel::Layer => cardinality.max(1),
        };
        let mut start = 0;
        while start < cardinality {
            let end = (start + chunk).min(cardinality);
            tasks.push((index, start, end));
            start = end;
        }
    }
    info!(
        "parallel multigraph: {} tasks over {} workers ({:?} queue, level {:?})",
        tasks.len(),
        workers,
        options.queue,
        options.level
    );

    let mut results = run_pool(options, tasks, |(index, start, end)| {
        deadline.check()?;
        Ok((index, start, or_nodes::<W>(tree, map, index, start, end)))
    })
    .into_iter()
    .collect::<Result<Vec<_>>>()?;
    results.sort_unstable_by_key(|&(index, start, _)| (index, start));

    let mut mg = MultiGraph::<W>::empty(tree);
    let mut per_layer: Vec<Vec<MgNode<W>>> = vec![Vec::new(); tree.len()];
    for (index, _, nodes) in results {
        per_layer[index].extend(nodes);
    }
    for index in layers {
        let nodes = std::mem::take(&mut per_layer[index]);
        let node = tree.node(index);
        if nodes.len() != node.cardinality {
            return Err(Error::internal(format!(
                "layer {} has {} of {} nodes after parallel compilation",
                index,
                nodes.len(),
                node.cardinality
            )));
        }
        debug!("layer {} (variable {}): {} nodes", index, node.variable, nodes.len());
        mg.set_layer(index, Layer::with_nodes(node, nodes));
    }
    mg.set_root(tree);
    info!("multigraph: {}", mg.size());
    Ok(mg)
}

/// Compile one multigraph per tree, one task per tree.
pub fn compile_partitions<W: EdgeWeight>(
    trees: &[SpanningTree],
    map: &LiteralMap,
    structure: bool,
    options: &ParallelOptions,
    deadline: &Deadline,
) -> Result<Vec<MultiGraph<W>>> {
    if structure {
        return Err(Error::Unsupported(
            "parallel multigraph compilation with local structure".to_string(),
        ));
    }
    let mut results = run_pool(options, 0..trees.len(), |i| {
        MultiGraph::<W>::compile(&trees[i], map, false, deadline).map(|mg| (i, mg))
    })
    .into_iter()
    .collect::<Result<Vec<_>>>()?;
    results.sort_unstable_by_key(|(i, _)| *i);
    Ok(results.into_iter().map(|(_, mg)| mg).collect())
}
