//! Generic graph with keyed vertices and labeled edges.
//!
//! [`LabeledGraph`] is an arena of vertices addressed by integer keys. Keys
//! handed out by [`LabeledGraph::add_node`] increase monotonically and are
//! never reused, even after removal. Edges carry an optional payload and an
//! integer weight; two edges between the same pair of vertices are distinct
//! as long as their payloads differ, which lets a circuit DAG carry one edge
//! per wire.
//!
//! Query results are returned as key lists sorted in ascending order, so
//! every traversal is deterministic.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};

/// Key identifying a vertex within one graph.
pub type VertexKey = usize;

/// A vertex with an optional payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex<V> {
    key: VertexKey,
    data: Option<V>,
}

impl<V> Vertex<V> {
    /// The vertex key.
    #[inline]
    pub fn key(&self) -> VertexKey {
        self.key
    }

    /// The payload, if any.
    #[inline]
    pub fn data(&self) -> Option<&V> {
        self.data.as_ref()
    }

    /// Replace the payload.
    pub fn set_data(&mut self, data: V) {
        self.data = Some(data);
    }
}

/// An edge payload and weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge<E> {
    /// Optional payload, e.g. a wire label.
    pub data: Option<E>,
    /// Integer weight.
    pub weight: i64,
}

/// A directed or undirected multigraph with keyed vertices.
#[derive(Debug, Clone)]
pub struct LabeledGraph<V, E> {
    graph: StableDiGraph<Vertex<V>, Edge<E>>,
    index: BTreeMap<VertexKey, NodeIndex>,
    next_key: VertexKey,
    directed: bool,
}

impl<V, E> Default for LabeledGraph<V, E> {
    fn default() -> Self {
        Self::directed()
    }
}

impl<V, E> LabeledGraph<V, E> {
    /// Create an empty directed graph.
    pub fn directed() -> Self {
        Self {
            graph: StableDiGraph::default(),
            index: BTreeMap::new(),
            next_key: 0,
            directed: true,
        }
    }

    /// Create an empty undirected graph. Every edge is stored in both directions.
    pub fn undirected() -> Self {
        Self {
            directed: false,
            ..Self::directed()
        }
    }

    /// Check if the graph is directed.
    #[inline]
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.index.len()
    }

    /// Number of stored edges. Undirected edges count twice.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if a vertex exists.
    #[inline]
    pub fn contains_vertex(&self, key: VertexKey) -> bool {
        self.index.contains_key(&key)
    }

    /// Vertex keys in ascending order.
    pub fn vertex_keys(&self) -> impl Iterator<Item = VertexKey> + '_ {
        self.index.keys().copied()
    }

    /// Vertices in ascending key order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex<V>> + '_ {
        self.index.values().map(|&ix| &self.graph[ix])
    }

    /// Get a vertex by key.
    pub fn vertex(&self, key: VertexKey) -> Option<&Vertex<V>> {
        self.index.get(&key).map(|&ix| &self.graph[ix])
    }

    /// Get the payload of a vertex.
    pub fn data(&self, key: VertexKey) -> Option<&V> {
        self.vertex(key)?.data.as_ref()
    }

    /// Get the payload of a vertex mutably.
    pub fn data_mut(&mut self, key: VertexKey) -> Option<&mut V> {
        let ix = *self.index.get(&key)?;
        self.graph[ix].data.as_mut()
    }

    /// Return the vertex for `key`, creating an empty one if absent.
    pub fn add_vertex(&mut self, key: VertexKey) -> &mut Vertex<V> {
        let ix = self.ensure_vertex(key);
        &mut self.graph[ix]
    }

    /// Add a vertex with a payload under a fresh key.
    pub fn add_node(&mut self, data: V) -> VertexKey {
        let key = self.next_key;
        self.add_vertex(key).set_data(data);
        key
    }

    /// Remove a vertex and its edges. Absent keys are ignored.
    pub fn remove_vertex(&mut self, key: VertexKey) -> Option<V> {
        let ix = self.index.remove(&key)?;
        self.graph.remove_node(ix).and_then(|v| v.data)
    }

    /// Remove every edge from `src` to `dst` (and back, if undirected).
    pub fn remove_edge(&mut self, src: VertexKey, dst: VertexKey) {
        let (Some(&s), Some(&d)) = (self.index.get(&src), self.index.get(&dst)) else {
            return;
        };
        let mut doomed = self.edge_ids_between(s, d, |_| true);
        if !self.directed {
            doomed.extend(self.edge_ids_between(d, s, |_| true));
        }
        for id in doomed {
            self.graph.remove_edge(id);
        }
    }

    /// Remove every edge from `src` to `dst` whose payload equals `data`.
    pub fn remove_labeled_edge(&mut self, src: VertexKey, dst: VertexKey, data: &E)
    where
        E: PartialEq,
    {
        let (Some(&s), Some(&d)) = (self.index.get(&src), self.index.get(&dst)) else {
            return;
        };
        let matches = |e: &Edge<E>| e.data.as_ref() == Some(data);
        let mut doomed = self.edge_ids_between(s, d, matches);
        if !self.directed {
            doomed.extend(self.edge_ids_between(d, s, matches));
        }
        for id in doomed {
            self.graph.remove_edge(id);
        }
    }

    /// Outgoing edges of a vertex as `(target, edge)` pairs.
    pub fn out_edges(&self, key: VertexKey) -> Vec<(VertexKey, &Edge<E>)> {
        self.edges_in_direction(key, Direction::Outgoing)
    }

    /// Incoming edges of a vertex as `(source, edge)` pairs.
    pub fn in_edges(&self, key: VertexKey) -> Vec<(VertexKey, &Edge<E>)> {
        self.edges_in_direction(key, Direction::Incoming)
    }

    /// Number of outgoing edges.
    pub fn out_degree(&self, key: VertexKey) -> usize {
        self.degree(key, Direction::Outgoing)
    }

    /// Number of incoming edges.
    pub fn in_degree(&self, key: VertexKey) -> usize {
        self.degree(key, Direction::Incoming)
    }

    /// All stored edges as `(source, target, edge)`.
    pub fn edges(&self) -> impl Iterator<Item = (VertexKey, VertexKey, &Edge<E>)> + '_ {
        self.graph.edge_indices().filter_map(|id| {
            let (a, b) = self.graph.edge_endpoints(id)?;
            Some((self.graph[a].key, self.graph[b].key, &self.graph[id]))
        })
    }

    /// Apply `f` to every vertex payload.
    pub fn for_each_data_mut(&mut self, mut f: impl FnMut(&mut V)) {
        let ixs: Vec<NodeIndex> = self.index.values().copied().collect();
        for ix in ixs {
            if let Some(data) = self.graph[ix].data.as_mut() {
                f(data);
            }
        }
    }

    /// Apply `f` to every edge payload.
    pub fn for_each_edge_data_mut(&mut self, mut f: impl FnMut(&mut E)) {
        let ids: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        for id in ids {
            if let Some(data) = self.graph[id].data.as_mut() {
                f(data);
            }
        }
    }

    /// Direct successors.
    pub fn successors(&self, key: VertexKey) -> Vec<VertexKey> {
        self.neighbor_keys(key, Direction::Outgoing)
    }

    /// Direct predecessors.
    pub fn predecessors(&self, key: VertexKey) -> Vec<VertexKey> {
        self.neighbor_keys(key, Direction::Incoming)
    }

    /// Every vertex with a path to `key`.
    pub fn ancestors(&self, key: VertexKey) -> Vec<VertexKey> {
        self.reachable(key, Direction::Incoming).into_iter().collect()
    }

    /// Every vertex reachable from `key`.
    pub fn descendants(&self, key: VertexKey) -> Vec<VertexKey> {
        self.reachable(key, Direction::Outgoing).into_iter().collect()
    }

    /// Every vertex other than `key` that is not an ancestor of `key`.
    pub fn non_ancestors(&self, key: VertexKey) -> Vec<VertexKey> {
        self.complement(key, &self.reachable(key, Direction::Incoming))
    }

    /// Every vertex other than `key` that is not a descendant of `key`.
    pub fn non_descendants(&self, key: VertexKey) -> Vec<VertexKey> {
        self.complement(key, &self.reachable(key, Direction::Outgoing))
    }

    /// Topological order of all vertices.
    ///
    /// Among vertices that are ready at the same time the smallest key goes
    /// first. With `reverse` the order is reversed exactly.
    pub fn topological_sort(&self, reverse: bool) -> IrResult<Vec<VertexKey>> {
        if !self.directed {
            return Err(IrError::UndirectedGraph);
        }

        let mut remaining: BTreeMap<VertexKey, usize> = BTreeMap::new();
        let mut ready = BinaryHeap::new();
        for (&key, &ix) in &self.index {
            let degree = self.graph.edges_directed(ix, Direction::Incoming).count();
            if degree == 0 {
                ready.push(Reverse(key));
            } else {
                remaining.insert(key, degree);
            }
        }

        let mut order = Vec::with_capacity(self.index.len());
        while let Some(Reverse(key)) = ready.pop() {
            order.push(key);
            let ix = self.index[&key];
            for edge in self.graph.edges_directed(ix, Direction::Outgoing) {
                let target = self.graph[edge.target()].key;
                if let Some(degree) = remaining.get_mut(&target) {
                    *degree -= 1;
                    if *degree == 0 {
                        remaining.remove(&target);
                        ready.push(Reverse(target));
                    }
                }
            }
        }

        if order.len() != self.index.len() {
            return Err(IrError::Cyclic);
        }
        if reverse {
            order.reverse();
        }
        Ok(order)
    }

    /// Check that the graph is directed and has no cycle.
    pub fn is_directed_acyclic_graph(&self) -> bool {
        self.directed && !petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Number of edges on the longest path.
    pub fn dag_longest_path_length(&self) -> IrResult<usize> {
        let order = self.topological_sort(false)?;
        let mut length: BTreeMap<VertexKey, usize> = BTreeMap::new();
        let mut longest = 0;
        for key in order {
            let here = length.get(&key).copied().unwrap_or(0);
            longest = longest.max(here);
            for (target, _) in self.out_edges(key) {
                let entry = length.entry(target).or_insert(0);
                *entry = (*entry).max(here + 1);
            }
        }
        Ok(longest)
    }

    /// Number of weakly connected components.
    pub fn number_weakly_connected_components(&self) -> usize {
        let mut seen: BTreeSet<NodeIndex> = BTreeSet::new();
        let mut components = 0;
        for &start in self.index.values() {
            if !seen.insert(start) {
                continue;
            }
            components += 1;
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                for next in self.graph.neighbors_undirected(current) {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        components
    }

    /// All-pairs hop counts over the undirected projection.
    ///
    /// Unreachable pairs are absent from the inner maps.
    pub fn undirected_distances(&self) -> BTreeMap<VertexKey, BTreeMap<VertexKey, usize>> {
        let mut table = BTreeMap::new();
        for (&source, &start) in &self.index {
            let mut row = BTreeMap::from([(source, 0)]);
            let mut queue = VecDeque::from([(start, 0)]);
            while let Some((current, hops)) = queue.pop_front() {
                for next in self.graph.neighbors_undirected(current) {
                    let key = self.graph[next].key;
                    if let std::collections::btree_map::Entry::Vacant(slot) = row.entry(key) {
                        slot.insert(hops + 1);
                        queue.push_back((next, hops + 1));
                    }
                }
            }
            table.insert(source, row);
        }
        table
    }

    fn ensure_vertex(&mut self, key: VertexKey) -> NodeIndex {
        if let Some(&ix) = self.index.get(&key) {
            return ix;
        }
        let ix = self.graph.add_node(Vertex { key, data: None });
        self.index.insert(key, ix);
        self.next_key = self.next_key.max(key + 1);
        ix
    }

    fn edge_ids_between(
        &self,
        s: NodeIndex,
        d: NodeIndex,
        keep: impl Fn(&Edge<E>) -> bool,
    ) -> Vec<EdgeIndex> {
        self.graph
            .edges_directed(s, Direction::Outgoing)
            .filter(|e| e.target() == d && keep(e.weight()))
            .map(|e| e.id())
            .collect()
    }

    fn edges_in_direction(&self, key: VertexKey, dir: Direction) -> Vec<(VertexKey, &Edge<E>)> {
        let Some(&ix) = self.index.get(&key) else {
            return vec![];
        };
        self.graph
            .edges_directed(ix, dir)
            .map(|e| {
                let other = match dir {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (self.graph[other].key, e.weight())
            })
            .collect()
    }

    fn degree(&self, key: VertexKey, dir: Direction) -> usize {
        self.index
            .get(&key)
            .map_or(0, |&ix| self.graph.edges_directed(ix, dir).count())
    }

    fn neighbor_keys(&self, key: VertexKey, dir: Direction) -> Vec<VertexKey> {
        let Some(&ix) = self.index.get(&key) else {
            return vec![];
        };
        self.graph
            .neighbors_directed(ix, dir)
            .map(|n| self.graph[n].key)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn reachable(&self, key: VertexKey, dir: Direction) -> BTreeSet<VertexKey> {
        let mut found = BTreeSet::new();
        let Some(&start) = self.index.get(&key) else {
            return found;
        };
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for next in self.graph.neighbors_directed(current, dir) {
                if found.insert(self.graph[next].key) {
                    queue.push_back(next);
                }
            }
        }
        found
    }

    fn complement(&self, key: VertexKey, excluded: &BTreeSet<VertexKey>) -> Vec<VertexKey> {
        if !self.index.contains_key(&key) {
            return vec![];
        }
        self.index
            .keys()
            .copied()
            .filter(|k| *k != key && !excluded.contains(k))
            .collect()
    }
}

impl<V, E: Clone + PartialEq> LabeledGraph<V, E> {
    /// Insert or update the edge `src -> dst` carrying `data`.
    ///
    /// Missing endpoints are created. An existing edge with the same
    /// endpoints and payload only has its weight updated. Undirected graphs
    /// also store the mirrored edge.
    pub fn add_edge(&mut self, src: VertexKey, dst: VertexKey, data: Option<E>, weight: i64) {
        let s = self.ensure_vertex(src);
        let d = self.ensure_vertex(dst);
        if !self.directed && s != d {
            self.upsert(d, s, data.clone(), weight);
        }
        self.upsert(s, d, data, weight);
    }

    fn upsert(&mut self, s: NodeIndex, d: NodeIndex, data: Option<E>, weight: i64) {
        let existing = self
            .graph
            .edges_directed(s, Direction::Outgoing)
            .find(|e| e.target() == d && e.weight().data == data)
            .map(|e| e.id());
        match existing {
            Some(id) => self.graph[id].weight = weight,
            None => {
                self.graph.add_edge(s, d, Edge { data, weight });
            }
        }
    }
}
