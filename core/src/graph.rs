//! Resource Allocation Graph (RAG).
//!
//! A directed multigraph over two disjoint vertex kinds — Process and
//! Resource — with Request (P→R) and Allocation (R→P) edges. Built once per
//! detection pass as a plain value: vertex indices are a small arena, edges
//! are plain records, and nothing here holds a pointer back into a
//! snapshot. That's what lets the graph (and the cycles it yields) outlive
//! the snapshots they were built from.

use std::collections::HashSet;

use common::Error;

use crate::kernel_view::Pid;

pub type ResourceId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    Process,
    Resource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// P → R: the process waits for the resource.
    Request,
    /// R → P: the resource is held by the process.
    Allocation,
}

/// Three-color marker used by the cycle detector's DFS. Lives on the graph
/// because `reset_traversal_state` is specified as a RAG operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Unvisited,
    OnStack,
    Done,
}

#[derive(Debug, Clone)]
struct Vertex {
    kind: VertexKind,
    external_id: i64,
    instances: u32,
}

/// Directed multigraph over Process/Resource vertices. Represented as a
/// per-vertex adjacency list of `(neighbor_index, edge_kind)`, which keeps
/// traversal cheap while the edge-identity `HashSet` keeps insertion
/// dedup O(1) rather than scanning every adjacency list.
pub struct ResourceAllocationGraph {
    vertices: Vec<Vertex>,
    adjacency: Vec<Vec<(usize, EdgeKind)>>,
    edge_index: HashSet<(usize, usize, EdgeKind)>,
    capacity: usize,
    edge_count: usize,
    colors: Vec<Color>,
    parents: Vec<Option<usize>>,
}

impl ResourceAllocationGraph {
    pub fn new(capacity: usize) -> Self {
        Self {
            vertices: Vec::new(),
            adjacency: Vec::new(),
            edge_index: HashSet::new(),
            capacity,
            edge_count: 0,
            colors: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertex_kind(&self, idx: usize) -> VertexKind {
        self.vertices[idx].kind
    }

    pub fn vertex_external_id(&self, idx: usize) -> i64 {
        self.vertices[idx].external_id
    }

    pub fn vertex_instances(&self, idx: usize) -> u32 {
        self.vertices[idx].instances
    }

    pub fn neighbors(&self, idx: usize) -> &[(usize, EdgeKind)] {
        &self.adjacency[idx]
    }

    fn push_vertex(&mut self, kind: VertexKind, external_id: i64, instances: u32) -> Result<usize, Error> {
        if self.vertices.len() >= self.capacity {
            return Err(Error::GraphFull { capacity: self.capacity });
        }
        self.vertices.push(Vertex { kind, external_id, instances });
        self.adjacency.push(Vec::new());
        self.colors.push(Color::Unvisited);
        self.parents.push(None);
        Ok(self.vertices.len() - 1)
    }

    /// Insert or return the existing vertex for this PID.
    pub fn add_process(&mut self, pid: Pid) -> Result<usize, Error> {
        if let Some(idx) = self.find_by_pid(pid) {
            return Ok(idx);
        }
        self.push_vertex(VertexKind::Process, pid as i64, 0)
    }

    /// Insert or update the instance count of the resource vertex for
    /// `rid`. `instances` defaults to 1 for single-instance resources.
    /// Unlike `ensure_resource`, this always applies `instances` to an
    /// existing vertex too — for callers that are declaring the resource's
    /// instance count, not just touching an edge endpoint.
    pub fn add_resource(&mut self, rid: ResourceId, instances: u32) -> Result<usize, Error> {
        let instances = instances.max(1);
        if let Some(idx) = self.find_by_rid(rid) {
            self.vertices[idx].instances = instances;
            return Ok(idx);
        }
        self.push_vertex(VertexKind::Resource, rid as i64, instances)
    }

    /// Insert the resource vertex for `rid` with a default instance count
    /// of 1 if it doesn't exist yet; otherwise return the existing vertex
    /// untouched. Used by the edge helpers, which only need an endpoint to
    /// exist and must not clobber an instance count a caller already
    /// declared via `add_resource`.
    fn ensure_resource(&mut self, rid: ResourceId) -> Result<usize, Error> {
        if let Some(idx) = self.find_by_rid(rid) {
            return Ok(idx);
        }
        self.push_vertex(VertexKind::Resource, rid as i64, 1)
    }

    /// Process external_id lookup. Linear scan: acceptable because vertex
    /// count is bounded by the live process count.
    pub fn find_by_pid(&self, pid: Pid) -> Option<usize> {
        self.vertices
            .iter()
            .position(|v| v.kind == VertexKind::Process && v.external_id == pid as i64)
    }

    pub fn find_by_rid(&self, rid: ResourceId) -> Option<usize> {
        self.vertices
            .iter()
            .position(|v| v.kind == VertexKind::Resource && v.external_id == rid as i64)
    }

    fn add_edge(&mut self, from: usize, to: usize, kind: EdgeKind) -> Result<(), Error> {
        if self.edge_index.contains(&(from, to, kind)) {
            return Ok(());
        }
        self.adjacency[from].push((to, kind));
        self.edge_index.insert((from, to, kind));
        self.edge_count += 1;
        Ok(())
    }

    /// P → R. Creates the process/resource endpoints if absent, without
    /// disturbing an existing resource's instance count.
    pub fn add_request_edge(&mut self, pid: Pid, rid: ResourceId) -> Result<(), Error> {
        let from = self.add_process(pid)?;
        let to = self.ensure_resource(rid)?;
        self.add_edge(from, to, EdgeKind::Request)
    }

    /// R → P. Creates the resource/process endpoints if absent, without
    /// disturbing an existing resource's instance count.
    pub fn add_allocation_edge(&mut self, rid: ResourceId, pid: Pid) -> Result<(), Error> {
        let from = self.ensure_resource(rid)?;
        let to = self.add_process(pid)?;
        self.add_edge(from, to, EdgeKind::Allocation)
    }

    pub fn reset_traversal_state(&mut self) {
        self.colors.fill(Color::Unvisited);
        self.parents.fill(None);
    }

    pub fn color(&self, idx: usize) -> Color {
        self.colors[idx]
    }

    pub fn set_color(&mut self, idx: usize, color: Color) {
        self.colors[idx] = color;
    }

    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.parents[idx]
    }

    pub fn set_parent(&mut self, idx: usize, parent: Option<usize>) {
        self.parents[idx] = parent;
    }

    /// `(process_count, resource_count, edge_count)`.
    pub fn statistics(&self) -> (usize, usize, usize) {
        let processes = self.vertices.iter().filter(|v| v.kind == VertexKind::Process).count();
        let resources = self.vertices.iter().filter(|v| v.kind == VertexKind::Resource).count();
        (processes, resources, self.edge_count)
    }

    /// Wait-for-graph projection: vertices are processes only, with an
    /// edge P1 → P2 iff some resource R has both P1 → R and R → P2.
    /// Functionally equivalent to the RAG for single-instance resources;
    /// used by callers that prefer WFG-style cycle detection.
    pub fn wait_for_projection(&self) -> Vec<(Pid, Pid)> {
        let mut edges = Vec::new();
        for (r_idx, vertex) in self.vertices.iter().enumerate() {
            if vertex.kind != VertexKind::Resource {
                continue;
            }
            let requesters: Vec<usize> = self
                .vertices
                .iter()
                .enumerate()
                .filter(|(p_idx, _)| {
                    self.adjacency[*p_idx]
                        .iter()
                        .any(|&(to, kind)| to == r_idx && kind == EdgeKind::Request)
                })
                .map(|(p_idx, _)| p_idx)
                .collect();
            let holders: Vec<usize> = self.adjacency[r_idx]
                .iter()
                .filter(|&&(_, kind)| kind == EdgeKind::Allocation)
                .map(|&(to, _)| to)
                .collect();
            for &p1 in &requesters {
                for &p2 in &holders {
                    if p1 != p2 {
                        edges.push((self.vertices[p1].external_id as Pid, self.vertices[p2].external_id as Pid));
                    }
                }
            }
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_process_is_idempotent() {
        let mut g = ResourceAllocationGraph::new(16);
        let a = g.add_process(1001).unwrap();
        let b = g.add_process(1001).unwrap();
        assert_eq!(a, b);
        assert_eq!(g.vertex_count(), 1);
    }

    #[test]
    fn add_resource_updates_instance_count() {
        let mut g = ResourceAllocationGraph::new(16);
        let idx = g.add_resource(7, 1).unwrap();
        assert_eq!(g.vertex_instances(idx), 1);
        let idx2 = g.add_resource(7, 3).unwrap();
        assert_eq!(idx, idx2);
        assert_eq!(g.vertex_instances(idx), 3);
    }

    #[test]
    fn edge_helpers_do_not_clobber_a_pre_declared_instance_count() {
        let mut g = ResourceAllocationGraph::new(16);
        let idx = g.add_resource(2, 2).unwrap();
        g.add_allocation_edge(2, 1002).unwrap();
        g.add_request_edge(1001, 2).unwrap();
        assert_eq!(g.vertex_instances(idx), 2);
    }

    #[test]
    fn duplicate_edges_are_not_double_counted() {
        let mut g = ResourceAllocationGraph::new(16);
        g.add_request_edge(1001, 1).unwrap();
        g.add_request_edge(1001, 1).unwrap();
        let (_, _, edges) = g.statistics();
        assert_eq!(edges, 1);
    }

    #[test]
    fn request_and_allocation_edges_are_distinct_kinds() {
        let mut g = ResourceAllocationGraph::new(16);
        g.add_request_edge(1001, 1).unwrap();
        g.add_allocation_edge(1, 1001).unwrap();
        let (_, _, edges) = g.statistics();
        assert_eq!(edges, 2);
    }

    #[test]
    fn capacity_exhaustion_fails_cleanly() {
        let mut g = ResourceAllocationGraph::new(1);
        g.add_process(1001).unwrap();
        let err = g.add_process(1002).unwrap_err();
        assert!(matches!(err, Error::GraphFull { capacity: 1 }));
        assert_eq!(g.vertex_count(), 1);
    }

    #[test]
    fn statistics_report_correct_vertex_kinds() {
        let mut g = ResourceAllocationGraph::new(16);
        g.add_request_edge(1001, 1).unwrap();
        g.add_allocation_edge(2, 1002).unwrap();
        let (processes, resources, _) = g.statistics();
        assert_eq!(processes, 2);
        assert_eq!(resources, 2);
    }

    #[test]
    fn wait_for_projection_contracts_resources() {
        let mut g = ResourceAllocationGraph::new(16);
        g.add_request_edge(1001, 1).unwrap();
        g.add_allocation_edge(1, 1002).unwrap();
        let wfg = g.wait_for_projection();
        assert_eq!(wfg, vec![(1001, 1002)]);
    }

    #[test]
    fn reset_traversal_state_clears_colors_and_parents() {
        let mut g = ResourceAllocationGraph::new(16);
        let idx = g.add_process(1001).unwrap();
        g.set_color(idx, Color::OnStack);
        g.set_parent(idx, Some(0));
        g.reset_traversal_state();
        assert_eq!(g.color(idx), Color::Unvisited);
        assert_eq!(g.parent(idx), None);
    }
}
