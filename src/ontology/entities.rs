use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::value_objects::Identifier;

/// Immutable statement `source --predicate--> target`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    source: Identifier,
    predicate: Identifier,
    target: Identifier,
}

impl Edge {
    /// Creates the statement `source --predicate--> target`.
    #[must_use]
    pub fn new(source: Identifier, predicate: Identifier, target: Identifier) -> Self {
        Self {
            source,
            predicate,
            target,
        }
    }

    /// Returns the vertex the edge leaves from.
    #[must_use]
    pub fn source(&self) -> &Identifier {
        &self.source
    }

    /// Returns the predicate typing the edge.
    #[must_use]
    pub fn predicate(&self) -> &Identifier {
        &self.predicate
    }

    /// Returns the vertex the edge points to.
    #[must_use]
    pub fn target(&self) -> &Identifier {
        &self.target
    }
}

/// Selects which incident edges of a vertex a query considers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Edges whose source is the vertex.
    Out,
    /// Edges whose target is the vertex.
    In,
    /// Both of the above.
    Both,
}

impl Direction {
    /// Whether outgoing edges are considered.
    #[must_use]
    pub fn includes_out(self) -> bool {
        matches!(self, Self::Out | Self::Both)
    }

    /// Whether incoming edges are considered.
    #[must_use]
    pub fn includes_in(self) -> bool {
        matches!(self, Self::In | Self::Both)
    }
}

/// Directed multigraph of identifiers and typed edges.
///
/// A graph is mutable only while a loader populates it. Once loading is
/// done it is frozen behind an `Arc<Graph>` and every read path is lock free.
/// Identical triples collapse into one edge.
#[derive(Clone, Debug)]
pub struct Graph {
    name: Identifier,
    vertices: HashSet<Identifier>,
    edges: Vec<Edge>,
    statements: HashSet<Edge>,
    by_predicate: HashMap<Identifier, Vec<usize>>,
    outgoing: HashMap<Identifier, Vec<usize>>,
    incoming: HashMap<Identifier, Vec<usize>>,
}

impl Graph {
    /// Creates an empty graph named by `name`.
    #[must_use]
    pub fn new(name: Identifier) -> Self {
        Self {
            name,
            vertices: HashSet::new(),
            edges: Vec::new(),
            statements: HashSet::new(),
            by_predicate: HashMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
        }
    }

    /// Returns the identifier naming the graph.
    #[must_use]
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Adds an isolated vertex. Returns `false` when it was already present.
    pub fn add_vertex(&mut self, vertex: Identifier) -> bool {
        self.vertices.insert(vertex)
    }

    /// Adds an edge, registering its endpoints as vertices.
    ///
    /// Returns `false` when the same triple was already present.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if self.statements.contains(&edge) {
            return false;
        }
        let index = self.edges.len();
        self.vertices.insert(edge.source.clone());
        self.vertices.insert(edge.target.clone());
        self.by_predicate
            .entry(edge.predicate.clone())
            .or_default()
            .push(index);
        self.outgoing
            .entry(edge.source.clone())
            .or_default()
            .push(index);
        self.incoming
            .entry(edge.target.clone())
            .or_default()
            .push(index);
        self.statements.insert(edge.clone());
        self.edges.push(edge);
        true
    }

    /// Shorthand for [`Self::add_edge`].
    pub fn add_statement(
        &mut self,
        source: Identifier,
        predicate: Identifier,
        target: Identifier,
    ) -> bool {
        self.add_edge(Edge::new(source, predicate, target))
    }

    /// Whether `vertex` is the endpoint of an edge or was added on its own.
    #[must_use]
    pub fn contains_vertex(&self, vertex: &Identifier) -> bool {
        self.vertices.contains(vertex)
    }

    /// Returns every vertex, in no particular order.
    pub fn vertices(&self) -> impl Iterator<Item = &Identifier> {
        self.vertices.iter()
    }

    /// Returns every vertex in lexical order.
    #[must_use]
    pub fn sorted_vertices(&self) -> BTreeSet<Identifier> {
        self.vertices.iter().cloned().collect()
    }

    /// Returns every edge in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the edges typed by `predicate`, in insertion order.
    pub fn edges_of_type<'a>(&'a self, predicate: &str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.indexed(self.by_predicate.get(predicate))
    }

    /// Returns the edges incident to `vertex` in the requested direction.
    ///
    /// For [`Direction::Both`] outgoing edges come first.
    pub fn incident_edges<'a>(
        &'a self,
        vertex: &str,
        direction: Direction,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        let outgoing = direction
            .includes_out()
            .then(|| self.indexed(self.outgoing.get(vertex)));
        let incoming = direction
            .includes_in()
            .then(|| self.indexed(self.incoming.get(vertex)));
        outgoing
            .into_iter()
            .flatten()
            .chain(incoming.into_iter().flatten())
    }

    /// Returns the number of distinct vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn indexed<'a>(&'a self, indices: Option<&'a Vec<usize>>) -> impl Iterator<Item = &'a Edge> + 'a {
        indices
            .into_iter()
            .flatten()
            .map(move |index| &self.edges[*index])
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, Edge, Graph};
    use crate::ontology::value_objects::Identifier;

    fn id(text: &str) -> Identifier {
        Identifier::new(format!("http://example.org/{text}")).expect("valid identifier")
    }

    #[test]
    fn duplicate_statements_collapse() {
        let mut graph = Graph::new(id("g"));
        assert!(graph.add_statement(id("a"), id("p"), id("b")));
        assert!(!graph.add_statement(id("a"), id("p"), id("b")));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.vertex_count(), 2);
        assert!(!graph.contains_vertex(&id("p")));
    }

    #[test]
    fn incident_edges_follow_direction() {
        let mut graph = Graph::new(id("g"));
        graph.add_statement(id("a"), id("p"), id("b"));
        graph.add_statement(id("c"), id("q"), id("a"));

        let out: Vec<&Edge> = graph.incident_edges(id("a").as_str(), Direction::Out).collect();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target(), &id("b"));

        let inc: Vec<&Edge> = graph.incident_edges(id("a").as_str(), Direction::In).collect();
        assert_eq!(inc.len(), 1);
        assert_eq!(inc[0].source(), &id("c"));

        assert_eq!(
            graph.incident_edges(id("a").as_str(), Direction::Both).count(),
            2
        );
        assert_eq!(graph.edges_of_type(id("q").as_str()).count(), 1);
        assert_eq!(graph.edges_of_type(id("missing").as_str()).count(), 0);
    }
}
