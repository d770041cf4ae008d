//! Stateless classification and filtering queries over a [`Graph`].

use std::collections::BTreeSet;

use tracing::debug;

use super::entities::{Direction, Graph};
use super::value_objects::Identifier;

/// Built-in meta-classes whose members are not considered instances.
///
/// This list does not cover every RDF built-in: a vertex typed only by e.g.
/// `rdfs:Container` is still reported as an instance. Downstream measures
/// rely on this exact rule, so it is kept as is.
pub const RESERVED_META_CLASSES: [&str; 6] = [
    "http://www.w3.org/2000/01/rdf-schema#Resource",
    "http://www.w3.org/2000/01/rdf-schema#Class",
    "http://www.w3.org/2000/01/rdf-schema#Literal",
    "http://www.w3.org/2000/01/rdf-schema#Datatype",
    "http://www.w3.org/1999/02/22-rdf-syntax-ns#Property",
    "http://www.w3.org/1999/02/22-rdf-syntax-ns#XMLLiteral",
];

/// Predicate linking a class to its super class.
pub const SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";

/// Predicate linking an instance to the class it belongs to.
pub const INSTANCE_OF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Returns every vertex that is the source or target of a subclass edge, or
/// the target of an instance-of edge.
#[must_use]
pub fn classify_classes(graph: &Graph) -> BTreeSet<Identifier> {
    debug!("retrieving_classes");
    let mut classes = BTreeSet::new();
    for edge in graph.edges_of_type(SUBCLASS_OF) {
        classes.insert(edge.source().clone());
        classes.insert(edge.target().clone());
    }
    for edge in graph.edges_of_type(INSTANCE_OF) {
        classes.insert(edge.target().clone());
    }
    debug!(count = classes.len(), "classes_detected");
    classes
}

/// Returns every vertex declared an instance of something other than one of
/// the [`RESERVED_META_CLASSES`].
#[must_use]
pub fn classify_instances(graph: &Graph) -> BTreeSet<Identifier> {
    graph
        .edges_of_type(INSTANCE_OF)
        .filter(|edge| !RESERVED_META_CLASSES.contains(&edge.target().as_str()))
        .map(|edge| edge.source().clone())
        .collect()
}

/// Returns every vertex none of whose incident edges in `direction` is typed
/// by a predicate of `predicates`.
///
/// An empty predicate set matches every edge, so the query degenerates to
/// "no incident edge at all". With [`Direction::Both`] a vertex has to pass
/// the check on its outgoing and on its incoming edges.
#[must_use]
pub fn vertices_without_edge_type(
    graph: &Graph,
    predicates: &BTreeSet<Identifier>,
    direction: Direction,
) -> BTreeSet<Identifier> {
    let matches = |predicate: &Identifier| predicates.is_empty() || predicates.contains(predicate);
    let passes = |vertex: &Identifier, side: Direction| {
        !graph
            .incident_edges(vertex.as_str(), side)
            .any(|edge| matches(edge.predicate()))
    };

    graph
        .vertices()
        .filter(|vertex| !direction.includes_out() || passes(vertex, Direction::Out))
        .filter(|vertex| !direction.includes_in() || passes(vertex, Direction::In))
        .cloned()
        .collect()
}

/// Single predicate flavour of [`vertices_without_edge_type`].
#[must_use]
pub fn vertices_without_edge(
    graph: &Graph,
    predicate: &Identifier,
    direction: Direction,
) -> BTreeSet<Identifier> {
    vertices_without_edge_type(graph, &BTreeSet::from([predicate.clone()]), direction)
}
