//! Taxonomy graph primitives.
//!
//! The module holds the identifier value objects and their interning
//! registry, the immutable typed graph, the stateless classification queries
//! and the lazily filled ancestry cache. Format specific loaders only depend
//! on the [`GraphLoader`] contract.

pub mod accessor;
pub mod ancestry;
pub mod entities;
pub mod loader;
pub mod value_objects;

pub use accessor::{
    classify_classes, classify_instances, vertices_without_edge, vertices_without_edge_type,
    INSTANCE_OF, RESERVED_META_CLASSES, SUBCLASS_OF,
};
pub use ancestry::{AncestryCache, ClassSet};
pub use entities::{Direction, Edge, Graph};
pub use loader::{load_graph, GraphLoader, GraphSource, LoadReport, TabularLoader, TabularSource};
pub use value_objects::{Identifier, IdentifierError, IdentifierRegistry};
