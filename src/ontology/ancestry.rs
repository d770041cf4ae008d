use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use moka::sync::Cache;
use tracing::debug;

use super::accessor::{classify_classes, classify_instances, INSTANCE_OF, SUBCLASS_OF};
use super::entities::{Direction, Graph};
use super::value_objects::Identifier;

/// Shared, immutable set of classes.
pub type ClassSet = Arc<BTreeSet<Identifier>>;

/// Lazily populated per-vertex ancestry over a frozen [`Graph`].
///
/// Every entry is computed on first request and then kept for the lifetime
/// of the cache. Concurrent first requests for the same vertex are coalesced:
/// a single caller computes the set while the others wait for it, and no
/// caller ever sees a partially built set.
pub struct AncestryCache {
    graph: Arc<Graph>,
    direct: Cache<Identifier, ClassSet>,
    ancestors: Cache<Identifier, ClassSet>,
}

impl AncestryCache {
    #[must_use]
    pub fn new(graph: Arc<Graph>) -> Self {
        Self {
            graph,
            direct: Cache::builder().name("direct_classes").build(),
            ancestors: Cache::builder().name("ancestors").build(),
        }
    }

    /// Returns the graph the cache reads from.
    #[must_use]
    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Classes `vertex` is directly declared an instance of. Empty when
    /// there are none.
    pub fn direct_classes(&self, vertex: &Identifier) -> ClassSet {
        self.direct.get_with_by_ref(vertex, || {
            Arc::new(
                self.graph
                    .incident_edges(vertex.as_str(), Direction::Out)
                    .filter(|edge| edge.predicate().as_str() == INSTANCE_OF)
                    .map(|edge| edge.target().clone())
                    .collect(),
            )
        })
    }

    /// Classes reachable from `vertex` through subclass-of edges, `vertex`
    /// included. For an instance (a vertex with direct classes that takes no
    /// part in a subclass edge) this is the union of the ancestries of its
    /// direct classes.
    pub fn ancestors(&self, vertex: &Identifier) -> ClassSet {
        self.ancestors.get_with_by_ref(vertex, || {
            let direct = self.direct_classes(vertex);
            let seeds: Vec<Identifier> = if direct.is_empty() || self.is_taxonomy_member(vertex) {
                vec![vertex.clone()]
            } else {
                direct.iter().cloned().collect()
            };
            Arc::new(self.subclass_closure(seeds))
        })
    }

    /// Union of the ancestries of every element of `classes`.
    #[must_use]
    pub fn ancestors_of_set(&self, classes: &BTreeSet<Identifier>) -> BTreeSet<Identifier> {
        classes
            .iter()
            .flat_map(|class| self.ancestors(class).iter().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// For every class, the number of instances whose ancestry contains it.
    #[must_use]
    pub fn inferred_instance_counts(&self) -> BTreeMap<Identifier, u64> {
        let mut counts: BTreeMap<Identifier, u64> = classify_classes(&self.graph)
            .into_iter()
            .map(|class| (class, 0))
            .collect();
        let instances = classify_instances(&self.graph);
        for instance in &instances {
            for class in self.ancestors(instance).iter() {
                *counts.entry(class.clone()).or_insert(0) += 1;
            }
        }
        debug!(
            classes = counts.len(),
            instances = instances.len(),
            "inferred_instance_counts"
        );
        counts
    }

    /// For every class, the number of classes whose ancestry contains it
    /// (the class itself included).
    #[must_use]
    pub fn descendant_counts(&self) -> BTreeMap<Identifier, u64> {
        let classes = classify_classes(&self.graph);
        let mut counts: BTreeMap<Identifier, u64> =
            classes.iter().map(|class| (class.clone(), 0)).collect();
        for class in &classes {
            for ancestor in self.subclass_closure(vec![class.clone()]) {
                *counts.entry(ancestor).or_insert(0) += 1;
            }
        }
        counts
    }

    fn is_taxonomy_member(&self, vertex: &Identifier) -> bool {
        self.graph
            .incident_edges(vertex.as_str(), Direction::Both)
            .any(|edge| edge.predicate().as_str() == SUBCLASS_OF)
    }

    fn subclass_closure(&self, seeds: Vec<Identifier>) -> BTreeSet<Identifier> {
        let mut visited = BTreeSet::new();
        let mut to_visit: VecDeque<Identifier> = seeds.into();
        while let Some(current) = to_visit.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            to_visit.extend(
                self.graph
                    .incident_edges(current.as_str(), Direction::Out)
                    .filter(|edge| edge.predicate().as_str() == SUBCLASS_OF)
                    .map(|edge| edge.target().clone()),
            );
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::thread;

    use super::AncestryCache;
    use crate::ontology::accessor::{INSTANCE_OF, SUBCLASS_OF};
    use crate::ontology::entities::Graph;
    use crate::ontology::value_objects::Identifier;

    fn id(text: &str) -> Identifier {
        Identifier::new(format!("http://example.org/{text}")).expect("valid identifier")
    }

    fn zoo() -> Arc<Graph> {
        let sub = Identifier::new(SUBCLASS_OF).expect("subclass");
        let isa = Identifier::new(INSTANCE_OF).expect("type");
        let mut graph = Graph::new(id("zoo"));
        graph.add_statement(id("Dog"), sub.clone(), id("Mammal"));
        graph.add_statement(id("Cat"), sub.clone(), id("Mammal"));
        graph.add_statement(id("Mammal"), sub, id("Animal"));
        graph.add_statement(id("Fido"), isa.clone(), id("Dog"));
        graph.add_statement(id("Tom"), isa, id("Cat"));
        Arc::new(graph)
    }

    #[test]
    fn ancestry_is_reflexive_for_classes_and_derived_for_instances() {
        let cache = AncestryCache::new(zoo());
        assert_eq!(
            *cache.ancestors(&id("Dog")),
            BTreeSet::from([id("Dog"), id("Mammal"), id("Animal")])
        );
        assert_eq!(
            *cache.ancestors(&id("Fido")),
            BTreeSet::from([id("Dog"), id("Mammal"), id("Animal")])
        );
        assert_eq!(*cache.direct_classes(&id("Fido")), BTreeSet::from([id("Dog")]));
        assert!(cache.direct_classes(&id("Dog")).is_empty());
    }

    #[test]
    fn counts_propagate_to_ancestors() {
        let cache = AncestryCache::new(zoo());
        let instances = cache.inferred_instance_counts();
        assert_eq!(instances[&id("Animal")], 2);
        assert_eq!(instances[&id("Mammal")], 2);
        assert_eq!(instances[&id("Dog")], 1);

        let descendants = cache.descendant_counts();
        assert_eq!(descendants[&id("Animal")], 4);
        assert_eq!(descendants[&id("Dog")], 1);
    }

    #[test]
    fn concurrent_reads_share_one_entry() {
        let cache = Arc::new(AncestryCache::new(zoo()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.ancestors(&id("Tom")))
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .collect();
        let first = &results[0];
        assert!(results.iter().all(|set| Arc::ptr_eq(first, set)));
        assert!(Arc::ptr_eq(first, &cache.ancestors(&id("Tom"))));
    }
}
