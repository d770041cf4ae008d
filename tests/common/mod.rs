#![allow(dead_code)]

use std::sync::Arc;

use taxosim::batch::{BatchQueryProcessor, BatchSettings, QueryEntry};
use taxosim::measures::{MeasureConfig, MeasurePlan, MeasureRegistry, MeasureSettings, SimilarityEngine};
use taxosim::ontology::{AncestryCache, Graph, Identifier, IdentifierRegistry, INSTANCE_OF, SUBCLASS_OF};

pub const EX: &str = "http://example.org/";

pub fn iri(local: &str) -> Identifier {
    Identifier::new(format!("{EX}{local}")).expect("valid identifier")
}

pub fn registry() -> Arc<IdentifierRegistry> {
    Arc::new(IdentifierRegistry::new().with_prefixes([("ex", EX)]))
}

/// Dog, Cat < Mammal < Animal and Trout < Animal, with Fido and Rex (Dog),
/// Tom (Cat), Nemo (Trout) and an unclassified Orphan.
pub fn zoo() -> Graph {
    let sub = Identifier::new(SUBCLASS_OF).expect("subclass");
    let isa = Identifier::new(INSTANCE_OF).expect("type");
    let mut graph = Graph::new(iri("zoo"));
    graph.add_statement(iri("Dog"), sub.clone(), iri("Mammal"));
    graph.add_statement(iri("Cat"), sub.clone(), iri("Mammal"));
    graph.add_statement(iri("Mammal"), sub.clone(), iri("Animal"));
    graph.add_statement(iri("Trout"), sub, iri("Animal"));
    graph.add_statement(iri("Fido"), isa.clone(), iri("Dog"));
    graph.add_statement(iri("Rex"), isa.clone(), iri("Dog"));
    graph.add_statement(iri("Tom"), isa.clone(), iri("Cat"));
    graph.add_statement(iri("Nemo"), isa, iri("Trout"));
    graph.add_statement(iri("Orphan"), iri("knows"), iri("Fido"));
    graph
}

/// `max` over the ancestor Jaccard index and simUI, both exact in binary on
/// the zoo.
pub fn jaccard_measures() -> MeasureSettings {
    MeasureSettings {
        pairwise: vec![MeasureConfig::new("jaccard", "jaccard_ancestors")],
        groupwise: vec![
            MeasureConfig::new("max_jaccard", "max").over_pairwise("jaccard"),
            MeasureConfig::new("ui", "sim_ui"),
        ],
    }
}

pub fn engine(measures: &MeasureSettings, table: &MeasureRegistry) -> Arc<SimilarityEngine> {
    let ancestry = Arc::new(AncestryCache::new(Arc::new(zoo())));
    let plan = MeasurePlan::resolve(measures, &[], table).expect("measure plan");
    Arc::new(SimilarityEngine::new(ancestry, plan))
}

pub fn processor(settings: BatchSettings) -> BatchQueryProcessor {
    processor_with(settings, &jaccard_measures(), &MeasureRegistry::default())
}

pub fn processor_with(
    settings: BatchSettings,
    measures: &MeasureSettings,
    table: &MeasureRegistry,
) -> BatchQueryProcessor {
    BatchQueryProcessor::new(engine(measures, table), registry(), settings).expect("processor")
}

pub fn queries(pairs: &[(&str, &str)]) -> Vec<QueryEntry> {
    pairs
        .iter()
        .map(|(first, second)| QueryEntry::new(*first, *second))
        .collect()
}
