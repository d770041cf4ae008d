mod common;

use std::collections::BTreeSet;

use common::{iri, processor, processor_with, queries};
use rstest::rstest;
use taxosim::batch::{BatchMode, BatchSettings, DisplayMode, QueryPolicy};
use taxosim::measures::{GroupwiseMeasure, MeasureConfig, MeasureRegistry, MeasureSettings, Scope};
use taxosim::ontology::Identifier;
use taxosim::Error;

fn settings(not_found: QueryPolicy, no_annotation: QueryPolicy) -> BatchSettings {
    BatchSettings {
        not_found,
        no_annotation,
        quiet: true,
        ..BatchSettings::default()
    }
}

fn zoo_queries() -> Vec<taxosim::batch::QueryEntry> {
    queries(&[
        ("ex:Fido", "ex:Rex"),
        ("ex:Fido", "ex:Tom"),
        ("ex:Fido", "ex:Nemo"),
        ("ex:Fido", "ex:Orphan"),
        ("ex:Ghost", "ex:Tom"),
    ])
}

#[tokio::test]
async fn missing_entity_is_substituted() {
    let processor = processor(settings(QueryPolicy::Set { score: -1.0 }, QueryPolicy::Stop));
    let result = processor
        .run(queries(&[("ex:Fido", "ex:Ghost")]))
        .await
        .expect("batch");
    assert_eq!(result.output, "ex:Fido\tex:Ghost\t-1\t-1\n");
    assert_eq!(result.substituted, 1);
    assert_eq!(result.skipped, 0);
    assert_eq!(result.rows, 1);
}

#[tokio::test]
async fn missing_entity_stops_the_batch() {
    let processor = processor(BatchSettings {
        chunk_size: 2,
        ..settings(QueryPolicy::Stop, QueryPolicy::Stop)
    });
    let err = processor
        .run(queries(&[("ex:Fido", "ex:Rex"), ("ex:Fido", "ex:Ghost")]))
        .await
        .expect_err("stop policy");

    let Error::Task {
        task, row, failed, total, ..
    } = &err
    else {
        panic!("expected a task error, got {err:?}");
    };
    assert_eq!((*task, *row, *failed, *total), (0, 1, 1, 1));
    assert!(matches!(err.root(), Error::NotFound { entity, graph } if *entity == iri("Ghost") && *graph == iri("zoo")));
    assert!(err.to_string().contains("http://example.org/Ghost"));
}

#[rstest]
#[case::exclude(QueryPolicy::Exclude, "", 0, 1)]
#[case::set(QueryPolicy::Set { score: 0.0 }, "ex:Fido\tex:Orphan\t0\t0\n", 1, 0)]
#[tokio::test]
async fn unannotated_entity_follows_its_policy(
    #[case] policy: QueryPolicy,
    #[case] expected: &str,
    #[case] substituted: u64,
    #[case] skipped: u64,
) {
    let processor = processor(settings(QueryPolicy::Stop, policy));
    let result = processor
        .run(queries(&[("ex:Fido", "ex:Orphan")]))
        .await
        .expect("batch");
    assert_eq!(result.output, expected);
    assert_eq!((result.substituted, result.skipped), (substituted, skipped));
}

#[tokio::test]
async fn unannotated_entity_can_stop_the_batch() {
    let processor = processor(settings(QueryPolicy::Stop, QueryPolicy::Stop));
    let err = processor
        .run(queries(&[("ex:Orphan", "ex:Fido")]))
        .await
        .expect_err("stop policy");
    assert!(matches!(
        err.root(),
        Error::NoAnnotation { first_classes: 0, second_classes: 1, .. }
    ));
}

#[tokio::test]
async fn malformed_identifier_fails_the_task() {
    let processor = processor(settings(QueryPolicy::Exclude, QueryPolicy::Exclude));
    let err = processor
        .run(queries(&[("not an iri", "ex:Fido")]))
        .await
        .expect_err("parse error");
    assert!(matches!(err.root(), Error::Parse { .. }));
}

/// Diverges as soon as a cat is involved.
struct CatAllergy;

impl GroupwiseMeasure for CatAllergy {
    fn requires_ic(&self) -> bool {
        false
    }

    fn compute(&self, _: &Scope<'_>, a: &BTreeSet<Identifier>, b: &BTreeSet<Identifier>) -> f64 {
        if a.contains(&iri("Cat")) || b.contains(&iri("Cat")) {
            f64::INFINITY
        } else {
            1.0
        }
    }
}

#[tokio::test]
async fn infinite_score_is_an_arithmetic_fault() {
    let measures = MeasureSettings {
        pairwise: vec![],
        groupwise: vec![MeasureConfig::new("allergy", "cat_allergy")],
    };
    let table = MeasureRegistry::default().with_groupwise("cat_allergy", CatAllergy);
    let processor = processor_with(
        BatchSettings {
            workers: 2,
            chunk_size: 1,
            ..settings(QueryPolicy::Stop, QueryPolicy::Stop)
        },
        &measures,
        &table,
    );

    let err = processor
        .run(queries(&[
            ("ex:Fido", "ex:Rex"),
            ("ex:Fido", "ex:Tom"),
            ("ex:Rex", "ex:Rex"),
        ]))
        .await
        .expect_err("arithmetic fault");

    assert!(matches!(err, Error::Task { task: 1, row: 0, failed: 1, total: 3, .. }));
    let Error::Arithmetic {
        measure,
        first,
        second,
        value,
        ..
    } = err.root()
    else {
        panic!("expected an arithmetic fault, got {err:?}");
    };
    assert_eq!(measure, "allergy");
    assert_eq!((first, second), (&iri("Fido"), &iri("Tom")));
    assert!(value.is_infinite());
}

#[rstest]
#[case(1, 1)]
#[case(2, 1)]
#[case(4, 2)]
#[case(8, 3)]
#[tokio::test]
async fn output_does_not_depend_on_the_pool(#[case] workers: usize, #[case] chunk_size: usize) {
    let policies = settings(QueryPolicy::Set { score: -1.0 }, QueryPolicy::Set { score: 0.0 });
    let reference = processor(policies.clone())
        .run(zoo_queries())
        .await
        .expect("reference batch");
    let result = processor(BatchSettings {
        workers,
        chunk_size,
        ..policies
    })
    .run(zoo_queries())
    .await
    .expect("batch");
    assert_eq!(result, reference);
    assert_eq!((result.rows, result.substituted, result.skipped), (5, 2, 0));
}

#[tokio::test]
async fn zoo_table() {
    let processor = processor(BatchSettings {
        workers: 3,
        chunk_size: 2,
        ..settings(QueryPolicy::Set { score: -1.0 }, QueryPolicy::Set { score: 0.0 })
    });
    assert_eq!(processor.header(), "first\tsecond\tmax_jaccard\tui\n");
    let result = processor.run(zoo_queries()).await.expect("batch");
    let table = result.output.trim_end().replace('\t', " | ");
    insta::assert_snapshot!(table, @r"
    ex:Fido | ex:Rex | 1 | 1
    ex:Fido | ex:Tom | 0.5 | 0.5
    ex:Fido | ex:Nemo | 0.25 | 0.25
    ex:Fido | ex:Orphan | 0 | 0
    ex:Ghost | ex:Tom | -1 | -1
    ");
}

#[rstest]
#[case::raw(DisplayMode::Raw, "ex:Dog\thttp://example.org/Cat")]
#[case::short(DisplayMode::Short, "ex:Dog\tex:Cat")]
#[case::local_name(DisplayMode::LocalName, "Dog\tCat")]
#[tokio::test]
async fn concepts_are_compared_with_pairwise_measures(
    #[case] display: DisplayMode,
    #[case] label: &str,
) {
    let processor = processor(BatchSettings {
        mode: BatchMode::ConceptToConcept,
        display,
        ..settings(QueryPolicy::Stop, QueryPolicy::Stop)
    });
    assert_eq!(processor.header(), "first\tsecond\tjaccard\n");
    let result = processor
        .run(queries(&[("ex:Dog", "http://example.org/Cat")]))
        .await
        .expect("batch");
    assert_eq!(result.output, format!("{label}\t0.5\n"));
}

#[tokio::test]
async fn unscored_identical_concepts_are_an_arithmetic_fault() {
    let measures = MeasureSettings {
        pairwise: vec![MeasureConfig::new("lin", "lin_1998")],
        groupwise: vec![],
    };
    let processor = processor_with(
        BatchSettings {
            mode: BatchMode::ConceptToConcept,
            ..settings(QueryPolicy::Stop, QueryPolicy::Stop)
        },
        &measures,
        &MeasureRegistry::default(),
    );

    // instances carry no corpus IC of their own
    let err = processor
        .run(queries(&[("ex:Fido", "ex:Fido")]))
        .await
        .expect_err("unscored instance");
    assert!(matches!(
        err.root(),
        Error::Arithmetic { measure, first, second, value, .. }
            if measure == "lin" && *first == iri("Fido") && *second == iri("Fido") && value.is_nan()
    ));

    let result = processor
        .run(queries(&[("ex:Dog", "ex:Dog")]))
        .await
        .expect("scored class");
    assert_eq!(result.output, "ex:Dog\tex:Dog\t1\n");
}
