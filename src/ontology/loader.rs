use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::entities::Graph;
use super::value_objects::{Identifier, IdentifierRegistry};
use crate::{Error, Result};

/// Outcome of loading one source into a graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Candidate statements built from the source.
    pub evaluated: u64,
    /// Candidates dropped because a constraint did not hold.
    pub rejected: u64,
}

/// Contract implemented by format specific producers populating a [`Graph`].
///
/// Loaders run before any computation starts; the graph is frozen once every
/// configured source has been loaded.
pub trait GraphLoader {
    /// Appends the statements of the source to `graph`.
    ///
    /// # Errors
    ///
    /// Implementors fail with [`Error::Configuration`] when required mapping
    /// parameters are absent and with [`Error::Parse`] on malformed records.
    fn populate(&self, graph: &mut Graph, registry: &IdentifierRegistry) -> Result<LoadReport>;
}

/// Declares which kind of source a configuration entry describes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphSource {
    /// Delimited text file.
    Tabular(TabularSource),
}

impl GraphSource {
    /// Returns the loader able to read this source.
    #[must_use]
    pub fn loader(&self) -> Box<dyn GraphLoader + '_> {
        match self {
            Self::Tabular(source) => Box::new(TabularLoader::new(source)),
        }
    }
}

/// Column of a record turned into an identifier by prepending `prefix`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub column: usize,
    #[serde(default)]
    pub prefix: String,
}

/// Element of a candidate statement a constraint is checked against.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementElement {
    Subject,
    Object,
}

/// Condition a candidate statement must satisfy to be added.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementConstraint {
    /// The element must already be a vertex of the graph.
    Exists(StatementElement),
}

/// Builds one statement per record out of two mapped columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementTemplate {
    pub subject: usize,
    pub object: usize,
    /// Predicate, absolute or `prefix:local`.
    pub predicate: String,
    #[serde(default)]
    pub constraints: Vec<StatementConstraint>,
}

/// Delimited text source description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularSource {
    pub path: PathBuf,
    /// Skip the first line. Defaults to `true`.
    #[serde(default = "default_header")]
    pub header: bool,
    /// Field separator regular expression. Defaults to a tab.
    #[serde(default)]
    pub separator: Option<String>,
    #[serde(default)]
    pub mappings: Vec<ColumnMapping>,
    #[serde(default)]
    pub templates: Vec<StatementTemplate>,
}

fn default_header() -> bool {
    true
}

/// [`GraphLoader`] for delimited text files.
pub struct TabularLoader<'a> {
    source: &'a TabularSource,
}

impl<'a> TabularLoader<'a> {
    #[must_use]
    pub fn new(source: &'a TabularSource) -> Self {
        Self { source }
    }

    /// Loads records from any buffered reader instead of the configured path.
    ///
    /// # Errors
    ///
    /// See [`GraphLoader::populate`].
    pub fn populate_from<R: BufRead>(
        &self,
        reader: R,
        graph: &mut Graph,
        registry: &IdentifierRegistry,
    ) -> Result<LoadReport> {
        let plan = self.plan(registry)?;
        let mut report = LoadReport::default();
        let mut skip_header = self.source.header;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if skip_header {
                skip_header = false;
                continue;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = plan.separator.split(line).collect();
            for (template, predicate) in &plan.templates {
                let subject = self.build(template.subject, &fields, index, registry)?;
                let object = self.build(template.object, &fields, index, registry)?;
                report.evaluated += 1;
                let accepted = template.constraints.iter().all(|constraint| match constraint {
                    StatementConstraint::Exists(StatementElement::Subject) => {
                        graph.contains_vertex(&subject)
                    }
                    StatementConstraint::Exists(StatementElement::Object) => {
                        graph.contains_vertex(&object)
                    }
                });
                if accepted {
                    graph.add_statement(subject, predicate.clone(), object);
                } else {
                    report.rejected += 1;
                }
            }
        }

        info!(
            path = %self.source.path.display(),
            evaluated = report.evaluated,
            rejected = report.rejected,
            "tabular_source_loaded"
        );
        Ok(report)
    }

    fn plan(&self, registry: &IdentifierRegistry) -> Result<LoadPlan<'a>> {
        if self.source.mappings.is_empty() {
            return Err(Error::Configuration(
                "please specify a mapping for the tabular loader".to_string(),
            ));
        }
        if self.source.templates.is_empty() {
            return Err(Error::Configuration(
                "please specify a statement template for the tabular loader".to_string(),
            ));
        }
        let separator = Regex::new(self.source.separator.as_deref().unwrap_or("\t"))
            .map_err(|err| Error::Configuration(format!("invalid separator: {err}")))?;
        let templates = self
            .source
            .templates
            .iter()
            .map(|template| {
                resolve_predicate(&template.predicate, registry).map(|id| (template, id))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(LoadPlan {
            separator,
            templates,
        })
    }

    fn build(
        &self,
        column: usize,
        fields: &[&str],
        line: usize,
        registry: &IdentifierRegistry,
    ) -> Result<Identifier> {
        let mapping = self
            .source
            .mappings
            .iter()
            .find(|mapping| mapping.column == column);
        let (Some(mapping), Some(value)) = (mapping, fields.get(column)) else {
            return Err(Error::Parse {
                input: fields.join(" | "),
                reason: format!(
                    "line {}: no mapping or value for column {column}",
                    line + 1
                ),
            });
        };
        registry.intern(&format!("{}{}", mapping.prefix, value.trim()))
    }
}

impl GraphLoader for TabularLoader<'_> {
    fn populate(&self, graph: &mut Graph, registry: &IdentifierRegistry) -> Result<LoadReport> {
        let file = File::open(&self.source.path).map_err(|err| {
            Error::Configuration(format!(
                "cannot open graph source `{}`: {err}",
                self.source.path.display()
            ))
        })?;
        self.populate_from(BufReader::new(file), graph, registry)
    }
}

struct LoadPlan<'a> {
    separator: Regex,
    templates: Vec<(&'a StatementTemplate, Identifier)>,
}

fn resolve_predicate(text: &str, registry: &IdentifierRegistry) -> Result<Identifier> {
    if text.contains("://") {
        registry.intern(text)
    } else {
        registry.expand(text)
    }
}

/// Loads every source in order into a fresh graph named `name`.
///
/// # Errors
///
/// Propagates the first loader failure.
pub fn load_graph(
    name: &Identifier,
    sources: &[GraphSource],
    registry: &IdentifierRegistry,
) -> Result<Graph> {
    let mut graph = Graph::new(name.clone());
    for source in sources {
        source.loader().populate(&mut graph, registry)?;
    }
    info!(
        graph = %graph.name(),
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "graph_loaded"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn source(constraints: Vec<StatementConstraint>) -> TabularSource {
        TabularSource {
            path: PathBuf::from("inline.tsv"),
            header: true,
            separator: None,
            mappings: vec![
                ColumnMapping {
                    column: 0,
                    prefix: "http://example.org/".to_string(),
                },
                ColumnMapping {
                    column: 1,
                    prefix: "http://example.org/".to_string(),
                },
            ],
            templates: vec![StatementTemplate {
                subject: 0,
                object: 1,
                predicate: "rdfs:subClassOf".to_string(),
                constraints,
            }],
        }
    }

    fn graph(registry: &IdentifierRegistry) -> Graph {
        Graph::new(registry.intern("http://example.org/g").expect("name"))
    }

    #[test]
    fn loads_records_after_header() {
        let registry = IdentifierRegistry::new();
        let mut graph = graph(&registry);
        let source = source(vec![]);
        let report = TabularLoader::new(&source)
            .populate_from(
                Cursor::new("child\tparent\nDog\tMammal\nMammal\tAnimal\n"),
                &mut graph,
                &registry,
            )
            .expect("loaded");
        assert_eq!(report, LoadReport { evaluated: 2, rejected: 0 });
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.vertex_count(), 3);
    }

    #[test]
    fn exists_constraint_rejects_unknown_subjects() {
        let registry = IdentifierRegistry::new();
        let mut graph = graph(&registry);
        graph.add_vertex(registry.intern("http://example.org/Dog").expect("dog"));
        let source = source(vec![StatementConstraint::Exists(StatementElement::Subject)]);
        let report = TabularLoader::new(&source)
            .populate_from(
                Cursor::new("h\th\nDog\tMammal\nCat\tMammal\n"),
                &mut graph,
                &registry,
            )
            .expect("loaded");
        assert_eq!(report, LoadReport { evaluated: 2, rejected: 1 });
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn missing_templates_are_a_configuration_error() {
        let registry = IdentifierRegistry::new();
        let mut graph = graph(&registry);
        let mut source = source(vec![]);
        source.templates.clear();
        let err = TabularLoader::new(&source)
            .populate_from(Cursor::new(""), &mut graph, &registry)
            .expect_err("no template");
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn short_records_are_a_parse_error() {
        let registry = IdentifierRegistry::new();
        let mut graph = graph(&registry);
        let source = source(vec![]);
        let err = TabularLoader::new(&source)
            .populate_from(Cursor::new("h\nDog\n"), &mut graph, &registry)
            .expect_err("missing column");
        assert!(matches!(err, Error::Parse { .. }));
    }
}
