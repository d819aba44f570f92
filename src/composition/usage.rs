//! Client-operation corpus and usage-failure detection.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::composition::compose::ComposedSchema;
use crate::composition::errors::UsageFailure;

/// One field selection observed in client traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUse {
    pub type_name: String,
    pub field: String,
}

/// A previously observed client operation and the fields it selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedOperation {
    pub name: String,
    pub selects: Vec<FieldUse>,
}

/// Source of previously observed operations for a (graph, variant).
///
/// The corpus is fed by an external telemetry pipeline; this core only
/// reads it during `check`.
pub trait OperationCorpus: Send + Sync {
    fn recorded_operations(&self, graph: &str, variant: &str) -> Vec<RecordedOperation>;
}

/// Corpus with no recorded traffic. Usage checks trivially pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCorpus;

impl OperationCorpus for NullCorpus {
    fn recorded_operations(&self, _graph: &str, _variant: &str) -> Vec<RecordedOperation> {
        Vec::new()
    }
}

/// In-memory corpus for tests and single-process development.
#[derive(Debug, Default)]
pub struct StaticCorpus {
    operations: DashMap<(String, String), Vec<RecordedOperation>>,
}

impl StaticCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an operation as observed for (graph, variant).
    pub fn record(&self, graph: &str, variant: &str, operation: RecordedOperation) {
        self.operations
            .entry((graph.to_string(), variant.to_string()))
            .or_default()
            .push(operation);
    }
}

impl OperationCorpus for StaticCorpus {
    fn recorded_operations(&self, graph: &str, variant: &str) -> Vec<RecordedOperation> {
        self.operations
            .get(&(graph.to_string(), variant.to_string()))
            .map(|ops| ops.value().clone())
            .unwrap_or_default()
    }
}

/// Fields selected by recorded operations that the candidate schema no
/// longer provides.
pub fn usage_failures(schema: &ComposedSchema, operations: &[RecordedOperation]) -> Vec<UsageFailure> {
    let mut failures = Vec::new();
    for op in operations {
        for sel in &op.selects {
            if !schema.has_field(&sel.type_name, &sel.field) {
                failures.push(UsageFailure {
                    operation: op.name.clone(),
                    type_name: sel.type_name.clone(),
                    field: sel.field.clone(),
                });
            }
        }
    }
    failures
}
