use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use dialogue_core::error::{Error, Result};
use dialogue_core::traits::VectorStore;
use dialogue_core::types::{QueryMatch, QueryRequest, UpsertRecord};

use crate::dot;

/// In-process store with the same scoring as the hosted index. Counts upsert
/// calls so batching can be observed.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<(String, String), UpsertRecord>>,
    upsert_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, namespace: &str, id: &str) -> Option<UpsertRecord> {
        let rows = self.rows.lock().ok()?;
        rows.get(&(namespace.to_string(), id.to_string())).cloned()
    }
}

impl VectorStore for MemoryStore {
    fn upsert(&self, namespace: &str, records: Vec<UpsertRecord>) -> Result<usize> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().map_err(|_| Error::store("memory store lock poisoned"))?;
        let n = records.len();
        for record in records {
            rows.insert((namespace.to_string(), record.id.clone()), record);
        }
        Ok(n)
    }

    fn query(&self, request: &QueryRequest) -> Result<Vec<QueryMatch>> {
        let rows = self.rows.lock().map_err(|_| Error::store("memory store lock poisoned"))?;
        let mut matches: Vec<QueryMatch> = rows
            .iter()
            .filter(|((ns, _), r)| *ns == request.namespace && request.filter.matches(&r.metadata))
            .map(|(_, r)| QueryMatch {
                id: r.id.clone(),
                score: dot(&r.dense, &request.dense) + r.sparse.dot(&request.sparse),
                metadata: request.include_metadata.then(|| r.metadata.clone()),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(request.top_k);
        Ok(matches)
    }
}
