//! Local hybrid index on LanceDB.
//!
//! Rows are keyed by `(namespace, id)` and written with `merge_insert`, so
//! re-ingesting a source replaces its rows instead of duplicating them. A query
//! pre-filters by metadata, pulls `top_k * 10` dense candidates and re-ranks
//! them by `dense · q_dense + sparse · q_sparse`.

use anyhow::Result;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use dialogue_core::traits::VectorStore;
use dialogue_core::types::{QueryMatch, QueryRequest, UpsertRecord};

use crate::schema::build_chunk_schema;
use crate::table::{batch_to_records, ensure_table, filter_sql, open_db, records_to_batch, table_exists};
use crate::dot;

pub struct LanceStore {
    runtime: Runtime,
    db: Connection,
    table_name: String,
    dim: i32,
}

impl LanceStore {
    pub fn open(path: &Path, table_name: &str, dim: usize) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let runtime = Runtime::new()?;
        let db = runtime.block_on(open_db(path.to_string_lossy().as_ref()))?;
        info!(path = %path.display(), table = table_name, "opened LanceDB store");
        Ok(Self { runtime, db, table_name: table_name.to_string(), dim: i32::try_from(dim)? })
    }

    pub async fn upsert_async(&self, namespace: &str, records: &[UpsertRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let schema = build_chunk_schema(self.dim);
        ensure_table(&self.db, &self.table_name, schema.clone()).await?;
        let table = self.db.open_table(&self.table_name).execute().await?;
        let batch = records_to_batch(namespace, records, self.dim)?;
        let reader = Box::new(arrow_array::RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        // (namespace, id) is unique
        let mut mi = table.merge_insert(&["namespace", "id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await?;
        debug!(namespace, rows = records.len(), "merged rows");
        Ok(records.len())
    }

    pub async fn query_async(&self, request: &QueryRequest) -> Result<Vec<QueryMatch>> {
        if request.top_k == 0 || !table_exists(&self.db, &self.table_name).await? {
            return Ok(Vec::new());
        }
        let table = self.db.open_table(&self.table_name).execute().await?;
        let filter = filter_sql(&request.namespace, &request.filter.source_id, request.filter.category);
        // never ask for more candidates than the table holds
        let rows = table.count_rows(None).await?;
        let candidates = request.top_k.saturating_mul(10).min(rows.max(1));
        let mut stream = table
            .vector_search(request.dense.clone())?
            .distance_type(DistanceType::Dot)
            .only_if(&filter)
            .limit(candidates)
            .execute()
            .await?;

        let mut matches = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            for record in batch_to_records(&batch)? {
                let score = dot(&record.dense, &request.dense) + record.sparse.dot(&request.sparse);
                let metadata = request.include_metadata.then_some(record.metadata);
                matches.push(QueryMatch { id: record.id, score, metadata });
            }
        }
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(request.top_k);
        Ok(matches)
    }
}

impl VectorStore for LanceStore {
    fn upsert(&self, namespace: &str, records: Vec<UpsertRecord>) -> dialogue_core::Result<usize> {
        self.runtime.block_on(self.upsert_async(namespace, &records)).map_err(dialogue_core::Error::store)
    }

    fn query(&self, request: &QueryRequest) -> dialogue_core::Result<Vec<QueryMatch>> {
        self.runtime.block_on(self.query_async(request)).map_err(dialogue_core::Error::store)
    }
}
