//! LanceDB connection helpers and Arrow conversion for chunk rows.

use anyhow::{anyhow, Result};
use arrow_array::types::{Float32Type, UInt32Type};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, ListArray, RecordBatch, RecordBatchIterator, StringArray,
    TimestampMillisecondArray, UInt32Array,
};
use arrow_schema::Schema;
use chrono::Utc;
use lancedb::{connect, Connection};
use std::str::FromStr;
use std::sync::Arc;

use dialogue_core::types::{Category, ChunkMetadata, SparseVector, UpsertRecord};

use crate::schema::build_chunk_schema;

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.table_names().execute().await?.iter().any(|n| n == name))
}

pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<Schema>) -> Result<()> {
    if table_exists(conn, name).await? {
        return Ok(());
    }
    // create empty table with 0 rows
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
    conn.create_table(name, Box::new(iter)).execute().await?;
    Ok(())
}

pub fn records_to_batch(namespace: &str, records: &[UpsertRecord], dim: i32) -> Result<RecordBatch> {
    let now = Utc::now().timestamp_millis();
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(records.len());
    let mut sparse_indices: Vec<Option<Vec<Option<u32>>>> = Vec::with_capacity(records.len());
    let mut sparse_values: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(records.len());
    for r in records {
        if r.dense.len() != dim as usize {
            return Err(anyhow!("record {} has {} dims, table expects {}", r.id, r.dense.len(), dim));
        }
        vectors.push(Some(r.dense.iter().map(|&x| Some(x)).collect()));
        sparse_indices.push(Some(r.sparse.indices.iter().map(|&x| Some(x)).collect()));
        sparse_values.push(Some(r.sparse.values.iter().map(|&x| Some(x)).collect()));
    }
    let strings = |f: &dyn Fn(&ChunkMetadata) -> String| records.iter().map(|r| f(&r.metadata)).collect::<Vec<_>>();

    let batch = RecordBatch::try_new(
        build_chunk_schema(dim),
        vec![
            Arc::new(StringArray::from(records.iter().map(|r| r.id.clone()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(vec![namespace.to_string(); records.len()])),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim)),
            Arc::new(ListArray::from_iter_primitive::<UInt32Type, _, _>(sparse_indices)),
            Arc::new(ListArray::from_iter_primitive::<Float32Type, _, _>(sparse_values)),
            Arc::new(StringArray::from(strings(&|m| m.category.as_str().to_string()))),
            Arc::new(StringArray::from(strings(&|m| m.source_id.clone()))),
            Arc::new(StringArray::from(strings(&|m| m.title.clone()))),
            Arc::new(Int32Array::from(records.iter().map(|r| r.metadata.season.map(|s| s as i32)).collect::<Vec<_>>())),
            Arc::new(Int32Array::from(records.iter().map(|r| r.metadata.episode.map(|e| e as i32)).collect::<Vec<_>>())),
            Arc::new(StringArray::from(records.iter().map(|r| r.metadata.episode_title.clone()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(strings(&|m| m.start.clone()))),
            Arc::new(StringArray::from(strings(&|m| m.end.clone()))),
            Arc::new(StringArray::from(records.iter().map(|r| r.metadata.text.clone()).collect::<Vec<_>>())),
            Arc::new(TimestampMillisecondArray::from(vec![now; records.len()])),
        ],
    )?;
    Ok(batch)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow!("column '{name}' missing or mistyped"))
}

fn optional_string(col: &StringArray, i: usize) -> Option<String> {
    if col.is_null(i) { None } else { Some(col.value(i).to_string()) }
}

fn optional_u32(col: &Int32Array, i: usize) -> Option<u32> {
    if col.is_null(i) { None } else { u32::try_from(col.value(i)).ok() }
}

fn u32_list(col: &ListArray, i: usize) -> Result<Vec<u32>> {
    if col.is_null(i) {
        return Ok(Vec::new());
    }
    let item = col.value(i);
    let array = item.as_any().downcast_ref::<UInt32Array>().ok_or_else(|| anyhow!("list item mistyped"))?;
    Ok(array.values().to_vec())
}

fn f32_list(col: &ListArray, i: usize) -> Result<Vec<f32>> {
    if col.is_null(i) {
        return Ok(Vec::new());
    }
    let item = col.value(i);
    let array = item.as_any().downcast_ref::<Float32Array>().ok_or_else(|| anyhow!("list item mistyped"))?;
    Ok(array.values().to_vec())
}

/// Decodes stored rows back into records (dense, sparse and metadata).
pub fn batch_to_records(batch: &RecordBatch) -> Result<Vec<UpsertRecord>> {
    let ids = column::<StringArray>(batch, "id")?;
    let vectors = column::<FixedSizeListArray>(batch, "vector")?;
    let sparse_indices = column::<ListArray>(batch, "sparse_indices")?;
    let sparse_values = column::<ListArray>(batch, "sparse_values")?;
    let categories = column::<StringArray>(batch, "category")?;
    let source_ids = column::<StringArray>(batch, "source_id")?;
    let titles = column::<StringArray>(batch, "title")?;
    let seasons = column::<Int32Array>(batch, "season")?;
    let episodes = column::<Int32Array>(batch, "episode")?;
    let episode_titles = column::<StringArray>(batch, "episode_title")?;
    let starts = column::<StringArray>(batch, "start_ts")?;
    let ends = column::<StringArray>(batch, "end_ts")?;
    let texts = column::<StringArray>(batch, "text")?;

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let dense_item = vectors.value(i);
        let dense = dense_item
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| anyhow!("vector item mistyped"))?
            .values()
            .to_vec();
        let sparse = SparseVector::new(
            u32_list(sparse_indices, i)?,
            f32_list(sparse_values, i)?,
        )?;
        let metadata = ChunkMetadata {
            category: Category::from_str(categories.value(i))?,
            source_id: source_ids.value(i).to_string(),
            title: titles.value(i).to_string(),
            season: optional_u32(seasons, i),
            episode: optional_u32(episodes, i),
            episode_title: optional_string(episode_titles, i),
            start: starts.value(i).to_string(),
            end: ends.value(i).to_string(),
            text: optional_string(texts, i),
        };
        out.push(UpsertRecord { id: ids.value(i).to_string(), dense, sparse, metadata });
    }
    Ok(out)
}

/// SQL predicate for one namespace and metadata filter.
pub fn filter_sql(namespace: &str, source_id: &str, category: Option<Category>) -> String {
    let mut sql = format!("namespace = '{}' AND source_id = '{}'", escape(namespace), escape(source_id));
    if let Some(c) = category {
        sql.push_str(&format!(" AND category = '{}'", c.as_str()));
    }
    sql
}

fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_escapes_quotes() {
        assert_eq!(
            filter_sql("global", "grey's_anatomy", Some(Category::Series)),
            "namespace = 'global' AND source_id = 'grey''s_anatomy' AND category = 'series'"
        );
        assert_eq!(filter_sql("global", "heat", None), "namespace = 'global' AND source_id = 'heat'");
    }
}
