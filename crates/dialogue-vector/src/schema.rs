use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

/// Row layout of the local hybrid index. Sparse vectors are stored as two
/// parallel list columns.
pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("namespace", DataType::Utf8, false),
        Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
        Field::new("sparse_indices", DataType::List(Arc::new(Field::new("item", DataType::UInt32, true))), true),
        Field::new("sparse_values", DataType::List(Arc::new(Field::new("item", DataType::Float32, true))), true),
        Field::new("category", DataType::Utf8, false),
        Field::new("source_id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("season", DataType::Int32, true),
        Field::new("episode", DataType::Int32, true),
        Field::new("episode_title", DataType::Utf8, true),
        Field::new("start_ts", DataType::Utf8, false),
        Field::new("end_ts", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, true),
        Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
    ]))
}
