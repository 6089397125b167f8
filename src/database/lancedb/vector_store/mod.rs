
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::AssistError;
use crate::database::{IndexHit, VectorIndex, check_upsert_lengths};

/// Vector index stored in a LanceDB table.
///
/// The connection is opened on first use and reused afterwards. A table that
/// does not exist yet behaves as an empty index for [`VectorIndex::count`];
/// it is created with the dimension of the first upserted batch.
pub struct LanceIndex {
    db_path: PathBuf,
    table_name: String,
    connection: OnceCell<Connection>,
    write_lock: Mutex<()>,
}

impl LanceIndex {
    /// Describe an index without touching the filesystem
    #[inline]
    pub fn new(db_path: impl Into<PathBuf>, table_name: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            table_name: table_name.into(),
            connection: OnceCell::new(),
            write_lock: Mutex::new(()),
        }
    }

    #[inline]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn connection(&self) -> Result<&Connection, AssistError> {
        self.connection
            .get_or_try_init(|| async {
                debug!("Connecting to LanceDB at path: {:?}", self.db_path);

                std::fs::create_dir_all(&self.db_path).map_err(|e| {
                    AssistError::Index(format!("Failed to create vector database directory: {}", e))
                })?;

                let uri = format!("file://{}", self.db_path.display());
                lancedb::connect(&uri)
                    .execute()
                    .await
                    .map_err(|e| AssistError::Index(format!("Failed to connect to LanceDB: {}", e)))
            })
            .await
    }

    async fn table_exists(&self) -> Result<bool, AssistError> {
        let table_names = self
            .connection()
            .await?
            .table_names()
            .execute()
            .await
            .map_err(|e| AssistError::Index(format!("Failed to list tables: {}", e)))?;

        Ok(table_names.contains(&self.table_name))
    }

    async fn open_table(&self) -> Result<Table, AssistError> {
        self.connection()
            .await?
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| {
                AssistError::Index(format!("Failed to open table {}: {}", self.table_name, e))
            })
    }

    /// Detect vector dimension from existing table schema
    async fn existing_vector_dimension(&self, table: &Table) -> Result<usize, AssistError> {
        let schema = table
            .schema()
            .await
            .map_err(|e| AssistError::Index(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return usize::try_from(*size).map_err(|_| {
                        AssistError::Index(format!("Invalid vector dimension: {}", size))
                    });
                }
            }
        }

        Err(AssistError::Index(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    /// Create schema with the specified vector dimension
    fn create_schema(vector_dim: i32) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    vector_dim,
                ),
                false,
            ),
            Field::new("document", DataType::Utf8, false),
        ]))
    }

    /// Open the table, creating or recreating it when the dimension differs
    async fn table_for_dimension(&self, vector_dim: usize) -> Result<Table, AssistError> {
        if self.table_exists().await? {
            let table = self.open_table().await?;
            let existing = self.existing_vector_dimension(&table).await?;
            if existing == vector_dim {
                return Ok(table);
            }

            info!(
                "Vector dimension changed from {} to {}, recreating table {}",
                existing, vector_dim, self.table_name
            );
            self.drop_table_if_exists().await?;
        }

        let dim = i32::try_from(vector_dim)
            .map_err(|_| AssistError::Index(format!("Vector dimension too large: {}", vector_dim)))?;

        self.connection()
            .await?
            .create_empty_table(&self.table_name, Self::create_schema(dim))
            .execute()
            .await
            .map_err(|e| AssistError::Index(format!("Failed to create table: {}", e)))?;

        info!(
            "Created table {} with {} dimensions",
            self.table_name, vector_dim
        );
        self.open_table().await
    }

    /// Create a RecordBatch from parallel id/vector/document slices
    fn create_record_batch(
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
        vector_dim: usize,
    ) -> Result<RecordBatch, AssistError> {
        let dim = i32::try_from(vector_dim)
            .map_err(|_| AssistError::Index(format!("Vector dimension too large: {}", vector_dim)))?;

        let mut flat_values = Vec::with_capacity(vectors.len() * vector_dim);
        for vector in vectors {
            if vector.len() != vector_dim {
                return Err(AssistError::Index(format!(
                    "Inconsistent vector dimensions in batch: expected {}, got {}",
                    vector_dim,
                    vector.len()
                )));
            }
            flat_values.extend_from_slice(vector);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector_array = FixedSizeListArray::try_new(field, dim, Arc::new(values_array), None)
            .map_err(|e| AssistError::Index(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from_iter_values(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from_iter_values(documents)),
        ];

        RecordBatch::try_new(Self::create_schema(dim), arrays)
            .map_err(|e| AssistError::Index(format!("Failed to create record batch: {}", e)))
    }

    /// Parse a single record batch from search results
    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<IndexHit>, AssistError> {
        let ids = string_column(batch, "id")?;
        let documents = string_column(batch, "document")?;
        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        let hits = (0..batch.num_rows())
            .map(|row| IndexHit {
                id: ids.value(row).to_string(),
                distance: distances
                    .filter(|d| !d.is_null(row))
                    .map_or(0.0, |d| d.value(row)),
                document: documents.value(row).to_string(),
            })
            .collect();

        Ok(hits)
    }

    /// Drop the table if it exists
    async fn drop_table_if_exists(&self) -> Result<(), AssistError> {
        if self.table_exists().await? {
            info!("Dropping table {}", self.table_name);
            self.connection()
                .await?
                .drop_table(&self.table_name)
                .await
                .map_err(|e| AssistError::Index(format!("Failed to drop table: {}", e)))?;
        }

        Ok(())
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, AssistError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| AssistError::Index(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| AssistError::Index(format!("Invalid {} column type", name)))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[async_trait]
impl VectorIndex for LanceIndex {
    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
    ) -> crate::Result<()> {
        check_upsert_lengths(ids, vectors, documents)?;
        let Some(first) = vectors.first() else {
            debug!("No vectors to store");
            return Ok(());
        };
        let vector_dim = first.len();

        let _guard = self.write_lock.lock().await;
        let table = self.table_for_dimension(vector_dim).await?;

        let predicate = format!(
            "id IN ({})",
            ids.iter()
                .map(|id| quote_literal(id))
                .collect::<Vec<_>>()
                .join(", ")
        );
        table
            .delete(&predicate)
            .await
            .map_err(|e| AssistError::Index(format!("Failed to replace existing ids: {}", e)))?;

        let record_batch = Self::create_record_batch(ids, vectors, documents, vector_dim)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| AssistError::Index(format!("Failed to insert vectors: {}", e)))?;

        info!("Stored {} vectors in {}", ids.len(), self.table_name);
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> crate::Result<Vec<IndexHit>> {
        debug!("Searching {} with limit: {}", self.table_name, k);
        if k == 0 {
            return Ok(Vec::new());
        }

        let table = self.open_table().await?;
        let mut results = table
            .vector_search(vector)
            .map_err(|e| AssistError::Index(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(|e| AssistError::Index(format!("Failed to execute search: {}", e)))?;

        let mut hits = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| AssistError::Index(format!("Failed to read result stream: {}", e)))?
        {
            hits.extend(Self::parse_search_batch(&batch)?);
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        debug!("Parsed {} search results", hits.len());
        Ok(hits)
    }

    async fn count(&self) -> crate::Result<usize> {
        if !self.table_exists().await? {
            return Ok(0);
        }

        self.open_table()
            .await?
            .count_rows(None)
            .await
            .map_err(|e| AssistError::Index(format!("Failed to count rows: {}", e)))
    }

    async fn clear(&self) -> crate::Result<()> {
        let _guard = self.write_lock.lock().await;
        self.drop_table_if_exists().await
    }
}
