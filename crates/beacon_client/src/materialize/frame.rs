use arrow::array::{ArrayRef, RecordBatch};
use arrow::compute::{concat, concat_batches};
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::errors::{ClientError, Result};

/// In-memory tabular result.
#[derive(Debug, Clone)]
pub struct DataFrame {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl DataFrame {
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<Self> {
        if let Some(batch) = batches.iter().find(|b| b.schema() != schema) {
            return Err(ArrowError::SchemaError(format!(
                "batch schema {} does not match frame schema {}",
                batch.schema(),
                schema
            ))
            .into());
        }
        Ok(DataFrame { schema, batches })
    }

    /// Decode a parquet body returned by the engine.
    pub fn from_parquet(bytes: Bytes) -> Result<Self> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?;
        let schema = builder.schema().clone();
        let batches = builder
            .build()?
            .collect::<Result<Vec<_>, ArrowError>>()?;
        Ok(DataFrame { schema, batches })
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema.fields().iter().map(|f| f.name().as_str()).collect()
    }

    /// A full column, concatenated across batches.
    pub fn column(&self, name: &str) -> Result<ArrayRef> {
        let idx = self.schema.index_of(name)?;
        if self.batches.len() == 1 {
            return Ok(self.batches[0].column(idx).clone());
        }
        if self.batches.is_empty() {
            return Ok(arrow::array::new_empty_array(self.schema.field(idx).data_type()));
        }
        let parts: Vec<_> = self.batches.iter().map(|b| b.column(idx).as_ref()).collect();
        Ok(concat(&parts)?)
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        concat_batches(&self.schema, &self.batches).map_err(ClientError::from)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Array, AsArray, Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Float64Type, Schema};
    use parquet::arrow::ArrowWriter;

    use super::*;

    fn batch(schema: &SchemaRef, temps: Vec<f64>, names: Vec<&str>) -> RecordBatch {
        RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Float64Array::from(temps)),
                Arc::new(StringArray::from(names)),
            ],
        )
        .unwrap()
    }

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("TEMP", DataType::Float64, true),
            Field::new("PLATFORM", DataType::Utf8, true),
        ]))
    }

    #[test]
    fn parquet_roundtrip() {
        let schema = schema();
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema.clone(), None).unwrap();
        writer
            .write(&batch(&schema, vec![1.0, 2.0], vec!["a", "b"]))
            .unwrap();
        writer.close().unwrap();

        let frame = DataFrame::from_parquet(Bytes::from(buf)).unwrap();
        assert_eq!(2, frame.num_rows());
        assert_eq!(vec!["TEMP", "PLATFORM"], frame.column_names());
    }

    #[test]
    fn column_spans_batches() {
        let schema = schema();
        let frame = DataFrame::try_new(
            schema.clone(),
            vec![
                batch(&schema, vec![1.0], vec!["a"]),
                batch(&schema, vec![2.0, 3.0], vec!["b", "c"]),
            ],
        )
        .unwrap();

        let temp = frame.column("TEMP").unwrap();
        assert_eq!(3, temp.len());
        assert_eq!(
            &[1.0, 2.0, 3.0],
            temp.as_primitive::<Float64Type>().values().as_ref()
        );
        assert_eq!(3, frame.to_record_batch().unwrap().num_rows());
        assert!(frame.column("MISSING").is_err());
    }

    #[test]
    fn empty_frame_column() {
        let frame = DataFrame::try_new(schema(), Vec::new()).unwrap();
        assert_eq!(0, frame.num_rows());
        assert_eq!(0, frame.column("PLATFORM").unwrap().len());
    }

    #[test]
    fn mismatched_batch_schema() {
        let other = Arc::new(Schema::new(vec![Field::new("X", DataType::Float64, true)]));
        let b = RecordBatch::try_new(other, vec![Arc::new(Float64Array::from(vec![1.0]))]).unwrap();
        assert!(DataFrame::try_new(schema(), vec![b]).is_err());
    }
}
