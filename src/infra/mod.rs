pub mod ndjson_output_adapter;

pub use ndjson_output_adapter::NdjsonOutputAdapter;
