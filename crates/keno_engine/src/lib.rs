//! Keno engine: stream decoding, the job trigger, run accumulation and export.
mod accumulator;
mod decode;
mod export;
mod fetch;
mod types;

pub use accumulator::{RunAccumulator, RunObserver};
pub use decode::{decode_line, NoiseReason, StreamDecoder, DATA_MARKER};
pub use export::{
    encode, to_csv, to_json, write_export, ExportError, ExportFormat, ExportSummary, CSV_HEADER,
};
pub use fetch::{BodyStream, JobClient, ReqwestJobClient, TriggerSettings, DEFAULT_ENDPOINT};
pub use types::{FailureKind, FetchError, RunError};
