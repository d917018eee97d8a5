pub mod gateway;
pub mod http;

pub use gateway::{
    BatchItemResult, BatchResponse, DeleteParams, FetchParams, FetchResponse, FieldError,
    FieldSelector, RecordClient, RecordClientError, RecordClientFuture, RecordOperation,
    RecordPayload, RecordResponse, WriteParams,
};
pub use http::HttpRecordClient;
