#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod aggregate;
pub mod cancel;
pub mod config;
pub mod error;
pub mod normalize;
pub mod seed;
pub mod telemetry;
pub mod traits;
pub mod types;

pub use aggregate::BulkErrorAggregator;
pub use cancel::{CancelSource, CancelToken};
pub use error::{Envelope, Error, Result};
pub use traits::BackendAdapter;
pub use types::{BulkOutcome, DocFailure, IndexableDocument, LooseList, RawHits, Record};
