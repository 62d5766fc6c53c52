pub mod error;
pub mod query;
pub mod result;


pub use error::{ErrorKind, GeocoderError, ProviderError, Result};
pub use query::{NormalizedQuery, MAX_QUERY_CHARS};
pub use result::{GeoResult, Lookup, ResolutionOutcome};
