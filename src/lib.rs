pub mod config;
pub mod logging;
pub mod store;

pub use catalog_engine::filter::{FilterRequest, FilterSpec};
pub use catalog_engine::query::QueryEngine;
pub use catalog_engine::{
    AppError, DecodeError, FileRecord, FileType, Result, SignedFileRecord, TransportError,
    ViewRecord,
};

use config::PhotosphereConfig;

/// Opens a catalog session against the store described by `config`.
pub fn open(config: &PhotosphereConfig) -> Result<QueryEngine> {
    let (source, signer) = store::connect(&config.store)?;
    Ok(QueryEngine::new(source, signer, config.query_config()?))
}
