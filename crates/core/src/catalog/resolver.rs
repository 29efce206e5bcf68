//! Resolves processor names to the latest available version.

use std::sync::Arc;

use tracing::{debug, info};

use super::error::CatalogError;
use super::types::{Processor, ProcessorVersion};
use crate::service::ProcessingService;

/// Looks up processors offered by the processing service.
#[derive(Clone)]
pub struct ProcessorCatalog {
    service: Arc<dyn ProcessingService>,
}

impl ProcessorCatalog {
    pub fn new(service: Arc<dyn ProcessingService>) -> Self {
        Self { service }
    }

    /// All processors whose name contains `filter` (case-insensitive), in
    /// service order.
    pub async fn list(&self, filter: &str) -> Result<Vec<Processor>, CatalogError> {
        let processors = self.service.list_processors().await?;
        debug!(
            "Processing service offers {} processors",
            processors.len()
        );
        Ok(processors.into_iter().filter(|p| p.matches(filter)).collect())
    }

    /// Resolves `filter` to the matching processor with the highest version.
    pub async fn resolve(&self, filter: &str) -> Result<Processor, CatalogError> {
        let processors = self.service.list_processors().await?;
        let processor = select_latest(processors, filter)?;
        info!(
            "Resolved {:?} to {} {} ({})",
            filter, processor.name, processor.version, processor.id
        );
        Ok(processor)
    }
}

/// Picks the processor matching `filter` with the greatest parsed version.
///
/// Equal versions resolve to the one listed last. Any matching processor
/// with an unparseable version fails the whole selection.
pub fn select_latest(
    processors: impl IntoIterator<Item = Processor>,
    filter: &str,
) -> Result<Processor, CatalogError> {
    let mut best: Option<(ProcessorVersion, Processor)> = None;

    for processor in processors.into_iter().filter(|p| p.matches(filter)) {
        let version = processor.parsed_version()?;
        let replace = match &best {
            Some((best_version, _)) => version >= *best_version,
            None => true,
        };
        if replace {
            best = Some((version, processor));
        }
    }

    best.map(|(_, p)| p)
        .ok_or_else(|| CatalogError::ProcessorNotFound {
            filter: filter.to_string(),
        })
}
