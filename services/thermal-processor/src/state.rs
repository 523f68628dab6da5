//! Shared application state.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cube_processor::ReconstructionDriver;
use ingestion::{ArrivalCoordinator, DatasetRegistry, DirectoryLocator, NpyResultPublisher};

use crate::config::ServiceConfig;

/// State handed to every request handler.
pub struct AppState {
    pub coordinator: ArrivalCoordinator,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(coordinator: ArrivalCoordinator) -> Self {
        Self {
            coordinator,
            started_at: Utc::now(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        Ok(Self::new(build_coordinator(config)?))
    }
}

/// Wire the registry, locator, reconstruction driver and publisher.
pub fn build_coordinator(config: &ServiceConfig) -> Result<ArrivalCoordinator> {
    let driver = ReconstructionDriver::new(config.processor.clone())
        .context("Failed to build reconstruction driver")?;

    Ok(ArrivalCoordinator::new(
        Arc::new(DatasetRegistry::new()),
        Arc::new(DirectoryLocator::new(&config.data_dir)),
        Arc::new(driver),
        Arc::new(NpyResultPublisher::new(&config.output_dir)),
    ))
}
