use super::array_store::{ArrayDescriptor, ArrayStore, ElementType, MappedArray, OpenMode, RetryPolicy};
use super::layout::StorageLayout;
use super::naming::NamingScheme;
use crate::error::KfResult;
use std::path::PathBuf;
use tracing::info;

/// Storage for one job: its directory layout plus the array files living in `temp/`.
#[derive(Debug, Clone)]
pub struct ExperimentStorage {
    layout: StorageLayout,
    job_id: String,
    naming: NamingScheme,
    store: ArrayStore,
    retry: RetryPolicy,
}

impl ExperimentStorage {
    pub fn new(layout: StorageLayout, job_id: impl Into<String>) -> Self {
        let store = ArrayStore::new(layout.temp());
        Self {
            layout,
            job_id: job_id.into(),
            naming: NamingScheme,
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn store(&self) -> &ArrayStore {
        &self.store
    }

    pub fn population_name(&self) -> String {
        self.naming.population_array(&self.job_id)
    }

    pub fn children_name(&self) -> String {
        self.naming.children_array(&self.job_id)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.layout.output().join(self.naming.csv_file(&self.job_id))
    }

    pub fn log_path(&self) -> PathBuf {
        self.layout.logs().join(self.naming.log_file(&self.job_id))
    }

    pub fn ensure_storage_exists(&self) -> KfResult<()> {
        self.layout.ensure_exists()
    }

    pub fn create_population(&self, rows: usize, cols: usize) -> KfResult<ArrayDescriptor> {
        self.store
            .create_empty(&self.population_name(), rows, cols, ElementType::Uint8)
    }

    pub fn load_population(&self, mode: OpenMode) -> KfResult<(MappedArray, ArrayDescriptor)> {
        self.store.load(&self.population_name(), mode)
    }

    pub fn create_children(&self, rows: usize, cols: usize) -> KfResult<ArrayDescriptor> {
        self.store
            .create_empty(&self.children_name(), rows, cols, ElementType::Uint8)
    }

    pub fn load_children(&self, mode: OpenMode) -> KfResult<(MappedArray, ArrayDescriptor)> {
        self.store.load(&self.children_name(), mode)
    }

    /// Renames the children data file over the population data file and
    /// rewrites the population sidecar to the committed shape.
    ///
    /// Both arrays must be unmapped before calling this.
    pub fn commit_children(&self, expected: &ArrayDescriptor) -> KfResult<ArrayDescriptor> {
        let pop_name = self.population_name();
        self.store
            .commit_atomic(&self.children_name(), &pop_name, expected.filesize, self.retry)?;

        let committed = ArrayDescriptor::new(
            self.store.data_path(&pop_name),
            expected.data_type,
            expected.rows(),
            expected.cols(),
        );
        self.store.write_descriptor(&pop_name, &committed)?;
        Ok(committed)
    }

    pub fn remove_temp_data(&self) -> KfResult<()> {
        info!("Removing temporary data in {}", self.layout.temp().display());
        self.layout.cleanup_temp()
    }
}
