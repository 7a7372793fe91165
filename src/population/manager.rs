use super::buffer::GenomeBuffer;
use super::init::fill_initial_population;
use crate::config::CommitMode;
use crate::error::{KfResult, KnapForgeError};
use crate::memory::MemoryPolicy;
use crate::storage::{ArrayDescriptor, ElementType, ExperimentStorage, OpenMode};
use fastrand::Rng;
use strum_macros::Display;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
pub struct ManagerParams {
    pub population_size: usize,
    pub genome_length: usize,
    #[builder(default = 500)]
    pub stream_batch_size: usize,
    #[builder(default = 0.5)]
    pub initial_gene_probability: f64,
    #[builder(default)]
    pub commit_mode: CommitMode,
    #[builder(default)]
    pub memory: MemoryPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ManagerState {
    Uninitialized,
    PopulationReady,
    ChildrenReady,
    /// Children promoted; a fresh children buffer is ready for the next generation.
    Committed,
    Closed,
}

/// Commit mechanism, fixed when the children buffer is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CommitStrategy {
    Flip,
    Atomic,
}

/// Exclusive owner of the population and children buffers.
pub struct PopulationManager {
    params: ManagerParams,
    storage: ExperimentStorage,
    population: Option<GenomeBuffer>,
    children: Option<GenomeBuffer>,
    strategy: Option<CommitStrategy>,
    state: ManagerState,
    population_initialized: bool,
    children_initialized: bool,
}

impl PopulationManager {
    pub fn new(params: ManagerParams, storage: ExperimentStorage) -> KfResult<Self> {
        if params.population_size < 2 || params.population_size % 2 != 0 {
            return Err(KnapForgeError::Validation(format!(
                "Population size must be even and at least 2, got {}",
                params.population_size
            )));
        }
        if params.genome_length == 0 {
            return Err(KnapForgeError::Validation(
                "Genome length must be greater than 0".into(),
            ));
        }
        Ok(Self {
            params,
            storage,
            population: None,
            children: None,
            strategy: None,
            state: ManagerState::Uninitialized,
            population_initialized: false,
            children_initialized: false,
        })
    }

    pub fn params(&self) -> &ManagerParams {
        &self.params
    }

    pub fn storage(&self) -> &ExperimentStorage {
        &self.storage
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn commit_strategy(&self) -> Option<CommitStrategy> {
        self.strategy
    }

    pub fn population(&self) -> KfResult<&GenomeBuffer> {
        self.population
            .as_ref()
            .ok_or(KnapForgeError::NotInitialized("population"))
    }

    pub fn children(&self) -> KfResult<&GenomeBuffer> {
        self.children
            .as_ref()
            .ok_or(KnapForgeError::NotInitialized("children"))
    }

    /// Population for reading and children for writing during one reproduction pass.
    pub fn buffers_mut(&mut self) -> KfResult<(&GenomeBuffer, &mut GenomeBuffer)> {
        let population = self
            .population
            .as_ref()
            .ok_or(KnapForgeError::NotInitialized("population"))?;
        let children = self
            .children
            .as_mut()
            .ok_or(KnapForgeError::NotInitialized("children"))?;
        Ok((population, children))
    }

    fn rows(&self) -> usize {
        self.params.population_size
    }

    fn cols(&self) -> usize {
        self.params.genome_length
    }

    fn fits_in_memory(&self) -> bool {
        self.params
            .memory
            .keep_in_memory(self.rows(), self.cols(), ElementType::Uint8.size())
    }

    fn ensure_open(&self, what: &'static str) -> KfResult<()> {
        if self.state == ManagerState::Closed {
            return Err(KnapForgeError::AlreadyInitialized(what));
        }
        Ok(())
    }

    /// Allocates the population and fills it with Bernoulli draws. One-shot.
    pub fn initialize_population(&mut self, rng: &mut Rng) -> KfResult<()> {
        self.ensure_open("population")?;
        if self.population_initialized {
            return Err(KnapForgeError::AlreadyInitialized("population"));
        }

        let on_disk = self.params.commit_mode == CommitMode::Atomic || !self.fits_in_memory();
        let mut buffer = if on_disk {
            self.storage.ensure_storage_exists()?;
            self.storage.create_population(self.rows(), self.cols())?;
            let (array, _) = self.storage.load_population(OpenMode::ReadWrite)?;
            GenomeBuffer::mapped(array)
        } else {
            GenomeBuffer::in_memory(self.rows(), self.cols())
        };

        fill_initial_population(
            &mut buffer,
            self.params.initial_gene_probability,
            self.params.stream_batch_size,
            rng,
        )?;
        info!(
            "Initialized population {} x {} ({})",
            self.rows(),
            self.cols(),
            if buffer.is_disk_backed() { "disk" } else { "RAM" }
        );

        self.population = Some(buffer);
        self.population_initialized = true;
        self.state = ManagerState::PopulationReady;
        Ok(())
    }

    /// Allocates the children buffer and fixes the commit strategy. One-shot.
    pub fn initialize_children(&mut self) -> KfResult<()> {
        self.ensure_open("children")?;
        if self.children_initialized {
            return Err(KnapForgeError::AlreadyInitialized("children"));
        }
        let population_on_disk = self.population()?.is_disk_backed();

        let strategy = match self.params.commit_mode {
            CommitMode::Flip => CommitStrategy::Flip,
            CommitMode::Atomic => CommitStrategy::Atomic,
            CommitMode::Auto if population_on_disk || !self.fits_in_memory() => CommitStrategy::Atomic,
            CommitMode::Auto => CommitStrategy::Flip,
        };

        let children = match strategy {
            CommitStrategy::Atomic => self.map_fresh_children()?,
            CommitStrategy::Flip if self.fits_in_memory() => {
                GenomeBuffer::in_memory(self.rows(), self.cols())
            }
            CommitStrategy::Flip => self.map_fresh_children()?,
        };
        debug!(
            "Children buffer ready ({}), commit strategy {}",
            if children.is_disk_backed() { "disk" } else { "RAM" },
            strategy
        );

        self.children = Some(children);
        self.strategy = Some(strategy);
        self.children_initialized = true;
        self.state = ManagerState::ChildrenReady;
        Ok(())
    }

    pub fn init_pop_and_children(&mut self, rng: &mut Rng) -> KfResult<()> {
        self.initialize_population(rng)?;
        self.initialize_children()
    }

    fn map_fresh_children(&self) -> KfResult<GenomeBuffer> {
        self.storage.ensure_storage_exists()?;
        self.storage.create_children(self.rows(), self.cols())?;
        let (array, _) = self.storage.load_children(OpenMode::ReadWrite)?;
        Ok(GenomeBuffer::mapped(array))
    }

    /// Promotes the children buffer to be the new population.
    pub fn commit_reproduction_of_population(&mut self) -> KfResult<()> {
        if !self.population_initialized || self.population.is_none() {
            return Err(KnapForgeError::NotInitialized("population"));
        }
        if !self.children_initialized || self.children.is_none() {
            return Err(KnapForgeError::NotInitialized("children"));
        }
        let strategy = self
            .strategy
            .ok_or(KnapForgeError::NotInitialized("children"))?;

        match strategy {
            CommitStrategy::Flip => {
                if let Some(children) = self.children.as_ref() {
                    children.flush()?;
                }
                std::mem::swap(&mut self.population, &mut self.children);
                debug!("Flipped population and children buffers");
            }
            CommitStrategy::Atomic => self.commit_atomic()?,
        }
        self.state = ManagerState::Committed;
        Ok(())
    }

    /// Any failure leaves both buffers released, so the manager is closed.
    fn commit_atomic(&mut self) -> KfResult<()> {
        let result = self.replace_population_file();
        if result.is_err() {
            self.state = ManagerState::Closed;
        }
        result
    }

    fn replace_population_file(&mut self) -> KfResult<()> {
        // Both mappings must be released before the rename touches their paths.
        if let Some(children) = self.children.take() {
            children.close()?;
        }
        if let Some(population) = self.population.take() {
            population.close()?;
        }

        let expected = ArrayDescriptor::new(
            self.storage.store().data_path(&self.storage.children_name()),
            ElementType::Uint8,
            self.rows(),
            self.cols(),
        );
        self.storage.commit_children(&expected)?;

        let (array, _) = self.storage.load_population(OpenMode::ReadWrite)?;
        self.population = Some(GenomeBuffer::mapped(array));
        self.children = Some(self.map_fresh_children()?);
        debug!("Committed children to population on disk");
        Ok(())
    }

    /// Flushes and releases both buffers. The manager cannot be re-initialized.
    pub fn close(&mut self) -> KfResult<()> {
        if let Some(children) = self.children.take() {
            children.close()?;
        }
        if let Some(population) = self.population.take() {
            population.close()?;
        }
        self.state = ManagerState::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageLayout;

    fn manager(dir: &std::path::Path, mode: CommitMode) -> PopulationManager {
        let params = ManagerParams::builder()
            .population_size(4)
            .genome_length(6)
            .commit_mode(mode)
            .build();
        let storage = ExperimentStorage::new(StorageLayout::new(dir), "unit");
        PopulationManager::new(params, storage).unwrap()
    }

    #[test]
    fn test_state_transitions_flip() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manager(dir.path(), CommitMode::Flip);
        let mut rng = Rng::with_seed(9);
        assert_eq!(m.state(), ManagerState::Uninitialized);
        assert!(matches!(m.population(), Err(KnapForgeError::NotInitialized(_))));

        m.initialize_population(&mut rng).unwrap();
        assert_eq!(m.state(), ManagerState::PopulationReady);
        m.initialize_children().unwrap();
        assert_eq!(m.state(), ManagerState::ChildrenReady);
        assert_eq!(m.commit_strategy(), Some(CommitStrategy::Flip));

        m.commit_reproduction_of_population().unwrap();
        assert_eq!(m.state(), ManagerState::Committed);
    }

    #[test]
    fn test_odd_population_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let params = ManagerParams::builder()
            .population_size(3)
            .genome_length(6)
            .build();
        let storage = ExperimentStorage::new(StorageLayout::new(dir.path()), "unit");
        assert!(PopulationManager::new(params, storage).is_err());
    }

    #[test]
    fn test_closed_manager_cannot_reinitialize() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manager(dir.path(), CommitMode::Flip);
        m.close().unwrap();
        let mut rng = Rng::with_seed(1);
        assert!(matches!(
            m.initialize_population(&mut rng),
            Err(KnapForgeError::AlreadyInitialized(_))
        ));
    }
}
