//! The process-wide registry of programs, instances, tags and the latest
//! snapshot.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use arc_swap::ArcSwap;
use arscene_value::Value;
use tracing::{debug, info, warn};

use crate::error::{Result, RuntimeError};
use crate::instance::Instance;
use crate::program::{Catalog, Program};
use crate::snapshot::Snapshot;

/// Index of an instance in the registry. Never reused.
pub type InstanceId = usize;

/// Number of a physical marker a client can see.
pub type Tag = i64;

/// Runtime knobs.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Time between simulation ticks.
    pub tick_interval: Duration,
    /// Instances the registry will hold before refusing new ones.
    pub max_instances: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            max_instances: 1024,
        }
    }
}

/// Shared state of a running server.
///
/// Instances are only ever appended, so an [`InstanceId`] stays valid and
/// keeps pointing at the same instance for the life of the registry.
pub struct Registry {
    config: RuntimeConfig,
    programs: RwLock<BTreeMap<String, Arc<Program>>>,
    libraries: Vec<Arc<Program>>,
    instances: RwLock<Vec<Arc<Instance>>>,
    tags: RwLock<BTreeMap<Tag, InstanceId>>,
    snapshot: ArcSwap<Snapshot>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("programs", &self.program_names())
            .field("instances", &self.len())
            .field("tags", &self.tags())
            .field("tick", &self.snapshot().tick())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl Registry {
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_libraries(config, Vec::new())
    }

    /// A registry whose instances all load `libraries` ahead of their program.
    pub fn with_libraries(config: RuntimeConfig, libraries: Vec<Arc<Program>>) -> Self {
        Self {
            config,
            programs: RwLock::new(BTreeMap::new()),
            libraries,
            instances: RwLock::new(Vec::new()),
            tags: RwLock::new(BTreeMap::new()),
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
        }
    }

    /// A registry holding every program and library of `catalog`.
    pub fn from_catalog(config: RuntimeConfig, catalog: Catalog) -> Self {
        let registry = Self::with_libraries(config, catalog.libraries);
        for program in catalog.programs {
            registry.register(program);
        }
        registry
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Make a program available to `instantiate`, replacing any program of
    /// the same name. Running instances keep the source they were built from.
    pub fn register(&self, program: impl Into<Arc<Program>>) {
        let program = program.into();
        debug!(program = %program.name, "registered program");
        if write(&self.programs)
            .insert(program.name.clone(), program)
            .is_some()
        {
            debug!("replaced earlier program of the same name");
        }
    }

    pub fn program(&self, name: &str) -> Option<Arc<Program>> {
        read(&self.programs).get(name).cloned()
    }

    pub fn program_names(&self) -> Vec<String> {
        read(&self.programs).keys().cloned().collect()
    }

    /// Create an instance of `name` and, if `auto_init` is set, run its init
    /// hook before it becomes visible to the simulation.
    ///
    /// # Errors
    ///
    /// - `UnknownProgram` if nothing is registered under `name`
    /// - `Load` if the sources fail to load; nothing is registered
    /// - `LimitReached` if the registry is full
    /// - `Init` if the init hook fails. The instance is still registered and
    ///   the error carries its id.
    pub fn instantiate(&self, name: &str, auto_init: bool) -> Result<InstanceId> {
        let instance = self.load(name)?;
        let init = if auto_init { instance.init() } else { Ok(()) };
        let id = self.push(instance)?;

        match init {
            Ok(()) => Ok(id),
            Err(RuntimeError::Init {
                program, source, ..
            }) => {
                warn!(instance = id, program = %program, error = %source, "init failed");
                Err(RuntimeError::Init {
                    program,
                    instance: Some(id),
                    source,
                })
            }
            Err(other) => Err(other),
        }
    }

    /// Create an instance of `name` with `state` as its state table. The
    /// init hook does not run.
    ///
    /// # Errors
    ///
    /// As [`Registry::instantiate`], plus `InvalidState` when `state` is not
    /// a table.
    pub fn instantiate_with_state(&self, name: &str, state: Value) -> Result<InstanceId> {
        let instance = self.load(name)?;
        instance.install_state(state)?;
        self.push(instance)
    }

    fn load(&self, name: &str) -> Result<Arc<Instance>> {
        let program = self
            .program(name)
            .ok_or_else(|| RuntimeError::UnknownProgram(name.to_string()))?;
        if self.len() >= self.config.max_instances {
            return Err(RuntimeError::LimitReached(self.config.max_instances));
        }
        Ok(Arc::new(Instance::instantiate(program, &self.libraries)?))
    }

    fn push(&self, instance: Arc<Instance>) -> Result<InstanceId> {
        let mut instances = write(&self.instances);
        if instances.len() >= self.config.max_instances {
            return Err(RuntimeError::LimitReached(self.config.max_instances));
        }
        let id = instances.len();
        info!(instance = id, program = %instance.program_name(), "created instance");
        instances.push(instance);
        Ok(id)
    }

    /// Point `tag` at instance `id`, replacing any earlier binding.
    ///
    /// # Errors
    ///
    /// Returns `UnknownInstance` if `id` is not registered.
    pub fn bind(&self, tag: Tag, id: InstanceId) -> Result<()> {
        if id >= self.len() {
            return Err(RuntimeError::UnknownInstance(id));
        }
        match write(&self.tags).insert(tag, id) {
            Some(previous) if previous != id => {
                info!(tag, instance = id, previous, "rebound tag");
            }
            _ => info!(tag, instance = id, "bound tag"),
        }
        Ok(())
    }

    /// Every binding, ordered by tag.
    pub fn tags(&self) -> Vec<(Tag, InstanceId)> {
        read(&self.tags).iter().map(|(t, i)| (*t, *i)).collect()
    }

    /// The instance `tag` points at.
    pub fn resolve(&self, tag: Tag) -> Option<InstanceId> {
        read(&self.tags).get(&tag).copied()
    }

    /// For every tagged instance, its smallest tag.
    pub fn tag_index(&self) -> BTreeMap<InstanceId, Tag> {
        let mut index = BTreeMap::new();
        for (tag, id) in read(&self.tags).iter() {
            index.entry(*id).or_insert(*tag);
        }
        index
    }

    pub fn instance(&self, id: InstanceId) -> Option<Arc<Instance>> {
        read(&self.instances).get(id).cloned()
    }

    /// A copy of the instance list. Ids are positions in it.
    pub fn instances(&self) -> Vec<Arc<Instance>> {
        read(&self.instances).clone()
    }

    pub fn len(&self) -> usize {
        read(&self.instances).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a tap to instance `id`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownInstance` if `id` is not registered.
    pub fn tap(&self, id: InstanceId, entity_id: impl Into<String>) -> Result<()> {
        let instance = self
            .instance(id)
            .ok_or(RuntimeError::UnknownInstance(id))?;
        instance.tap(entity_id);
        Ok(())
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Replace the published snapshot.
    pub fn publish(&self, snapshot: Snapshot) {
        self.snapshot.store(Arc::new(snapshot));
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
