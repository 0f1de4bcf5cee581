//! Persistence of user column specs and the manager tying them to a
//! registry.
//!
//! [`SpecStore`] keeps a list of [`ColumnSpec`] mappings in one file, JSON or
//! YAML depending on the extension. Loading never fails on content: broken
//! entries are skipped with a warning so one bad column cannot lose the
//! others. Only I/O errors and an unparseable file surface as errors.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, warn};
use serde_json::Value;

use crate::column::Column;
use crate::error::Result;
use crate::registry::ColumnRegistry;
use crate::script::ScriptEvaluator;
use crate::script_provider::ScriptCacheConfig;
use crate::spec::ColumnSpec;

/// File format of a [`SpecStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
    Json,
    Yaml,
}

impl StoreFormat {
    /// `.yaml` and `.yml` are YAML, anything else JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                StoreFormat::Yaml
            }
            _ => StoreFormat::Json,
        }
    }
}

/// File-backed list of column specs.
#[derive(Debug, Clone)]
pub struct SpecStore {
    path: PathBuf,
    format: StoreFormat,
}

impl SpecStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = StoreFormat::from_path(&path);
        SpecStore { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> StoreFormat {
        self.format
    }

    /// Loads all valid specs. A missing or empty file holds no specs.
    pub fn load(&self) -> Result<Vec<ColumnSpec>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let document: Value = match self.format {
            StoreFormat::Json => serde_json::from_str(&content)?,
            StoreFormat::Yaml => serde_yaml::from_str(&content)?,
        };
        let Value::Array(entries) = document else {
            warn!(
                "{}: expected a list of column specs, treating as empty",
                self.path.display()
            );
            return Ok(Vec::new());
        };
        Ok(entries
            .into_iter()
            .enumerate()
            .filter_map(|(position, entry)| self.parse_entry(position, entry))
            .collect())
    }

    fn parse_entry(&self, position: usize, entry: Value) -> Option<ColumnSpec> {
        let Some(mapping) = entry.as_object() else {
            warn!("{}: entry {} is not a mapping, skipped", self.path.display(), position);
            return None;
        };
        for required in ["key", "expression"] {
            let present = mapping
                .get(required)
                .and_then(Value::as_str)
                .is_some_and(|value| !value.trim().is_empty());
            if !present {
                warn!(
                    "{}: entry {} has no usable '{}', skipped",
                    self.path.display(),
                    position,
                    required
                );
                return None;
            }
        }
        match ColumnSpec::from_value(entry) {
            Ok(spec) => Some(spec),
            Err(err) => {
                warn!("{}: entry {} skipped: {}", self.path.display(), position, err);
                None
            }
        }
    }

    /// Replaces the stored list.
    ///
    /// Specs sharing a key are collapsed to the last one, placed where that
    /// last occurrence was.
    pub fn save<'a, I>(&self, specs: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a ColumnSpec>,
    {
        let all: Vec<&ColumnSpec> = specs.into_iter().collect();
        let mut seen = HashSet::new();
        let mut deduped: Vec<&ColumnSpec> = all
            .into_iter()
            .rev()
            .filter(|spec| seen.insert(spec.key.clone()))
            .collect();
        deduped.reverse();

        let content = match self.format {
            StoreFormat::Json => serde_json::to_string_pretty(&deduped)?,
            StoreFormat::Yaml => serde_yaml::to_string(&deduped)?,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, content)?;
        debug!("saved {} column specs to {}", deduped.len(), self.path.display());
        Ok(())
    }

    /// Stores `spec`, replacing a stored spec with the same key in place.
    pub fn add_or_update(&self, spec: &ColumnSpec) -> Result<()> {
        let mut specs = self.load()?;
        match specs.iter_mut().find(|stored| stored.key == spec.key) {
            Some(stored) => *stored = spec.clone(),
            None => specs.push(spec.clone()),
        }
        self.save(&specs)
    }

    /// Deletes the spec stored under `key`. Returns whether anything changed.
    pub fn delete_by_key(&self, key: &str) -> Result<bool> {
        let specs = self.load()?;
        let kept: Vec<ColumnSpec> = specs.iter().filter(|spec| spec.key != key).cloned().collect();
        if kept.len() == specs.len() {
            return Ok(false);
        }
        self.save(&kept)?;
        Ok(true)
    }

    pub fn get_by_key(&self, key: &str) -> Result<Option<ColumnSpec>> {
        Ok(self.load()?.into_iter().find(|spec| spec.key == key))
    }
}

/// Keeps stored specs and registered columns in step.
pub struct ColumnManager {
    store: SpecStore,
    registry: ColumnRegistry,
    evaluator: Rc<dyn ScriptEvaluator>,
    config: ScriptCacheConfig,
    loaded: bool,
}

impl ColumnManager {
    pub fn new(store: SpecStore, registry: ColumnRegistry, evaluator: Rc<dyn ScriptEvaluator>) -> Self {
        Self::with_config(store, registry, evaluator, ScriptCacheConfig::default())
    }

    /// Like [`ColumnManager::new`], building script columns with `config`.
    pub fn with_config(
        store: SpecStore,
        registry: ColumnRegistry,
        evaluator: Rc<dyn ScriptEvaluator>,
        config: ScriptCacheConfig,
    ) -> Self {
        ColumnManager {
            store,
            registry,
            evaluator,
            config,
            loaded: false,
        }
    }

    pub fn store(&self) -> &SpecStore {
        &self.store
    }

    pub fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ColumnRegistry {
        &mut self.registry
    }

    /// Consumes the manager, returning its registry.
    pub fn into_registry(self) -> ColumnRegistry {
        self.registry
    }

    fn register(&mut self, spec: &ColumnSpec) -> Result<Rc<Column>> {
        let column = spec.build_column_with(Rc::clone(&self.evaluator), self.config)?;
        self.registry.register(column, &spec.views())
    }

    /// Persists `spec` and registers its column into the views it names.
    pub fn add_column(&mut self, spec: &ColumnSpec) -> Result<Rc<Column>> {
        self.store.add_or_update(spec)?;
        self.register(spec)
    }

    /// Unregisters the column and deletes its spec. Returns whether a stored
    /// spec was deleted.
    pub fn remove_column(&mut self, key: &str) -> Result<bool> {
        self.registry.unregister(key);
        self.store.delete_by_key(key)
    }

    /// Registers every stored spec. Only the first successful call does
    /// anything; it returns the number of columns registered.
    ///
    /// Specs that fail to build or register are skipped with a warning.
    pub fn load_persisted(&mut self) -> Result<usize> {
        if self.loaded {
            return Ok(0);
        }
        let specs = self.store.load()?;
        let mut registered = 0;
        for spec in &specs {
            match self.register(spec) {
                Ok(_) => registered += 1,
                Err(err) => warn!("column '{}' not registered: {}", spec.key, err),
            }
        }
        self.loaded = true;
        debug!("registered {} of {} stored columns", registered, specs.len());
        Ok(registered)
    }
}
