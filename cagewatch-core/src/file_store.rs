//! A farm data directory on disk, served as an event source.
//!
//! Layout:
//!
//! ```text
//! <root>/units/*.yaml    UnitFile wrappers, any number of units per file
//! <root>/events/*.yaml   one EventLogFile per unit
//! ```
//!
//! Everything is read into memory on open. A unit whose event log cannot be read is
//! still listed, but fetching its events fails and appends to it are refused until the
//! file is fixed. Appends write the unit's whole log file first and only then reach
//! memory.

use crate::{
    error::MetricsError,
    store::{ensure_same_unit, EventSink, EventSource, InMemoryStore, NewEvent},
};
use cagewatch_schemas::{
    events::UnitEvents,
    file_formats::{EventLogFile, UnitFile},
    unit::ProductionUnit,
};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

pub const UNITS_DIR: &str = "units";
pub const EVENTS_DIR: &str = "events";

/// YAML files directly inside `dir_path`, in name order.
fn yaml_files_in(dir_path: &Path) -> Result<Vec<PathBuf>, MetricsError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir_path).map_err(|e| MetricsError::FileIO(dir_path.display().to_string(), e))? {
        let path = entry
            .map_err(|e| MetricsError::FileIO(dir_path.display().to_string(), e))?
            .path();
        if path.is_file() && path.extension().map_or(false, |s| s == "yaml" || s == "yml") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Reads every YAML file in a directory and flattens the items each one holds.
///
/// Files are visited in name order so that later files win on duplicate keys
/// deterministically.
pub fn load_yaml_files<F, T, E>(dir_path: &Path, extract_vec: E) -> Result<Vec<(PathBuf, T)>, MetricsError>
where
    F: DeserializeOwned,
    E: Fn(F) -> Vec<T>,
{
    let mut items = Vec::new();
    for path in yaml_files_in(dir_path)? {
        let content = fs::read_to_string(&path).map_err(|e| MetricsError::FileIO(path.display().to_string(), e))?;
        let file_wrapper: F =
            serde_yaml::from_str(&content).map_err(|e| MetricsError::YamlParsing(path.display().to_string(), e))?;
        for item in extract_vec(file_wrapper) {
            items.push((path.clone(), item));
        }
    }
    Ok(items)
}

/// Reads one event log. The owning unit is taken from the file's `unit_id` when the
/// YAML is well formed enough to hold one, otherwise from the file name.
fn read_event_log(path: &Path) -> (Option<String>, Result<EventLogFile, MetricsError>) {
    let stem = path.file_stem().and_then(|s| s.to_str()).map(str::to_string);
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => return (stem, Err(MetricsError::FileIO(path.display().to_string(), e))),
    };
    let value: serde_yaml::Value = match serde_yaml::from_str(&content) {
        Ok(value) => value,
        Err(e) => return (stem, Err(MetricsError::YamlParsing(path.display().to_string(), e))),
    };
    let owner = value
        .get("unit_id")
        .and_then(serde_yaml::Value::as_str)
        .map(str::to_string)
        .or(stem);
    let log = serde_yaml::from_value(value).map_err(|e| MetricsError::YamlParsing(path.display().to_string(), e));
    (owner, log)
}

pub struct DirectoryStore {
    root: PathBuf,
    memory: InMemoryStore,
    log_paths: DashMap<String, PathBuf>,
    /// Units whose event log could not be loaded, with the reason.
    failed: DashMap<String, String>,
}

impl DirectoryStore {
    /// Fails only when the unit definitions cannot be read. A bad event log affects
    /// its own unit.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, MetricsError> {
        let root = root.as_ref().to_path_buf();
        log::info!("Loading farm data from '{}'", root.display());

        let mut units: HashMap<String, ProductionUnit> = HashMap::new();
        for (path, unit) in load_yaml_files(&root.join(UNITS_DIR), |file: UnitFile| file.units)? {
            if units.contains_key(&unit.id) {
                log::warn!("Unit '{}' redefined in '{}'", unit.id, path.display());
            }
            units.insert(unit.id.clone(), unit);
        }

        let events_dir = root.join(EVENTS_DIR);
        let log_files = if events_dir.is_dir() {
            yaml_files_in(&events_dir)?
        } else {
            Vec::new()
        };

        let memory = InMemoryStore::new();
        let log_paths = DashMap::new();
        let failed = DashMap::new();
        let mut events_by_unit: HashMap<String, UnitEvents> = HashMap::new();
        for path in log_files {
            let (owner, parsed) = read_event_log(&path);
            let Some(unit_id) = owner.filter(|id| units.contains_key(id)) else {
                match parsed {
                    Ok(file) => log::warn!("Ignoring event log '{}' for unknown unit '{}'", path.display(), file.unit_id),
                    Err(err) => log::warn!("Ignoring unreadable event log: {}", err),
                }
                continue;
            };

            if let Some(first) = log_paths.insert(unit_id.clone(), path.clone()) {
                let reason = format!(
                    "log split across '{}' and '{}'",
                    first.display(),
                    path.display()
                );
                log::error!("Unit '{}': {}", unit_id, reason);
                failed.insert(unit_id.clone(), reason);
                continue;
            }
            match parsed {
                Ok(file) => {
                    events_by_unit.insert(unit_id, file.into_events());
                }
                Err(err) => {
                    log::error!("Unit '{}': {}", unit_id, err);
                    failed.insert(unit_id, err.to_string());
                }
            }
        }

        for (id, unit) in units {
            let events = if failed.contains_key(&id) {
                UnitEvents::default()
            } else {
                events_by_unit.remove(&id).unwrap_or_default()
            };
            memory.insert_unit(unit, events);
        }

        log::info!(
            "Loaded {} production unit(s), {} with unreadable logs",
            memory.len(),
            failed.len()
        );
        Ok(Self {
            root,
            memory,
            log_paths,
            failed,
        })
    }

    /// The file a unit's events are written to.
    pub fn log_path(&self, unit_id: &str) -> PathBuf {
        self.log_paths
            .get(unit_id)
            .map(|p| p.value().clone())
            .unwrap_or_else(|| self.root.join(EVENTS_DIR).join(format!("{unit_id}.yaml")))
    }

    /// Ids of units whose event log failed to load, sorted.
    pub fn unavailable_units(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.failed.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    fn check_available(&self, unit_id: &str) -> Result<(), MetricsError> {
        match self.failed.get(unit_id) {
            Some(reason) => Err(MetricsError::LogUnavailable(unit_id.to_string(), reason.value().clone())),
            None => Ok(()),
        }
    }

    fn write_log(path: &Path, unit_id: &str, events: UnitEvents) -> Result<(), MetricsError> {
        let content = serde_yaml::to_string(&EventLogFile::from_events(unit_id, events))
            .map_err(|e| MetricsError::YamlWriting(path.display().to_string(), e))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| MetricsError::FileIO(parent.display().to_string(), e))?;
        }
        fs::write(path, content).map_err(|e| MetricsError::FileIO(path.display().to_string(), e))
    }
}

impl EventSource for DirectoryStore {
    fn unit_ids(&self) -> Vec<String> {
        self.memory.unit_ids()
    }

    fn fetch_unit(&self, unit_id: &str) -> Result<ProductionUnit, MetricsError> {
        self.memory.fetch_unit(unit_id)
    }

    fn fetch_events_for_unit(&self, unit_id: &str) -> Result<UnitEvents, MetricsError> {
        self.check_available(unit_id)?;
        self.memory.fetch_events_for_unit(unit_id)
    }
}

impl EventSink for DirectoryStore {
    fn append_with<F>(&self, unit_id: &str, build: F) -> Result<NewEvent, MetricsError>
    where
        F: FnOnce(&ProductionUnit, &UnitEvents) -> Result<NewEvent, MetricsError>,
    {
        let unit = self.memory.fetch_unit(unit_id)?;
        self.check_available(unit_id)?;
        let default_path = self.log_path(unit_id);
        // Holding the entry serialises appends for this unit, so memory cannot change
        // between the read below and the final append.
        let entry = self.log_paths.entry(unit_id.to_string()).or_insert(default_path);

        let mut events = self.memory.fetch_events_for_unit(unit_id)?;
        let event = build(&unit, &events)?;
        ensure_same_unit(unit_id, &event)?;
        event.clone().apply_to(&mut events);
        Self::write_log(entry.value(), unit_id, events)?;

        self.memory.append(event.clone())?;
        Ok(event)
    }
}
