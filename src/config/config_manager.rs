//! Layered key/value configuration with named documents on disk.
//!
//! Every key lives in one of three scopes (`System`, `Application`, `User`)
//! plus an in-memory dynamic overlay that wins over all of them. Inside a
//! scope each key is owned by a named document (`game`, `system`, ...), which
//! is what `load_config`/`save_config` read and write.
//!
//! Lock order is `lifecycle` → `write_gate` → `store` → `listeners`. Listeners
//! run with `lifecycle` (shared) and `write_gate` held but never `store`, so a
//! listener may read or write the manager again. A listener must not call
//! [`ConfigManager::shutdown`] or [`ConfigManager::initialize`].

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs,
    io::{self, Write},
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
    time::Instant,
};

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use sha2::{Digest, Sha256};

use crate::config::{
    config_error::ConfigError,
    config_event::{ConfigChangeEvent, ConfigListener, ListenerId},
    config_item::ConfigItem,
    config_scope::ConfigScope,
    config_stats::{ConfigStats, LoadTimer},
    config_value::{ConfigMap, ConfigType, ConfigValue},
    entity::EntityKind,
    format::{self, ConfigFormat, PROBE_EXTENSIONS},
    game_config::{GameConfig, SystemConfig},
    hot_reload::{self, HotReload},
    seal,
};
use crate::log::logger::Logger;
use crate::{logger_debug, logger_error, logger_info, logger_warn};

/// Shown by [`ConfigManager::dump_config`] in place of encrypted items.
pub const MASK: &str = "******";

struct Entry {
    value: ConfigValue,
    owner: String,
}

#[derive(Default)]
struct DocState {
    /// Scope the document was loaded into or first written to.
    home: Option<ConfigScope>,
    path: Option<PathBuf>,
    loaded: bool,
    modified: bool,
    password: Option<String>,
}

#[derive(Default)]
struct Store {
    initialized: bool,
    root: PathBuf,
    scopes: [HashMap<String, Entry>; 3],
    dynamic: HashMap<String, ConfigValue>,
    documents: HashMap<String, DocState>,
    schemas: HashMap<String, Vec<ConfigItem>>,
    strict: bool,
    timer: LoadTimer,
}

impl Store {
    fn require_init(&self) -> Result<(), ConfigError> {
        if self.initialized {
            Ok(())
        } else {
            Err(ConfigError::NotInitialized)
        }
    }

    fn resolve(&self, key: &str) -> Option<ConfigValue> {
        if let Some(v) = self.dynamic.get(key) {
            return Some(v.clone());
        }
        ConfigScope::RESOLUTION_ORDER
            .iter()
            .find_map(|s| self.scopes[s.index()].get(key))
            .map(|e| e.value.clone())
    }

    fn contains(&self, key: &str) -> bool {
        self.dynamic.contains_key(key) || self.scopes.iter().any(|s| s.contains_key(key))
    }

    fn document(&mut self, name: &str) -> &mut DocState {
        self.documents.entry(name.to_string()).or_default()
    }

    /// Runs `mutate` and reports every key of `keys` whose effective value
    /// changed.
    fn tracked(
        &mut self,
        keys: Vec<String>,
        scope: Option<ConfigScope>,
        mutate: impl FnOnce(&mut Store),
    ) -> Vec<ConfigChangeEvent> {
        let before: Vec<Option<ConfigValue>> = keys.iter().map(|k| self.resolve(k)).collect();
        mutate(self);
        keys.iter()
            .zip(before)
            .filter_map(|(key, old)| {
                let new = self.resolve(key);
                (old != new).then(|| ConfigChangeEvent::new(key, old, new, scope))
            })
            .collect()
    }

    fn find_item(&self, key: &str) -> Option<&ConfigItem> {
        self.schemas
            .values()
            .flat_map(|items| items.iter())
            .find(|item| item.key == key)
    }

    /// Schema checks applied to incoming values when strict mode is on.
    fn check_incoming<'a>(
        &self,
        entries: impl IntoIterator<Item = (&'a String, &'a ConfigValue)>,
    ) -> Result<(), ConfigError> {
        if !self.strict {
            return Ok(());
        }
        let mut problems = Vec::new();
        for (key, value) in entries {
            let item = self
                .find_item(key)
                .ok_or_else(|| ConfigError::UnknownKey(key.clone()))?;
            if let Err(reason) = item.check(value) {
                problems.push(format!("{key}: {reason}"));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }

    fn write(
        &mut self,
        key: &str,
        value: ConfigValue,
        scope: ConfigScope,
        owner: Option<&str>,
    ) -> Vec<ConfigChangeEvent> {
        let slot = &self.scopes[scope.index()];
        let owner = owner
            .map(str::to_string)
            .or_else(|| slot.get(key).map(|e| e.owner.clone()))
            .unwrap_or_else(|| scope.default_document().to_string());
        if slot.get(key).is_some_and(|e| e.value == value && e.owner == owner) {
            return Vec::new();
        }
        let doc = self.document(&owner);
        doc.modified = true;
        doc.home.get_or_insert(scope);
        self.tracked(vec![key.to_string()], Some(scope), |s| {
            s.scopes[scope.index()].insert(key.to_string(), Entry { value, owner });
        })
    }

    fn document_keys(&self, name: &str, scope: ConfigScope) -> impl Iterator<Item = &String> {
        self.scopes[scope.index()]
            .iter()
            .filter(move |(_, e)| e.owner == name)
            .map(|(k, _)| k)
    }

    fn document_entries(&self, name: &str, scope: ConfigScope) -> ConfigMap {
        self.scopes[scope.index()]
            .iter()
            .filter(|(_, e)| e.owner == name)
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect()
    }

    /// The document's entries across all scopes, higher scopes winning.
    fn document_view(&self, name: &str) -> ConfigMap {
        let mut out = ConfigMap::new();
        for scope in ConfigScope::ALL {
            out.extend(self.document_entries(name, scope));
        }
        out
    }

    fn replace_document(
        &mut self,
        name: &str,
        scope: ConfigScope,
        map: ConfigMap,
    ) -> Vec<ConfigChangeEvent> {
        let keys: BTreeSet<String> = self
            .document_keys(name, scope)
            .cloned()
            .chain(map.keys().cloned())
            .collect();
        self.tracked(keys.into_iter().collect(), Some(scope), |s| {
            let slot = &mut s.scopes[scope.index()];
            slot.retain(|_, e| e.owner != name);
            for (key, value) in map {
                slot.insert(
                    key,
                    Entry {
                        value,
                        owner: name.to_string(),
                    },
                );
            }
        })
    }

    fn home_scope(&self, name: &str) -> ConfigScope {
        self.documents
            .get(name)
            .and_then(|d| d.home)
            .unwrap_or(ConfigScope::Application)
    }

    fn path_for(&self, name: &str) -> PathBuf {
        if let Some(path) = self.documents.get(name).and_then(|d| d.path.clone()) {
            return path;
        }
        if ConfigFormat::has_known_extension(name) {
            return self.root.join(name);
        }
        PROBE_EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{name}.{ext}")))
            .find(|p| p.is_file())
            .unwrap_or_else(|| self.root.join(format!("{name}.cfg")))
    }

    fn password(&self, name: &str) -> Option<String> {
        self.documents.get(name).and_then(|d| d.password.clone())
    }

    fn seed(&mut self, owner: &str, entries: Vec<(&'static str, ConfigValue)>) {
        let slot = &mut self.scopes[ConfigScope::System.index()];
        for (key, value) in entries {
            slot.insert(
                key.to_string(),
                Entry {
                    value,
                    owner: owner.to_string(),
                },
            );
        }
    }
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    by_key: HashMap<String, Vec<(ListenerId, ConfigListener)>>,
}

struct Inner {
    lifecycle: RwLock<()>,
    write_gate: ReentrantMutex<()>,
    store: Mutex<Store>,
    listeners: Mutex<Listeners>,
    watcher: Mutex<Option<HotReload>>,
    logger: RwLock<Logger>,
}

/// Handle to a config store. Clones share the same store.
#[derive(Clone)]
pub struct ConfigManager {
    inner: Arc<Inner>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                lifecycle: RwLock::new(()),
                write_gate: ReentrantMutex::new(()),
                store: Mutex::new(Store::default()),
                listeners: Mutex::new(Listeners::default()),
                watcher: Mutex::new(None),
                logger: RwLock::new(Logger::global().clone()),
            }),
        }
    }

    /// Process-wide manager.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<ConfigManager> = OnceLock::new();
        GLOBAL.get_or_init(ConfigManager::new)
    }

    /// Routes this manager's diagnostics to `logger`.
    #[must_use]
    pub fn with_logger(self, logger: Logger) -> Self {
        self.set_logger(logger);
        self
    }

    pub fn set_logger(&self, logger: Logger) {
        *self.inner.logger.write() = logger;
    }

    fn logger(&self) -> Logger {
        self.inner.logger.read().clone()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Creates `root` and the entity subdirectories, then seeds the `System`
    /// scope with the built-in defaults. Calling it again is a no-op.
    pub fn initialize(&self, root: impl AsRef<Path>) -> Result<(), ConfigError> {
        let root = root.as_ref();
        let _life = self.inner.lifecycle.write();
        let _gate = self.inner.write_gate.lock();
        let mut store = self.inner.store.lock();
        if store.initialized {
            return Ok(());
        }
        fs::create_dir_all(root).map_err(|e| ConfigError::io(root, e))?;
        for kind in EntityKind::ALL {
            let dir = root.join(kind.dir_name());
            fs::create_dir_all(&dir).map_err(|e| ConfigError::io(dir, e))?;
        }
        store.root = root.to_path_buf();
        store.seed("game", GameConfig::default().to_entries());
        store.seed("system", SystemConfig::default().to_entries());
        store.initialized = true;
        drop(store);
        logger_info!(self.logger(), "config initialized at {}", root.display());
        Ok(())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.store.lock().initialized
    }

    #[must_use]
    pub fn root_dir(&self) -> Option<PathBuf> {
        let store = self.inner.store.lock();
        store.initialized.then(|| store.root.clone())
    }

    /// Stops hot reload and clears scopes, documents, schemas and listeners.
    /// Safe on a manager that was never initialized; `initialize` may be
    /// called again afterwards.
    pub fn shutdown(&self) {
        let watcher = self.inner.watcher.lock().take();
        drop(watcher);
        let _life = self.inner.lifecycle.write();
        let _gate = self.inner.write_gate.lock();
        let was_initialized = {
            let mut store = self.inner.store.lock();
            std::mem::take(&mut *store).initialized
        };
        *self.inner.listeners.lock() = Listeners::default();
        if was_initialized {
            logger_info!(self.logger(), "config shut down");
        }
    }

    // ------------------------------------------------------------------
    // Write path
    // ------------------------------------------------------------------

    /// Applies `f` under the store lock, then delivers the returned events.
    fn commit<R>(
        &self,
        f: impl FnOnce(&mut Store) -> Result<(R, Vec<ConfigChangeEvent>), ConfigError>,
    ) -> Result<R, ConfigError> {
        let _life = self.inner.lifecycle.read_recursive();
        let _gate = self.inner.write_gate.lock();
        let (out, events) = {
            let mut store = self.inner.store.lock();
            f(&mut store)?
        };
        self.notify(&events);
        Ok(out)
    }

    fn notify(&self, events: &[ConfigChangeEvent]) {
        for event in events {
            let targets: Vec<ConfigListener> = self
                .inner
                .listeners
                .lock()
                .by_key
                .get(&event.key)
                .map(|v| v.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default();
            for listener in targets {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                    let reason = payload
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "listener panicked".to_string());
                    logger_error!(
                        self.logger(),
                        "config listener for `{}` failed: {}",
                        event.key,
                        reason
                    );
                }
            }
        }
    }

    /// Drops the listeners of every key in `keys` that no longer exists.
    fn forget_absent(&self, keys: &[String]) {
        let absent: Vec<&String> = {
            let store = self.inner.store.lock();
            keys.iter().filter(|k| !store.contains(k)).collect()
        };
        if absent.is_empty() {
            return;
        }
        let mut listeners = self.inner.listeners.lock();
        for key in absent {
            listeners.by_key.remove(key);
        }
    }

    fn write_owned(
        &self,
        key: &str,
        value: ConfigValue,
        scope: ConfigScope,
        owner: Option<&str>,
    ) -> Result<(), ConfigError> {
        self.commit(|store| {
            if scope == ConfigScope::System && store.initialized {
                return Err(ConfigError::ReadOnlyScope(scope));
            }
            store.check_incoming([(&key.to_string(), &value)])?;
            Ok(((), store.write(key, value, scope, owner)))
        })
    }

    /// Writes `key` in `scope`. Listeners of `key` are notified if its
    /// effective value changed. `System` is read-only once initialized.
    pub fn set_value<T: Into<ConfigValue>>(
        &self,
        key: &str,
        value: T,
        scope: ConfigScope,
    ) -> Result<(), ConfigError> {
        self.write_owned(key, value.into(), scope, None)
    }

    /// Removes `key` from `scope`. Returns whether it was there.
    pub fn remove_key(&self, key: &str, scope: ConfigScope) -> Result<bool, ConfigError> {
        let removed = self.commit(|store| {
            if scope == ConfigScope::System && store.initialized {
                return Err(ConfigError::ReadOnlyScope(scope));
            }
            let Some(owner) = store.scopes[scope.index()].get(key).map(|e| e.owner.clone())
            else {
                return Ok((false, Vec::new()));
            };
            store.document(&owner).modified = true;
            let events = store.tracked(vec![key.to_string()], Some(scope), |s| {
                s.scopes[scope.index()].remove(key);
            });
            Ok((true, events))
        })?;
        if removed {
            self.forget_absent(&[key.to_string()]);
        }
        Ok(removed)
    }

    /// Sets a value in the in-memory overlay, above every scope.
    pub fn set_dynamic_value<T: Into<ConfigValue>>(&self, key: &str, value: T) {
        let value = value.into();
        let _ = self.commit(|store| {
            if store.dynamic.get(key) == Some(&value) {
                return Ok(((), Vec::new()));
            }
            Ok((
                (),
                store.tracked(vec![key.to_string()], None, |s| {
                    s.dynamic.insert(key.to_string(), value);
                }),
            ))
        });
    }

    pub fn remove_dynamic_value(&self, key: &str) -> bool {
        let removed = self
            .commit(|store| {
                if !store.dynamic.contains_key(key) {
                    return Ok((false, Vec::new()));
                }
                let events = store.tracked(vec![key.to_string()], None, |s| {
                    s.dynamic.remove(key);
                });
                Ok((true, events))
            })
            .unwrap_or(false);
        if removed {
            self.forget_absent(&[key.to_string()]);
        }
        removed
    }

    // ------------------------------------------------------------------
    // Read path
    // ------------------------------------------------------------------

    /// Effective value of `key`, if any scope or the overlay has it.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        self.inner.store.lock().resolve(key)
    }

    /// Value of `key` in one scope only.
    #[must_use]
    pub fn get_in_scope(&self, key: &str, scope: ConfigScope) -> Option<ConfigValue> {
        self.inner.store.lock().scopes[scope.index()]
            .get(key)
            .map(|e| e.value.clone())
    }

    /// Effective value of `key` converted to `T`, or `default` when the key is
    /// absent or does not convert.
    pub fn get_value<T: ConfigType>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| T::from_value(&v))
            .unwrap_or(default)
    }

    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.inner.store.lock().contains(key)
    }

    /// Union of the keys of every scope and the overlay, sorted.
    #[must_use]
    pub fn get_all_keys(&self) -> Vec<String> {
        let store = self.inner.store.lock();
        let mut keys: BTreeSet<&String> = store.dynamic.keys().collect();
        for scope in &store.scopes {
            keys.extend(scope.keys());
        }
        keys.into_iter().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Registers `listener` for changes of `key`. Listeners of a key run in
    /// registration order.
    pub fn add_listener<F>(&self, key: &str, listener: F) -> ListenerId
    where
        F: Fn(&ConfigChangeEvent) + Send + Sync + 'static,
    {
        let listener: ConfigListener = Arc::new(listener);
        let mut listeners = self.inner.listeners.lock();
        listeners.next_id += 1;
        let id = ListenerId(listeners.next_id);
        listeners
            .by_key
            .entry(key.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    pub fn remove_listener(&self, key: &str, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let Some(list) = listeners.by_key.get_mut(key) else {
            return false;
        };
        let before = list.len();
        list.retain(|(lid, _)| *lid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.by_key.remove(key);
        }
        removed
    }

    /// Drops every listener of `key`.
    pub fn remove_listeners(&self, key: &str) {
        self.inner.listeners.lock().by_key.remove(key);
    }

    pub fn remove_all_listeners(&self) {
        self.inner.listeners.lock().by_key.clear();
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .by_key
            .values()
            .map(Vec::len)
            .sum()
    }

    // ------------------------------------------------------------------
    // Documents on disk
    // ------------------------------------------------------------------

    /// File backing document `name`.
    pub fn config_path(&self, name: &str) -> Result<PathBuf, ConfigError> {
        let store = self.inner.store.lock();
        store.require_init()?;
        Ok(store.path_for(name))
    }

    /// Reads document `name` and replaces its entries in `scope`. On any
    /// error the store is left as it was.
    pub fn load_config(&self, name: &str, scope: ConfigScope) -> Result<(), ConfigError> {
        let (path, password) = {
            let store = self.inner.store.lock();
            store.require_init()?;
            (store.path_for(name), store.password(name))
        };
        let started = Instant::now();
        let map = read_map(&path, name, password.as_deref())?;
        self.install(name, scope, path, map, started)
    }

    /// Replaces document `name` in `scope` with a freshly read `map` and
    /// binds it to `path`.
    fn install(
        &self,
        name: &str,
        scope: ConfigScope,
        path: PathBuf,
        map: ConfigMap,
        started: Instant,
    ) -> Result<(), ConfigError> {
        let count = map.len();
        let displaced: Vec<String> = self.commit(|store| {
            store.require_init()?;
            store.check_incoming(&map)?;
            let displaced: Vec<String> = store.document_keys(name, scope).cloned().collect();
            let events = store.replace_document(name, scope, map);
            let doc = store.document(name);
            doc.home = Some(scope);
            doc.path = Some(path.clone());
            doc.loaded = true;
            doc.modified = false;
            store.timer.record(started.elapsed());
            Ok((displaced, events))
        })?;
        self.forget_absent(&displaced);
        logger_debug!(
            self.logger(),
            "loaded config `{}` ({} keys) from {}",
            name,
            count,
            path.display()
        );
        Ok(())
    }

    /// Writes the entries `name` owns in `scope` to its file, sealed if a
    /// password is set for it.
    pub fn save_config(&self, name: &str, scope: ConfigScope) -> Result<(), ConfigError> {
        let (path, map, password) = {
            let store = self.inner.store.lock();
            store.require_init()?;
            (
                store.path_for(name),
                store.document_entries(name, scope),
                store.password(name),
            )
        };
        let format = ConfigFormat::detect(&path);
        let mut bytes = format::render(format, &map).map_err(|e| e.into_config_error(&path, format))?;
        if let Some(pw) = password {
            bytes = seal::seal(&bytes, &pw);
        }
        write_atomic(&path, &bytes)?;
        {
            let mut store = self.inner.store.lock();
            let doc = store.document(name);
            doc.path = Some(path.clone());
            doc.modified = false;
            doc.home.get_or_insert(scope);
        }
        logger_debug!(self.logger(), "saved config `{}` to {}", name, path.display());
        Ok(())
    }

    /// Saves every modified document to its home scope. Stops at the first
    /// failure.
    pub fn save_all_configs(&self) -> Result<(), ConfigError> {
        let pending: Vec<(String, ConfigScope)> = {
            let store = self.inner.store.lock();
            store.require_init()?;
            store
                .documents
                .iter()
                .filter(|(_, d)| d.modified)
                .filter_map(|(name, d)| d.home.map(|h| (name.clone(), h)))
                .collect()
        };
        for (name, scope) in pending {
            self.save_config(&name, scope)?;
        }
        Ok(())
    }

    /// Re-reads a loaded document into the scope it was loaded into.
    pub fn reload_config(&self, name: &str) -> Result<(), ConfigError> {
        let scope = {
            let store = self.inner.store.lock();
            store.require_init()?;
            store
                .documents
                .get(name)
                .filter(|d| d.loaded)
                .and_then(|d| d.home)
                .ok_or_else(|| ConfigError::NotFound(name.to_string()))?
        };
        self.load_config(name, scope)
    }

    /// Reloads every loaded document. All documents are attempted; the first
    /// error is returned.
    pub fn reload_all_configs(&self) -> Result<(), ConfigError> {
        let names: Vec<String> = {
            let store = self.inner.store.lock();
            store.require_init()?;
            store
                .documents
                .iter()
                .filter(|(_, d)| d.loaded)
                .map(|(n, _)| n.clone())
                .collect()
        };
        let mut first = None;
        for name in names {
            if let Err(e) = self.reload_config(&name) {
                logger_warn!(self.logger(), "reload of `{}` failed: {}", name, e);
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    #[must_use]
    pub fn is_config_loaded(&self, name: &str) -> bool {
        self.inner
            .store
            .lock()
            .documents
            .get(name)
            .is_some_and(|d| d.loaded)
    }

    /// Whether document `name` has changes not yet saved.
    #[must_use]
    pub fn is_config_modified(&self, name: &str) -> bool {
        self.inner
            .store
            .lock()
            .documents
            .get(name)
            .is_some_and(|d| d.modified)
    }

    // ------------------------------------------------------------------
    // Schema
    // ------------------------------------------------------------------

    pub fn define_config(&self, name: &str, items: Vec<ConfigItem>) {
        let mut store = self.inner.store.lock();
        store.document(name);
        store.schemas.insert(name.to_string(), items);
    }

    #[must_use]
    pub fn get_config_definition(&self, name: &str) -> Option<Vec<ConfigItem>> {
        self.inner.store.lock().schemas.get(name).cloned()
    }

    /// In strict mode, writes and loads of keys no schema defines fail with
    /// [`ConfigError::UnknownKey`], and values breaking their item's rules
    /// fail with [`ConfigError::Validation`].
    pub fn set_strict_schema(&self, strict: bool) {
        self.inner.store.lock().strict = strict;
    }

    #[must_use]
    pub fn is_strict_schema(&self) -> bool {
        self.inner.store.lock().strict
    }

    /// Checks `value` against the schema item for `key`. Keys without an item
    /// pass unless strict mode is on.
    pub fn validate_key(&self, key: &str, value: &ConfigValue) -> Result<(), ConfigError> {
        let store = self.inner.store.lock();
        match store.find_item(key) {
            Some(item) => item
                .check(value)
                .map_err(|reason| ConfigError::Validation(vec![format!("{key}: {reason}")])),
            None if store.strict => Err(ConfigError::UnknownKey(key.to_string())),
            None => Ok(()),
        }
    }

    /// Checks the effective values against the schema of `name`, listing
    /// every offending key.
    pub fn check_config(&self, name: &str) -> Result<(), ConfigError> {
        let store = self.inner.store.lock();
        let Some(items) = store.schemas.get(name) else {
            return Ok(());
        };
        let mut problems = Vec::new();
        for item in items {
            match store.resolve(&item.key) {
                None if item.required => problems.push(format!("{}: required key is missing", item.key)),
                None => {}
                Some(value) => {
                    if let Err(reason) = item.check(&value) {
                        problems.push(format!("{}: {reason}", item.key));
                    }
                }
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }

    #[must_use]
    pub fn validate_config(&self, name: &str) -> bool {
        self.check_config(name).is_ok()
    }

    #[must_use]
    pub fn validate_all_configs(&self) -> bool {
        let names: Vec<String> = self.inner.store.lock().schemas.keys().cloned().collect();
        names.iter().all(|n| self.validate_config(n))
    }

    /// Writes the document as `key=value` lines. Items defined as encrypted
    /// are masked.
    pub fn dump_config(&self, name: &str, out: &mut dyn Write) -> io::Result<()> {
        let lines: Vec<String> = {
            let store = self.inner.store.lock();
            let secret = |key: &str| store.find_item(key).is_some_and(|i| i.encrypted);
            store
                .document_view(name)
                .into_iter()
                .map(|(k, v)| {
                    if secret(&k) {
                        format!("{k}={MASK}")
                    } else {
                        format!("{k}={v}")
                    }
                })
                .collect()
        };
        for line in lines {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sealing
    // ------------------------------------------------------------------

    /// Password used to open and seal document `name` from now on.
    pub fn set_config_password(&self, name: &str, password: &str) {
        self.inner.store.lock().document(name).password = Some(password.to_string());
    }

    /// Sets the document's password and rewrites its file sealed.
    pub fn encrypt_config(&self, name: &str, password: &str) -> Result<(), ConfigError> {
        let scope = {
            let mut store = self.inner.store.lock();
            store.require_init()?;
            store.document(name).password = Some(password.to_string());
            store.home_scope(name)
        };
        self.save_config(name, scope)?;
        logger_info!(self.logger(), "config `{}` encrypted", name);
        Ok(())
    }

    /// Rewrites a sealed file as plain text and forgets the password.
    pub fn decrypt_config(&self, name: &str, password: &str) -> Result<(), ConfigError> {
        let path = self.config_path(name)?;
        let bytes = read_file(&path, name)?;
        if seal::is_sealed(&bytes) {
            let plain =
                seal::open(&bytes, password).ok_or_else(|| ConfigError::Decryption(name.to_string()))?;
            write_atomic(&path, &plain)?;
        }
        if let Some(doc) = self.inner.store.lock().documents.get_mut(name) {
            doc.password = None;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Backup / restore / export / import
    // ------------------------------------------------------------------

    /// Copies the file of `name` to `dest` and writes `dest.sha256` next to
    /// it.
    pub fn backup_config(&self, name: &str, dest: impl AsRef<Path>) -> Result<(), ConfigError> {
        let dest = dest.as_ref();
        let src = self.config_path(name)?;
        let bytes = read_file(&src, name)?;
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }
        write_atomic(dest, &bytes)?;
        write_atomic(&checksum_path(dest), hex::encode(Sha256::digest(&bytes)).as_bytes())?;
        logger_info!(self.logger(), "backed up `{}` to {}", name, dest.display());
        Ok(())
    }

    /// Verifies `src` against its `.sha256` file when there is one, copies it
    /// over the file of `name` and reloads the document. The file of `name`
    /// is only replaced once `src` has parsed and passed the schema.
    pub fn restore_config(&self, name: &str, src: impl AsRef<Path>) -> Result<(), ConfigError> {
        let src = src.as_ref();
        let started = Instant::now();
        let bytes = read_file(src, name)?;
        let sum_path = checksum_path(src);
        if sum_path.is_file() {
            let expected = fs::read_to_string(&sum_path).map_err(|e| ConfigError::io(&sum_path, e))?;
            if !expected.trim().eq_ignore_ascii_case(&hex::encode(Sha256::digest(&bytes))) {
                return Err(ConfigError::ChecksumMismatch(src.to_path_buf()));
            }
        }
        let (path, scope, password) = {
            let store = self.inner.store.lock();
            store.require_init()?;
            (store.path_for(name), store.home_scope(name), store.password(name))
        };
        let map = decode(&path, name, bytes.clone(), password.as_deref())?;
        {
            let store = self.inner.store.lock();
            store.require_init()?;
            store.check_incoming(&map)?;
        }
        write_atomic(&path, &bytes)?;
        self.install(name, scope, path, map, started)?;
        logger_info!(self.logger(), "restored `{}` from {}", name, src.display());
        Ok(())
    }

    /// Writes the document's current entries to `dest` in the format of its
    /// extension. The output is never sealed.
    pub fn export_config(&self, name: &str, dest: impl AsRef<Path>) -> Result<(), ConfigError> {
        let dest = dest.as_ref();
        let map = {
            let store = self.inner.store.lock();
            store.require_init()?;
            store.document_view(name)
        };
        let format = ConfigFormat::detect(dest);
        let bytes = format::render(format, &map).map_err(|e| e.into_config_error(dest, format))?;
        write_atomic(dest, &bytes)
    }

    /// Parses `src` by its extension and replaces document `name` in the
    /// scope it was loaded into (`Application` if never loaded). The document
    /// is marked modified.
    pub fn import_config(&self, name: &str, src: impl AsRef<Path>) -> Result<(), ConfigError> {
        let src = src.as_ref();
        let password = self.inner.store.lock().password(name);
        let map = read_map(src, name, password.as_deref())?;
        let displaced: Vec<String> = self.commit(|store| {
            store.require_init()?;
            store.check_incoming(&map)?;
            let scope = store.home_scope(name);
            let displaced: Vec<String> = store.document_keys(name, scope).cloned().collect();
            let events = store.replace_document(name, scope, map);
            let doc = store.document(name);
            doc.home = Some(scope);
            doc.modified = true;
            Ok((displaced, events))
        })?;
        self.forget_absent(&displaced);
        logger_info!(self.logger(), "imported `{}` from {}", name, src.display());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------

    #[must_use]
    pub fn get_stats(&self) -> ConfigStats {
        let listeners_count = self.listener_count();
        let store = self.inner.store.lock();
        ConfigStats {
            total_configs: store.documents.len(),
            loaded_configs: store.documents.values().filter(|d| d.loaded).count(),
            modified_configs: store.documents.values().filter(|d| d.modified).count(),
            listeners_count,
            last_reload_time: store.timer.last_reload,
            average_load_time: store.timer.average(),
        }
    }

    pub fn reset_stats(&self) {
        self.inner.store.lock().timer = LoadTimer::default();
    }

    // ------------------------------------------------------------------
    // Scoped helpers and aggregates
    // ------------------------------------------------------------------

    pub fn get_game_value<T: ConfigType>(&self, key: &str, default: T) -> T {
        self.get_value(key, default)
    }

    pub fn set_game_value<T: Into<ConfigValue>>(&self, key: &str, value: T) -> Result<(), ConfigError> {
        self.write_owned(key, value.into(), ConfigScope::Application, Some("game"))
    }

    pub fn get_user_value<T: ConfigType>(&self, key: &str, default: T) -> T {
        self.get_in_scope(key, ConfigScope::User)
            .and_then(|v| T::from_value(&v))
            .unwrap_or(default)
    }

    pub fn set_user_value<T: Into<ConfigValue>>(&self, key: &str, value: T) -> Result<(), ConfigError> {
        self.write_owned(key, value.into(), ConfigScope::User, Some("user"))
    }

    pub fn get_system_value<T: ConfigType>(&self, key: &str, default: T) -> T {
        self.get_value(key, default)
    }

    /// Overrides a system setting. The write lands in `Application` under
    /// document `system`, since `System` itself is read-only.
    pub fn set_system_value<T: Into<ConfigValue>>(&self, key: &str, value: T) -> Result<(), ConfigError> {
        self.write_owned(key, value.into(), ConfigScope::Application, Some("system"))
    }

    #[must_use]
    pub fn get_game_config(&self) -> GameConfig {
        let store = self.inner.store.lock();
        GameConfig::from_lookup(|k| store.resolve(k))
    }

    pub fn set_game_config(&self, config: &GameConfig) -> Result<(), ConfigError> {
        self.write_aggregate("game", config.to_entries())
    }

    #[must_use]
    pub fn get_system_config(&self) -> SystemConfig {
        let store = self.inner.store.lock();
        SystemConfig::from_lookup(|k| store.resolve(k))
    }

    pub fn set_system_config(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        self.write_aggregate("system", config.to_entries())
    }

    fn write_aggregate(
        &self,
        owner: &str,
        entries: Vec<(&'static str, ConfigValue)>,
    ) -> Result<(), ConfigError> {
        self.commit(|store| {
            let incoming: BTreeMap<String, ConfigValue> = entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();
            store.check_incoming(&incoming)?;
            let mut events = Vec::new();
            for (key, value) in incoming {
                events.extend(store.write(&key, value, ConfigScope::Application, Some(owner)));
            }
            Ok(((), events))
        })
    }

    // ------------------------------------------------------------------
    // Entity configs
    // ------------------------------------------------------------------

    /// `{root}/{kind dir}/{id}.cfg`; an id with a known extension keeps it and
    /// an empty id maps to `default.cfg`.
    pub fn entity_config_path(&self, kind: EntityKind, id: &str) -> Result<PathBuf, ConfigError> {
        let store = self.inner.store.lock();
        store.require_init()?;
        let dir = store.root.join(kind.dir_name());
        Ok(if id.is_empty() {
            dir.join("default.cfg")
        } else if ConfigFormat::has_known_extension(id) {
            dir.join(id)
        } else {
            dir.join(format!("{id}.cfg"))
        })
    }

    pub fn load_entity_config(&self, kind: EntityKind, id: &str) -> Result<ConfigMap, ConfigError> {
        let path = self.entity_config_path(kind, id)?;
        read_map(&path, &format!("{kind}/{id}"), None)
    }

    pub fn save_entity_config(
        &self,
        kind: EntityKind,
        id: &str,
        config: &ConfigMap,
    ) -> Result<(), ConfigError> {
        let path = self.entity_config_path(kind, id)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| ConfigError::io(dir, e))?;
        }
        let format = ConfigFormat::detect(&path);
        let bytes = format::render(format, config).map_err(|e| e.into_config_error(&path, format))?;
        write_atomic(&path, &bytes)
    }

    // ------------------------------------------------------------------
    // Hot reload
    // ------------------------------------------------------------------

    /// Watches the root directory and reloads loaded documents whose file
    /// changes. Disabling tears the watcher down.
    pub fn enable_hot_reload(&self, enable: bool) -> Result<(), ConfigError> {
        let mut slot = self.inner.watcher.lock();
        if !enable {
            if slot.take().is_some() {
                logger_info!(self.logger(), "config hot reload disabled");
            }
            return Ok(());
        }
        if slot.is_some() {
            return Ok(());
        }
        let root = {
            let store = self.inner.store.lock();
            store.require_init()?;
            store.root.clone()
        };
        let weak = Arc::downgrade(&self.inner);
        let watch = HotReload::start(&root, move |paths| {
            if let Some(inner) = weak.upgrade() {
                ConfigManager { inner }.reload_changed(paths);
            }
        })?;
        logger_info!(self.logger(), "config hot reload watching {}", watch.root().display());
        *slot = Some(watch);
        Ok(())
    }

    #[must_use]
    pub fn is_hot_reload_enabled(&self) -> bool {
        self.inner.watcher.lock().is_some()
    }

    fn reload_changed(&self, paths: &[PathBuf]) {
        let names: Vec<String> = {
            let store = self.inner.store.lock();
            store
                .documents
                .iter()
                .filter(|(_, d)| d.loaded)
                .filter(|(_, d)| {
                    d.path
                        .as_deref()
                        .is_some_and(|bound| paths.iter().any(|p| hot_reload::same_file(p, bound)))
                })
                .map(|(n, _)| n.clone())
                .collect()
        };
        for name in names {
            match self.reload_config(&name) {
                Ok(()) => logger_debug!(self.logger(), "hot reloaded `{}`", name),
                Err(e) => logger_warn!(self.logger(), "hot reload of `{}` failed: {}", name, e),
            }
        }
    }
}

fn read_file(path: &Path, name: &str) -> Result<Vec<u8>, ConfigError> {
    fs::read(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound(name.to_string())
        } else {
            ConfigError::io(path, e)
        }
    })
}

fn read_map(path: &Path, name: &str, password: Option<&str>) -> Result<ConfigMap, ConfigError> {
    decode(path, name, read_file(path, name)?, password)
}

/// Parses `bytes` as the contents of `path`, opening them first if sealed.
fn decode(
    path: &Path,
    name: &str,
    mut bytes: Vec<u8>,
    password: Option<&str>,
) -> Result<ConfigMap, ConfigError> {
    if seal::is_sealed(&bytes) {
        let pw = password.ok_or_else(|| ConfigError::Encrypted(name.to_string()))?;
        bytes = seal::open(&bytes, pw).ok_or_else(|| ConfigError::Decryption(name.to_string()))?;
    }
    let format = ConfigFormat::detect(path);
    format::parse(format, &bytes).map_err(|e| e.into_config_error(path, format))
}

/// Writes `bytes` next to `path` and renames it into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ConfigError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut f = fs::File::create(&tmp).map_err(|e| ConfigError::io(&tmp, e))?;
        f.write_all(bytes).map_err(|e| ConfigError::io(&tmp, e))?;
        f.sync_all().map_err(|e| ConfigError::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| ConfigError::io(path, e))
}

fn checksum_path(path: &Path) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".sha256");
    PathBuf::from(p)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manager() -> (tempfile::TempDir, ConfigManager) {
        let dir = tempfile::tempdir().unwrap();
        let cm = ConfigManager::new().with_logger(Logger::new());
        cm.initialize(dir.path()).unwrap();
        (dir, cm)
    }

    #[test]
    fn initialize_creates_layout_and_seeds_defaults() {
        let (dir, cm) = manager();
        for kind in EntityKind::ALL {
            assert!(dir.path().join(kind.dir_name()).is_dir());
        }
        assert_eq!(cm.get_value("language", String::new()), "zh_CN");
        assert_eq!(cm.get_value("autoSaveInterval", 0i64), 300);
        assert_eq!(cm.get_game_config(), GameConfig::default());
        cm.initialize(dir.path()).unwrap();
        assert!(cm.is_initialized());
    }

    #[test]
    fn system_scope_is_read_only_after_init() {
        let (_dir, cm) = manager();
        assert!(matches!(
            cm.set_value("x", 1, ConfigScope::System),
            Err(ConfigError::ReadOnlyScope(ConfigScope::System))
        ));
        assert!(matches!(
            cm.remove_key("autoSave", ConfigScope::System),
            Err(ConfigError::ReadOnlyScope(_))
        ));
        cm.set_system_value("logLevel", "debug").unwrap();
        assert_eq!(cm.get_system_config().level(), crate::log::log_level::LogLevel::Debug);
        assert!(cm.is_config_modified("system"));
    }

    #[test]
    fn dynamic_overlay_wins_and_reports_no_scope() {
        let (_dir, cm) = manager();
        let scopes = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&scopes);
        cm.add_listener("fullscreen", move |e| s.lock().push(e.scope));

        cm.set_value("fullscreen", true, ConfigScope::User).unwrap();
        cm.set_dynamic_value("fullscreen", false);
        assert!(!cm.get_value("fullscreen", true));
        assert!(cm.remove_dynamic_value("fullscreen"));
        assert!(cm.get_value("fullscreen", false));
        assert_eq!(
            *scopes.lock(),
            vec![Some(ConfigScope::User), None, None]
        );
    }

    #[test]
    fn listener_may_write_back_and_panics_are_contained() {
        let (_dir, cm) = manager();
        let hits = Arc::new(AtomicUsize::new(0));
        let cm2 = cm.clone();
        cm.add_listener("a", move |e| {
            if let Some(v) = &e.new_value {
                cm2.set_value("b", v.clone(), ConfigScope::Application).unwrap();
            }
        });
        cm.add_listener("a", |_| panic!("boom"));
        let h = Arc::clone(&hits);
        cm.add_listener("a", move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        cm.set_value("a", 5, ConfigScope::Application).unwrap();
        assert_eq!(cm.get_value("b", 0i64), 5);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removing_key_everywhere_drops_its_listeners() {
        let (_dir, cm) = manager();
        cm.set_value("k", 1, ConfigScope::Application).unwrap();
        let id = cm.add_listener("k", |_| {});
        cm.add_listener("k", |_| {});
        assert!(cm.remove_listener("k", id));
        assert!(!cm.remove_listener("k", id));
        assert_eq!(cm.listener_count(), 1);
        assert!(cm.remove_key("k", ConfigScope::Application).unwrap());
        assert!(!cm.has_key("k"));
        assert_eq!(cm.listener_count(), 0);
    }

    #[test]
    fn save_then_load_round_trips_document() {
        let (dir, cm) = manager();
        cm.set_value("volume.music", 40, ConfigScope::Application).unwrap();
        cm.set_value("language", "en_US", ConfigScope::Application).unwrap();
        assert!(cm.is_config_modified("game"));
        cm.save_config("game", ConfigScope::Application).unwrap();
        assert!(!cm.is_config_modified("game"));
        let text = fs::read_to_string(dir.path().join("game.cfg")).unwrap();
        assert!(text.contains("volume.music=40"));

        let other = ConfigManager::new().with_logger(Logger::new());
        other.initialize(dir.path()).unwrap();
        other.load_config("game", ConfigScope::Application).unwrap();
        assert_eq!(other.get_value("volume.music", 0i64), 40);
        assert_eq!(other.get_value("language", String::new()), "en_US");
        assert!(other.is_config_loaded("game"));
    }

    #[test]
    fn load_failure_leaves_store_untouched() {
        let (dir, cm) = manager();
        cm.set_value("k", "v", ConfigScope::Application).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        assert!(matches!(
            cm.load_config("broken.json", ConfigScope::Application),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            cm.load_config("missing", ConfigScope::Application),
            Err(ConfigError::NotFound(_))
        ));
        assert_eq!(cm.get_all_keys().iter().filter(|k| *k == "k").count(), 1);
    }

    #[test]
    fn config_path_probes_known_extensions() {
        let (dir, cm) = manager();
        assert_eq!(cm.config_path("user").unwrap(), dir.path().join("user.cfg"));
        fs::write(dir.path().join("user.yaml"), "a: 1\n").unwrap();
        assert_eq!(cm.config_path("user").unwrap(), dir.path().join("user.yaml"));
        assert_eq!(cm.config_path("x.toml").unwrap(), dir.path().join("x.toml"));
    }

    #[test]
    fn strict_schema_rejects_unknown_and_invalid() {
        let (_dir, cm) = manager();
        cm.define_config(
            "game",
            vec![
                ConfigItem::new("graphics.quality", "high").valid_values(["low", "medium", "high"]),
                ConfigItem::new("volume.master", 100).required(),
            ],
        );
        cm.set_strict_schema(true);
        assert!(matches!(
            cm.set_value("nope", 1, ConfigScope::User),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cm.set_value("graphics.quality", "ultra", ConfigScope::User),
            Err(ConfigError::Validation(_))
        ));
        cm.set_value("graphics.quality", "low", ConfigScope::User).unwrap();
        assert!(cm.validate_config("game"));
        assert!(cm.validate_key("volume.master", &ConfigValue::Str("loud".into())).is_err());
        assert_eq!(cm.get_config_definition("game").unwrap().len(), 2);
    }

    #[test]
    fn check_config_lists_missing_required() {
        let (_dir, cm) = manager();
        cm.define_config("net", vec![ConfigItem::new("server.port", 7000).required()]);
        match cm.check_config("net") {
            Err(ConfigError::Validation(list)) => assert_eq!(list.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
        cm.set_value("server.port", 7001, ConfigScope::Application).unwrap();
        assert!(cm.validate_all_configs());
    }

    #[test]
    fn dump_masks_encrypted_items() {
        let (_dir, cm) = manager();
        cm.define_config("user", vec![ConfigItem::new("apiKey", "").encrypted()]);
        cm.set_value("apiKey", "secret", ConfigScope::User).unwrap();
        cm.set_value("nick", "aria", ConfigScope::User).unwrap();
        let mut out = Vec::new();
        cm.dump_config("user", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("apiKey=******"));
        assert!(text.contains("nick=aria"));
        assert!(!text.contains("secret"));
    }

    #[test]
    fn sealed_document_needs_password() {
        let (dir, cm) = manager();
        cm.set_value("token", "abc", ConfigScope::User).unwrap();
        cm.encrypt_config("user", "pw").unwrap();
        let raw = fs::read(dir.path().join("user.cfg")).unwrap();
        assert!(seal::is_sealed(&raw));

        let other = ConfigManager::new().with_logger(Logger::new());
        other.initialize(dir.path()).unwrap();
        assert!(matches!(
            other.load_config("user", ConfigScope::User),
            Err(ConfigError::Encrypted(_))
        ));
        other.set_config_password("user", "bad");
        assert!(matches!(
            other.load_config("user", ConfigScope::User),
            Err(ConfigError::Decryption(_))
        ));
        other.set_config_password("user", "pw");
        other.load_config("user", ConfigScope::User).unwrap();
        assert_eq!(other.get_value("token", String::new()), "abc");

        cm.decrypt_config("user", "pw").unwrap();
        let plain = fs::read_to_string(dir.path().join("user.cfg")).unwrap();
        assert!(plain.contains("token=abc"));
    }

    #[test]
    fn backup_and_restore_verify_checksum() {
        let (dir, cm) = manager();
        cm.set_value("k", 1, ConfigScope::Application).unwrap();
        cm.save_config("game", ConfigScope::Application).unwrap();
        let backup = dir.path().join("backups").join("game.cfg.bak");
        cm.backup_config("game", &backup).unwrap();
        assert!(checksum_path(&backup).is_file());

        cm.set_value("k", 2, ConfigScope::Application).unwrap();
        cm.restore_config("game", &backup).unwrap();
        assert_eq!(cm.get_value("k", 0i64), 1);

        fs::write(&backup, "k=3\n").unwrap();
        assert!(matches!(
            cm.restore_config("game", &backup),
            Err(ConfigError::ChecksumMismatch(_))
        ));
        assert_eq!(cm.get_value("k", 0i64), 1);
    }

    #[test]
    fn failed_restore_leaves_file_and_values_alone() {
        let (dir, cm) = manager();
        cm.set_value("k", 1, ConfigScope::Application).unwrap();
        cm.save_config("game", ConfigScope::Application).unwrap();
        let live = dir.path().join("game.cfg");
        let before = fs::read(&live).unwrap();

        let corrupt = dir.path().join("corrupt.cfg");
        fs::write(&corrupt, "this is not key value\n").unwrap();
        assert!(matches!(
            cm.restore_config("game", &corrupt),
            Err(ConfigError::Parse { .. })
        ));
        assert_eq!(fs::read(&live).unwrap(), before);
        assert_eq!(cm.get_value("k", 0i64), 1);

        cm.define_config("game", vec![ConfigItem::new("k", 0)]);
        cm.set_strict_schema(true);
        let unknown = dir.path().join("unknown.cfg");
        fs::write(&unknown, "k=2\nstray=1\n").unwrap();
        assert!(matches!(
            cm.restore_config("game", &unknown),
            Err(ConfigError::UnknownKey(_))
        ));
        assert_eq!(fs::read(&live).unwrap(), before);
        assert_eq!(cm.get_value("k", 0i64), 1);
    }

    #[test]
    fn export_and_import_fire_events() {
        let (dir, cm) = manager();
        cm.set_value("graphics.quality", "low", ConfigScope::Application).unwrap();
        let out = dir.path().join("export.json");
        cm.export_config("game", &out).unwrap();
        let text = fs::read_to_string(&out).unwrap();
        assert!(text.contains("\"graphics.quality\""));

        fs::write(dir.path().join("incoming.yaml"), "graphics:\n  quality: medium\n").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        cm.add_listener("graphics.quality", move |e| s.lock().push(e.new_value.clone()));
        cm.import_config("game", dir.path().join("incoming.yaml")).unwrap();
        assert_eq!(cm.get_value("graphics.quality", String::new()), "medium");
        assert_eq!(*seen.lock(), vec![Some(ConfigValue::Str("medium".into()))]);
        assert!(cm.is_config_modified("game"));
    }

    #[test]
    fn entity_configs_use_kind_directories() {
        let (dir, cm) = manager();
        let mut hero = ConfigMap::new();
        hero.insert("name".into(), "Aria".into());
        crate::config::entity::apply_config_template(&mut hero, EntityKind::Character);
        // Lists need a structured format.
        let id = format!("{}.yaml", crate::config::entity::character_id("warrior", 3));
        assert!(matches!(
            cm.save_entity_config(EntityKind::Character, "warrior_3", &hero),
            Err(ConfigError::Unrepresentable { .. })
        ));
        cm.save_entity_config(EntityKind::Character, &id, &hero).unwrap();
        assert!(dir.path().join("characters/warrior_3.yaml").is_file());
        let back = cm.load_entity_config(EntityKind::Character, &id).unwrap();
        assert_eq!(back["name"], ConfigValue::Str("Aria".into()));
        assert_eq!(back["mana"], ConfigValue::Int(50));
        assert_eq!(
            cm.entity_config_path(EntityKind::Item, "").unwrap(),
            dir.path().join("items/default.cfg")
        );
        assert!(matches!(
            cm.load_entity_config(EntityKind::Quest, "q1"),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn stats_track_documents_and_loads() {
        let (_dir, cm) = manager();
        cm.set_value("a", 1, ConfigScope::Application).unwrap();
        cm.save_config("game", ConfigScope::Application).unwrap();
        cm.load_config("game", ConfigScope::Application).unwrap();
        cm.set_value("b", 1, ConfigScope::User).unwrap();
        cm.add_listener("a", |_| {});
        let stats = cm.get_stats();
        assert_eq!(stats.total_configs, 2);
        assert_eq!(stats.loaded_configs, 1);
        assert_eq!(stats.modified_configs, 1);
        assert_eq!(stats.listeners_count, 1);
        assert!(stats.last_reload_time.is_some());
        cm.reset_stats();
        assert!(cm.get_stats().last_reload_time.is_none());
    }

    #[test]
    fn shutdown_clears_and_allows_reinit() {
        let (dir, cm) = manager();
        cm.set_value("a", 1, ConfigScope::User).unwrap();
        cm.add_listener("a", |_| {});
        cm.shutdown();
        assert!(!cm.is_initialized());
        assert!(!cm.has_key("a"));
        assert_eq!(cm.listener_count(), 0);
        assert!(matches!(cm.config_path("game"), Err(ConfigError::NotInitialized)));
        cm.shutdown();
        cm.initialize(dir.path()).unwrap();
        assert!(cm.has_key("version"));
    }
}
