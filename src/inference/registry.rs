// src/inference/registry.rs
//! Shared, replaceable scorer model
//!
//! Scoring threads take a cheap [`ModelHandle`] snapshot and never block on a
//! reload. A replacement is published only after it loads and validates; a
//! bad file leaves the previous model in service.

use super::model::ScorerModel;
use super::record::load_model;
use crate::config::ModelSettings;
use crate::error::{PdError, PdResult};
use crate::error_context;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
#[cfg(feature = "hot-reload")]
use std::sync::mpsc;
use std::sync::Arc;
use tracing::{info, warn};

/// Immutable snapshot of the model in service
pub type ModelHandle = Arc<ScorerModel>;

/// Holder of the model currently used for scoring
pub struct ModelRegistry {
    current: Arc<RwLock<ModelHandle>>,
    source: Option<PathBuf>,
    #[cfg(feature = "hot-reload")]
    _file_watcher: Option<notify::RecommendedWatcher>,
}

impl ModelRegistry {
    /// Registry serving an in-memory model
    pub fn new(model: ScorerModel) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(model))),
            source: None,
            #[cfg(feature = "hot-reload")]
            _file_watcher: None,
        }
    }

    /// Registry serving a model record file
    pub fn load<P: AsRef<Path>>(path: P) -> PdResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut registry = Self::new(load_model(&path)?);
        registry.source = Some(path);
        Ok(registry)
    }

    /// Registry for the configured record file
    ///
    /// With `watch` set the record is also watched for changes. Models
    /// published by the watcher are not reported; use [`ModelRegistry::load`]
    /// followed by `watch` to receive them.
    pub fn from_settings(settings: &ModelSettings) -> PdResult<Self> {
        #[allow(unused_mut)]
        let mut registry = Self::load(&settings.path)?;
        if settings.watch {
            #[cfg(feature = "hot-reload")]
            registry.watch()?;
            #[cfg(not(feature = "hot-reload"))]
            return Err(PdError::Configuration {
                component: "model".to_string(),
                reason: "model.watch requires the hot-reload feature".to_string(),
            });
        }
        Ok(registry)
    }

    /// Record file backing this registry, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Snapshot of the model in service
    pub fn current(&self) -> ModelHandle {
        Arc::clone(&*self.current.read())
    }

    /// Replace the model, returning the one it supersedes
    ///
    /// The replacement must keep the feature and class counts of the model in
    /// service so extractors and callers stay aligned.
    pub fn publish(&self, model: ScorerModel) -> PdResult<ModelHandle> {
        publish_into(&self.current, Arc::new(model))
    }

    /// Re-read the backing record file, returning the newly published model
    pub fn reload(&self) -> PdResult<ModelHandle> {
        let path = self.source.as_ref().ok_or_else(|| {
            PdError::model_load("registry has no backing file", error_context!("registry", "reload"))
        })?;
        let model = Arc::new(load_model(path)?);
        publish_into(&self.current, Arc::clone(&model))?;
        Ok(model)
    }

    /// Reload whenever the backing file is written
    ///
    /// Each successfully published model is also sent on the returned
    /// channel. Failed reloads are logged and the previous model stays.
    #[cfg(feature = "hot-reload")]
    pub fn watch(&mut self) -> PdResult<mpsc::Receiver<ModelHandle>> {
        use notify::{DebouncedEvent, RecursiveMode, Watcher};
        use std::time::Duration;

        let source = self.source.clone().ok_or_else(|| {
            PdError::Watcher("registry has no backing file to watch".to_string())
        })?;
        let file_name = source
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| PdError::Watcher(format!("{} is not a file path", source.display())))?;
        let directory = match source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (watch_tx, watch_rx) = mpsc::channel();
        let mut watcher = notify::watcher(watch_tx, Duration::from_millis(500))
            .map_err(|e| PdError::Watcher(e.to_string()))?;
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|e| PdError::Watcher(e.to_string()))?;

        let (tx, rx) = mpsc::channel();
        let shared = Arc::clone(&self.current);
        std::thread::spawn(move || {
            while let Ok(event) = watch_rx.recv() {
                let changed = match event {
                    DebouncedEvent::Write(path) | DebouncedEvent::Create(path) => path,
                    _ => continue,
                };
                if changed.file_name() != Some(file_name.as_os_str()) {
                    continue;
                }
                let reloaded = load_model(&source).map(Arc::new).and_then(|model| {
                    publish_into(&shared, Arc::clone(&model)).map(|_| model)
                });
                match reloaded {
                    Ok(model) => {
                        let _ = tx.send(model);
                    }
                    Err(e) => warn!(path = %source.display(), error = %e, "model reload failed, keeping previous model"),
                }
            }
        });

        info!(path = %directory.display(), "watching model directory");
        self._file_watcher = Some(watcher);
        Ok(rx)
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current();
        f.debug_struct("ModelRegistry")
            .field("kind", &current.kind())
            .field("feature_dim", &current.feature_dim())
            .field("source", &self.source)
            .finish()
    }
}

fn publish_into(slot: &RwLock<ModelHandle>, model: ModelHandle) -> PdResult<ModelHandle> {
    let mut guard = slot.write();
    if model.feature_dim() != guard.feature_dim() {
        return Err(PdError::shape(
            "replacement feature count",
            guard.feature_dim(),
            model.feature_dim(),
            error_context!("registry", "publish"),
        ));
    }
    if model.num_classes() != guard.num_classes() {
        return Err(PdError::shape(
            "replacement class count",
            guard.num_classes(),
            model.num_classes(),
            error_context!("registry", "publish"),
        ));
    }
    let previous = std::mem::replace(&mut *guard, model);
    info!(kind = previous.kind().tag(), "model replaced");
    Ok(previous)
}
