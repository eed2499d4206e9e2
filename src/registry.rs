use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::engine::DecodeEngine;
use crate::session::{SessionController, ViewEvent, ViewerHandle};
use crate::settings::ViewerConfig;

struct OpenDocument {
    handle: ViewerHandle,
    task: JoinHandle<()>,
}

/// Open documents, one controller each. Documents share the engine and config
/// but nothing else.
pub struct ViewerRegistry<E: DecodeEngine> {
    engine: Arc<E>,
    config: ViewerConfig,
    documents: HashMap<Uuid, OpenDocument>,
}

impl<E: DecodeEngine> ViewerRegistry<E> {
    pub fn new(engine: E, config: ViewerConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            config,
            documents: HashMap::new(),
        }
    }

    /// Spawn a controller for a newly opened document.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&mut self) -> (Uuid, ViewerHandle, UnboundedReceiver<ViewEvent>) {
        let id = Uuid::new_v4();
        let (controller, handle, view) =
            SessionController::new(Arc::clone(&self.engine), self.config.clone());
        let task = tokio::spawn(controller.run());
        self.documents.insert(
            id,
            OpenDocument {
                handle: handle.clone(),
                task,
            },
        );
        info!("Opened viewer document {id}");
        (id, handle, view)
    }

    pub fn handle(&self, id: &Uuid) -> Option<ViewerHandle> {
        self.documents.get(id).map(|document| document.handle.clone())
    }

    /// Forward a raw host message to one document.
    pub fn dispatch(&self, id: &Uuid, raw: &str) -> Result<()> {
        let document = self
            .documents
            .get(id)
            .ok_or_else(|| anyhow!("no open viewer document {id}"))?;
        document
            .handle
            .host_json(raw)
            .with_context(|| format!("failed to dispatch to document {id}"))
    }

    /// Close a document and wait for its controller to finish tearing down.
    pub async fn close(&mut self, id: &Uuid) -> Result<()> {
        let document = self
            .documents
            .remove(id)
            .ok_or_else(|| anyhow!("no open viewer document {id}"))?;

        if document.handle.close().is_err() {
            debug!("Controller for {id} had already stopped");
        }
        document
            .task
            .await
            .with_context(|| format!("controller task for {id} panicked"))?;
        info!("Closed viewer document {id}");
        Ok(())
    }

    pub async fn close_all(&mut self) -> Result<()> {
        let ids: Vec<Uuid> = self.documents.keys().copied().collect();
        for id in ids {
            self.close(&id).await?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
