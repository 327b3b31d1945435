//! Container killer — tears down sidecars once main has terminated.
//!
//! The kill command is an out-of-band contract: the controller stamps a
//! `kill-cmd.<container>` annotation onto every replica pod at creation
//! time, and the killer executes that command inside the target
//! container through the scheduler's exec operation.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use streamgrid_scheduler::{SchedulerClient, SchedulerError};
use streamgrid_types::Pod;

#[derive(Debug, Error)]
pub enum KillError {
    #[error("no kill command annotation for container {0:?}")]
    NoKillCommand(String),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Kills a named container inside a pod.
#[async_trait]
pub trait ContainerKiller: Send + Sync + 'static {
    async fn kill_container(&self, pod: &Pod, container: &str) -> Result<(), KillError>;
}

/// Killer that resolves the command from the pod's annotations.
pub struct AnnotationKiller<C> {
    client: Arc<C>,
}

impl<C> AnnotationKiller<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: SchedulerClient> ContainerKiller for AnnotationKiller<C> {
    async fn kill_container(&self, pod: &Pod, container: &str) -> Result<(), KillError> {
        let command = pod
            .kill_cmd(container)
            .ok_or_else(|| KillError::NoKillCommand(container.to_string()))?;
        info!(pod = %pod.metadata.name, container, "killing container");
        self.client
            .exec_in_container(
                &pod.metadata.namespace,
                &pod.metadata.name,
                container,
                &command,
            )
            .await?;
        Ok(())
    }
}
