//! The step reconciler — one pass of the control loop over one step.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::{debug, info};

use streamgrid_scheduler::{EventLevel, LabelSelector, SchedulerClient};
use streamgrid_types::{
    keys, spec_hash, ObjectMeta, OwnerReference, Pod, Step, StepKey, StepPhase,
    StepPhaseMessage,
};

use crate::error::ReconcileError;
use crate::killer::ContainerKiller;
use crate::phase::infer_phase;

/// Requeue delays: short while a scale is in progress so convergence is
/// fast, long once converged so steady-state cost stays low. The exact
/// values are policy, not contract.
#[derive(Debug, Clone, Copy)]
pub struct RequeuePolicy {
    pub scaling: Duration,
    pub steady: Duration,
}

impl Default for RequeuePolicy {
    fn default() -> Self {
        Self {
            scaling: Duration::from_secs(1),
            steady: Duration::from_secs(60),
        }
    }
}

impl RequeuePolicy {
    fn after(&self, current_replicas: u32, target_replicas: u32) -> Duration {
        if current_replicas != target_replicas {
            self.scaling
        } else {
            self.steady
        }
    }
}

/// One reconcile pass. Implemented by [`StepReconciler`]; the trait
/// exists so the runner can be exercised with arbitrary behaviors.
#[async_trait]
pub trait Reconcile: Send + Sync + 'static {
    async fn reconcile(&self, key: &StepKey) -> Result<Option<Duration>, ReconcileError>;
}

/// Reconciles one step: pods, replicas, hash, phase, status.
///
/// The reconciler holds no mutable state across passes; everything is
/// derived from the loaded step and the listed pods, which keeps
/// re-entry safe as long as the queue serializes passes per key.
pub struct StepReconciler<C> {
    client: Arc<C>,
    killer: Arc<dyn ContainerKiller>,
    requeue: RequeuePolicy,
}

impl<C: SchedulerClient> StepReconciler<C> {
    pub fn new(client: Arc<C>, killer: Arc<dyn ContainerKiller>) -> Self {
        Self {
            client,
            killer,
            requeue: RequeuePolicy::default(),
        }
    }

    pub fn with_requeue(mut self, requeue: RequeuePolicy) -> Self {
        self.requeue = requeue;
        self
    }

    async fn reconcile_step(
        &self,
        key: &StepKey,
    ) -> Result<Option<Duration>, ReconcileError> {
        // Load. A vanished or deleting step is a no-op: deletion cascades
        // through owner references.
        let step = match self.client.get_step(key).await {
            Ok(Some(step)) => step,
            Ok(None) => return Ok(None),
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if step.metadata.deletion_timestamp.is_some() {
            return Ok(None);
        }

        let pipeline_name = step.pipeline_name().to_string();
        let current_replicas = step.current_replicas();
        let target_replicas = step.target_replicas();
        let hash = spec_hash(&step.spec);

        info!(
            step = %key,
            current_replicas,
            target_replicas,
            pipeline_name = %pipeline_name,
            "reconciling"
        );

        // Once a step has completed we neither schedule nor create pods.
        let completed = step
            .status
            .as_ref()
            .is_some_and(|s| s.phase.is_terminal());
        if !completed {
            for replica in 0..target_replicas {
                let pod = build_replica_pod(&step, &pipeline_name, &hash, replica);
                let pod_name = pod.metadata.name.clone();
                debug!(pod = %pod_name, "applying pod");
                match self.client.create_pod(pod).await {
                    Ok(()) => {}
                    Err(e) if e.is_already_exists() => {}
                    Err(e) => {
                        return Err(ReconcileError::CreatePod {
                            name: pod_name,
                            source: e,
                        })
                    }
                }
            }
        }

        let selector = LabelSelector::from_pairs(&[
            (keys::KEY_PIPELINE_NAME, &pipeline_name),
            (keys::KEY_STEP_NAME, &step.spec.name),
        ]);
        let pods = self
            .client
            .list_pods(&step.metadata.namespace, &selector)
            .await?;

        // Counter maps are sidecar-owned: cleared here so the eventual
        // merge patch carries nothing for them.
        let mut old_status = step.status.clone().unwrap_or_default();
        old_status.source_statuses = Default::default();
        old_status.sink_statuses = Default::default();
        let mut new_status = old_status.clone();
        new_status.phase = StepPhase::Unknown;

        if current_replicas != target_replicas {
            new_status.last_scaled_at = Some(epoch_secs());
            new_status.replicas = target_replicas;
            let reason = if target_replicas > current_replicas {
                "ScaleUp"
            } else {
                "ScaleDown"
            };
            self.client
                .emit_event(
                    key,
                    EventLevel::Normal,
                    reason,
                    &format!("Scaling from {current_replicas} to {target_replicas}"),
                )
                .await?;
        }

        // One deletion per pass bounds churn during scale-down and
        // rollout, and lets freshly created pods stabilize in between.
        let mut deleted_pod = false;
        for pod in &pods {
            let replica = pod.replica().unwrap_or(0);
            let stale = replica >= target_replicas || pod.spec_hash() != hash;
            if stale && !deleted_pod {
                info!(pod = %pod.metadata.name, "deleting excess pod");
                match self
                    .client
                    .delete_pod(&step.metadata.namespace, &pod.metadata.name)
                    .await
                {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {}
                    Err(e) => {
                        return Err(ReconcileError::DeletePod {
                            name: pod.metadata.name.clone(),
                            source: e,
                        })
                    }
                }
                deleted_pod = true;
            } else {
                let inferred = infer_phase(pod);
                debug!(
                    pod = %pod.metadata.name,
                    phase = %inferred.phase,
                    message = %inferred.message,
                    "pod"
                );
                let aggregated = StepPhaseMessage::new(
                    new_status.phase,
                    new_status.message.clone(),
                )
                .min(inferred);
                new_status.phase = aggregated.phase;
                new_status.message = aggregated.message;

                // Main is the only container whose exit completes the
                // replica; anything else left behind is torn down.
                if pod.main_terminated() {
                    for cs in &pod.status.container_statuses {
                        if cs.name != keys::CTR_MAIN {
                            self.killer
                                .kill_container(pod, &cs.name)
                                .await
                                .map_err(|source| ReconcileError::KillContainer {
                                    pod: pod.metadata.name.clone(),
                                    container: cs.name.clone(),
                                    source,
                                })?;
                        }
                    }
                }
            }
        }

        if new_status != old_status {
            info!(step = %key, phase = %new_status.phase, "patching step status");
            match self
                .client
                .patch_step_status(key, &new_status, step.metadata.resource_version)
                .await
            {
                Ok(()) => {}
                // Conflict is fine, the next pass converges.
                Err(e) if e.is_conflict() => {
                    debug!(step = %key, "status patch conflicted")
                }
                Err(e) => return Err(ReconcileError::PatchStatus(e)),
            }
        }

        Ok(Some(self.requeue.after(current_replicas, target_replicas)))
    }
}

#[async_trait]
impl<C: SchedulerClient> Reconcile for StepReconciler<C> {
    async fn reconcile(&self, key: &StepKey) -> Result<Option<Duration>, ReconcileError> {
        self.reconcile_step(key).await
    }
}

/// Build the pod object for one replica of a step.
fn build_replica_pod(step: &Step, pipeline_name: &str, hash: &str, replica: u32) -> Pod {
    let mut labels = step.spec.metadata.labels.clone();
    labels.insert(keys::KEY_STEP_NAME.to_string(), step.spec.name.clone());
    labels.insert(
        keys::KEY_PIPELINE_NAME.to_string(),
        pipeline_name.to_string(),
    );

    let mut annotations = step.spec.metadata.annotations.clone();
    annotations.insert(keys::KEY_REPLICA.to_string(), replica.to_string());
    annotations.insert(keys::KEY_HASH.to_string(), hash.to_string());
    annotations.insert(
        keys::KEY_DEFAULT_CONTAINER.to_string(),
        keys::CTR_MAIN.to_string(),
    );
    let kill_cmd = serde_json::to_string(&[keys::PATH_KILL, "1"]).expect("argv serializes");
    annotations.insert(keys::key_kill_cmd(keys::CTR_MAIN), kill_cmd.clone());
    annotations.insert(keys::key_kill_cmd(keys::CTR_SIDECAR), kill_cmd);

    Pod {
        metadata: ObjectMeta {
            namespace: step.metadata.namespace.clone(),
            name: format!("{}-{}", step.metadata.name, replica),
            labels,
            annotations,
            owner_references: vec![OwnerReference::step(&step.metadata.name)],
            ..Default::default()
        },
        spec: step
            .spec
            .pod_spec(pipeline_name, &step.metadata.namespace, replica),
        status: Default::default(),
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
