//! Well-known label, annotation, and environment keys.
//!
//! These are the observable contract between the controller, the
//! scheduler, and the sidecar: the controller writes them onto replica
//! pods, the sidecar reads them from its environment, and the container
//! killer resolves its command from them.

/// Label carrying the pipeline a step belongs to.
pub const KEY_PIPELINE_NAME: &str = "streamgrid.io/pipeline-name";

/// Label carrying the step's spec name.
pub const KEY_STEP_NAME: &str = "streamgrid.io/step-name";

/// Annotation carrying the replica index (decimal integer >= 0).
pub const KEY_REPLICA: &str = "streamgrid.io/replica";

/// Annotation carrying the step-spec fingerprint the pod was created from.
pub const KEY_HASH: &str = "streamgrid.io/hash";

/// Annotation naming the container tools should attach to by default.
pub const KEY_DEFAULT_CONTAINER: &str = "streamgrid.io/default-container";

/// Annotation key for a container's kill command (JSON-encoded argv).
pub fn key_kill_cmd(container: &str) -> String {
    format!("streamgrid.io/kill-cmd.{container}")
}

/// The user-code container in a replica pod.
pub const CTR_MAIN: &str = "main";

/// The dataplane container in a replica pod.
pub const CTR_SIDECAR: &str = "sidecar";

/// In-container kill binary referenced by the kill-cmd annotations.
pub const PATH_KILL: &str = "/var/run/streamgrid/kill";

/// Directory where named secrets are mounted for the sidecar.
pub const PATH_SECRETS: &str = "/var/run/streamgrid/secrets";

/// Environment variable holding the JSON-encoded step spec.
pub const ENV_STEP_SPEC: &str = "STREAMGRID_STEP";

/// Environment variable holding the replica index.
pub const ENV_REPLICA: &str = "STREAMGRID_REPLICA";

/// Environment variable holding the pipeline name.
pub const ENV_PIPELINE_NAME: &str = "STREAMGRID_PIPELINE_NAME";

/// Environment variable holding the namespace.
pub const ENV_NAMESPACE: &str = "STREAMGRID_NAMESPACE";

/// Image used for the sidecar container in replica pods.
pub const RUNNER_IMAGE: &str = "streamgrid/streamd:latest";
