//! Phase inference — pure mapping from a pod observation to a step
//! phase, kept free of I/O so it can be tested exhaustively.

use streamgrid_types::{
    keys, ContainerState, Pod, PodPhase, StepPhase, StepPhaseMessage,
};

/// Waiting reasons that indicate the pod will never start.
const FATAL_WAITING_REASONS: [&str; 5] = [
    "ErrImagePull",
    "ImagePullBackOff",
    "InvalidImageName",
    "CreateContainerConfigError",
    "CrashLoopBackOff",
];

/// Infer a step phase from one replica pod.
pub fn infer_phase(pod: &Pod) -> StepPhaseMessage {
    let statuses = &pod.status.container_statuses;

    for cs in statuses {
        if let ContainerState::Waiting { reason } = &cs.state {
            if FATAL_WAITING_REASONS.contains(&reason.as_str()) {
                return StepPhaseMessage::new(
                    StepPhase::Failed,
                    format!("container {:?} failed: {reason}", cs.name),
                );
            }
        }
    }

    for cs in statuses {
        if let ContainerState::Terminated { exit_code, reason } = &cs.state {
            if *exit_code != 0 {
                let detail = if reason.is_empty() {
                    String::new()
                } else {
                    format!(" ({reason})")
                };
                return StepPhaseMessage::new(
                    StepPhase::Failed,
                    format!(
                        "container {:?} exited with code {exit_code}{detail}",
                        cs.name
                    ),
                );
            }
        }
    }

    if !statuses.is_empty()
        && statuses
            .iter()
            .all(|cs| cs.ready && matches!(cs.state, ContainerState::Running))
    {
        return StepPhaseMessage::new(StepPhase::Running, "");
    }

    if pod.status.phase == PodPhase::Pending {
        return StepPhaseMessage::new(StepPhase::Pending, "");
    }

    let main_succeeded = statuses.iter().any(|cs| {
        cs.name == keys::CTR_MAIN
            && matches!(cs.state, ContainerState::Terminated { exit_code: 0, .. })
    });
    if main_succeeded {
        return StepPhaseMessage::new(StepPhase::Succeeded, "");
    }

    StepPhaseMessage::new(StepPhase::Unknown, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamgrid_types::{ContainerStatus, ObjectMeta, PodSpec, PodStatus};

    fn pod_with(phase: PodPhase, statuses: Vec<ContainerStatus>) -> Pod {
        Pod {
            metadata: ObjectMeta::default(),
            spec: PodSpec::default(),
            status: PodStatus {
                phase,
                container_statuses: statuses,
            },
        }
    }

    fn running(name: &str) -> ContainerStatus {
        ContainerStatus {
            name: name.to_string(),
            ready: true,
            state: ContainerState::Running,
        }
    }

    fn terminated(name: &str, exit_code: i32) -> ContainerStatus {
        ContainerStatus {
            name: name.to_string(),
            ready: false,
            state: ContainerState::Terminated {
                exit_code,
                reason: String::new(),
            },
        }
    }

    #[test]
    fn image_pull_failure_is_failed() {
        let pod = pod_with(
            PodPhase::Pending,
            vec![ContainerStatus {
                name: keys::CTR_MAIN.to_string(),
                ready: false,
                state: ContainerState::Waiting {
                    reason: "ImagePullBackOff".to_string(),
                },
            }],
        );
        let inferred = infer_phase(&pod);
        assert_eq!(inferred.phase, StepPhase::Failed);
        assert!(inferred.message.contains("ImagePullBackOff"));
    }

    #[test]
    fn nonzero_exit_is_failed() {
        let pod = pod_with(
            PodPhase::Running,
            vec![running(keys::CTR_SIDECAR), terminated(keys::CTR_MAIN, 1)],
        );
        let inferred = infer_phase(&pod);
        assert_eq!(inferred.phase, StepPhase::Failed);
        assert!(inferred.message.contains("exited with code 1"));
    }

    #[test]
    fn all_running_and_ready_is_running() {
        let pod = pod_with(
            PodPhase::Running,
            vec![running(keys::CTR_MAIN), running(keys::CTR_SIDECAR)],
        );
        assert_eq!(infer_phase(&pod).phase, StepPhase::Running);
    }

    #[test]
    fn not_ready_is_not_running() {
        let mut unready = running(keys::CTR_MAIN);
        unready.ready = false;
        let pod = pod_with(PodPhase::Running, vec![unready, running(keys::CTR_SIDECAR)]);
        assert_eq!(infer_phase(&pod).phase, StepPhase::Unknown);
    }

    #[test]
    fn pending_pod_is_pending() {
        let pod = pod_with(PodPhase::Pending, vec![]);
        assert_eq!(infer_phase(&pod).phase, StepPhase::Pending);
    }

    #[test]
    fn main_exit_zero_is_succeeded_even_with_sidecar_running() {
        let pod = pod_with(
            PodPhase::Running,
            vec![terminated(keys::CTR_MAIN, 0), running(keys::CTR_SIDECAR)],
        );
        assert_eq!(infer_phase(&pod).phase, StepPhase::Succeeded);
    }

    #[test]
    fn sidecar_exit_zero_alone_is_not_succeeded() {
        let pod = pod_with(
            PodPhase::Running,
            vec![running(keys::CTR_MAIN), terminated(keys::CTR_SIDECAR, 0)],
        );
        assert_eq!(infer_phase(&pod).phase, StepPhase::Unknown);
    }

    #[test]
    fn benign_waiting_reason_is_not_failed() {
        let pod = pod_with(
            PodPhase::Pending,
            vec![ContainerStatus {
                name: keys::CTR_MAIN.to_string(),
                ready: false,
                state: ContainerState::Waiting {
                    reason: "ContainerCreating".to_string(),
                },
            }],
        );
        assert_eq!(infer_phase(&pod).phase, StepPhase::Pending);
    }
}
