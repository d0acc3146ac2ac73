//! Sequential broadcast execution

use std::sync::Arc;
use std::time::Duration;

use rc_core::address::{mention_tag, normalize_target, normalize_user};
use rc_core::traits::{MessagingClient, OutgoingMessage};
use rc_core::{Severity, TargetType};

use super::jobs::JobHandle;
use crate::logs::LogRegistry;
use crate::session::Session;

/// One broadcast: every message to every target, in list order
#[derive(Debug, Clone)]
pub struct BroadcastJob {
    pub target_type: TargetType,
    pub targets: Vec<String>,
    pub messages: Vec<String>,
    /// Users to mention; only rendered for group targets
    pub mentions: Vec<String>,
    /// Wait after each send attempt
    pub delay: Duration,
}

impl BroadcastJob {
    /// Number of send attempts the job will make
    pub fn total(&self) -> usize {
        self.targets.len() * self.messages.len()
    }
}

/// Build the outgoing text. Group messages get the mention tags appended
/// after a blank line.
pub fn compose_text(message: &str, target_type: TargetType, mentions: &[String]) -> String {
    if target_type != TargetType::Group || mentions.is_empty() {
        return message.to_string();
    }

    let tags: Vec<String> = mentions.iter().map(|m| mention_tag(m)).collect();
    format!("{}\n\n{}", message, tags.join(" "))
}

/// Run a job to completion, logging every attempt into the session log.
///
/// Failed sends are logged and skipped. The job stops early only if the
/// session is torn down underneath it, and from then on nothing is logged.
pub async fn run_broadcast(
    session: &Session,
    client: Arc<dyn MessagingClient>,
    logs: &LogRegistry,
    job: &BroadcastJob,
    handle: &JobHandle,
) {
    let key = &session.key;

    let mentions: Vec<String> = job
        .mentions
        .iter()
        .filter_map(|raw| {
            let normalized = normalize_user(raw);
            if normalized.is_none() {
                tracing::warn!("[{}] Ignoring invalid mention {:?}", key, raw);
            }
            normalized
        })
        .collect();

    logs.append_for(
        session,
        format!(
            "Starting broadcast to {} {}(s)",
            job.targets.len(),
            job.target_type
        ),
        Severity::Info,
    );

    'targets: for raw_target in &job.targets {
        let Some(target) = normalize_target(raw_target, job.target_type) else {
            logs.append_for(session, format!("Invalid target: {:?}", raw_target), Severity::Error);
            handle.record_failed(job.messages.len());
            continue;
        };

        for message in &job.messages {
            if session.is_retired() {
                tracing::info!("[{}] Session torn down, abandoning broadcast {}", key, handle.id);
                break 'targets;
            }

            let text = compose_text(message, job.target_type, &mentions);
            let outgoing = OutgoingMessage {
                text: text.clone(),
                mentions: mentions.clone(),
            };

            match client.send_message(&target, outgoing).await {
                Ok(()) => {
                    logs.append_for(session, format!("Sent to {}: {}", target, text), Severity::Info);
                    handle.record_sent();
                }
                Err(e) => {
                    logs.append_for(
                        session,
                        format!("Error sending to {}: {}", target, e),
                        Severity::Error,
                    );
                    handle.record_failed(1);
                }
            }
            session.touch();

            tokio::time::sleep(job.delay).await;
        }
    }

    logs.append_for(session, "Broadcast finished", Severity::Success);
    handle.finish();
}
