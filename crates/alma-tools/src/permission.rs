use crate::catalog::Tool;
use alma_types::{ApprovalDecision, PermissionRequest, PermissionStatus};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct PermissionConfig {
    pub timeout: Duration,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

impl PermissionConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Notification for the approval UI
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum PermissionEvent {
    #[serde(rename = "permission-required")]
    Required(PermissionRequest),

    #[serde(rename = "permission-resolved")]
    Resolved {
        id: String,
        status: PermissionStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        decision: Option<ApprovalDecision>,
    },
}

impl PermissionEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Required(_) => "permission-required",
            Self::Resolved { .. } => "permission-resolved",
        }
    }
}

struct Pending {
    request: PermissionRequest,
    responder: oneshot::Sender<ApprovalDecision>,
    seq: u64,
}

/// Approval checkpoint for tool calls.
///
/// Every prompt gets its own oneshot channel keyed by request id; the waiting
/// side owns the timeout. The auto-approval set is process-wide and shared by
/// every thread.
pub struct PermissionGate {
    pending: Mutex<HashMap<String, Pending>>,
    auto_approved: Mutex<HashSet<String>>,
    events: broadcast::Sender<PermissionEvent>,
    seq: AtomicU64,
    timeout: Duration,
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new(PermissionConfig::default())
    }
}

impl PermissionGate {
    pub fn new(config: PermissionConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            pending: Mutex::new(HashMap::new()),
            auto_approved: Mutex::new(HashSet::new()),
            events,
            seq: AtomicU64::new(0),
            timeout: config.timeout,
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, Pending>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn auto(&self) -> MutexGuard<'_, HashSet<String>> {
        self.auto_approved.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PermissionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: PermissionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Whether a call to `tool` would suspend on a prompt
    pub fn needs_prompt(&self, tool: &dyn Tool) -> bool {
        tool.needs_approval() && !self.is_auto_approved(tool.name())
    }

    pub fn is_auto_approved(&self, tool_name: &str) -> bool {
        self.auto().contains(tool_name)
    }

    /// Resolve to `true` when the call may proceed.
    ///
    /// Suspends until a decision arrives or the timeout elapses; a timeout
    /// counts as a denial.
    pub async fn request_permission(&self, tool: &dyn Tool, params: &Value) -> bool {
        if !self.needs_prompt(tool) {
            debug!(tool = %tool.name(), "Permission granted without prompt");
            return true;
        }

        let id = new_request_id();
        let request = PermissionRequest::new(id.clone(), tool.name(), params.clone());
        let (responder, mut rx) = oneshot::channel();
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);

        self.pending().insert(
            id.clone(),
            Pending {
                request: request.clone(),
                responder,
                seq,
            },
        );
        let _guard = PendingGuard { gate: self, id: &id };

        info!(request_id = %id, tool = %tool.name(), "Permission required");
        self.emit(PermissionEvent::Required(request));

        let decision = match tokio::time::timeout(self.timeout, &mut rx).await {
            Ok(result) => result.ok(),
            Err(_) => {
                let expired = self.pending().remove(&id).is_some();
                if expired {
                    warn!(request_id = %id, tool = %tool.name(), "Permission request expired");
                    self.emit(PermissionEvent::Resolved {
                        id: id.clone(),
                        status: PermissionStatus::Expired,
                        decision: None,
                    });
                    None
                } else {
                    // A decision claimed the entry as the timer fired
                    rx.await.ok()
                }
            }
        };

        decision.is_some_and(|d| d.is_approval())
    }

    /// Apply an external decision. Unknown or already-resolved ids are a no-op
    /// and return `false`.
    pub fn handle_decision(&self, request_id: &str, decision: ApprovalDecision) -> bool {
        let Some(entry) = self.pending().remove(request_id) else {
            debug!(request_id = %request_id, "Ignoring decision for unknown request");
            return false;
        };

        if decision == ApprovalDecision::ApproveAll {
            self.auto().insert(entry.request.tool_name.clone());
            info!(tool = %entry.request.tool_name, "Tool auto-approved for this process");
        }

        info!(request_id = %request_id, decision = ?decision, "Permission decided");
        let _ = entry.responder.send(decision);
        self.emit(PermissionEvent::Resolved {
            id: request_id.to_string(),
            status: PermissionStatus::Resolved,
            decision: Some(decision),
        });
        true
    }

    /// Most recently created request still awaiting a decision
    pub fn get_latest_pending_request(&self) -> Option<PermissionRequest> {
        self.pending()
            .values()
            .max_by_key(|p| p.seq)
            .map(|p| p.request.clone())
    }

    /// All pending requests, oldest first
    pub fn pending_requests(&self) -> Vec<PermissionRequest> {
        let pending = self.pending();
        let mut entries: Vec<&Pending> = pending.values().collect();
        entries.sort_by_key(|p| p.seq);
        entries.into_iter().map(|p| p.request.clone()).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    pub fn reset_auto_approvals(&self) {
        self.auto().clear();
        info!("Cleared auto-approvals");
    }
}

/// Drops the pending entry when the waiting future is cancelled
struct PendingGuard<'a> {
    gate: &'a PermissionGate,
    id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.gate.pending().remove(self.id).is_some() {
            debug!(request_id = %self.id, "Permission wait abandoned");
            self.gate.emit(PermissionEvent::Resolved {
                id: self.id.to_string(),
                status: PermissionStatus::Expired,
                decision: None,
            });
        }
    }
}

fn new_request_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("perm-{}-{}", Utc::now().timestamp_millis(), &suffix[..6])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ToolCategory, ToolContext};
    use crate::error::ToolError;
    use crate::result::ToolResult;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct FakeTool {
        name: &'static str,
        approval: bool,
    }

    #[async_trait]
    impl Tool for FakeTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "fake"
        }
        fn category(&self) -> ToolCategory {
            ToolCategory::Execute
        }
        fn needs_approval(&self) -> bool {
            self.approval
        }
        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::success(json!(null)))
        }
    }

    const SAFE: FakeTool = FakeTool { name: "grep", approval: false };
    const RISKY: FakeTool = FakeTool { name: "bash", approval: true };

    async fn wait_for_pending(gate: &PermissionGate) -> PermissionRequest {
        loop {
            if let Some(req) = gate.get_latest_pending_request() {
                return req;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_no_approval_needed_never_prompts() {
        let gate = PermissionGate::default();
        let mut events = gate.subscribe();

        assert!(gate.request_permission(&SAFE, &json!({})).await);
        assert_eq!(gate.pending_count(), 0);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_approve_once() {
        let gate = Arc::new(PermissionGate::default());
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.request_permission(&RISKY, &json!({"command": "ls"})).await })
        };

        let req = wait_for_pending(&gate).await;
        assert_eq!(req.tool_name, "bash");
        assert!(req.id.starts_with("perm-"));
        assert!(gate.handle_decision(&req.id, ApprovalDecision::ApproveOnce));

        assert!(waiter.await.unwrap());
        assert_eq!(gate.pending_count(), 0);
        assert!(gate.needs_prompt(&RISKY));
    }

    #[tokio::test]
    async fn test_deny() {
        let gate = Arc::new(PermissionGate::default());
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.request_permission(&RISKY, &json!({})).await })
        };

        let req = wait_for_pending(&gate).await;
        gate.handle_decision(&req.id, ApprovalDecision::Deny);
        assert!(!waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_approve_all_is_global_and_resettable() {
        let gate = Arc::new(PermissionGate::default());
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.request_permission(&RISKY, &json!({})).await })
        };

        let req = wait_for_pending(&gate).await;
        gate.handle_decision(&req.id, ApprovalDecision::ApproveAll);
        assert!(waiter.await.unwrap());

        // Any later call to the same tool, from any thread, skips the prompt
        let mut events = gate.subscribe();
        assert!(gate.request_permission(&RISKY, &json!({"other": true})).await);
        assert!(events.try_recv().is_err());

        gate.reset_auto_approvals();
        assert!(gate.needs_prompt(&RISKY));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_denies_and_clears_pending() {
        let gate = PermissionGate::new(PermissionConfig::default().with_timeout(Duration::from_secs(60)));
        let mut events = gate.subscribe();

        assert!(!gate.request_permission(&RISKY, &json!({})).await);
        assert_eq!(gate.pending_count(), 0);

        let required = events.recv().await.unwrap();
        let PermissionEvent::Required(req) = required else {
            panic!("expected permission-required");
        };
        let resolved = events.recv().await.unwrap();
        assert_eq!(
            resolved,
            PermissionEvent::Resolved {
                id: req.id.clone(),
                status: PermissionStatus::Expired,
                decision: None
            }
        );

        // Late decision is a no-op
        assert!(!gate.handle_decision(&req.id, ApprovalDecision::ApproveOnce));
        assert!(!gate.is_auto_approved("bash"));
    }

    #[tokio::test]
    async fn test_unknown_decision_is_noop() {
        let gate = PermissionGate::default();
        assert!(!gate.handle_decision("perm-missing", ApprovalDecision::ApproveAll));
        assert!(!gate.is_auto_approved("bash"));
    }

    #[tokio::test]
    async fn test_latest_pending_and_independent_requests() {
        let gate = Arc::new(PermissionGate::default());
        let first = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.request_permission(&RISKY, &json!({"n": 1})).await })
        };
        let req1 = wait_for_pending(&gate).await;

        let second = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.request_permission(&RISKY, &json!({"n": 2})).await })
        };
        while gate.pending_count() < 2 {
            tokio::task::yield_now().await;
        }

        let latest = gate.get_latest_pending_request().unwrap();
        assert_eq!(latest.params, json!({"n": 2}));
        assert_eq!(gate.pending_requests()[0].id, req1.id);

        gate.handle_decision(&latest.id, ApprovalDecision::Deny);
        gate.handle_decision(&req1.id, ApprovalDecision::ApproveOnce);
        assert!(first.await.unwrap());
        assert!(!second.await.unwrap());
    }

    #[tokio::test]
    async fn test_abandoned_wait_removes_pending() {
        let gate = Arc::new(PermissionGate::default());
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.request_permission(&RISKY, &json!({})).await })
        };
        wait_for_pending(&gate).await;

        waiter.abort();
        let _ = waiter.await;
        assert_eq!(gate.pending_count(), 0);
    }

    #[test]
    fn test_event_wire_shape() {
        let event = PermissionEvent::Required(PermissionRequest::new("perm-1", "bash", json!({})));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "permission-required");
        assert_eq!(value["toolName"], "bash");
        assert_eq!(event.event_name(), "permission-required");
    }
}
