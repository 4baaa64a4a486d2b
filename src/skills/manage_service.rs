//! Plan builder for systemd service queries.
//!
//! Only the read-only `status` action ever produces a plan. The
//! mutating actions (start/stop/restart) pass the whitelist but are
//! then refused with a permission error, which keeps their rejection
//! distinguishable from "never heard of that service".

use crate::error::PlanError;
use crate::policy::PolicyTables;
use crate::util::shell_quote;

/// Build a one-command plan for a service action, or reject it.
pub fn build_manage_service_plan(
    action: &str,
    service: &str,
    policy: &PolicyTables,
) -> Result<Vec<String>, PlanError> {
    let action = action.trim().to_lowercase();
    let service = service.trim();

    if !policy.allows_service_action(&action) {
        return Err(PlanError::Authorization(
            "Service action not allowed".to_string(),
        ));
    }
    if !policy.allows_service(service) {
        return Err(PlanError::Authorization("Service not allowed".to_string()));
    }
    if action != "status" {
        return Err(PlanError::Permission(
            "Starting/stopping services requires explicit enable and confirmation".to_string(),
        ));
    }

    Ok(vec![format!("systemctl {action} {}", shell_quote(service))])
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_query_builds_a_plan() {
        let policy = PolicyTables::builtin();
        let plan = build_manage_service_plan("status", "sshd", &policy).unwrap();
        assert_eq!(plan, vec!["systemctl status sshd".to_string()]);
    }

    #[test]
    fn action_is_case_insensitive_but_service_is_not() {
        let policy = PolicyTables::builtin();
        let plan = build_manage_service_plan(" STATUS ", "NetworkManager", &policy).unwrap();
        assert_eq!(plan, vec!["systemctl status NetworkManager".to_string()]);

        let err = build_manage_service_plan("status", "networkmanager", &policy).unwrap_err();
        assert_eq!(err.kind(), "authorization");
    }

    #[test]
    fn mutating_actions_need_explicit_enable() {
        let policy = PolicyTables::builtin();
        for action in ["start", "stop", "restart"] {
            let err = build_manage_service_plan(action, "sshd", &policy).unwrap_err();
            assert_eq!(err.kind(), "permission", "action {action}");
            assert!(err.to_string().contains("explicit enable"));
        }
    }

    #[test]
    fn unknown_action_and_service_are_authorization_errors() {
        let policy = PolicyTables::builtin();
        let err = build_manage_service_plan("mask", "sshd", &policy).unwrap_err();
        assert_eq!(err.kind(), "authorization");

        let err = build_manage_service_plan("status", "nginx", &policy).unwrap_err();
        assert_eq!(err.kind(), "authorization");
    }
}
