//! Skill plan builders: a resolved intent becomes a list of command
//! strings the execution gate is willing to look at.
//!
//! Builders never execute anything. Every whitelist miss is a typed
//! [`PlanError`](crate::error::PlanError) so the caller can tell a
//! rejected request from a malformed one; nothing is silently
//! dropped.

pub mod manage_service;
pub mod open_app;
pub mod run_command;

pub use manage_service::build_manage_service_plan;
pub use open_app::build_open_app_plan;
pub use run_command::build_run_command_plan;

use crate::error::PlanError;
use crate::intent::{Intent, IntentKind};
use crate::policy::PolicyTables;

/// Dispatch a resolved intent to its plan builder. Missing entities
/// become empty strings and fail the builder's own checks.
pub fn plan_for_intent(intent: &Intent, policy: &PolicyTables) -> Result<Vec<String>, PlanError> {
    let entity = |key: &str| {
        intent
            .entities
            .get(key)
            .map(String::as_str)
            .unwrap_or_default()
    };
    match intent.name {
        IntentKind::OpenApp => build_open_app_plan(entity("app"), policy),
        IntentKind::ManageService => {
            build_manage_service_plan(entity("action"), entity("service"), policy)
        }
        IntentKind::RunCommand => build_run_command_plan(entity("cmd"), policy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn dispatch_reaches_every_builder() {
        let policy = PolicyTables::builtin();

        let open = Intent {
            name: IntentKind::OpenApp,
            entities: HashMap::from([("app".to_string(), "firefox".to_string())]),
            confidence: 0.78,
        };
        assert_eq!(plan_for_intent(&open, &policy).unwrap().len(), 1);

        let status = Intent {
            name: IntentKind::ManageService,
            entities: HashMap::from([
                ("action".to_string(), "status".to_string()),
                ("service".to_string(), "sshd".to_string()),
            ]),
            confidence: 0.78,
        };
        assert_eq!(
            plan_for_intent(&status, &policy).unwrap(),
            vec!["systemctl status sshd".to_string()]
        );

        let run = Intent {
            name: IntentKind::RunCommand,
            entities: HashMap::from([("cmd".to_string(), "df -h".to_string())]),
            confidence: 0.78,
        };
        assert_eq!(
            plan_for_intent(&run, &policy).unwrap(),
            vec!["df -h".to_string()]
        );
    }

    #[test]
    fn missing_entity_fails_the_builder_not_the_dispatch() {
        let policy = PolicyTables::builtin();
        let bare = Intent {
            name: IntentKind::OpenApp,
            entities: HashMap::new(),
            confidence: 0.78,
        };
        let err = plan_for_intent(&bare, &policy).unwrap_err();
        assert_eq!(err.kind(), "authorization");
    }
}
