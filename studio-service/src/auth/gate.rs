//! Per-resource authorization decisions.
//!
//! The gate only reads relationship facts and returns a [`Decision`]. It
//! never caches a fact across calls and never touches the transport.

use service_core::error::AppError;
use std::fmt;
use std::sync::Arc;

use super::session::Identity;
use crate::models::{StudioInstructor, UserType};
use crate::store::StudioStore;

/// The resource a request targets, built from path and query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceScope {
    /// Instructor acting on a studio.
    Studio { studio_id: Option<String> },
    /// Instructor acting on a client record owned by a studio.
    StudioClient {
        studio_id: Option<String>,
        client_id: String,
    },
    /// Studio admin acting on an instructor membership row.
    StudioInstructorLink { link_id: String },
    /// Instructor acting on a student membership row.
    StudioStudentLink { link_id: String },
    /// Student acting on their own record.
    OwnRecord { target_id: String },
}

impl fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceScope::Studio { studio_id } => {
                write!(f, "studio:{}", studio_id.as_deref().unwrap_or("-"))
            }
            ResourceScope::StudioClient {
                studio_id,
                client_id,
            } => write!(
                f,
                "studio:{}/client:{}",
                studio_id.as_deref().unwrap_or("-"),
                client_id
            ),
            ResourceScope::StudioInstructorLink { link_id } => {
                write!(f, "studio_instructor:{}", link_id)
            }
            ResourceScope::StudioStudentLink { link_id } => write!(f, "studio_student:{}", link_id),
            ResourceScope::OwnRecord { target_id } => write!(f, "self:{}", target_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Authenticated but lacking the relationship.
    Forbidden,
    /// The scope is missing the id it needs.
    MissingScope,
    /// A relationship row named by the scope does not exist.
    NotFound,
}

/// What the caller is allowed to act as, once authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub identity: Identity,
    /// Studio the decision was made against, when the scope has one.
    pub studio_id: Option<i64>,
    /// Membership that granted access, for instructor scopes.
    pub membership: Option<StudioInstructor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Authorized(Actor),
    Denied(DenialReason),
}

impl Decision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Decision::Authorized(_))
    }

    /// Turn a denial into the matching boundary error.
    pub fn into_result(self) -> Result<Actor, AppError> {
        match self {
            Decision::Authorized(actor) => Ok(actor),
            Decision::Denied(DenialReason::Forbidden) => Err(AppError::Forbidden(
                anyhow::anyhow!("You do not have access to this resource"),
            )),
            Decision::Denied(DenialReason::MissingScope) => Err(AppError::BadRequest(
                anyhow::anyhow!("Missing resource identifier"),
            )),
            Decision::Denied(DenialReason::NotFound) => {
                Err(AppError::NotFound(anyhow::anyhow!("Resource not found")))
            }
        }
    }
}

#[derive(Clone)]
pub struct AuthorizationGate {
    store: Arc<dyn StudioStore>,
}

impl AuthorizationGate {
    pub fn new(store: Arc<dyn StudioStore>) -> Self {
        Self { store }
    }

    /// Decide whether `identity` may act on `scope`.
    ///
    /// Store failures come back as `Err` and are never turned into an allow.
    pub async fn authorize(
        &self,
        identity: &Identity,
        scope: &ResourceScope,
    ) -> Result<Decision, AppError> {
        let decision = match scope {
            ResourceScope::Studio { studio_id }
            | ResourceScope::StudioClient { studio_id, .. } => {
                self.studio_access(identity, studio_id.as_deref()).await?
            }
            ResourceScope::StudioInstructorLink { link_id } => {
                self.instructor_link_access(identity, link_id).await?
            }
            ResourceScope::StudioStudentLink { link_id } => {
                self.student_link_access(identity, link_id).await?
            }
            ResourceScope::OwnRecord { target_id } => own_record_access(identity, target_id),
        };

        match &decision {
            Decision::Authorized(_) => {
                tracing::debug!(user_id = identity.user_id, scope = %scope, "Access granted");
            }
            Decision::Denied(reason) => {
                tracing::warn!(
                    user_id = identity.user_id,
                    user_type = %identity.user_type,
                    scope = %scope,
                    reason = ?reason,
                    "Access denied"
                );
            }
        }

        Ok(decision)
    }

    async fn studio_access(
        &self,
        identity: &Identity,
        studio_id: Option<&str>,
    ) -> Result<Decision, AppError> {
        let Some(studio_id) = studio_id.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Decision::Denied(DenialReason::MissingScope));
        };

        if identity.user_type != UserType::Instructor {
            return Ok(Decision::Denied(DenialReason::Forbidden));
        }

        // An id that cannot name a studio cannot have a fact either.
        let Ok(studio_id) = studio_id.parse::<i64>() else {
            return Ok(Decision::Denied(DenialReason::Forbidden));
        };

        self.membership_decision(identity, studio_id, false).await
    }

    async fn membership_decision(
        &self,
        identity: &Identity,
        studio_id: i64,
        require_admin: bool,
    ) -> Result<Decision, AppError> {
        let membership = self
            .store
            .find_studio_instructor(identity.user_id, studio_id)
            .await?;

        match membership {
            Some(m) if m.is_approved && (m.is_admin || !require_admin) => {
                Ok(Decision::Authorized(Actor {
                    identity: identity.clone(),
                    studio_id: Some(studio_id),
                    membership: Some(m),
                }))
            }
            _ => Ok(Decision::Denied(DenialReason::Forbidden)),
        }
    }

    async fn instructor_link_access(
        &self,
        identity: &Identity,
        link_id: &str,
    ) -> Result<Decision, AppError> {
        let Some(link_id) = parse_id(link_id) else {
            return Ok(Decision::Denied(DenialReason::MissingScope));
        };
        if identity.user_type != UserType::Instructor {
            return Ok(Decision::Denied(DenialReason::Forbidden));
        }

        match self.store.find_studio_instructor_by_id(link_id).await? {
            Some(link) => {
                self.membership_decision(identity, link.studio_id, true)
                    .await
            }
            None => Ok(Decision::Denied(DenialReason::NotFound)),
        }
    }

    async fn student_link_access(
        &self,
        identity: &Identity,
        link_id: &str,
    ) -> Result<Decision, AppError> {
        let Some(link_id) = parse_id(link_id) else {
            return Ok(Decision::Denied(DenialReason::MissingScope));
        };
        if identity.user_type != UserType::Instructor {
            return Ok(Decision::Denied(DenialReason::Forbidden));
        }

        match self.store.find_studio_student_by_id(link_id).await? {
            Some(link) => {
                self.membership_decision(identity, link.studio_id, false)
                    .await
            }
            None => Ok(Decision::Denied(DenialReason::NotFound)),
        }
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

fn own_record_access(identity: &Identity, target_id: &str) -> Decision {
    if identity.user_type == UserType::Student && identity.user_id.to_string() == target_id.trim()
    {
        Decision::Authorized(Actor {
            identity: identity.clone(),
            studio_id: None,
            membership: None,
        })
    } else {
        Decision::Denied(DenialReason::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn instructor(id: i64) -> Identity {
        Identity {
            email: format!("instructor{}@studio.test", id),
            user_type: UserType::Instructor,
            user_id: id,
        }
    }

    fn student(id: i64) -> Identity {
        Identity {
            email: format!("student{}@studio.test", id),
            user_type: UserType::Student,
            user_id: id,
        }
    }

    fn studio(id: &str) -> ResourceScope {
        ResourceScope::Studio {
            studio_id: Some(id.to_string()),
        }
    }

    fn setup() -> (AuthorizationGate, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (AuthorizationGate::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_instructor_needs_studio_fact() {
        let (gate, store) = setup();
        let kim = instructor(10);

        let decision = gate.authorize(&kim, &studio("1")).await.unwrap();
        assert_eq!(decision, Decision::Denied(DenialReason::Forbidden));

        store.link_instructor(1, 10, true, false).unwrap();
        let decision = gate.authorize(&kim, &studio("1")).await.unwrap();
        assert!(decision.is_authorized());

        // A fact for another studio grants nothing here.
        let decision = gate.authorize(&kim, &studio("2")).await.unwrap();
        assert_eq!(decision, Decision::Denied(DenialReason::Forbidden));
    }

    #[tokio::test]
    async fn test_revocation_applies_on_next_call() {
        let (gate, store) = setup();
        let kim = instructor(10);
        store.link_instructor(1, 10, true, false).unwrap();
        assert!(gate.authorize(&kim, &studio("1")).await.unwrap().is_authorized());

        store.unlink_instructor(1, 10).unwrap();
        assert_eq!(
            gate.authorize(&kim, &studio("1")).await.unwrap(),
            Decision::Denied(DenialReason::Forbidden)
        );
    }

    #[tokio::test]
    async fn test_unapproved_membership_is_forbidden() {
        let (gate, store) = setup();
        let link = store.link_instructor(1, 10, false, false).unwrap();
        assert_eq!(
            gate.authorize(&instructor(10), &studio("1")).await.unwrap(),
            Decision::Denied(DenialReason::Forbidden)
        );

        store.set_studio_instructor_approval(link.id, true).await.unwrap();
        assert!(gate
            .authorize(&instructor(10), &studio("1"))
            .await
            .unwrap()
            .is_authorized());
    }

    #[tokio::test]
    async fn test_missing_studio_id_is_checked_before_lookup() {
        let (gate, store) = setup();
        store.set_unavailable(true);

        for scope in [
            ResourceScope::Studio { studio_id: None },
            studio("  "),
            ResourceScope::StudioClient {
                studio_id: None,
                client_id: "3".to_string(),
            },
        ] {
            let decision = gate.authorize(&instructor(10), &scope).await.unwrap();
            assert_eq!(decision, Decision::Denied(DenialReason::MissingScope));
        }
    }

    #[tokio::test]
    async fn test_students_cannot_act_on_studios() {
        let (gate, store) = setup();
        store.link_instructor(1, 10, true, true).unwrap();
        assert_eq!(
            gate.authorize(&student(10), &studio("1")).await.unwrap(),
            Decision::Denied(DenialReason::Forbidden)
        );
    }

    #[tokio::test]
    async fn test_client_scope_delegates_to_studio() {
        let (gate, store) = setup();
        store.link_instructor(1, 10, true, false).unwrap();

        // The client need not exist; existence is the caller's concern.
        let scope = ResourceScope::StudioClient {
            studio_id: Some("1".to_string()),
            client_id: "999".to_string(),
        };
        let actor = gate
            .authorize(&instructor(10), &scope)
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(actor.studio_id, Some(1));
    }

    #[tokio::test]
    async fn test_student_self_scope_compares_ids() {
        let (gate, _) = setup();
        let me = student(42);

        let own = ResourceScope::OwnRecord {
            target_id: "42".to_string(),
        };
        let other = ResourceScope::OwnRecord {
            target_id: "43".to_string(),
        };
        assert!(gate.authorize(&me, &own).await.unwrap().is_authorized());
        assert_eq!(
            gate.authorize(&me, &other).await.unwrap(),
            Decision::Denied(DenialReason::Forbidden)
        );

        // Same id, wrong role.
        assert_eq!(
            gate.authorize(&instructor(42), &own).await.unwrap(),
            Decision::Denied(DenialReason::Forbidden)
        );
    }

    #[tokio::test]
    async fn test_instructor_link_requires_studio_admin() {
        let (gate, store) = setup();
        let pending = store.link_instructor(1, 20, false, false).unwrap();
        let scope = ResourceScope::StudioInstructorLink {
            link_id: pending.id.to_string(),
        };

        store.link_instructor(1, 10, true, false).unwrap();
        assert_eq!(
            gate.authorize(&instructor(10), &scope).await.unwrap(),
            Decision::Denied(DenialReason::Forbidden)
        );

        store.link_instructor(1, 11, true, true).unwrap();
        assert!(gate
            .authorize(&instructor(11), &scope)
            .await
            .unwrap()
            .is_authorized());
    }

    #[tokio::test]
    async fn test_missing_link_is_not_found() {
        let (gate, _) = setup();
        let scope = ResourceScope::StudioStudentLink {
            link_id: "12345".to_string(),
        };
        assert_eq!(
            gate.authorize(&instructor(10), &scope).await.unwrap(),
            Decision::Denied(DenialReason::NotFound)
        );
    }

    #[tokio::test]
    async fn test_store_failure_is_an_error_not_a_decision() {
        let (gate, store) = setup();
        store.link_instructor(1, 10, true, false).unwrap();
        store.set_unavailable(true);

        let result = gate.authorize(&instructor(10), &studio("1")).await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
    }

    #[test]
    fn test_denials_map_to_boundary_errors() {
        let forbidden = Decision::Denied(DenialReason::Forbidden).into_result();
        assert!(matches!(forbidden, Err(AppError::Forbidden(_))));
        let missing = Decision::Denied(DenialReason::MissingScope).into_result();
        assert!(matches!(missing, Err(AppError::BadRequest(_))));
    }
}
