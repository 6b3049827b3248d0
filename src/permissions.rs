//! Permission engine
//!
//! Pure decision functions mapping (actor, action, owner) to allow or deny.
//! Every resource has one static policy built from small predicates and
//! combinators; services call [`authorize`] after loading the target record
//! and before mutating anything.
//!
//! The rules reproduced here are deliberately uneven:
//! - category writes need an elevated actor (staff, admin or superuser)
//! - news update/delete need the author or an elevated actor
//! - comment creation is open to everyone except managers
//! - comment update/delete need `is_admin`; staff and superusers alone do not qualify
//! - user records are superuser territory, admins may do everything but update

use crate::models::User;
use axum::http::Method;
use once_cell::sync::Lazy;
use std::fmt;

/// Reason given when no more specific message applies.
pub const GENERIC_DENIAL: &str = "You do not have permission to perform this action.";

/// Reason given to an admin (non-superuser) attempting to update a user.
pub const ADMIN_UPDATE_DENIAL: &str = "Admins cannot update users.";

/// Action category of a request. Listing is a `Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Read, Action::Create, Action::Update, Action::Delete];

    /// Map an HTTP method onto its action category
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET | Method::HEAD | Method::OPTIONS => Some(Action::Read),
            Method::POST => Some(Action::Create),
            Method::PUT | Method::PATCH => Some(Action::Update),
            Method::DELETE => Some(Action::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Resources guarded by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Category,
    News,
    Comment,
    User,
}

/// Everything a predicate may look at.
#[derive(Debug, Clone, Copy)]
pub struct AccessContext<'a> {
    pub actor: &'a User,
    pub action: Action,
    /// Author of the target record, when the record has one
    pub owner_id: Option<i64>,
}

impl<'a> AccessContext<'a> {
    pub fn new(actor: &'a User, action: Action) -> Self {
        Self {
            actor,
            action,
            owner_id: None,
        }
    }

    pub fn with_owner(mut self, owner_id: i64) -> Self {
        self.owner_id = Some(owner_id);
        self
    }
}

/// Result of evaluating a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
    /// The predicate does not govern this action
    Abstain,
}

impl Decision {
    pub fn deny(reason: impl Into<String>) -> Self {
        Decision::Deny {
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Denial surfaced to callers as a 403.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct PermissionDenied {
    pub reason: String,
}

/// A pure permission check.
pub trait Predicate: Send + Sync {
    fn evaluate(&self, ctx: &AccessContext<'_>) -> Decision;
}

fn allow_if(condition: bool) -> Decision {
    if condition {
        Decision::Allow
    } else {
        Decision::deny(GENERIC_DENIAL)
    }
}

// ============================================================================
// Building blocks
// ============================================================================

/// Any authenticated actor. Unauthenticated requests never reach the engine.
pub struct Authenticated;

impl Predicate for Authenticated {
    fn evaluate(&self, _ctx: &AccessContext<'_>) -> Decision {
        Decision::Allow
    }
}

/// Staff, admin or superuser
pub struct Elevated;

impl Predicate for Elevated {
    fn evaluate(&self, ctx: &AccessContext<'_>) -> Decision {
        allow_if(ctx.actor.is_elevated())
    }
}

/// The actor authored the target record
pub struct IsOwner;

impl Predicate for IsOwner {
    fn evaluate(&self, ctx: &AccessContext<'_>) -> Decision {
        allow_if(ctx.owner_id.is_some_and(|owner| ctx.actor.owns(owner)))
    }
}

/// `is_admin` specifically; staff and superuser flags do not count
pub struct IsAdmin;

impl Predicate for IsAdmin {
    fn evaluate(&self, ctx: &AccessContext<'_>) -> Decision {
        allow_if(ctx.actor.is_admin)
    }
}

/// Anyone without the manager flag, whatever else they hold
pub struct NotManager;

impl Predicate for NotManager {
    fn evaluate(&self, ctx: &AccessContext<'_>) -> Decision {
        allow_if(!ctx.actor.is_manager)
    }
}

/// Superusers may do anything; admins anything except update.
pub struct AdminNoUpdate;

impl Predicate for AdminNoUpdate {
    fn evaluate(&self, ctx: &AccessContext<'_>) -> Decision {
        let actor = ctx.actor;
        if actor.is_superuser {
            Decision::Allow
        } else if actor.is_admin && ctx.action == Action::Update {
            Decision::deny(ADMIN_UPDATE_DENIAL)
        } else {
            allow_if(actor.is_admin)
        }
    }
}

// ============================================================================
// Combinators
// ============================================================================

/// Allows when any inner predicate allows.
///
/// Otherwise reports the first explicit denial, or the generic denial when
/// every inner predicate abstained.
pub struct AnyOf(pub Vec<Box<dyn Predicate>>);

impl AnyOf {
    pub fn new(predicates: Vec<Box<dyn Predicate>>) -> Self {
        Self(predicates)
    }
}

impl Predicate for AnyOf {
    fn evaluate(&self, ctx: &AccessContext<'_>) -> Decision {
        let mut first_denial = None;
        for predicate in &self.0 {
            match predicate.evaluate(ctx) {
                Decision::Allow => return Decision::Allow,
                deny @ Decision::Deny { .. } => {
                    first_denial.get_or_insert(deny);
                }
                Decision::Abstain => {}
            }
        }
        first_denial.unwrap_or_else(|| Decision::deny(GENERIC_DENIAL))
    }
}

/// Restricts a predicate to some actions and abstains on the rest.
pub struct Only {
    actions: Vec<Action>,
    inner: Box<dyn Predicate>,
}

impl Only {
    pub fn new(actions: &[Action], inner: impl Predicate + 'static) -> Self {
        Self {
            actions: actions.to_vec(),
            inner: Box::new(inner),
        }
    }
}

impl Predicate for Only {
    fn evaluate(&self, ctx: &AccessContext<'_>) -> Decision {
        if self.actions.contains(&ctx.action) {
            self.inner.evaluate(ctx)
        } else {
            Decision::Abstain
        }
    }
}

/// Replaces the denial reason with an action-specific message.
pub struct Explain {
    inner: Box<dyn Predicate>,
    messages: Vec<(Action, &'static str)>,
}

impl Explain {
    pub fn new(inner: impl Predicate + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            messages: Vec::new(),
        }
    }

    pub fn on(mut self, action: Action, message: &'static str) -> Self {
        self.messages.push((action, message));
        self
    }
}

impl Predicate for Explain {
    fn evaluate(&self, ctx: &AccessContext<'_>) -> Decision {
        match self.inner.evaluate(ctx) {
            Decision::Deny { reason } => {
                let message = self
                    .messages
                    .iter()
                    .find(|(action, _)| *action == ctx.action)
                    .map(|(_, message)| message.to_string());
                Decision::Deny {
                    reason: message.unwrap_or(reason),
                }
            }
            other => other,
        }
    }
}

// ============================================================================
// Policy table
// ============================================================================

struct Policies {
    category: Box<dyn Predicate>,
    news: Box<dyn Predicate>,
    comment: Box<dyn Predicate>,
    user: Box<dyn Predicate>,
}

static POLICIES: Lazy<Policies> = Lazy::new(|| {
    use Action::*;

    let category = AnyOf::new(vec![
        Box::new(Only::new(&[Read], Authenticated)),
        Box::new(
            Explain::new(Only::new(&[Create, Update, Delete], Elevated))
                .on(Create, "You cannot create categories")
                .on(Update, "You cannot update categories")
                .on(Delete, "You cannot delete categories"),
        ),
    ]);

    let news = AnyOf::new(vec![
        Box::new(Only::new(&[Read, Create], Authenticated)),
        Box::new(
            Explain::new(Only::new(
                &[Update, Delete],
                AnyOf::new(vec![Box::new(IsOwner), Box::new(Elevated)]),
            ))
            .on(Update, "You can only update your own news")
            .on(Delete, "You can only delete your own news"),
        ),
    ]);

    let comment = AnyOf::new(vec![
        Box::new(Only::new(&[Read], Authenticated)),
        Box::new(
            Explain::new(Only::new(&[Create], NotManager))
                .on(Create, "You cannot create comments"),
        ),
        Box::new(
            Explain::new(Only::new(&[Update, Delete], IsAdmin))
                .on(Update, "You cannot update comments")
                .on(Delete, "You cannot delete comments"),
        ),
    ]);

    Policies {
        category: Box::new(category),
        news: Box::new(news),
        comment: Box::new(comment),
        user: Box::new(AdminNoUpdate),
    }
});

fn policy(resource: Resource) -> &'static dyn Predicate {
    let policies = &*POLICIES;
    match resource {
        Resource::Category => policies.category.as_ref(),
        Resource::News => policies.news.as_ref(),
        Resource::Comment => policies.comment.as_ref(),
        Resource::User => policies.user.as_ref(),
    }
}

/// Evaluate the policy for `resource`.
pub fn evaluate(resource: Resource, ctx: &AccessContext<'_>) -> Decision {
    policy(resource).evaluate(ctx)
}

/// Evaluate the policy for `resource`, turning a denial into an error.
pub fn authorize(resource: Resource, ctx: &AccessContext<'_>) -> Result<(), PermissionDenied> {
    match evaluate(resource, ctx) {
        Decision::Allow => Ok(()),
        Decision::Deny { reason } => {
            tracing::debug!(
                "Denied {} on {:?} for user {}: {}",
                ctx.action,
                resource,
                ctx.actor.id,
                reason
            );
            Err(PermissionDenied { reason })
        }
        Decision::Abstain => Err(PermissionDenied {
            reason: GENERIC_DENIAL.to_string(),
        }),
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    struct Roles {
        staff: bool,
        admin: bool,
        manager: bool,
        superuser: bool,
    }

    fn roles_strategy() -> impl Strategy<Value = Roles> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(staff, admin, manager, superuser)| Roles {
                staff,
                admin,
                manager,
                superuser,
            },
        )
    }

    fn action_strategy() -> impl Strategy<Value = Action> {
        prop_oneof![
            Just(Action::Read),
            Just(Action::Create),
            Just(Action::Update),
            Just(Action::Delete),
        ]
    }

    fn write_strategy() -> impl Strategy<Value = Action> {
        prop_oneof![Just(Action::Update), Just(Action::Delete)]
    }

    fn build(id: i64, roles: &Roles) -> User {
        let mut user = User::new(format!("user{}", id), None, "hash".to_string());
        user.id = id;
        user.is_staff = roles.staff;
        user.is_admin = roles.admin;
        user.is_manager = roles.manager;
        user.is_superuser = roles.superuser;
        user
    }

    proptest! {
        #[test]
        fn managers_never_create_comments(roles in roles_strategy()) {
            let mut user = build(1, &roles);
            user.is_manager = true;
            let ctx = AccessContext::new(&user, Action::Create);
            prop_assert!(authorize(Resource::Comment, &ctx).is_err());
        }

        #[test]
        fn non_managers_always_create_comments(roles in roles_strategy()) {
            let mut user = build(1, &roles);
            user.is_manager = false;
            let ctx = AccessContext::new(&user, Action::Create);
            prop_assert!(authorize(Resource::Comment, &ctx).is_ok());
        }

        #[test]
        fn news_writes_need_author_or_elevated(
            roles in roles_strategy(),
            actor_id in 1i64..5,
            owner_id in 1i64..5,
            action in write_strategy(),
        ) {
            let user = build(actor_id, &roles);
            let ctx = AccessContext::new(&user, action).with_owner(owner_id);
            let expected = actor_id == owner_id || roles.staff || roles.admin || roles.superuser;
            prop_assert_eq!(authorize(Resource::News, &ctx).is_ok(), expected);
        }

        #[test]
        fn comment_writes_need_admin_flag(
            roles in roles_strategy(),
            actor_id in 1i64..5,
            owner_id in 1i64..5,
            action in write_strategy(),
        ) {
            let user = build(actor_id, &roles);
            let ctx = AccessContext::new(&user, action).with_owner(owner_id);
            prop_assert_eq!(authorize(Resource::Comment, &ctx).is_ok(), roles.admin);
        }

        #[test]
        fn category_writes_need_elevated(roles in roles_strategy(), action in action_strategy()) {
            let user = build(1, &roles);
            let ctx = AccessContext::new(&user, action);
            let expected = action == Action::Read || roles.staff || roles.admin || roles.superuser;
            prop_assert_eq!(authorize(Resource::Category, &ctx).is_ok(), expected);
        }

        #[test]
        fn admins_never_update_users(roles in roles_strategy(), target in 1i64..5) {
            let mut user = build(2, &roles);
            user.is_admin = true;
            user.is_superuser = false;
            let ctx = AccessContext::new(&user, Action::Update).with_owner(target);
            let denied = authorize(Resource::User, &ctx).expect_err("admin update must be denied");
            prop_assert_eq!(denied.reason, ADMIN_UPDATE_DENIAL);
        }

        #[test]
        fn user_gate_matches_flags(roles in roles_strategy(), action in action_strategy()) {
            let user = build(1, &roles);
            let ctx = AccessContext::new(&user, action);
            let expected = roles.superuser || (roles.admin && action != Action::Update);
            prop_assert_eq!(authorize(Resource::User, &ctx).is_ok(), expected);
        }

        #[test]
        fn reads_never_depend_on_ownership(
            roles in roles_strategy(),
            owner_id in proptest::option::of(1i64..5),
        ) {
            let user = build(1, &roles);
            let mut ctx = AccessContext::new(&user, Action::Read);
            ctx.owner_id = owner_id;
            prop_assert!(authorize(Resource::News, &ctx).is_ok());
            prop_assert!(authorize(Resource::Comment, &ctx).is_ok());
            prop_assert!(authorize(Resource::Category, &ctx).is_ok());
        }
    }
}
