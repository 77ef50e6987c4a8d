use std::collections::HashMap;

use super::Principal;

pub const SIGN_IN_PATH: &str = "/sign-in";

/// Authentication state a route demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requirement {
    Public,
    Authenticated,
}

/// Pages redirect anonymous callers to sign-in; APIs answer 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    Page,
    Api,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePolicy {
    pub requirement: Requirement,
    pub kind: RouteKind,
}

impl RoutePolicy {
    pub const fn public_page() -> Self { Self { requirement: Requirement::Public, kind: RouteKind::Page } }
    pub const fn protected_page() -> Self { Self { requirement: Requirement::Authenticated, kind: RouteKind::Page } }
    pub const fn public_api() -> Self { Self { requirement: Requirement::Public, kind: RouteKind::Api } }
    pub const fn protected_api() -> Self { Self { requirement: Requirement::Authenticated, kind: RouteKind::Api } }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
    Redirect { location: &'static str },
}

/// Route → requirement table, fixed at startup.
#[derive(Debug, Clone)]
pub struct PageAccessPolicy {
    routes: HashMap<String, RoutePolicy>,
    fallback: RoutePolicy,
}

impl Default for PageAccessPolicy {
    fn default() -> Self {
        Self { routes: HashMap::new(), fallback: RoutePolicy::public_page() }
    }
}

impl PageAccessPolicy {
    pub fn new(fallback: RoutePolicy) -> Self {
        Self { routes: HashMap::new(), fallback }
    }

    pub fn route(mut self, path: &str, policy: RoutePolicy) -> Self {
        self.routes.insert(normalize(path).to_string(), policy);
        self
    }

    pub fn policy_for(&self, path: &str) -> RoutePolicy {
        self.routes.get(normalize(path)).copied().unwrap_or(self.fallback)
    }
}

// "/inventory/check-in/" and "/inventory/check-in" are the same route
fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Decide what happens to a request. Pure: principal presence and route policy only.
/// Stale sessions must already have been resolved to `None`.
pub fn decide(principal: Option<&Principal>, policy: RoutePolicy) -> AccessDecision {
    match (policy.requirement, principal) {
        (Requirement::Public, _) => AccessDecision::Allow,
        (Requirement::Authenticated, Some(_)) => AccessDecision::Allow,
        (Requirement::Authenticated, None) => match policy.kind {
            RouteKind::Page => AccessDecision::Redirect { location: SIGN_IN_PATH },
            RouteKind::Api => AccessDecision::Deny,
        },
    }
}
