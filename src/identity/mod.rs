//! Request identity: who is calling and whether they may reach a route.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod provider;
mod request_context;
mod authorizer;

pub use principal::Principal;
pub use session::{CookieSettings, IdentityError, Resolution, SessionCredentials, SessionResolver};
pub use provider::{IdentityProvider, SessionTokens};
pub use request_context::RequestContext;
pub use authorizer::{decide, AccessDecision, PageAccessPolicy, Requirement, RouteKind, RoutePolicy, SIGN_IN_PATH};
