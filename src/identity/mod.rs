//! Session identity for the admin area: claims, the token codec, the cookie gateway,
//! the access guard and password login.
//! Keep the public surface thin and split implementation across sub-modules.

mod claims;
mod cookie;
mod guard;
mod provider;
mod session;

pub use claims::{Role, SessionClaim};
pub use cookie::{parse_cookie, CookieGateway, SESSION_COOKIE};
pub use guard::{authorize, decide, inspect, intercept, is_protected_area, require_admin, AccessDecision, TokenState, ADMIN_HOME, LOGIN_PATH};
pub use provider::{LocalAuthProvider, LoginRequest, LoginResponse};
pub use session::{SessionCodec, SignedToken, SESSION_MAX_AGE};
