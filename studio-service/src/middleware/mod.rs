pub mod edge;
pub mod session;

pub use edge::{classify_route, edge_filter_middleware, RouteClass};
pub use session::{
    cleared_session_cookie, require_param, session_cookie, CurrentUser, AUTH_COOKIE,
};
