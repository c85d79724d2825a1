#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod config;
pub mod cors;
pub mod error;
pub mod events;
pub mod request;
pub mod response;
pub mod route;
pub mod routing;
pub mod session;
pub mod signing;
pub mod template;
pub mod view;

// Re-export the primary surface
pub use config::Config;
pub use cors::{Cors, EmptyCorsValue};
pub use error::{HttpError, abort};
pub use events::Events;
pub use request::Request;
pub use response::{CookieOptions, Response, redirect};
pub use route::{Handler, HandlerFuture, Route};
pub use routing::{MatchError, PathArg, PathArgs, Rule, RuleMap, RoutingError};
pub use session::{Session, SessionInterface};
pub use signing::{SigningError, TimedSerializer};
pub use template::{TemplateEngine, TemplateError};
pub use view::View;

// Method and status types views commonly need
pub use http::{Method, StatusCode};
