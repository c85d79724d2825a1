#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

// Exercised from the integration tests only.
#[cfg(test)]
use tempfile as _;

pub mod app;
pub mod serve;
pub mod testing;

pub use app::{App, FILE_CACHE_CONTROL};
pub use serve::{DEFAULT_HOST, DEFAULT_PORT, resolve_addr, serve};
pub use testing::TestClient;

// The core types applications interact with, re-exported so most
// users only need one import.
pub use simplerr_core::{
    Config, Cors, HttpError, Method, Request, Response, Route, Session, StatusCode, View, abort,
    redirect,
};
