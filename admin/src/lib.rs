//! Border-router admin surface.
//!
//! A one-page HTTP listener in the style of an embedded httpd: every
//! path serves the status page, and a path of the shape `/s<d>n<d>` is
//! additionally an interval-change command aimed at one node. Commands
//! are executed by the node's dispatcher, never by the listener itself.

pub mod config;
pub mod error;
pub mod page;
pub mod request;
pub mod server;

pub use {
    config::AdminConfig,
    error::{AdminError, Result},
    page::{render_status_page, PageBuilder},
    request::{parse_path, AdminCommand},
    server::{AdminRequest, AdminServer},
};
