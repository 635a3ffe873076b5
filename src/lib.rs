//! RSS post scheduler library.
//!
//! A worker that polls a scheduled-posts document in a GitLab repository,
//! publishes due posts by appending entries to RSS feed files in their
//! target repositories, and records the outcome back in the source document.

pub mod config;
pub mod feed;
pub mod gitlab;
pub mod model;
pub mod scheduler;
pub mod store;
pub mod timing;
pub mod web;
pub mod workflow;
