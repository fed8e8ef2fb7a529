//! End-to-end corpus pipelines: analysis, comparison and the overlap service

#[path = "../common/mod.rs"]
mod common;

mod candidates;
mod compare;
mod service;
