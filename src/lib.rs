//! tunesweep library - shared modules for all binaries.

pub mod classify;
pub mod export;
pub mod grouping;
pub mod models;
pub mod normalize;
pub mod organize;
pub mod pipeline;
pub mod progress;
pub mod ranking;
pub mod removal;
pub mod safety;
pub mod scanner;
