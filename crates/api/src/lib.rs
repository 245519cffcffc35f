//! Control-plane HTTP surface and process wiring for the conveyor job queue.

pub mod app;
