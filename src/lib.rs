//! Sufra - Restaurant Ordering Platform Payment Core
//!
//! This crate implements the asynchronous payment confirmation and
//! order-materialization pipeline: checkout creation, pre-confirmation
//! amount adjustment, webhook reconciliation, and status polling.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
