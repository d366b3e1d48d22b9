//! remsync Core - Domain logic and collaborator contracts
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `EntryCore`, `DesiredEntry`, `ServerEntry`
//! - **Newtypes** - `DocumentId`, `SourceId`, `Version`
//! - **Port definitions** - Traits for adapters: `SourceStore`, `TargetApi`, `KvStore`
//! - **Configuration** - `SyncOptions`, `SyncMode`, fixed service constants
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces for the Source storage client, the Target
//! document API, and the persistent key/value store; concrete clients live
//! outside this workspace and are injected as `Arc<dyn Trait>`.

pub mod config;
pub mod domain;
pub mod ports;
