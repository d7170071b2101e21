//! Alias registration indexer for the eCash (XEC) chain.
//!
//! This crate scans on-chain transactions for the alias protocol marker, validates
//! the registrations it finds against the protocol's application rules (fee schedule,
//! alias syntax, address provenance), and maintains a canonical, deterministic
//! `alias -> address` registry that stays stable under new blocks, confirmations,
//! and reorgs.
//!
//! The [`alias`] module is the validation and canonicalization engine; [`chronik`]
//! is the client for the Chronik indexer node that supplies transaction history and
//! live chain notifications; [`sync`] drives the engine from that feed; [`storage`]
//! persists registry snapshots so queries can be served across restarts.

pub mod alias;
pub mod chronik;
pub mod storage;
pub mod sync;
