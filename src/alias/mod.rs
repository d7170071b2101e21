//! Alias validation and canonicalization engine.
//!
//! This module turns a raw, unordered stream of candidate alias transactions
//! (confirmed and unconfirmed) into the set of valid registrations and the single
//! canonical owner per alias text. The pipeline is one-directional:
//!
//! raw transactions -> decoded candidates ([`decode`]) -> filtered candidates
//! ([`filter`]) -> judged candidates ([`validate`]) -> canonical order and
//! conflict resolution ([`registry`]).
//!
//! [`engine`] owns the candidate history, ingests chain events (new transaction,
//! confirmation, reorg eviction), and rebuilds the registry deterministically
//! after every batch. The registry is always a pure function of the current
//! candidate set; it is never patched incrementally.

pub mod candidate;
pub mod constants;
pub mod decode;
pub mod engine;
pub mod filter;
pub mod registry;
pub mod validate;

pub use candidate::{AliasCandidate, CandidateRecord, Confirmation, Height, ScriptAddress};
pub use constants::AliasProtocol;
pub use decode::{DecodeError, decode_alias_tx};
pub use engine::{AliasEngine, ChainEvent, RegistryHandle, run_engine_worker};
pub use filter::filter_candidates;
pub use registry::{AliasEntry, AliasRegistry, build_registry, canonical_order};
pub use validate::{InvalidReason, judge, validate};
