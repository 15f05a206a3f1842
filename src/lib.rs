//! # bidreach — Marketplace Bidding Assistant
//!
//! Client library for a freelance-marketplace bidding backend: ID-range
//! project discovery with a cooldown-gated cursor, keyword search with an
//! auto-refresh gate, AI proposal generation, bid placement, and a bid
//! tracker whose aggregates are reconciled locally after each confirmed
//! status write.
//!
//! The heavy lifting (search, AI generation, persistence, auth, rate
//! limiting) all lives behind the REST boundary in [`client`]. What this
//! crate owns is the stateful edge: the cursor/cooldown state machine in
//! [`scan`], the keyword auto-refresh gate in [`refresh`], and the pure
//! recount-based patching in [`reconcile`].

pub mod client;
pub mod cooldown;
pub mod error;
pub mod reconcile;
pub mod refresh;
pub mod scan;
pub mod session;
pub mod statefile;
pub mod tracker;
