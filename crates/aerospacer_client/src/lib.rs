//! Aerospacer Client - off-chain adapter for the Aerospacer lending program
//!
//! This crate does the two things a client of the (immutable) on-chain
//! protocol cannot get wrong:
//! - encode every protocol instruction into the exact byte layout and account
//!   order the program expects ([`instruction`], [`accounts`])
//! - keep the ascending-ICR order of troves off chain and compute the neighbor
//!   hints the program uses to verify an insertion point ([`snapshot`],
//!   [`sort`], [`neighbors`])
//!
//! Nothing here caches the sorted order between calls. Every caller fetches a
//! fresh snapshot, derives what it needs and drops it.

pub mod accounts;
pub mod codec;
pub mod constants;
pub mod error;
pub mod instruction;
pub mod layout;
pub mod neighbors;
pub mod pda;
pub mod snapshot;
pub mod sort;
pub mod types;
pub mod units;

// Re-export commonly used types
pub use accounts::{PreparedOperation, ProtocolContext, Trailing};
pub use error::{DecodeError, EncodeError, FetchError, ProgramRejection, RejectionKind};
pub use instruction::Operation;
pub use neighbors::{health_ratio, hypothetical_position, ratio_price, resolve_neighbors, NeighborProof};
pub use snapshot::{
    fetch_position, fetch_protocol_context, fetch_protocol_state, fetch_snapshot, FetchConfig,
    FetchFailure, Snapshot,
};
pub use sort::{find_liquidatable, select_redemption_targets, sort_positions, RedemptionPlan};
pub use types::Position;
pub use units::{format_units, parse_units, parse_units_u64, UnitsError};
