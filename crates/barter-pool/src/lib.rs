//! L1 escrow client: reads the pool's off-chain Merkle-map state and submits
//! the operator-only mutations with proof-carrying commands.

pub mod backend;
pub mod client;
pub mod graphql;
pub mod offchain;
pub mod proof;
pub mod tracked;

pub use backend::{ActionBlock, ActionEntry, L1Backend, OperatorAccount, PoolAccount, PoolOperation};
pub use client::{ActiveTrade, EscrowPool, PoolClient, PoolConfig};
pub use graphql::GraphqlBackend;
pub use proof::{compute_settlement_proof, SettlementProof};
pub use tracked::TrackedKeys;
