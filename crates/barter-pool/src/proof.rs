use serde::{Deserialize, Serialize};

use barter_core::BarterError;
use barter_crypto::{hash_fields, Fp};

use crate::backend::ActionBlock;

/// Artifact of a settlement round: the fold that collapses a batch of
/// pending actions onto the committed root.
///
/// Generating this is the CPU-bound part of settlement — cost grows linearly
/// with the pending-action backlog, and large batches take minutes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementProof {
    pub prior_root: Fp,
    pub new_root: Fp,
    pub prior_action_state: Fp,
    pub new_action_state: Fp,
    pub action_count: usize,
    /// Commitment over the whole fold, carried in the settle command.
    pub transcript: Fp,
}

/// Fold `blocks` (in ledger order) onto `prior_root`.
///
/// The off-chain commitment is a running hash of every applied action, so
/// the new root depends only on the prior root and the pending entries.
pub fn compute_settlement_proof(
    prior_root: Fp,
    prior_action_state: Fp,
    blocks: &[ActionBlock],
) -> Result<SettlementProof, BarterError> {
    let mut root = prior_root;
    let mut count = 0usize;
    for block in blocks {
        for per_account in &block.actions {
            for entry in per_account {
                if entry.fields.is_empty() {
                    return Err(BarterError::MalformedAction(format!(
                        "empty action entry at block {}",
                        block.block_height
                    )));
                }
                root = hash_fields(&[root, hash_fields(&entry.fields)]);
                count += 1;
            }
        }
    }
    let new_action_state = blocks.last().map_or(prior_action_state, |b| b.action_state);
    let transcript = hash_fields(&[
        prior_root,
        root,
        prior_action_state,
        new_action_state,
        Fp::from_u64(count as u64),
    ]);
    Ok(SettlementProof {
        prior_root,
        new_root: root,
        prior_action_state,
        new_action_state,
        action_count: count,
        transcript,
    })
}

/// Statement commitment carried by a lock/unlock command, binding the
/// operation to the pool state it was proven against.
pub fn operation_commitment(op_fields: &[Fp], observed_root: Fp) -> Fp {
    let mut fields = Vec::with_capacity(op_fields.len() + 1);
    fields.push(observed_root);
    fields.extend_from_slice(op_fields);
    hash_fields(&fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(v: u64) -> crate::backend::ActionEntry {
        crate::backend::ActionEntry {
            fields: vec![Fp::from_u64(v)],
        }
    }

    fn block(height: u64, state: u64, per_account: Vec<Vec<u64>>) -> ActionBlock {
        ActionBlock {
            block_height: height,
            action_state: Fp::from_u64(state),
            actions: per_account
                .into_iter()
                .map(|acct| acct.into_iter().map(entry).collect())
                .collect(),
        }
    }

    #[test]
    fn empty_batch_keeps_the_root() {
        let p = compute_settlement_proof(Fp::from_u64(7), Fp::from_u64(3), &[]).unwrap();
        assert_eq!(p.new_root, Fp::from_u64(7));
        assert_eq!(p.new_action_state, Fp::from_u64(3));
        assert_eq!(p.action_count, 0);
    }

    #[test]
    fn count_sums_per_account_lists() {
        let blocks = vec![block(10, 100, vec![vec![1, 2]]), block(11, 101, vec![vec![3]])];
        let p = compute_settlement_proof(Fp::ZERO, Fp::ZERO, &blocks).unwrap();
        assert_eq!(p.action_count, 3);
        assert_eq!(p.new_action_state, Fp::from_u64(101));
    }

    #[test]
    fn fold_is_order_sensitive() {
        let a = compute_settlement_proof(Fp::ZERO, Fp::ZERO, &[block(1, 9, vec![vec![1, 2]])]).unwrap();
        let b = compute_settlement_proof(Fp::ZERO, Fp::ZERO, &[block(1, 9, vec![vec![2, 1]])]).unwrap();
        assert_ne!(a.new_root, b.new_root);
    }

    #[test]
    fn fold_is_deterministic() {
        let blocks = vec![block(5, 50, vec![vec![11], vec![12, 13]])];
        let a = compute_settlement_proof(Fp::from_u64(1), Fp::ZERO, &blocks).unwrap();
        let b = compute_settlement_proof(Fp::from_u64(1), Fp::ZERO, &blocks).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.action_count, 3);
    }

    #[test]
    fn empty_entry_is_malformed() {
        let blocks = vec![ActionBlock {
            block_height: 1,
            action_state: Fp::ZERO,
            actions: vec![vec![crate::backend::ActionEntry { fields: vec![] }]],
        }];
        assert!(compute_settlement_proof(Fp::ZERO, Fp::ZERO, &blocks).is_err());
    }
}
