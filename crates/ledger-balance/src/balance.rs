use std::collections::BTreeMap;

use ledger_core::{Amount, Entry, PublicKey};

use crate::resolve::resolve_effective_expenses;

/// Compute the net signed balance of every member referenced by any
/// surviving expense in `entries`. Positive means net creditor (is owed);
/// negative means net debtor (owes). The sum of all balances is always zero,
/// since each expense contributes `+amount - Σsplits == 0`.
pub fn compute_balances(entries: &[Entry]) -> BTreeMap<PublicKey, Amount> {
    let effective = resolve_effective_expenses(entries);
    let mut balances: BTreeMap<PublicKey, Amount> = BTreeMap::new();

    for expense in effective.values() {
        *balances.entry(expense.paid_by_root_pubkey).or_insert(0) += expense.amount_minor_units;
        for (member, share) in &expense.splits {
            *balances.entry(*member).or_insert(0) -= share;
        }
    }

    balances
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::entry::ExpensePayload;
    use ledger_core::{EntryPayload, Hash, Signature};

    pub(super) fn entry(entry_id: u8, payload: EntryPayload, lamport: u64) -> Entry {
        Entry {
            entry_id: Hash::from_bytes([entry_id; 32]),
            previous_hash: None,
            lamport_clock: lamport,
            timestamp: lamport as i64 + 1,
            creator_device_pubkey: PublicKey::from_bytes([0xAA; 32]),
            signature: Signature::from_bytes([0u8; 64]),
            payload,
        }
    }

    pub(super) fn alice() -> PublicKey {
        PublicKey::from_bytes([1u8; 32])
    }
    pub(super) fn bob() -> PublicKey {
        PublicKey::from_bytes([2u8; 32])
    }

    fn expense(payer: PublicKey, amount: i64, splits: &[(PublicKey, i64)]) -> ExpensePayload {
        let mut map = BTreeMap::new();
        for (k, v) in splits {
            map.insert(*k, *v);
        }
        ExpensePayload {
            description: "x".to_string(),
            amount_minor_units: amount,
            currency: "USD".to_string(),
            paid_by_root_pubkey: payer,
            splits: map,
        }
    }

    /// (S1) Alice paid 50, Bob paid 80, each split 50/50; a correction raises
    /// the first expense to 60. Alice ends at -1000, Bob at +1000 (minor units).
    #[test]
    fn spec_s1_correction_then_settlement_inputs() {
        let e1 = entry(
            1,
            EntryPayload::ExpenseCreated {
                expense: expense(alice(), 5000, &[(alice(), 2500), (bob(), 2500)]),
            },
            1,
        );
        let e2 = entry(
            2,
            EntryPayload::ExpenseCreated {
                expense: expense(bob(), 8000, &[(alice(), 4000), (bob(), 4000)]),
            },
            2,
        );
        let e3 = entry(
            3,
            EntryPayload::ExpenseCorrection {
                referenced_entry_id: Hash::from_bytes([1u8; 32]),
                correction_reason: None,
                corrected_expense: expense(alice(), 6000, &[(alice(), 3000), (bob(), 3000)]),
            },
            3,
        );
        let balances = compute_balances(&[e1, e2, e3]);
        assert_eq!(balances[&alice()], -1000);
        assert_eq!(balances[&bob()], 1000);
        assert_eq!(balances.values().sum::<i64>(), 0);
    }
}
