use std::collections::HashMap;

use ledger_core::entry::ExpensePayload;
use ledger_core::{Entry, EntryPayload, Hash};

/// The surviving view of a group's expenses after applying every correction
/// and void in chain order: a mapping from the *original* `ExpenseCreated`
/// entry id to its current effective payload. Entries voided (directly or by
/// chain) are absent.
pub type EffectiveExpenses = HashMap<Hash, ExpensePayload>;

/// Resolve the effective expense set for an ordered chain of entries.
///
/// Corrections may target another correction; resolution follows the chain
/// back to the original `ExpenseCreated`. A validated chain can never contain
/// a correction cycle (corrections only reference strictly preceding
/// entries), but the walk below still bounds its own traversal defensively —
/// a malformed chain that slipped past validation degrades to a no-op on the
/// offending entry rather than looping forever.
pub fn resolve_effective_expenses(entries: &[Entry]) -> EffectiveExpenses {
    // entry_id -> (is_original, original_entry_id_if_correction)
    let mut corrects_to: HashMap<Hash, Hash> = HashMap::new();
    let mut effective: EffectiveExpenses = EffectiveExpenses::new();

    for entry in entries {
        match &entry.payload {
            EntryPayload::ExpenseCreated { expense } => {
                effective.insert(entry.entry_id, expense.clone());
            }
            EntryPayload::ExpenseCorrection {
                referenced_entry_id,
                corrected_expense,
                ..
            } => {
                let Some(original) = resolve_original(*referenced_entry_id, &corrects_to) else {
                    continue;
                };
                corrects_to.insert(entry.entry_id, original);
                effective.insert(original, corrected_expense.clone());
            }
            EntryPayload::ExpenseVoided { voided_entry_id, .. } => {
                let original = resolve_original(*voided_entry_id, &corrects_to)
                    .unwrap_or(*voided_entry_id);
                effective.remove(&original);
            }
            _ => {}
        }
    }

    effective
}

/// Follow `corrects_to` pointers from `start` back to the original
/// `ExpenseCreated` id. Bounded by the map's size so a cycle (which validation
/// should have already excluded) cannot spin forever.
fn resolve_original(start: Hash, corrects_to: &HashMap<Hash, Hash>) -> Option<Hash> {
    let mut current = start;
    let mut steps = 0usize;
    let max_steps = corrects_to.len() + 1;
    while let Some(&next) = corrects_to.get(&current) {
        current = next;
        steps += 1;
        if steps > max_steps {
            // Cycle in a chain that should have been rejected by validation;
            // surface our best-effort current position rather than spin.
            return Some(current);
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{PublicKey, Signature};
    use std::collections::BTreeMap;

    fn dummy_entry(entry_id: [u8; 32], payload: EntryPayload) -> Entry {
        Entry {
            entry_id: Hash::from_bytes(entry_id),
            previous_hash: None,
            lamport_clock: 0,
            timestamp: 1,
            creator_device_pubkey: PublicKey::from_bytes([1u8; 32]),
            signature: Signature::from_bytes([0u8; 64]),
            payload,
        }
    }

    fn expense(amount: i64) -> ExpensePayload {
        let mut splits = BTreeMap::new();
        splits.insert(PublicKey::from_bytes([2u8; 32]), amount);
        ExpensePayload {
            description: "dinner".to_string(),
            amount_minor_units: amount,
            currency: "USD".to_string(),
            paid_by_root_pubkey: PublicKey::from_bytes([3u8; 32]),
            splits,
        }
    }

    #[test]
    fn correction_overrides_original() {
        let original = dummy_entry([1u8; 32], EntryPayload::ExpenseCreated { expense: expense(5000) });
        let correction = dummy_entry(
            [2u8; 32],
            EntryPayload::ExpenseCorrection {
                referenced_entry_id: Hash::from_bytes([1u8; 32]),
                correction_reason: None,
                corrected_expense: expense(6000),
            },
        );
        let effective = resolve_effective_expenses(&[original, correction]);
        assert_eq!(
            effective[&Hash::from_bytes([1u8; 32])].amount_minor_units,
            6000
        );
    }

    #[test]
    fn void_removes_expense() {
        let original = dummy_entry([1u8; 32], EntryPayload::ExpenseCreated { expense: expense(5000) });
        let void = dummy_entry(
            [2u8; 32],
            EntryPayload::ExpenseVoided {
                voided_entry_id: Hash::from_bytes([1u8; 32]),
                reason: None,
            },
        );
        let effective = resolve_effective_expenses(&[original, void]);
        assert!(!effective.contains_key(&Hash::from_bytes([1u8; 32])));
    }

    #[test]
    fn correction_chain_resolves_to_original() {
        let original = dummy_entry([1u8; 32], EntryPayload::ExpenseCreated { expense: expense(5000) });
        let first_correction = dummy_entry(
            [2u8; 32],
            EntryPayload::ExpenseCorrection {
                referenced_entry_id: Hash::from_bytes([1u8; 32]),
                correction_reason: None,
                corrected_expense: expense(6000),
            },
        );
        let second_correction = dummy_entry(
            [3u8; 32],
            EntryPayload::ExpenseCorrection {
                referenced_entry_id: Hash::from_bytes([2u8; 32]),
                correction_reason: None,
                corrected_expense: expense(7000),
            },
        );
        let effective =
            resolve_effective_expenses(&[original, first_correction, second_correction]);
        assert_eq!(effective.len(), 1);
        assert_eq!(
            effective[&Hash::from_bytes([1u8; 32])].amount_minor_units,
            7000
        );
    }

    #[test]
    fn void_of_missing_entry_is_tolerated_no_op() {
        let void = dummy_entry(
            [2u8; 32],
            EntryPayload::ExpenseVoided {
                voided_entry_id: Hash::from_bytes([9u8; 32]),
                reason: None,
            },
        );
        let effective = resolve_effective_expenses(&[void]);
        assert!(effective.is_empty());
    }
}
