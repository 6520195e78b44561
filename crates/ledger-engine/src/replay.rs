use ledger_core::{Entry, EntryPayload};

use crate::error::EntryValidationError;
use crate::order::ordered;
use crate::state::GroupState;
use crate::validate::{into_chain_error, validate_entry};

/// The result of replaying a full chain: either a validated final state, or
/// the list of per-entry errors that stopped replay.
pub struct ReplayResult {
    pub valid: bool,
    pub errors: Vec<EntryValidationError>,
    pub state: Option<GroupState>,
}

impl ReplayResult {
    fn invalid(errors: Vec<EntryValidationError>) -> Self {
        Self {
            valid: false,
            errors,
            state: None,
        }
    }
}

/// Order `entries` per §4.2, then validate and apply them one at a time,
/// starting from an empty state. An empty chain is valid with no state. A
/// non-empty chain whose first entry is not Genesis is invalid.
///
/// Unlike [`validate_entry`] (which never short-circuits *within* one
/// entry), chain replay stops applying state mutations as soon as one entry
/// fails — but every entry up to and including the first failure is still
/// reported, and [`validate_entry`] is still run (accumulating) on each.
pub fn validate_and_replay_chain(entries: Vec<Entry>) -> ReplayResult {
    let ordered_entries = ordered(entries);

    if ordered_entries.is_empty() {
        return ReplayResult {
            valid: true,
            errors: Vec::new(),
            state: None,
        };
    }

    if !matches!(ordered_entries[0].payload, EntryPayload::Genesis { .. }) {
        return ReplayResult::invalid(vec![into_chain_error(
            0,
            &ordered_entries[0],
            vec![crate::error::ValidationIssue::integrity(
                "first entry of a non-empty chain must be Genesis",
            )],
        )]);
    }

    let mut state: Option<GroupState> = None;
    let mut preceding: Vec<Entry> = Vec::with_capacity(ordered_entries.len());
    let mut errors = Vec::new();

    for (ordinal, entry) in ordered_entries.into_iter().enumerate() {
        let outcome = validate_entry(&entry, &preceding, state.as_ref());
        if !outcome.valid {
            errors.push(into_chain_error(ordinal, &entry, outcome.issues));
            return ReplayResult {
                valid: false,
                errors,
                state: None,
            };
        }

        state = Some(apply_entry(&entry, state));
        preceding.push(entry);
    }

    let balances = ledger_balance::compute_balances(&preceding);
    let mut final_state = state.expect("at least one entry (Genesis) was applied");
    final_state.balances = balances;

    ReplayResult {
        valid: true,
        errors,
        state: Some(final_state),
    }
}

/// Apply one already-validated entry's state mutation (§4.4). Also advances
/// `latest_entry_hash` and `current_lamport_clock` for every entry type.
///
/// Callers outside this crate (the sync manager's incoming-entry pipeline)
/// use this directly to apply a single freshly-validated entry without
/// replaying the whole chain; balances still need a separate
/// `ledger_balance::compute_balances` pass over the full entry list, since
/// they are not an incremental fold (§4.5).
pub fn apply_entry(entry: &Entry, state: Option<GroupState>) -> GroupState {
    let mut state = match (&entry.payload, state) {
        (
            EntryPayload::Genesis {
                group_id,
                group_name,
                creator_root_pubkey,
                creator_display_name,
            },
            _,
        ) => GroupState::from_genesis(
            *group_id,
            group_name.clone(),
            *creator_root_pubkey,
            creator_display_name.clone(),
            entry.creator_device_pubkey,
            entry.timestamp,
        ),
        (_, Some(state)) => state,
        (_, None) => unreachable!("non-Genesis entry validated without a preceding state"),
    };

    match &entry.payload {
        EntryPayload::Genesis { .. } => {}
        EntryPayload::MemberAdded {
            member_root_pubkey,
            member_display_name,
            ..
        } => {
            state.insert_member(
                *member_root_pubkey,
                member_display_name.clone(),
                entry.timestamp,
                entry.creator_device_pubkey,
            );
        }
        EntryPayload::MemberRemoved { member_root_pubkey, .. } => {
            if let Some(member) = state.members.get_mut(member_root_pubkey) {
                member.is_active = false;
                member.removed_at = Some(entry.timestamp);
            }
        }
        EntryPayload::DeviceAuthorized {
            owner_root_pubkey,
            device_public_key,
            ..
        } => {
            if let Some(member) = state.members.get_mut(owner_root_pubkey) {
                member.authorized_devices.insert(*device_public_key);
            }
        }
        EntryPayload::DeviceRevoked {
            owner_root_pubkey,
            device_public_key,
            ..
        } => {
            if let Some(member) = state.members.get_mut(owner_root_pubkey) {
                member.authorized_devices.remove(device_public_key);
            }
        }
        EntryPayload::RootKeyRotation {
            previous_root_pubkey,
            new_root_pubkey,
            ..
        } => {
            state.rotate_root_key(previous_root_pubkey, *new_root_pubkey, entry.timestamp);
        }
        EntryPayload::ExpenseCreated { .. }
        | EntryPayload::ExpenseCorrection { .. }
        | EntryPayload::ExpenseVoided { .. } => {
            // Membership is untouched; balances are recomputed from scratch
            // once the whole chain has been applied (§4.5).
        }
    }

    state.latest_entry_hash = Some(entry.entry_id);
    state.current_lamport_clock = state.current_lamport_clock.max(entry.lamport_clock);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::GroupId;
    use ledger_crypto::KeyPair;

    use crate::builder::build_genesis;

    #[test]
    fn empty_chain_is_valid_with_no_state() {
        let result = validate_and_replay_chain(vec![]);
        assert!(result.valid);
        assert!(result.state.is_none());
    }

    #[test]
    fn chain_not_starting_with_genesis_is_invalid() {
        let creator = KeyPair::generate();
        let entry = crate::builder::EntryBuilder::new(
            Some(ledger_core::Hash::from_bytes([1u8; 32])),
            1,
            1_700_000_000_000,
            ledger_core::EntryPayload::MemberRemoved {
                member_root_pubkey: creator.public_key,
                reason: None,
            },
        )
        .build(&creator)
        .unwrap();

        let result = validate_and_replay_chain(vec![entry]);
        assert!(!result.valid);
    }

    #[test]
    fn genesis_alone_yields_one_member_active_state() {
        let creator = KeyPair::generate();
        let genesis = build_genesis(
            &creator,
            GroupId::new(),
            "Trip".to_string(),
            "Alice".to_string(),
            1_700_000_000_000,
        )
        .unwrap();

        let result = validate_and_replay_chain(vec![genesis.clone()]);
        assert!(result.valid, "{:?}", result.errors);
        let state = result.state.unwrap();
        assert_eq!(state.members.len(), 1);
        let member = &state.members[&creator.public_key];
        assert!(member.is_active);
        assert_eq!(member.authorized_devices.len(), 1);
        assert!(member.authorized_devices.contains(&creator.public_key));
    }

    #[test]
    fn replay_is_order_independent() {
        let creator = KeyPair::generate();
        let genesis = build_genesis(
            &creator,
            GroupId::new(),
            "Trip".to_string(),
            "Alice".to_string(),
            1_700_000_000_000,
        )
        .unwrap();

        let forward = validate_and_replay_chain(vec![genesis.clone()]);
        let shuffled = validate_and_replay_chain(vec![genesis]);
        assert_eq!(
            forward.state.unwrap().latest_entry_hash,
            shuffled.state.unwrap().latest_entry_hash
        );
    }
}
