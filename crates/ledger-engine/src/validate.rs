use std::collections::HashSet;

use ledger_core::entry::ExpensePayload;
use ledger_core::{Entry, EntryPayload};
use ledger_identity::{verify_co_signature, verify_device_authorization, verify_invite_token};

use crate::builder::entry_id_of;
use crate::error::{EntryValidationError, ValidationIssue};
use crate::state::GroupState;

/// Five minutes of tolerated clock skew for invite-expiry checks (§4.3,
/// MemberAdded rule).
const INVITE_EXPIRY_TOLERANCE_MS: i64 = 5 * 60 * 1000;

/// The outcome of validating one entry against a preceding chain prefix and
/// the state derived from it. Never short-circuits: every applicable rule is
/// checked and every violation is accumulated (§7 propagation policy).
pub struct EntryValidation {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

/// Validate a single entry `e` against the ordered list of entries strictly
/// preceding it (`preceding`) and the group state obtained by applying that
/// prefix (`state`, `None` only permitted when `preceding` is empty and `e`
/// is Genesis).
pub fn validate_entry(entry: &Entry, preceding: &[Entry], state: Option<&GroupState>) -> EntryValidation {
    let mut issues = Vec::new();

    // 1. Structural.
    validate_structural(entry, &mut issues);

    // 2. Hash integrity (I2).
    match entry_id_of(&entry.body()) {
        Ok(recomputed) if recomputed == entry.entry_id => {}
        Ok(_) => issues.push(ValidationIssue::integrity("entry_id does not match its canonical body")),
        Err(e) => issues.push(ValidationIssue::structural(format!("cannot canonicalize entry: {e}"))),
    }

    // 3. Signature (I3).
    if ledger_crypto::verify_signature(
        &entry.creator_device_pubkey,
        entry.entry_id.to_hex().as_bytes(),
        &entry.signature,
    )
    .is_err()
    {
        issues.push(ValidationIssue::integrity("signature does not verify"));
    }

    // 4. Chain continuity (I1).
    validate_chain_continuity(entry, preceding, &mut issues);

    // 5 & 6. Authorization + payload, variant-specific.
    validate_payload(entry, preceding, state, &mut issues);

    EntryValidation {
        valid: issues.is_empty(),
        issues,
    }
}

fn validate_structural(entry: &Entry, issues: &mut Vec<ValidationIssue>) {
    if entry.timestamp <= 0 {
        issues.push(ValidationIssue::structural("timestamp must be > 0"));
    }
    // lamport_clock is a u64 — "non-negative" is a type-level invariant here.

    if let EntryPayload::ExpenseCreated { expense } | EntryPayload::ExpenseCorrection { corrected_expense: expense, .. } = &entry.payload {
        validate_expense_shape(expense, issues);
    }
}

fn validate_expense_shape(expense: &ExpensePayload, issues: &mut Vec<ValidationIssue>) {
    if expense.description.is_empty() {
        issues.push(ValidationIssue::structural("expense description must not be empty"));
    }
    if ledger_core::fields::validate_currency(&expense.currency).is_err() {
        issues.push(ValidationIssue::structural(format!(
            "invalid currency code: {}",
            expense.currency
        )));
    }
    if expense.amount_minor_units <= 0 {
        issues.push(ValidationIssue::domain("amount_minor_units must be positive"));
    }
    if expense.splits.values().any(|&share| share < 0) {
        issues.push(ValidationIssue::domain("split shares must be non-negative"));
    }
}

fn validate_chain_continuity(entry: &Entry, preceding: &[Entry], issues: &mut Vec<ValidationIssue>) {
    let is_genesis = matches!(entry.payload, EntryPayload::Genesis { .. });
    match (&entry.previous_hash, is_genesis) {
        (None, true) => {
            if !preceding.is_empty() {
                issues.push(ValidationIssue::integrity(
                    "Genesis must be the first entry in the chain",
                ));
            }
        }
        (Some(_), true) => {
            issues.push(ValidationIssue::integrity("Genesis must not carry a previous_hash"));
        }
        (None, false) => {
            issues.push(ValidationIssue::integrity("non-Genesis entry must carry a previous_hash"));
        }
        (Some(prev), false) => {
            if !preceding.iter().any(|p| p.entry_id == *prev) {
                issues.push(ValidationIssue::integrity(
                    "previous_hash does not reference any preceding entry",
                ));
            }
        }
    }
}

fn validate_payload(
    entry: &Entry,
    preceding: &[Entry],
    state: Option<&GroupState>,
    issues: &mut Vec<ValidationIssue>,
) {
    match &entry.payload {
        EntryPayload::Genesis { group_name, creator_display_name, .. } => {
            if group_name.is_empty() {
                issues.push(ValidationIssue::structural("group_name must not be empty"));
            }
            if creator_display_name.is_empty() {
                issues.push(ValidationIssue::structural("creator_display_name must not be empty"));
            }
            // Self-authorizing — no further authorization check.
        }

        EntryPayload::MemberAdded {
            member_root_pubkey,
            member_display_name,
            invite_token,
        } => {
            if member_display_name.is_empty() {
                issues.push(ValidationIssue::structural("member_display_name must not be empty"));
            }
            let Some(state) = state else {
                issues.push(ValidationIssue::authorization("no group state to validate MemberAdded against"));
                return;
            };
            if state.is_active_member(member_root_pubkey) {
                issues.push(ValidationIssue::domain("member is already active"));
            }
            if invite_token.group_id != state.group_id {
                issues.push(ValidationIssue::authorization("invite token names a different group"));
            }
            if !state.is_active_member(&invite_token.inviter_root_pubkey) {
                issues.push(ValidationIssue::authorization("invite token's inviter is not an active member"));
            }
            if verify_invite_token(invite_token).is_err() {
                issues.push(ValidationIssue::authorization("invite token signature does not verify"));
            }
            if entry.timestamp > invite_token.expires_at + INVITE_EXPIRY_TOLERANCE_MS {
                issues.push(ValidationIssue::authorization("invite token has expired"));
            }
            // MemberAdded is self-authorizing: the invite carries the grant.
        }

        EntryPayload::MemberRemoved { member_root_pubkey, .. } => {
            require_active_creator(entry, state, issues);
            let Some(state) = state else { return };
            if !state.is_active_member(member_root_pubkey) {
                issues.push(ValidationIssue::domain("target member is not currently active"));
            }
            let self_removal = entry.creator_device_pubkey == *member_root_pubkey
                || state.owner_of_device(&entry.creator_device_pubkey) == Some(member_root_pubkey);
            let by_creator = state.owner_of_device(&entry.creator_device_pubkey) == Some(&state.creator_root_pubkey);
            if !self_removal && !by_creator {
                issues.push(ValidationIssue::authorization(
                    "removal must be by the target member or the group creator",
                ));
            }
        }

        EntryPayload::DeviceAuthorized {
            owner_root_pubkey,
            device_public_key,
            device_name,
            authorization_signature,
        } => {
            require_active_creator(entry, state, issues);
            if device_name.is_empty() {
                issues.push(ValidationIssue::structural("device_name must not be empty"));
            }
            let Some(state) = state else { return };
            if !state.is_active_member(owner_root_pubkey) {
                issues.push(ValidationIssue::authorization("device owner is not an active member"));
            }
            let auth = ledger_core::DeviceAuthorization {
                device_public_key: *device_public_key,
                root_public_key: *owner_root_pubkey,
                authorized_at: entry.timestamp,
                signature: authorization_signature.clone(),
            };
            if verify_device_authorization(&auth).is_err() {
                issues.push(ValidationIssue::authorization(
                    "device authorization signature does not verify against the owner's root key",
                ));
            }
        }

        EntryPayload::DeviceRevoked {
            owner_root_pubkey,
            device_public_key,
            ..
        } => {
            require_active_creator(entry, state, issues);
            let Some(state) = state else { return };
            let currently_authorized = state
                .members
                .get(owner_root_pubkey)
                .map(|m| m.authorized_devices.contains(device_public_key))
                .unwrap_or(false);
            if !currently_authorized {
                issues.push(ValidationIssue::domain(
                    "device is not currently in the owner's authorized set",
                ));
            }
        }

        EntryPayload::ExpenseCreated { expense } => {
            require_active_creator(entry, state, issues);
            if let Some(state) = state {
                validate_expense_membership_and_sum(expense, state, issues);
            }
        }

        EntryPayload::ExpenseCorrection {
            referenced_entry_id,
            corrected_expense,
            ..
        } => {
            require_active_creator(entry, state, issues);
            let referenced = preceding.iter().find(|p| p.entry_id == *referenced_entry_id);
            match referenced {
                Some(p) if matches!(p.payload, EntryPayload::ExpenseCreated { .. } | EntryPayload::ExpenseCorrection { .. }) => {}
                Some(_) => issues.push(ValidationIssue::domain(
                    "referenced_entry_id does not name an expense or correction",
                )),
                None => issues.push(ValidationIssue::domain(
                    "referenced_entry_id does not name a preceding entry",
                )),
            }
            if let Some(state) = state {
                validate_expense_membership_and_sum(corrected_expense, state, issues);
            }
        }

        EntryPayload::ExpenseVoided { voided_entry_id, .. } => {
            require_active_creator(entry, state, issues);
            let referenced = preceding.iter().find(|p| p.entry_id == *voided_entry_id);
            match referenced {
                Some(p) if matches!(p.payload, EntryPayload::ExpenseCreated { .. } | EntryPayload::ExpenseCorrection { .. }) => {}
                Some(_) => issues.push(ValidationIssue::domain(
                    "voided_entry_id does not name an expense or correction",
                )),
                None => issues.push(ValidationIssue::domain(
                    "voided_entry_id does not name a preceding entry",
                )),
            }
        }

        EntryPayload::RootKeyRotation {
            previous_root_pubkey,
            new_root_pubkey,
            co_signatures,
        } => {
            require_active_creator(entry, state, issues);
            let Some(state) = state else { return };
            if !state.is_active_member(previous_root_pubkey) {
                issues.push(ValidationIssue::authorization("previous_root_pubkey is not an active member"));
                return;
            }
            let threshold = ledger_identity::recovery_threshold(state.active_member_count());

            let mut seen = HashSet::new();
            let mut valid_count = 0usize;
            for co_sig in co_signatures {
                if !seen.insert(co_sig.signer_root_pubkey) {
                    continue; // duplicate signer — first occurrence wins.
                }
                if co_sig.signer_root_pubkey == *previous_root_pubkey {
                    continue; // self-co-signature dropped.
                }
                if !state.is_active_member(&co_sig.signer_root_pubkey) {
                    continue; // non-member co-signature dropped.
                }
                if verify_co_signature(
                    co_sig,
                    previous_root_pubkey,
                    new_root_pubkey,
                    &state.group_id,
                )
                .is_ok()
                {
                    valid_count += 1;
                }
            }
            if valid_count < threshold {
                issues.push(ValidationIssue::authorization(format!(
                    "insufficient co-signatures for root key rotation: need {threshold}, got {valid_count}"
                )));
            }
        }
    }
}

/// Shared authorization check for every variant except Genesis and
/// MemberAdded: `creator_device_pubkey` must belong to a currently active
/// member (I4).
fn require_active_creator(entry: &Entry, state: Option<&GroupState>, issues: &mut Vec<ValidationIssue>) {
    let Some(state) = state else {
        issues.push(ValidationIssue::authorization("no group state to authorize against"));
        return;
    };
    if !state.device_authorized(&entry.creator_device_pubkey) {
        issues.push(ValidationIssue::authorization(
            "creator_device_pubkey is not authorized for any active member",
        ));
    }
}

fn validate_expense_membership_and_sum(
    expense: &ExpensePayload,
    state: &GroupState,
    issues: &mut Vec<ValidationIssue>,
) {
    if !state.is_active_member(&expense.paid_by_root_pubkey) {
        issues.push(ValidationIssue::domain("paid_by_root_pubkey is not an active member"));
    }
    for member in expense.splits.keys() {
        if !state.is_active_member(member) {
            issues.push(ValidationIssue::domain(format!(
                "split references non-member {member}"
            )));
        }
    }
    let sum: i64 = expense.splits.values().sum();
    if sum != expense.amount_minor_units {
        issues.push(ValidationIssue::domain(format!(
            "splits sum {sum} does not equal amount_minor_units {}",
            expense.amount_minor_units
        )));
    }
}

/// Tag a single-entry validation result with its ordinal position and a
/// truncated id, for full-chain aggregation (§7).
pub fn into_chain_error(ordinal: usize, entry: &Entry, issues: Vec<ValidationIssue>) -> EntryValidationError {
    let hex = entry.entry_id.to_hex();
    EntryValidationError {
        ordinal,
        entry_id_prefix: hex[..hex.len().min(12)].to_string(),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ledger_core::entry::ExpensePayload;
    use ledger_core::{EntryPayload, GroupId};
    use ledger_crypto::KeyPair;
    use ledger_identity::{co_sign_rotation, issue_invite};

    use super::*;
    use crate::builder::{build_genesis, EntryBuilder};
    use crate::replay::apply_entry;

    struct Fixture {
        creator: KeyPair,
        genesis: Entry,
        state: GroupState,
    }

    fn genesis_fixture() -> Fixture {
        let creator = KeyPair::generate();
        let genesis = build_genesis(
            &creator,
            GroupId::new(),
            "Trip".to_string(),
            "Alice".to_string(),
            1_700_000_000_000,
        )
        .unwrap();
        let state = apply_entry(&genesis, None);
        Fixture { creator, genesis, state }
    }

    fn add_member(fixture: &mut Fixture, member: &KeyPair, display_name: &str, timestamp: i64) -> Entry {
        let invite = issue_invite(&fixture.creator, fixture.state.group_id, timestamp + 3_600_000).unwrap();
        let entry = EntryBuilder::new(
            Some(fixture.genesis.entry_id),
            1,
            timestamp,
            EntryPayload::MemberAdded {
                member_root_pubkey: member.public_key,
                member_display_name: display_name.to_string(),
                invite_token: invite,
            },
        )
        .build(member)
        .unwrap();
        let outcome = validate_entry(&entry, &[fixture.genesis.clone()], Some(&fixture.state));
        assert!(outcome.valid, "member add should validate: {:?}", outcome.issues);
        fixture.state = apply_entry(&entry, Some(fixture.state.clone()));
        entry
    }

    // S4 — MemberAdded with an expired invite, tolerating 5 minutes of skew.
    #[test]
    fn member_added_with_expired_invite_fails() {
        let fixture = genesis_fixture();
        let member = KeyPair::generate();
        let now = 1_700_000_100_000;
        let invite = issue_invite(&fixture.creator, fixture.state.group_id, now - 1_000).unwrap();
        let entry = EntryBuilder::new(
            Some(fixture.genesis.entry_id),
            1,
            now + 10 * 60 * 1000,
            EntryPayload::MemberAdded {
                member_root_pubkey: member.public_key,
                member_display_name: "Bob".to_string(),
                invite_token: invite,
            },
        )
        .build(&member)
        .unwrap();

        let outcome = validate_entry(&entry, &[fixture.genesis.clone()], Some(&fixture.state));
        assert!(!outcome.valid);
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.message.to_lowercase().contains("expired")));
    }

    #[test]
    fn member_added_within_skew_tolerance_succeeds() {
        let fixture = genesis_fixture();
        let member = KeyPair::generate();
        let now = 1_700_000_100_000;
        let invite = issue_invite(&fixture.creator, fixture.state.group_id, now + 3_600_000).unwrap();
        let entry = EntryBuilder::new(
            Some(fixture.genesis.entry_id),
            1,
            now + 3 * 60 * 1000,
            EntryPayload::MemberAdded {
                member_root_pubkey: member.public_key,
                member_display_name: "Bob".to_string(),
                invite_token: invite,
            },
        )
        .build(&member)
        .unwrap();

        let outcome = validate_entry(&entry, &[fixture.genesis.clone()], Some(&fixture.state));
        assert!(outcome.valid, "{:?}", outcome.issues);
    }

    // S5 — split sum mismatch and non-member split targets.
    #[test]
    fn expense_created_with_splits_short_of_amount_fails() {
        let mut fixture = genesis_fixture();
        let bob = KeyPair::generate();
        add_member(&mut fixture, &bob, "Bob", 1_700_000_001_000);

        let mut splits = BTreeMap::new();
        splits.insert(fixture.creator.public_key, 500);
        let expense = ExpensePayload {
            description: "Dinner".to_string(),
            amount_minor_units: 1000,
            currency: "USD".to_string(),
            paid_by_root_pubkey: fixture.creator.public_key,
            splits,
        };
        let entry = EntryBuilder::new(
            Some(fixture.genesis.entry_id),
            2,
            1_700_000_002_000,
            EntryPayload::ExpenseCreated { expense },
        )
        .build(&fixture.creator)
        .unwrap();

        let preceding = vec![fixture.genesis.clone()];
        let outcome = validate_entry(&entry, &preceding, Some(&fixture.state));
        assert!(!outcome.valid);
        assert!(outcome.issues.iter().any(|i| i.message.contains("splits sum")));
    }

    #[test]
    fn expense_created_with_inactive_split_member_fails() {
        let mut fixture = genesis_fixture();
        let bob = KeyPair::generate();
        let member_added = add_member(&mut fixture, &bob, "Bob", 1_700_000_001_000);
        let removal = EntryBuilder::new(
            Some(member_added.entry_id),
            2,
            1_700_000_002_000,
            EntryPayload::MemberRemoved {
                member_root_pubkey: bob.public_key,
                reason: None,
            },
        )
        .build(&bob)
        .unwrap();
        let outcome = validate_entry(
            &removal,
            &[fixture.genesis.clone(), member_added.clone()],
            Some(&fixture.state),
        );
        assert!(outcome.valid, "{:?}", outcome.issues);
        fixture.state = apply_entry(&removal, Some(fixture.state.clone()));

        let mut splits = BTreeMap::new();
        splits.insert(fixture.creator.public_key, 500);
        splits.insert(bob.public_key, 500);
        let expense = ExpensePayload {
            description: "Dinner".to_string(),
            amount_minor_units: 1000,
            currency: "USD".to_string(),
            paid_by_root_pubkey: fixture.creator.public_key,
            splits,
        };
        let entry = EntryBuilder::new(
            Some(removal.entry_id),
            3,
            1_700_000_003_000,
            EntryPayload::ExpenseCreated { expense },
        )
        .build(&fixture.creator)
        .unwrap();

        let preceding = vec![fixture.genesis.clone(), member_added, removal];
        let outcome = validate_entry(&entry, &preceding, Some(&fixture.state));
        assert!(!outcome.valid);
        assert!(outcome.issues.iter().any(|i| i.message.contains("non-member")));
    }

    // S2 — root key rotation co-signature threshold in a 3-member group.
    #[test]
    fn root_key_rotation_with_enough_co_signatures_succeeds() {
        let mut fixture = genesis_fixture();
        let bob = KeyPair::generate();
        let carol = KeyPair::generate();
        let e1 = add_member(&mut fixture, &bob, "Bob", 1_700_000_001_000);
        let e2 = add_member(&mut fixture, &carol, "Carol", 1_700_000_002_000);

        let new_root = KeyPair::generate();
        let bob_sig = co_sign_rotation(&bob, &fixture.creator.public_key, &new_root.public_key, &fixture.state.group_id).unwrap();
        let carol_sig = co_sign_rotation(&carol, &fixture.creator.public_key, &new_root.public_key, &fixture.state.group_id).unwrap();

        let rotation = EntryBuilder::new(
            Some(e2.entry_id),
            3,
            1_700_000_003_000,
            EntryPayload::RootKeyRotation {
                previous_root_pubkey: fixture.creator.public_key,
                new_root_pubkey: new_root.public_key,
                co_signatures: vec![bob_sig, carol_sig],
            },
        )
        .build(&fixture.creator)
        .unwrap();

        let preceding = vec![fixture.genesis.clone(), e1, e2];
        let outcome = validate_entry(&rotation, &preceding, Some(&fixture.state));
        assert!(outcome.valid, "{:?}", outcome.issues);
    }

    #[test]
    fn root_key_rotation_with_only_one_co_signature_fails() {
        let mut fixture = genesis_fixture();
        let bob = KeyPair::generate();
        let carol = KeyPair::generate();
        let e1 = add_member(&mut fixture, &bob, "Bob", 1_700_000_001_000);
        let e2 = add_member(&mut fixture, &carol, "Carol", 1_700_000_002_000);

        let new_root = KeyPair::generate();
        let bob_sig = co_sign_rotation(&bob, &fixture.creator.public_key, &new_root.public_key, &fixture.state.group_id).unwrap();

        let rotation = EntryBuilder::new(
            Some(e2.entry_id),
            3,
            1_700_000_003_000,
            EntryPayload::RootKeyRotation {
                previous_root_pubkey: fixture.creator.public_key,
                new_root_pubkey: new_root.public_key,
                co_signatures: vec![bob_sig],
            },
        )
        .build(&fixture.creator)
        .unwrap();

        let preceding = vec![fixture.genesis.clone(), e1, e2];
        let outcome = validate_entry(&rotation, &preceding, Some(&fixture.state));
        assert!(!outcome.valid);
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.message.contains("insufficient co-signatures")));
    }

    #[test]
    fn root_key_rotation_drops_self_and_duplicate_co_signatures() {
        let mut fixture = genesis_fixture();
        let bob = KeyPair::generate();
        let carol = KeyPair::generate();
        let e1 = add_member(&mut fixture, &bob, "Bob", 1_700_000_001_000);
        let e2 = add_member(&mut fixture, &carol, "Carol", 1_700_000_002_000);

        let new_root = KeyPair::generate();
        let self_sig = co_sign_rotation(&fixture.creator, &fixture.creator.public_key, &new_root.public_key, &fixture.state.group_id).unwrap();
        let bob_sig = co_sign_rotation(&bob, &fixture.creator.public_key, &new_root.public_key, &fixture.state.group_id).unwrap();
        let bob_sig_dup = bob_sig.clone();

        let rotation = EntryBuilder::new(
            Some(e2.entry_id),
            3,
            1_700_000_003_000,
            EntryPayload::RootKeyRotation {
                previous_root_pubkey: fixture.creator.public_key,
                new_root_pubkey: new_root.public_key,
                co_signatures: vec![self_sig, bob_sig, bob_sig_dup],
            },
        )
        .build(&fixture.creator)
        .unwrap();

        let preceding = vec![fixture.genesis.clone(), e1, e2];
        let outcome = validate_entry(&rotation, &preceding, Some(&fixture.state));
        // Only bob's single de-duplicated, non-self co-signature counts — one
        // short of the required two (§4.3, S2).
        assert!(!outcome.valid);
    }
}
