use std::collections::{BTreeMap, BTreeSet};

use ledger_core::{Amount, GroupId, Hash, LamportClock, PublicKey, Timestamp};

/// A member's derived record: who they are, when they joined/left, and which
/// device keys are currently authorized to sign on their behalf.
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    pub display_name: String,
    pub joined_at: Timestamp,
    pub is_active: bool,
    pub removed_at: Option<Timestamp>,
    pub authorized_devices: BTreeSet<PublicKey>,
}

impl Member {
    fn new(display_name: String, joined_at: Timestamp, initial_device: PublicKey) -> Self {
        let mut authorized_devices = BTreeSet::new();
        authorized_devices.insert(initial_device);
        Self {
            display_name,
            joined_at,
            is_active: true,
            removed_at: None,
            authorized_devices,
        }
    }
}

/// The full state of one group, reconstructed deterministically by replaying
/// its chain from Genesis. Never transmitted on the wire — every peer derives
/// it independently from the same entries.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupState {
    pub group_id: GroupId,
    pub group_name: String,
    pub creator_root_pubkey: PublicKey,
    pub members: BTreeMap<PublicKey, Member>,
    pub latest_entry_hash: Option<Hash>,
    pub current_lamport_clock: LamportClock,
    pub balances: BTreeMap<PublicKey, Amount>,
}

impl GroupState {
    pub(crate) fn from_genesis(
        group_id: GroupId,
        group_name: String,
        creator_root_pubkey: PublicKey,
        creator_display_name: String,
        creator_device_pubkey: PublicKey,
        joined_at: Timestamp,
    ) -> Self {
        let mut members = BTreeMap::new();
        members.insert(
            creator_root_pubkey,
            Member::new(creator_display_name, joined_at, creator_device_pubkey),
        );
        Self {
            group_id,
            group_name,
            creator_root_pubkey,
            members,
            latest_entry_hash: None,
            current_lamport_clock: 0,
            balances: BTreeMap::new(),
        }
    }

    pub fn is_active_member(&self, root_pubkey: &PublicKey) -> bool {
        self.members
            .get(root_pubkey)
            .map(|m| m.is_active)
            .unwrap_or(false)
    }

    pub fn active_member_count(&self) -> usize {
        self.members.values().filter(|m| m.is_active).count()
    }

    /// True iff `device_pubkey` is currently in the authorized-device set of
    /// some active member.
    pub fn device_authorized(&self, device_pubkey: &PublicKey) -> bool {
        self.members
            .values()
            .any(|m| m.is_active && m.authorized_devices.contains(device_pubkey))
    }

    pub fn owner_of_device(&self, device_pubkey: &PublicKey) -> Option<&PublicKey> {
        self.members
            .iter()
            .find(|(_, m)| m.authorized_devices.contains(device_pubkey))
            .map(|(root, _)| root)
    }

    pub(crate) fn insert_member(
        &mut self,
        root_pubkey: PublicKey,
        display_name: String,
        joined_at: Timestamp,
        initial_device: PublicKey,
    ) {
        self.members
            .insert(root_pubkey, Member::new(display_name, joined_at, initial_device));
    }

    /// Apply a `RootKeyRotation`: deactivate `previous_root_pubkey`, then
    /// insert `new_root_pubkey` as an active member inheriting the display
    /// name and join date but starting with an *empty* device set — the new
    /// root must explicitly re-authorize devices (§4.4). If the previous
    /// root was the group creator, the creator key follows the rotation.
    pub(crate) fn rotate_root_key(
        &mut self,
        previous_root_pubkey: &PublicKey,
        new_root_pubkey: PublicKey,
        removed_at: Timestamp,
    ) {
        let Some(mut previous) = self.members.remove(previous_root_pubkey) else {
            return;
        };
        previous.is_active = false;
        previous.removed_at = Some(removed_at);
        let display_name = previous.display_name.clone();
        let joined_at = previous.joined_at;
        self.members.insert(*previous_root_pubkey, previous);

        self.members.insert(
            new_root_pubkey,
            Member {
                display_name,
                joined_at,
                is_active: true,
                removed_at: None,
                authorized_devices: BTreeSet::new(),
            },
        );

        if self.creator_root_pubkey == *previous_root_pubkey {
            self.creator_root_pubkey = new_root_pubkey;
        }
    }
}
