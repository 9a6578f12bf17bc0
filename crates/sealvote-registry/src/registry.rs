//! Identity registry state machine.

use crate::change::RegistryChange;
use crate::error::RegistryError;
use crate::profile::{is_valid_weight, UserProfile};
use crate::role::{authorize, Role};
use sealvote_types::{Address, Timestamp};
use std::collections::{BTreeSet, HashMap};

/// Registered identities, their weights and moderation state, and the
/// admin/moderator role sets.
#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    admin: Address,
    moderators: BTreeSet<Address>,
    profiles: HashMap<Address, UserProfile>,
    paused: bool,
}

impl IdentityRegistry {
    /// Registry with `admin` already installed.
    pub fn with_admin(admin: Address) -> Self {
        let mut registry = Self::default();
        registry.apply(&RegistryChange::Genesis { admin });
        registry
    }

    // ---- reads ----

    /// Resolve the capability level of `identity`.
    pub fn role_of(&self, identity: &Address) -> Role {
        if *identity == self.admin && !self.admin.is_zero() {
            Role::Admin
        } else if self.moderators.contains(identity) {
            Role::Moderator
        } else if self.profiles.get(identity).map_or(false, |p| p.is_registered) {
            Role::Registered
        } else {
            Role::Anonymous
        }
    }

    /// `is_registered && !is_banned`
    pub fn can_user_vote(&self, identity: &Address) -> bool {
        self.profiles.get(identity).map_or(false, UserProfile::can_vote)
    }

    pub fn profile(&self, identity: &Address) -> Option<&UserProfile> {
        self.profiles.get(identity)
    }

    /// Profile of `identity`, or the default (unregistered) profile.
    pub fn profile_or_default(&self, identity: &Address) -> UserProfile {
        self.profiles.get(identity).cloned().unwrap_or_default()
    }

    /// Weight of `identity`; 0 when unregistered.
    pub fn voting_weight(&self, identity: &Address) -> u32 {
        self.profiles
            .get(identity)
            .filter(|p| p.is_registered)
            .map_or(0, |p| p.voting_weight)
    }

    pub fn is_registered(&self, identity: &Address) -> bool {
        self.profiles.get(identity).map_or(false, |p| p.is_registered)
    }

    pub fn is_moderator(&self, identity: &Address) -> bool {
        self.moderators.contains(identity)
    }

    pub fn moderators(&self) -> impl Iterator<Item = &Address> {
        self.moderators.iter()
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn registered_count(&self) -> usize {
        self.profiles.values().filter(|p| p.is_registered).count()
    }

    // ---- planning ----

    fn ensure_not_paused(&self) -> Result<(), RegistryError> {
        if self.paused {
            return Err(RegistryError::SystemPaused);
        }
        Ok(())
    }

    fn require(&self, caller: &Address, required: Role) -> Result<(), RegistryError> {
        authorize(self.role_of(caller), required)
    }

    fn registered_profile(&self, identity: &Address) -> Result<&UserProfile, RegistryError> {
        self.profiles
            .get(identity)
            .filter(|p| p.is_registered)
            .ok_or(RegistryError::NotRegistered)
    }

    fn ensure_identity(identity: &Address) -> Result<(), RegistryError> {
        if identity.is_zero() {
            return Err(RegistryError::InvalidIdentity("zero address".to_string()));
        }
        Ok(())
    }

    /// Install the first admin. Only valid on an empty registry.
    pub fn plan_genesis(&self, admin: Address) -> Result<Vec<RegistryChange>, RegistryError> {
        Self::ensure_identity(&admin)?;
        if !self.admin.is_zero() {
            return Err(RegistryError::Unauthorized("admin already installed".to_string()));
        }
        Ok(vec![RegistryChange::Genesis { admin }])
    }

    /// Self-service registration with weight 1.
    pub fn plan_register_user(
        &self,
        caller: Address,
        now: Timestamp,
    ) -> Result<Vec<RegistryChange>, RegistryError> {
        self.ensure_not_paused()?;
        Self::ensure_identity(&caller)?;
        if self.is_registered(&caller) {
            return Err(RegistryError::AlreadyRegistered);
        }

        Ok(vec![RegistryChange::ProfileRegistered {
            user: caller,
            voting_weight: 1,
            registration_time: now,
        }])
    }

    /// Admin registration with an explicit weight. Overwrites the weight of
    /// an existing profile and keeps its ban state and first registration time.
    pub fn plan_register_user_with_weight(
        &self,
        caller: Address,
        target: Address,
        weight: u32,
        now: Timestamp,
    ) -> Result<Vec<RegistryChange>, RegistryError> {
        self.ensure_not_paused()?;
        self.require(&caller, Role::Admin)?;
        Self::ensure_identity(&target)?;
        if !is_valid_weight(weight) {
            return Err(RegistryError::InvalidWeight(weight));
        }

        let registration_time = match self.profiles.get(&target) {
            Some(p) if p.is_registered => p.registration_time,
            _ => now,
        };

        Ok(vec![RegistryChange::ProfileRegistered {
            user: target,
            voting_weight: weight,
            registration_time,
        }])
    }

    pub fn plan_update_voting_weight(
        &self,
        caller: Address,
        target: Address,
        weight: u32,
    ) -> Result<Vec<RegistryChange>, RegistryError> {
        self.ensure_not_paused()?;
        self.require(&caller, Role::Moderator)?;
        let profile = self.registered_profile(&target)?;
        if !is_valid_weight(weight) {
            return Err(RegistryError::InvalidWeight(weight));
        }

        Ok(vec![RegistryChange::WeightUpdated {
            user: target,
            old_weight: profile.voting_weight,
            new_weight: weight,
        }])
    }

    pub fn plan_ban_user(
        &self,
        caller: Address,
        target: Address,
        reason: String,
    ) -> Result<Vec<RegistryChange>, RegistryError> {
        self.ensure_not_paused()?;
        self.require(&caller, Role::Moderator)?;
        if target == self.admin {
            return Err(RegistryError::Unauthorized("the admin cannot be banned".to_string()));
        }
        let profile = self.registered_profile(&target)?;
        if profile.is_banned {
            return Err(RegistryError::AlreadyBanned);
        }

        Ok(vec![RegistryChange::Banned {
            user: target,
            reason,
            banned_by: caller,
        }])
    }

    pub fn plan_unban_user(
        &self,
        caller: Address,
        target: Address,
    ) -> Result<Vec<RegistryChange>, RegistryError> {
        self.ensure_not_paused()?;
        self.require(&caller, Role::Moderator)?;
        let profile = self.registered_profile(&target)?;
        if !profile.is_banned {
            return Err(RegistryError::NotBanned);
        }

        Ok(vec![RegistryChange::Unbanned {
            user: target,
            unbanned_by: caller,
        }])
    }

    /// Idempotent: adding an existing moderator plans nothing.
    pub fn plan_add_moderator(
        &self,
        caller: Address,
        target: Address,
    ) -> Result<Vec<RegistryChange>, RegistryError> {
        self.ensure_not_paused()?;
        self.require(&caller, Role::Admin)?;
        Self::ensure_identity(&target)?;
        if self.moderators.contains(&target) {
            return Ok(Vec::new());
        }

        Ok(vec![RegistryChange::ModeratorAdded {
            moderator: target,
            added_by: caller,
        }])
    }

    /// Idempotent: removing a non-moderator plans nothing.
    pub fn plan_remove_moderator(
        &self,
        caller: Address,
        target: Address,
    ) -> Result<Vec<RegistryChange>, RegistryError> {
        self.ensure_not_paused()?;
        self.require(&caller, Role::Admin)?;
        if !self.moderators.contains(&target) {
            return Ok(Vec::new());
        }

        Ok(vec![RegistryChange::ModeratorRemoved {
            moderator: target,
            removed_by: caller,
        }])
    }

    /// Hand the admin role to `target` in a single change.
    pub fn plan_transfer_admin(
        &self,
        caller: Address,
        target: Address,
    ) -> Result<Vec<RegistryChange>, RegistryError> {
        self.ensure_not_paused()?;
        self.require(&caller, Role::Admin)?;
        Self::ensure_identity(&target)?;
        if target == self.admin {
            return Ok(Vec::new());
        }

        Ok(vec![RegistryChange::AdminTransferred {
            previous: self.admin,
            new_admin: target,
        }])
    }

    pub fn plan_pause(&self, caller: Address) -> Result<Vec<RegistryChange>, RegistryError> {
        self.ensure_not_paused()?;
        self.require(&caller, Role::Admin)?;
        Ok(vec![RegistryChange::Paused { by: caller }])
    }

    /// The only mutating operation accepted while paused.
    pub fn plan_unpause(&self, caller: Address) -> Result<Vec<RegistryChange>, RegistryError> {
        self.require(&caller, Role::Admin)?;
        if !self.paused {
            return Ok(Vec::new());
        }
        Ok(vec![RegistryChange::Unpaused { by: caller }])
    }

    // ---- apply ----

    /// Fold a committed change into state. Never fails.
    pub fn apply(&mut self, change: &RegistryChange) {
        match change {
            RegistryChange::Genesis { admin } => {
                self.admin = *admin;
                self.moderators.insert(*admin);
                tracing::debug!(admin = %admin, "Registry genesis applied");
            }
            RegistryChange::ProfileRegistered { user, voting_weight, registration_time } => {
                let profile = self.profiles.entry(*user).or_default();
                profile.is_registered = true;
                profile.voting_weight = *voting_weight;
                profile.registration_time = *registration_time;
            }
            RegistryChange::WeightUpdated { user, new_weight, .. } => {
                if let Some(profile) = self.profiles.get_mut(user) {
                    profile.voting_weight = *new_weight;
                }
            }
            RegistryChange::Banned { user, reason, banned_by } => {
                if let Some(profile) = self.profiles.get_mut(user) {
                    profile.is_banned = true;
                    profile.ban_reason = reason.clone();
                    profile.banned_by = *banned_by;
                }
            }
            RegistryChange::Unbanned { user, .. } => {
                if let Some(profile) = self.profiles.get_mut(user) {
                    profile.is_banned = false;
                    profile.ban_reason.clear();
                    profile.banned_by = Address::ZERO;
                }
            }
            RegistryChange::ModeratorAdded { moderator, .. } => {
                self.moderators.insert(*moderator);
            }
            RegistryChange::ModeratorRemoved { moderator, .. } => {
                self.moderators.remove(moderator);
            }
            RegistryChange::AdminTransferred { new_admin, .. } => {
                self.admin = *new_admin;
                self.moderators.insert(*new_admin);
            }
            RegistryChange::Paused { .. } => self.paused = true,
            RegistryChange::Unpaused { .. } => self.paused = false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Address {
        Address::from_label("admin")
    }
    fn alice() -> Address {
        Address::from_label("alice")
    }
    fn bob() -> Address {
        Address::from_label("bob")
    }

    fn commit(
        registry: &mut IdentityRegistry,
        plan: Result<Vec<RegistryChange>, RegistryError>,
    ) -> Result<Vec<RegistryChange>, RegistryError> {
        let changes = plan?;
        for change in &changes {
            registry.apply(change);
        }
        Ok(changes)
    }

    fn registry_with_alice() -> IdentityRegistry {
        let mut registry = IdentityRegistry::with_admin(admin());
        let plan = registry.plan_register_user(alice(), 100);
        commit(&mut registry, plan).unwrap();
        registry
    }

    #[test]
    fn test_register_user() {
        let mut registry = IdentityRegistry::with_admin(admin());
        let plan = registry.plan_register_user(alice(), 100);
        let changes = commit(&mut registry, plan).unwrap();
        assert_eq!(changes.len(), 1);

        let profile = registry.profile(&alice()).unwrap();
        assert!(profile.is_registered);
        assert!(!profile.is_banned);
        assert_eq!(profile.voting_weight, 1);
        assert_eq!(profile.registration_time, 100);
        assert_eq!(registry.role_of(&alice()), Role::Registered);
    }

    #[test]
    fn test_double_registration_rejected() {
        let registry = registry_with_alice();
        assert_eq!(
            registry.plan_register_user(alice(), 200),
            Err(RegistryError::AlreadyRegistered)
        );
    }

    #[test]
    fn test_register_with_weight() {
        let mut registry = IdentityRegistry::with_admin(admin());
        let plan = registry.plan_register_user_with_weight(admin(), alice(), 5, 100);
        commit(&mut registry, plan).unwrap();
        assert_eq!(registry.voting_weight(&alice()), 5);

        assert_eq!(
            registry.plan_register_user_with_weight(admin(), bob(), 0, 100),
            Err(RegistryError::InvalidWeight(0))
        );
        assert_eq!(
            registry.plan_register_user_with_weight(admin(), bob(), 101, 100),
            Err(RegistryError::InvalidWeight(101))
        );
        assert!(matches!(
            registry.plan_register_user_with_weight(alice(), bob(), 5, 100),
            Err(RegistryError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_register_with_weight_keeps_ban_and_time() {
        let mut registry = registry_with_alice();
        let plan = registry.plan_ban_user(admin(), alice(), "spam".to_string());
        commit(&mut registry, plan).unwrap();

        let plan = registry.plan_register_user_with_weight(admin(), alice(), 9, 500);
        commit(&mut registry, plan).unwrap();

        let profile = registry.profile(&alice()).unwrap();
        assert_eq!(profile.voting_weight, 9);
        assert_eq!(profile.registration_time, 100);
        assert!(profile.is_banned);
    }

    #[test]
    fn test_update_voting_weight() {
        let mut registry = registry_with_alice();
        let plan = registry.plan_update_voting_weight(admin(), alice(), 10);
        let changes = commit(&mut registry, plan).unwrap();
        assert_eq!(
            changes,
            vec![RegistryChange::WeightUpdated { user: alice(), old_weight: 1, new_weight: 10 }]
        );
        assert_eq!(registry.voting_weight(&alice()), 10);

        assert_eq!(
            registry.plan_update_voting_weight(admin(), bob(), 5),
            Err(RegistryError::NotRegistered)
        );
        assert_eq!(
            registry.plan_update_voting_weight(admin(), alice(), 0),
            Err(RegistryError::InvalidWeight(0))
        );
        assert!(matches!(
            registry.plan_update_voting_weight(alice(), bob(), 5),
            Err(RegistryError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_ban_and_unban() {
        let mut registry = registry_with_alice();
        assert!(registry.can_user_vote(&alice()));

        let plan = registry.plan_ban_user(admin(), alice(), "Violation of terms".to_string());
        commit(&mut registry, plan).unwrap();
        let profile = registry.profile(&alice()).unwrap();
        assert!(profile.is_banned);
        assert_eq!(profile.ban_reason, "Violation of terms");
        assert_eq!(profile.banned_by, admin());
        assert!(!registry.can_user_vote(&alice()));
        assert_eq!(
            registry.plan_ban_user(admin(), alice(), "again".to_string()),
            Err(RegistryError::AlreadyBanned)
        );

        let plan = registry.plan_unban_user(admin(), alice());
        commit(&mut registry, plan).unwrap();
        let profile = registry.profile(&alice()).unwrap();
        assert!(!profile.is_banned);
        assert_eq!(profile.ban_reason, "");
        assert!(registry.can_user_vote(&alice()));
        assert_eq!(registry.plan_unban_user(admin(), alice()), Err(RegistryError::NotBanned));
    }

    #[test]
    fn test_admin_cannot_be_banned() {
        let mut registry = IdentityRegistry::with_admin(admin());
        let plan = registry.plan_register_user(admin(), 1);
        commit(&mut registry, plan).unwrap();
        let plan = registry.plan_add_moderator(admin(), bob());
        commit(&mut registry, plan).unwrap();

        assert!(matches!(
            registry.plan_ban_user(bob(), admin(), "coup".to_string()),
            Err(RegistryError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_moderator_management_is_idempotent() {
        let mut registry = registry_with_alice();

        let plan = registry.plan_add_moderator(admin(), alice());
        assert_eq!(commit(&mut registry, plan).unwrap().len(), 1);
        let once: Vec<Address> = registry.moderators().copied().collect();

        let plan = registry.plan_add_moderator(admin(), alice());
        assert!(commit(&mut registry, plan).unwrap().is_empty());
        let twice: Vec<Address> = registry.moderators().copied().collect();
        assert_eq!(once, twice);
        assert!(registry.is_moderator(&alice()));

        let plan = registry.plan_remove_moderator(admin(), alice());
        commit(&mut registry, plan).unwrap();
        assert!(!registry.is_moderator(&alice()));

        let plan = registry.plan_remove_moderator(admin(), alice());
        assert!(commit(&mut registry, plan).unwrap().is_empty());
    }

    #[test]
    fn test_non_admin_cannot_manage_moderators() {
        let registry = registry_with_alice();
        assert!(matches!(
            registry.plan_add_moderator(alice(), bob()),
            Err(RegistryError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_moderator_can_ban_but_not_add_moderators() {
        let mut registry = registry_with_alice();
        let plan = registry.plan_add_moderator(admin(), bob());
        commit(&mut registry, plan).unwrap();

        assert!(registry.plan_ban_user(bob(), alice(), "x".to_string()).is_ok());
        assert!(registry.plan_add_moderator(bob(), alice()).is_err());
    }

    #[test]
    fn test_transfer_admin() {
        let mut registry = registry_with_alice();
        let plan = registry.plan_transfer_admin(admin(), alice());
        let changes = commit(&mut registry, plan).unwrap();
        assert_eq!(changes.len(), 1);

        assert_eq!(registry.admin(), alice());
        assert_eq!(registry.role_of(&alice()), Role::Admin);
        assert!(registry.is_moderator(&alice()));
        assert_ne!(registry.role_of(&admin()), Role::Admin);

        // Previous admin has lost admin-only rights.
        assert!(registry.plan_pause(admin()).is_err());
        assert!(registry.plan_pause(alice()).is_ok());
    }

    #[test]
    fn test_transfer_admin_rejects_non_admin_and_zero() {
        let registry = registry_with_alice();
        assert!(matches!(
            registry.plan_transfer_admin(alice(), bob()),
            Err(RegistryError::Unauthorized(_))
        ));
        assert!(matches!(
            registry.plan_transfer_admin(admin(), Address::ZERO),
            Err(RegistryError::InvalidIdentity(_))
        ));
    }

    #[test]
    fn test_pause_blocks_mutations_not_reads() {
        let mut registry = registry_with_alice();
        let plan = registry.plan_pause(admin());
        commit(&mut registry, plan).unwrap();
        assert!(registry.is_paused());

        assert_eq!(registry.plan_register_user(bob(), 1), Err(RegistryError::SystemPaused));
        assert_eq!(
            registry.plan_update_voting_weight(admin(), alice(), 3),
            Err(RegistryError::SystemPaused)
        );
        assert_eq!(registry.plan_add_moderator(admin(), bob()), Err(RegistryError::SystemPaused));
        assert_eq!(registry.plan_pause(admin()), Err(RegistryError::SystemPaused));

        // Reads still work.
        assert!(registry.can_user_vote(&alice()));
        assert_eq!(registry.voting_weight(&alice()), 1);

        assert!(matches!(registry.plan_unpause(alice()), Err(RegistryError::Unauthorized(_))));
        let plan = registry.plan_unpause(admin());
        commit(&mut registry, plan).unwrap();
        assert!(!registry.is_paused());
        assert!(registry.plan_unpause(admin()).unwrap().is_empty());
    }

    #[test]
    fn test_non_admin_cannot_pause() {
        let registry = registry_with_alice();
        assert!(matches!(registry.plan_pause(alice()), Err(RegistryError::Unauthorized(_))));
    }

    #[test]
    fn test_can_user_vote_tracks_profile() {
        let registry = registry_with_alice();
        assert!(registry.can_user_vote(&alice()));
        assert!(!registry.can_user_vote(&bob()));
        assert_eq!(registry.voting_weight(&bob()), 0);
        assert_eq!(registry.profile_or_default(&bob()), UserProfile::default());
    }

    #[test]
    fn test_genesis_only_once() {
        let registry = IdentityRegistry::with_admin(admin());
        assert!(registry.plan_genesis(bob()).is_err());
        assert!(IdentityRegistry::default().plan_genesis(bob()).is_ok());
        assert!(IdentityRegistry::default().plan_genesis(Address::ZERO).is_err());
    }

    #[test]
    fn test_events_for_changes() {
        let change = RegistryChange::Banned {
            user: alice(),
            reason: "r".to_string(),
            banned_by: admin(),
        };
        assert_eq!(change.event().unwrap().name(), "UserBanned");
        assert!(RegistryChange::Genesis { admin: admin() }.event().is_none());
    }
}
