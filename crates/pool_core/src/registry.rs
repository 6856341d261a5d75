//! Driver / passenger registration.
//!
//! Roles are independent capability flags on one identity: the same
//! participant may register as a driver, a passenger, or both.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ParticipantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Driver,
    Passenger,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Driver => f.write_str("driver"),
            Role::Passenger => f.write_str("passenger"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{participant} is already registered as a {role}")]
    AlreadyRegistered { participant: ParticipantId, role: Role },

    #[error("{participant} is not registered as a {role}")]
    NotRegistered { participant: ParticipantId, role: Role },
}

/// Registration fact for one role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleStatus {
    pub is_registered: bool,
    /// Set while the participant has a ride that has not completed yet.
    pub has_ride: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub driver: RoleStatus,
    pub passenger: RoleStatus,
}

impl Member {
    fn role(&self, role: Role) -> &RoleStatus {
        match role {
            Role::Driver => &self.driver,
            Role::Passenger => &self.passenger,
        }
    }

    fn role_mut(&mut self, role: Role) -> &mut RoleStatus {
        match role {
            Role::Driver => &mut self.driver,
            Role::Passenger => &mut self.passenger,
        }
    }
}

/// Registration lookups the coordinator gates its operations on.
pub trait ParticipantRegistry {
    fn is_registered_driver(&self, participant: ParticipantId) -> bool;

    fn is_registered_passenger(&self, participant: ParticipantId) -> bool;

    /// Fails with [`RegistryError::NotRegistered`] unless `participant` holds `role`.
    fn require(&self, participant: ParticipantId, role: Role) -> Result<(), RegistryError> {
        let registered = match role {
            Role::Driver => self.is_registered_driver(participant),
            Role::Passenger => self.is_registered_passenger(participant),
        };
        if registered {
            Ok(())
        } else {
            Err(RegistryError::NotRegistered { participant, role })
        }
    }
}

/// In-memory member table.
#[derive(Debug, Clone, Default)]
pub struct MemberRegistry {
    members: BTreeMap<ParticipantId, Member>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_driver(&mut self, participant: ParticipantId) -> Result<(), RegistryError> {
        self.register(participant, Role::Driver)
    }

    pub fn register_passenger(&mut self, participant: ParticipantId) -> Result<(), RegistryError> {
        self.register(participant, Role::Passenger)
    }

    fn register(&mut self, participant: ParticipantId, role: Role) -> Result<(), RegistryError> {
        let status = self.members.entry(participant).or_default().role_mut(role);
        if status.is_registered {
            return Err(RegistryError::AlreadyRegistered { participant, role });
        }
        status.is_registered = true;
        Ok(())
    }

    /// Member record; unknown participants read as unregistered in both roles.
    pub fn member(&self, participant: ParticipantId) -> Member {
        self.members.get(&participant).copied().unwrap_or_default()
    }

    pub fn driver(&self, participant: ParticipantId) -> RoleStatus {
        self.member(participant).driver
    }

    pub fn passenger(&self, participant: ParticipantId) -> RoleStatus {
        self.member(participant).passenger
    }

    /// Update the `has_ride` marker of a registered role. Unregistered roles are left untouched.
    pub fn set_has_ride(&mut self, participant: ParticipantId, role: Role, has_ride: bool) {
        if let Some(member) = self.members.get_mut(&participant) {
            let status = member.role_mut(role);
            if status.is_registered {
                status.has_ride = has_ride;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl ParticipantRegistry for MemberRegistry {
    fn is_registered_driver(&self, participant: ParticipantId) -> bool {
        self.members
            .get(&participant)
            .is_some_and(|m| m.role(Role::Driver).is_registered)
    }

    fn is_registered_passenger(&self, participant: ParticipantId) -> bool {
        self.members
            .get(&participant)
            .is_some_and(|m| m.role(Role::Passenger).is_registered)
    }
}
