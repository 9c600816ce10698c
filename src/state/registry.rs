use crate::types::{Participant, ParticipantId};

#[derive(Debug, Clone)]
struct Connection {
    participant: Participant,
    /// Open sockets for this user; the entry goes away when it reaches zero
    sockets: usize,
    /// Open sockets that presented the moderator key
    privileged_sockets: usize,
}

impl Connection {
    fn sync_privilege(&mut self) {
        self.participant.external_privileged = self.privileged_sockets > 0;
    }
}

/// Connected users in arrival order plus the moderator derived from them
#[derive(Debug, Clone, Default)]
pub struct ParticipantRegistry {
    connected: Vec<Connection>,
    moderator: Option<ParticipantId>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a participant. Returns the moderator if the role changed hands.
    pub fn join(&mut self, participant: Participant) -> Option<ParticipantId> {
        if let Some(existing) = self
            .connected
            .iter_mut()
            .find(|c| c.participant.id == participant.id)
        {
            existing.sockets += 1;
            if participant.external_privileged {
                existing.privileged_sockets += 1;
            }
            existing.sync_privilege();
            return None;
        }

        let privileged_sockets = usize::from(participant.external_privileged);
        self.connected.push(Connection {
            participant,
            sockets: 1,
            privileged_sockets,
        });
        self.recompute_moderator()
    }

    /// Close one socket of `participant`, as it was presented on join. Returns whether
    /// they actually left, and the new moderator if the role changed hands.
    pub fn leave(&mut self, participant: &Participant) -> (bool, Option<ParticipantId>) {
        let Some(pos) = self
            .connected
            .iter()
            .position(|c| c.participant.id == participant.id)
        else {
            return (false, None);
        };

        let connection = &mut self.connected[pos];
        connection.sockets -= 1;
        if participant.external_privileged {
            connection.privileged_sockets = connection.privileged_sockets.saturating_sub(1);
        }
        connection.sync_privilege();
        if connection.sockets > 0 {
            return (false, None);
        }

        self.connected.remove(pos);
        (true, self.recompute_moderator())
    }

    /// Earliest still-connected participant holds the role
    fn recompute_moderator(&mut self) -> Option<ParticipantId> {
        let earliest = self.connected.first().map(|c| c.participant.id.clone());
        if earliest == self.moderator {
            return None;
        }
        self.moderator = earliest;
        self.moderator.clone()
    }

    pub fn moderator(&self) -> Option<&ParticipantId> {
        self.moderator.as_ref()
    }

    pub fn is_privileged(&self, participant: &ParticipantId) -> bool {
        self.moderator.as_ref() == Some(participant)
            || self.get(participant).is_some_and(|p| p.external_privileged)
    }

    pub fn get(&self, participant: &ParticipantId) -> Option<&Participant> {
        self.connected
            .iter()
            .map(|c| &c.participant)
            .find(|p| &p.id == participant)
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.get(participant).is_some()
    }

    pub fn len(&self) -> usize {
        self.connected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: &str) -> Participant {
        Participant::new(id, id.to_uppercase())
    }

    #[test]
    fn test_first_participant_becomes_moderator() {
        let mut registry = ParticipantRegistry::new();

        assert_eq!(registry.join(p("a")), Some("a".to_string()));
        assert_eq!(registry.join(p("b")), None);
        assert_eq!(registry.moderator(), Some(&"a".to_string()));
        assert!(registry.is_privileged(&"a".to_string()));
        assert!(!registry.is_privileged(&"b".to_string()));
    }

    #[test]
    fn test_moderator_passes_to_earliest_remaining() {
        let mut registry = ParticipantRegistry::new();
        registry.join(p("a"));
        registry.join(p("b"));
        registry.join(p("c"));

        let (removed, new_mod) = registry.leave(&p("a"));
        assert!(removed);
        assert_eq!(new_mod, Some("b".to_string()));
        assert_eq!(registry.moderator(), Some(&"b".to_string()));
    }

    #[test]
    fn test_non_moderator_leaving_keeps_role() {
        let mut registry = ParticipantRegistry::new();
        registry.join(p("a"));
        registry.join(p("b"));

        assert_eq!(registry.leave(&p("b")), (true, None));
        assert_eq!(registry.moderator(), Some(&"a".to_string()));
    }

    #[test]
    fn test_empty_roster_has_no_moderator() {
        let mut registry = ParticipantRegistry::new();
        registry.join(p("a"));
        registry.leave(&p("a"));

        assert!(registry.moderator().is_none());
        assert!(registry.is_empty());
        assert_eq!(registry.leave(&p("a")), (false, None));
    }

    #[test]
    fn test_second_socket_keeps_membership() {
        let mut registry = ParticipantRegistry::new();
        registry.join(p("a"));
        registry.join(p("a"));
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.leave(&p("a")), (false, None));
        assert!(registry.contains(&"a".to_string()));
        assert_eq!(registry.leave(&p("a")), (true, None));
        assert!(!registry.contains(&"a".to_string()));
    }

    #[test]
    fn test_external_role_is_privileged() {
        let mut registry = ParticipantRegistry::new();
        registry.join(p("a"));
        let mut staff = p("staff");
        staff.external_privileged = true;
        registry.join(staff);

        assert!(registry.is_privileged(&"staff".to_string()));
    }

    #[test]
    fn test_key_privilege_ends_with_its_socket() {
        let mut registry = ParticipantRegistry::new();
        registry.join(p("a"));
        let mut staff = p("staff");
        staff.external_privileged = true;
        registry.join(p("staff"));
        registry.join(staff.clone());
        assert!(registry.is_privileged(&"staff".to_string()));

        // The keyed socket closes while a plain one stays open
        assert_eq!(registry.leave(&staff), (false, None));
        assert!(registry.contains(&"staff".to_string()));
        assert!(!registry.is_privileged(&"staff".to_string()));
    }
}
