//! Reconciliation of externally-reported player names with chat identities.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Chat-platform user taking part in a monitored game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    /// Stable chat user identifier, also used to mention the player.
    pub id: String,
    /// Name shown in summaries and logs.
    pub display_name: String,
    /// Server-specific nickname, when the user set one.
    pub nickname: Option<String>,
    /// Raw account username.
    pub username: String,
}

impl PlayerIdentity {
    /// Build an identity without a nickname.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            nickname: None,
            username: username.into(),
        }
    }

    /// Attach a nickname to the identity.
    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }
}

/// Operator-maintained overrides from a player id to the name the game host reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMap {
    aliases: HashMap<String, String>,
}

impl IdentityMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the override alias for `player_id`, returning the previous one.
    pub fn set_alias(
        &mut self,
        player_id: impl Into<String>,
        alias: impl Into<String>,
    ) -> Option<String> {
        self.aliases.insert(player_id.into(), alias.into())
    }

    /// Drop the override alias for `player_id`.
    pub fn remove_alias(&mut self, player_id: &str) -> Option<String> {
        self.aliases.remove(player_id)
    }

    /// Override alias registered for `player_id`, if any.
    pub fn alias_for(&self, player_id: &str) -> Option<&str> {
        self.aliases.get(player_id).map(String::as_str)
    }

    /// Iterate over `(player_id, alias)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases
            .iter()
            .map(|(id, alias)| (id.as_str(), alias.as_str()))
    }

    /// Number of registered aliases.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Whether no alias is registered.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl FromIterator<(String, String)> for IdentityMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            aliases: iter.into_iter().collect(),
        }
    }
}

/// Find the tracked player an external name refers to.
///
/// Tiers are evaluated across every candidate before moving on to the next one:
/// override alias, then nickname, then username. Comparison is exact, so a
/// differently-cased name does not match.
pub fn resolve<'a, I>(
    players: I,
    external_name: &str,
    identities: &IdentityMap,
) -> Option<&'a PlayerIdentity>
where
    I: IntoIterator<Item = &'a PlayerIdentity>,
    I::IntoIter: Clone,
{
    let players = players.into_iter();

    players
        .clone()
        .find(|player| identities.alias_for(&player.id) == Some(external_name))
        .or_else(|| {
            players
                .clone()
                .find(|player| player.nickname.as_deref() == Some(external_name))
        })
        .or_else(|| {
            players
                .clone()
                .find(|player| player.username == external_name)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> PlayerIdentity {
        PlayerIdentity::new("100", "Alice", "alice").with_nickname("Ali")
    }

    fn bob() -> PlayerIdentity {
        PlayerIdentity::new("200", "Bob", "BobWeb")
    }

    #[test]
    fn alias_wins_over_nickname_and_username() {
        let players = vec![alice(), bob()];
        let mut identities = IdentityMap::new();
        identities.set_alias("100", "AliceWeb");

        let resolved = resolve(&players, "AliceWeb", &identities).unwrap();
        assert_eq!(resolved.id, "100");
    }

    #[test]
    fn alias_of_one_player_beats_username_of_another() {
        // Bob's username collides with the alias registered for Alice.
        let players = vec![bob(), alice()];
        let mut identities = IdentityMap::new();
        identities.set_alias("100", "BobWeb");

        let resolved = resolve(&players, "BobWeb", &identities).unwrap();
        assert_eq!(resolved.id, "100");
    }

    #[test]
    fn nickname_beats_username() {
        let carol = PlayerIdentity::new("300", "Carol", "Ali");
        let players = vec![carol, alice()];

        let resolved = resolve(&players, "Ali", &IdentityMap::new()).unwrap();
        assert_eq!(resolved.id, "100");
    }

    #[test]
    fn falls_back_to_username() {
        let players = vec![alice(), bob()];
        let resolved = resolve(&players, "BobWeb", &IdentityMap::new()).unwrap();
        assert_eq!(resolved.id, "200");
    }

    #[test]
    fn matching_is_exact() {
        let players = vec![alice(), bob()];
        assert!(resolve(&players, "bobweb", &IdentityMap::new()).is_none());
        assert!(resolve(&players, "BobWeb ", &IdentityMap::new()).is_none());
    }

    #[test]
    fn unknown_name_is_unresolved() {
        let players = vec![alice(), bob()];
        assert!(resolve(&players, "Mallory", &IdentityMap::new()).is_none());
    }

    #[test]
    fn alias_for_untracked_player_is_ignored() {
        let players = vec![bob()];
        let mut identities = IdentityMap::new();
        identities.set_alias("999", "Ghost");

        assert!(resolve(&players, "Ghost", &identities).is_none());
    }
}
