//! Domain types shared between the ingestion core and the catalog

use crate::error::CommonError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of every build directory name
pub const BUILD_DIR_PREFIX: &str = "game-";

/// Identifier minted once per ingestion attempt.
///
/// A token names the exclusive build directory of that attempt
/// (`game-<uuid>`). Tokens are never reused, so a retried upload can never
/// collide with the remnants of an earlier attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildToken(Uuid);

impl BuildToken {
    /// Mint a fresh random token
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Directory name under the builds area
    pub fn dir_name(&self) -> String {
        format!("{}{}", BUILD_DIR_PREFIX, self.0)
    }

    /// Recover a token from a build directory name
    pub fn from_dir_name(name: &str) -> Result<Self, CommonError> {
        let raw = name
            .strip_prefix(BUILD_DIR_PREFIX)
            .ok_or_else(|| CommonError::InvalidToken(name.to_string()))?;
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| CommonError::InvalidToken(name.to_string()))
    }
}

impl std::fmt::Display for BuildToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a published game record.
///
/// `PendingDelete` is the reversible intermediate state held while physical
/// artifacts are being removed. Readers only ever see `Active` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    Active,
    PendingDelete,
    Deleted,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Active => "active",
            GameStatus::PendingDelete => "pending_delete",
            GameStatus::Deleted => "deleted",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: GameStatus) -> bool {
        matches!(
            (self, next),
            (GameStatus::Active, GameStatus::PendingDelete)
                | (GameStatus::PendingDelete, GameStatus::Active)
                | (GameStatus::PendingDelete, GameStatus::Deleted)
        )
    }
}

impl std::str::FromStr for GameStatus {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(GameStatus::Active),
            "pending_delete" => Ok(GameStatus::PendingDelete),
            "deleted" => Ok(GameStatus::Deleted),
            other => Err(CommonError::InvalidStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_build_token_dir_name_round_trip() {
        let token = BuildToken::mint();
        let name = token.dir_name();
        assert!(name.starts_with("game-"));
        assert_eq!(BuildToken::from_dir_name(&name).unwrap(), token);
    }

    #[test]
    fn test_build_token_rejects_foreign_names() {
        assert!(BuildToken::from_dir_name("thumbnail-123").is_err());
        assert!(BuildToken::from_dir_name("game-not-a-uuid").is_err());
    }

    #[test]
    fn test_build_tokens_are_unique() {
        let tokens: HashSet<_> = (0..10_000).map(|_| BuildToken::mint()).collect();
        assert_eq!(tokens.len(), 10_000);
    }

    #[test]
    fn test_status_parse_and_display() {
        for status in [GameStatus::Active, GameStatus::PendingDelete, GameStatus::Deleted] {
            assert_eq!(status.as_str().parse::<GameStatus>().unwrap(), status);
        }
        assert!("archived".parse::<GameStatus>().is_err());
    }

    #[test]
    fn test_status_transitions() {
        assert!(GameStatus::Active.can_transition_to(GameStatus::PendingDelete));
        assert!(GameStatus::PendingDelete.can_transition_to(GameStatus::Deleted));
        assert!(GameStatus::PendingDelete.can_transition_to(GameStatus::Active));
        assert!(!GameStatus::Active.can_transition_to(GameStatus::Deleted));
        assert!(!GameStatus::Deleted.can_transition_to(GameStatus::Active));
    }
}
