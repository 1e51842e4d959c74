use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Opaque identifier of a remote sender.
///
/// Only ever used as a set key; the string is never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ParticipantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_participant(s));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<i64> for ParticipantId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for ParticipantId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of conversation an inbound message arrived in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    #[default]
    Dm,
    Group,
    Channel,
}

impl ChatType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dm => "dm",
            Self::Group => "group",
            Self::Channel => "channel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_whitespace() {
        let pid: ParticipantId = "  1001 ".parse().unwrap();
        assert_eq!(pid.as_str(), "1001");
    }

    #[test]
    fn parse_rejects_blank() {
        assert!(matches!(
            "   ".parse::<ParticipantId>(),
            Err(Error::InvalidParticipant(_))
        ));
    }

    #[test]
    fn numeric_ids_match_their_string_form() {
        let from_num = ParticipantId::from(377_114_917_i64);
        let from_str: ParticipantId = "377114917".parse().unwrap();
        assert_eq!(from_num, from_str);
    }

    #[test]
    fn serializes_as_plain_string() {
        let pid = ParticipantId::from(42_u64);
        assert_eq!(serde_json::to_string(&pid).unwrap(), "\"42\"");
        assert_eq!(ChatType::Group.as_str(), "group");
    }
}
