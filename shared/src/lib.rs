use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod surface;

pub use surface::{PointerInput, SignaturePad};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    #[serde(rename = "partyA")]
    PartyA,
    #[serde(rename = "partyB")]
    PartyB,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::PartyA, Role::PartyB];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::PartyA => "partyA",
            Role::PartyB => "partyB",
        }
    }

    /// Short label shown in the signing modal title.
    pub fn label(self) -> &'static str {
        match self {
            Role::PartyA => "甲方",
            Role::PartyB => "乙方",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid role: {0:?}")]
pub struct InvalidRole(pub String);

impl FromStr for Role {
    type Err = InvalidRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "partyA" => Ok(Role::PartyA),
            "partyB" => Ok(Role::PartyB),
            other => Err(InvalidRole(other.to_string())),
        }
    }
}

/// One party's signature. The image is an opaque encoded bitmap (a PNG data
/// URL from the pad) and is stored and redisplayed as-is.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SignatureRecord {
    #[serde(rename = "signature")]
    pub image: String,
    pub date: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgreementState {
    pub party_a: Option<SignatureRecord>,
    pub party_b: Option<SignatureRecord>,
    pub created_date: String,
}

impl AgreementState {
    pub fn new(created_date: impl Into<String>) -> Self {
        Self {
            party_a: None,
            party_b: None,
            created_date: created_date.into(),
        }
    }

    pub fn slot(&self, role: Role) -> Option<&SignatureRecord> {
        match role {
            Role::PartyA => self.party_a.as_ref(),
            Role::PartyB => self.party_b.as_ref(),
        }
    }

    /// Replaces the party's slot wholesale and returns the previous record.
    pub fn set_slot(&mut self, role: Role, record: SignatureRecord) -> Option<SignatureRecord> {
        let slot = match role {
            Role::PartyA => &mut self.party_a,
            Role::PartyB => &mut self.party_b,
        };
        slot.replace(record)
    }

    pub fn is_complete(&self) -> bool {
        self.party_a.is_some() && self.party_b.is_some()
    }
}

/// Body of `POST /api/sign`. The role stays a plain string here so that an
/// unknown role can be reported as `InvalidRole` rather than a decode error.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SignRequest {
    pub role: String,
    pub signature: String,
    pub date: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SignResponse {
    pub success: bool,
    pub data: AgreementState,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_only_the_two_parties() {
        assert_eq!("partyA".parse::<Role>(), Ok(Role::PartyA));
        assert_eq!("partyB".parse::<Role>(), Ok(Role::PartyB));
        assert_eq!(
            "partyC".parse::<Role>(),
            Err(InvalidRole("partyC".to_string()))
        );
        assert!("PartyA".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn agreement_state_serializes_with_camel_case_keys() {
        let mut state = AgreementState::new("2025-01-01T00:00:00.000Z");
        state.set_slot(
            Role::PartyA,
            SignatureRecord {
                image: "img1".into(),
                date: "2025-01-02T00:00:00Z".into(),
            },
        );
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "partyA": { "signature": "img1", "date": "2025-01-02T00:00:00Z" },
                "partyB": null,
                "createdDate": "2025-01-01T00:00:00.000Z",
            })
        );
    }

    #[test]
    fn set_slot_returns_replaced_record() {
        let mut state = AgreementState::new("t0");
        let first = SignatureRecord {
            image: "a".into(),
            date: "d1".into(),
        };
        let second = SignatureRecord {
            image: "b".into(),
            date: "d2".into(),
        };
        assert_eq!(state.set_slot(Role::PartyB, first.clone()), None);
        assert_eq!(state.set_slot(Role::PartyB, second.clone()), Some(first));
        assert_eq!(state.slot(Role::PartyB), Some(&second));
        assert_eq!(state.slot(Role::PartyA), None);
        assert!(!state.is_complete());
    }
}
