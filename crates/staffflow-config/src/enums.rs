use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named access capability that a request can grant or revoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
  /// Identity directory account (Google Workspace).
  Directory,
  /// Ticketing system account (Zendesk).
  Ticketing,
  /// Internal wiki account.
  Wiki,
  /// VOIP extension.
  Voip,
  /// CRM user.
  Crm,
}

impl Capability {
  pub const ALL: [Capability; 5] = [
    Capability::Directory,
    Capability::Ticketing,
    Capability::Wiki,
    Capability::Voip,
    Capability::Crm,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Capability::Directory => "directory",
      Capability::Ticketing => "ticketing",
      Capability::Wiki => "wiki",
      Capability::Voip => "voip",
      Capability::Crm => "crm",
    }
  }
}

impl fmt::Display for Capability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Capability {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Capability::ALL
      .into_iter()
      .find(|c| c.as_str() == s)
      .ok_or_else(|| format!("unknown capability '{}'", s))
  }
}

/// Which adapter capability an automatable step invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
  Provision,
  Deprovision,
}

/// Request result column that receives an adapter's returned identifier.
///
/// The mapping is explicit: each variant corresponds to exactly one column
/// of the request record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultField {
  DirectoryEmail,
  TicketingUserId,
  WikiUsername,
  CrmUserId,
  VoipExtension,
}
