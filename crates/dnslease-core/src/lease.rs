//! Lease model and TXT wire codec
//!
//! The lease is the authority record for "who is active": a `(owner,
//! expires_at)` pair serialized into a single TXT string of the form
//! `owner=<site> exp=<unix_seconds>`. Writers always emit a full
//! replacement, so the codec never has to preserve foreign tokens;
//! the parser tolerates (and ignores) them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// One of the two participating sites
///
/// Doubles as the process role and as the lease owner; the two share the
/// same value set by design of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    /// The normally-active site
    Primary,
    /// The disaster-recovery site
    Dr,
}

impl Site {
    /// The opposite site
    pub fn other(self) -> Self {
        match self {
            Site::Primary => Site::Dr,
            Site::Dr => Site::Primary,
        }
    }

    /// Canonical lowercase name, as written into the TXT record
    pub fn as_str(self) -> &'static str {
        match self {
            Site::Primary => "primary",
            Site::Dr => "dr",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Site {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "primary" => Ok(Site::Primary),
            "dr" => Ok(Site::Dr),
            other => Err(Error::lease_parse(format!("unknown site: {other:?}"))),
        }
    }
}

/// A soft, time-bounded claim of authority stored in DNS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lease {
    /// Which site currently claims to be active
    pub owner: Site,
    /// Absolute Unix-epoch expiry in seconds
    pub expires_at: u64,
}

impl Lease {
    /// Create a lease
    pub fn new(owner: Site, expires_at: u64) -> Self {
        Self { owner, expires_at }
    }

    /// Serialize into the TXT wire form `owner=<site> exp=<seconds>`
    pub fn to_txt(&self) -> String {
        format!("owner={} exp={}", self.owner, self.expires_at)
    }

    /// Parse a TXT string into a lease
    ///
    /// The string must carry exactly one `owner=` and one `exp=` token;
    /// duplicates are malformed. Unknown tokens are ignored. Quote
    /// characters are stripped first, since several DNS systems hand TXT
    /// values back quoted.
    pub fn parse_txt(txt: &str) -> Result<Self> {
        let mut owner: Option<Site> = None;
        let mut expires_at: Option<u64> = None;

        let cleaned = txt.replace('"', "");
        for token in cleaned.split_ascii_whitespace() {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            match key {
                "owner" => {
                    if owner.is_some() {
                        return Err(Error::lease_parse("duplicate owner token"));
                    }
                    owner = Some(value.parse()?);
                }
                "exp" => {
                    if expires_at.is_some() {
                        return Err(Error::lease_parse("duplicate exp token"));
                    }
                    expires_at = Some(value.parse().map_err(|_| {
                        Error::lease_parse(format!("exp is not a unix timestamp: {value:?}"))
                    })?);
                }
                _ => {}
            }
        }

        match (owner, expires_at) {
            (Some(owner), Some(expires_at)) => Ok(Self { owner, expires_at }),
            _ => Err(Error::lease_parse(format!(
                "missing owner or exp token in {txt:?}"
            ))),
        }
    }

    /// A lease is valid while its expiry lies strictly in the future
    pub fn is_valid(&self, now_unix: u64) -> bool {
        self.expires_at > now_unix
    }

    /// Seconds until expiry; negative once expired
    pub fn remaining(&self, now_unix: u64) -> i64 {
        self.expires_at as i64 - now_unix as i64
    }
}
