use base32::Alphabet;
use candid::{types::principal::PrincipalError, CandidType, Deserialize, Principal};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type Subaccount = [u8; 32];

pub const DEFAULT_SUBACCOUNT: &Subaccount = &[0; 32];

/// Length of the CRC32 checksum once base32-encoded without padding.
const CHECKSUM_LEN: usize = 7;

/// A ledger holder: an owning principal plus an optional subaccount.
///
/// `None` and `Some(DEFAULT_SUBACCOUNT)` designate the same account, which is why equality,
/// ordering and hashing go through [`Account::effective_subaccount`].
#[derive(Serialize, CandidType, Deserialize, Clone, Copy, Debug)]
pub struct Account {
    pub owner: Principal,
    pub subaccount: Option<Subaccount>,
}

impl Account {
    pub fn new(owner: Principal, subaccount: Option<Subaccount>) -> Self {
        Self { owner, subaccount }
    }

    #[inline]
    pub fn effective_subaccount(&self) -> &Subaccount {
        self.subaccount.as_ref().unwrap_or(DEFAULT_SUBACCOUNT)
    }

    fn non_default_subaccount(&self) -> Option<&Subaccount> {
        self.subaccount
            .as_ref()
            .filter(|subaccount| *subaccount != DEFAULT_SUBACCOUNT)
    }
}

impl From<Principal> for Account {
    fn from(owner: Principal) -> Self {
        Self::new(owner, None)
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.effective_subaccount() == other.effective_subaccount()
    }
}

impl Eq for Account {}

impl PartialOrd for Account {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Account {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.owner, self.effective_subaccount()).cmp(&(other.owner, other.effective_subaccount()))
    }
}

impl std::hash::Hash for Account {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.effective_subaccount().hash(state);
    }
}

fn checksum(owner: &Principal, subaccount: &Subaccount) -> String {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(owner.as_slice());
    hasher.update(subaccount);
    let crc = hasher.finalize().to_be_bytes();
    base32::encode(Alphabet::RFC4648 { padding: false }, &crc).to_lowercase()
}

/// Textual encoding of ICRC-1 accounts: `<owner>` for the default subaccount, otherwise
/// `<owner>-<checksum>.<subaccount hex without leading zeros>`.
impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.non_default_subaccount() {
            None => write!(f, "{}", self.owner),
            Some(subaccount) => {
                let hex_subaccount = hex::encode(subaccount);
                write!(
                    f,
                    "{}-{}.{}",
                    self.owner,
                    checksum(&self.owner, subaccount),
                    hex_subaccount.trim_start_matches('0')
                )
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AccountParseError {
    #[error("invalid principal: {0}")]
    InvalidPrincipal(PrincipalError),
    #[error("missing checksum")]
    MissingChecksum,
    #[error("invalid checksum (expected: {expected})")]
    InvalidChecksum { expected: String },
    #[error("invalid subaccount: {0}")]
    InvalidSubaccount(String),
    #[error("subaccount should not have leading zeroes")]
    LeadingZeroesInSubaccount,
    #[error("default subaccount should be omitted")]
    DefaultSubaccountShouldBeOmitted,
}

fn parse_subaccount(text: &str) -> Result<Subaccount, AccountParseError> {
    if text.starts_with('0') {
        return Err(AccountParseError::LeadingZeroesInSubaccount);
    }
    if text.len() > 64 {
        return Err(AccountParseError::InvalidSubaccount(
            "subaccount is longer than 32 bytes".to_string(),
        ));
    }
    let mut subaccount = [0u8; 32];
    hex::decode_to_slice(format!("{text:0>64}"), &mut subaccount).map_err(|e| {
        AccountParseError::InvalidSubaccount(format!("subaccount is not hex-encoded: {e}"))
    })?;
    if &subaccount == DEFAULT_SUBACCOUNT {
        return Err(AccountParseError::DefaultSubaccountShouldBeOmitted);
    }
    Ok(subaccount)
}

impl FromStr for Account {
    type Err = AccountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((owner_and_checksum, subaccount)) = s.split_once('.') else {
            return Principal::from_str(s)
                .map(Account::from)
                .map_err(AccountParseError::InvalidPrincipal);
        };
        // Principal groups are 5 characters long, so a 7 character group can only be the checksum.
        let (owner, expected) = match owner_and_checksum.rsplit_once('-') {
            Some((owner, checksum)) if checksum.len() == CHECKSUM_LEN => (owner, checksum),
            _ => return Err(AccountParseError::MissingChecksum),
        };
        let subaccount = parse_subaccount(subaccount)?;
        let owner = Principal::from_str(owner).map_err(AccountParseError::InvalidPrincipal)?;
        let actual = checksum(&owner, &subaccount);
        if actual != expected {
            return Err(AccountParseError::InvalidChecksum { expected: actual });
        }
        Ok(Account::new(owner, Some(subaccount)))
    }
}
