//! The encoded master hash stored in vault metadata.
//!
//! ```text
//! $argon2id$v=19$m=65536,t=3,p=4$<hex-salt>$<hex-verifier>
//! ```
//!
//! Parsing is strict: exactly six `$`-separated fields, the `argon2id`
//! tag, version 19, parameters in `m,t,p` order and within the KDF
//! bounds, and non-empty hex.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::kdf::Argon2Params;
use super::keys::KEY_LEN;

/// The only algorithm tag accepted.
pub const ALGORITHM: &str = "argon2id";

/// Argon2 version 1.3.
pub const VERSION: u32 = 0x13;

/// Why an encoded master hash was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashFormatError {
    #[error("expected 6 '$'-separated fields, found {0}")]
    FieldCount(usize),

    #[error("hash must start with '$'")]
    MissingPrefix,

    #[error("unsupported algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("cannot parse version field '{0}'")]
    InvalidVersion(String),

    #[error("unsupported Argon2 version {0}")]
    UnsupportedVersion(u32),

    #[error("cannot parse parameter field '{0}'")]
    InvalidParams(String),

    #[error("salt is empty or not valid hex")]
    InvalidSalt,

    #[error("verifier is not valid hex")]
    InvalidHash,

    #[error("verifier must be {expected} bytes, got {actual}")]
    HashLength { expected: usize, actual: usize },
}

/// A parsed master hash: Argon2 parameters, salt, and password verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterHash {
    params: Argon2Params,
    salt: Vec<u8>,
    verifier: Vec<u8>,
}

impl MasterHash {
    pub(crate) fn new(params: Argon2Params, salt: Vec<u8>, verifier: Vec<u8>) -> Self {
        Self {
            params,
            salt,
            verifier,
        }
    }

    pub fn params(&self) -> &Argon2Params {
        &self.params
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn verifier(&self) -> &[u8] {
        &self.verifier
    }
}

impl fmt::Display for MasterHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${ALGORITHM}$v={VERSION}$m={},t={},p={}${}${}",
            self.params.memory_kib,
            self.params.iterations,
            self.params.parallelism,
            hex::encode(&self.salt),
            hex::encode(&self.verifier),
        )
    }
}

impl FromStr for MasterHash {
    type Err = HashFormatError;

    fn from_str(encoded: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = encoded.split('$').collect();
        if fields.len() != 6 {
            return Err(HashFormatError::FieldCount(fields.len()));
        }
        if !fields[0].is_empty() {
            return Err(HashFormatError::MissingPrefix);
        }
        if fields[1] != ALGORITHM {
            return Err(HashFormatError::UnknownAlgorithm(fields[1].to_string()));
        }

        let version = parse_assignment(fields[2], "v")
            .ok_or_else(|| HashFormatError::InvalidVersion(fields[2].to_string()))?;
        if version != VERSION {
            return Err(HashFormatError::UnsupportedVersion(version));
        }

        let params = parse_params(fields[3])
            .ok_or_else(|| HashFormatError::InvalidParams(fields[3].to_string()))?;

        let salt = hex::decode(fields[4]).map_err(|_| HashFormatError::InvalidSalt)?;
        if salt.is_empty() {
            return Err(HashFormatError::InvalidSalt);
        }

        let verifier = hex::decode(fields[5]).map_err(|_| HashFormatError::InvalidHash)?;
        if verifier.len() != KEY_LEN {
            return Err(HashFormatError::HashLength {
                expected: KEY_LEN,
                actual: verifier.len(),
            });
        }

        Ok(Self::new(params, salt, verifier))
    }
}

/// Parse `name=<u32>`; only ASCII digits are accepted after the `=`.
fn parse_assignment(field: &str, name: &str) -> Option<u32> {
    let value = field.strip_prefix(name)?.strip_prefix('=')?;
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Parse `m=<u32>,t=<u32>,p=<u32>` in exactly that order, within the KDF bounds.
fn parse_params(field: &str) -> Option<Argon2Params> {
    let mut parts = field.split(',');
    let memory_kib = parse_assignment(parts.next()?, "m")?;
    let iterations = parse_assignment(parts.next()?, "t")?;
    let parallelism = parse_assignment(parts.next()?, "p")?;
    if parts.next().is_some() {
        return None;
    }
    let params = Argon2Params {
        memory_kib,
        iterations,
        parallelism,
    };
    params.check_bounds().ok()?;
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: &str = "6c89d7fbb2e90bbe9e91509fc4d5b546";
    const VERIFIER: &str = "67b53292ba1f9c1c6c9193c48404d8c9fdfeb93041d5affcd08181241e284cdd";

    fn encoded(algorithm: &str, version: &str, params: &str, salt: &str, hash: &str) -> String {
        format!("${algorithm}${version}${params}${salt}${hash}")
    }

    #[test]
    fn parses_well_formed_hash() {
        let hash: MasterHash = encoded("argon2id", "v=19", "m=65536,t=3,p=4", SALT, VERIFIER)
            .parse()
            .unwrap();
        assert_eq!(hash.params(), &Argon2Params::default());
        assert_eq!(hash.salt().len(), 16);
        assert_eq!(hash.verifier().len(), 32);
    }

    #[test]
    fn display_matches_input() {
        let input = encoded("argon2id", "v=19", "m=8192,t=1,p=1", SALT, VERIFIER);
        let hash: MasterHash = input.parse().unwrap();
        assert_eq!(hash.to_string(), input);
    }

    #[test]
    fn rejects_wrong_field_count() {
        let too_many = format!("$argon2id$v=19$m=65536,t=3,p=4${SALT}${VERIFIER}$extra");
        assert_eq!(
            too_many.parse::<MasterHash>(),
            Err(HashFormatError::FieldCount(7))
        );
        assert_eq!(
            "$argon2id$v=19".parse::<MasterHash>(),
            Err(HashFormatError::FieldCount(3))
        );
        assert_eq!("".parse::<MasterHash>(), Err(HashFormatError::FieldCount(1)));
    }

    #[test]
    fn rejects_missing_prefix() {
        let input = format!("x$argon2id$v=19$m=65536,t=3,p=4${SALT}${VERIFIER}");
        assert_eq!(input.parse::<MasterHash>(), Err(HashFormatError::MissingPrefix));
    }

    #[test]
    fn rejects_other_algorithms() {
        for algorithm in ["argon2i", "argon2d", "bcrypt", "ARGON2ID", ""] {
            let input = encoded(algorithm, "v=19", "m=65536,t=3,p=4", SALT, VERIFIER);
            assert!(matches!(
                input.parse::<MasterHash>(),
                Err(HashFormatError::UnknownAlgorithm(_))
            ));
        }
    }

    #[test]
    fn rejects_bad_version() {
        let input = encoded("argon2id", "version19", "m=65536,t=3,p=4", SALT, VERIFIER);
        assert!(matches!(
            input.parse::<MasterHash>(),
            Err(HashFormatError::InvalidVersion(_))
        ));

        let input = encoded("argon2id", "v=16", "m=65536,t=3,p=4", SALT, VERIFIER);
        assert_eq!(
            input.parse::<MasterHash>(),
            Err(HashFormatError::UnsupportedVersion(16))
        );
    }

    #[test]
    fn rejects_non_numeric_params() {
        for params in [
            "m=abc,t=3,p=4",
            "m=65536,t=3",
            "m=65536,t=3,p=4,x=1",
            "t=3,m=65536,p=4",
            "m=-1,t=3,p=4",
            "m=65536,t=,p=4",
            "m=99999999999,t=3,p=4",
        ] {
            let input = encoded("argon2id", "v=19", params, SALT, VERIFIER);
            assert!(
                matches!(
                    input.parse::<MasterHash>(),
                    Err(HashFormatError::InvalidParams(_))
                ),
                "{params} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_out_of_range_params() {
        for params in [
            "m=4294967295,t=1,p=1",
            "m=4194305,t=1,p=1",
            "m=8191,t=1,p=1",
            "m=65536,t=0,p=4",
            "m=65536,t=4294967295,p=4",
            "m=65536,t=3,p=0",
            "m=65536,t=3,p=16777215",
        ] {
            let input = encoded("argon2id", "v=19", params, SALT, VERIFIER);
            assert!(
                matches!(
                    input.parse::<MasterHash>(),
                    Err(HashFormatError::InvalidParams(_))
                ),
                "{params} should be rejected"
            );
        }

        let edge = encoded("argon2id", "v=19", "m=4194304,t=64,p=255", SALT, VERIFIER);
        assert!(edge.parse::<MasterHash>().is_ok());
    }

    #[test]
    fn huge_memory_cost_does_not_verify() {
        let input = encoded("argon2id", "v=19", "m=4294967295,t=1,p=1", SALT, VERIFIER);
        assert!(!crate::crypto::kdf::verify(b"x", &input));
    }

    #[test]
    fn rejects_invalid_hex() {
        let input = encoded("argon2id", "v=19", "m=65536,t=3,p=4", "NOTASALT???!", VERIFIER);
        assert_eq!(input.parse::<MasterHash>(), Err(HashFormatError::InvalidSalt));

        let input = encoded("argon2id", "v=19", "m=65536,t=3,p=4", "", VERIFIER);
        assert_eq!(input.parse::<MasterHash>(), Err(HashFormatError::InvalidSalt));

        let input = encoded("argon2id", "v=19", "m=65536,t=3,p=4", SALT, "NOTANHASH??!!");
        assert_eq!(input.parse::<MasterHash>(), Err(HashFormatError::InvalidHash));
    }

    #[test]
    fn rejects_short_verifier() {
        let input = encoded("argon2id", "v=19", "m=65536,t=3,p=4", SALT, "abcd");
        assert_eq!(
            input.parse::<MasterHash>(),
            Err(HashFormatError::HashLength {
                expected: 32,
                actual: 2
            })
        );
    }
}
