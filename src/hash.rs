//! Digest-on-write support for [`Store::set_hashed`](crate::Store::set_hashed).

use blake2::{Blake2b512, Blake2s256};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};
use sha3::{Sha3_224, Sha3_256, Sha3_384, Sha3_512};
use std::str::FromStr;

/// Digest algorithms a value can be hashed with before it is stored.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// MD5 (32 hex chars).
    Md5,
    /// SHA-1 (40 hex chars).
    Sha1,
    /// SHA-224 (56 hex chars).
    Sha224,
    /// SHA-256 (64 hex chars).
    Sha256,
    /// SHA-384 (96 hex chars).
    Sha384,
    /// SHA-512 (128 hex chars).
    Sha512,
    /// SHA-512/224 (56 hex chars).
    Sha512_224,
    /// SHA-512/256 (64 hex chars).
    Sha512_256,
    /// SHA3-224 (56 hex chars).
    Sha3_224,
    /// SHA3-256 (64 hex chars).
    Sha3_256,
    /// SHA3-384 (96 hex chars).
    Sha3_384,
    /// SHA3-512 (128 hex chars).
    Sha3_512,
    /// BLAKE2b with a 64-byte digest (128 hex chars).
    Blake2b,
    /// BLAKE2s with a 32-byte digest (64 hex chars).
    Blake2s,
}

impl HashAlgorithm {
    /// Lowercase hex digest of `input`'s UTF-8 bytes.
    pub fn hex_digest(self, input: &str) -> String {
        let bytes = input.as_bytes();
        match self {
            HashAlgorithm::Md5 => hex::encode(Md5::digest(bytes)),
            HashAlgorithm::Sha1 => hex::encode(Sha1::digest(bytes)),
            HashAlgorithm::Sha224 => hex::encode(Sha224::digest(bytes)),
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(bytes)),
            HashAlgorithm::Sha384 => hex::encode(Sha384::digest(bytes)),
            HashAlgorithm::Sha512 => hex::encode(Sha512::digest(bytes)),
            HashAlgorithm::Sha512_224 => hex::encode(Sha512_224::digest(bytes)),
            HashAlgorithm::Sha512_256 => hex::encode(Sha512_256::digest(bytes)),
            HashAlgorithm::Sha3_224 => hex::encode(Sha3_224::digest(bytes)),
            HashAlgorithm::Sha3_256 => hex::encode(Sha3_256::digest(bytes)),
            HashAlgorithm::Sha3_384 => hex::encode(Sha3_384::digest(bytes)),
            HashAlgorithm::Sha3_512 => hex::encode(Sha3_512::digest(bytes)),
            HashAlgorithm::Blake2b => hex::encode(Blake2b512::digest(bytes)),
            HashAlgorithm::Blake2s => hex::encode(Blake2s256::digest(bytes)),
        }
    }

    /// Canonical lowercase name, spelled the way hashlib spells it.
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Sha512_224 => "sha512_224",
            HashAlgorithm::Sha512_256 => "sha512_256",
            HashAlgorithm::Sha3_224 => "sha3_224",
            HashAlgorithm::Sha3_256 => "sha3_256",
            HashAlgorithm::Sha3_384 => "sha3_384",
            HashAlgorithm::Sha3_512 => "sha3_512",
            HashAlgorithm::Blake2b => "blake2b",
            HashAlgorithm::Blake2s => "blake2s",
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized digest name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAlgorithm(
    /// The name that was given.
    pub String,
);

impl std::fmt::Display for UnknownAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown hash algorithm: {:?}", self.0)
    }
}

impl std::error::Error for UnknownAlgorithm {}

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // "SHA3-256" and "sha3_256" name the same thing
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha224" => Ok(HashAlgorithm::Sha224),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "sha512_224" => Ok(HashAlgorithm::Sha512_224),
            "sha512_256" => Ok(HashAlgorithm::Sha512_256),
            "sha3_224" => Ok(HashAlgorithm::Sha3_224),
            "sha3_256" => Ok(HashAlgorithm::Sha3_256),
            "sha3_384" => Ok(HashAlgorithm::Sha3_384),
            "sha3_512" => Ok(HashAlgorithm::Sha3_512),
            "blake2b" => Ok(HashAlgorithm::Blake2b),
            "blake2s" => Ok(HashAlgorithm::Blake2s),
            _ => Err(UnknownAlgorithm(s.to_owned())),
        }
    }
}
