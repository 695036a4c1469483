//! Content hashing for collected files.

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use sha2::Digest;

use crate::{FileInformation, FsError};

/// Supported digest algorithms. Defaults to SHA-1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum HashType {
    /// MD5.
    Md5,
    /// SHA-1.
    #[default]
    Sha1,
    /// SHA-256.
    Sha256,
    /// SHA-512.
    Sha512,
    /// BLAKE3.
    Blake3,
}

impl HashType {
    /// Lowercase algorithm name.
    pub const fn name(self) -> &'static str {
        match self {
            HashType::Md5 => "md5",
            HashType::Sha1 => "sha1",
            HashType::Sha256 => "sha256",
            HashType::Sha512 => "sha512",
            HashType::Blake3 => "blake3",
        }
    }

    fn hasher(self) -> Hasher {
        match self {
            HashType::Md5 => Hasher::Md5(md5::Md5::new()),
            HashType::Sha1 => Hasher::Sha1(sha1::Sha1::new()),
            HashType::Sha256 => Hasher::Sha256(sha2::Sha256::new()),
            HashType::Sha512 => Hasher::Sha512(sha2::Sha512::new()),
            HashType::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing an unknown algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hash type: {0}")]
pub struct UnknownHashType(pub String);

impl FromStr for HashType {
    type Err = UnknownHashType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(HashType::Md5),
            "sha1" => Ok(HashType::Sha1),
            "sha256" => Ok(HashType::Sha256),
            "sha512" => Ok(HashType::Sha512),
            "blake3" => Ok(HashType::Blake3),
            _ => Err(UnknownHashType(s.to_string())),
        }
    }
}

enum Hasher {
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Md5(h) => h.update(data),
            Hasher::Sha1(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
            Hasher::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            Hasher::Md5(h) => h.finalize().to_vec(),
            Hasher::Sha1(h) => h.finalize().to_vec(),
            Hasher::Sha256(h) => h.finalize().to_vec(),
            Hasher::Sha512(h) => h.finalize().to_vec(),
            Hasher::Blake3(h) => h.finalize().as_bytes().to_vec(),
        }
    }
}

/// A computed digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hash {
    /// Algorithm.
    pub kind: HashType,
    /// Raw digest bytes.
    pub digest: Vec<u8>,
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, hex::encode(&self.digest))
    }
}

/// Stream a file once, computing every requested digest.
///
/// Reads in chunks of the session's configured buffer size.
///
/// # Errors
///
/// - [`FsError::NotAFile`] if `info` is a directory
/// - [`FsError::Unavailable`] if the file cannot be opened or read
pub fn hash_file(info: &FileInformation, kinds: &[HashType]) -> Result<Vec<Hash>, FsError> {
    if info.is_dir() {
        return Err(FsError::NotAFile {
            path: info.filename().name().to_string(),
        });
    }

    let mut hashers: Vec<(HashType, Hasher)> = kinds.iter().map(|&k| (k, k.hasher())).collect();
    let mut reader = info.open()?;
    let mut buf = vec![0u8; info.session().config().buffer_size];
    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| FsError::unavailable("read", info.filename().name(), e))?;
        if n == 0 {
            break;
        }
        for (_, hasher) in &mut hashers {
            hasher.update(&buf[..n]);
        }
    }

    Ok(hashers
        .into_iter()
        .map(|(kind, hasher)| Hash {
            kind,
            digest: hasher.finalize(),
        })
        .collect())
}
