//! Digest provider used for data hashes

use md5::Md5;
use ripemd::{Ripemd128, Ripemd160, Ripemd256, Ripemd320};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};

use crate::error::{ReportError, ReportResult};

/// Named hash algorithm producing a lowercase hex digest
pub trait DigestProvider {
    /// Canonical algorithm name, printed before the digest
    fn algorithm_name(&self) -> &str;

    fn compute_digest(&self, data: &[u8]) -> String;
}

/// Hash algorithms accepted by `show_data_hash`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Ripemd128,
    Ripemd160,
    Ripemd256,
    Ripemd320,
    Sha160,
    Sha224,
    Sha256,
    Sha512_224,
    Sha512_256,
    Sha384,
    Sha512,
    Crc32,
    Adler32,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 14] = [
        HashAlgorithm::Md5,
        HashAlgorithm::Ripemd128,
        HashAlgorithm::Ripemd160,
        HashAlgorithm::Ripemd256,
        HashAlgorithm::Ripemd320,
        HashAlgorithm::Sha160,
        HashAlgorithm::Sha224,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha512_224,
        HashAlgorithm::Sha512_256,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha512,
        HashAlgorithm::Crc32,
        HashAlgorithm::Adler32,
    ];

    /// Case-insensitive lookup by algorithm name
    pub fn from_name(name: &str) -> ReportResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|algo| algo.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ReportError::UnknownDigest {
                name: name.to_string(),
                known: Self::ALL
                    .iter()
                    .map(|algo| algo.name())
                    .collect::<Vec<_>>()
                    .join(" "),
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "MD5",
            HashAlgorithm::Ripemd128 => "RIPEMD128",
            HashAlgorithm::Ripemd160 => "RIPEMD160",
            HashAlgorithm::Ripemd256 => "RIPEMD256",
            HashAlgorithm::Ripemd320 => "RIPEMD320",
            HashAlgorithm::Sha160 => "SHA160",
            HashAlgorithm::Sha224 => "SHA224",
            HashAlgorithm::Sha256 => "SHA256",
            HashAlgorithm::Sha512_224 => "SHA512/224",
            HashAlgorithm::Sha512_256 => "SHA512/256",
            HashAlgorithm::Sha384 => "SHA384",
            HashAlgorithm::Sha512 => "SHA512",
            HashAlgorithm::Crc32 => "CRC32",
            HashAlgorithm::Adler32 => "adler32",
        }
    }
}

impl DigestProvider for HashAlgorithm {
    fn algorithm_name(&self) -> &str {
        self.name()
    }

    fn compute_digest(&self, data: &[u8]) -> String {
        match self {
            HashAlgorithm::Md5 => hex::encode(Md5::digest(data)),
            HashAlgorithm::Ripemd128 => hex::encode(Ripemd128::digest(data)),
            HashAlgorithm::Ripemd160 => hex::encode(Ripemd160::digest(data)),
            HashAlgorithm::Ripemd256 => hex::encode(Ripemd256::digest(data)),
            HashAlgorithm::Ripemd320 => hex::encode(Ripemd320::digest(data)),
            HashAlgorithm::Sha160 => hex::encode(Sha1::digest(data)),
            HashAlgorithm::Sha224 => hex::encode(Sha224::digest(data)),
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
            HashAlgorithm::Sha512_224 => hex::encode(Sha512_224::digest(data)),
            HashAlgorithm::Sha512_256 => hex::encode(Sha512_256::digest(data)),
            HashAlgorithm::Sha384 => hex::encode(Sha384::digest(data)),
            HashAlgorithm::Sha512 => hex::encode(Sha512::digest(data)),
            // Checksums are printed big-endian
            HashAlgorithm::Crc32 => hex::encode(crc32fast::hash(data).to_be_bytes()),
            HashAlgorithm::Adler32 => hex::encode(adler::adler32_slice(data).to_be_bytes()),
        }
    }
}

/// `<ALGO>:<hex>` for `data`
pub fn format_digest(provider: &dyn DigestProvider, data: &[u8]) -> String {
    format!("{}:{}", provider.algorithm_name(), provider.compute_digest(data))
}
