use sha2::{Digest as ShaDigest, Sha256};

/// Lowercase hex encoding of a SHA-256 digest.
pub type Digest = String;

pub trait Hashable {
    fn hash(&self) -> Digest;
}

pub fn sha256_hex(data: impl AsRef<[u8]>) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let digest = sha256_hex("abc");

        assert_eq!(digest.len(), 64);
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
