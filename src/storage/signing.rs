use anyhow::{Result, anyhow};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 signer for time-limited object read URLs.
#[derive(Clone)]
pub struct UrlSigner {
    keyed: HmacSha256,
}

impl UrlSigner {
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self> {
        let keyed = HmacSha256::new_from_slice(key.as_ref())
            .map_err(|err| anyhow!("invalid signing key: {err}"))?;
        Ok(Self { keyed })
    }

    fn mac(&self, path: &str, expires: i64) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(b"GET\n");
        mac.update(path.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    pub fn sign(&self, path: &str, expires: i64) -> String {
        hex::encode(self.mac(path, expires).finalize().into_bytes())
    }

    /// Constant-time check of `signature` plus an expiry check against `now`.
    pub fn verify(&self, path: &str, expires: i64, signature: &str, now: i64) -> bool {
        if expires < now {
            return false;
        }
        let Ok(raw) = hex::decode(signature) else {
            return false;
        };
        self.mac(path, expires).verify_slice(&raw).is_ok()
    }
}
