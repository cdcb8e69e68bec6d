use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

/// Produces the request signature the fingerprint service expects
pub trait Signer: Send + Sync {
    fn sign(&self, string_to_sign: &str) -> String;
}

/// Base64 of HMAC-SHA1 keyed with the access secret
#[derive(Clone)]
pub struct HmacSha1Signer {
    mac: Hmac<Sha1>,
}

impl HmacSha1Signer {
    pub fn new(secret: &str) -> Result<Self> {
        let mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid signing secret: {}", e))?;
        Ok(Self { mac })
    }
}

impl Signer for HmacSha1Signer {
    fn sign(&self, string_to_sign: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(string_to_sign.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}
