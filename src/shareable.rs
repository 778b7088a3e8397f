//! Shareable bank ids.
//!
//! A shareable id lets one user refer to another user's bank account (e.g.
//! as a transfer recipient) without handing out anything that can be used
//! against the aggregator. It is the hex-encoded account id followed by an
//! HMAC-SHA256 tag, so ids cannot be forged or enumerated:
//!
//! `<hex(account_id)>.<hex(hmac(secret, account_id))>`

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct ShareableIds {
    secret: Vec<u8>,
}

impl std::fmt::Debug for ShareableIds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareableIds").finish_non_exhaustive()
    }
}

impl ShareableIds {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, account_id: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC key length is valid");
        mac.update(account_id.as_bytes());
        mac
    }

    /// Shareable id for an aggregator account id.
    pub fn encode(&self, account_id: &str) -> String {
        let tag = self.mac(account_id).finalize().into_bytes();
        format!("{}.{}", hex::encode(account_id), hex::encode(tag))
    }

    /// Recover the account id, rejecting malformed or forged ids.
    pub fn decode(&self, shareable_id: &str) -> Result<String, AppError> {
        let invalid = || AppError::InvalidRequest("shareable id is invalid".to_string());

        let (payload, tag) = shareable_id.split_once('.').ok_or_else(invalid)?;
        let account_id = hex::decode(payload)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(invalid)?;
        let tag = hex::decode(tag).map_err(|_| invalid())?;

        // Constant-time comparison
        self.mac(&account_id)
            .verify_slice(&tag)
            .map_err(|_| invalid())?;

        Ok(account_id)
    }
}
