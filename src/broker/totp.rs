// src/broker/totp.rs

//! Одноразовые коды по RFC 6238 для входа в торговую сессию.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::config::{TotpAlgorithm, TotpConfig};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotpError {
    #[error("TOTP secret is empty")]
    EmptySecret,
    #[error("TOTP secret is not valid base32")]
    InvalidSecret,
    #[error("unsupported TOTP digit count {0}")]
    InvalidDigits(u32),
}

#[derive(Clone)]
pub struct Totp {
    key: Vec<u8>,
    digits: u32,
    period: u64,
    algorithm: TotpAlgorithm,
}

impl Totp {
    /// Секрет в base32, как его выдаёт брокер (регистр, пробелы и `=` не важны)
    pub fn from_base32(secret: &str, cfg: &TotpConfig) -> Result<Self, TotpError> {
        let cleaned: String = secret
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '=')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if cleaned.is_empty() {
            return Err(TotpError::EmptySecret);
        }
        let key = base32::decode(base32::Alphabet::Rfc4648 { padding: false }, &cleaned)
            .ok_or(TotpError::InvalidSecret)?;
        Self::from_key(key, cfg)
    }

    pub fn from_key(key: Vec<u8>, cfg: &TotpConfig) -> Result<Self, TotpError> {
        if !(6..=9).contains(&cfg.digits) {
            return Err(TotpError::InvalidDigits(cfg.digits));
        }
        Ok(Self {
            key,
            digits: cfg.digits,
            period: cfg.period_secs.max(1),
            algorithm: cfg.algorithm,
        })
    }

    pub fn now(&self) -> String {
        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.at(unix)
    }

    pub fn at(&self, unix_secs: u64) -> String {
        let counter = (unix_secs / self.period).to_be_bytes();
        let hash = match self.algorithm {
            TotpAlgorithm::Sha1 => hmac_digest::<Hmac<Sha1>>(&self.key, &counter),
            TotpAlgorithm::Sha256 => hmac_digest::<Hmac<Sha256>>(&self.key, &counter),
        };

        // dynamic truncation
        let offset = (hash[hash.len() - 1] & 0x0f) as usize;
        let code = u32::from_be_bytes([
            hash[offset] & 0x7f,
            hash[offset + 1],
            hash[offset + 2],
            hash[offset + 3],
        ]);
        let modulo = 10u64.pow(self.digits);
        format!("{:0width$}", u64::from(code) % modulo, width = self.digits as usize)
    }
}

fn hmac_digest<M: Mac + hmac::digest::KeyInit>(key: &[u8], msg: &[u8]) -> Vec<u8> {
    // HMAC принимает ключ любой длины
    let mut mac = <M as hmac::digest::KeyInit>::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(msg);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_normalization() {
        let cfg = TotpConfig::default();
        let a = Totp::from_base32("gezd gnbv gy3t qojq", &cfg).unwrap();
        let b = Totp::from_base32("GEZDGNBVGY3TQOJQ====", &cfg).unwrap();
        assert_eq!(a.at(1_000), b.at(1_000));
        assert_eq!(Totp::from_base32("  ", &cfg).err(), Some(TotpError::EmptySecret));
        assert_eq!(Totp::from_base32("not*base32", &cfg).err(), Some(TotpError::InvalidSecret));
    }
}
