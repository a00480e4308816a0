use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, KeyIvInit};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// A conversational endpoint descriptor: where the hosting layer listens
/// and the credentials inbound calls are validated against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointService {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_password: String,
}

/// A LUIS application descriptor. `subscription_key` may be stored
/// encrypted (see [`BotConfiguration::load`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuisService {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub subscription_key: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BotService {
    Endpoint(EndpointService),
    Luis(LuisService),
    /// Service kinds this sample does not wire up (qna, abs, ...).
    #[serde(other)]
    Unknown,
}

/// The `.bot` configuration artifact: a list of external service
/// descriptors plus a padlock proving the credential secret, when one is
/// in use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfiguration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub services: Vec<BotService>,
    #[serde(default)]
    pub padlock: String,
    #[serde(default)]
    pub version: String,
}

impl BotConfiguration {
    /// Read, parse and decrypt a bot file. Any failure here is fatal at
    /// process startup: a bot that cannot resolve its service table must
    /// not launch.
    pub fn load(path: &Path, secret: Option<&str>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::BotFile(format!("Cannot read bot file {}: {}", path.display(), e))
        })?;
        let config: BotConfiguration = serde_json::from_str(&content).map_err(|e| {
            Error::BotFile(format!("Cannot parse bot file {}: {}", path.display(), e))
        })?;
        config.decrypt(secret)
    }

    /// Validate the padlock against the supplied secret and decrypt every
    /// credential field stored as `{iv}!{ciphertext}`.
    pub fn decrypt(mut self, secret: Option<&str>) -> Result<Self> {
        if !self.padlock.is_empty() {
            let secret = secret.ok_or_else(|| {
                Error::BotFile(
                    "Bot file is encrypted but no botFileSecret is configured".to_string(),
                )
            })?;
            decrypt_value(&self.padlock, secret)
                .map_err(|_| Error::BotFile("botFileSecret is invalid".to_string()))?;
        }

        for service in &mut self.services {
            match service {
                BotService::Endpoint(endpoint) => {
                    endpoint.app_password = maybe_decrypt(&endpoint.app_password, secret)?;
                }
                BotService::Luis(luis) => {
                    luis.subscription_key = maybe_decrypt(&luis.subscription_key, secret)?;
                }
                BotService::Unknown => {}
            }
        }
        Ok(self)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointService> {
        self.services.iter().filter_map(|s| match s {
            BotService::Endpoint(e) => Some(e),
            _ => None,
        })
    }

    pub fn luis_services(&self) -> impl Iterator<Item = &LuisService> {
        self.services.iter().filter_map(|s| match s {
            BotService::Luis(l) => Some(l),
            _ => None,
        })
    }
}

/// Encrypted values carry an `iv!ciphertext` separator; anything else is
/// taken as plaintext from an unencrypted bot file.
fn maybe_decrypt(value: &str, secret: Option<&str>) -> Result<String> {
    if value.is_empty() || !value.contains('!') {
        return Ok(value.to_string());
    }
    let secret = secret.ok_or_else(|| {
        Error::BotFile("Encrypted credential found but no botFileSecret is configured".to_string())
    })?;
    decrypt_value(value, secret)
}

/// AES-256-CBC with PKCS7 padding. The secret is the base64 encoding of a
/// 32-byte key; the value is `{iv_base64}!{ciphertext_base64}`.
fn decrypt_value(value: &str, secret: &str) -> Result<String> {
    let (iv_b64, cipher_b64) = value
        .split_once('!')
        .ok_or_else(|| Error::BotFile(format!("Malformed encrypted value: {}", value)))?;

    let key = general_purpose::STANDARD
        .decode(secret)
        .map_err(|e| Error::BotFile(format!("Failed to decode botFileSecret: {}", e)))?;
    if key.len() != 32 {
        return Err(Error::BotFile(format!(
            "botFileSecret must decode to 32 bytes, got {}",
            key.len()
        )));
    }

    let iv = general_purpose::STANDARD
        .decode(iv_b64)
        .map_err(|e| Error::BotFile(format!("Failed to decode IV: {}", e)))?;
    if iv.len() != 16 {
        return Err(Error::BotFile(format!(
            "IV must decode to 16 bytes, got {}",
            iv.len()
        )));
    }

    let ciphertext = general_purpose::STANDARD
        .decode(cipher_b64)
        .map_err(|e| Error::BotFile(format!("Failed to decode ciphertext: {}", e)))?;

    let decryptor = Aes256CbcDec::new_from_slices(&key, &iv)
        .map_err(|e| Error::BotFile(format!("Failed to build AES decryptor: {}", e)))?;
    let plaintext = decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|e| Error::BotFile(format!("AES decrypt failed: {}", e)))?;

    String::from_utf8(plaintext)
        .map_err(|e| Error::BotFile(format!("Decrypted value is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::cipher::BlockEncryptMut;

    type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

    const TEST_IV: [u8; 16] = [9u8; 16];

    fn test_secret() -> String {
        general_purpose::STANDARD.encode([7u8; 32])
    }

    fn encrypt_value(plain: &str, secret: &str) -> String {
        let key = general_purpose::STANDARD.decode(secret).unwrap();
        let encryptor = Aes256CbcEnc::new_from_slices(&key, &TEST_IV).unwrap();
        let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plain.as_bytes());
        format!(
            "{}!{}",
            general_purpose::STANDARD.encode(TEST_IV),
            general_purpose::STANDARD.encode(ciphertext)
        )
    }

    const SAMPLE_BOT_FILE: &str = r#"{
        "name": "nlp-with-luis",
        "version": "2.0",
        "padlock": "",
        "services": [
            {
                "type": "endpoint",
                "id": "1",
                "name": "development",
                "endpoint": "http://localhost:3978/api/messages",
                "appId": "",
                "appPassword": ""
            },
            {
                "type": "luis",
                "id": "158",
                "name": "LuisBot",
                "appId": "b2d4e8f0-0000-0000-0000-000000000000",
                "subscriptionKey": "0123456789abcdef",
                "region": "westus",
                "version": "0.1"
            },
            {
                "type": "qna",
                "id": "201",
                "name": "faq"
            }
        ]
    }"#;

    #[test]
    fn test_parse_plaintext_bot_file() {
        let config: BotConfiguration = serde_json::from_str(SAMPLE_BOT_FILE).unwrap();
        let config = config.decrypt(None).unwrap();

        assert_eq!(config.name, "nlp-with-luis");
        let endpoint = config.endpoints().next().unwrap();
        assert_eq!(endpoint.name, "development");
        assert_eq!(endpoint.endpoint, "http://localhost:3978/api/messages");

        let luis = config.luis_services().next().unwrap();
        assert_eq!(luis.name, "LuisBot");
        assert_eq!(luis.subscription_key, "0123456789abcdef");
        assert_eq!(luis.region, "westus");
    }

    #[test]
    fn test_unknown_service_kinds_are_tolerated() {
        let config: BotConfiguration = serde_json::from_str(SAMPLE_BOT_FILE).unwrap();
        assert_eq!(config.services.len(), 3);
        assert!(matches!(config.services[2], BotService::Unknown));
    }

    #[test]
    fn test_decrypt_restores_credentials() {
        let secret = test_secret();
        let mut config: BotConfiguration = serde_json::from_str(SAMPLE_BOT_FILE).unwrap();
        config.padlock = encrypt_value("4f9a2b7c-check", &secret);
        if let BotService::Luis(luis) = &mut config.services[1] {
            luis.subscription_key = encrypt_value("0123456789abcdef", &secret);
        }
        if let BotService::Endpoint(endpoint) = &mut config.services[0] {
            endpoint.app_password = encrypt_value("hunter2", &secret);
        }

        let config = config.decrypt(Some(&secret)).unwrap();
        assert_eq!(config.luis_services().next().unwrap().subscription_key, "0123456789abcdef");
        assert_eq!(config.endpoints().next().unwrap().app_password, "hunter2");
    }

    #[test]
    fn test_wrong_secret_fails_padlock() {
        let secret = test_secret();
        let wrong = general_purpose::STANDARD.encode([8u8; 32]);
        let mut config: BotConfiguration = serde_json::from_str(SAMPLE_BOT_FILE).unwrap();
        config.padlock = encrypt_value("4f9a2b7c-check", &secret);

        let err = config.decrypt(Some(&wrong)).unwrap_err();
        assert!(matches!(err, Error::BotFile(_)));
    }

    #[test]
    fn test_encrypted_file_without_secret_fails() {
        let secret = test_secret();
        let mut config: BotConfiguration = serde_json::from_str(SAMPLE_BOT_FILE).unwrap();
        config.padlock = encrypt_value("4f9a2b7c-check", &secret);

        assert!(config.decrypt(None).is_err());
    }

    #[test]
    fn test_encrypted_credential_without_secret_fails() {
        let secret = test_secret();
        let mut config: BotConfiguration = serde_json::from_str(SAMPLE_BOT_FILE).unwrap();
        if let BotService::Luis(luis) = &mut config.services[1] {
            luis.subscription_key = encrypt_value("k", &secret);
        }
        assert!(config.decrypt(None).is_err());
    }

    #[test]
    fn test_secret_must_be_32_bytes() {
        let short = general_purpose::STANDARD.encode([7u8; 8]);
        let value = encrypt_value("k", &test_secret());
        assert!(decrypt_value(&value, &short).is_err());
    }

    #[test]
    fn test_missing_file_is_botfile_error() {
        let err = BotConfiguration::load(Path::new("/nonexistent/x.bot"), None).unwrap_err();
        assert!(matches!(err, Error::BotFile(_)));
    }
}
