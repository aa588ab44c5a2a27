//! Telegram WebApp init data validation
//!
//! ```text
//! secret           = HMAC_SHA256(key = "WebAppData", bot_token)
//! data_check_string = sorted "key=value" pairs without `hash`, joined by '\n'
//! hash             = hex(HMAC_SHA256(key = secret, data_check_string))
//! ```

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const WEB_APP_KEY: &[u8] = b"WebAppData";
const REFERRAL_PREFIX: &str = "ref_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitDataError {
    #[error("init data field missing: {0}")]
    Missing(&'static str),
    #[error("init data hash mismatch")]
    HashMismatch,
    #[error("init data expired")]
    Expired,
    #[error("malformed init data: {0}")]
    Malformed(String),
}

/// The Telegram identity carried by init data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAppUser {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub start_param: Option<String>,
}

impl WebAppUser {
    /// Inviting user id from a `ref_<userId>` start parameter
    pub fn referrer_id(&self) -> Option<i64> {
        self.start_param
            .as_deref()?
            .strip_prefix(REFERRAL_PREFIX)?
            .parse()
            .ok()
    }
}

#[derive(Deserialize)]
struct TelegramUser {
    id: i64,
    #[serde(default)]
    username: Option<String>,
}

fn mac_with_key(key: &[u8]) -> Result<HmacSha256, InitDataError> {
    HmacSha256::new_from_slice(key).map_err(|e| InitDataError::Malformed(e.to_string()))
}

fn secret_key(bot_token: &str) -> Result<Vec<u8>, InitDataError> {
    let mut mac = mac_with_key(WEB_APP_KEY)?;
    mac.update(bot_token.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Validate `init_data` and return the user it speaks for.
///
/// `now` is unix seconds; data older than `max_age_secs` is rejected.
pub fn verify_init_data(
    init_data: &str,
    bot_token: &str,
    max_age_secs: i64,
    now: i64,
) -> Result<WebAppUser, InitDataError> {
    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(init_data.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let hash_pos = pairs
        .iter()
        .position(|(k, _)| k == "hash")
        .ok_or(InitDataError::Missing("hash"))?;
    let (_, hash) = pairs.remove(hash_pos);
    let expected = hex::decode(&hash).map_err(|_| InitDataError::HashMismatch)?;

    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let data_check_string = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut mac = mac_with_key(&secret_key(bot_token)?)?;
    mac.update(data_check_string.as_bytes());
    mac.verify_slice(&expected)
        .map_err(|_| InitDataError::HashMismatch)?;

    let field = |name: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };

    let auth_date: i64 = field("auth_date")
        .ok_or(InitDataError::Missing("auth_date"))?
        .parse()
        .map_err(|_| InitDataError::Malformed("auth_date".into()))?;
    if now - auth_date > max_age_secs {
        return Err(InitDataError::Expired);
    }

    let user: TelegramUser = serde_json::from_str(field("user").ok_or(InitDataError::Missing("user"))?)
        .map_err(|e| InitDataError::Malformed(format!("user: {e}")))?;

    Ok(WebAppUser {
        telegram_id: user.id,
        username: user.username,
        start_param: field("start_param").map(str::to_string),
    })
}

/// Build signed init data, the way Telegram does
pub fn sign_init_data(fields: &[(&str, &str)], bot_token: &str) -> String {
    let mut sorted: Vec<(&str, &str)> = fields.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let data_check_string = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let hash = secret_key(bot_token)
        .and_then(|key| mac_with_key(&key))
        .map(|mut mac| {
            mac.update(data_check_string.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        })
        .unwrap_or_default();

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in fields {
        serializer.append_pair(k, v);
    }
    serializer.append_pair("hash", &hash);
    serializer.finish()
}
