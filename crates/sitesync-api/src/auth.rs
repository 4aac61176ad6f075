use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Build a header map with `Authorization: Bearer <key>`.
///
/// The value is marked sensitive so it never shows up in debug output.
pub(crate) fn bearer_headers(api_key: &SecretString) -> Result<HeaderMap, Error> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
        .map_err(|_| Error::InvalidApiKey)?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_is_sensitive() {
        let headers = bearer_headers(&SecretString::from("abc123".to_string())).unwrap();
        let value = headers.get(AUTHORIZATION).unwrap();
        assert!(value.is_sensitive());
        assert_eq!(value.to_str().unwrap(), "Bearer abc123");
    }

    #[test]
    fn rejects_keys_with_newlines() {
        let key = SecretString::from("bad\nkey".to_string());
        assert!(matches!(bearer_headers(&key), Err(Error::InvalidApiKey)));
    }
}
