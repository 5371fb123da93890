//! Form-url-encoding
//!
//! Keys and values are percent-encoded with the alphanumeric allowed set and
//! pairs joined by `&`, per the `application/x-www-form-urlencoded` shape
//! the wire expects.

use crate::error::Error;

/// Encode ordered pairs into a form-url-encoded string.
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                urlencoding::encode(name),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Decode a form-url-encoded string back into ordered pairs.
pub fn decode(input: &str) -> Result<Vec<(String, String)>, Error> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    input
        .split('&')
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = urlencoding::decode(name)
                .map_err(|e| Error::UrlEncodingFailed(format!("malformed pair '{pair}': {e}")))?;
            let value = urlencoding::decode(value)
                .map_err(|e| Error::UrlEncodingFailed(format!("malformed pair '{pair}': {e}")))?;
            Ok((name.into_owned(), value.into_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_uses_percent_escapes() {
        let pairs = vec![
            ("q".to_string(), "rust async".to_string()),
            ("lang".to_string(), "en&fr".to_string()),
        ];
        assert_eq!(encode_pairs(&pairs), "q=rust%20async&lang=en%26fr");
    }

    #[test]
    fn round_trip_preserves_pairs() {
        let pairs = vec![
            ("name".to_string(), "J & K".to_string()),
            ("empty".to_string(), String::new()),
            ("uni".to_string(), "héllo=wörld".to_string()),
        ];
        let decoded = decode(&encode_pairs(&pairs)).unwrap();
        assert_eq!(decoded, pairs);
    }

    #[test]
    fn decode_empty_input() {
        assert!(decode("").unwrap().is_empty());
    }
}
