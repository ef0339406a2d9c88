use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps contact details and secrets so they can be passed to `tracing` macros
/// without leaking the full value.
///
/// `Debug` hides everything. `Display` keeps just enough to correlate log lines:
/// the first character and domain of an email address, or the last two
/// characters of anything else. Serialization is transparent because view
/// models need the real value.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }
}

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("********")
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact(self.0.as_ref()))
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

fn redact(value: &str) -> String {
    if let Some((local, domain)) = value.split_once('@') {
        let first = local.chars().next().map(String::from).unwrap_or_default();
        return format!("{}***@{}", first, domain);
    }

    let count = value.chars().count();
    if count <= 4 {
        return "****".to_string();
    }

    let tail: String = value.chars().skip(count - 2).collect();
    format!("{}{}", "*".repeat(count - 2), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_shows_value() {
        let secret = Masked::new("hunter2".to_string());
        assert_eq!(format!("{:?}", secret), "********");
    }

    #[test]
    fn email_keeps_first_letter_and_domain() {
        let email = Masked::new("jane.doe@example.com");
        assert_eq!(email.to_string(), "j***@example.com");
    }

    #[test]
    fn phone_keeps_last_two_digits() {
        let phone = Masked::new("07700900123");
        assert_eq!(phone.to_string(), "*********23");
    }

    #[test]
    fn short_values_are_fully_hidden() {
        assert_eq!(Masked::new("1234").to_string(), "****");
    }

    #[test]
    fn serializes_the_real_value() {
        let email = Masked::new("a@b.io".to_string());
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"a@b.io\"");
    }
}
