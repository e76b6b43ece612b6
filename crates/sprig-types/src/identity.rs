use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;
use crate::temporal::Timestamp;

/// Name and email of an author or committer.
///
/// Neither field may be empty or contain `<`, `>` or a newline: those
/// characters delimit the fields of a signature line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identity {
    name: String,
    email: String,
}

impl Identity {
    /// Create a validated identity.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let email = email.into();
        validate_field("name", &name)?;
        validate_field("email", &email)?;
        Ok(Self { name, email })
    }

    /// Check a single `name` or `email` value without building an identity.
    pub fn check_field(field: &str, value: &str) -> Result<(), TypeError> {
        validate_field(field, value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Stamp this identity with a point in time.
    pub fn at(&self, when: Timestamp) -> Signature {
        Signature {
            identity: self.clone(),
            when,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

fn validate_field(field: &str, value: &str) -> Result<(), TypeError> {
    if value.trim().is_empty() {
        return Err(TypeError::InvalidIdentity(format!("{field} is empty")));
    }
    if value.contains(['<', '>', '\n']) {
        return Err(TypeError::InvalidIdentity(format!(
            "{field} {value:?} contains '<', '>' or a newline"
        )));
    }
    Ok(())
}

/// An identity plus the time it acted, as recorded on `author` and
/// `committer` lines: `Name <email> 1700000000 +0000`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    pub identity: Identity,
    pub when: Timestamp,
}

impl Signature {
    pub fn name(&self) -> &str {
        self.identity.name()
    }

    pub fn email(&self) -> &str {
        self.identity.email()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.identity, self.when)
    }
}

impl FromStr for Signature {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidSignature(s.to_string());

        let lt = s.find('<').ok_or_else(invalid)?;
        let gt = lt + s[lt..].find('>').ok_or_else(invalid)?;
        let name = s[..lt].strip_suffix(' ').ok_or_else(invalid)?;
        let email = &s[lt + 1..gt];
        let when = s[gt + 1..].strip_prefix(' ').ok_or_else(invalid)?;

        let identity = Identity::new(name, email).map_err(|_| invalid())?;
        let when = when.parse().map_err(|_| invalid())?;
        Ok(Self { identity, when })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new("Alice Example", "alice@example.com").unwrap()
    }

    #[test]
    fn identity_rejects_delimiters() {
        assert!(Identity::new("A <b>", "a@x.com").is_err());
        assert!(Identity::new("A", "a@x.com>").is_err());
        assert!(Identity::new("A\nB", "a@x.com").is_err());
        assert!(Identity::new("", "a@x.com").is_err());
        assert!(Identity::new("A", "  ").is_err());
    }

    #[test]
    fn signature_line_format() {
        let sig = alice().at(Timestamp::new(1_700_000_000, 60).unwrap());
        assert_eq!(
            sig.to_string(),
            "Alice Example <alice@example.com> 1700000000 +0100"
        );
    }

    #[test]
    fn signature_parse_roundtrip() {
        let sig = alice().at(Timestamp::new(1_234_567_890, -480).unwrap());
        let parsed: Signature = sig.to_string().parse().unwrap();
        assert_eq!(parsed, sig);
        assert_eq!(parsed.name(), "Alice Example");
        assert_eq!(parsed.email(), "alice@example.com");
    }

    #[test]
    fn signature_parse_rejects_garbage() {
        for bad in [
            "",
            "Alice alice@example.com 0 +0000",
            "Alice <alice@example.com 0 +0000",
            "Alice<alice@example.com> 0 +0000",
            "Alice <alice@example.com>0 +0000",
            "Alice <alice@example.com> 0",
            "<alice@example.com> 0 +0000",
        ] {
            assert!(bad.parse::<Signature>().is_err(), "{bad:?} should fail");
        }
    }
}
