//! Sender address handling (RFC 5322 §3.4).

/// A parsed email address.
///
/// # Examples
/// - `"Juan García <juan@ejemplo.com>"` → `display_name = "Juan García"`, `address = "juan@ejemplo.com"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl EmailAddress {
    /// Build an address from already separated parts.
    pub fn new(display_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into().trim().to_string(),
            address: address.into().trim().to_string(),
        }
    }

    /// Parse a single email address from a raw header value.
    ///
    /// Used when the MIME parser could not make sense of the `From:` header.
    /// Supported formats:
    /// - `"user@domain.com"`
    /// - `"<user@domain.com>"`
    /// - `"Display Name <user@domain.com>"`
    /// - `"\"Display, Name\" <user@domain.com>"`
    ///
    /// If parsing fails, the raw string is stored as `address`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        if let (Some(angle_start), Some(angle_end)) = (trimmed.rfind('<'), trimmed.rfind('>')) {
            if angle_end > angle_start {
                let addr = trimmed[angle_start + 1..angle_end].trim().to_string();
                let display_name = strip_quotes(&trimmed[..angle_start]);
                return Self {
                    display_name,
                    address: addr,
                };
            }
        }

        Self {
            display_name: String::new(),
            address: trimmed.to_string(),
        }
    }

    /// Name shown on pages: the personal name when present, otherwise the
    /// local part of the address.
    pub fn sender_name(&self) -> String {
        if !self.display_name.is_empty() {
            return self.display_name.clone();
        }
        match self.address.split_once('@') {
            Some((local, _)) => local.to_string(),
            None => self.address.clone(),
        }
    }
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{} <{}>", self.display_name, self.address)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let addr = EmailAddress::parse("user@example.com");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "");
    }

    #[test]
    fn test_parse_quoted_name() {
        let addr = EmailAddress::parse("\"Last, First\" <user@example.com>");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "Last, First");
    }

    #[test]
    fn test_sender_name_prefers_display_name() {
        let addr = EmailAddress::new("A. Person", "a@example.com");
        assert_eq!(addr.sender_name(), "A. Person");
    }

    #[test]
    fn test_sender_name_falls_back_to_local_part() {
        let addr = EmailAddress::parse("<alice@example.com>");
        assert_eq!(addr.sender_name(), "alice");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            EmailAddress::new("Alice", "alice@example.com").to_string(),
            "Alice <alice@example.com>"
        );
        assert_eq!(
            EmailAddress::new("", "alice@example.com").to_string(),
            "alice@example.com"
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(EmailAddress::parse("   "), EmailAddress::default());
    }
}
