//! Locale-specific contact fallback.

/// Mobile-prefix digit rule.
///
/// Some numbering plans added a leading mobile digit after the area code, and
/// contacts may be stored either way. The default is the Brazilian rule:
/// `55 AA NNNNNNNN` (12 digits) <-> `55 AA 9 NNNNNNNN` (13 digits).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobilePrefixRule {
    pub country_code: String,
    /// Byte index where the digit is inserted or removed (after the area code).
    pub insert_at: usize,
    pub digit: char,
    /// Length without the digit.
    pub short_len: usize,
}

impl Default for MobilePrefixRule {
    fn default() -> Self {
        Self {
            country_code: "55".to_string(),
            insert_at: 4,
            digit: '9',
            short_len: 12,
        }
    }
}

impl MobilePrefixRule {
    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    /// The single alternative identifier to try, if the rule covers `contact`.
    pub fn variant(&self, contact: &str) -> Option<String> {
        if !contact.starts_with(&self.country_code)
            || !contact.bytes().all(|b| b.is_ascii_digit())
            || self.insert_at > self.short_len
        {
            return None;
        }

        if contact.len() == self.short_len {
            let mut longer = String::with_capacity(contact.len() + 1);
            longer.push_str(&contact[..self.insert_at]);
            longer.push(self.digit);
            longer.push_str(&contact[self.insert_at..]);
            Some(longer)
        } else if contact.len() == self.short_len + 1 {
            let mut shorter = String::with_capacity(contact.len() - 1);
            shorter.push_str(&contact[..self.insert_at]);
            shorter.push_str(&contact[self.insert_at + 1..]);
            Some(shorter)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("551188887777", Some("5511988887777"))]
    #[case("5511988887777", Some("551188887777"))]
    #[case("55119888877", None)]
    #[case("55119888877771", None)]
    #[case("141588887777", None)]
    #[case("5511-8888777", None)]
    fn brazilian_rule(#[case] contact: &str, #[case] expected: Option<&str>) {
        let rule = MobilePrefixRule::default();
        assert_eq!(rule.variant(contact).as_deref(), expected);
    }

    #[test]
    fn country_code_is_configurable() {
        let rule = MobilePrefixRule::default().with_country_code("54");
        assert_eq!(rule.variant("541188887777").as_deref(), Some("5411988887777"));
        assert_eq!(rule.variant("551188887777"), None);
    }
}
