use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Match,
    NoMatch,
}

/// Checks the secondary numeric code.
///
/// Every identity shares the single reference credential unless an
/// identity-specific code is configured for it.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    identity_codes: BTreeMap<String, i64>,
}

impl CredentialVerifier {
    pub fn new(identity_codes: BTreeMap<String, i64>) -> Self {
        Self { identity_codes }
    }

    pub fn shared() -> Self {
        Self::new(BTreeMap::new())
    }

    pub fn expected_code(&self, identity: &str, reference_credential_id: i64) -> i64 {
        self.identity_codes
            .get(identity)
            .copied()
            .unwrap_or(reference_credential_id)
    }

    /// Malformed input is a rejection, never an error.
    pub fn verify(&self, identity: &str, entered: &str, reference_credential_id: i64) -> Verdict {
        let code = match parse_code(entered) {
            Some(code) => code,
            None => {
                tracing::warn!("Rejected malformed code entry for {}", identity);
                return Verdict::NoMatch;
            }
        };

        if code == self.expected_code(identity, reference_credential_id) {
            Verdict::Match
        } else {
            Verdict::NoMatch
        }
    }
}

fn parse_code(entered: &str) -> Option<i64> {
    let trimmed = entered.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_code_is_accepted() {
        let verifier = CredentialVerifier::shared();
        assert_eq!(verifier.verify("alice", "12345", 12345), Verdict::Match);
        assert_eq!(verifier.verify("alice", " 12345\n", 12345), Verdict::Match);
        assert_eq!(verifier.verify("alice", "012345", 12345), Verdict::Match);
    }

    #[test]
    fn wrong_code_is_rejected() {
        let verifier = CredentialVerifier::shared();
        assert_eq!(verifier.verify("alice", "54321", 12345), Verdict::NoMatch);
    }

    #[test]
    fn malformed_input_is_rejected_not_raised() {
        let verifier = CredentialVerifier::shared();
        for entry in ["", "   ", "12a45", "twelve", "99999999999999999999999"] {
            assert_eq!(verifier.verify("alice", entry, 12345), Verdict::NoMatch, "{entry:?}");
        }
    }

    #[test]
    fn shared_credential_applies_to_every_identity() {
        let verifier = CredentialVerifier::shared();
        assert_eq!(verifier.verify("alice", "12345", 12345), Verdict::Match);
        assert_eq!(verifier.verify("bob", "12345", 12345), Verdict::Match);
    }

    #[test]
    fn identity_specific_code_overrides_shared_one() {
        let verifier = CredentialVerifier::new(BTreeMap::from([("alice".to_string(), 4321)]));
        assert_eq!(verifier.verify("alice", "4321", 12345), Verdict::Match);
        assert_eq!(verifier.verify("alice", "12345", 12345), Verdict::NoMatch);
        assert_eq!(verifier.verify("bob", "12345", 12345), Verdict::Match);
    }
}
