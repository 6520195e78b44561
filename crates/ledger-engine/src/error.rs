use thiserror::Error;

/// Genuinely exceptional, non-recoverable failures — never raised for a rule
/// violation a well-formed-but-invalid entry can trigger. Those accumulate
/// instead as [`crate::validate::ValidationIssue`]s.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("canonicalization failed: {0}")]
    Canonicalization(String),

    #[error("recomputed entry_id does not match the stored one")]
    HashMismatch,

    #[error("signature does not verify against creator_device_pubkey")]
    SignatureInvalid,
}

impl From<ledger_core::CoreError> for EngineError {
    fn from(e: ledger_core::CoreError) -> Self {
        EngineError::Canonicalization(e.to_string())
    }
}

/// The four error-taxonomy kinds a single-entry validation issue falls
/// under, per the error handling design: structural, integrity,
/// authorization, domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueKind {
    Structural,
    Integrity,
    Authorization,
    Domain,
}

/// One accumulated validation failure. Single-entry validation never
/// short-circuits on the first issue — it collects every applicable one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::new(IssueKind::Structural, message)
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::new(IssueKind::Integrity, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(IssueKind::Authorization, message)
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::new(IssueKind::Domain, message)
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

/// A per-entry validation result, tagged with the entry's position in the
/// chain and a truncated id, for full-chain aggregation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryValidationError {
    pub ordinal: usize,
    pub entry_id_prefix: String,
    pub issues: Vec<ValidationIssue>,
}
