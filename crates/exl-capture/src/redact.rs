/// Result of running text through the redaction collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redaction {
    /// The text to record, with sensitive spans replaced.
    pub text: String,
    /// Whether anything was replaced.
    pub redacted: bool,
    /// Number of sensitive spans found.
    pub hits: u32,
}

/// The redaction collaborator boundary.
///
/// The capture layer scrubs every output chunk through this trait before
/// it reaches the ledger and never inspects the patterns behind it.
pub trait Redactor {
    fn redact(&self, text: &str) -> Redaction;
}

/// Records text unchanged. For embedding contexts that scrub elsewhere,
/// and for tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughRedactor;

impl Redactor for PassthroughRedactor {
    fn redact(&self, text: &str) -> Redaction {
        Redaction {
            text: text.to_string(),
            redacted: false,
            hits: 0,
        }
    }
}
