//! Theory settings.

/// Kernel-relevant knobs carried by each [`crate::theory::Theory`].
///
/// Printing options live with the printing layer; proof recording is a
/// process-wide toggle (`crate::sequent::set_recording`) because rules
/// never observe theory state.
#[derive(Clone, Debug)]
pub struct TheorySettings {
    /// Prefix of ids generated for unnamed axioms and theorems.
    pub generated_id_prefix: String,
    /// Reject structurally identical re-insertions instead of silently
    /// merging them.
    pub strict_duplicates: bool,
}

impl Default for TheorySettings {
    fn default() -> Self {
        TheorySettings {
            generated_id_prefix: "_".to_owned(),
            strict_duplicates: false,
        }
    }
}
