use std::sync::Arc;

use crate::options::RecordOptions;

/// Rewrites a record's declaration options before its plan is built.
pub type Extension = Arc<dyn Fn(RecordOptions) -> RecordOptions + Send + Sync>;

/// Make records frozen unless their declaration says otherwise.
pub fn frozen_by_default(mut options: RecordOptions) -> RecordOptions {
    if !options.contains("frozen") {
        options.set("frozen", true);
    }
    options
}

/// Run `extensions` in order over the explicit options, then lay the
/// explicit options back over the result.
pub fn apply(extensions: &[Extension], explicit: &RecordOptions) -> RecordOptions {
    extensions
        .iter()
        .fold(explicit.clone(), |options, extension| extension(options))
        .merged(explicit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_by_default_respects_explicit_choice() {
        let extensions: Vec<Extension> = vec![Arc::new(frozen_by_default)];
        assert!(apply(&extensions, &RecordOptions::new()).frozen());

        let explicit = RecordOptions::new().with("frozen", false);
        assert!(!apply(&extensions, &explicit).frozen());
    }

    #[test]
    fn extensions_run_in_registration_order() {
        let extensions: Vec<Extension> = vec![
            Arc::new(|o: RecordOptions| o.with("repr", "first")),
            Arc::new(|o: RecordOptions| o.with("repr", "second")),
        ];
        let options = apply(&extensions, &RecordOptions::new());
        assert_eq!(options.get("repr"), Some(&crate::options::OptionValue::Str("second".into())));
    }

    #[test]
    fn explicit_options_override_extensions() {
        let extensions: Vec<Extension> = vec![Arc::new(|o: RecordOptions| o.with("eq", false))];
        let explicit = RecordOptions::new().with("eq", true);
        assert_eq!(apply(&extensions, &explicit).get_bool("eq"), Some(true));
    }
}
