/// Option names a record declaration understands. Anything else an
/// extension adds is dropped when the options are finalized.
pub const RECOGNISED_OPTIONS: &[&str] = &["init", "repr", "eq", "order", "unsafe_hash", "frozen"];

/// Typed option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Str(v.to_string())
    }
}

/// Record declaration options, in the order they were set.
///
/// The derive macro fills this from `#[datamodel(...)]`; extensions
/// rewrite it before the plan is built. Readers use the typed getters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordOptions {
    entries: Vec<(String, OptionValue)>,
}

impl RecordOptions {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == &name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Builder form of `set`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(OptionValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// `self` with every entry of `explicit` laid over it.
    pub fn merged(mut self, explicit: &RecordOptions) -> Self {
        for (name, value) in &explicit.entries {
            self.set(name.clone(), value.clone());
        }
        self
    }

    pub fn frozen(&self) -> bool {
        self.get_bool("frozen").unwrap_or(false)
    }

    /// Drop every option outside `RECOGNISED_OPTIONS`.
    pub fn retain_recognised(mut self, record: &str) -> Self {
        self.entries.retain(|(name, _)| {
            let keep = RECOGNISED_OPTIONS.contains(&name.as_str());
            if !keep {
                tracing::debug!(record = %record, option = %name, "unrecognised record option dropped");
            }
            keep
        });
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_options_win_on_merge() {
        let computed = RecordOptions::new().with("frozen", true).with("order", true);
        let explicit = RecordOptions::new().with("frozen", false);
        let merged = computed.merged(&explicit);
        assert_eq!(merged.get_bool("frozen"), Some(false));
        assert_eq!(merged.get_bool("order"), Some(true));
        assert!(!merged.frozen());
    }

    #[test]
    fn unrecognised_options_are_dropped() {
        let options = RecordOptions::new()
            .with("frozen", true)
            .with("slots", true)
            .with("repr", "short")
            .retain_recognised("Simple");
        let names: Vec<_> = options.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["frozen", "repr"]);
    }
}
