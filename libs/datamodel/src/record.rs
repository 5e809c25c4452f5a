use crate::error::ConvertError;
use crate::field::{Field, FieldValue};

/// Field values of one record instance, in declaration order.
///
/// The derive macros pack a struct into this list and unpack it again;
/// the plan interpreter only ever sees names and `FieldValue`s.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordValues {
    entries: Vec<(&'static str, FieldValue)>,
}

impl RecordValues {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: &'static str, value: FieldValue) {
        self.entries.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// Replace the value of `name`, appending it when absent.
    pub fn set(&mut self, name: &'static str, value: FieldValue) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Remove and return the value of `name`.
    pub fn take(&mut self, name: &str) -> Result<FieldValue, ConvertError> {
        let pos = self
            .entries
            .iter()
            .position(|(n, _)| *n == name)
            .ok_or_else(|| ConvertError::missing_field(name))?;
        Ok(self.entries.remove(pos).1)
    }

    /// Remove `name` and materialize it as `T`. Used by derived `from_fields`.
    pub fn take_as<T: Field>(&mut self, name: &str) -> Result<T, ConvertError> {
        let value = self.take(name)?;
        T::from_field_value(value).map_err(|e| e.at_field(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.entries.iter().map(|(n, v)| (*n, v))
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
    use crate::error::ErrorKind;

    #[test]
    fn set_replaces_in_place() {
        let mut values = RecordValues::with_capacity(2);
        values.push("a", FieldValue::Int(1));
        values.push("b", FieldValue::Int(2));
        values.set("a", FieldValue::Int(10));
        let names: Vec<_> = values.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(values.get("a"), Some(&FieldValue::Int(10)));
    }

    #[test]
    fn take_as_reports_field_path() {
        let mut values = RecordValues::default();
        values.push("count", FieldValue::Str("x".into()));
        let err = values.take_as::<i64>("count").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
        assert_eq!(err.path(), "count");

        let err = values.take_as::<i64>("missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
    }
}
