use crate::types::Value;

/// An insertion-ordered mapping from field name to value.
///
/// Records are small (a few dozen fields), so a vector scan beats hashing here and keeps
/// the field order stable for the output header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>
}

impl Record {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { fields: Vec::with_capacity(capacity) }
    }

    /// Sets a field, overwriting in place when the name already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();

        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value))
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Renames a field in place. Any existing field already named `to` is dropped.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if !self.contains(from) || from == to {
            return false;
        }

        self.fields.retain(|(field, _)| field != to);

        if let Some((field, _)) = self.fields.iter_mut().find(|(field, _)| field == from) {
            *field = to.to_string();
        }

        true
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<N: Into<String>> FromIterator<(N, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (N, Value)>>(iter: I) -> Self {
        let mut record = Record::new();

        for (name, value) in iter {
            record.insert(name, value);
        }

        record
    }
}
