//! Presence-aware optional values for override fields.

/// A field of a partial override, distinguishing a key that was never
/// written from a key written with an explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    /// Key not present in the source document.
    #[default]
    Absent,
    /// Key present with a null value.
    Null,
    Value(T),
}

impl<T> Field<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: Clone> Field<T> {
    /// Scalar layering: a value replaces the parent, absent and null both
    /// keep the parent.
    pub fn layer_scalar(&self, parent: &Field<T>) -> Field<T> {
        match self {
            Field::Value(v) => Field::Value(v.clone()),
            Field::Absent | Field::Null => parent.clone(),
        }
    }

    pub fn resolve_or(&self, default: &T) -> T {
        self.value().cloned().unwrap_or_else(|| default.clone())
    }
}

impl<T: Clone> Field<Vec<T>> {
    /// List layering: absent keeps the parent, null clears it, a value is
    /// prepended to whatever the parent holds.
    pub fn layer_list(&self, parent: &Field<Vec<T>>) -> Field<Vec<T>> {
        match self {
            Field::Absent => parent.clone(),
            Field::Null => Field::Value(Vec::new()),
            Field::Value(items) => {
                let mut merged = items.clone();
                if let Field::Value(inherited) = parent {
                    merged.extend(inherited.iter().cloned());
                }
                Field::Value(merged)
            }
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::Value(v),
            None => Field::Null,
        }
    }
}
