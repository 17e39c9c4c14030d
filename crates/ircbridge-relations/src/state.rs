//! Presence of relation-sourced data.

/// What an observer found on its relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationState<T> {
    /// No relation is established on the endpoint.
    Absent,
    /// The relation exists but the remote side has not published everything yet.
    Incomplete {
        /// Fields still missing.
        missing: Vec<&'static str>,
    },
    /// All data is present and valid.
    Ready(T),
}

/// Collects the names of missing fields while reading a databag.
#[derive(Debug, Default)]
pub(crate) struct MissingFields(Vec<&'static str>);

impl MissingFields {
    /// Record `field` when `value` is absent or blank, passing the value through.
    pub(crate) fn take(&mut self, field: &'static str, value: Option<String>) -> Option<String> {
        match value {
            Some(value) if !value.trim().is_empty() => Some(value),
            _ => {
                self.0.push(field);
                None
            }
        }
    }

    /// Report the collected fields as an `Incomplete` state.
    pub(crate) fn into_incomplete<T>(self) -> RelationState<T> {
        RelationState::Incomplete { missing: self.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_collect_blank_values() {
        let mut missing = MissingFields::default();
        assert_eq!(missing.take("homeserver", Some("https://m".into())).as_deref(), Some("https://m"));
        assert!(missing.take("shared_secret_id", Some("  ".into())).is_none());
        assert!(missing.take("encryption_key_secret_id", None).is_none());
        assert_eq!(
            missing.into_incomplete::<()>(),
            RelationState::Incomplete {
                missing: vec!["shared_secret_id", "encryption_key_secret_id"]
            }
        );
    }
}
