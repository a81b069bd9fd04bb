#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let not_found = CoreError::NotFound {
            entity: "WatchedTarget",
            key: "i-1/compute_instance/cpu_utilization".into(),
        };
        assert_eq!(
            not_found.to_string(),
            "Entity not found: WatchedTarget i-1/compute_instance/cpu_utilization"
        );
        let invalid = CoreError::Validation("warning must not exceed critical".into());
        assert_eq!(invalid.to_string(), "Validation failed: warning must not exceed critical");
    }
}
