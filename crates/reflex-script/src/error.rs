//! Error types for script evaluation.

/// Why a decision script failed to produce a usable decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    /// The interpreter rejected or aborted the script (syntax error, raised
    /// error, instruction limit).
    #[error("Script runtime error: {0}")]
    Runtime(String),
    /// The script assigned a non-empty `err`.
    #[error("Script reported error: {0}")]
    Declared(String),
    /// The script's bindings do not follow the decision contract.
    #[error("Script contract violation: {0}")]
    Contract(String),
    /// Event or action data could not be handed to the interpreter.
    #[error("Script binding error: {0}")]
    Binding(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_error_display() {
        let err = ScriptError::Runtime("unexpected symbol".to_string());
        assert_eq!(err.to_string(), "Script runtime error: unexpected symbol");

        let err = ScriptError::Declared("host unreachable".to_string());
        assert_eq!(err.to_string(), "Script reported error: host unreachable");

        let err = ScriptError::Contract("'result' is not a table".to_string());
        assert_eq!(
            err.to_string(),
            "Script contract violation: 'result' is not a table"
        );

        let err = ScriptError::Binding("cannot convert".to_string());
        assert_eq!(err.to_string(), "Script binding error: cannot convert");
    }
}
