//! Error types for graph construction.
//!
//! Three kinds surface to callers: configuration errors (the template is
//! structurally invalid or inconsistent), expression errors (split into
//! invalid expressions and missing data), and arity errors raised by the
//! graph registry.

use std::collections::HashMap;
use thiserror::Error;

/// The main error type for pipegraph operations.
#[derive(Debug, Error)]
pub enum PipegraphError {
    /// The configuration is structurally invalid or semantically inconsistent.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// An expression failed to parse or resolve.
    #[error("{0}")]
    Expression(#[from] ExpressionError),

    /// A connection would violate a port's arity.
    #[error("{0}")]
    Arity(#[from] ArityError),
}

impl PipegraphError {
    /// Returns the configuration error, if this is one.
    #[must_use]
    pub fn as_configuration(&self) -> Option<&ConfigurationError> {
        match self {
            Self::Configuration(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the expression error, if this is one.
    #[must_use]
    pub fn as_expression(&self) -> Option<&ExpressionError> {
        match self {
            Self::Expression(err) => Some(err),
            _ => None,
        }
    }
}

/// Diagnostic metadata attached to a configuration error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Error code (e.g., "CONFIG-MISSING-PORT").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates new error info. The fix hint defaults to the registered
    /// suggestion for `code`, if any.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        let code = code.into();
        let fix_hint = ErrorSuggestions::get(&code).map(str::to_string);
        Self {
            code,
            summary: summary.into(),
            fix_hint,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::Value::String(self.code.clone()));
        map.insert("summary".to_string(), serde_json::Value::String(self.summary.clone()));

        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::Value::String(hint.clone()));
        }
        if !self.context.is_empty() {
            let context_map: serde_json::Map<String, serde_json::Value> = self
                .context
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            map.insert("context".to_string(), serde_json::Value::Object(context_map));
        }

        map
    }
}

/// Error raised when the declarative configuration is invalid.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ConfigurationError {
    /// The error message.
    pub message: String,
    /// Location of the offending entry, outermost first (stage, workspace, port).
    pub path: Vec<String>,
    /// Optional diagnostic info.
    pub error_info: Option<ErrorInfo>,
}

impl ConfigurationError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            error_info: None,
        }
    }

    /// Creates an error carrying a code; the summary is the message.
    #[must_use]
    pub fn coded(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(message.clone()).with_error_info(ErrorInfo::new(code, message))
    }

    /// Sets the config path.
    #[must_use]
    pub fn with_path(mut self, path: Vec<String>) -> Self {
        self.path = path;
        self
    }

    /// Sets the error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::Value::String(self.message.clone()));
        map.insert(
            "path".to_string(),
            serde_json::Value::Array(
                self.path
                    .iter()
                    .map(|s| serde_json::Value::String(s.clone()))
                    .collect(),
            ),
        );
        if let Some(ref info) = self.error_info {
            let info_map: serde_json::Map<String, serde_json::Value> =
                info.to_dict().into_iter().collect();
            map.insert("error_info".to_string(), serde_json::Value::Object(info_map));
        }
        map
    }
}

/// Why a syntactically valid expression could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// A key was absent from a mapping, metadata or the keyword context.
    #[error("missing key '{key}'")]
    MissingKey {
        /// The missing key.
        key: String,
    },

    /// An attribute does not exist on the value.
    #[error("{type_name} has no attribute '{attribute}'")]
    MissingAttribute {
        /// The value's type.
        type_name: &'static str,
        /// The missing attribute.
        attribute: String,
    },

    /// Key access was applied to a value that does not support it.
    #[error("{type_name} does not support key access")]
    NotIndexable {
        /// The value's type.
        type_name: &'static str,
    },

    /// A list index was not a number or out of range.
    #[error("invalid index '{index}' for list of length {len}")]
    BadIndex {
        /// The index text.
        index: String,
        /// The list length.
        len: usize,
    },

    /// A node or port handle was resolved without a tree to look it up in.
    #[error("{type_name} handle cannot be resolved without a tree")]
    Detached {
        /// The handle type.
        type_name: &'static str,
    },
}

/// Errors raised by the expression evaluator.
#[derive(Debug, Clone, Error)]
pub enum ExpressionError {
    /// The expression text is malformed.
    #[error("Invalid expression '{expression}': {reason}")]
    InvalidExpression {
        /// The offending expression.
        expression: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The expression is well formed but the data is not there.
    #[error("Failed to resolve expression '{expression}' with keywords {keywords}: {source}")]
    MissingData {
        /// The expression being resolved.
        expression: String,
        /// Rendering of the keyword context.
        keywords: String,
        /// The underlying lookup failure.
        #[source]
        source: LookupError,
    },
}

impl ExpressionError {
    /// Creates an invalid expression error.
    #[must_use]
    pub fn invalid(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidExpression {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for the invalid-expression kind.
    #[must_use]
    pub fn is_invalid_expression(&self) -> bool {
        matches!(self, Self::InvalidExpression { .. })
    }

    /// Returns true for the missing-data kind.
    #[must_use]
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::MissingData { .. })
    }

    /// Returns the expression text.
    #[must_use]
    pub fn expression(&self) -> &str {
        match self {
            Self::InvalidExpression { expression, .. } | Self::MissingData { expression, .. } => {
                expression
            }
        }
    }
}

/// Error raised when a connection would give a single-connection input port
/// a second connection.
#[derive(Debug, Clone, Error)]
#[error("Multiple connections for single-connection port '{port}': {connection}")]
pub struct ArityError {
    /// Path of the saturated port.
    pub port: String,
    /// Rendering of the rejected connection.
    pub connection: String,
}

impl ArityError {
    /// Creates a new arity error.
    #[must_use]
    pub fn new(port: impl Into<String>, connection: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            connection: connection.into(),
        }
    }
}

/// Provides default suggestions for configuration error codes.
pub struct ErrorSuggestions;

impl ErrorSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            "CONFIG-SCHEMA" => Some(
                "Check connection and condition `type` values, comparison operators \
                 and required keys against the template schema.",
            ),
            "CONFIG-UNKNOWN-STAGE" => Some(
                "Declare the stage kind under `stages` before instantiating it.",
            ),
            "CONFIG-NOT-A-STAGE" => Some(
                "Resolve connections on the stage node, not on one of its workspaces.",
            ),
            "CONFIG-PORT-ATTACHED" => Some(
                "Create a new port instead of re-attaching one that already belongs to a node.",
            ),
            "CONFIG-PROMOTION-CONFLICT" => Some(
                "A stage port with the same direction and name already exists and is not \
                 a promoted port. Rename one of them.",
            ),
            "CONFIG-MISSING-PORT" => Some(
                "Check `port_name` and `port_type` on the connection; the referenced port \
                 must be materialized before connections are resolved.",
            ),
            "CONFIG-MISSING-WORKSPACE" => Some(
                "Check the connection's `workspace` key and any conditional branch that \
                 would have created it.",
            ),
            "CONFIG-LOOP-NOT-SEQUENCE" => Some(
                "A foreach `loop` expression must resolve to a list.",
            ),
            "CONFIG-ITEM-NOT-NODE" => Some(
                "A foreach `item` expression must resolve to a stage node.",
            ),
            "CONFIG-NOT-A-CONTAINER" => Some(
                "The `target` of an `in` comparison must resolve to a list, mapping or string.",
            ),
            _ => None,
        }
    }
}
