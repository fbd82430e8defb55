//! Chained-accessor expressions: `word`, `.word` and `[word]` tokens.
//!
//! `stage.parent[is_rigged]` looks up `stage` in the keyword context, reads
//! its `parent` attribute, then the `is_rigged` key of the result. The whole
//! string is tokenized before anything is resolved.

use super::{Keywords, Value};
use crate::errors::{ExpressionError, LookupError};
use crate::model::{Node, Port, Tree};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\.(?P<attr>\w+)|\[(?P<item>\w+)\]|(?P<bare>\w+))")
        .expect("token pattern is a valid regex")
});

/// How a token reaches into the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    /// `.word`
    Attribute,
    /// `[word]`
    Item,
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    source: String,
    head: String,
    steps: Vec<(Accessor, String)>,
}

impl Expression {
    /// Tokenizes an expression.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError::InvalidExpression`] for empty input, stray
    /// characters, unmatched brackets, doubled dots, or a bare word after the
    /// first token.
    pub fn parse(expression: &str) -> Result<Self, ExpressionError> {
        if expression.is_empty() {
            return Err(ExpressionError::invalid(expression, "Empty expression"));
        }

        let pattern = &*TOKEN_PATTERN;
        let mut head = None;
        let mut steps = Vec::new();
        let mut offset = 0;

        while offset < expression.len() {
            let rest = &expression[offset..];
            let captures = pattern.captures(rest).ok_or_else(|| {
                ExpressionError::invalid(
                    expression,
                    format!("Malformed expression at offset {offset}: '{rest}'"),
                )
            })?;

            if let Some(word) = captures.name("bare") {
                if head.is_some() {
                    return Err(ExpressionError::invalid(
                        expression,
                        format!("Missing accessor for keyword: {}", word.as_str()),
                    ));
                }
                head = Some(word.as_str().to_string());
            } else {
                let (accessor, word) = match (captures.name("attr"), captures.name("item")) {
                    (Some(word), _) => (Accessor::Attribute, word),
                    (_, Some(word)) => (Accessor::Item, word),
                    _ => unreachable!("token pattern has three alternatives"),
                };
                if head.is_none() {
                    return Err(ExpressionError::invalid(
                        expression,
                        format!("Expression must start with a keyword, found '{rest}'"),
                    ));
                }
                steps.push((accessor, word.as_str().to_string()));
            }

            offset += captures.get(0).map_or(rest.len(), |m| m.end());
        }

        let head = head.ok_or_else(|| ExpressionError::invalid(expression, "Missing keyword"))?;
        Ok(Self {
            source: expression.to_string(),
            head,
            steps,
        })
    }

    /// Returns the original text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns the leading keyword.
    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.head
    }

    /// Returns the accessor chain after the keyword.
    #[must_use]
    pub fn steps(&self) -> &[(Accessor, String)] {
        &self.steps
    }

    /// Resolves the expression against a keyword context.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError::MissingData`] when a key or attribute is
    /// absent or an accessor is applied to a value that does not support it.
    pub fn resolve(&self, keywords: &Keywords<'_>) -> Result<Value, ExpressionError> {
        let missing = |source: LookupError| ExpressionError::MissingData {
            expression: self.source.clone(),
            keywords: keywords.to_string(),
            source,
        };

        let mut current = keywords
            .get(&self.head)
            .cloned()
            .ok_or_else(|| missing(LookupError::MissingKey { key: self.head.clone() }))?;

        for (accessor, word) in &self.steps {
            current = match accessor {
                Accessor::Attribute => attribute(&current, word, keywords.tree()),
                Accessor::Item => item(&current, word, keywords.tree()),
            }
            .map_err(missing)?;
        }

        Ok(current)
    }
}

impl FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parses and resolves `expression` in one step.
///
/// # Errors
///
/// See [`Expression::parse`] and [`Expression::resolve`].
pub fn evaluate(expression: &str, keywords: &Keywords<'_>) -> Result<Value, ExpressionError> {
    Expression::parse(expression)?.resolve(keywords)
}

fn attribute(value: &Value, name: &str, tree: Option<&Tree>) -> Result<Value, LookupError> {
    let missing = || LookupError::MissingAttribute {
        type_name: value.type_name(),
        attribute: name.to_string(),
    };

    match value {
        Value::Object(attributes) => attributes.get(name).cloned().ok_or_else(missing),
        Value::Node(id) => {
            let tree = tree.ok_or(LookupError::Detached { type_name: "node" })?;
            let node = tree.get_node(*id).ok_or(LookupError::Detached { type_name: "node" })?;
            node_attribute(node, name).ok_or_else(missing)
        }
        Value::Port(id) => {
            let tree = tree.ok_or(LookupError::Detached { type_name: "port" })?;
            let port = tree.get_port(*id).ok_or(LookupError::Detached { type_name: "port" })?;
            port_attribute(port, name).ok_or_else(missing)
        }
        _ => Err(missing()),
    }
}

fn node_attribute(node: &Node, name: &str) -> Option<Value> {
    let value = match name {
        "name" => Value::from(node.name()),
        "kind" => Value::from(node.kind()),
        "parent" => node.parent().into(),
        "children" => Value::List(node.children().iter().copied().map(Value::Node).collect()),
        "ports" => Value::List(node.ports().iter().copied().map(Value::Port).collect()),
        "metadata" => node.metadata.to_value(),
        _ => return None,
    };
    Some(value)
}

fn port_attribute(port: &Port, name: &str) -> Option<Value> {
    let value = match name {
        "name" => Value::from(port.name()),
        "direction" => Value::from(port.direction().as_str()),
        "node" => port.node().into(),
        "multi" => Value::Bool(port.is_multi()),
        "promoted" => Value::Bool(port.is_promoted()),
        "shared" => Value::List(port.shared().iter().copied().map(Value::Port).collect()),
        "metadata" => port.metadata.to_value(),
        _ => return None,
    };
    Some(value)
}

fn item(value: &Value, key: &str, tree: Option<&Tree>) -> Result<Value, LookupError> {
    let missing = || LookupError::MissingKey { key: key.to_string() };

    match value {
        Value::Map(map) => map.get(key).cloned().ok_or_else(missing),
        Value::List(items) => key
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index))
            .cloned()
            .ok_or_else(|| LookupError::BadIndex {
                index: key.to_string(),
                len: items.len(),
            }),
        Value::Node(id) => {
            let tree = tree.ok_or(LookupError::Detached { type_name: "node" })?;
            let node = tree.get_node(*id).ok_or(LookupError::Detached { type_name: "node" })?;
            node.metadata.value(key).cloned().ok_or_else(missing)
        }
        Value::Port(id) => {
            let tree = tree.ok_or(LookupError::Detached { type_name: "port" })?;
            let port = tree.get_port(*id).ok_or(LookupError::Detached { type_name: "port" })?;
            port.metadata.value(key).cloned().ok_or_else(missing)
        }
        _ => Err(LookupError::NotIndexable {
            type_name: value.type_name(),
        }),
    }
}
