use regex::Regex;
use std::sync::OnceLock;

/// Utility for parsing PostgreSQL constraint violation messages.
///
/// Extracts structured entity/field/value information from database error
/// text so constraint failures surface as typed errors instead of opaque
/// message strings.
pub struct ConstraintParser;

struct RegexPatterns {
    key_value: Regex,
    column_name: Regex,
    table_name: Regex,
}

impl RegexPatterns {
    fn new() -> Self {
        Self {
            // Matches "Key (field)=(value)" in PostgreSQL detail messages
            key_value: Regex::new(r"Key \(([^)]+)\)=\(([^)]*)\)").unwrap(),
            column_name: Regex::new(r#"column "([^"]+)""#).unwrap(),
            table_name: Regex::new(r#"(?:table|relation) "([^"]+)""#).unwrap(),
        }
    }
}

static REGEX_PATTERNS: OnceLock<RegexPatterns> = OnceLock::new();

impl ConstraintParser {
    fn patterns() -> &'static RegexPatterns {
        REGEX_PATTERNS.get_or_init(RegexPatterns::new)
    }

    /// Parses a unique constraint violation message.
    ///
    /// Returns `(entity, field, value)` when the message carries a
    /// `Key (field)=(value)` detail. The entity is derived from the
    /// constraint name (`<table>_<field>_key` convention) or from the quoted
    /// table name, falling back to `"resource"`.
    pub fn parse_unique_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String, String)> {
        let patterns = Self::patterns();
        let captures = patterns.key_value.captures(message)?;

        let field = captures.get(1)?.as_str().to_string();
        let value = captures.get(2)?.as_str().to_string();
        let entity = constraint_name
            .and_then(|name| name.split('_').next())
            .map(str::to_string)
            .or_else(|| {
                patterns
                    .table_name
                    .captures(message)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
            })
            .unwrap_or_else(|| "resource".to_string());

        Some((entity, field, value))
    }

    /// Parses a not-null constraint violation message.
    ///
    /// Returns `(entity, field)` extracted from the quoted column and
    /// table/relation names.
    pub fn parse_not_null_violation(
        message: &str,
        _constraint_name: Option<&str>,
    ) -> Option<(String, String)> {
        let patterns = Self::patterns();
        let field = patterns
            .column_name
            .captures(message)?
            .get(1)?
            .as_str()
            .to_string();
        let entity = patterns
            .table_name
            .captures(message)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "resource".to_string());

        Some((entity, field))
    }
}
