//! Portable default-expression translation.
//!
//! A tiny expression language for column defaults: literals, a handful of
//! nullary functions (`now()`, `gen_uuid()`), and common scalar functions.
//! Translation is total: every input produces a string, with unrecognized
//! input passed through verbatim. Upstream validation is the caller's
//! responsibility.
//!
//! Parsing is shallow. Arguments are split on top-level commas (respecting
//! quotes and parentheses) and each argument is run back through the
//! translator, but no expression tree is built.

use crate::dialect::Dialect;

/// SQLite has no `gen_random_uuid()`; this is the documented
/// `randomblob`/`hex` expression producing a v4 UUID string.
const SQLITE_UUID_EXPR: &str = "(lower(hex(randomblob(4)) || '-' || hex(randomblob(2)) || '-4' \
     || substr(hex(randomblob(2)),2) || '-' \
     || substr('89ab',abs(random()) % 4 + 1, 1) || substr(hex(randomblob(2)),2) || '-' \
     || hex(randomblob(6))))";

/// Translates a portable default expression into dialect SQL.
#[must_use]
pub fn translate_default(expr: &str, dialect: Dialect) -> String {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }

    // Quoted string literals are preserved verbatim.
    if trimmed.starts_with('\'') {
        return trimmed.to_string();
    }

    // Numeric literals pass through unchanged.
    if trimmed.parse::<f64>().is_ok() {
        return trimmed.to_string();
    }

    let lowered = trimmed.to_ascii_lowercase();
    match lowered.as_str() {
        "true" => {
            return match dialect {
                Dialect::Postgres => "true".to_string(),
                Dialect::Sqlite | Dialect::SqlServer => "1".to_string(),
            }
        }
        "false" => {
            return match dialect {
                Dialect::Postgres => "false".to_string(),
                Dialect::Sqlite | Dialect::SqlServer => "0".to_string(),
            }
        }
        "null" => return "NULL".to_string(),
        _ => {}
    }

    let Some((name, args)) = split_call(trimmed) else {
        return trimmed.to_string();
    };
    let name = name.to_ascii_lowercase();

    if args.is_empty() {
        if let Some(sql) = nullary(&name, dialect) {
            return sql.to_string();
        }
    }

    let translated: Vec<String> = args
        .iter()
        .map(|arg| translate_default(arg, dialect))
        .collect();

    match name.as_str() {
        "concat" if dialect == Dialect::Sqlite => format!("({})", translated.join(" || ")),
        "substring" if dialect == Dialect::Sqlite => {
            format!("substr({})", translated.join(", "))
        }
        "lower" | "upper" | "coalesce" | "length" | "substring" | "trim" | "concat" | "abs"
        | "round" => format!("{name}({})", translated.join(", ")),
        // Unknown identifiers applied with parentheses pass through; the
        // caller is trusted to have written dialect-neutral SQL.
        _ => format!("{name}({})", args.join(", ")),
    }
}

/// Maps the nullary functions; first match wins over scalar handling.
fn nullary(name: &str, dialect: Dialect) -> Option<&'static str> {
    let sql = match (name, dialect) {
        ("now", Dialect::Postgres) => "CURRENT_TIMESTAMP",
        ("now", Dialect::Sqlite) => "(datetime('now'))",
        ("now", Dialect::SqlServer) => "SYSUTCDATETIME()",
        ("current_timestamp", _) => "CURRENT_TIMESTAMP",
        ("current_date", Dialect::Postgres) => "CURRENT_DATE",
        ("current_date", Dialect::Sqlite) => "(date('now'))",
        ("current_date", Dialect::SqlServer) => "CAST(SYSUTCDATETIME() AS DATE)",
        ("current_time", Dialect::Postgres) => "CURRENT_TIME",
        ("current_time", Dialect::Sqlite) => "(time('now'))",
        ("current_time", Dialect::SqlServer) => "CAST(SYSUTCDATETIME() AS TIME)",
        ("gen_uuid" | "uuid", Dialect::Postgres) => "gen_random_uuid()",
        ("gen_uuid" | "uuid", Dialect::Sqlite) => SQLITE_UUID_EXPR,
        ("gen_uuid" | "uuid", Dialect::SqlServer) => "NEWID()",
        _ => return None,
    };
    Some(sql)
}

/// Splits `name(arg, arg, ...)` into the name and its top-level arguments.
/// Returns `None` when the input is not a call applied with parentheses.
fn split_call(input: &str) -> Option<(&str, Vec<&str>)> {
    let open = input.find('(')?;
    let name = input[..open].trim_end();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let rest = &input[open + 1..];
    let inner = rest.strip_suffix(')')?;

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut start = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => depth = depth.saturating_sub(1),
            ',' if !in_string && depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = inner[start..].trim();
    if !last.is_empty() {
        args.push(last);
    } else if !args.is_empty() {
        // Trailing comma: keep the empty slot so the output stays faithful.
        args.push(last);
    }
    Some((name, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_per_dialect() {
        assert_eq!(
            translate_default("now()", Dialect::Postgres),
            "CURRENT_TIMESTAMP"
        );
        assert_eq!(
            translate_default("now()", Dialect::Sqlite),
            "(datetime('now'))"
        );
        assert_eq!(
            translate_default("NOW()", Dialect::SqlServer),
            "SYSUTCDATETIME()"
        );
    }

    #[test]
    fn test_current_timestamp_everywhere() {
        for dialect in [Dialect::Postgres, Dialect::Sqlite, Dialect::SqlServer] {
            assert_eq!(
                translate_default("current_timestamp()", dialect),
                "CURRENT_TIMESTAMP"
            );
        }
    }

    #[test]
    fn test_uuid_aliases() {
        assert_eq!(
            translate_default("gen_uuid()", Dialect::Postgres),
            "gen_random_uuid()"
        );
        assert_eq!(
            translate_default("uuid()", Dialect::SqlServer),
            "NEWID()"
        );
        let sqlite = translate_default("gen_uuid()", Dialect::Sqlite);
        assert!(sqlite.contains("randomblob"));
        assert!(sqlite.contains("hex"));
    }

    #[test]
    fn test_booleans() {
        assert_eq!(translate_default("true", Dialect::Postgres), "true");
        assert_eq!(translate_default("true", Dialect::Sqlite), "1");
        assert_eq!(translate_default("True", Dialect::SqlServer), "1");
        assert_eq!(translate_default("false", Dialect::Sqlite), "0");
    }

    #[test]
    fn test_literals_pass_through() {
        assert_eq!(translate_default("42", Dialect::Postgres), "42");
        assert_eq!(translate_default("-3.14", Dialect::Sqlite), "-3.14");
        assert_eq!(
            translate_default("'hello, world'", Dialect::SqlServer),
            "'hello, world'"
        );
        assert_eq!(translate_default("null", Dialect::Postgres), "NULL");
    }

    #[test]
    fn test_scalar_rewrites() {
        assert_eq!(
            translate_default("lower(Name)", Dialect::Postgres),
            "lower(Name)"
        );
        assert_eq!(
            translate_default("substring(Name, 1, 3)", Dialect::Sqlite),
            "substr(Name, 1, 3)"
        );
        assert_eq!(
            translate_default("substring(Name, 1, 3)", Dialect::SqlServer),
            "substring(Name, 1, 3)"
        );
        assert_eq!(
            translate_default("concat(a, b, c)", Dialect::Sqlite),
            "(a || b || c)"
        );
        assert_eq!(
            translate_default("concat(a, b)", Dialect::Postgres),
            "concat(a, b)"
        );
    }

    #[test]
    fn test_nested_call_translates_inner() {
        assert_eq!(
            translate_default("lower(now())", Dialect::SqlServer),
            "lower(SYSUTCDATETIME())"
        );
    }

    #[test]
    fn test_unknown_call_passes_through() {
        assert_eq!(
            translate_default("my_func(a, 'b,c')", Dialect::Postgres),
            "my_func(a, 'b,c')"
        );
    }

    #[test]
    fn test_bare_identifier_passes_through() {
        assert_eq!(
            translate_default("CURRENT_TIMESTAMP", Dialect::Sqlite),
            "CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_quoted_commas_not_split() {
        assert_eq!(
            translate_default("coalesce(name, 'a,b')", Dialect::Postgres),
            "coalesce(name, 'a,b')"
        );
    }

    #[test]
    fn test_totality_never_empty_for_nonempty_input() {
        let inputs = [
            "now()",
            "gibberish",
            "weird(((",
            "42abc",
            "'unterminated",
            "f(x, g(y), 'z')",
        ];
        for input in inputs {
            for dialect in [Dialect::Postgres, Dialect::Sqlite, Dialect::SqlServer] {
                assert!(!translate_default(input, dialect).is_empty());
            }
        }
    }
}
