//! 命名参数编译与占位符改写
//!
//! - `:name` 形式的命名参数被编译为驱动的位置占位符，`::` 表示字面量冒号
//! - `?` 占位符按驱动的绑定风格改写为 `$N`、`@pN` 或 `:argN`
//!
//! 单引号字符串内的内容原样保留。

use crate::error::{DbError, Result};
use crate::value::{NamedArgs, Value};

/// 驱动的占位符风格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindType {
    /// `?`（SQLite、MySQL）
    #[default]
    Question,
    /// `$1`（PostgreSQL）
    Dollar,
    /// `:name`（Oracle）
    Named,
    /// `@p1`（SQL Server）
    At,
}

impl BindType {
    fn placeholder(self, index: usize, name: &str) -> String {
        match self {
            Self::Question => "?".to_string(),
            Self::Dollar => format!("${index}"),
            Self::Named => format!(":{name}"),
            Self::At => format!("@p{index}"),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// 编译命名参数查询
///
/// 返回按绑定风格改写后的查询和参数名（按出现顺序，重复出现的参数名会重复）。
pub fn compile_named(bind_type: BindType, query: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(query.len());
    let mut names = Vec::new();
    let mut chars = query.chars().peekable();
    let mut in_quote = false;

    while let Some(c) = chars.next() {
        if c == '\'' {
            in_quote = !in_quote;
            out.push(c);
            continue;
        }
        if in_quote || c != ':' {
            out.push(c);
            continue;
        }

        match chars.peek() {
            Some(':') => {
                chars.next();
                out.push(':');
            }
            Some(&next) if is_name_char(next) => {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if !is_name_char(next) {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }
                names.push(name);
                let last = names.len();
                out.push_str(&bind_type.placeholder(last, &names[last - 1]));
            }
            _ => out.push(':'),
        }
    }

    (out, names)
}

/// 把 `?` 占位符改写为驱动的绑定风格
pub fn rebind(bind_type: BindType, query: &str) -> String {
    if bind_type == BindType::Question {
        return query.to_string();
    }

    let mut out = String::with_capacity(query.len() + 8);
    let mut index = 0;
    let mut in_quote = false;

    for c in query.chars() {
        match c {
            '\'' => {
                in_quote = !in_quote;
                out.push(c);
            }
            '?' if !in_quote => {
                index += 1;
                match bind_type {
                    BindType::Named => out.push_str(&format!(":arg{index}")),
                    other => out.push_str(&other.placeholder(index, "")),
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// 编译命名参数查询并按顺序取出参数值
pub fn bind_named(bind_type: BindType, query: &str, args: &NamedArgs) -> Result<(String, Vec<Value>)> {
    let (bound, names) = compile_named(bind_type, query);

    let values = names
        .iter()
        .map(|name| {
            args.get(name)
                .cloned()
                .ok_or_else(|| DbError::MissingNamedArgument { name: name.clone() })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((bound, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_named_question() {
        let (query, names) = compile_named(
            BindType::Question,
            "INSERT INTO taxonomy (id, name) VALUES (:id, :name)",
        );
        assert_eq!(query, "INSERT INTO taxonomy (id, name) VALUES (?, ?)");
        assert_eq!(names, vec!["id", "name"]);
    }

    #[test]
    fn test_compile_named_dollar_and_repeats() {
        let (query, names) =
            compile_named(BindType::Dollar, "SELECT * FROM t WHERE a = :x OR b = :x");
        assert_eq!(query, "SELECT * FROM t WHERE a = $1 OR b = $2");
        assert_eq!(names, vec!["x", "x"]);
    }

    #[test]
    fn test_compile_named_escapes_and_quotes() {
        let (query, names) = compile_named(
            BindType::Question,
            "SELECT '10:30', a::text, ': ' FROM t WHERE id = :id",
        );
        assert_eq!(query, "SELECT '10:30', a:text, ': ' FROM t WHERE id = ?");
        assert_eq!(names, vec!["id"]);
    }

    #[test]
    fn test_rebind_styles() {
        let query = "SELECT * FROM t WHERE a = ? AND b = '?' AND c = ?";
        assert_eq!(rebind(BindType::Question, query), query);
        assert_eq!(
            rebind(BindType::Dollar, query),
            "SELECT * FROM t WHERE a = $1 AND b = '?' AND c = $2"
        );
        assert_eq!(
            rebind(BindType::At, query),
            "SELECT * FROM t WHERE a = @p1 AND b = '?' AND c = @p2"
        );
        assert_eq!(
            rebind(BindType::Named, query),
            "SELECT * FROM t WHERE a = :arg1 AND b = '?' AND c = :arg2"
        );
    }

    #[test]
    fn test_bind_named_orders_values() {
        let args = NamedArgs::new().with("name", "birds").with("id", "t-1");
        let (query, values) =
            bind_named(BindType::Question, "UPDATE t SET name = :name WHERE id = :id", &args)
                .unwrap();
        assert_eq!(query, "UPDATE t SET name = ? WHERE id = ?");
        assert_eq!(values, vec![Value::from("birds"), Value::from("t-1")]);
    }

    #[test]
    fn test_bind_named_missing_argument() {
        let err = bind_named(BindType::Question, "SELECT :missing", &NamedArgs::new()).unwrap_err();
        assert_eq!(err.code(), "MISSING_NAMED_ARGUMENT");
    }
}
