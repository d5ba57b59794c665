//! Clauses of the remote query language.

use std::fmt;

/// Quote a value as a string literal, escaping backslashes and quotes
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// One comparison against a query-language field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Equals { field: String, value: String },
    Contains { field: String, value: String },
    OnOrAfter { field: String, date: String },
    OnOrBefore { field: String, date: String },
    Before { field: String, date: String },
    NotIn { field: String, values: Vec<String> },
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Equals { field, value } => write!(f, "{field} = {}", quote(value)),
            Clause::Contains { field, value } => write!(f, "{field} ~ {}", quote(value)),
            Clause::OnOrAfter { field, date } => write!(f, "{field} >= {}", quote(date)),
            Clause::OnOrBefore { field, date } => write!(f, "{field} <= {}", quote(date)),
            Clause::Before { field, date } => write!(f, "{field} < {}", quote(date)),
            Clause::NotIn { field, values } => {
                let list: Vec<String> = values.iter().map(|v| quote(v)).collect();
                write!(f, "{field} NOT IN ({})", list.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("plain"), r#""plain""#);
        assert_eq!(quote(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(quote(r"C:\tmp"), r#""C:\\tmp""#);
    }

    #[test]
    fn test_clause_display() {
        let clause = Clause::NotIn {
            field: "status".to_string(),
            values: vec!["Done".to_string(), "Closed".to_string()],
        };
        assert_eq!(clause.to_string(), r#"status NOT IN ("Done", "Closed")"#);

        let clause = Clause::OnOrBefore {
            field: "created".to_string(),
            date: "2024-02-29".to_string(),
        };
        assert_eq!(clause.to_string(), r#"created <= "2024-02-29""#);

        let clause = Clause::Before {
            field: "created".to_string(),
            date: "2024-03-01".to_string(),
        };
        assert_eq!(clause.to_string(), r#"created < "2024-03-01""#);
    }
}
