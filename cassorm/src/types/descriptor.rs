use crate::error::{OrmError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A parsed column type expression such as `int`, `list<int>` or
/// `map<text, frozen<set<uuid>>>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Name(String),
    Parameterized {
        name: String,
        args: Vec<TypeDescriptor>,
    },
    /// Text that is not a type expression (`list<text`, `decimal(10,2)`).
    /// Kept verbatim; no handler resolves it.
    Unparsed(String),
}

impl TypeDescriptor {
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser { input, pos: 0 };
        let descriptor = parser.descriptor()?;
        parser.skip_ws();
        if parser.pos != input.len() {
            return Err(OrmError::TypeParse(format!(
                "unexpected trailing input at offset {} in '{input}'",
                parser.pos
            )));
        }
        Ok(descriptor)
    }

    /// Like [`TypeDescriptor::parse`], but keeps malformed input as
    /// [`TypeDescriptor::Unparsed`] instead of failing.
    pub fn parse_lenient(input: &str) -> Self {
        Self::parse(input).unwrap_or_else(|e| {
            log::debug!("Keeping unparsed type descriptor '{input}': {e}");
            TypeDescriptor::Unparsed(input.to_string())
        })
    }

    pub fn is_parsed(&self) -> bool {
        !matches!(self, TypeDescriptor::Unparsed(_))
    }

    /// The outer type name: `list` for `list<int>`, `int` for `int`.
    pub fn name(&self) -> &str {
        match self {
            TypeDescriptor::Name(name) => name,
            TypeDescriptor::Parameterized { name, .. } => name,
            TypeDescriptor::Unparsed(raw) => raw,
        }
    }

    /// The plain name, only when the descriptor has no type arguments.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            TypeDescriptor::Name(name) => Some(name),
            TypeDescriptor::Parameterized { .. } | TypeDescriptor::Unparsed(_) => None,
        }
    }

    pub fn args(&self) -> &[TypeDescriptor] {
        match self {
            TypeDescriptor::Name(_) | TypeDescriptor::Unparsed(_) => &[],
            TypeDescriptor::Parameterized { args, .. } => args,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Name(name) | TypeDescriptor::Unparsed(name) => f.write_str(name),
            TypeDescriptor::Parameterized { name, args } => {
                write!(f, "{name}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
        }
    }
}

impl FromStr for TypeDescriptor {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self> {
        TypeDescriptor::parse(s)
    }
}

impl Serialize for TypeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Malformed strings deserialize as [`TypeDescriptor::Unparsed`] so one bad
/// field doesn't reject a whole schema document.
impl<'de> Deserialize<'de> for TypeDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TypeDescriptor::parse_lenient(&raw))
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn descriptor(&mut self) -> Result<TypeDescriptor> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(OrmError::TypeParse(format!(
                "expected a type name at offset {start} in '{}'",
                self.input
            )));
        }
        let name = self.input[start..self.pos].to_string();

        self.skip_ws();
        if self.peek() != Some('<') {
            return Ok(TypeDescriptor::Name(name));
        }
        self.pos += 1;

        let mut args = Vec::new();
        loop {
            args.push(self.descriptor()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('>') => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    return Err(OrmError::TypeParse(format!(
                        "expected ',' or '>' at offset {} in '{}'",
                        self.pos, self.input
                    )))
                }
            }
        }

        Ok(TypeDescriptor::Parameterized { name, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_name() {
        let d = TypeDescriptor::parse("  int ").unwrap();
        assert_eq!(d, TypeDescriptor::Name("int".into()));
        assert_eq!(d.as_name(), Some("int"));
        assert!(d.args().is_empty());
    }

    #[test]
    fn test_parse_nested() {
        let d = TypeDescriptor::parse("map<text,frozen<set<uuid>>>").unwrap();
        assert_eq!(d.name(), "map");
        assert_eq!(d.as_name(), None);
        assert_eq!(d.args().len(), 2);
        assert_eq!(d.args()[1].args()[0].name(), "set");
        assert_eq!(d.to_string(), "map<text, frozen<set<uuid>>>");
    }

    #[test]
    fn test_display_parses_back() {
        let d: TypeDescriptor = "tuple< int , text >".parse().unwrap();
        let again = TypeDescriptor::parse(&d.to_string()).unwrap();
        assert_eq!(d, again);
    }

    #[test]
    fn test_parse_errors() {
        assert!(TypeDescriptor::parse("").is_err());
        assert!(TypeDescriptor::parse("list<").is_err());
        assert!(TypeDescriptor::parse("list<int").is_err());
        assert!(TypeDescriptor::parse("int extra").is_err());
        assert!(TypeDescriptor::parse("map<,int>").is_err());
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let d: TypeDescriptor = serde_yaml::from_str("'list<bigint>'").unwrap();
        assert_eq!(d.name(), "list");
        assert_eq!(d.args()[0], TypeDescriptor::Name("bigint".into()));

        let d: TypeDescriptor = serde_yaml::from_str("'list<'").unwrap();
        assert_eq!(d, TypeDescriptor::Unparsed("list<".into()));
        assert!(!d.is_parsed());
    }

    #[test]
    fn test_lenient_parse_keeps_raw_text() {
        let d = TypeDescriptor::parse_lenient("decimal(10,2)");
        assert_eq!(d.to_string(), "decimal(10,2)");
        assert_eq!(d.as_name(), None);
        assert!(d.args().is_empty());
        assert!(TypeDescriptor::parse_lenient("list<int>").is_parsed());
    }
}
