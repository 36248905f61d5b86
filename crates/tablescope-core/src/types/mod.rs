//! Column type model

use serde::{Deserialize, Serialize};
use sqlparser::ast::{ArrayElemTypeDef, DataType};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::Token;

/// Column types as the catalog describes them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlType {
    // Numeric types
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal {
        precision: Option<u64>,
        scale: Option<u64>,
    },

    // Character types
    Char {
        length: Option<u64>,
    },
    Varchar {
        length: Option<u64>,
    },
    String,

    Binary,
    Boolean,
    Date,
    Timestamp,

    // Complex types
    Array(Box<SqlType>),
    Map(Box<SqlType>, Box<SqlType>),
    Struct(Vec<StructField>),

    // Custom/User-defined type
    Custom(String),

    // Unknown (when conversion fails)
    Unknown,
}

/// Named field of a STRUCT type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub data_type: SqlType,
}

impl SqlType {
    /// Convert from sqlparser's DataType to our internal SqlType
    pub fn from_ast(data_type: &DataType) -> Self {
        match data_type {
            DataType::TinyInt(_) | DataType::UnsignedTinyInt(_) => SqlType::TinyInt,
            DataType::SmallInt(_) | DataType::UnsignedSmallInt(_) | DataType::Int2(_) => {
                SqlType::SmallInt
            }
            DataType::Int(_)
            | DataType::Integer(_)
            | DataType::UnsignedInt(_)
            | DataType::UnsignedInteger(_)
            | DataType::Int4(_) => SqlType::Int,
            DataType::BigInt(_) | DataType::UnsignedBigInt(_) | DataType::Int8(_) => {
                SqlType::BigInt
            }

            DataType::Real | DataType::Float4 | DataType::Float(_) => SqlType::Float,
            DataType::Double | DataType::DoublePrecision | DataType::Float8 => SqlType::Double,

            DataType::Decimal(info) | DataType::Numeric(info) => {
                let (precision, scale) = match info {
                    sqlparser::ast::ExactNumberInfo::None => (None, None),
                    sqlparser::ast::ExactNumberInfo::Precision(p) => (Some(*p), None),
                    sqlparser::ast::ExactNumberInfo::PrecisionAndScale(p, s) => {
                        (Some(*p), Some(*s))
                    }
                };
                SqlType::Decimal { precision, scale }
            }

            DataType::Char(info) | DataType::Character(info) => SqlType::Char {
                length: extract_char_length(info.as_ref()),
            },
            DataType::Varchar(info) | DataType::CharacterVarying(info) => SqlType::Varchar {
                length: extract_char_length(info.as_ref()),
            },
            DataType::Text | DataType::String(_) => SqlType::String,

            DataType::Binary(_) | DataType::Varbinary(_) | DataType::Blob(_) | DataType::Bytea => {
                SqlType::Binary
            }

            DataType::Boolean | DataType::Bool => SqlType::Boolean,
            DataType::Date => SqlType::Date,
            DataType::Timestamp(..) | DataType::Datetime(_) => SqlType::Timestamp,

            DataType::Array(inner) => match inner {
                ArrayElemTypeDef::AngleBracket(dt) | ArrayElemTypeDef::Parenthesis(dt) => {
                    SqlType::Array(Box::new(SqlType::from_ast(dt)))
                }
                ArrayElemTypeDef::SquareBracket(dt, _) => {
                    SqlType::Array(Box::new(SqlType::from_ast(dt)))
                }
                ArrayElemTypeDef::None => SqlType::Array(Box::new(SqlType::Unknown)),
            },
            DataType::Map(key, value) => SqlType::Map(
                Box::new(SqlType::from_ast(key)),
                Box::new(SqlType::from_ast(value)),
            ),
            DataType::Struct(fields, ..) => SqlType::Struct(
                fields
                    .iter()
                    .enumerate()
                    .map(|(i, field)| StructField {
                        name: field
                            .field_name
                            .as_ref()
                            .map(|n| n.value.clone())
                            .unwrap_or_else(|| format!("_f{}", i)),
                        data_type: SqlType::from_ast(&field.field_type),
                    })
                    .collect(),
            ),

            DataType::Custom(name, _) => {
                let type_name = name
                    .0
                    .iter()
                    .map(|i| i.value.clone())
                    .collect::<Vec<_>>()
                    .join(".");
                SqlType::Custom(type_name)
            }

            _ => SqlType::Unknown,
        }
    }

    /// Parse a type string such as `STRUCT<street STRING, zip INT>`.
    ///
    /// Hive spells maps `MAP<K,V>`; they are accepted alongside `MAP(K,V)`.
    pub fn parse(type_str: &str) -> Result<Self, ParserError> {
        let dialect = GenericDialect {};
        let type_str = parenthesize_maps(type_str);
        let mut parser = Parser::new(&dialect).try_with_sql(&type_str)?;
        let data_type = parser.parse_data_type()?;
        parser.expect_token(&Token::EOF)?;
        Ok(SqlType::from_ast(&data_type))
    }

    /// Whether values of this type have addressable nested parts
    pub fn is_complex(&self) -> bool {
        matches!(
            self,
            SqlType::Array(_) | SqlType::Map(..) | SqlType::Struct(_)
        )
    }

    /// Get a human-readable name for this type
    pub fn display_name(&self) -> String {
        match self {
            SqlType::TinyInt => "tinyint".to_string(),
            SqlType::SmallInt => "smallint".to_string(),
            SqlType::Int => "int".to_string(),
            SqlType::BigInt => "bigint".to_string(),
            SqlType::Float => "float".to_string(),
            SqlType::Double => "double".to_string(),
            SqlType::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => format!("decimal({p},{s})"),
                (Some(p), None) => format!("decimal({p})"),
                _ => "decimal".to_string(),
            },
            SqlType::Char { length } => match length {
                Some(l) => format!("char({l})"),
                None => "char".to_string(),
            },
            SqlType::Varchar { length } => match length {
                Some(l) => format!("varchar({l})"),
                None => "varchar".to_string(),
            },
            SqlType::String => "string".to_string(),
            SqlType::Binary => "binary".to_string(),
            SqlType::Boolean => "boolean".to_string(),
            SqlType::Date => "date".to_string(),
            SqlType::Timestamp => "timestamp".to_string(),
            SqlType::Array(inner) => format!("array<{}>", inner.display_name()),
            SqlType::Map(key, value) => {
                format!("map<{},{}>", key.display_name(), value.display_name())
            }
            SqlType::Struct(fields) => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}:{}", f.name, f.data_type.display_name()))
                    .collect();
                format!("struct<{}>", fields.join(","))
            }
            SqlType::Custom(name) => name.clone(),
            SqlType::Unknown => "unknown".to_string(),
        }
    }
}

/// Rewrite `MAP<K,V>` as `MAP(K,V)`, the only map form the generic parser
/// reads. Other angle brackets are left alone.
fn parenthesize_maps(type_str: &str) -> String {
    let chars: Vec<char> = type_str.chars().collect();
    let mut out = String::with_capacity(type_str.len());
    // One entry per open `<`: true when it opened a map
    let mut open: Vec<bool> = Vec::new();
    let mut word_end_is_map = false;

    for (i, &ch) in chars.iter().enumerate() {
        match ch {
            '<' => {
                open.push(word_end_is_map);
                out.push(if word_end_is_map { '(' } else { '<' });
                word_end_is_map = false;
            }
            '>' => {
                let closes_map = open.pop().unwrap_or(false);
                out.push(if closes_map { ')' } else { '>' });
                word_end_is_map = false;
            }
            c if c.is_whitespace() => out.push(c),
            c => {
                out.push(c);
                word_end_is_map = ends_map_keyword(&chars[..=i])
                    && !chars
                        .get(i + 1)
                        .is_some_and(|n| n.is_alphanumeric() || *n == '_');
            }
        }
    }
    out
}

fn ends_map_keyword(prefix: &[char]) -> bool {
    let Some(start) = prefix.len().checked_sub(3) else {
        return false;
    };
    let word: String = prefix[start..].iter().collect();
    let bounded = start == 0 || {
        let before = prefix[start - 1];
        !(before.is_alphanumeric() || before == '_')
    };
    bounded && word.eq_ignore_ascii_case("map")
}

/// Extract character length from CharacterLength if present
fn extract_char_length(info: Option<&sqlparser::ast::CharacterLength>) -> Option<u64> {
    info.map(|i| match i {
        sqlparser::ast::CharacterLength::IntegerLength { length, .. } => *length,
        sqlparser::ast::CharacterLength::Max => u64::MAX,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar_types() {
        assert_eq!(SqlType::parse("BIGINT").unwrap(), SqlType::BigInt);
        assert_eq!(SqlType::parse("string").unwrap(), SqlType::String);
        assert_eq!(
            SqlType::parse("DECIMAL(10, 2)").unwrap(),
            SqlType::Decimal {
                precision: Some(10),
                scale: Some(2)
            }
        );
    }

    #[test]
    fn test_parse_complex_types() {
        let ty = SqlType::parse("STRUCT<street STRING, zip INT>").unwrap();
        assert!(ty.is_complex());
        assert_eq!(ty.display_name(), "struct<street:string,zip:int>");

        let ty = SqlType::parse("ARRAY<BIGINT>").unwrap();
        assert_eq!(ty, SqlType::Array(Box::new(SqlType::BigInt)));
        assert!(!SqlType::BigInt.is_complex());

        let ty = SqlType::parse("MAP<STRING,INT>").unwrap();
        assert_eq!(
            ty,
            SqlType::Map(Box::new(SqlType::String), Box::new(SqlType::Int))
        );
        assert!(ty.is_complex());

        let ty = SqlType::parse("map<string, array<bigint>>").unwrap();
        assert_eq!(ty.display_name(), "map<string,array<bigint>>");

        let ty = SqlType::parse("STRUCT<tags MAP<STRING,INT>, roadmap STRING>").unwrap();
        assert_eq!(ty.display_name(), "struct<tags:map<string,int>,roadmap:string>");
    }

    #[test]
    fn test_parenthesize_maps_only_rewrites_map_brackets() {
        assert_eq!(parenthesize_maps("MAP < K, V >"), "MAP ( K, V )");
        assert_eq!(
            parenthesize_maps("MAP<STRING, MAP<INT, ARRAY<INT>>>"),
            "MAP(STRING, MAP(INT, ARRAY<INT>))"
        );
        assert_eq!(parenthesize_maps("STRUCT<roadmap INT>"), "STRUCT<roadmap INT>");
        assert_eq!(parenthesize_maps("ARRAY<BIGINT>"), "ARRAY<BIGINT>");
    }

    #[test]
    fn test_parse_invalid_type() {
        assert!(SqlType::parse("ARRAY<").is_err());
        assert!(SqlType::parse("BIGINT extra").is_err());
    }
}
