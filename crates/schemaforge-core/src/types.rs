//! The closed set of portable column types.
//!
//! Every dialect translator matches exhaustively over [`PortableType`], so a
//! variant added here fails to compile until each dialect has decided what to
//! do with it. Variants carry exactly their defining parameters and nothing
//! else.
//!
//! # Serialized form
//!
//! Types serialize as tagged values, e.g.
//! `{ "kind": "Decimal", "precision": 18, "scale": 2 }`. The compact string
//! form (`"Decimal(18,2)"`, `"NVarChar(MAX)"`) is additionally accepted on
//! input. An omitted `maxLength` on `NVarChar`/`VarBinary` (and an explicit
//! `"MAX"` in the compact form) means unbounded.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Sentinel for an unbounded `NVarChar`/`VarBinary` length.
pub const MAX_LENGTH: u32 = u32::MAX;

/// Default SRID for [`PortableType::Geography`] (WGS 84).
pub const DEFAULT_GEOGRAPHY_SRID: i32 = 4326;

/// A dialect-neutral column type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "TypeRepr", try_from = "TypeInput")]
pub enum PortableType {
    /// 8-bit integer.
    TinyInt,
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    BigInt,
    /// Exact numeric with precision 1..=38 and scale 0..=precision.
    Decimal {
        /// Total number of digits.
        precision: u8,
        /// Digits to the right of the decimal point.
        scale: u8,
    },
    /// Currency amount (8 bytes on platforms that distinguish it).
    Money,
    /// Currency amount (4 bytes on platforms that distinguish it).
    SmallMoney,
    /// Single-precision float.
    Float,
    /// Double-precision float.
    Double,
    /// Fixed-length character string.
    Char {
        /// Exact length in characters.
        length: u32,
    },
    /// Variable-length character string.
    VarChar {
        /// Maximum length in characters.
        max_length: u32,
    },
    /// Fixed-length Unicode character string.
    NChar {
        /// Exact length in characters.
        length: u32,
    },
    /// Variable-length Unicode string; [`MAX_LENGTH`] means unbounded.
    NVarChar {
        /// Maximum length, or [`MAX_LENGTH`] for unbounded.
        max_length: u32,
    },
    /// Unbounded text.
    Text,
    /// Fixed-length binary data.
    Binary {
        /// Exact length in bytes.
        length: u32,
    },
    /// Variable-length binary data; [`MAX_LENGTH`] means unbounded.
    VarBinary {
        /// Maximum length, or [`MAX_LENGTH`] for unbounded.
        max_length: u32,
    },
    /// Unbounded binary data.
    Blob,
    /// Calendar date without time.
    Date,
    /// Time of day with fractional-second precision 0..=7.
    Time {
        /// Fractional-second digits.
        precision: u8,
    },
    /// Date and time with fractional-second precision 0..=7.
    DateTime {
        /// Fractional-second digits.
        precision: u8,
    },
    /// Date and time carrying a UTC offset.
    DateTimeOffset,
    /// Automatic row-versioning stamp.
    RowVersion,
    /// Universally unique identifier.
    Uuid,
    /// True/false value.
    Boolean,
    /// JSON document.
    Json,
    /// XML document.
    Xml,
    /// Planar spatial data with an optional SRID.
    Geometry {
        /// Spatial reference identifier, if pinned.
        srid: Option<i32>,
    },
    /// Geodetic spatial data; defaults to SRID 4326.
    Geography {
        /// Spatial reference identifier.
        srid: i32,
    },
    /// Named enumeration with an ordered, non-empty value list.
    Enum {
        /// Type name as created on platforms with native enums.
        name: String,
        /// Ordered member values.
        values: Vec<String>,
    },
}

impl PortableType {
    /// Returns true for the integer variants (the only types that may carry
    /// an identity clause).
    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::TinyInt | Self::SmallInt | Self::Int | Self::BigInt
        )
    }

    /// Returns the variant name without parameters, for error reporting.
    #[must_use]
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::TinyInt => "TinyInt",
            Self::SmallInt => "SmallInt",
            Self::Int => "Int",
            Self::BigInt => "BigInt",
            Self::Decimal { .. } => "Decimal",
            Self::Money => "Money",
            Self::SmallMoney => "SmallMoney",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::Char { .. } => "Char",
            Self::VarChar { .. } => "VarChar",
            Self::NChar { .. } => "NChar",
            Self::NVarChar { .. } => "NVarChar",
            Self::Text => "Text",
            Self::Binary { .. } => "Binary",
            Self::VarBinary { .. } => "VarBinary",
            Self::Blob => "Blob",
            Self::Date => "Date",
            Self::Time { .. } => "Time",
            Self::DateTime { .. } => "DateTime",
            Self::DateTimeOffset => "DateTimeOffset",
            Self::RowVersion => "RowVersion",
            Self::Uuid => "Uuid",
            Self::Boolean => "Boolean",
            Self::Json => "Json",
            Self::Xml => "Xml",
            Self::Geometry { .. } => "Geometry",
            Self::Geography { .. } => "Geography",
            Self::Enum { .. } => "Enum",
        }
    }

    /// Checks the parameter ranges this variant allows.
    pub fn check_params(&self) -> Result<(), SchemaError> {
        let err = |reason: &str| SchemaError::InvalidTypeParams {
            kind: self.variant_name().to_string(),
            reason: reason.to_string(),
        };
        match self {
            Self::Decimal { precision, scale } => {
                if !(1..=38).contains(precision) {
                    return Err(err("precision must be 1..=38"));
                }
                if scale > precision {
                    return Err(err("scale must not exceed precision"));
                }
            }
            Self::Time { precision } | Self::DateTime { precision } => {
                if *precision > 7 {
                    return Err(err("precision must be 0..=7"));
                }
            }
            Self::Enum { values, .. } => {
                if values.is_empty() {
                    return Err(err("enum needs at least one value"));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl fmt::Display for PortableType {
    /// Renders the compact form, e.g. `Decimal(18,2)` or `NVarChar(MAX)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal { precision, scale } => {
                write!(f, "Decimal({precision},{scale})")
            }
            Self::Char { length } => write!(f, "Char({length})"),
            Self::NChar { length } => write!(f, "NChar({length})"),
            Self::Binary { length } => write!(f, "Binary({length})"),
            Self::VarChar { max_length } => write!(f, "VarChar({max_length})"),
            Self::NVarChar { max_length } if *max_length == MAX_LENGTH => {
                write!(f, "NVarChar(MAX)")
            }
            Self::NVarChar { max_length } => write!(f, "NVarChar({max_length})"),
            Self::VarBinary { max_length } if *max_length == MAX_LENGTH => {
                write!(f, "VarBinary(MAX)")
            }
            Self::VarBinary { max_length } => write!(f, "VarBinary({max_length})"),
            Self::Time { precision } => write!(f, "Time({precision})"),
            Self::DateTime { precision } => write!(f, "DateTime({precision})"),
            Self::Geometry { srid: Some(srid) } => write!(f, "Geometry({srid})"),
            Self::Geography { srid } => write!(f, "Geography({srid})"),
            Self::Enum { name, .. } => write!(f, "Enum({name})"),
            other => f.write_str(other.variant_name()),
        }
    }
}

impl FromStr for PortableType {
    type Err = SchemaError;

    /// Parses the compact form. Kind names match case-insensitively; `MAX`
    /// marks an unbounded `NVarChar`/`VarBinary`. The `Enum` variant has no
    /// compact form (its value list does not fit one).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, args) = match s.split_once('(') {
            Some((kind, rest)) => {
                let rest = rest.trim_end();
                let Some(inner) = rest.strip_suffix(')') else {
                    return Err(SchemaError::InvalidTypeParams {
                        kind: kind.trim().to_string(),
                        reason: "unterminated parameter list".to_string(),
                    });
                };
                let args: Vec<&str> = inner.split(',').map(str::trim).collect();
                (kind.trim(), args)
            }
            None => (s, Vec::new()),
        };

        let parse_len = |kind: &str, arg: &str| -> Result<u32, SchemaError> {
            if arg.eq_ignore_ascii_case("max") {
                return Ok(MAX_LENGTH);
            }
            arg.parse().map_err(|_| SchemaError::InvalidTypeParams {
                kind: kind.to_string(),
                reason: format!("expected a length, got '{arg}'"),
            })
        };
        let one_arg = |args: &[&str]| -> Result<(), SchemaError> {
            if args.len() == 1 {
                Ok(())
            } else {
                Err(SchemaError::InvalidTypeParams {
                    kind: kind.to_string(),
                    reason: "expected exactly one parameter".to_string(),
                })
            }
        };

        let lower = kind.to_ascii_lowercase();
        let ty = match lower.as_str() {
            "tinyint" => Self::TinyInt,
            "smallint" => Self::SmallInt,
            "int" => Self::Int,
            "bigint" => Self::BigInt,
            "money" => Self::Money,
            "smallmoney" => Self::SmallMoney,
            "float" => Self::Float,
            "double" => Self::Double,
            "text" => Self::Text,
            "blob" => Self::Blob,
            "date" => Self::Date,
            "datetimeoffset" => Self::DateTimeOffset,
            "rowversion" => Self::RowVersion,
            "uuid" => Self::Uuid,
            "boolean" => Self::Boolean,
            "json" => Self::Json,
            "xml" => Self::Xml,
            "decimal" => {
                if args.len() != 2 {
                    return Err(SchemaError::InvalidTypeParams {
                        kind: kind.to_string(),
                        reason: "expected (precision,scale)".to_string(),
                    });
                }
                let parse_u8 = |arg: &str| -> Result<u8, SchemaError> {
                    arg.parse().map_err(|_| SchemaError::InvalidTypeParams {
                        kind: kind.to_string(),
                        reason: format!("expected a digit count, got '{arg}'"),
                    })
                };
                Self::Decimal {
                    precision: parse_u8(args[0])?,
                    scale: parse_u8(args[1])?,
                }
            }
            "char" => {
                one_arg(&args)?;
                Self::Char {
                    length: parse_len(kind, args[0])?,
                }
            }
            "varchar" => {
                one_arg(&args)?;
                Self::VarChar {
                    max_length: parse_len(kind, args[0])?,
                }
            }
            "nchar" => {
                one_arg(&args)?;
                Self::NChar {
                    length: parse_len(kind, args[0])?,
                }
            }
            "nvarchar" => {
                if args.is_empty() {
                    Self::NVarChar {
                        max_length: MAX_LENGTH,
                    }
                } else {
                    one_arg(&args)?;
                    Self::NVarChar {
                        max_length: parse_len(kind, args[0])?,
                    }
                }
            }
            "binary" => {
                one_arg(&args)?;
                Self::Binary {
                    length: parse_len(kind, args[0])?,
                }
            }
            "varbinary" => {
                if args.is_empty() {
                    Self::VarBinary {
                        max_length: MAX_LENGTH,
                    }
                } else {
                    one_arg(&args)?;
                    Self::VarBinary {
                        max_length: parse_len(kind, args[0])?,
                    }
                }
            }
            "time" | "datetime" => {
                let precision = if args.is_empty() {
                    0
                } else {
                    one_arg(&args)?;
                    args[0].parse().map_err(|_| SchemaError::InvalidTypeParams {
                        kind: kind.to_string(),
                        reason: format!("expected a precision, got '{}'", args[0]),
                    })?
                };
                if lower == "time" {
                    Self::Time { precision }
                } else {
                    Self::DateTime { precision }
                }
            }
            "geometry" => {
                let srid = if args.is_empty() {
                    None
                } else {
                    one_arg(&args)?;
                    Some(parse_srid(kind, args[0])?)
                };
                Self::Geometry { srid }
            }
            "geography" => {
                let srid = if args.is_empty() {
                    DEFAULT_GEOGRAPHY_SRID
                } else {
                    one_arg(&args)?;
                    parse_srid(kind, args[0])?
                };
                Self::Geography { srid }
            }
            _ => {
                return Err(SchemaError::UnknownTypeKind {
                    kind: kind.to_string(),
                })
            }
        };
        ty.check_params()?;
        Ok(ty)
    }
}

fn parse_srid(kind: &str, arg: &str) -> Result<i32, SchemaError> {
    arg.parse().map_err(|_| SchemaError::InvalidTypeParams {
        kind: kind.to_string(),
        reason: format!("expected an SRID, got '{arg}'"),
    })
}

/// Serialized shape of a portable type.
///
/// serde cannot combine `tag = "kind"` with `deny_unknown_fields`, so the
/// tagged representation goes through this DTO instead of an internally
/// tagged derive.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeRepr {
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    precision: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    length: Option<u32>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    max_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    srid: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<Vec<String>>,
}

impl TypeRepr {
    fn bare(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            precision: None,
            scale: None,
            length: None,
            max_length: None,
            srid: None,
            name: None,
            values: None,
        }
    }
}

impl From<PortableType> for TypeRepr {
    fn from(ty: PortableType) -> Self {
        let mut repr = Self::bare(ty.variant_name());
        match ty {
            PortableType::Decimal { precision, scale } => {
                repr.precision = Some(precision);
                repr.scale = Some(scale);
            }
            PortableType::Char { length }
            | PortableType::NChar { length }
            | PortableType::Binary { length } => repr.length = Some(length),
            PortableType::VarChar { max_length } => repr.max_length = Some(max_length),
            PortableType::NVarChar { max_length } | PortableType::VarBinary { max_length } => {
                // An omitted maxLength means unbounded.
                if max_length != MAX_LENGTH {
                    repr.max_length = Some(max_length);
                }
            }
            PortableType::Time { precision } | PortableType::DateTime { precision } => {
                repr.precision = Some(precision);
            }
            PortableType::Geometry { srid } => repr.srid = srid,
            PortableType::Geography { srid } => {
                if srid != DEFAULT_GEOGRAPHY_SRID {
                    repr.srid = Some(srid);
                }
            }
            PortableType::Enum { name, values } => {
                repr.name = Some(name);
                repr.values = Some(values);
            }
            _ => {}
        }
        repr
    }
}

/// Accepted input shapes: the tagged DTO or the compact string form.
#[derive(Deserialize)]
#[serde(untagged)]
enum TypeInput {
    Compact(String),
    Tagged(TypeRepr),
}

impl TryFrom<TypeInput> for PortableType {
    type Error = SchemaError;

    fn try_from(input: TypeInput) -> Result<Self, Self::Error> {
        let repr = match input {
            TypeInput::Compact(s) => return s.parse(),
            TypeInput::Tagged(repr) => repr,
        };

        let kind = repr.kind.clone();
        let no_params = |repr: &TypeRepr| -> Result<(), SchemaError> {
            if repr.precision.is_some()
                || repr.scale.is_some()
                || repr.length.is_some()
                || repr.max_length.is_some()
                || repr.srid.is_some()
                || repr.name.is_some()
                || repr.values.is_some()
            {
                Err(SchemaError::InvalidTypeParams {
                    kind: kind.clone(),
                    reason: "this kind takes no parameters".to_string(),
                })
            } else {
                Ok(())
            }
        };
        let required = |field: Option<u32>, what: &str| -> Result<u32, SchemaError> {
            field.ok_or_else(|| SchemaError::InvalidTypeParams {
                kind: kind.clone(),
                reason: format!("missing required field '{what}'"),
            })
        };

        let ty = match repr.kind.as_str() {
            "TinyInt" => {
                no_params(&repr)?;
                Self::TinyInt
            }
            "SmallInt" => {
                no_params(&repr)?;
                Self::SmallInt
            }
            "Int" => {
                no_params(&repr)?;
                Self::Int
            }
            "BigInt" => {
                no_params(&repr)?;
                Self::BigInt
            }
            "Money" => {
                no_params(&repr)?;
                Self::Money
            }
            "SmallMoney" => {
                no_params(&repr)?;
                Self::SmallMoney
            }
            "Float" => {
                no_params(&repr)?;
                Self::Float
            }
            "Double" => {
                no_params(&repr)?;
                Self::Double
            }
            "Text" => {
                no_params(&repr)?;
                Self::Text
            }
            "Blob" => {
                no_params(&repr)?;
                Self::Blob
            }
            "Date" => {
                no_params(&repr)?;
                Self::Date
            }
            "DateTimeOffset" => {
                no_params(&repr)?;
                Self::DateTimeOffset
            }
            "RowVersion" => {
                no_params(&repr)?;
                Self::RowVersion
            }
            "Uuid" => {
                no_params(&repr)?;
                Self::Uuid
            }
            "Boolean" => {
                no_params(&repr)?;
                Self::Boolean
            }
            "Json" => {
                no_params(&repr)?;
                Self::Json
            }
            "Xml" => {
                no_params(&repr)?;
                Self::Xml
            }
            "Decimal" => Self::Decimal {
                precision: repr.precision.ok_or_else(|| SchemaError::InvalidTypeParams {
                    kind: kind.clone(),
                    reason: "missing required field 'precision'".to_string(),
                })?,
                scale: repr.scale.unwrap_or(0),
            },
            "Char" => Self::Char {
                length: required(repr.length, "length")?,
            },
            "VarChar" => Self::VarChar {
                max_length: required(repr.max_length, "maxLength")?,
            },
            "NChar" => Self::NChar {
                length: required(repr.length, "length")?,
            },
            "NVarChar" => Self::NVarChar {
                max_length: repr.max_length.unwrap_or(MAX_LENGTH),
            },
            "Binary" => Self::Binary {
                length: required(repr.length, "length")?,
            },
            "VarBinary" => Self::VarBinary {
                max_length: repr.max_length.unwrap_or(MAX_LENGTH),
            },
            "Time" => Self::Time {
                precision: repr.precision.unwrap_or(0),
            },
            "DateTime" => Self::DateTime {
                precision: repr.precision.unwrap_or(0),
            },
            "Geometry" => Self::Geometry { srid: repr.srid },
            "Geography" => Self::Geography {
                srid: repr.srid.unwrap_or(DEFAULT_GEOGRAPHY_SRID),
            },
            "Enum" => Self::Enum {
                name: repr.name.ok_or_else(|| SchemaError::InvalidTypeParams {
                    kind: kind.clone(),
                    reason: "missing required field 'name'".to_string(),
                })?,
                values: repr.values.ok_or_else(|| SchemaError::InvalidTypeParams {
                    kind: kind.clone(),
                    reason: "missing required field 'values'".to_string(),
                })?,
            },
            _ => return Err(SchemaError::UnknownTypeKind { kind }),
        };
        ty.check_params()?;
        Ok(ty)
    }
}

/// Every variant, with representative parameters. Used by exhaustiveness
/// tests in the dialect translators.
#[must_use]
pub fn all_variants() -> Vec<PortableType> {
    vec![
        PortableType::TinyInt,
        PortableType::SmallInt,
        PortableType::Int,
        PortableType::BigInt,
        PortableType::Decimal {
            precision: 18,
            scale: 2,
        },
        PortableType::Money,
        PortableType::SmallMoney,
        PortableType::Float,
        PortableType::Double,
        PortableType::Char { length: 10 },
        PortableType::VarChar { max_length: 255 },
        PortableType::NChar { length: 10 },
        PortableType::NVarChar { max_length: 255 },
        PortableType::NVarChar {
            max_length: MAX_LENGTH,
        },
        PortableType::Text,
        PortableType::Binary { length: 16 },
        PortableType::VarBinary { max_length: 64 },
        PortableType::VarBinary {
            max_length: MAX_LENGTH,
        },
        PortableType::Blob,
        PortableType::Date,
        PortableType::Time { precision: 3 },
        PortableType::DateTime { precision: 6 },
        PortableType::DateTimeOffset,
        PortableType::RowVersion,
        PortableType::Uuid,
        PortableType::Boolean,
        PortableType::Json,
        PortableType::Xml,
        PortableType::Geometry { srid: None },
        PortableType::Geometry { srid: Some(3857) },
        PortableType::Geography {
            srid: DEFAULT_GEOGRAPHY_SRID,
        },
        PortableType::Enum {
            name: "mood".to_string(),
            values: vec!["happy".to_string(), "sad".to_string()],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_round_trip() {
        for ty in all_variants() {
            let json = serde_json::to_string(&ty).unwrap();
            let back: PortableType = serde_json::from_str(&json).unwrap();
            assert_eq!(ty, back, "round trip failed for {json}");
        }
    }

    #[test]
    fn test_tagged_shape() {
        let json = serde_json::to_value(PortableType::Decimal {
            precision: 18,
            scale: 2,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "Decimal", "precision": 18, "scale": 2 })
        );

        let json = serde_json::to_value(PortableType::VarChar { max_length: 255 }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "VarChar", "maxLength": 255 })
        );
    }

    #[test]
    fn test_max_sentinel_omitted() {
        let json = serde_json::to_value(PortableType::NVarChar {
            max_length: MAX_LENGTH,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "NVarChar" }));

        let back: PortableType = serde_json::from_value(json).unwrap();
        assert_eq!(
            back,
            PortableType::NVarChar {
                max_length: MAX_LENGTH
            }
        );
    }

    #[test]
    fn test_compact_form_accepted() {
        let ty: PortableType = serde_json::from_str("\"Decimal(18,2)\"").unwrap();
        assert_eq!(
            ty,
            PortableType::Decimal {
                precision: 18,
                scale: 2
            }
        );

        let ty: PortableType = serde_json::from_str("\"NVarChar(MAX)\"").unwrap();
        assert_eq!(
            ty,
            PortableType::NVarChar {
                max_length: MAX_LENGTH
            }
        );

        let ty: PortableType = serde_json::from_str("\"uuid\"").unwrap();
        assert_eq!(ty, PortableType::Uuid);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = serde_json::from_str::<PortableType>("{\"kind\": \"Fancy\"}");
        assert!(err.is_err());
        let err = serde_json::from_str::<PortableType>("\"Fancy(3)\"");
        assert!(err.is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err =
            serde_json::from_str::<PortableType>("{\"kind\": \"Int\", \"width\": 4}");
        assert!(err.is_err());
    }

    #[test]
    fn test_extraneous_params_rejected() {
        let err = serde_json::from_str::<PortableType>("{\"kind\": \"Int\", \"length\": 4}");
        assert!(err.is_err());
    }

    #[test]
    fn test_decimal_ranges() {
        assert!("Decimal(0,0)".parse::<PortableType>().is_err());
        assert!("Decimal(39,0)".parse::<PortableType>().is_err());
        assert!("Decimal(10,11)".parse::<PortableType>().is_err());
        assert!("Decimal(38,38)".parse::<PortableType>().is_ok());
    }

    #[test]
    fn test_geography_default_srid() {
        let ty: PortableType = "Geography".parse().unwrap();
        assert_eq!(
            ty,
            PortableType::Geography {
                srid: DEFAULT_GEOGRAPHY_SRID
            }
        );
    }

    #[test]
    fn test_display_compact() {
        assert_eq!(
            PortableType::Decimal {
                precision: 18,
                scale: 2
            }
            .to_string(),
            "Decimal(18,2)"
        );
        assert_eq!(
            PortableType::NVarChar {
                max_length: MAX_LENGTH
            }
            .to_string(),
            "NVarChar(MAX)"
        );
        assert_eq!(PortableType::Uuid.to_string(), "Uuid");
    }

    #[test]
    fn test_is_integer() {
        assert!(PortableType::BigInt.is_integer());
        assert!(!PortableType::Uuid.is_integer());
        assert!(!PortableType::Boolean.is_integer());
    }
}
