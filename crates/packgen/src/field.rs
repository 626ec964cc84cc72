//! Definition of the fields a [crate::schema::Group] is made of.

use crate::errors::SchemaError;
use crate::names;

/// How the bits of a field are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Uint,
    Int,
    Bool,
    /// IEEE-754 single, always a whole word.
    Float,
    /// GPU address; unsigned, held as 64 bits.
    Address,
    /// 8-bit `shift | odd << 5` code for values `(2 * odd + 1) << shift`.
    Padded,
    /// Numeric value of a declared enum, by schema name.
    Enum(String),
    /// Another struct packed in place, by schema name.
    Struct(String),
}

impl FieldType {
    /// Resolves the primitive keywords. Enum and struct names are resolved by the builder.
    pub fn primitive(name: &str) -> Option<Self> {
        match name {
            "uint" => Some(FieldType::Uint),
            "int" => Some(FieldType::Int),
            "bool" => Some(FieldType::Bool),
            "float" => Some(FieldType::Float),
            "address" => Some(FieldType::Address),
            "padded" => Some(FieldType::Padded),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FieldType::Uint => "uint",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::Float => "float",
            FieldType::Address => "address",
            FieldType::Padded => "padded",
            FieldType::Enum(name) | FieldType::Struct(name) => name,
        }
    }

    /// True for types encoded as a plain unsigned bit range.
    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            FieldType::Uint | FieldType::Address | FieldType::Bool | FieldType::Enum(_)
        )
    }
}

/// Lossless transform applied before encoding and reversed after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// Stored value is `value >> n`; the low `n` bits must be zero.
    Shr(u32),
    /// Stored value is `value - k`; the value must be at least `k`.
    Minus(u64),
}

impl Modifier {
    /// Parses `shr(n)` or `minus(k)`.
    pub fn parse(field: &str, text: &str) -> Result<Self, SchemaError> {
        let invalid = || SchemaError::InvalidModifier {
            field: field.to_string(),
            modifier: text.to_string(),
        };

        let (name, rest) = text.split_once('(').ok_or_else(invalid)?;
        let arg = rest.strip_suffix(')').ok_or_else(invalid)?;
        let arg = parse_int(arg).map_err(|_| invalid())?;

        match name {
            "shr" => u32::try_from(arg)
                .ok()
                .filter(|n| *n < 64)
                .map(Modifier::Shr)
                .ok_or_else(invalid),
            "minus" => u64::try_from(arg).map(Modifier::Minus).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

/// A named integer, either an enum member or a field-local constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub name: String,
    pub value: i64,
}

/// Initial value of a field in the struct's default initializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldDefault {
    /// Literal taken from the document, checked against the field type on emission.
    Literal(String),
    /// Constant naming an enum member.
    EnumMember(String),
}

/// A single named field occupying the inclusive bit range `start..=end` of its group.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Rust identifier of the field in the value-holder struct.
    pub name: String,
    /// Name as written in the document; used when printing.
    pub label: String,
    pub start: u32,
    pub end: u32,
    pub ty: FieldType,
    /// Prefix for the constants generated from [`Field::values`].
    pub prefix: Option<String>,
    /// The field always holds this value and is not part of the value holder.
    pub exact: Option<i64>,
    pub default: Option<FieldDefault>,
    pub modifier: Option<Modifier>,
    /// Field-local named values.
    pub values: Vec<Value>,
}

impl Field {
    /// Creates a field with no optional attributes.
    pub fn new(label: &str, start: u32, width: u32, ty: FieldType) -> Self {
        Field {
            name: names::field_ident(label),
            label: label.to_string(),
            start,
            end: start + width - 1,
            ty,
            prefix: None,
            exact: None,
            default: None,
            modifier: None,
            values: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Index of the first 32-bit word the field touches.
    pub fn first_word(&self) -> usize {
        (self.start / 32) as usize
    }

    /// Index of the last 32-bit word the field touches.
    pub fn last_word(&self) -> usize {
        (self.end / 32) as usize
    }

    /// Two distinct fields overlap when their inclusive ranges intersect.
    pub fn overlaps(&self, other: &Field) -> bool {
        !std::ptr::eq(self, other) && self.start.max(other.start) <= self.end.min(other.end)
    }
}

/// Parses a decimal or `0x` hexadecimal literal, with an optional leading `-`.
///
/// A decimal literal with a leading zero is rejected so that octal-looking numbers
/// are not silently read as decimal.
pub fn parse_int(text: &str) -> Result<i64, SchemaError> {
    let invalid = || SchemaError::InvalidInteger {
        literal: text.to_string(),
    };

    let trimmed = text.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).map_err(|_| invalid())?
    } else {
        if digits.len() > 1 && digits.starts_with('0') {
            return Err(invalid());
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        digits.parse::<i64>().map_err(|_| invalid())?
    };

    Ok(if negative { -magnitude } else { magnitude })
}

/// Parses a field start: a plain bit number or `word:bit`, meaning `word * 32 + bit`.
pub fn parse_start(text: &str) -> Result<u32, SchemaError> {
    let invalid = || SchemaError::InvalidStart {
        literal: text.to_string(),
    };

    let to_u32 = |s: &str| {
        parse_int(s)
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(invalid)
    };

    match text.split_once(':') {
        Some((word, bit)) => {
            let word = to_u32(word)?;
            let bit = to_u32(bit)?;
            word.checked_mul(32)
                .and_then(|w| w.checked_add(bit))
                .ok_or_else(invalid)
        }
        None => to_u32(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("0"), Ok(0));
        assert_eq!(parse_int("42"), Ok(42));
        assert_eq!(parse_int("0x1F"), Ok(31));
        assert_eq!(parse_int("-8"), Ok(-8));
        assert!(parse_int("010").is_err());
        assert!(parse_int("1.5").is_err());
        assert!(parse_int("").is_err());
        assert!(parse_int("+3").is_err());
    }

    #[test]
    fn test_parse_start() {
        assert_eq!(parse_start("40"), Ok(40));
        assert_eq!(parse_start("2:5"), Ok(69));
        assert_eq!(parse_start("0:0"), Ok(0));
        assert!(parse_start("2:").is_err());
        assert!(parse_start("-1").is_err());
    }

    #[test]
    fn test_parse_modifier() {
        assert_eq!(Modifier::parse("f", "shr(4)"), Ok(Modifier::Shr(4)));
        assert_eq!(Modifier::parse("f", "minus(1)"), Ok(Modifier::Minus(1)));
        assert_eq!(Modifier::parse("f", "minus(0x10)"), Ok(Modifier::Minus(16)));
        assert!(Modifier::parse("f", "shl(2)").is_err());
        assert!(Modifier::parse("f", "shr 2").is_err());
        assert!(Modifier::parse("f", "shr(2").is_err());
        assert!(Modifier::parse("f", "minus(-1)").is_err());
    }

    #[test]
    fn test_overlaps() {
        let a = Field::new("a", 0, 8, FieldType::Uint);
        let b = Field::new("b", 7, 2, FieldType::Uint);
        let c = Field::new("c", 8, 8, FieldType::Uint);

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&c));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&a));
    }

    #[test]
    fn test_words() {
        let field = Field::new("addr", 16, 64, FieldType::Address);
        assert_eq!(field.end, 79);
        assert_eq!(field.first_word(), 0);
        assert_eq!(field.last_word(), 2);
    }
}
