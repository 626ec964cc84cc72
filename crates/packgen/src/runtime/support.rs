use std::fmt;
use std::io::{self, Write};

/// Name printed for an enum value no member is declared with.
pub const INVALID_ENUM: &str = "XXX: INVALID";

/// A value that cannot be packed into its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackError {
    /// Unsigned value has bits above the field width.
    UintOutOfRange {
        field: &'static str,
        value: u64,
        width: u32,
    },
    /// Signed value is outside the two's complement range of the field width.
    SintOutOfRange {
        field: &'static str,
        value: i64,
        width: u32,
    },
    /// Value is not `(2 * odd + 1) << shift` with `odd <= 7` and `shift <= 31`.
    NotPadded { field: &'static str, value: u64 },
    /// A `shr` field was given a value with some of the shifted-out bits set.
    ShrLowBits {
        field: &'static str,
        value: i128,
        shift: u32,
    },
    /// A `minus` field was given a value below the subtracted constant.
    MinusUnderflow {
        field: &'static str,
        value: i128,
        minus: i128,
    },
    /// Output buffer is shorter than the descriptor.
    BufferTooSmall { needed: usize, got: usize },
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackError::UintOutOfRange {
                field,
                value,
                width,
            } => write!(f, "{field}: {value} does not fit in {width} unsigned bits"),
            PackError::SintOutOfRange {
                field,
                value,
                width,
            } => write!(f, "{field}: {value} does not fit in {width} signed bits"),
            PackError::NotPadded { field, value } => {
                write!(f, "{field}: {value} has no padded encoding")
            }
            PackError::ShrLowBits {
                field,
                value,
                shift,
            } => write!(f, "{field}: {value} has non-zero bits below bit {shift}"),
            PackError::MinusUnderflow {
                field,
                value,
                minus,
            } => write!(f, "{field}: {value} is smaller than {minus}"),
            PackError::BufferTooSmall { needed, got } => {
                write!(f, "buffer of {got} bytes cannot hold {needed}")
            }
        }
    }
}

impl std::error::Error for PackError {}

/// Something odd noticed while unpacking. Unpacking carries on regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpackWarning {
    /// Bits set in `word` that no field claims. `word` counts from the start of
    /// the outermost unpacked buffer.
    ResidualBits { word: usize, bits: u32 },
}

impl fmt::Display for UnpackWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnpackWarning::ResidualBits { word, bits } => {
                write!(f, "XXX: Invalid field unpacked at word {word} (0x{bits:08x})")
            }
        }
    }
}

/// An unpacked value with whatever was noticed on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Unpacked<T> {
    pub value: T,
    pub warnings: Vec<UnpackWarning>,
}

impl<T> Unpacked<T> {
    /// True when the input had no unclaimed bits set.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

const fn low_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Reads little-endian word `index`.
#[inline]
pub fn read_word(cl: &[u8], index: usize) -> u32 {
    let at = index * 4;
    u32::from_le_bytes([cl[at], cl[at + 1], cl[at + 2], cl[at + 3]])
}

/// Writes little-endian word `index`.
#[inline]
pub fn write_word(cl: &mut [u8], index: usize, word: u32) {
    let at = index * 4;
    cl[at..at + 4].copy_from_slice(&word.to_le_bytes());
}

/// Places the low `end - start + 1` bits of `value` at bit `start` of a run of
/// words. Callers shift the result right by 32 per word to get at later words.
#[inline]
pub const fn pack_uint(value: u64, start: u32, end: u32) -> u128 {
    ((value & low_mask(end - start + 1)) as u128) << start
}

/// Two's complement form of [`pack_uint`].
#[inline]
pub const fn pack_sint(value: i64, start: u32, end: u32) -> u128 {
    pack_uint(value as u64, start, end)
}

/// Places the 8-bit padded code of `value` at bit `start`.
///
/// A value without a padded encoding packs as zero; `check_padded` catches it
/// beforehand.
#[inline]
pub fn pack_padded(value: u64, start: u32, end: u32) -> u128 {
    pack_uint(u64::from(encode_padded(value).unwrap_or(0)), start, end)
}

/// Extracts bits `start..=end` of `cl` as an unsigned value. The range may cross
/// byte and word boundaries but is at most 64 bits wide.
pub fn unpack_uint(cl: &[u8], start: u32, end: u32) -> u64 {
    let first = (start / 8) as usize;
    let last = (end / 8) as usize;

    let mut acc = 0u128;
    for (i, byte) in cl[first..=last].iter().enumerate() {
        acc |= u128::from(*byte) << (8 * i);
    }

    (acc >> (start % 8)) as u64 & low_mask(end - start + 1)
}

/// Extracts bits `start..=end` of `cl` and sign-extends them.
pub fn unpack_sint(cl: &[u8], start: u32, end: u32) -> i64 {
    let shift = 64 - (end - start + 1);
    ((unpack_uint(cl, start, end) << shift) as i64) >> shift
}

/// Extracts the 8-bit padded code at `start..=end` and decodes it.
pub fn unpack_padded(cl: &[u8], start: u32, end: u32) -> u64 {
    decode_padded(unpack_uint(cl, start, end) as u8)
}

/// Extracts the whole word starting at bit `start` as an IEEE-754 single.
pub fn unpack_float(cl: &[u8], start: u32) -> f32 {
    f32::from_bits(unpack_uint(cl, start, start + 31) as u32)
}

/// Encodes `(2 * odd + 1) << shift` as `shift | odd << 5`.
pub fn encode_padded(value: u64) -> Option<u8> {
    if value == 0 {
        return None;
    }

    let shift = value.trailing_zeros();
    let odd = (value >> shift) >> 1;
    if shift > 31 || odd > 7 {
        return None;
    }

    Some(shift as u8 | (odd as u8) << 5)
}

/// Inverse of [`encode_padded`]. Every code decodes to some value.
pub fn decode_padded(code: u8) -> u64 {
    let shift = u32::from(code & 0x1f);
    let odd = u64::from(code >> 5);
    (2 * odd + 1) << shift
}

/// Checks that `value` fits in `width` unsigned bits.
pub fn check_uint(field: &'static str, value: u64, width: u32) -> Result<(), PackError> {
    if value & !low_mask(width) != 0 {
        return Err(PackError::UintOutOfRange {
            field,
            value,
            width,
        });
    }
    Ok(())
}

/// Checks that `value` fits in `width` two's complement bits.
pub fn check_sint(field: &'static str, value: i64, width: u32) -> Result<(), PackError> {
    let min = -(1i128 << (width - 1));
    let max = (1i128 << (width - 1)) - 1;
    if !(min..=max).contains(&i128::from(value)) {
        return Err(PackError::SintOutOfRange {
            field,
            value,
            width,
        });
    }
    Ok(())
}

pub fn check_padded(field: &'static str, value: u64) -> Result<(), PackError> {
    match encode_padded(value) {
        Some(_) => Ok(()),
        None => Err(PackError::NotPadded { field, value }),
    }
}

/// Checks that shifting `value` right by `shift` loses nothing.
pub fn check_shr(field: &'static str, value: i128, shift: u32) -> Result<(), PackError> {
    if value & ((1i128 << shift) - 1) != 0 {
        return Err(PackError::ShrLowBits {
            field,
            value,
            shift,
        });
    }
    Ok(())
}

/// Checks that subtracting `minus` from `value` does not go below zero.
pub fn check_minus(field: &'static str, value: i128, minus: i128) -> Result<(), PackError> {
    if value < minus {
        return Err(PackError::MinusUnderflow {
            field,
            value,
            minus,
        });
    }
    Ok(())
}

/// Records a warning when word `index` has bits set outside `claimed`.
pub fn check_residual(
    cl: &[u8],
    index: usize,
    claimed: u32,
    base_word: usize,
    warnings: &mut Vec<UnpackWarning>,
) {
    let bits = read_word(cl, index) & !claimed;
    if bits != 0 {
        warnings.push(UnpackWarning::ResidualBits {
            word: base_word + index,
            bits,
        });
    }
}

/// Prints one `label: value` line.
pub fn write_field(
    fp: &mut dyn Write,
    indent: usize,
    label: &str,
    value: fmt::Arguments<'_>,
) -> io::Result<()> {
    writeln!(fp, "{:indent$}{}: {}", "", label, value, indent = indent)
}

/// Prints the `label:` line an embedded struct is printed under.
pub fn write_heading(fp: &mut dyn Write, indent: usize, label: &str) -> io::Result<()> {
    writeln!(fp, "{:indent$}{}:", "", label, indent = indent)
}
