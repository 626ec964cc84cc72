//! Mapping a struct's fields onto 32-bit words.
//!
//! A [`Layout`] is computed once per struct and shared by all emitters: the byte
//! length, which fields touch which word, and which bits of each word are claimed.

use std::collections::BTreeMap;

use crate::{
    errors::LayoutError,
    field::{Field, FieldType},
    schema::{Group, Schema},
};

/// Bits in a word.
pub const WORD_BITS: u32 = 32;

/// Word assignment of one struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Length in bytes, always a multiple of 4.
    pub length: usize,
    /// Field indices touching each word, in declaration order.
    words: BTreeMap<usize, Vec<usize>>,
}

impl Layout {
    /// Computes and validates the layout of `group`.
    ///
    /// `schema` is consulted for the lengths of embedded structs.
    pub fn compute(group: &Group, schema: &Schema) -> Result<Layout, LayoutError> {
        let length = group_length(group)?;

        for (i, field) in group.fields.iter().enumerate() {
            if let Some(other) = group.fields[i + 1..].iter().find(|o| field.overlaps(o)) {
                return Err(LayoutError::Overlap {
                    name: group.name.clone(),
                    first: field.label.clone(),
                    second: other.label.clone(),
                });
            }
            check_placement(group, field, schema)?;
        }

        let mut words: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (index, field) in group.fields.iter().enumerate() {
            for word in field.first_word()..=field.last_word() {
                words.entry(word).or_default().push(index);
            }
        }

        Ok(Layout { length, words })
    }

    pub fn word_count(&self) -> usize {
        self.length / 4
    }

    /// Indices of the fields touching `word`; empty for a must-be-zero word.
    pub fn fields_in_word(&self, word: usize) -> &[usize] {
        self.words.get(&word).map_or(&[], Vec::as_slice)
    }

    /// Union of the bits of `word` claimed by any field.
    pub fn claimed_mask(&self, group: &Group, word: usize) -> u32 {
        self.fields_in_word(word)
            .iter()
            .map(|&i| mask_for_word(word, group.fields[i].start, group.fields[i].end))
            .fold(0, |acc, mask| acc | mask)
    }
}

/// Smallest whole number of words holding every field, in bytes.
pub fn minimal_length(group: &Group) -> usize {
    group
        .fields
        .iter()
        .map(|f| f.end as usize / 8 + 1)
        .max()
        .map_or(0, |bytes| bytes.next_multiple_of(4))
}

/// Declared length if there is one, validated against the fields, else the minimal length.
pub fn group_length(group: &Group) -> Result<usize, LayoutError> {
    let required = minimal_length(group);

    match group.declared_length {
        Some(declared) if declared < required || declared % 4 != 0 => {
            Err(LayoutError::LengthTooSmall {
                name: group.name.clone(),
                declared,
                required,
            })
        }
        Some(declared) => Ok(declared),
        None => Ok(required),
    }
}

/// Bits of word `index` covered by the inclusive range `start..=end`, clipped to the word.
pub fn mask_for_word(index: usize, start: u32, end: u32) -> u32 {
    let base = index as i64 * WORD_BITS as i64;
    let lo = (start as i64 - base).max(0);
    let hi = (end as i64 - base).min(WORD_BITS as i64 - 1);

    if lo > hi {
        return 0;
    }

    let count = (hi - lo + 1) as u32;
    let ones = if count == WORD_BITS {
        u32::MAX
    } else {
        (1u32 << count) - 1
    };
    ones << lo
}

fn check_placement(group: &Group, field: &Field, schema: &Schema) -> Result<(), LayoutError> {
    match &field.ty {
        FieldType::Float if field.start % WORD_BITS != 0 || field.width() != WORD_BITS => {
            Err(LayoutError::FloatPlacement {
                name: group.name.clone(),
                field: field.label.clone(),
            })
        }
        FieldType::Padded if field.width() != 8 => Err(LayoutError::PaddedWidth {
            name: group.name.clone(),
            field: field.label.clone(),
            width: field.width(),
        }),
        FieldType::Struct(type_name) => {
            if field.start % WORD_BITS != 0 {
                return Err(LayoutError::UnalignedStruct {
                    name: group.name.clone(),
                    field: field.label.clone(),
                });
            }

            let expected = match schema.group(type_name) {
                Some(inner) => group_length(inner)? as u32 * 8,
                None => 0,
            };
            if field.width() != expected {
                return Err(LayoutError::StructSize {
                    name: group.name.clone(),
                    field: field.label.clone(),
                    type_name: type_name.clone(),
                    width: field.width(),
                    expected,
                });
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Rejects structs that embed themselves, directly or through other structs.
pub fn check_embedding(schema: &Schema) -> Result<(), LayoutError> {
    fn visit<'a>(
        schema: &'a Schema,
        group: &'a Group,
        path: &mut Vec<&'a str>,
    ) -> Result<(), LayoutError> {
        if path.contains(&group.name.as_str()) {
            return Err(LayoutError::RecursiveEmbedding {
                name: group.name.clone(),
            });
        }

        path.push(&group.name);
        for field in &group.fields {
            if let FieldType::Struct(name) = &field.ty {
                if let Some(inner) = schema.group(name) {
                    visit(schema, inner, path)?;
                }
            }
        }
        path.pop();

        Ok(())
    }

    for group in schema.structs() {
        visit(schema, group, &mut Vec::new())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(fields: Vec<Field>) -> Group {
        let mut group = Group::new("Test");
        group.fields = fields;
        group
    }

    #[test]
    fn test_minimal_length_rounds_to_words() {
        let g = group(vec![Field::new("a", 32, 8, FieldType::Uint)]);
        assert_eq!(minimal_length(&g), 8);

        let g = group(vec![
            Field::new("a", 0, 1, FieldType::Bool),
            Field::new("b", 1, 8, FieldType::Uint),
        ]);
        assert_eq!(minimal_length(&g), 4);

        assert_eq!(minimal_length(&group(vec![])), 0);
    }

    #[test]
    fn test_declared_length() {
        let mut g = group(vec![Field::new("a", 0, 40, FieldType::Uint)]);
        g.declared_length = Some(16);
        assert_eq!(group_length(&g), Ok(16));

        g.declared_length = Some(4);
        assert_eq!(
            group_length(&g),
            Err(LayoutError::LengthTooSmall {
                name: "Test".to_string(),
                declared: 4,
                required: 8
            })
        );
    }

    #[test]
    fn test_words_and_masks() {
        let g = group(vec![
            Field::new("a", 0, 4, FieldType::Uint),
            Field::new("addr", 16, 64, FieldType::Address),
            Field::new("c", 96, 8, FieldType::Uint),
        ]);
        let layout = Layout::compute(&g, &Schema::new()).unwrap();

        assert_eq!(layout.length, 16);
        assert_eq!(layout.word_count(), 4);
        assert_eq!(layout.fields_in_word(0), &[0, 1]);
        assert_eq!(layout.fields_in_word(1), &[1]);
        assert_eq!(layout.fields_in_word(2), &[1]);
        assert_eq!(layout.fields_in_word(3), &[2]);

        assert_eq!(layout.claimed_mask(&g, 0), 0xffff_000f);
        assert_eq!(layout.claimed_mask(&g, 1), 0xffff_ffff);
        assert_eq!(layout.claimed_mask(&g, 2), 0x0000_ffff);
        assert_eq!(layout.claimed_mask(&g, 3), 0x0000_00ff);
    }

    #[test]
    fn test_mask_for_word() {
        assert_eq!(mask_for_word(0, 0, 31), u32::MAX);
        assert_eq!(mask_for_word(1, 0, 31), 0);
        assert_eq!(mask_for_word(1, 40, 47), 0x0000_ff00);
        assert_eq!(mask_for_word(0, 31, 31), 0x8000_0000);
    }

    #[test]
    fn test_overlap_rejected() {
        let g = group(vec![
            Field::new("a", 0, 8, FieldType::Uint),
            Field::new("b", 4, 8, FieldType::Uint),
        ]);
        assert_eq!(
            Layout::compute(&g, &Schema::new()),
            Err(LayoutError::Overlap {
                name: "Test".to_string(),
                first: "a".to_string(),
                second: "b".to_string()
            })
        );
    }

    #[test]
    fn test_float_and_padded_placement() {
        let g = group(vec![Field::new("f", 8, 32, FieldType::Float)]);
        assert!(matches!(
            Layout::compute(&g, &Schema::new()),
            Err(LayoutError::FloatPlacement { .. })
        ));

        let g = group(vec![Field::new("p", 0, 6, FieldType::Padded)]);
        assert!(matches!(
            Layout::compute(&g, &Schema::new()),
            Err(LayoutError::PaddedWidth { width: 6, .. })
        ));
    }

    #[test]
    fn test_embedded_struct_checks() {
        let mut schema = Schema::new();
        let mut inner = Group::new("Inner");
        inner.declared_length = Some(8);
        schema.add_struct(inner).unwrap();

        let ty = FieldType::Struct("Inner".to_string());
        let ok = group(vec![Field::new("inner", 32, 64, ty.clone())]);
        assert_eq!(Layout::compute(&ok, &schema).unwrap().length, 12);

        let unaligned = group(vec![Field::new("inner", 8, 64, ty.clone())]);
        assert!(matches!(
            Layout::compute(&unaligned, &schema),
            Err(LayoutError::UnalignedStruct { .. })
        ));

        let short = group(vec![Field::new("inner", 0, 32, ty)]);
        assert!(matches!(
            Layout::compute(&short, &schema),
            Err(LayoutError::StructSize { expected: 64, .. })
        ));
    }

    #[test]
    fn test_recursive_embedding() {
        let mut schema = Schema::new();
        let mut a = Group::new("A");
        a.fields.push(Field::new("b", 0, 32, FieldType::Struct("B".to_string())));
        let mut b = Group::new("B");
        b.fields.push(Field::new("a", 0, 32, FieldType::Struct("A".to_string())));
        schema.add_struct(a).unwrap();
        schema.add_struct(b).unwrap();

        assert!(matches!(
            check_embedding(&schema),
            Err(LayoutError::RecursiveEmbedding { .. })
        ));
    }
}
