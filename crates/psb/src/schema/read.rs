//! Read-side object maps: field descriptors and the object traversal
//! that drives a [`Reader`] through a declared field list.

use std::slice;

use crate::error::DecodeError;
use crate::reader::Reader;
use crate::schema::{read_array_into, read_blob_into, ArrayConstraint, BlobElement, ReadBytes,
    VariantSchema};

/// One declared field of an object map.
///
/// A descriptor can span several wire names (a variant group exposes
/// one per alternative); `read_value` receives which of them matched.
pub trait ReadField {
    fn names(&self) -> &[&'static str];

    fn is_required(&self) -> bool;

    /// Decodes the matched value into the binding.
    fn read_value(&mut self, alternative: usize, source: &mut Reader)
        -> Result<(), DecodeError>;

    /// Applies the absent-field action when the field never appeared.
    /// Only called for non-required descriptors.
    fn reset_omitted(&mut self) -> Result<(), DecodeError>;
}

/// Reads one object through its declared field list.
///
/// Unknown wire fields are skipped; duplicates and second variant
/// alternatives fail with `schema:invalid_key`; required fields left
/// unread fail with `schema:missing_key` naming every missing field;
/// optional fields left unread are reset. Errors from field values are
/// wrapped with the field name.
pub fn object(source: &mut Reader, fields: &mut [&mut dyn ReadField]) -> Result<(), DecodeError> {
    let mut state = source.start_object()?;

    let mut map: Vec<&'static str> = Vec::new();
    let mut spans: Vec<(usize, usize)> = Vec::with_capacity(fields.len());
    for field in fields.iter() {
        let names = field.names();
        spans.push((map.len(), names.len()));
        map.extend_from_slice(names);
    }

    let mut seen = vec![false; fields.len()];
    let mut required = fields.iter().filter(|f| f.is_required()).count();

    while let Some(index) = source.key(&map, &mut state)? {
        let mut field_idx = 0;
        let mut alternative = index;
        for (i, &(start, len)) in spans.iter().enumerate() {
            if index < start + len {
                field_idx = i;
                alternative = index - start;
                break;
            }
        }

        if seen[field_idx] {
            return Err(DecodeError::InvalidKey {
                field: map[index],
                reason: "duplicate",
            });
        }
        fields[field_idx]
            .read_value(alternative, source)
            .map_err(|e| e.for_field(map[index]))?;
        seen[field_idx] = true;
        if fields[field_idx].is_required() {
            required -= 1;
        }
    }

    if required != 0 {
        let mut missing = Vec::new();
        for (field, was_read) in fields.iter().zip(&seen) {
            if field.is_required() && !*was_read {
                missing.extend_from_slice(field.names());
            }
        }
        return Err(DecodeError::MissingKey { fields: missing });
    }

    for (field, was_read) in fields.iter_mut().zip(&seen) {
        if !*was_read {
            field.reset_omitted()?;
        }
    }

    source.end_object();
    Ok(())
}

// =============================================================================
// FIELD WRAPPERS
// =============================================================================

/// Required field bound to a plain value.
pub struct Field<'a, T> {
    name: &'static str,
    value: &'a mut T,
}

/// Binds `name` to a required value.
pub fn field<'a, T: ReadBytes>(name: &'static str, value: &'a mut T) -> Field<'a, T> {
    Field { name, value }
}

impl<T: ReadBytes> ReadField for Field<'_, T> {
    fn names(&self) -> &[&'static str] {
        slice::from_ref(&self.name)
    }

    fn is_required(&self) -> bool {
        true
    }

    fn read_value(
        &mut self,
        _alternative: usize,
        source: &mut Reader,
    ) -> Result<(), DecodeError> {
        *self.value = T::read_bytes(source)?;
        Ok(())
    }

    fn reset_omitted(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }
}

/// Optional field; absence leaves the binding `None`.
pub struct OptionalField<'a, T> {
    name: &'static str,
    value: &'a mut Option<T>,
}

/// Binds `name` to an optional value.
pub fn optional<'a, T: ReadBytes>(
    name: &'static str,
    value: &'a mut Option<T>,
) -> OptionalField<'a, T> {
    OptionalField { name, value }
}

impl<T: ReadBytes> ReadField for OptionalField<'_, T> {
    fn names(&self) -> &[&'static str] {
        slice::from_ref(&self.name)
    }

    fn is_required(&self) -> bool {
        false
    }

    fn read_value(
        &mut self,
        _alternative: usize,
        source: &mut Reader,
    ) -> Result<(), DecodeError> {
        *self.value = Some(T::read_bytes(source)?);
        Ok(())
    }

    fn reset_omitted(&mut self) -> Result<(), DecodeError> {
        *self.value = None;
        Ok(())
    }
}

/// Field with a default; absence assigns the default value.
pub struct DefaultedField<'a, T> {
    name: &'static str,
    value: &'a mut T,
    default: T,
}

/// Binds `name` to a value that falls back to `default` when absent.
pub fn defaulted<'a, T: ReadBytes + Clone>(
    name: &'static str,
    value: &'a mut T,
    default: T,
) -> DefaultedField<'a, T> {
    DefaultedField {
        name,
        value,
        default,
    }
}

impl<T: ReadBytes + Clone> ReadField for DefaultedField<'_, T> {
    fn names(&self) -> &[&'static str] {
        slice::from_ref(&self.name)
    }

    fn is_required(&self) -> bool {
        false
    }

    fn read_value(
        &mut self,
        _alternative: usize,
        source: &mut Reader,
    ) -> Result<(), DecodeError> {
        *self.value = T::read_bytes(source)?;
        Ok(())
    }

    fn reset_omitted(&mut self) -> Result<(), DecodeError> {
        *self.value = self.default.clone();
        Ok(())
    }
}

/// Array field with a read constraint. Absent arrays are cleared
/// unless [`ArrayField::required`] was requested.
pub struct ArrayField<'a, T> {
    name: &'static str,
    value: &'a mut Vec<T>,
    constraint: ArrayConstraint,
    required: bool,
}

/// Binds `name` to an array with historically-optional semantics:
/// an absent field decodes as an empty vector.
pub fn array<'a, T: ReadBytes>(
    name: &'static str,
    value: &'a mut Vec<T>,
    constraint: ArrayConstraint,
) -> ArrayField<'a, T> {
    ArrayField {
        name,
        value,
        constraint,
        required: false,
    }
}

impl<T> ArrayField<'_, T> {
    /// Makes absence a `schema:missing_key` error instead of an empty
    /// vector.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl<T: ReadBytes> ReadField for ArrayField<'_, T> {
    fn names(&self) -> &[&'static str] {
        slice::from_ref(&self.name)
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn read_value(
        &mut self,
        _alternative: usize,
        source: &mut Reader,
    ) -> Result<(), DecodeError> {
        read_array_into(
            source,
            self.value,
            self.constraint.min_element_size(),
            self.constraint.max_element_count(),
        )
    }

    fn reset_omitted(&mut self) -> Result<(), DecodeError> {
        self.value.clear();
        Ok(())
    }
}

/// Required field whose fixed-width elements travel as one binary
/// string instead of a tagged array.
pub struct BlobArrayField<'a, T> {
    name: &'static str,
    value: &'a mut Vec<T>,
}

/// Binds `name` to a blob-encoded sequence of fixed-width elements.
pub fn array_as_blob<'a, T: BlobElement>(
    name: &'static str,
    value: &'a mut Vec<T>,
) -> BlobArrayField<'a, T> {
    BlobArrayField { name, value }
}

impl<T: BlobElement> ReadField for BlobArrayField<'_, T> {
    fn names(&self) -> &[&'static str] {
        slice::from_ref(&self.name)
    }

    fn is_required(&self) -> bool {
        true
    }

    fn read_value(
        &mut self,
        _alternative: usize,
        source: &mut Reader,
    ) -> Result<(), DecodeError> {
        read_blob_into(source, self.value)
    }

    fn reset_omitted(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }
}

/// Variant group: one descriptor exposing a wire name per alternative
/// of a sum type. Exactly one alternative must appear; a second match
/// for the group is a duplicate.
pub struct VariantField<'a, V> {
    value: &'a mut V,
}

/// Binds a variant group to its sum-typed value.
pub fn variant<V: VariantSchema>(value: &mut V) -> VariantField<'_, V> {
    VariantField { value }
}

impl<V: VariantSchema> ReadField for VariantField<'_, V> {
    fn names(&self) -> &[&'static str] {
        V::OPTIONS
    }

    fn is_required(&self) -> bool {
        true
    }

    fn read_value(
        &mut self,
        alternative: usize,
        source: &mut Reader,
    ) -> Result<(), DecodeError> {
        *self.value = V::read_option(alternative, source)?;
        Ok(())
    }

    fn reset_omitted(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }
}
