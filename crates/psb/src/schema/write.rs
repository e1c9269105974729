//! Write-side object maps: field descriptors and the object traversal
//! that emits a declared field list through a [`Writer`].

use crate::error::EncodeError;
use crate::schema::{write_array, write_blob, ArrayElement, BlobElement, VariantSchema,
    WriteBytes};
use crate::writer::Writer;

/// One declared field of an object map, write side.
pub trait WriteField {
    /// Wire name to emit; for a variant group, the active
    /// alternative's name.
    fn name(&self) -> &'static str;

    /// Whether the field appears in the output at all.
    fn is_present(&self) -> bool;

    fn write_value(&self, dest: &mut Writer) -> Result<(), EncodeError>;
}

/// Writes one object from its declared field list: the present-field
/// count first, then each present field in declaration order.
pub fn object(dest: &mut Writer, fields: &[&dyn WriteField]) -> Result<(), EncodeError> {
    let present = fields.iter().filter(|f| f.is_present()).count();
    dest.start_object(present)?;
    for field in fields {
        if field.is_present() {
            dest.key(field.name()).map_err(|e| e.for_field(field.name()))?;
            field
                .write_value(dest)
                .map_err(|e| e.for_field(field.name()))?;
        }
    }
    dest.end_object();
    Ok(())
}

// =============================================================================
// FIELD WRAPPERS
// =============================================================================

/// Required field bound to a plain value.
pub struct Field<'a, T> {
    name: &'static str,
    value: &'a T,
}

/// Binds `name` to a required value.
pub fn field<'a, T: WriteBytes>(name: &'static str, value: &'a T) -> Field<'a, T> {
    Field { name, value }
}

impl<T: WriteBytes> WriteField for Field<'_, T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_present(&self) -> bool {
        true
    }

    fn write_value(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        self.value.write_bytes(dest)
    }
}

/// Optional field: omitted when `None`.
pub struct OptionalField<'a, T> {
    name: &'static str,
    value: &'a Option<T>,
}

/// Binds `name` to an optional value.
pub fn optional<'a, T: WriteBytes>(
    name: &'static str,
    value: &'a Option<T>,
) -> OptionalField<'a, T> {
    OptionalField { name, value }
}

impl<T: WriteBytes> WriteField for OptionalField<'_, T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_present(&self) -> bool {
        self.value.is_some()
    }

    fn write_value(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        match self.value {
            Some(value) => value.write_bytes(dest),
            None => Ok(()),
        }
    }
}

/// Field with a default: omitted when the value equals the default.
pub struct DefaultedField<'a, T> {
    name: &'static str,
    value: &'a T,
    default: T,
}

/// Binds `name` to a value that is omitted when equal to `default`.
pub fn defaulted<'a, T: WriteBytes + PartialEq>(
    name: &'static str,
    value: &'a T,
    default: T,
) -> DefaultedField<'a, T> {
    DefaultedField {
        name,
        value,
        default,
    }
}

impl<T: WriteBytes + PartialEq> WriteField for DefaultedField<'_, T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_present(&self) -> bool {
        *self.value != self.default
    }

    fn write_value(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        self.value.write_bytes(dest)
    }
}

/// Array field. Empty arrays are omitted unless
/// [`ArrayField::required`] was requested, mirroring the read side.
pub struct ArrayField<'a, T> {
    name: &'static str,
    value: &'a [T],
    required: bool,
}

/// Binds `name` to an array with historically-optional semantics: an
/// empty vector is omitted from the output.
pub fn array<'a, T: WriteBytes + ArrayElement>(
    name: &'static str,
    value: &'a [T],
) -> ArrayField<'a, T> {
    ArrayField {
        name,
        value,
        required: false,
    }
}

impl<T> ArrayField<'_, T> {
    /// Emits the field even when the array is empty.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl<T: WriteBytes + ArrayElement> WriteField for ArrayField<'_, T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_present(&self) -> bool {
        self.required || !self.value.is_empty()
    }

    fn write_value(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        write_array(dest, self.value)
    }
}

/// Required field whose fixed-width elements travel as one binary
/// string.
pub struct BlobArrayField<'a, T> {
    name: &'static str,
    value: &'a [T],
}

/// Binds `name` to a blob-encoded sequence of fixed-width elements.
pub fn array_as_blob<'a, T: BlobElement>(
    name: &'static str,
    value: &'a [T],
) -> BlobArrayField<'a, T> {
    BlobArrayField { name, value }
}

impl<T: BlobElement> WriteField for BlobArrayField<'_, T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_present(&self) -> bool {
        true
    }

    fn write_value(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        write_blob(dest, self.value)
    }
}

/// Variant group: emits the active alternative under its own name.
pub struct VariantField<'a, V> {
    value: &'a V,
}

/// Binds a variant group to its sum-typed value.
pub fn variant<V: VariantSchema>(value: &V) -> VariantField<'_, V> {
    VariantField { value }
}

impl<V: VariantSchema> WriteField for VariantField<'_, V> {
    fn name(&self) -> &'static str {
        V::OPTIONS[self.value.option_index()]
    }

    fn is_present(&self) -> bool {
        true
    }

    fn write_value(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        self.value.write_option(dest)
    }
}
