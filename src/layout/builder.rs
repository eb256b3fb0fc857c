use crate::{
    layout::{align_up, FieldSlot, RecordKind, RecordLayout},
    platform::{NativeType, Platform, TypeInfo},
    Error, Result,
};

/// Largest value accepted for packing and alignment directives.
const MAX_ALIGNMENT: usize = 128;

/// Incremental layout of one record.
///
/// Directives ([`packed`](Self::packed), [`packed_if`](Self::packed_if),
/// [`aligned`](Self::aligned), [`min_aligned`](Self::min_aligned)) come first, followed by the
/// fields in declaration order. Each field method returns the offset assigned to the field.
///
/// Errors do not interrupt the declaration sequence: the first one is kept and returned by
/// [`finish`](Self::finish), and offsets handed out after it are meaningless.
#[derive(Debug)]
pub struct LayoutBuilder {
    kind: RecordKind,
    platform: Platform,
    packing: Option<usize>,
    alignment_override: Option<usize>,
    alignment: usize,
    cursor: usize,
    extent: usize,
    array_depth: usize,
    fields: Vec<FieldSlot>,
    error: Option<Error>,
}

impl LayoutBuilder {
    /// An empty record of `kind`, laid out for `platform`.
    #[must_use]
    pub fn new(kind: RecordKind, platform: Platform) -> Self {
        LayoutBuilder {
            kind,
            platform,
            packing: None,
            alignment_override: None,
            alignment: 1,
            cursor: 0,
            extent: 0,
            array_depth: 0,
            fields: Vec::new(),
            error: None,
        }
    }

    /// The platform the record is laid out for.
    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// The kind of record being laid out.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Limits the alignment of every field, and of the record, to `n` bytes (`#pragma pack(n)`).
    pub fn packed(&mut self, n: usize) -> &mut Self {
        if self.check_directive("packing", n) {
            self.packing = Some(n);
        }
        self
    }

    /// Like [`packed`](Self::packed), if `predicate` holds for the builder's platform.
    pub fn packed_if(&mut self, n: usize, predicate: fn(&Platform) -> bool) -> &mut Self {
        if self.check_directive("packing", n) && predicate(&self.platform) {
            self.packing = Some(n);
        }
        self
    }

    /// Forces the alignment of the record to `n` bytes; the size is rounded up to it.
    pub fn aligned(&mut self, n: usize) -> &mut Self {
        if self.check_directive("alignment", n) {
            self.alignment_override = Some(n);
        }
        self
    }

    /// Raises the alignment of the record to at least `n` bytes.
    pub fn min_aligned(&mut self, n: usize) -> &mut Self {
        if self.check_directive("minimum alignment", n) {
            self.alignment = self.alignment.max(n);
        }
        self
    }

    fn check_directive(&mut self, what: &str, n: usize) -> bool {
        if !n.is_power_of_two() || n > MAX_ALIGNMENT {
            self.fail(malformed_error!(
                "{} {} is not a power of two between 1 and {}",
                what,
                n,
                MAX_ALIGNMENT
            ));
            return false;
        }

        if !self.fields.is_empty() {
            self.fail(malformed_error!("{} declared after the first field", what));
            return false;
        }

        true
    }

    /// Declares a field of a primitive type, returning its offset.
    pub fn add(&mut self, native: NativeType) -> usize {
        match self.platform.type_info(native) {
            Ok(info) => self.add_spec(info),
            Err(error) => {
                self.fail(error);
                0
            }
        }
    }

    /// Declares a field of arbitrary size and natural alignment, returning its offset.
    pub fn add_spec(&mut self, info: TypeInfo) -> usize {
        let alignment = self.effective_alignment(info.alignment);
        let offset = if self.kind == RecordKind::Union && self.array_depth == 0 {
            0
        } else {
            match align_up(self.cursor, alignment) {
                Some(offset) => offset,
                None => {
                    self.fail(malformed_error!("record size overflows at {}", self.cursor));
                    return 0;
                }
            }
        };

        self.place(offset, info.size, alignment)
    }

    /// Declares a field at a fixed offset, returning that offset.
    ///
    /// The field counts towards the record's size and alignment like any other; later fields
    /// are placed after the furthest end seen so far.
    pub fn field_at(&mut self, offset: usize, info: TypeInfo) -> usize {
        let alignment = self.effective_alignment(info.alignment);
        self.place(offset, info.size, alignment)
    }

    /// Reserves `count` consecutive values of `native`, returning the offset of the first.
    pub fn padding(&mut self, native: NativeType, count: usize) -> usize {
        match self.platform.type_info(native) {
            Ok(info) => match info.size.checked_mul(count) {
                Some(size) => self.add_spec(TypeInfo::new(size, info.alignment)),
                None => {
                    self.fail(malformed_error!("padding of {} x {} overflows", count, native));
                    0
                }
            },
            Err(error) => {
                self.fail(error);
                0
            }
        }
    }

    /// Embeds a record with its own finished layout, returning its offset.
    pub fn nested(&mut self, layout: &RecordLayout) -> usize {
        self.add_spec(layout.type_info())
    }

    /// Declares the elements of an array inside `f`.
    ///
    /// Elements follow each other from the array's start, which is offset 0 for a union member.
    pub fn array<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        if self.kind == RecordKind::Union && self.array_depth == 0 {
            self.cursor = 0;
        }

        self.array_depth += 1;
        let result = f(self);
        self.array_depth -= 1;
        result
    }

    /// Records an error found while declaring fields. Only the first one is kept.
    pub fn fail(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn effective_alignment(&self, natural: usize) -> usize {
        let natural = natural.max(1);
        self.packing.map_or(natural, |packing| natural.min(packing))
    }

    fn place(&mut self, offset: usize, size: usize, alignment: usize) -> usize {
        let Some(end) = offset.checked_add(size) else {
            self.fail(malformed_error!("field at {} of {} bytes overflows", offset, size));
            return offset;
        };

        self.cursor = self.cursor.max(end);
        self.extent = self.extent.max(end);
        self.alignment = self.alignment.max(alignment);
        self.fields.push(FieldSlot {
            offset,
            size,
            alignment,
        });
        offset
    }

    /// Completes the layout.
    ///
    /// # Errors
    /// Returns the first error raised by a directive or field declaration, or
    /// [`Error::Malformed`] if the padded size overflows.
    pub fn finish(self) -> Result<RecordLayout> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let alignment = match (self.alignment_override, self.packing) {
            (Some(alignment), _) => alignment,
            (None, Some(packing)) => self.alignment.min(packing),
            (None, None) => self.alignment,
        };

        let size = align_up(self.extent, alignment)
            .ok_or_else(|| malformed_error!("record size {} overflows", self.extent))?;

        log::debug!(
            "{} layout: {} fields, size {}, alignment {}, packing {:?}",
            self.kind,
            self.fields.len(),
            size,
            alignment,
            self.packing
        );

        Ok(RecordLayout {
            kind: self.kind,
            size,
            alignment,
            packing: self.packing,
            fields: self.fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> Platform {
        Platform::linux_x86_64()
    }

    fn finish(builder: LayoutBuilder) -> (usize, usize) {
        let layout = builder.finish().unwrap();
        (layout.alignment, layout.size)
    }

    #[test]
    fn tail_padding() {
        let mut builder = LayoutBuilder::new(RecordKind::Struct, linux());
        assert_eq!(builder.add(NativeType::SInt), 0);
        assert_eq!(builder.add(NativeType::SChar), 4);
        assert_eq!(finish(builder), (4, 8));
    }

    #[test]
    fn nested_struct_is_placed_by_its_alignment() {
        let mut inner = LayoutBuilder::new(RecordKind::Struct, linux());
        inner.add(NativeType::SChar);
        inner.add(NativeType::SLongLong);
        inner.add(NativeType::SInt);
        let inner = inner.finish().unwrap();
        assert_eq!((inner.alignment, inner.size), (8, 24));

        let mut outer = LayoutBuilder::new(RecordKind::Struct, linux());
        outer.add(NativeType::SChar);
        assert_eq!(outer.nested(&inner), 8);
        assert_eq!(finish(outer), (8, 32));

        let mut array = LayoutBuilder::new(RecordKind::Struct, linux());
        let offsets: Vec<usize> = array.array(|b| (0..3).map(|_| b.nested(&inner)).collect());
        assert_eq!(offsets, vec![0, 24, 48]);
        assert_eq!(finish(array), (8, 72));
    }

    #[test]
    fn union_members_overlap() {
        let mut pair = LayoutBuilder::new(RecordKind::Struct, linux());
        pair.add(NativeType::UInt);
        pair.add(NativeType::SInt);
        let pair = pair.finish().unwrap();

        let mut union = LayoutBuilder::new(RecordKind::Union, linux());
        assert_eq!(union.nested(&pair), 0);
        assert_eq!(union.add(NativeType::SLongLong), 0);
        assert_eq!(finish(union), (8, 8));
    }

    #[test]
    fn union_arrays_are_contiguous_from_zero() {
        let mut j = LayoutBuilder::new(RecordKind::Struct, linux());
        j.add(NativeType::SShort);
        j.array(|b| (0..3).for_each(|_| {
            b.add(NativeType::SChar);
        }));
        let j = j.finish().unwrap();
        assert_eq!((j.alignment, j.size), (2, 6));

        let mut union = LayoutBuilder::new(RecordKind::Union, linux());
        let first: Vec<usize> = union.array(|b| (0..5).map(|_| b.nested(&j)).collect());
        let second: Vec<usize> = union.array(|b| (0..13).map(|_| b.add(NativeType::SChar)).collect());
        assert_eq!(first, vec![0, 6, 12, 18, 24]);
        assert_eq!(second[0], 0);
        assert_eq!(second[12], 12);
        assert_eq!(finish(union), (2, 30));
    }

    #[test]
    fn packing_clamps_alignment() {
        let mut builder = LayoutBuilder::new(RecordKind::Struct, linux());
        builder.packed(2);
        builder.add(NativeType::UInt);
        assert_eq!(builder.add(NativeType::ULongLong), 4);
        assert_eq!(finish(builder), (2, 12));
    }

    #[test]
    fn packing_predicate_is_evaluated_for_platform() {
        let mut windows = LayoutBuilder::new(RecordKind::Struct, Platform::windows_x86_64());
        windows.packed_if(1, Platform::is_windows);
        windows.add(NativeType::SChar);
        assert_eq!(windows.add(NativeType::SInt), 1);
        assert_eq!(finish(windows), (1, 5));

        let mut linux_builder = LayoutBuilder::new(RecordKind::Struct, linux());
        linux_builder.packed_if(1, Platform::is_windows);
        linux_builder.add(NativeType::SChar);
        assert_eq!(linux_builder.add(NativeType::SInt), 4);
    }

    #[test]
    fn alignment_overrides() {
        let mut aligned = LayoutBuilder::new(RecordKind::Struct, linux());
        aligned.aligned(16);
        aligned.add(NativeType::SInt);
        assert_eq!(finish(aligned), (16, 16));

        let mut minimum = LayoutBuilder::new(RecordKind::Struct, linux());
        minimum.min_aligned(8);
        minimum.add(NativeType::SChar);
        assert_eq!(finish(minimum), (8, 8));
    }

    #[test]
    fn invalid_directives_fail() {
        let mut builder = LayoutBuilder::new(RecordKind::Struct, linux());
        builder.packed(3);
        builder.add(NativeType::SInt);
        assert!(matches!(builder.finish(), Err(Error::Malformed { .. })));

        let mut late = LayoutBuilder::new(RecordKind::Struct, linux());
        late.add(NativeType::SInt);
        late.aligned(8);
        assert!(matches!(late.finish(), Err(Error::Malformed { .. })));

        let mut huge = LayoutBuilder::new(RecordKind::Struct, linux());
        huge.aligned(256);
        assert!(huge.finish().is_err());
    }

    #[test]
    fn void_field_is_unsupported() {
        let mut builder = LayoutBuilder::new(RecordKind::Struct, linux());
        builder.add(NativeType::Void);
        assert!(matches!(
            builder.finish(),
            Err(Error::UnsupportedType(NativeType::Void))
        ));
    }

    #[test]
    fn explicit_offsets() {
        let mut builder = LayoutBuilder::new(RecordKind::Struct, linux());
        builder.add(NativeType::SChar);
        assert_eq!(builder.field_at(8, TypeInfo::new(4, 4)), 8);
        assert_eq!(builder.add(NativeType::SShort), 12);
        assert_eq!(finish(builder), (4, 16));
    }

    #[test]
    fn padding_reserves_values() {
        let mut builder = LayoutBuilder::new(RecordKind::Struct, linux());
        builder.add(NativeType::SChar);
        assert_eq!(builder.padding(NativeType::SInt, 3), 4);
        assert_eq!(finish(builder), (4, 16));
    }

    #[test]
    fn size_overflow_is_malformed() {
        let mut builder = LayoutBuilder::new(RecordKind::Struct, linux());
        builder.add_spec(TypeInfo::new(usize::MAX - 2, 1));
        builder.add(NativeType::SInt);
        assert!(matches!(builder.finish(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn i386_long_long_aligns_to_four() {
        let mut builder = LayoutBuilder::new(RecordKind::Struct, Platform::linux_i386());
        builder.add(NativeType::SInt);
        assert_eq!(builder.add(NativeType::SLongLong), 4);
        assert_eq!(finish(builder), (4, 12));
    }
}
