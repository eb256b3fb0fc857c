use nativemem::prelude::*;
use proptest::prelude::*;

native_record! {
    struct OneInt {
        value: Signed32,
    }
}

native_record! {
    struct IntLong {
        i: Signed32,
        l: Signed64,
    }
}

native_record! {
    struct Mixed {
        b: Signed8,
        l: Signed64,
        s: Signed16,
    }
}

native_record! {
    struct Outer {
        head: Signed8,
        inner: Inner<IntLong>,
        tail: Signed8,
    }
}

native_record! {
    struct Grid {
        cells: [Signed64; 9],
    }
}

native_record! {
    struct Triple {
        bytes: [Signed8; 3],
    }
}

native_record! {
    union Triples {
        items: [Inner<Triple>; 5],
    }
}

native_record! {
    struct ShortBytes {
        s: Signed16,
        bytes: [Signed8; 3],
    }
}

native_record! {
    union Word {
        i: Signed32,
        l: Signed64,
        b: [Signed8; 3],
    }
}

native_record! {
    union Wide {
        longs: [Signed64; 5],
        bytes: [Signed8; 13],
    }
}

native_record! {
    struct Pack2 : packed(2) {
        i: Unsigned32,
        l: Unsigned64,
    }
}

native_record! {
    struct Aligned16 : aligned(16) {
        i: Signed32,
    }
}

native_record! {
    struct Address2 {
        first: Address,
        second: Address,
    }
}

fn layout_of<T: RecordType>(platform: Platform) -> Result<RecordLayout> {
    let runtime = Runtime::new(platform);
    Ok(runtime.schema::<T>()?.layout().clone())
}

fn offsets(layout: &RecordLayout) -> Vec<usize> {
    layout.fields.iter().map(|field| field.offset).collect()
}

#[test]
fn struct_fixtures_x86_64() -> Result<()> {
    let platform = Platform::linux_x86_64();

    let one = layout_of::<OneInt>(platform)?;
    assert_eq!((one.size, one.alignment), (4, 4));

    let int_long = layout_of::<IntLong>(platform)?;
    assert_eq!((int_long.size, int_long.alignment), (16, 8));
    assert_eq!(offsets(&int_long), vec![0, 8]);

    let mixed = layout_of::<Mixed>(platform)?;
    assert_eq!((mixed.size, mixed.alignment), (24, 8));
    assert_eq!(offsets(&mixed), vec![0, 8, 16]);

    let outer = layout_of::<Outer>(platform)?;
    assert_eq!((outer.size, outer.alignment), (32, 8));
    assert_eq!(offsets(&outer), vec![0, 8, 24]);

    let grid = layout_of::<Grid>(platform)?;
    assert_eq!((grid.size, grid.alignment), (72, 8));
    assert_eq!(grid.fields.len(), 9);
    assert_eq!(grid.fields[8].offset, 64);
    Ok(())
}

#[test]
fn byte_array_fixtures() -> Result<()> {
    let platform = Platform::linux_x86_64();

    let triple = layout_of::<Triple>(platform)?;
    assert_eq!((triple.size, triple.alignment), (3, 1));

    let triples = layout_of::<Triples>(platform)?;
    assert_eq!((triples.size, triples.alignment), (15, 1));
    assert_eq!(offsets(&triples), vec![0, 3, 6, 9, 12]);

    let short_bytes = layout_of::<ShortBytes>(platform)?;
    assert_eq!((short_bytes.size, short_bytes.alignment), (6, 2));
    assert_eq!(offsets(&short_bytes), vec![0, 2, 3, 4]);
    Ok(())
}

#[test]
fn union_fixtures() -> Result<()> {
    let platform = Platform::linux_x86_64();

    let word = layout_of::<Word>(platform)?;
    assert_eq!((word.size, word.alignment), (8, 8));
    assert_eq!(offsets(&word), vec![0, 0, 0, 1, 2]);

    let wide = layout_of::<Wide>(platform)?;
    assert_eq!((wide.size, wide.alignment), (40, 8));
    assert_eq!(wide.fields[5].offset, 0);
    assert_eq!(wide.fields[17].offset, 12);
    Ok(())
}

#[test]
fn packing_and_alignment_directives() -> Result<()> {
    let platform = Platform::linux_x86_64();

    let packed = layout_of::<Pack2>(platform)?;
    assert_eq!(offsets(&packed), vec![0, 4]);
    assert_eq!((packed.size, packed.alignment), (12, 2));
    assert_eq!(packed.packing, Some(2));

    let aligned = layout_of::<Aligned16>(platform)?;
    assert_eq!((aligned.size, aligned.alignment), (16, 16));
    Ok(())
}

#[test]
fn layouts_follow_the_platform() -> Result<()> {
    let i386 = layout_of::<IntLong>(Platform::linux_i386())?;
    assert_eq!(offsets(&i386), vec![0, 4]);
    assert_eq!((i386.size, i386.alignment), (12, 4));

    let mips = layout_of::<IntLong>(Platform::linux_mips())?;
    assert_eq!(offsets(&mips), vec![0, 8]);

    let addresses32 = layout_of::<Address2>(Platform::linux_i386())?;
    assert_eq!(offsets(&addresses32), vec![0, 4]);
    assert_eq!(addresses32.size, 8);

    let addresses64 = layout_of::<Address2>(Platform::windows_x86_64())?;
    assert_eq!(offsets(&addresses64), vec![0, 8]);
    assert_eq!(addresses64.size, 16);
    Ok(())
}

#[test]
fn schemas_are_computed_once_per_runtime() -> Result<()> {
    let runtime = Runtime::new(Platform::linux_x86_64());
    let first = runtime.schema::<Mixed>()?;
    let second = runtime.schema::<Mixed>()?;
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    let other = Runtime::new(Platform::linux_x86_64());
    assert_eq!(other.schema::<Mixed>()?.layout(), first.layout());
    Ok(())
}

const INTEGERS: [NativeType; 9] = [
    NativeType::SChar,
    NativeType::UChar,
    NativeType::SShort,
    NativeType::UShort,
    NativeType::SInt,
    NativeType::UInt,
    NativeType::SLong,
    NativeType::SLongLong,
    NativeType::Address,
];

fn build(kind: RecordKind, packing: Option<usize>, types: &[usize]) -> Result<RecordLayout> {
    let mut builder = LayoutBuilder::new(kind, Platform::linux_x86_64());
    if let Some(packing) = packing {
        builder.packed(packing);
    }
    for index in types {
        builder.add(INTEGERS[*index]);
    }
    builder.finish()
}

proptest! {
    #[test]
    fn layouts_are_deterministic(
        types in prop::collection::vec(0..INTEGERS.len(), 1..24),
        packing in prop::option::of(prop::sample::select(vec![1usize, 2, 4, 8])),
    ) {
        let first = build(RecordKind::Struct, packing, &types).unwrap();
        let second = build(RecordKind::Struct, packing, &types).unwrap();
        prop_assert_eq!(&first, &second);
    }

    #[test]
    fn struct_fields_are_aligned_and_disjoint(
        types in prop::collection::vec(0..INTEGERS.len(), 1..24),
        packing in prop::option::of(prop::sample::select(vec![1usize, 2, 4, 8])),
    ) {
        let layout = build(RecordKind::Struct, packing, &types).unwrap();

        let mut end = 0;
        for field in &layout.fields {
            prop_assert_eq!(field.offset % field.alignment, 0);
            prop_assert!(field.offset >= end);
            end = field.offset + field.size;
        }
        prop_assert!(layout.size >= end);
        prop_assert_eq!(layout.size % layout.alignment, 0);
        if let Some(packing) = packing {
            prop_assert!(layout.alignment <= packing);
        }
    }

    #[test]
    fn union_size_covers_the_largest_member(
        types in prop::collection::vec(0..INTEGERS.len(), 1..12),
    ) {
        let layout = build(RecordKind::Union, None, &types).unwrap();
        let largest = layout.fields.iter().map(|field| field.size).max().unwrap_or(0);

        prop_assert!(layout.fields.iter().all(|field| field.offset == 0));
        prop_assert!(layout.size >= largest);
        prop_assert!(layout.size < largest + layout.alignment);
    }
}
