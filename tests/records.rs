use nativemem::prelude::*;
use strum::FromRepr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(i32)]
enum Color {
    Red = 1,
    Green = 2,
    Blue = -1,
}

native_enum!(Color: i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u8)]
enum Mode {
    Off = 0,
    High = 0xF0,
}

native_enum!(Mode: u8);

native_record! {
    /// A node of a singly linked list
    struct Node {
        value: Signed32,
        color: Enum32<Color>,
        next: StructRef<Node>,
    }
}

native_record! {
    struct Switch {
        mode: Enum8<Mode>,
        enabled: Boolean,
        wide: WBool,
    }
}

native_record! {
    struct Range {
        start: Unsigned16,
        end: Unsigned16,
    }
}

native_record! {
    struct Span {
        tag: Unsigned8,
        range: Inner<Range>,
        weights: [Float; 2],
    }
}

struct SizeT;

impl TypeAlias for SizeT {
    fn resolve(platform: &Platform) -> NativeType {
        if platform.address_bytes() == 8 {
            NativeType::ULongLong
        } else {
            NativeType::UInt
        }
    }
}

native_record! {
    struct Chunk {
        data: PointerField,
        len: Integer<SizeT>,
        _reserved: Padding<Unsigned8, 4>,
        flags: UnsignedLong,
    }
}

native_record! {
    struct Person {
        age: Unsigned8,
        initials: AsciiString<4>,
        name: Utf8String<12>,
        email: Utf8StringRef,
        country: AsciiStringRef,
    }
}

#[test]
fn linked_records_through_direct_memory() -> Result<()> {
    let runtime = Runtime::new(Platform::linux_x86_64());
    let nodes = Record::<Node>::array_of_direct(&runtime, 3)?;
    assert_eq!(nodes.len(), 3);

    for (index, node) in nodes.iter().enumerate() {
        node.value.set(node, index as i32 * 10)?;
        node.color.set(node, Color::Green)?;
        node.next.set(node, nodes.get(index + 1))?;
    }

    let mut values = Vec::new();
    let mut current = Some(nodes[0].clone());
    while let Some(node) = current {
        values.push(node.value.get(&node)?);
        assert_eq!(node.color.get(&node)?, Color::Green);
        current = node.next.get(&node)?;
    }
    assert_eq!(values, vec![0, 10, 20]);

    let second = nodes[0].next.get(&nodes[0])?;
    assert_eq!(second.map(|node| node.memory().clone()), Some(nodes[1].memory().clone()));
    Ok(())
}

#[test]
fn heap_records_cannot_be_referenced() -> Result<()> {
    let runtime = Runtime::new(Platform::linux_x86_64());
    let head = Record::<Node>::new(&runtime)?;
    let tail = Record::<Node>::new(&runtime)?;

    assert!(matches!(
        head.next.set(&head, Some(&tail)),
        Err(Error::NotDirect)
    ));
    assert!(head.next.get(&head)?.is_none());
    Ok(())
}

#[test]
fn enums_decode_signed_and_unsigned_values() -> Result<()> {
    let runtime = Runtime::new(Platform::linux_x86_64());
    let node = Record::<Node>::new(&runtime)?;

    node.color.set(&node, Color::Blue)?;
    assert_eq!(node.color.get_raw(&node)?, -1);
    assert_eq!(node.color.get(&node)?, Color::Blue);

    node.color.set_raw(&node, 7)?;
    assert!(matches!(
        node.color.get(&node),
        Err(Error::InvalidEnumValue { value: 7, .. })
    ));

    let switch = Record::<Switch>::new(&runtime)?;
    assert_eq!(switch.mode.get(&switch)?, Mode::Off);
    switch.mode.set(&switch, Mode::High)?;
    assert_eq!(switch.mode.get_raw(&switch)?, -16);
    assert_eq!(switch.mode.get(&switch)?, Mode::High);
    Ok(())
}

#[test]
fn booleans_read_any_non_zero_value() -> Result<()> {
    let runtime = Runtime::new(Platform::linux_x86_64());
    let switch = Record::<Switch>::new(&runtime)?;
    assert_eq!(switch.wide.offset(), 4);

    switch.memory().put_i8(1, 0x40)?;
    switch.memory().put_i32(4, -9)?;
    assert!(switch.enabled.get(&switch)?);
    assert!(switch.wide.get(&switch)?);

    switch.wide.set(&switch, false)?;
    assert_eq!(switch.memory().get_i32(4)?, 0);
    Ok(())
}

#[test]
fn nested_records_share_the_outer_memory() -> Result<()> {
    let runtime = Runtime::new(Platform::linux_x86_64());
    let span = Record::<Span>::new(&runtime)?;
    assert_eq!(span.size(), 16);
    assert_eq!(span.range.offset(), 2);
    assert_eq!(span.weights[1].offset(), 12);

    let range = span.range.get(&span)?;
    range.end.set(&range, 0xFFFF)?;
    assert_eq!(range.size(), 4);
    assert_eq!(span.memory().get_i16(4)?, -1);
    assert_eq!(range.end.get(&range)?, 0xFFFF);

    span.weights[0].set(&span, 0.5)?;
    assert_eq!(span.memory().get_f32(8)?, 0.5);
    Ok(())
}

#[test]
fn aliases_resolve_per_platform() -> Result<()> {
    let lp64 = Record::<Chunk>::new(&Runtime::new(Platform::linux_x86_64()))?;
    assert_eq!(lp64.len.native(), NativeType::ULongLong);
    assert_eq!(lp64.len.offset(), 8);
    assert_eq!(lp64.flags.offset(), 24);
    assert_eq!(lp64.size(), 32);

    let ilp32 = Record::<Chunk>::new(&Runtime::new(Platform::linux_i386()))?;
    assert_eq!(ilp32.len.native(), NativeType::UInt);
    assert_eq!(ilp32.len.offset(), 4);
    assert_eq!(ilp32.flags.offset(), 12);
    assert_eq!(ilp32.size(), 16);

    ilp32.len.set(&ilp32, 0x1_0000_0005)?;
    assert_eq!(ilp32.len.get(&ilp32)?, 5);
    ilp32.flags.set(&ilp32, u64::from(u32::MAX))?;
    assert_eq!(ilp32.flags.get(&ilp32)?, u64::from(u32::MAX));
    Ok(())
}

#[test]
fn records_bound_to_short_memory_fault_per_field() -> Result<()> {
    let runtime = Runtime::new(Platform::linux_x86_64());
    let memory = runtime.allocate(2);
    let range = Record::<Range>::bound(memory)?;

    range.start.set(&range, 7)?;
    assert!(matches!(
        range.end.get(&range),
        Err(Error::OutOfBounds { .. })
    ));
    assert_eq!(
        range.to_string(),
        "Range {\n    start = 7\n    end = - OutOfBounds -\n}\n"
    );

    let null = Record::<Range>::bound(runtime.null())?;
    assert_eq!(
        null.to_string(),
        "Range {\n    start = - NullDereference -\n    end = - NullDereference -\n}\n"
    );
    Ok(())
}

#[test]
fn display_renders_nested_fields() -> Result<()> {
    let runtime = Runtime::new(Platform::linux_x86_64());
    let span = Record::<Span>::new(&runtime)?;
    span.tag.set(&span, 9)?;
    let range = span.range.get(&span)?;
    range.start.set(&range, 3)?;
    span.weights[1].set(&span, 2.5)?;

    assert_eq!(
        span.to_string(),
        "Span {\n    tag = 9\n    range = Range {\n        start = 3\n        end = 0\n    }\n    weights = [0, 2.5]\n}\n"
    );

    let node = Record::<Node>::new(&runtime)?;
    node.color.set(&node, Color::Red)?;
    let rendered = node.to_string();
    assert!(rendered.contains("next = null"));
    Ok(())
}

#[test]
fn records_over_the_same_memory_observe_each_other() -> Result<()> {
    let runtime = Runtime::new(Platform::linux_x86_64());
    let first = Record::<Range>::new(&runtime)?;
    let second = Record::<Range>::bound(first.memory().clone())?;

    first.end.set(&first, 40)?;
    assert_eq!(second.end.get(&second)?, 40);
    second.start.set(&second, 2)?;
    assert_eq!(first.start.get(&first)?, 2);
    Ok(())
}

#[test]
fn string_members_inline_and_by_reference() -> Result<()> {
    let runtime = Runtime::new(Platform::linux_x86_64());
    let person = Record::<Person>::new(&runtime)?;
    assert_eq!(person.initials.offset(), 1);
    assert_eq!(person.name.offset(), 5);
    assert_eq!(person.email.offset(), 24);
    assert_eq!(person.size(), 40);

    person.initials.set(&person, "JRRT")?;
    person.name.set(&person, "Zoë Ångström")?;
    assert_eq!(person.initials.get(&person)?, "JRR");
    assert_eq!(person.name.get(&person)?, "Zoë Ångst");

    let email = person.email.set(&person, Some("zoe@example.org"))?;
    let country = person.country.set(&person, Some("SE"))?;
    assert!(email.is_some() && country.is_some());
    assert_eq!(person.email.get(&person)?.as_deref(), Some("zoe@example.org"));
    assert_eq!(person.country.get(&person)?.as_deref(), Some("SE"));

    assert_eq!(
        person.to_string(),
        "Person {\n    age = 0\n    initials = \"JRR\"\n    name = \"Zoë Ångst\"\n    email = \"zoe@example.org\"\n    country = \"SE\"\n}\n"
    );

    assert!(person.country.set(&person, None)?.is_none());
    assert_eq!(person.country.get(&person)?, None);
    assert!(person.to_string().contains("country = null"));
    Ok(())
}

#[test]
fn string_references_on_a_narrow_platform() -> Result<()> {
    let runtime = Runtime::new(Platform::linux_i386());
    let person = Record::<Person>::new(&runtime)?;
    assert_eq!(person.email.offset(), 20);
    assert_eq!(person.size(), 28);

    match person.email.set(&person, Some("a@b.c")) {
        Ok(holder) => {
            assert!(holder.is_some());
            assert_eq!(person.email.get(&person)?.as_deref(), Some("a@b.c"));
        }
        Err(error) => {
            assert!(matches!(error, Error::AddressOverflow { width: 4, .. }));
            assert_eq!(person.email.get(&person)?, None);
        }
    }
    Ok(())
}
