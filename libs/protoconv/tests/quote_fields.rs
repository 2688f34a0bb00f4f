//! Converters selected from schema documents and dynamic descriptors,
//! driven against a native quote struct.

use std::sync::{Arc, Once};

use protoconv::{
    CollectionConverters, ConvertError, Converter, ConverterFactory, FieldConverter,
};
use protoconv_api::{
    Access, FieldDescriptor, MessageHandle, MessageRef, MessageType, NativeData, NativeRepr,
    NativeType, NativeValue, ProtoMessage, ProtoValue, ReflectMessage, Schema,
};

const QUOTE: &str = r#"{
    "message": "market.Quote",
    "fields": [
        { "name": "bid", "kind": "double", "default": 1.5 },
        { "name": "size", "kind": "sint32" },
        { "name": "volume", "kind": "fixed64" },
        { "name": "symbol", "kind": "string" },
        { "name": "venue", "kind": "bytes" },
        { "name": "side", "kind": "enum",
          "enum_values": [{ "name": "SIDE_SELL", "number": 2 }, { "name": "SIDE_BUY", "number": 1 }] },
        { "name": "prev", "kind": "message" },
        { "name": "levels", "kind": "int64", "cardinality": "repeated" }
    ]
}"#;

#[derive(Debug, Default, PartialEq)]
struct Quote {
    bid: f64,
    size: i32,
    volume: u64,
    symbol: String,
    venue: Vec<u8>,
    side: i32,
    prev: Option<MessageRef>,
    levels: Vec<i64>,
}

impl ProtoMessage for Quote {
    const FULL_NAME: &'static str = "market.Quote";
}

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Native binding of each `Quote` field.
fn binding(field: &str) -> NativeType {
    match field {
        "bid" => NativeType::float64(),
        "size" => NativeType::int32(),
        "volume" => NativeType::uint64(),
        "symbol" => NativeType::string(),
        "venue" => NativeType::byte_slice(),
        "side" => NativeType::int32().named("Side"),
        "prev" => NativeType::pointer_to(MessageType::of::<Quote>()),
        "levels" => NativeType::list_of(NativeType::int64()),
        other => panic!("unbound field {other}"),
    }
}

/// Reads one field of a quote as a native value.
fn get(quote: &Quote, field: &str) -> NativeValue {
    match field {
        "bid" => NativeValue::float64(quote.bid),
        "size" => NativeValue::int32(quote.size),
        "volume" => NativeValue::uint64(quote.volume),
        "symbol" => NativeValue::string(quote.symbol.clone()),
        "venue" if quote.venue.is_empty() => NativeValue::nil_bytes(),
        "venue" => NativeValue::bytes(quote.venue.clone()),
        "side" => NativeValue::int32(quote.side).retype(binding("side")).unwrap(),
        "prev" => NativeValue::pointer(&MessageType::of::<Quote>(), quote.prev.clone()),
        "levels" => NativeValue::new(
            binding("levels"),
            NativeData::List(quote.levels.iter().copied().map(NativeData::Int64).collect()),
        )
        .unwrap(),
        other => panic!("unbound field {other}"),
    }
}

fn set(quote: &mut Quote, field: &str, value: NativeValue) {
    match (field, value.into_parts().1) {
        ("bid", NativeData::Float64(v)) => quote.bid = v,
        ("size", NativeData::Int32(v)) => quote.size = v,
        ("volume", NativeData::Uint64(v)) => quote.volume = v,
        ("symbol", NativeData::String(v)) => quote.symbol = v,
        ("venue", NativeData::Bytes(v)) => quote.venue = v.unwrap_or_default(),
        ("side", NativeData::Int32(v)) => quote.side = v,
        ("prev", NativeData::Pointer(v)) => quote.prev = v,
        ("levels", NativeData::List(items)) => {
            quote.levels = items
                .into_iter()
                .map(|item| match item {
                    NativeData::Int64(v) => v,
                    other => panic!("unexpected level {other:?}"),
                })
                .collect();
        }
        (field, data) => panic!("cannot set {field} to {data:?}"),
    }
}

// ════════════════════════════════════════════════════════════════
//  Lists as wrapper messages
// ════════════════════════════════════════════════════════════════

/// Wrapper message around a native list.
#[derive(Debug)]
struct ListView {
    full_name: String,
    list: NativeValue,
}

impl ReflectMessage for ListView {
    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn interface(&self) -> NativeValue {
        self.list.clone()
    }

    fn proto_unwrap(&self) -> Option<NativeValue> {
        Some(self.list.clone())
    }
}

#[derive(Debug)]
struct ListConverter {
    native: NativeType,
    field: String,
    elem: Converter,
}

impl ListConverter {
    fn view(&self, list: NativeValue, access: Access) -> ProtoValue {
        let view = ListView { full_name: self.field.clone(), list };
        ProtoValue::Message(MessageHandle::new(Arc::new(view), access))
    }
}

impl FieldConverter for ListConverter {
    fn try_pb_value_of(&self, value: &NativeValue) -> Result<ProtoValue, ConvertError> {
        if !self.is_valid_go(value) {
            return Err(ConvertError::type_mismatch(value.ty(), &self.native));
        }
        Ok(self.view(value.clone(), Access::Mutable))
    }

    fn try_go_value_of(&self, value: &ProtoValue) -> Result<NativeValue, ConvertError> {
        let list = value
            .as_message()
            .and_then(|m| m.message().proto_unwrap())
            .ok_or_else(|| ConvertError::type_mismatch(value.tag(), &self.native))?;
        if list.ty() != &self.native {
            return Err(ConvertError::type_mismatch(list.ty(), &self.native));
        }
        Ok(list)
    }

    fn is_valid_pb(&self, value: &ProtoValue) -> bool {
        self.try_go_value_of(value).is_ok()
    }

    fn is_valid_go(&self, value: &NativeValue) -> bool {
        let (Some(elem), NativeData::List(items)) = (self.elem.native_type(), value.data()) else {
            return false;
        };
        value.ty() == &self.native
            && items.iter().all(|item| {
                NativeValue::new(elem.clone(), item.clone())
                    .is_some_and(|v| self.elem.is_valid_go(&v))
            })
    }

    fn new_value(&self) -> ProtoValue {
        self.view(self.native.zero(), Access::Mutable)
    }

    fn zero_value(&self) -> ProtoValue {
        self.view(self.native.zero(), Access::Immutable)
    }
}

struct Lists;

impl CollectionConverters for Lists {
    fn list(
        &self,
        native: &NativeType,
        field: &dyn FieldDescriptor,
    ) -> Result<Arc<dyn FieldConverter>, ConvertError> {
        let NativeRepr::List(elem) = native.repr() else {
            return Err(ConvertError::KindMismatch {
                native: native.clone(),
                field: field.full_name().to_string(),
            });
        };
        Ok(Arc::new(ListConverter {
            native: native.clone(),
            field: field.full_name().to_string(),
            elem: ConverterFactory::try_singular(elem, field)?,
        }))
    }

    fn map(
        &self,
        native: &NativeType,
        field: &dyn FieldDescriptor,
    ) -> Result<Arc<dyn FieldConverter>, ConvertError> {
        Err(ConvertError::KindMismatch {
            native: native.clone(),
            field: field.full_name().to_string(),
        })
    }
}

fn converters(schema: &Schema) -> Vec<(String, Converter)> {
    let factory = ConverterFactory::with_collections(Arc::new(Lists));
    schema
        .fields
        .iter()
        .map(|f| (f.name.clone(), factory.select(&binding(&f.name), f)))
        .collect()
}

#[test]
fn copies_every_field_between_quotes() {
    init_tracing();
    let schema = Schema::parse(QUOTE).unwrap();
    let converters = converters(&schema);

    let prev = MessageRef::new(Quote { symbol: "OLD".into(), ..Default::default() });
    let source = Quote {
        bid: 101.25,
        size: -3,
        volume: u64::MAX,
        symbol: "ACME".into(),
        venue: b"XNYS".to_vec(),
        side: 1,
        prev: Some(prev.clone()),
        levels: vec![10, 20, 30],
    };
    let mut copy = Quote::default();
    for (name, c) in &converters {
        let value = c.pb_value_of(&get(&source, name));
        assert!(c.is_valid_pb(&value), "{name}");
        set(&mut copy, name, c.go_value_of(&value));
    }
    assert_eq!(copy.bid, source.bid);
    assert_eq!(copy.levels, source.levels);
    assert!(copy.prev.as_ref().unwrap().ptr_eq(&prev));
    assert_eq!(copy.symbol, "ACME");
    assert_eq!(copy.venue, b"XNYS");
}

#[test]
fn defaults_follow_the_schema() {
    init_tracing();
    let schema = Schema::parse(QUOTE).unwrap();
    let converters = converters(&schema);
    let by_name = |name: &str| -> Converter {
        converters.iter().find(|(n, _)| n == name).unwrap().1.clone()
    };

    assert_eq!(by_name("bid").new_value(), ProtoValue::Float64(1.5));
    assert_eq!(by_name("size").zero_value(), ProtoValue::Int32(0));
    assert_eq!(by_name("venue").zero_value(), ProtoValue::Bytes(None));
    assert_eq!(by_name("side").new_value(), ProtoValue::Enum(2));

    let prev = by_name("prev");
    assert!(prev.new_value().as_message().unwrap().is_mutable());
    assert!(!prev.zero_value().as_message().unwrap().is_mutable());

    let levels = by_name("levels");
    let empty = levels.go_value_of(&levels.zero_value());
    assert_eq!(empty, binding("levels").zero());
}

#[test]
fn list_elements_use_singular_converters() {
    let schema = Schema::parse(QUOTE).unwrap();
    let levels = schema.field("levels").unwrap();
    let c = Lists.list(&binding("levels"), levels).unwrap();
    assert!(format!("{c:?}").contains("Int64"));

    let mixed = NativeValue::new(
        NativeType::list_of(NativeType::int32()),
        NativeData::List(vec![NativeData::Int32(1)]),
    )
    .unwrap();
    assert!(!c.is_valid_go(&mixed));
    assert!(c.try_pb_value_of(&mixed).is_err());
    assert!(c.new_value().as_message().unwrap().is_mutable());
}

#[test]
fn empty_bytes_read_back_as_nil() {
    let schema = Schema::parse(QUOTE).unwrap();
    let c = ConverterFactory::new().select(&binding("venue"), schema.field("venue").unwrap());
    let value = c.pb_value_of(&NativeValue::bytes(Vec::new()));
    assert_eq!(value, ProtoValue::Bytes(Some(Vec::new())));
    assert_eq!(c.go_value_of(&ProtoValue::Bytes(None)), NativeValue::nil_bytes());
}

#[test]
fn string_field_bound_to_bytes() {
    let schema = Schema::parse(QUOTE).unwrap();
    let c = ConverterFactory::new()
        .select(&NativeType::byte_slice(), schema.field("symbol").unwrap());
    let value = c.pb_value_of(&NativeValue::bytes(b"ACME".to_vec()));
    assert_eq!(value, ProtoValue::String("ACME".to_string()));
    assert_eq!(c.go_value_of(&ProtoValue::String(String::new())), NativeValue::nil_bytes());
}

#[test]
fn repeated_field_without_collections_is_refused() {
    let schema = Schema::parse(QUOTE).unwrap();
    let err = ConverterFactory::new()
        .try_select(&binding("levels"), schema.field("levels").unwrap())
        .unwrap_err();
    assert_eq!(err.to_string(), "no collection converter configured for field market.Quote.levels");
}

#[test]
#[should_panic(expected = "invalid native type f32 for field market.Quote.bid")]
fn mismatched_binding_aborts() {
    let schema = Schema::parse(QUOTE).unwrap();
    ConverterFactory::new().select(&NativeType::float32(), schema.field("bid").unwrap());
}

// ════════════════════════════════════════════════════════════════
//  Dynamic descriptors
// ════════════════════════════════════════════════════════════════

mod dynamic {
    use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor, Value};
    use prost_types::field_descriptor_proto::{Label, Type};
    use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet};

    use super::*;

    fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(ty as i32),
            ..Default::default()
        }
    }

    fn quote() -> MessageDescriptor {
        let file = FileDescriptorProto {
            name: Some("market.proto".to_string()),
            package: Some("market".to_string()),
            syntax: Some("proto2".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("Quote".to_string()),
                field: vec![
                    FieldDescriptorProto {
                        default_value: Some("5".to_string()),
                        ..field("size", 1, Type::Sint32)
                    },
                    field("symbol", 2, Type::String),
                    field("venue", 3, Type::Bytes),
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        DescriptorPool::from_file_descriptor_set(FileDescriptorSet { file: vec![file] })
            .unwrap()
            .get_message_by_name("market.Quote")
            .unwrap()
    }

    #[test]
    fn declared_default_comes_from_descriptor() {
        let desc = quote();
        let size = desc.get_field_by_name("size").unwrap();
        let c = ConverterFactory::new().select(&NativeType::int32(), &size);
        assert_eq!(c.new_value(), ProtoValue::Int32(5));

        let message = DynamicMessage::new(desc);
        let unset = ProtoValue::try_from(&*message.get_field(&size)).unwrap();
        assert_eq!(c.go_value_of(&unset), NativeValue::int32(5));
    }

    #[test]
    fn values_cross_into_dynamic_messages() {
        let desc = quote();
        let mut message = DynamicMessage::new(desc.clone());
        let factory = ConverterFactory::new();
        let fields = [
            ("size", NativeValue::int32(-8)),
            ("symbol", NativeValue::string("ACME")),
            ("venue", NativeValue::bytes(b"XNYS".to_vec())),
        ];
        for (name, native) in &fields {
            let fd = desc.get_field_by_name(name).unwrap();
            let c = factory.select(native.ty(), &fd);
            message.set_field(&fd, Value::try_from(c.pb_value_of(native)).unwrap());
        }
        for (name, native) in &fields {
            let fd = desc.get_field_by_name(name).unwrap();
            let c = factory.select(native.ty(), &fd);
            let value = ProtoValue::try_from(&*message.get_field(&fd)).unwrap();
            assert_eq!(&c.go_value_of(&value), native, "{name}");
        }
    }
}
