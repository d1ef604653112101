//! Converter pipeline behaviour as seen through property bags.
//!
//! Run with:
//!   cargo test --test converters

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;

use jsonbag::serialization::{LocaleTagConverter, StringEnumConverter};
use jsonbag::{
    EnumPolicy, LocaleTag, NamingPolicy, OptionsConfig, PropertyBagFactory, PropertyValue,
    SerializerOptions, SerializerOptionsBuilder, Timestamp,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn factory_with(options: Arc<SerializerOptions>) -> PropertyBagFactory {
    init_logging();
    PropertyBagFactory::new(options)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
enum OrderStatus {
    AwaitingPayment,
    Shipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum Channel {
    WebStore,
    PhoneOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Order {
    status: OrderStatus,
    channel: Channel,
    placed_at: Timestamp,
    locale: Option<LocaleTag>,
}

const ISO: &str = "2009-06-15T13:45:30.0000000-07:00";
const UNIX_MILLIS: i64 = 1_245_098_730_000;

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

#[test]
fn timestamp_reads_both_shapes_as_same_instant() -> Result<()> {
    let factory = factory_with(SerializerOptions::builder().add_timestamp_converter().build());
    let bag = factory.create_from_str(&format!(
        concat!(
            r#"{{"bare":"{iso}","#,
            r#""object":{{"dateTimeOffset":"{iso}","unixTime":{ms}}},"#,
            r#""reordered":{{"unixTime":0,"dateTimeOffset":"{iso}"}}}}"#
        ),
        iso = ISO,
        ms = UNIX_MILLIS
    ))?;

    let bare = bag.try_get::<Timestamp>("bare")?.unwrap();
    let object = bag.try_get::<Timestamp>("object")?.unwrap();
    let reordered = bag.try_get::<Timestamp>("reordered")?.unwrap();

    assert_eq!(bare, object);
    assert_eq!(bare, reordered);
    assert_eq!(bare.unix_time_millis(), UNIX_MILLIS);
    assert_eq!(bare.offset().local_minus_utc(), -7 * 3600);
    Ok(())
}

#[test]
fn timestamp_always_writes_object_shape() -> Result<()> {
    let factory = factory_with(SerializerOptions::builder().add_timestamp_converter().build());
    let stamp = Timestamp::parse(ISO)?;
    let bag = factory.create([("at", stamp)])?;

    assert_eq!(
        factory.as_json_value(&bag)?,
        json!({ "at": { "dateTimeOffset": "2009-06-15T13:45:30-07:00", "unixTime": UNIX_MILLIS } })
    );
    assert_eq!(bag.try_get::<Timestamp>("at")?, Some(stamp));
    Ok(())
}

#[test]
fn timestamp_without_converter_is_a_string() -> Result<()> {
    let factory = factory_with(SerializerOptions::builder().build());
    let bag = factory.create([("at", Timestamp::parse(ISO)?)])?;
    assert_eq!(bag.as_str(), r#"{"at":"2009-06-15T13:45:30-07:00"}"#);
    Ok(())
}

// ---------------------------------------------------------------------------
// Locale tags
// ---------------------------------------------------------------------------

#[test]
fn locale_tags_round_trip_and_null() -> Result<()> {
    let factory = factory_with(SerializerOptions::builder().add_locale_tag_converter().build());
    let tag = LocaleTag::parse("en-US")?;
    let none: Option<LocaleTag> = None;
    let bag = factory.create([
        ("culture", PropertyValue::from(tag.clone())),
        ("missing", PropertyValue::from(none)),
    ])?;

    assert_eq!(bag.as_str(), r#"{"culture":"en-US","missing":null}"#);
    assert_eq!(bag.try_get::<LocaleTag>("culture")?, Some(tag));
    assert_eq!(bag.try_get::<Option<LocaleTag>>("missing")?, Some(None));
    Ok(())
}

#[test]
fn locale_converter_registered_once() {
    let options = SerializerOptions::builder()
        .add_locale_tag_converter()
        .add_locale_tag_converter()
        .add_converter(LocaleTagConverter)
        .build();
    assert_eq!(options.converters().len(), 2);
}

// ---------------------------------------------------------------------------
// Enum policies
// ---------------------------------------------------------------------------

fn order() -> Result<Order> {
    Ok(Order {
        status: OrderStatus::AwaitingPayment,
        channel: Channel::WebStore,
        placed_at: Timestamp::parse(ISO)?,
        locale: Some(LocaleTag::parse("fr-CA")?),
    })
}

#[test]
fn specific_enum_policy_registered_first_wins() -> Result<()> {
    let options = SerializerOptions::builder()
        .add_enum_policy(EnumPolicy::pascal_case::<OrderStatus>())
        .add_converter(StringEnumConverter::new(Some(NamingPolicy::CamelCase), false))
        .build();
    let factory = factory_with(options);

    let bag = factory.create([("order", order()?)])?;
    let node = factory.as_json_value(&bag)?;
    assert_eq!(node["order"]["status"], "AwaitingPayment");
    assert_eq!(node["order"]["channel"], "webStore");
    assert_eq!(bag.try_get::<Order>("order")?, Some(order()?));
    Ok(())
}

#[test]
fn global_enum_converter_registered_first_wins() -> Result<()> {
    let options = SerializerOptions::builder()
        .add_converter(StringEnumConverter::new(Some(NamingPolicy::CamelCase), false))
        .add_enum_policy(EnumPolicy::pascal_case::<OrderStatus>())
        .build();
    let factory = factory_with(options);

    let bag = factory.create([("order", order()?)])?;
    let node = factory.as_json_value(&bag)?;
    assert_eq!(node["order"]["status"], "awaitingPayment");
    assert_eq!(node["order"]["channel"], "webStore");
    assert_eq!(bag.try_get::<Order>("order")?, Some(order()?));
    Ok(())
}

#[test]
fn enum_integer_values_follow_policy() -> Result<()> {
    let options = SerializerOptions::builder()
        .add_enum_policy(EnumPolicy::for_type::<OrderStatus>(None, true))
        .add_enum_policy(EnumPolicy::for_type::<Channel>(None, false))
        .build();
    let factory = factory_with(options);
    let bag = factory.create_from_str(r#"{"status":1,"channel":1}"#)?;

    assert_eq!(bag.try_get::<OrderStatus>("status")?, Some(OrderStatus::Shipped));
    assert!(bag.try_get::<Channel>("channel").is_err());
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Delivery {
    Pickup,
    Courier { tracking_code: String },
    Locker(u32),
}

#[test]
fn data_carrying_variants_survive_enum_converter() -> Result<()> {
    let options = SerializerOptions::builder()
        .add_converter(StringEnumConverter::new(Some(NamingPolicy::CamelCase), false))
        .build();
    let factory = factory_with(options);
    let courier = Delivery::Courier {
        tracking_code: "ZX9".into(),
    };
    let bag = factory.create([
        ("pickup", PropertyValue::from(Delivery::Pickup)),
        ("courier", PropertyValue::from(courier.clone())),
        ("locker", PropertyValue::from(Delivery::Locker(12))),
    ])?;

    assert_eq!(
        bag.as_str(),
        r#"{"courier":{"Courier":{"trackingCode":"ZX9"}},"locker":{"Locker":12},"pickup":"pickup"}"#
    );
    assert_eq!(bag.try_get::<Delivery>("pickup")?, Some(Delivery::Pickup));
    assert_eq!(bag.try_get::<Delivery>("courier")?, Some(courier));
    assert_eq!(bag.try_get::<Delivery>("locker")?, Some(Delivery::Locker(12)));
    Ok(())
}

#[test]
fn enum_keyed_maps_round_trip_under_dictionary_policy() -> Result<()> {
    let counts = BTreeMap::from([(OrderStatus::AwaitingPayment, 2_u32), (OrderStatus::Shipped, 5)]);

    let factory = factory_with(SerializerOptions::builder().build());
    let bag = factory.create([("counts", counts.clone())])?;
    assert_eq!(bag.as_str(), r#"{"counts":{"awaitingPayment":2,"shipped":5}}"#);
    assert_eq!(bag.try_get::<BTreeMap<OrderStatus, u32>>("counts")?, Some(counts.clone()));

    let factory = factory_with(
        SerializerOptions::builder()
            .add_enum_policy(EnumPolicy::pascal_case::<OrderStatus>())
            .build(),
    );
    let bag = factory.create([("counts", counts.clone())])?;
    assert_eq!(bag.as_str(), r#"{"counts":{"awaitingPayment":2,"shipped":5}}"#);
    assert_eq!(bag.try_get::<BTreeMap<OrderStatus, u32>>("counts")?, Some(counts));
    Ok(())
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn options_from_config_change_naming() -> Result<()> {
    let config: OptionsConfig = serde_json::from_value(json!({
        "property_naming_policy": "snake_case_upper",
        "ignore_null_values": false,
        "allow_trailing_commas": true
    }))?;
    let factory = factory_with(
        SerializerOptionsBuilder::from_config(&config)
            .add_locale_tag_converter()
            .build(),
    );

    #[derive(Serialize)]
    struct Profile {
        display_name: String,
        locale: Option<LocaleTag>,
    }

    let bag = factory.create([(
        "profile",
        Profile {
            display_name: "Ada".into(),
            locale: None,
        },
    )])?;
    assert_eq!(bag.as_str(), r#"{"profile":{"DISPLAY_NAME":"Ada","LOCALE":null}}"#);

    let relaxed = factory.create_from_str(r#"{"a":[1,2,],}"#)?;
    assert_eq!(relaxed.as_str(), r#"{"a":[1,2]}"#);
    Ok(())
}
