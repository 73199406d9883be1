//! Well-formed sample orders shared by tests across the workspace.

use chrono::{TimeZone, Utc};

use crate::models::order::Order;
use crate::payloads::order_payload::{DeliveryPayload, ItemPayload, OrderPayload, PaymentPayload};

/// A payload that passes every schema rule, keyed by `order_uid`.
pub fn sample_payload(order_uid: &str) -> OrderPayload {
    let track_number = "WBILMTESTTRACK".to_string();

    OrderPayload {
        order_uid: order_uid.to_string(),
        track_number: track_number.clone(),
        entry: "WBIL".to_string(),
        delivery: DeliveryPayload {
            name: "Test Testov".to_string(),
            phone: "+9720000000".to_string(),
            zip: "2639809".to_string(),
            city: "Kiryat Mozkin".to_string(),
            address: "Ploshad Mira 15".to_string(),
            region: "Kraiot".to_string(),
            email: "test@gmail.com".to_string(),
        },
        payment: PaymentPayload {
            transaction: order_uid.to_string(),
            request_id: String::new(),
            currency: "USD".to_string(),
            provider: "wbpay".to_string(),
            amount: 1817,
            payment_dt: 1637907727,
            bank: "alpha".to_string(),
            delivery_cost: 1500,
            goods_total: 317,
            custom_fee: 0,
        },
        items: vec![ItemPayload {
            chrt_id: 9934930,
            track_number,
            price: 453,
            rid: "ab4219087a764ae0btest".to_string(),
            name: "Mascaras".to_string(),
            sale: 30,
            size: "0".to_string(),
            total_price: 317,
            nm_id: 2389212,
            brand: "Vivienne Sabo".to_string(),
            status: 202,
        }],
        locale: "en".to_string(),
        internal_signature: String::new(),
        customer_id: "test".to_string(),
        delivery_service: "meest".to_string(),
        shardkey: "9".to_string(),
        sm_id: 99,
        date_created: Utc
            .with_ymd_and_hms(2021, 11, 26, 6, 22, 19)
            .single()
            .unwrap_or_default(),
        oof_shard: "1".to_string(),
    }
}

/// The aggregate form of [`sample_payload`].
pub fn sample_order(order_uid: &str) -> Order {
    Order::from(sample_payload(order_uid))
}

/// Same as [`sample_order`] with an explicit creation time, for ordering tests.
pub fn sample_order_created_at(order_uid: &str, unix_seconds: i64) -> Order {
    let mut order = sample_order(order_uid);
    order.date_created = Utc.timestamp_opt(unix_seconds, 0).single().unwrap_or_default();
    order
}
