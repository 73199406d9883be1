use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::order::{Delivery, Item, Order, Payment};

lazy_static! {
    static ref ZIP_CODE: Regex = Regex::new(r"^[0-9]{5,8}$").expect("valid zip regex");
    static ref CURRENCY_CODE: Regex = Regex::new(r"^[A-Z]{3}$").expect("valid currency regex");
    static ref LANGUAGE_TAG: Regex =
        Regex::new(r"^[a-zA-Z]{2,3}(-[a-zA-Z0-9]{2,8})*$").expect("valid language tag regex");
}

/// Order as published on the orders topic.
///
/// Absent fields decode to zero values; field rules are enforced separately
/// through [`Validate`] so a consumer can decide what to do with a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct OrderPayload {
    #[validate(length(min = 1, max = 40, message = "order_uid is required (max 40)"))]
    pub order_uid: String,

    #[validate(length(min = 1, max = 40))]
    pub track_number: String,

    #[validate(length(min = 1, max = 40))]
    pub entry: String,

    #[validate(nested)]
    pub delivery: DeliveryPayload,

    #[validate(nested)]
    pub payment: PaymentPayload,

    #[validate(length(min = 1, message = "Order must have at least one item"), nested)]
    pub items: Vec<ItemPayload>,

    #[validate(regex(path = *LANGUAGE_TAG, message = "locale must be a language tag"))]
    pub locale: String,

    #[validate(length(max = 40))]
    pub internal_signature: String,

    #[validate(length(min = 1, max = 40))]
    pub customer_id: String,

    #[validate(length(min = 1, max = 40))]
    pub delivery_service: String,

    #[validate(length(min = 1, max = 40))]
    pub shardkey: String,

    #[validate(range(min = 1, message = "sm_id is required"))]
    pub sm_id: i32,

    pub date_created: DateTime<Utc>,

    #[validate(length(min = 1, max = 40))]
    pub oof_shard: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DeliveryPayload {
    #[validate(length(min = 1, max = 60))]
    pub name: String,

    #[validate(length(min = 1, message = "Phone cannot be empty"))]
    pub phone: String,

    #[validate(regex(path = *ZIP_CODE, message = "zip must be 5 to 8 digits"))]
    pub zip: String,

    #[validate(length(min = 3, max = 50))]
    pub city: String,

    #[validate(length(min = 3, max = 100))]
    pub address: String,

    #[validate(length(min = 3, max = 50))]
    pub region: String,

    #[validate(email(message = "email is not valid"))]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PaymentPayload {
    #[validate(length(min = 1, max = 40))]
    pub transaction: String,

    #[validate(length(max = 40))]
    pub request_id: String,

    #[validate(regex(path = *CURRENCY_CODE, message = "currency must be an ISO 4217 code"))]
    pub currency: String,

    #[validate(length(min = 1, max = 20))]
    pub provider: String,

    #[validate(range(min = 1))]
    pub amount: i32,

    #[validate(range(min = 1))]
    pub payment_dt: i64,

    #[validate(length(min = 1, max = 20))]
    pub bank: String,

    #[validate(range(min = 0))]
    pub delivery_cost: i32,

    #[validate(range(min = 1))]
    pub goods_total: i32,

    #[validate(range(min = 0))]
    pub custom_fee: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ItemPayload {
    #[validate(range(min = 1))]
    pub chrt_id: i64,

    #[validate(length(min = 1))]
    pub track_number: String,

    #[validate(range(min = 1))]
    pub price: i32,

    #[validate(length(min = 1, max = 40))]
    pub rid: String,

    #[validate(length(min = 1, max = 40))]
    pub name: String,

    #[validate(range(min = 0, max = 100))]
    pub sale: i32,

    #[validate(length(min = 1))]
    pub size: String,

    #[validate(range(min = 1))]
    pub total_price: i32,

    #[validate(range(min = 1))]
    pub nm_id: i64,

    #[validate(length(min = 1, max = 100))]
    pub brand: String,

    #[validate(range(min = 1))]
    pub status: i32,
}

impl From<OrderPayload> for Order {
    fn from(payload: OrderPayload) -> Self {
        Self {
            order_uid: payload.order_uid,
            track_number: payload.track_number,
            entry: payload.entry,
            delivery: payload.delivery.into(),
            payment: payload.payment.into(),
            items: payload.items.into_iter().map(Item::from).collect(),
            locale: payload.locale,
            internal_signature: payload.internal_signature,
            customer_id: payload.customer_id,
            delivery_service: payload.delivery_service,
            shard_key: payload.shardkey,
            sm_id: payload.sm_id,
            date_created: payload.date_created,
            oof_shard: payload.oof_shard,
        }
    }
}

impl From<DeliveryPayload> for Delivery {
    fn from(d: DeliveryPayload) -> Self {
        Self {
            name: d.name,
            phone: d.phone,
            zip: d.zip,
            city: d.city,
            address: d.address,
            region: d.region,
            email: d.email,
        }
    }
}

impl From<PaymentPayload> for Payment {
    fn from(p: PaymentPayload) -> Self {
        Self {
            transaction: p.transaction,
            request_id: p.request_id,
            currency: p.currency,
            provider: p.provider,
            amount: p.amount,
            payment_dt: p.payment_dt,
            bank: p.bank,
            delivery_cost: p.delivery_cost,
            goods_total: p.goods_total,
            custom_fee: p.custom_fee,
        }
    }
}

impl From<ItemPayload> for Item {
    fn from(i: ItemPayload) -> Self {
        Self {
            chrt_id: i.chrt_id,
            track_number: i.track_number,
            price: i.price,
            rid: i.rid,
            name: i.name,
            sale: i.sale,
            size: i.size,
            total_price: i.total_price,
            nm_id: i.nm_id,
            brand: i.brand,
            status: i.status,
        }
    }
}
