use super::{OrderRepository, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Delivery, Item, Order, Payment};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, info};

#[derive(Debug, FromRow)]
struct OrderRow {
    order_uid: String,
    track_number: String,
    entry: String,
    locale: String,
    internal_signature: String,
    customer_id: String,
    delivery_service: String,
    shardkey: String,
    sm_id: i32,
    date_created: DateTime<Utc>,
    oof_shard: String,
}

#[derive(Debug, FromRow)]
struct DeliveryRow {
    name: String,
    phone: String,
    zip: String,
    city: String,
    address: String,
    region: String,
    email: String,
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    transaction: String,
    request_id: String,
    currency: String,
    provider: String,
    amount: i32,
    payment_dt: i64,
    bank: String,
    delivery_cost: i32,
    goods_total: i32,
    custom_fee: i32,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    chrt_id: i64,
    track_number: String,
    price: i32,
    rid: String,
    name: String,
    sale: i32,
    size: String,
    total_price: i32,
    nm_id: i64,
    brand: String,
    status: i32,
}

const ORDER_COLUMNS: &str = r#"
    order_uid, track_number, entry, locale, internal_signature, customer_id,
    delivery_service, shardkey, sm_id, date_created, oof_shard
"#;

/// PostgreSQL implementation of the order repository
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the database pool (useful for testing)
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled schema migrations
    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        info!("Running order schema migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.into()))?;
        Ok(())
    }

    async fn load_aggregate(
        conn: &mut PgConnection,
        row: OrderRow,
    ) -> Result<Order, RepositoryError> {
        let delivery = sqlx::query_as::<_, DeliveryRow>(
            r#"
            SELECT name, phone, zip, city, address, region, email
            FROM deliveries
            WHERE order_uid = $1
            "#,
        )
        .bind(&row.order_uid)
        .fetch_one(&mut *conn)
        .await?;

        let payment = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT transaction, request_id, currency, provider, amount, payment_dt,
                   bank, delivery_cost, goods_total, custom_fee
            FROM payments
            WHERE order_uid = $1
            "#,
        )
        .bind(&row.order_uid)
        .fetch_one(&mut *conn)
        .await?;

        let items = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT chrt_id, track_number, price, rid, name, sale, size,
                   total_price, nm_id, brand, status
            FROM items
            WHERE order_uid = $1
            ORDER BY id ASC
            "#,
        )
        .bind(&row.order_uid)
        .fetch_all(&mut *conn)
        .await?;

        Ok(assemble(row, delivery, payment, items))
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn get_order(&self, order_uid: &str) -> Result<Order, RepositoryError> {
        debug!("Loading order {}", order_uid);

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_uid = $1"
        ))
        .bind(order_uid)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(order_uid.to_string()))?;

        let order = Self::load_aggregate(&mut *tx, row).await?;

        tx.commit().await?;

        Ok(order)
    }

    async fn create_order(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(&order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shard_key)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            // Dropping the transaction rolls it back
            return Err(match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    debug!("Order {} already exists", order.order_uid);
                    RepositoryError::AlreadyExists(order.order_uid.clone())
                }
                other => {
                    error!("Failed to insert order {}: {}", order.order_uid, other);
                    RepositoryError::Database(other)
                }
            });
        }

        sqlx::query(
            r#"
            INSERT INTO deliveries (order_uid, name, phone, zip, city, address, region, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&order.order_uid)
        .bind(&order.delivery.name)
        .bind(&order.delivery.phone)
        .bind(&order.delivery.zip)
        .bind(&order.delivery.city)
        .bind(&order.delivery.address)
        .bind(&order.delivery.region)
        .bind(&order.delivery.email)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO payments (
                order_uid, transaction, request_id, currency, provider, amount,
                payment_dt, bank, delivery_cost, goods_total, custom_fee
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&order.order_uid)
        .bind(&order.payment.transaction)
        .bind(&order.payment.request_id)
        .bind(&order.payment.currency)
        .bind(&order.payment.provider)
        .bind(order.payment.amount)
        .bind(order.payment.payment_dt)
        .bind(&order.payment.bank)
        .bind(order.payment.delivery_cost)
        .bind(order.payment.goods_total)
        .bind(order.payment.custom_fee)
        .execute(&mut *tx)
        .await?;

        if !order.items.is_empty() {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO items (order_uid, chrt_id, track_number, price, rid, name, sale, size, total_price, nm_id, brand, status) ",
            );
            builder.push_values(order.items.iter(), |mut b, item| {
                b.push_bind(&order.order_uid)
                    .push_bind(item.chrt_id)
                    .push_bind(&item.track_number)
                    .push_bind(item.price)
                    .push_bind(&item.rid)
                    .push_bind(&item.name)
                    .push_bind(item.sale)
                    .push_bind(&item.size)
                    .push_bind(item.total_price)
                    .push_bind(item.nm_id)
                    .push_bind(&item.brand)
                    .push_bind(item.status);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        info!(
            "Persisted order {} with {} items",
            order.order_uid,
            order.items.len()
        );

        Ok(())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY date_created DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(Self::load_aggregate(&mut *tx, row).await?);
        }

        tx.commit().await?;

        debug!("Loaded {} recent orders (limit {})", orders.len(), limit);

        Ok(orders)
    }
}

fn assemble(row: OrderRow, delivery: DeliveryRow, payment: PaymentRow, items: Vec<ItemRow>) -> Order {
    Order {
        order_uid: row.order_uid,
        track_number: row.track_number,
        entry: row.entry,
        delivery: Delivery {
            name: delivery.name,
            phone: delivery.phone,
            zip: delivery.zip,
            city: delivery.city,
            address: delivery.address,
            region: delivery.region,
            email: delivery.email,
        },
        payment: Payment {
            transaction: payment.transaction,
            request_id: payment.request_id,
            currency: payment.currency,
            provider: payment.provider,
            amount: payment.amount,
            payment_dt: payment.payment_dt,
            bank: payment.bank,
            delivery_cost: payment.delivery_cost,
            goods_total: payment.goods_total,
            custom_fee: payment.custom_fee,
        },
        items: items
            .into_iter()
            .map(|i| Item {
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
            })
            .collect(),
        locale: row.locale,
        internal_signature: row.internal_signature,
        customer_id: row.customer_id,
        delivery_service: row.delivery_service,
        shard_key: row.shardkey,
        sm_id: row.sm_id,
        date_created: row.date_created,
        oof_shard: row.oof_shard,
    }
}
