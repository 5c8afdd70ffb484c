//! 订单仓储
//!
//! 订单拆分存储在 orders / deliveries / payments / items 四张表中，
//! 读取时按 order_uid 重新组装。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use order_shared::error::{OrderError, Result};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use super::traits::OrderRepositoryTrait;
use crate::models::{Delivery, Item, Order, Payment};

#[derive(sqlx::FromRow)]
struct OrderRow {
    order_uid: String,
    track_number: String,
    entry: String,
    locale: String,
    internal_signature: String,
    customer_id: String,
    delivery_service: String,
    shardkey: String,
    sm_id: i64,
    date_created: DateTime<Utc>,
    oof_shard: String,
}

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    order_uid: String,
    name: String,
    phone: String,
    zip: String,
    city: String,
    address: String,
    region: String,
    email: String,
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    order_uid: String,
    transaction: String,
    request_id: String,
    currency: String,
    provider: String,
    amount: i64,
    payment_dt: i64,
    bank: String,
    delivery_cost: i64,
    goods_total: i64,
    custom_fee: i64,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    order_uid: String,
    chrt_id: i64,
    track_number: String,
    price: i64,
    rid: String,
    name: String,
    sale: i64,
    size: String,
    total_price: i64,
    nm_id: i64,
    brand: String,
    status: i64,
}

impl From<DeliveryRow> for Delivery {
    fn from(row: DeliveryRow) -> Self {
        Self {
            name: row.name,
            phone: row.phone,
            zip: row.zip,
            city: row.city,
            address: row.address,
            region: row.region,
            email: row.email,
        }
    }
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            transaction: row.transaction,
            request_id: row.request_id,
            currency: row.currency,
            provider: row.provider,
            amount: row.amount,
            payment_dt: row.payment_dt,
            bank: row.bank,
            delivery_cost: row.delivery_cost,
            goods_total: row.goods_total,
            custom_fee: row.custom_fee,
        }
    }
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            chrt_id: row.chrt_id,
            track_number: row.track_number,
            price: row.price,
            rid: row.rid,
            name: row.name,
            sale: row.sale,
            size: row.size,
            total_price: row.total_price,
            nm_id: row.nm_id,
            brand: row.brand,
            status: row.status,
        }
    }
}

impl OrderRow {
    /// 与子表记录组装成完整订单；缺少收货或支付记录视为数据损坏
    fn assemble(
        self,
        delivery: Option<Delivery>,
        payment: Option<Payment>,
        items: Vec<Item>,
    ) -> Result<Order> {
        let delivery = delivery.ok_or_else(|| {
            OrderError::Internal(format!("订单 {} 缺少收货信息", self.order_uid))
        })?;
        let payment = payment.ok_or_else(|| {
            OrderError::Internal(format!("订单 {} 缺少支付信息", self.order_uid))
        })?;

        Ok(Order {
            order_uid: self.order_uid,
            track_number: self.track_number,
            entry: self.entry,
            delivery,
            payment,
            items,
            locale: self.locale,
            internal_signature: self.internal_signature,
            customer_id: self.customer_id,
            delivery_service: self.delivery_service,
            shardkey: self.shardkey,
            sm_id: self.sm_id,
            date_created: self.date_created,
            oof_shard: self.oof_shard,
        })
    }
}

const ORDER_COLUMNS: &str = "order_uid, track_number, entry, locale, internal_signature, \
    customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard";
const DELIVERY_COLUMNS: &str = "order_uid, name, phone, zip, city, address, region, email";
const PAYMENT_COLUMNS: &str = "order_uid, transaction, request_id, currency, provider, amount, \
    payment_dt, bank, delivery_cost, goods_total, custom_fee";
const ITEM_COLUMNS: &str = "order_uid, chrt_id, track_number, price, rid, name, sale, size, \
    total_price, nm_id, brand, status";

/// PostgreSQL 订单仓储
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_order(tx: &mut Transaction<'_, Postgres>, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (order_uid, track_number, entry, locale, internal_signature,
                                customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shardkey)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_insert_error(e, &order.order_uid))?;

        let d = &order.delivery;
        sqlx::query(
            r#"
            INSERT INTO deliveries (order_uid, name, phone, zip, city, address, region, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&order.order_uid)
        .bind(&d.name)
        .bind(&d.phone)
        .bind(&d.zip)
        .bind(&d.city)
        .bind(&d.address)
        .bind(&d.region)
        .bind(&d.email)
        .execute(&mut **tx)
        .await?;

        let p = &order.payment;
        sqlx::query(
            r#"
            INSERT INTO payments (order_uid, transaction, request_id, currency, provider, amount,
                                  payment_dt, bank, delivery_cost, goods_total, custom_fee)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&order.order_uid)
        .bind(&p.transaction)
        .bind(&p.request_id)
        .bind(&p.currency)
        .bind(&p.provider)
        .bind(p.amount)
        .bind(p.payment_dt)
        .bind(&p.bank)
        .bind(p.delivery_cost)
        .bind(p.goods_total)
        .bind(p.custom_fee)
        .execute(&mut **tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO items (order_uid, chrt_id, track_number, price, rid, name, sale,
                                   size, total_price, nm_id, brand, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(&order.order_uid)
            .bind(item.chrt_id)
            .bind(&item.track_number)
            .bind(item.price)
            .bind(&item.rid)
            .bind(&item.name)
            .bind(item.sale)
            .bind(&item.size)
            .bind(item.total_price)
            .bind(item.nm_id)
            .bind(&item.brand)
            .bind(item.status)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

fn map_insert_error(err: sqlx::Error, order_uid: &str) -> OrderError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_unique_violation()
    {
        return OrderError::AlreadyExists {
            entity: "Order".to_string(),
            field: "order_uid".to_string(),
            value: order_uid.to_string(),
        };
    }
    OrderError::Database(err)
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    #[instrument(skip(self, order), fields(order_uid = %order.order_uid))]
    async fn create_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::insert_order(&mut tx, order).await?;
        tx.commit().await?;

        debug!(items = order.items.len(), "订单已写入数据库");
        Ok(())
    }

    async fn get_all_orders(&self) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY date_created, order_uid"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut deliveries: HashMap<String, Delivery> =
            sqlx::query_as::<_, DeliveryRow>(&format!("SELECT {DELIVERY_COLUMNS} FROM deliveries"))
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|row| (row.order_uid.clone(), row.into()))
                .collect();

        let mut payments: HashMap<String, Payment> =
            sqlx::query_as::<_, PaymentRow>(&format!("SELECT {PAYMENT_COLUMNS} FROM payments"))
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|row| (row.order_uid.clone(), row.into()))
                .collect();

        let mut items: HashMap<String, Vec<Item>> = HashMap::new();
        for row in sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?
        {
            items.entry(row.order_uid.clone()).or_default().push(row.into());
        }

        orders
            .into_iter()
            .map(|row| {
                let uid = row.order_uid.clone();
                row.assemble(
                    deliveries.remove(&uid),
                    payments.remove(&uid),
                    items.remove(&uid).unwrap_or_default(),
                )
            })
            .collect()
    }

    async fn get_order_by_id(&self, order_uid: &str) -> Result<Option<Order>> {
        let Some(row) = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_uid = $1"
        ))
        .bind(order_uid)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let delivery = sqlx::query_as::<_, DeliveryRow>(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE order_uid = $1"
        ))
        .bind(order_uid)
        .fetch_optional(&self.pool)
        .await?
        .map(Delivery::from);

        let payment = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_uid = $1"
        ))
        .bind(order_uid)
        .fetch_optional(&self.pool)
        .await?
        .map(Payment::from);

        let items = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE order_uid = $1 ORDER BY id"
        ))
        .bind(order_uid)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Item::from)
        .collect();

        row.assemble(delivery, payment, items).map(Some)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
