//! PostgreSQL cart store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::info;

use crate::config::StoreConfig;
use crate::domain::errors::StoreError;
use crate::domain::ports::CartStore;
use crate::domain::records::{CartItem, CartRecord};
use crate::domain::value_objects::{BuyerId, CartId, ItemId};

const CART_COLUMNS: &str = "id, cart_key, buyer_id, shop_id, delivery_address_id, payment_option, delivery_option, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, cart_id, vendor_id, shop_id, variant_id, quantity, checked, unit_price, sale_price, title, short_title, image, product_code";

const INSERT_CART_SQL: &str = "INSERT INTO carts (cart_key, buyer_id, shop_id, delivery_address_id, payment_option, delivery_option, created_at, updated_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id";
const UPSERT_CART_SQL: &str = "INSERT INTO carts (id, cart_key, buyer_id, shop_id, delivery_address_id, payment_option, delivery_option, created_at, updated_at) \
     VALUES ($9, $1, $2, $3, $4, $5, $6, $7, $8) \
     ON CONFLICT (id) DO UPDATE SET buyer_id = EXCLUDED.buyer_id, shop_id = EXCLUDED.shop_id, \
     delivery_address_id = EXCLUDED.delivery_address_id, payment_option = EXCLUDED.payment_option, \
     delivery_option = EXCLUDED.delivery_option, updated_at = EXCLUDED.updated_at RETURNING id";
const INSERT_ITEM_SQL: &str = "INSERT INTO cart_items (cart_id, vendor_id, shop_id, variant_id, quantity, checked, unit_price, sale_price, title, short_title, image, product_code) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id";
const UPSERT_ITEM_SQL: &str = "INSERT INTO cart_items (id, cart_id, vendor_id, shop_id, variant_id, quantity, checked, unit_price, sale_price, title, short_title, image, product_code) \
     VALUES ($13, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
     ON CONFLICT (id) DO UPDATE SET quantity = EXCLUDED.quantity, checked = EXCLUDED.checked, \
     unit_price = EXCLUDED.unit_price, sale_price = EXCLUDED.sale_price, title = EXCLUDED.title, \
     short_title = EXCLUDED.short_title, image = EXCLUDED.image, product_code = EXCLUDED.product_code RETURNING id";

#[derive(FromRow)]
struct CartRow {
    id: i64,
    cart_key: String,
    buyer_id: i64,
    shop_id: i64,
    delivery_address_id: i64,
    payment_option: i32,
    delivery_option: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CartRow {
    fn into_record(self, items: Vec<CartItem>) -> CartRecord {
        CartRecord {
            id: self.id.into(),
            key: self.cart_key,
            buyer_id: self.buyer_id.into(),
            shop_id: self.shop_id.into(),
            delivery_address_id: self.delivery_address_id.into(),
            payment_option: self.payment_option,
            delivery_option: self.delivery_option,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ItemRow {
    id: i64,
    cart_id: i64,
    vendor_id: i64,
    shop_id: i64,
    variant_id: i64,
    quantity: i32,
    checked: bool,
    unit_price: Decimal,
    sale_price: Decimal,
    title: String,
    short_title: String,
    image: String,
    product_code: String,
}

impl TryFrom<ItemRow> for CartItem {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .map_err(|_| StoreError::Corrupt(format!("cart item {} has quantity {}", row.id, row.quantity)))?;
        Ok(Self {
            id: row.id.into(),
            cart_id: row.cart_id.into(),
            vendor_id: row.vendor_id.into(),
            shop_id: row.shop_id.into(),
            variant_id: row.variant_id.into(),
            quantity,
            checked: row.checked,
            unit_price: row.unit_price,
            sale_price: row.sale_price,
            title: row.title,
            short_title: row.short_title,
            image: row.image,
            product_code: row.product_code,
        })
    }
}

#[derive(Clone, Debug)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    /// Connects a pool per `config` and applies pending migrations.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(max_connections = config.max_connections, "cart store connected");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool { &self.pool }

    async fn with_items(&self, row: Option<CartRow>) -> Result<Option<CartRecord>, StoreError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let items = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 ORDER BY id"
        ))
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(CartItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(row.into_record(items)))
    }
}

fn db_quantity(item: &CartItem) -> Result<i32, StoreError> {
    i32::try_from(item.quantity)
        .map_err(|_| StoreError::Corrupt(format!("quantity {} out of range", item.quantity)))
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn save_cart(&self, cart: &CartRecord) -> Result<CartId, StoreError> {
        let sql = if cart.id.is_set() { UPSERT_CART_SQL } else { INSERT_CART_SQL };
        let mut query = sqlx::query_scalar::<_, i64>(sql)
            .bind(&cart.key)
            .bind(cart.buyer_id.get())
            .bind(cart.shop_id.get())
            .bind(cart.delivery_address_id.get())
            .bind(cart.payment_option)
            .bind(cart.delivery_option)
            .bind(cart.created_at)
            .bind(cart.updated_at);
        if cart.id.is_set() {
            query = query.bind(cart.id.get());
        }
        Ok(query.fetch_one(&self.pool).await?.into())
    }

    async fn save_item(&self, item: &CartItem) -> Result<ItemId, StoreError> {
        let sql = if item.id.is_set() { UPSERT_ITEM_SQL } else { INSERT_ITEM_SQL };
        let mut query = sqlx::query_scalar::<_, i64>(sql)
            .bind(item.cart_id.get())
            .bind(item.vendor_id.get())
            .bind(item.shop_id.get())
            .bind(item.variant_id.get())
            .bind(db_quantity(item)?)
            .bind(item.checked)
            .bind(item.unit_price)
            .bind(item.sale_price)
            .bind(&item.title)
            .bind(&item.short_title)
            .bind(&item.image)
            .bind(&item.product_code);
        if item.id.is_set() {
            query = query.bind(item.id.get());
        }
        Ok(query.fetch_one(&self.pool).await?.into())
    }

    async fn delete_item(&self, item_id: ItemId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(item_id.get())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all_items(&self, cart_id: CartId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.get())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_cart(&self, cart_id: CartId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(cart_id.get())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_current_cart_for_buyer(
        &self,
        buyer_id: BuyerId,
    ) -> Result<Option<CartRecord>, StoreError> {
        if !buyer_id.is_set() {
            return Ok(None);
        }
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE buyer_id = $1 ORDER BY updated_at DESC, id DESC LIMIT 1"
        ))
        .bind(buyer_id.get())
        .fetch_optional(&self.pool)
        .await?;
        self.with_items(row).await
    }

    async fn find_cart(&self, cart_id: CartId) -> Result<Option<CartRecord>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(&format!("SELECT {CART_COLUMNS} FROM carts WHERE id = $1"))
            .bind(cart_id.get())
            .fetch_optional(&self.pool)
            .await?;
        self.with_items(row).await
    }

    async fn find_cart_by_key(&self, key: &str) -> Result<Option<CartRecord>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(&format!("SELECT {CART_COLUMNS} FROM carts WHERE cart_key = $1"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        self.with_items(row).await
    }
}
