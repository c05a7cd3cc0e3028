use rusqlite::{params, Connection, OptionalExtension};

use super::{bool_at, fmt_opt_date, opt_date_at};
use crate::db::now_timestamp;
use crate::models::{Banner, Product};

// ── Products ──

const PRODUCT_COLUMNS: &str =
    "id, name, description, market_price, discount_price, image_url, is_active, sort_order";

fn parse_product_row(row: &rusqlite::Row) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        market_price: row.get(3)?,
        discount_price: row.get(4)?,
        image_url: row.get(5)?,
        is_active: bool_at(row, 6)?,
        sort_order: row.get(7)?,
    })
}

pub fn list_products(conn: &Connection, active_only: bool) -> anyhow::Result<Vec<Product>> {
    let sql = if active_only {
        format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY sort_order ASC, created_at ASC")
    } else {
        format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY sort_order ASC, created_at ASC")
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], parse_product_row)?;

    let mut products = vec![];
    for row in rows {
        products.push(row?);
    }
    Ok(products)
}

pub fn get_product(conn: &Connection, id: &str) -> anyhow::Result<Option<Product>> {
    let product = conn
        .query_row(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
            params![id],
            parse_product_row,
        )
        .optional()?;
    Ok(product)
}

pub fn insert_product(conn: &Connection, product: &Product) -> anyhow::Result<()> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO products (id, name, description, market_price, discount_price, image_url, is_active, sort_order, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            product.id,
            product.name,
            product.description,
            product.market_price,
            product.discount_price,
            product.image_url,
            product.is_active as i32,
            product.sort_order,
            now,
        ],
    )?;
    Ok(())
}

pub fn update_product(conn: &Connection, product: &Product) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE products SET
           name = ?1, description = ?2, market_price = ?3, discount_price = ?4,
           image_url = ?5, is_active = ?6, sort_order = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            product.name,
            product.description,
            product.market_price,
            product.discount_price,
            product.image_url,
            product.is_active as i32,
            product.sort_order,
            now_timestamp(),
            product.id,
        ],
    )?;
    Ok(count > 0)
}

/// Products are referenced by booking snapshots, so removal only hides them.
pub fn deactivate_product(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE products SET is_active = 0, updated_at = ?1 WHERE id = ?2",
        params![now_timestamp(), id],
    )?;
    Ok(count > 0)
}

// ── Banners ──

const BANNER_COLUMNS: &str =
    "id, title, image_url, link_url, sort_order, is_active, starts_at, ends_at";

fn parse_banner_row(row: &rusqlite::Row) -> rusqlite::Result<Banner> {
    Ok(Banner {
        id: row.get(0)?,
        title: row.get(1)?,
        image_url: row.get(2)?,
        link_url: row.get(3)?,
        sort_order: row.get(4)?,
        is_active: bool_at(row, 5)?,
        starts_at: opt_date_at(row, 6)?,
        ends_at: opt_date_at(row, 7)?,
    })
}

pub fn list_banners(conn: &Connection) -> anyhow::Result<Vec<Banner>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BANNER_COLUMNS} FROM banners ORDER BY sort_order ASC, created_at DESC"
    ))?;
    let rows = stmt.query_map([], parse_banner_row)?;

    let mut banners = vec![];
    for row in rows {
        banners.push(row?);
    }
    Ok(banners)
}

pub fn insert_banner(conn: &Connection, banner: &Banner) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO banners (id, title, image_url, link_url, sort_order, is_active, starts_at, ends_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            banner.id,
            banner.title,
            banner.image_url,
            banner.link_url,
            banner.sort_order,
            banner.is_active as i32,
            fmt_opt_date(&banner.starts_at),
            fmt_opt_date(&banner.ends_at),
        ],
    )?;
    Ok(())
}

pub fn update_banner(conn: &Connection, banner: &Banner) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE banners SET
           title = ?1, image_url = ?2, link_url = ?3, sort_order = ?4,
           is_active = ?5, starts_at = ?6, ends_at = ?7
         WHERE id = ?8",
        params![
            banner.title,
            banner.image_url,
            banner.link_url,
            banner.sort_order,
            banner.is_active as i32,
            fmt_opt_date(&banner.starts_at),
            fmt_opt_date(&banner.ends_at),
            banner.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_banner(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM banners WHERE id = ?1", params![id])?;
    Ok(count > 0)
}
