//! Menu repository
//!
//! Sub menus are owned by their menu and always written as a whole set.

use crate::db::DynDatabasePool;
use crate::models::{Menu, SubMenu};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use std::sync::Arc;

#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn create(&self, menu: &Menu) -> Result<Menu>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Menu>>;

    /// Menus with sub menus, by display order
    async fn list(&self) -> Result<Vec<Menu>>;

    /// Update the menu row and replace its sub menus
    async fn update(&self, menu: &Menu) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;
}

pub struct SqlxMenuRepository {
    pool: DynDatabasePool,
}

impl SqlxMenuRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MenuRepository> {
        Arc::new(Self::new(pool))
    }

    async fn load_sub_menus(&self, menu_id: i64) -> Result<Vec<SubMenu>> {
        let rows = sqlx::query(
            "SELECT id, title, url, is_open_in_new_tab FROM sub_menus WHERE menu_id = ? ORDER BY id",
        )
        .bind(menu_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to load sub menus")?;

        rows.iter()
            .map(|row| {
                Ok(SubMenu {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    url: row.try_get("url")?,
                    is_open_in_new_tab: row.try_get("is_open_in_new_tab")?,
                })
            })
            .collect()
    }
}

async fn insert_sub_menus(
    tx: &mut Transaction<'_, Sqlite>,
    menu_id: i64,
    sub_menus: &[SubMenu],
) -> Result<Vec<SubMenu>> {
    let mut saved = Vec::with_capacity(sub_menus.len());
    for sub in sub_menus {
        let result = sqlx::query(
            "INSERT INTO sub_menus (menu_id, title, url, is_open_in_new_tab) VALUES (?, ?, ?, ?)",
        )
        .bind(menu_id)
        .bind(&sub.title)
        .bind(&sub.url)
        .bind(sub.is_open_in_new_tab)
        .execute(&mut **tx)
        .await
        .context("Failed to insert sub menu")?;
        saved.push(SubMenu {
            id: result.last_insert_rowid(),
            ..sub.clone()
        });
    }
    Ok(saved)
}

#[async_trait]
impl MenuRepository for SqlxMenuRepository {
    async fn create(&self, menu: &Menu) -> Result<Menu> {
        let mut tx = self
            .pool
            .sqlite()
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let result = sqlx::query(
            "INSERT INTO menus (title, url, icon, display_order, is_open_in_new_tab) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&menu.title)
        .bind(&menu.url)
        .bind(&menu.icon)
        .bind(menu.display_order)
        .bind(menu.is_open_in_new_tab)
        .execute(&mut *tx)
        .await
        .context("Failed to create menu")?;

        let id = result.last_insert_rowid();
        let sub_menus = insert_sub_menus(&mut tx, id, &menu.sub_menus).await?;
        tx.commit().await.context("Failed to commit menu")?;

        Ok(Menu {
            id,
            sub_menus,
            ..menu.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Menu>> {
        let row = sqlx::query(
            "SELECT id, title, url, icon, display_order, is_open_in_new_tab FROM menus WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get menu")?;

        match row {
            Some(row) => {
                let mut menu = row_to_menu(&row)?;
                menu.sub_menus = self.load_sub_menus(menu.id).await?;
                Ok(Some(menu))
            }
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Menu>> {
        let rows = sqlx::query(
            "SELECT id, title, url, icon, display_order, is_open_in_new_tab FROM menus ORDER BY display_order, id",
        )
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list menus")?;

        let mut menus = rows.iter().map(row_to_menu).collect::<Result<Vec<_>>>()?;
        for menu in menus.iter_mut() {
            menu.sub_menus = self.load_sub_menus(menu.id).await?;
        }
        Ok(menus)
    }

    async fn update(&self, menu: &Menu) -> Result<()> {
        let mut tx = self
            .pool
            .sqlite()
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query(
            "UPDATE menus SET title = ?, url = ?, icon = ?, display_order = ?, is_open_in_new_tab = ? WHERE id = ?",
        )
        .bind(&menu.title)
        .bind(&menu.url)
        .bind(&menu.icon)
        .bind(menu.display_order)
        .bind(menu.is_open_in_new_tab)
        .bind(menu.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update menu")?;

        sqlx::query("DELETE FROM sub_menus WHERE menu_id = ?")
            .bind(menu.id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear sub menus")?;
        insert_sub_menus(&mut tx, menu.id, &menu.sub_menus).await?;

        tx.commit().await.context("Failed to commit menu")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM menus WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete menu")?;
        Ok(())
    }
}

fn row_to_menu(row: &SqliteRow) -> Result<Menu> {
    Ok(Menu {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        icon: row.try_get("icon")?,
        display_order: row.try_get("display_order")?,
        is_open_in_new_tab: row.try_get("is_open_in_new_tab")?,
        sub_menus: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    fn sample_menu(title: &str, order: i64, subs: Vec<SubMenu>) -> Menu {
        Menu {
            id: 0,
            title: title.to_string(),
            url: "/".to_string(),
            icon: None,
            display_order: order,
            is_open_in_new_tab: false,
            sub_menus: subs,
        }
    }

    #[tokio::test]
    async fn test_menu_with_sub_menus() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxMenuRepository::new(pool.clone());

        let menu = repo
            .create(&sample_menu("Docs", 2, vec![SubMenu::new("API", "/api"), SubMenu::new("Guide", "/guide")]))
            .await
            .unwrap();
        repo.create(&sample_menu("Home", 1, vec![])).await.unwrap();

        let menus = repo.list().await.unwrap();
        assert_eq!(menus[0].title, "Home");
        assert_eq!(menus[1].sub_menus.len(), 2);

        let mut changed = menu.clone();
        changed.sub_menus = vec![SubMenu::new("Only", "/only")];
        repo.update(&changed).await.unwrap();
        let fetched = repo.get_by_id(menu.id).await.unwrap().unwrap();
        assert_eq!(fetched.sub_menus.len(), 1);
        assert_eq!(fetched.sub_menus[0].title, "Only");

        repo.delete(menu.id).await.unwrap();
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sub_menus")
            .fetch_one(pool.sqlite())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
