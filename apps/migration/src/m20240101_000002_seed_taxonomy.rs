use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(
            "INSERT INTO categories (name) VALUES ('Actualités'), ('Tutoriels'), ('Divers')",
        )
        .await?;
        db.execute_unprepared(
            "INSERT INTO tags (name) VALUES ('rust'), ('web'), ('base de données'), ('sécurité')",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared("DELETE FROM post_tag").await?;
        db.execute_unprepared("UPDATE posts SET category_id = NULL").await?;
        db.execute_unprepared("DELETE FROM tags").await?;
        db.execute_unprepared("DELETE FROM categories").await?;

        Ok(())
    }
}
