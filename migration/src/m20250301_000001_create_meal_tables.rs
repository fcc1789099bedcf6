use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Members, with created_at/updated_at from table_auto
        let table = table_auto(Members::Table)
            .col(pk_auto(Members::Id))
            .col(string_uniq(Members::Name))
            .to_owned();
        manager.create_table(table).await?;

        // Meal records. Deleting a member removes its records explicitly,
        // so the foreign key carries no cascade.
        let table = table_auto(MealRecords::Table)
            .col(pk_auto(MealRecords::Id))
            .col(integer(MealRecords::MemberId))
            .col(date(MealRecords::MealDate))
            .col(integer(MealRecords::MealCount).default(0))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_meal_record_member")
                    .from(MealRecords::Table, MealRecords::MemberId)
                    .to(Members::Table, Members::Id),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("unique_member_date")
                    .table(MealRecords::Table)
                    .col(MealRecords::MemberId)
                    .col(MealRecords::MealDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meal_record_date")
                    .table(MealRecords::Table)
                    .col(MealRecords::MealDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order to satisfy the foreign key
        manager
            .drop_table(Table::drop().table(MealRecords::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;

        Ok(())
    }
}
