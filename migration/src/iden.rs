use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
pub enum Members {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
pub enum MealRecords {
    Table,
    Id,
    MemberId,
    MealDate,
    MealCount,
}
