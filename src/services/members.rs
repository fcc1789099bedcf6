use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::{debug, info, warn};

use crate::entities::{meal_record, member, prelude::*};
use crate::error::MealError;

pub async fn list_members<C: ConnectionTrait>(db: &C) -> Result<Vec<member::Model>, DbErr> {
    Member::find()
        .order_by_asc(member::Column::Name)
        .all(db)
        .await
}

/// Creates a member. The name is trimmed and must be non-blank and unused
/// (exact, case-sensitive match).
pub async fn add_member<C: ConnectionTrait>(db: &C, name: &str) -> Result<member::Model, MealError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(MealError::BlankName);
    }

    let existing = Member::find()
        .filter(member::Column::Name.eq(name))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(MealError::DuplicateMember(name.to_string()));
    }

    let now = Utc::now().naive_utc();
    let new_member = member::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    debug!("Creating new member: {:?}", new_member);

    match new_member.insert(db).await {
        Ok(member) => {
            info!(member_id = member.id, name = %member.name, "member added");
            Ok(member)
        }
        // Lost a race with a concurrent insert of the same name
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(MealError::DuplicateMember(name.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

/// Deletes a member's meal records and then the member itself, in one
/// transaction. Returns the removed member's name.
pub async fn remove_member(db: &DatabaseConnection, member_id: i32) -> Result<String, MealError> {
    let txn = db.begin().await?;

    match delete_member_and_records(&txn, member_id).await {
        Ok(name) => {
            txn.commit().await?;
            info!(member_id, %name, "member removed");
            Ok(name)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(member_id, "rollback after failed removal also failed: {rollback_err}");
            }
            Err(err)
        }
    }
}

async fn delete_member_and_records(
    txn: &DatabaseTransaction,
    member_id: i32,
) -> Result<String, MealError> {
    let member = Member::find_by_id(member_id)
        .one(txn)
        .await?
        .ok_or(MealError::MemberNotFound)?;

    let records = MealRecord::delete_many()
        .filter(meal_record::Column::MemberId.eq(member_id))
        .exec(txn)
        .await?;
    debug!(member_id, rows = records.rows_affected, "deleted meal records");

    Member::delete_by_id(member_id).exec(txn).await?;

    Ok(member.name)
}
