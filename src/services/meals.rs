use std::collections::HashMap;

use chrono::{Days, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
    sea_query::OnConflict,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::entities::{meal_record, member, prelude::*};
use crate::error::MealError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Form field carrying a member's count for `date` on the daily page.
pub fn daily_field_name(date: NaiveDate, member_id: i32) -> String {
    format!("meal_count_{}_{}", date.format(DATE_FORMAT), member_id)
}

pub fn parse_count(raw: &str) -> Result<i32, MealError> {
    raw.trim()
        .parse()
        .map_err(|_| MealError::InvalidCount(raw.to_string()))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, MealError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| MealError::InvalidDate(raw.to_string()))
}

/// Sets the count for (member, date), creating the record if needed. The
/// (member_id, meal_date) unique index decides between insert and update.
pub async fn upsert_meal_record<C: ConnectionTrait>(
    db: &C,
    member_id: i32,
    date: NaiveDate,
    count: i32,
) -> Result<meal_record::Model, DbErr> {
    let now = Utc::now().naive_utc();
    let record = meal_record::ActiveModel {
        member_id: Set(member_id),
        meal_date: Set(date),
        meal_count: Set(count),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    MealRecord::insert(record)
        .on_conflict(
            OnConflict::columns([meal_record::Column::MemberId, meal_record::Column::MealDate])
                .update_columns([meal_record::Column::MealCount, meal_record::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    MealRecord::find()
        .filter(meal_record::Column::MemberId.eq(member_id))
        .filter(meal_record::Column::MealDate.eq(date))
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("meal record for member {member_id} on {date}")))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DailySummary {
    pub saved: usize,
    pub skipped: usize,
}

/// Applies the daily page's submission for `today`. Members without a field
/// are left alone; unparsable counts are skipped without failing the batch.
pub async fn record_daily_counts(
    db: &DatabaseConnection,
    today: NaiveDate,
    form: &HashMap<String, String>,
) -> Result<DailySummary, DbErr> {
    let txn = db.begin().await?;
    let members = Member::find()
        .order_by_asc(member::Column::Name)
        .all(&txn)
        .await?;

    let mut summary = DailySummary::default();
    for member in members {
        let Some(raw) = form.get(&daily_field_name(today, member.id)) else {
            continue;
        };

        match parse_count(raw) {
            Ok(count) => {
                upsert_meal_record(&txn, member.id, today, count).await?;
                summary.saved += 1;
            }
            Err(err) => {
                debug!(member_id = member.id, "skipping daily count: {err}");
                summary.skipped += 1;
            }
        }
    }

    txn.commit().await?;
    info!(%today, saved = summary.saved, skipped = summary.skipped, "daily counts recorded");
    Ok(summary)
}

/// Counts already recorded for `date`, keyed by member id.
pub async fn counts_for_day<C: ConnectionTrait>(
    db: &C,
    date: NaiveDate,
) -> Result<HashMap<i32, i32>, DbErr> {
    let records = MealRecord::find()
        .filter(meal_record::Column::MealDate.eq(date))
        .all(db)
        .await?;

    Ok(records
        .into_iter()
        .map(|r| (r.member_id, r.meal_count))
        .collect())
}

/// An ad-hoc edit from the admin panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordEdit {
    /// Overwrite the count of a known record.
    Existing { record_id: i32, count: i32 },
    /// Find-or-create the record for (member, date).
    ForDay {
        member_id: i32,
        date: NaiveDate,
        count: i32,
    },
}

impl RecordEdit {
    /// Builds an edit from raw form values. Count and date are always
    /// validated; a blank `record_id` selects the find-or-create path.
    pub fn parse(
        record_id: Option<&str>,
        member_id: Option<&str>,
        meal_date: Option<&str>,
        meal_count: Option<&str>,
    ) -> Result<Self, MealError> {
        let count = parse_count(meal_count.unwrap_or_default())?;
        let date = parse_date(meal_date.unwrap_or_default())?;

        match record_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => {
                let record_id = id.parse().map_err(|_| MealError::RecordNotFound)?;
                Ok(Self::Existing { record_id, count })
            }
            None => {
                let member_id = member_id
                    .and_then(|id| id.trim().parse().ok())
                    .ok_or(MealError::MemberNotFound)?;
                Ok(Self::ForDay {
                    member_id,
                    date,
                    count,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Updated(meal_record::Model),
    Saved(meal_record::Model),
}

/// Applies an admin edit in its own transaction, rolled back on failure.
pub async fn apply_record_edit(
    db: &DatabaseConnection,
    edit: RecordEdit,
) -> Result<EditOutcome, MealError> {
    let txn = db.begin().await?;

    match apply_in_txn(&txn, edit).await {
        Ok(outcome) => {
            txn.commit().await?;
            Ok(outcome)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!("rollback after failed record edit also failed: {rollback_err}");
            }
            Err(err)
        }
    }
}

async fn apply_in_txn(txn: &DatabaseTransaction, edit: RecordEdit) -> Result<EditOutcome, MealError> {
    match edit {
        RecordEdit::Existing { record_id, count } => {
            let record = MealRecord::find_by_id(record_id)
                .one(txn)
                .await?
                .ok_or(MealError::RecordNotFound)?;

            let mut record = record.into_active_model();
            record.meal_count = Set(count);
            record.updated_at = Set(Utc::now().naive_utc());
            let record = record.update(txn).await?;
            info!(record_id, count, "meal record updated");
            Ok(EditOutcome::Updated(record))
        }
        RecordEdit::ForDay {
            member_id,
            date,
            count,
        } => {
            Member::find_by_id(member_id)
                .one(txn)
                .await?
                .ok_or(MealError::MemberNotFound)?;

            let record = upsert_meal_record(txn, member_id, date, count).await?;
            info!(member_id, %date, count, "meal record saved");
            Ok(EditOutcome::Saved(record))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryRow {
    pub id: i32,
    pub member_id: i32,
    pub member_name: String,
    pub meal_date: String,
    pub meal_count: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayGroup {
    pub date: String,
    pub records: Vec<HistoryRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct History {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub groups: Vec<DayGroup>,
}

/// Records dated within the last `days` days (inclusive of both ends),
/// newest day first, each day ordered by member name.
pub async fn history<C: ConnectionTrait>(
    db: &C,
    today: NaiveDate,
    days: u64,
) -> Result<History, DbErr> {
    let start = today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);

    let rows: Vec<(meal_record::Model, String)> = MealRecord::find()
        .filter(meal_record::Column::MealDate.between(start, today))
        .find_also_related(Member)
        .order_by_desc(meal_record::Column::MealDate)
        .order_by_asc(member::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(|(record, member)| (record, member.map(|m| m.name).unwrap_or_default()))
        .collect();

    let mut groups: Vec<DayGroup> = Vec::new();
    for (record, member_name) in rows {
        let date = record.meal_date.format(DATE_FORMAT).to_string();
        let row = HistoryRow {
            id: record.id,
            member_id: record.member_id,
            member_name,
            meal_date: date.clone(),
            meal_count: record.meal_count,
        };
        match groups.last_mut() {
            Some(group) if group.date == date => group.records.push(row),
            _ => groups.push(DayGroup {
                date,
                records: vec![row],
            }),
        }
    }

    Ok(History {
        start,
        end: today,
        groups,
    })
}
