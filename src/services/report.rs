use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::entities::{meal_record, prelude::*};
use crate::services::members::list_members;

/// First and last day of the month containing `date`.
pub fn month_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date - chrono::Days::new(u64::from(date.day0()));
    let next_month = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    let last = next_month
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX);

    (first, last)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberTotal {
    pub name: String,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub organization: String,
    pub month_start: NaiveDate,
    pub month_end: NaiveDate,
    pub rows: Vec<MemberTotal>,
    pub grand_total: i64,
    pub generated_at: NaiveDateTime,
}

impl MonthlyReport {
    pub fn heading(&self) -> String {
        format!("Monthly Meal Report - {}", self.month_start.format("%B %Y"))
    }

    pub fn filename(&self) -> String {
        format!("meal_report_{}.pdf", self.month_start.format("%Y_%m"))
    }
}

/// Totals for every member, including those without records, over the month
/// containing `today`. Rows follow member name order.
pub async fn monthly_report<C: ConnectionTrait>(
    db: &C,
    today: NaiveDate,
    organization: &str,
    generated_at: NaiveDateTime,
) -> Result<MonthlyReport, DbErr> {
    let (month_start, month_end) = month_range(today);
    let members = list_members(db).await?;
    let records = MealRecord::find()
        .filter(meal_record::Column::MealDate.gte(month_start))
        .filter(meal_record::Column::MealDate.lte(month_end))
        .all(db)
        .await?;

    let mut totals: HashMap<i32, i64> = HashMap::new();
    for record in records {
        *totals.entry(record.member_id).or_default() += i64::from(record.meal_count);
    }

    let rows: Vec<MemberTotal> = members
        .into_iter()
        .map(|member| MemberTotal {
            total: totals.get(&member.id).copied().unwrap_or(0),
            name: member.name,
        })
        .collect();
    let grand_total = rows.iter().map(|row| row.total).sum();

    Ok(MonthlyReport {
        organization: organization.to_string(),
        month_start,
        month_end,
        rows,
        grand_total,
        generated_at,
    })
}
