//! Contact entity for database

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Contact model - an address-book entry owned by exactly one user
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contacts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub first_name: String,

    pub last_name: String,

    pub email: String,

    /// Optional phone number, free-form
    pub phone_number: Option<String>,

    /// Birthday (calendar date, year kept as entered)
    pub birthday: Option<NaiveDate>,

    /// Free-form notes
    pub additional_info: Option<String>,

    /// Owning user; every contact belongs to exactly one user
    pub owner_id: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Check whether this contact's birthday falls within the next `days`
    /// days starting from `today` (inclusive). Compares month/day only, so
    /// the stored birth year does not matter and a December window wraps
    /// into January.
    pub fn birthday_within(&self, today: NaiveDate, days: i64) -> bool {
        let Some(birthday) = self.birthday else {
            return false;
        };

        (0..=days).any(|offset| {
            let day = today + Duration::days(offset);
            day.month() == birthday.month() && day.day() == birthday.day()
        })
    }
}
