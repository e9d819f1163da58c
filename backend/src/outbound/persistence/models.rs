//! Internal Diesel row structs for the members table.
//!
//! These never leave the DAO; the DAO hands out [`MemberRecord`]s.
//!
//! [`MemberRecord`]: super::member_dao::MemberRecord

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;

use super::member_dao::{MemberRecord, NewMemberRecord};
use super::schema::members;

/// Row struct for reading from the members table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MemberRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl From<MemberRow> for MemberRecord {
    fn from(row: MemberRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password: row.password,
            created_at: row.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

/// Insertable struct for new members; `id` and `created_at` use defaults.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = members)]
pub(crate) struct NewMemberRow<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> From<&'a NewMemberRecord> for NewMemberRow<'a> {
    fn from(record: &'a NewMemberRecord) -> Self {
        Self {
            name: &record.name,
            email: &record.email,
            password: &record.password,
        }
    }
}
