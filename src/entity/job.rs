//! Job entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    /// Scheduler job number, assigned once.
    #[sea_orm(primary_key, auto_increment = false)]
    pub job_id: i64,
    pub sub_dir: String,
    /// NULL while the status is 'non'
    pub job_dir: Option<String>,
    /// Three-letter status code: non, pen, run, fin, nor, err, oth
    pub job_status: String,
    pub main_name: String,
    pub solver: String,
    pub readme_filename: String,
    pub sub_date: DateTimeUtc,
    #[sea_orm(column_type = "Text")]
    pub info: String,
    pub logfile_path: String,
    pub project: String,
    pub user_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
