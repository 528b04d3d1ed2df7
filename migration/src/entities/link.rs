use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub token: String,
    pub owner_id: String,
    pub label: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub target_url: String,
    pub active: bool,
    pub created_at: DateTimeUtc,
    pub expires_at: Option<DateTimeUtc>,
    pub reveal_at: Option<DateTimeUtc>,
    pub max_clicks: Option<i64>,
    pub click_count: i64,
    pub is_phantom: bool,
    pub password: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
