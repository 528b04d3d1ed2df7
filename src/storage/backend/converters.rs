use crate::storage::ShortLink;
use migration::entities::link;

/// 将 Sea-ORM Model 转换为 ShortLink
pub fn model_to_shortlink(model: link::Model) -> ShortLink {
    ShortLink {
        token: model.token,
        owner_id: model.owner_id,
        label: model.label,
        target_url: model.target_url,
        active: model.active,
        created_at: model.created_at,
        expires_at: model.expires_at,
        reveal_at: model.reveal_at,
        max_clicks: model.max_clicks,
        click_count: model.click_count.max(0),
        is_phantom: model.is_phantom,
        password: model.password,
    }
}

/// 将 ShortLink 转换为 ActiveModel（仅用于插入）
pub fn shortlink_to_active_model(link: &ShortLink) -> link::ActiveModel {
    use sea_orm::ActiveValue::Set;

    link::ActiveModel {
        token: Set(link.token.clone()),
        owner_id: Set(link.owner_id.clone()),
        label: Set(link.label.clone()),
        target_url: Set(link.target_url.clone()),
        active: Set(link.active),
        created_at: Set(link.created_at),
        expires_at: Set(link.expires_at),
        reveal_at: Set(link.reveal_at),
        max_clicks: Set(link.max_clicks),
        click_count: Set(link.click_count),
        is_phantom: Set(link.is_phantom),
        password: Set(link.password.clone()),
    }
}
