use sea_orm::{DbErr, EntityTrait};

use crate::entity::user;
use crate::extractors::auth::AuthUser;

/// Resolve the caller behind a valid token to a stored user.
///
/// Yields `None` when the token outlived its account.
pub async fn resolve_current_user<C: sea_orm::ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
) -> Result<Option<user::Model>, DbErr> {
    let found = user::Entity::find_by_id(auth_user.user_id).one(db).await?;
    if found.is_none() {
        tracing::warn!(user_id = auth_user.user_id, "Token refers to a missing user");
    }
    Ok(found)
}
