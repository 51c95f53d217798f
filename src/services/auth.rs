use crate::{
    error::{AppError, AppResult},
    models::{profile, user, user_role, AppRole, User, UserModel},
    utils::{encode_access_token, hash_password, verify_password},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, TransactionTrait,
};

/// Details collected at sign-up besides credentials.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
}

pub struct AuthService {
    db: DatabaseConnection,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create the user, its profile and the default role in one transaction.
    /// Returns (user_model, access_token).
    pub async fn register(&self, account: NewAccount) -> AppResult<(UserModel, String)> {
        let email = normalize_email(&account.email);
        if self.email_taken(&email).await? {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = hash_password(&account.password)?;
        let txn = self.db.begin().await?;
        let user = create_account(
            &txn,
            &email,
            password_hash,
            account.full_name.trim(),
            account.phone,
            AppRole::User,
        )
        .await?;
        txn.commit().await?;

        tracing::info!(user_id = user.id, "User registered");
        let token = encode_access_token(user.id)?;
        Ok((user, token))
    }

    /// Returns (user_model, access_token).
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(UserModel, String)> {
        let user = User::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(&self.db)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        let token = encode_access_token(user.id)?;
        Ok((user, token))
    }

    pub async fn get_user_by_id(&self, user_id: i32) -> AppResult<UserModel> {
        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn email_taken(&self, email: &str) -> AppResult<bool> {
        let count = User::find()
            .filter(user::Column::Email.eq(email))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Insert user, profile and role rows on the given connection.
pub(crate) async fn create_account<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    password_hash: String,
    full_name: &str,
    phone: Option<String>,
    role: AppRole,
) -> AppResult<UserModel> {
    let now = chrono::Utc::now().naive_utc();

    let user = user::ActiveModel {
        email: sea_orm::ActiveValue::Set(email.to_string()),
        password_hash: sea_orm::ActiveValue::Set(password_hash),
        created_at: sea_orm::ActiveValue::Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    profile::ActiveModel {
        user_id: sea_orm::ActiveValue::Set(user.id),
        full_name: sea_orm::ActiveValue::Set(full_name.to_string()),
        phone: sea_orm::ActiveValue::Set(phone.filter(|p| !p.trim().is_empty())),
        avatar_url: sea_orm::ActiveValue::Set(None),
        reputation_score: sea_orm::ActiveValue::Set(0),
        items_found: sea_orm::ActiveValue::Set(0),
        items_claimed: sea_orm::ActiveValue::Set(0),
        created_at: sea_orm::ActiveValue::Set(now),
        updated_at: sea_orm::ActiveValue::Set(now),
    }
    .insert(conn)
    .await?;

    user_role::ActiveModel {
        user_id: sea_orm::ActiveValue::Set(user.id),
        role: sea_orm::ActiveValue::Set(role),
        created_at: sea_orm::ActiveValue::Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Priya@Example.COM "), "priya@example.com");
    }
}
