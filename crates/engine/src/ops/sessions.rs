//! Session lifecycle: opened by the auth callback, read by the server's
//! session middleware, removed on logout. Expired rows are treated as absent.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveValue, IntoActiveModel, TransactionTrait, prelude::*};

use crate::{Profile, ResultEngine, profiles, sessions};

use super::{Engine, with_tx};

/// Identity fields handed back by the OAuth provider on code exchange.
#[derive(Clone, Debug)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Engine {
    /// Upserts the profile and records a session row for `token`.
    ///
    /// A fresh profile starts with no roles and no legacy admin flag; role
    /// grants are an admin-tooling concern.
    pub async fn open_session(
        &self,
        user: SessionUser,
        token: &str,
        ttl: Duration,
    ) -> ResultEngine<()> {
        with_tx!(self, |tx| {
            async {
                let now = Utc::now();

                match profiles::Entity::find_by_id(user.id.clone()).one(&tx).await? {
                    Some(model) => {
                        let mut active = model.into_active_model();
                        if user.email.is_some() {
                            active.email = ActiveValue::Set(user.email.clone());
                        }
                        if user.name.is_some() {
                            active.name = ActiveValue::Set(user.name.clone());
                        }
                        active.update(&tx).await?;
                    }
                    None => {
                        profiles::ActiveModel {
                            id: ActiveValue::Set(user.id.clone()),
                            email: ActiveValue::Set(user.email.clone()),
                            name: ActiveValue::Set(user.name.clone()),
                            is_admin: ActiveValue::Set(false),
                            roles: ActiveValue::Set(None),
                            created_at: ActiveValue::Set(now.to_rfc3339()),
                        }
                        .insert(&tx)
                        .await?;
                    }
                }

                sessions::ActiveModel {
                    token: ActiveValue::Set(token.to_string()),
                    user_id: ActiveValue::Set(user.id.clone()),
                    created_at: ActiveValue::Set(now.to_rfc3339()),
                    expires_at: ActiveValue::Set((now + ttl).to_rfc3339()),
                }
                .insert(&tx)
                .await?;

                Ok(())
            }
            .await
        })
    }

    /// Resolve a session token to its profile, or `None` when the token is
    /// unknown or expired.
    pub async fn session_profile(&self, token: &str) -> ResultEngine<Option<Profile>> {
        let Some(session) = sessions::Entity::find_by_id(token.to_string())
            .one(self.db())
            .await?
        else {
            return Ok(None);
        };

        let expired = DateTime::parse_from_rfc3339(&session.expires_at)
            .map(|expires| expires.with_timezone(&Utc) <= Utc::now())
            .unwrap_or(true);
        if expired {
            return Ok(None);
        }

        self.profile_by_id(&session.user_id).await
    }

    pub async fn close_session(&self, token: &str) -> ResultEngine<()> {
        sessions::Entity::delete_by_id(token.to_string())
            .exec(self.db())
            .await?;
        Ok(())
    }
}
