use sea_orm::{ConnectionTrait, prelude::*};

use crate::{EngineError, Profile, ResultEngine, profiles};

use super::Engine;

impl Engine {
    /// Fetch a profile by user id, with the role map decoded.
    pub async fn profile_by_id(&self, user_id: &str) -> ResultEngine<Option<Profile>> {
        self.profile_on(&self.database, user_id).await
    }

    pub(super) async fn profile_on<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<Option<Profile>> {
        let model = profiles::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?;
        Ok(model.map(Profile::from))
    }

    /// The display-context role gate: errors propagate so callers can decide
    /// to coerce them to "not admin".
    pub async fn is_reimburse_admin(&self, user_id: &str) -> ResultEngine<bool> {
        Ok(self
            .profile_by_id(user_id)
            .await?
            .is_some_and(|profile| profile.is_reimburse_admin()))
    }

    /// The write-path role gate: a missing profile, a failed lookup, or a
    /// non-admin role all abort the operation before any mutation.
    pub(super) async fn require_reimburse_admin<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<Profile> {
        let profile = self
            .profile_on(db, user_id)
            .await?
            .ok_or_else(|| EngineError::Forbidden("reimburse admin role required".to_string()))?;
        if !profile.is_reimburse_admin() {
            return Err(EngineError::Forbidden(
                "reimburse admin role required".to_string(),
            ));
        }
        Ok(profile)
    }
}
