use crate::{
    config::AdminSeed,
    models::{NewUser, Role, UserChanges, normalize_email},
    password::{self, PasswordError},
    repository::{RepoError, RepositoryState},
};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// ensure_admin
///
/// Makes sure the configured bootstrap administrator exists. A missing account is
/// created; an existing account with that username is promoted to `admin` if needed.
/// The stored password is never overwritten.
///
/// Returns the administrator's user id.
pub async fn ensure_admin(repo: &RepositoryState, seed: &AdminSeed) -> Result<i32, SeedError> {
    if let Some(existing) = repo.get_user_by_username(&seed.username).await? {
        if existing.role != Role::Admin {
            repo.update_user(
                existing.id,
                UserChanges {
                    role: Some(Role::Admin),
                    ..UserChanges::default()
                },
            )
            .await?;
            tracing::warn!(user_id = existing.id, "promoted seeded account to admin");
        }
        return Ok(existing.id);
    }

    let hashed = password::hash(seed.password.clone()).await?;
    let admin = repo
        .create_user(NewUser {
            username: seed.username.clone(),
            email: normalize_email(&seed.email),
            password: hashed,
            role: Role::Admin,
            phone: None,
        })
        .await?;

    tracing::info!(user_id = admin.id, username = %admin.username, "seeded admin account");
    Ok(admin.id)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::repository::InMemoryRepository;

    fn seed() -> AdminSeed {
        AdminSeed {
            username: "root".into(),
            email: "root@example.com".into(),
            password: "changeme".into(),
        }
    }

    #[tokio::test]
    async fn creates_admin_once() {
        let repo: RepositoryState = Arc::new(InMemoryRepository::new());

        let first = ensure_admin(&repo, &seed()).await.unwrap();
        let second = ensure_admin(&repo, &seed()).await.unwrap();
        assert_eq!(first, second);

        let admin = repo.get_user(first).await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(password::verify_password("changeme", &admin.password));
        assert_eq!(repo.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn promotes_existing_client() {
        let repo: RepositoryState = Arc::new(InMemoryRepository::new());
        let client = repo
            .create_user(NewUser {
                username: "root".into(),
                email: "someone@example.com".into(),
                password: password::hash_password("original").unwrap(),
                role: Role::Client,
                phone: None,
            })
            .await
            .unwrap();

        let id = ensure_admin(&repo, &seed()).await.unwrap();
        assert_eq!(id, client.id);

        let promoted = repo.get_user(id).await.unwrap().unwrap();
        assert_eq!(promoted.role, Role::Admin);
        assert!(password::verify_password("original", &promoted.password));
    }
}
