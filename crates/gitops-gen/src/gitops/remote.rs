//! Creating the remote repository before the first push.

use thiserror::Error;

use super::error::{Result, SyncError};
use crate::sanitize::split_org_and_repo;

pub const DEFAULT_REPO_DESCRIPTION: &str = "Bootstrapped GitOps Repository based on Components";

/// Failure reported by a hosting API client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HostingError(pub String);

/// Repository to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInput {
    pub private: bool,
    pub description: String,
    /// Organization to create the repository in, empty for the
    /// authenticated user's own account.
    pub namespace: String,
    pub name: String,
}

/// Minimal hosting API needed to bootstrap a repository.
pub trait RepoCreator {
    /// Login of the user the credentials belong to.
    fn current_user(&self) -> std::result::Result<String, HostingError>;

    fn create_repository(&self, input: &RepositoryInput) -> std::result::Result<(), HostingError>;

    /// Whether `owner/name` already exists.
    fn repository_exists(&self, full_name: &str) -> std::result::Result<bool, HostingError>;
}

/// Creates the private repository `remote` points at.
///
/// When the organization in the URL is the authenticated user, the
/// repository is created in the personal account instead.
pub fn create_remote_repository<C: RepoCreator + ?Sized>(creator: &C, remote: &str) -> Result<()> {
    let (org, name) =
        split_org_and_repo(remote).ok_or_else(|| SyncError::RepoUrl(SyncError::sanitized(remote)))?;

    let user = creator
        .current_user()
        .map_err(|e| SyncError::CurrentUser(SyncError::sanitized(&e.0)))?;
    let namespace = if user == org { String::new() } else { org };

    let input = RepositoryInput {
        private: true,
        description: DEFAULT_REPO_DESCRIPTION.to_string(),
        namespace: namespace.clone(),
        name: name.clone(),
    };

    if let Err(err) = creator.create_repository(&input) {
        let owner = if namespace.is_empty() { &user } else { &namespace };
        if let Ok(true) = creator.repository_exists(&format!("{owner}/{name}")) {
            return Err(SyncError::RepoExists);
        }
        return Err(SyncError::CreateRepo {
            name,
            namespace,
            message: SyncError::sanitized(&err.0),
        });
    }

    tracing::info!(repository = %name, "Created remote repository");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeHost {
        user: &'static str,
        existing: Vec<&'static str>,
        created: Mutex<Vec<RepositoryInput>>,
    }

    impl RepoCreator for FakeHost {
        fn current_user(&self) -> std::result::Result<String, HostingError> {
            Ok(self.user.to_string())
        }

        fn create_repository(
            &self,
            input: &RepositoryInput,
        ) -> std::result::Result<(), HostingError> {
            let owner = if input.namespace.is_empty() {
                self.user
            } else {
                input.namespace.as_str()
            };
            let full_name = format!("{owner}/{}", input.name);
            if self.existing.iter().any(|e| *e == full_name) {
                return Err(HostingError("422 name already exists".into()));
            }
            self.created.lock().unwrap().push(input.clone());
            Ok(())
        }

        fn repository_exists(&self, full_name: &str) -> std::result::Result<bool, HostingError> {
            Ok(self.existing.iter().any(|e| *e == full_name))
        }
    }

    fn host(existing: Vec<&'static str>) -> FakeHost {
        FakeHost {
            user: "alice",
            existing,
            created: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_personal_account_clears_namespace() {
        let host = host(vec![]);
        create_remote_repository(&host, "https://ghp_x@github.com/alice/gitops.git").unwrap();

        let created = host.created.lock().unwrap();
        assert_eq!(created[0].namespace, "");
        assert_eq!(created[0].name, "gitops");
        assert!(created[0].private);
    }

    #[test]
    fn test_organization_namespace_kept() {
        let host = host(vec![]);
        create_remote_repository(&host, "https://github.com/shop/gitops").unwrap();
        assert_eq!(host.created.lock().unwrap()[0].namespace, "shop");
    }

    #[test]
    fn test_existing_repository() {
        let host = host(vec!["shop/gitops"]);
        let err = create_remote_repository(&host, "https://github.com/shop/gitops").unwrap_err();
        assert!(matches!(err, SyncError::RepoExists));
    }

    #[test]
    fn test_unparseable_url() {
        let err = create_remote_repository(&host(vec![]), "https://github.com/").unwrap_err();
        assert!(matches!(err, SyncError::RepoUrl(_)));
    }
}
