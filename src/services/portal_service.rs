use sqlx::PgExecutor;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::manager::{Database, DatabaseError};
use crate::database::models::Portal;
use crate::database::{feed, portals, users, PgUsageStore};
use crate::services::mailer::{send_logged, Mailer, OutgoingEmail};
use crate::services::usage_service::UsageService;
use crate::types::{PortalStatus, Role};

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    LimitExceeded(String),
    #[error("{message}")]
    InvalidField { field: &'static str, message: String },
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for PortalError {
    fn from(err: sqlx::Error) -> Self {
        PortalError::Database(DatabaseError::from(err))
    }
}

/// Who may act on a portal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Owner or assigned client
    Member,
    Owner,
}

pub fn check_access(portal: &Portal, user_id: Uuid, access: Access) -> Result<(), PortalError> {
    match access {
        Access::Member if portal.is_member(user_id) => Ok(()),
        Access::Owner if portal.is_owned_by(user_id) => Ok(()),
        Access::Member => Err(PortalError::Forbidden("You do not have access to this portal")),
        Access::Owner => Err(PortalError::Forbidden("Only the portal owner can do this")),
    }
}

/// Load a portal and check the caller's access. Missing portals are 404, not 403.
pub async fn load_portal<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    portal_id: Uuid,
    access: Access,
) -> Result<Portal, PortalError> {
    let portal = portals::find_by_id(executor, portal_id)
        .await?
        .ok_or(PortalError::NotFound("Portal"))?;
    check_access(&portal, user_id, access)?;
    Ok(portal)
}

#[derive(Debug, Clone)]
pub struct NewPortal {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<PortalStatus>,
    pub client_email: Option<String>,
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PortalChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<PortalStatus>,
}

fn name_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

pub struct PortalService {
    db: Database,
    config: Arc<AppConfig>,
    mailer: Arc<dyn Mailer>,
}

impl PortalService {
    pub fn new(db: Database, config: Arc<AppConfig>, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, config, mailer }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Portal>, PortalError> {
        Ok(portals::list_for_member(self.db.pool(), user_id).await?)
    }

    pub async fn get(&self, user_id: Uuid, portal_id: Uuid) -> Result<Portal, PortalError> {
        load_portal(self.db.pool(), user_id, portal_id, Access::Member).await
    }

    /// Create a portal, inviting the client by email when given. The plan check
    /// and the insert share one transaction holding a lock on the owner's row.
    pub async fn create(&self, owner_id: Uuid, new: NewPortal) -> Result<Portal, PortalError> {
        let mut tx = self.db.pool().begin().await?;
        users::lock_for_update(&mut tx, owner_id).await?;

        let existing_client = match new.client_email.as_deref() {
            Some(email) => match users::find_by_email(&mut *tx, email).await? {
                Some(user) if user.role == Role::Client => Some(user),
                Some(_) => {
                    return Err(PortalError::InvalidField {
                        field: "clientEmail",
                        message: "This email belongs to a freelancer account".to_string(),
                    })
                }
                None => None,
            },
            None => None,
        };

        let decision = UsageService::new(PgUsageStore::new(&mut tx), self.config.plans.clone())
            .can_create_portal(owner_id, existing_client.as_ref().map(|u| u.id))
            .await;
        if !decision.allowed {
            let reason = decision.reason.unwrap_or_default();
            warn!("Portal creation denied for {}: {}", owner_id, reason);
            return Err(PortalError::LimitExceeded(reason));
        }

        let client = match (existing_client, new.client_email.as_deref()) {
            (Some(user), _) => Some(user),
            (None, Some(email)) => {
                let name = new.client_name.clone().unwrap_or_else(|| name_from_email(email));
                let user = users::insert_or_find(&mut tx, email, &name, Role::Client).await?;
                if user.role != Role::Client {
                    return Err(PortalError::InvalidField {
                        field: "clientEmail",
                        message: "This email belongs to a freelancer account".to_string(),
                    });
                }
                Some(user)
            }
            (None, None) => None,
        };

        let portal = portals::insert(
            &mut *tx,
            new.name.trim(),
            new.description.as_deref(),
            new.status.unwrap_or(PortalStatus::Active),
            owner_id,
            client.as_ref().map(|c| c.id),
        )
        .await?;

        feed::record_activity(&mut *tx, portal.id, owner_id, "portal_created", &format!("Created portal \"{}\"", portal.name)).await?;
        if let Some(client) = &client {
            feed::notify(
                &mut *tx,
                client.id,
                Some(portal.id),
                "portal_invite",
                &format!("You have been invited to \"{}\"", portal.name),
                Some(&format!("/portals/{}", portal.id)),
            )
            .await?;
        }
        tx.commit().await?;

        info!("Created portal {} for {}", portal.id, owner_id);
        if let Some(client) = client {
            send_logged(
                self.mailer.as_ref(),
                OutgoingEmail {
                    to: client.email,
                    subject: format!("You have been invited to {}", portal.name),
                    body: format!(
                        "Open your portal at {}/portals/{}",
                        self.config.api.public_url.trim_end_matches('/'),
                        portal.id
                    ),
                },
            )
            .await;
        }
        Ok(portal)
    }

    pub async fn update(&self, user_id: Uuid, portal_id: Uuid, changes: PortalChanges) -> Result<Portal, PortalError> {
        let mut tx = self.db.pool().begin().await?;
        load_portal(&mut *tx, user_id, portal_id, Access::Owner).await?;

        let portal = portals::update(
            &mut *tx,
            portal_id,
            changes.name.as_deref().map(str::trim),
            changes.description.as_deref(),
            changes.status,
        )
        .await?;
        feed::record_activity(&mut *tx, portal.id, user_id, "portal_updated", &format!("Updated portal \"{}\"", portal.name)).await?;
        tx.commit().await?;

        Ok(portal)
    }

    pub async fn delete(&self, user_id: Uuid, portal_id: Uuid) -> Result<(), PortalError> {
        load_portal(self.db.pool(), user_id, portal_id, Access::Owner).await?;
        portals::delete(self.db.pool(), portal_id).await?;
        info!("Deleted portal {}", portal_id);
        Ok(())
    }
}
