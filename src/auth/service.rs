use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::error::AuthError;
use super::otp::{OtpSender, OtpStore};
use super::password::verify_password;
use super::session::{Claims, Role, Session, SessionManager};
use crate::config::AuthConfig;
use crate::driver::{Driver, DriverService};

/// Returned by an OTP request; the code itself goes out of band
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OtpTicket {
    pub expires_in_secs: u64,
    pub resend_after_secs: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DriverSession {
    #[serde(flatten)]
    pub session: Session,
    pub driver: Driver,
    /// First login created the account
    pub created: bool,
}

pub struct AuthService {
    otp: OtpStore,
    sender: Arc<dyn OtpSender>,
    sessions: SessionManager,
    drivers: Arc<DriverService>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig, drivers: Arc<DriverService>, sender: Arc<dyn OtpSender>) -> Self {
        Self {
            otp: OtpStore::new(
                Duration::from_secs(config.otp_ttl_secs),
                Duration::from_secs(config.otp_resend_secs),
                config.otp_max_attempts,
            ),
            sessions: SessionManager::new(&config.jwt_secret, config.session_ttl_hours),
            sender,
            drivers,
            config,
        }
    }

    pub fn otp_store(&self) -> &OtpStore {
        &self.otp
    }

    /// Sweep expired codes once per OTP lifetime
    pub fn spawn_otp_purge(self: &Arc<Self>) -> JoinHandle<()> {
        self.spawn_otp_purge_every(Duration::from_secs(self.config.otp_ttl_secs.max(1)))
    }

    pub fn spawn_otp_purge_every(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let auth = Arc::clone(self);
        let every = every.max(Duration::from_millis(1));
        tokio::spawn(async move {
            info!(every_secs = every.as_secs(), "OTP purge task started");
            let mut tick = tokio::time::interval(every);
            loop {
                tick.tick().await;
                let purged = auth.otp.purge_expired();
                if purged > 0 {
                    debug!(purged, remaining = auth.otp.len(), "Expired OTP codes purged");
                }
            }
        })
    }

    pub async fn request_otp(&self, raw_phone: &str) -> Result<OtpTicket, AuthError> {
        let phone = self.drivers.normalize_phone(raw_phone)?;
        let code = self.otp.issue(phone.as_str())?;
        self.sender.send(phone.as_str(), &code).await?;
        info!(phone = %phone.masked(), "OTP requested");
        Ok(OtpTicket {
            expires_in_secs: self.config.otp_ttl_secs,
            resend_after_secs: self.config.otp_resend_secs,
        })
    }

    /// Successful verification signs the driver up on first use
    pub async fn verify_otp(&self, raw_phone: &str, code: &str) -> Result<DriverSession, AuthError> {
        let phone = self.drivers.normalize_phone(raw_phone)?;
        if let Err(e) = self.otp.verify(phone.as_str(), code.trim()) {
            warn!(phone = %phone.masked(), error = %e, "OTP verification failed");
            return Err(e);
        }

        let (driver, created) = self.drivers.onboard(phone.as_str()).await?;
        let session = self.sessions.issue_for_driver(driver.id)?;
        info!(driver_id = driver.id, created, "Driver logged in with OTP");
        Ok(DriverSession {
            session,
            driver,
            created,
        })
    }

    pub async fn login(&self, raw_phone: &str, password: &str) -> Result<DriverSession, AuthError> {
        let driver = self
            .drivers
            .find_by_phone(raw_phone)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let Some(ref phc) = driver.password_hash else {
            return Err(AuthError::PasswordNotSet);
        };
        if !verify_password(password, phc)? {
            warn!(driver_id = driver.id, "Password login failed");
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.sessions.issue_for_driver(driver.id)?;
        info!(driver_id = driver.id, "Driver logged in with password");
        Ok(DriverSession {
            session,
            driver,
            created: false,
        })
    }

    pub fn admin_login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let Some(ref phc) = self.config.admin_password_hash else {
            return Err(AuthError::AdminDisabled);
        };
        let password_ok = verify_password(password, phc)?;
        if username != self.config.admin_username || !password_ok {
            warn!(username = %username, "Admin login failed");
            return Err(AuthError::InvalidCredentials);
        }
        info!(username = %username, "Admin logged in");
        self.sessions.issue(username, Role::Admin)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.sessions.verify(token)
    }
}
