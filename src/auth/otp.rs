//! One-time login codes
//!
//! Codes live in a `DashMap` keyed by normalized phone. A code is burned on
//! success, on expiry and after the last allowed wrong attempt.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;

use super::error::AuthError;
use crate::driver::mask_phone;

pub const OTP_DIGITS: usize = 6;

/// Delivery channel for codes
#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send(&self, phone: &str, code: &str) -> Result<(), AuthError>;
}

/// Development sender: the code itself is only visible at debug
pub struct LogOtpSender;

#[async_trait]
impl OtpSender for LogOtpSender {
    async fn send(&self, phone: &str, code: &str) -> Result<(), AuthError> {
        tracing::info!(phone = %mask_phone(phone), "OTP issued");
        tracing::debug!(phone = %mask_phone(phone), code, "OTP code");
        Ok(())
    }
}

struct OtpEntry {
    code: String,
    issued_at: Instant,
    expires_at: Instant,
    attempts: u32,
}

pub struct OtpStore {
    entries: DashMap<String, OtpEntry>,
    ttl: Duration,
    resend_after: Duration,
    max_attempts: u32,
}

impl OtpStore {
    pub fn new(ttl: Duration, resend_after: Duration, max_attempts: u32) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            resend_after,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// New code for `phone`, replacing any previous one
    pub fn issue(&self, phone: &str) -> Result<String, AuthError> {
        let now = Instant::now();
        let code = generate_code();

        match self.entries.entry(phone.to_string()) {
            Entry::Occupied(mut occupied) => {
                let since = now.duration_since(occupied.get().issued_at);
                if since < self.resend_after {
                    let wait = self.resend_after - since;
                    return Err(AuthError::TooManyRequests {
                        retry_after_secs: wait.as_secs().max(1),
                    });
                }
                occupied.insert(self.entry(code.clone(), now));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(self.entry(code.clone(), now));
            }
        }
        Ok(code)
    }

    pub fn verify(&self, phone: &str, code: &str) -> Result<(), AuthError> {
        let Entry::Occupied(mut occupied) = self.entries.entry(phone.to_string()) else {
            return Err(AuthError::InvalidCode);
        };

        if Instant::now() >= occupied.get().expires_at {
            occupied.remove();
            return Err(AuthError::InvalidCode);
        }

        if codes_match(&occupied.get().code, code) {
            occupied.remove();
            return Ok(());
        }

        let entry = occupied.get_mut();
        entry.attempts += 1;
        if entry.attempts >= self.max_attempts {
            occupied.remove();
            return Err(AuthError::TooManyAttempts);
        }
        Err(AuthError::InvalidCode)
    }

    /// Drop expired entries
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, code: String, now: Instant) -> OtpEntry {
        OtpEntry {
            code,
            issued_at: now,
            expires_at: now + self.ttl,
            attempts: 0,
        }
    }
}

fn codes_match(expected: &str, given: &str) -> bool {
    expected.len() == given.len() && expected.as_bytes().ct_eq(given.as_bytes()).into()
}

fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:0width$}", n, width = OTP_DIGITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> OtpStore {
        OtpStore::new(Duration::from_secs(120), Duration::from_secs(60), 3)
    }

    #[test]
    fn test_code_shape() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), OTP_DIGITS);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_codes_match() {
        assert!(codes_match("042917", "042917"));
        assert!(!codes_match("042917", "042918"));
        assert!(!codes_match("042917", "04291"));
        assert!(!codes_match("042917", "0429170"));
        assert!(!codes_match("042917", ""));
    }

    #[derive(Clone, Default)]
    struct SharedBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_log_sender_keeps_code_out_of_info() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        LogOtpSender.send("09121234567", "482913").await.unwrap();

        let logged = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("OTP issued"));
        assert!(!logged.contains("482913"));
    }

    #[test]
    fn test_correct_code_is_single_use() {
        let otp = store();
        let code = otp.issue("09121234567").unwrap();
        assert_eq!(otp.verify("09121234567", &code), Ok(()));
        assert_eq!(otp.verify("09121234567", &code), Err(AuthError::InvalidCode));
    }

    #[test]
    fn test_resend_is_rate_limited() {
        let otp = store();
        otp.issue("09121234567").unwrap();
        assert!(matches!(
            otp.issue("09121234567"),
            Err(AuthError::TooManyRequests { .. })
        ));
        // other phones unaffected
        assert!(otp.issue("09127654321").is_ok());
    }

    #[test]
    fn test_code_burned_after_max_attempts() {
        let otp = store();
        let code = otp.issue("09121234567").unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        assert_eq!(otp.verify("09121234567", wrong), Err(AuthError::InvalidCode));
        assert_eq!(otp.verify("09121234567", wrong), Err(AuthError::InvalidCode));
        assert_eq!(otp.verify("09121234567", wrong), Err(AuthError::TooManyAttempts));
        assert_eq!(otp.verify("09121234567", &code), Err(AuthError::InvalidCode));
    }

    #[test]
    fn test_expired_code_rejected() {
        let otp = OtpStore::new(Duration::ZERO, Duration::ZERO, 5);
        let code = otp.issue("09121234567").unwrap();
        assert_eq!(otp.verify("09121234567", &code), Err(AuthError::InvalidCode));
        assert!(otp.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let otp = OtpStore::new(Duration::ZERO, Duration::ZERO, 5);
        otp.issue("09121234567").unwrap();
        otp.issue("09127654321").unwrap();
        assert_eq!(otp.purge_expired(), 2);
        assert_eq!(otp.len(), 0);
    }
}
