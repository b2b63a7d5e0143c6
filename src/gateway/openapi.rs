//! OpenAPI document
//!
//! - Swagger UI: `/docs`
//! - JSON: `/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::handlers::{admin, auth, bookings, driver, feed, health};
use super::types::ErrorBody;
use crate::admin::{BookingCommand, DriverCommand};
use crate::auth::{DriverSession, OtpTicket, Role, Session};
use crate::booking::{
    AssignedDriver, Booking, BookingStatus, Direction, NewBookingRequest, PassengerView,
    ServiceType,
};
use crate::driver::{Driver, DriverProfile, DriverStatus, Region};
use crate::feed::AvailableBooking;
use crate::reconcile::Discrepancy;
use crate::wallet::{TxType, WalletTransaction};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token from /api/v1/auth/*. Driver routes need a driver \
                             token, admin routes an admin token.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Intercity Carpool API",
        version = "1.0.0",
        description = "Passenger bookings, driver feed and acceptance, wallet ledger and admin console.",
        license(name = "MIT")
    ),
    servers((url = "http://localhost:8080", description = "Development")),
    paths(
        health::health_check,
        bookings::submit_booking,
        bookings::booking_status,
        feed::list_available,
        auth::request_otp,
        auth::verify_otp,
        auth::login,
        auth::admin_login,
        driver::me,
        driver::update_location,
        driver::set_password,
        driver::feed,
        driver::accept_booking,
        driver::complete_booking,
        driver::cancel_booking,
        driver::my_bookings,
        driver::wallet_balance,
        driver::wallet_transactions,
        admin::list_drivers,
        admin::create_driver,
        admin::driver_command,
        admin::driver_transactions,
        admin::list_bookings,
        admin::booking_command,
        admin::reconciliation,
    ),
    components(schemas(
        ErrorBody,
        health::HealthResponse,
        Booking,
        BookingStatus,
        Direction,
        ServiceType,
        NewBookingRequest,
        PassengerView,
        AssignedDriver,
        AvailableBooking,
        Driver,
        DriverStatus,
        DriverProfile,
        Region,
        WalletTransaction,
        TxType,
        Session,
        Role,
        OtpTicket,
        DriverSession,
        DriverCommand,
        BookingCommand,
        Discrepancy,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Passenger", description = "Public booking submission and lookup"),
        (name = "Feed", description = "Pending bookings with masked phones"),
        (name = "Auth", description = "OTP, password and admin login"),
        (name = "Driver", description = "Driver self-service, acceptance and wallet (driver token)"),
        (name = "Admin", description = "Admin console (admin token)"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_json_serializable() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Intercity Carpool API");
        let json = spec.to_json().unwrap();
        assert!(json.contains("/api/v1/driver/bookings/{id}/accept"));
    }

    #[test]
    fn test_routes_registered() {
        let paths = ApiDoc::openapi().paths.paths;
        for path in [
            "/api/v1/health",
            "/api/v1/bookings",
            "/api/v1/bookings/{reference}",
            "/api/v1/feed",
            "/api/v1/auth/otp/verify",
            "/api/v1/driver/wallet",
            "/api/v1/admin/drivers/{id}/commands",
            "/api/v1/admin/reconciliation",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let components = ApiDoc::openapi().components.unwrap();
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
