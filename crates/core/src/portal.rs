//! Page map for prenotami.esteri.it.
//!
//! Every selector and URL the engine touches lives here, because the portal's
//! markup changes without notice and updating one module beats hunting string
//! literals across the codebase.

use crate::types::Locale;

pub const BASE_URL: &str = "https://prenotami.esteri.it";
pub const LOGIN_URL: &str = "https://prenotami.esteri.it/";
pub const USER_AREA_URL: &str = "https://prenotami.esteri.it/UserArea";

/// `body` carries the `loggedin` class while a session is valid.
pub const LOGGED_IN_MARKER: &str = "loggedin";

pub const LOGIN_EMAIL: &str = "#login-email";
pub const LOGIN_PASSWORD: &str = "#login-password";
/// Submit button; doubles as the CAPTCHA trigger on protected accounts.
pub const LOGIN_SUBMIT: &str = "#captcha-trigger";
/// Validation summary rendered when the portal rejects credentials.
pub const LOGIN_ERROR: &str = ".validation-summary-errors";
/// Marker shown when the account is blocked for too many failed attempts.
pub const ACCOUNT_BLOCKED: &str = ".account-locked-message";

/// jConfirm "OK" button; the portal uses it both for the availability
/// popup ("all appointments are currently booked") and slot-race warnings.
pub const POPUP_OK: &str = ".jconfirm-buttons button.btn.btn-blue";

pub const CALENDAR: &str = "#booking-calendar";
pub const SLOT_CELL: &str = "td.availableSlot";
pub const SLOT_DATETIME_ATTR: &str = "data-datetime";
pub const SLOT_REF_ATTR: &str = "data-slot-id";
pub const OFFICE_LABEL: &str = ".booking-office";
pub const SERVICE_LABEL: &str = ".booking-service";

pub const ACCEPT_TERMS: &str = "#PrivacyCheck";
pub const BOOK_SUBMIT: &str = "#btnPrenotami";
pub const CONFIRMATION_BOX: &str = ".booking-confirmation";
pub const CONFIRMATION_CODE: &str = ".booking-confirmation .confirmation-code";

/// Rows in the user area listing reservations already held by the account.
pub const RESERVATION_ROW: &str = ".reservation-row";
pub const RESERVATION_CODE: &str = ".reservation-row .confirmation-code";

pub fn booking_url(service_id: &str) -> String {
	format!("{BASE_URL}/Services/Booking/{service_id}")
}

/// Language switch link for the given locale; carries `active` when current.
pub fn locale_link_selector(locale: Locale) -> String {
	format!("a[href*='/Language/ChangeLanguage?lang={}']", locale.lang_id())
}

pub fn slot_selector(booking_ref: &str) -> String {
	format!("{SLOT_CELL}[{SLOT_REF_ATTR}='{booking_ref}']")
}
