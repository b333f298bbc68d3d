//! One-time-password flows (email verification and password reset)
//!
//! The session store only passes these through; the backend owns OTP
//! generation, delivery and expiry.

mod gateway;
mod http;

pub use gateway::{OtpGateway, OtpReply, validate_email, validate_otp};
pub use http::HttpOtpGateway;
