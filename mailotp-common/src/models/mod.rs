pub mod otp_record;
