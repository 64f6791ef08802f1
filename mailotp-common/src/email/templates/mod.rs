use std::time::Duration;

pub struct OtpMessage {}

impl OtpMessage {
    pub const SUBJECT: &'static str = "Your OTP Code";

    pub fn generate(otp: &str, otp_lifetime: Duration) -> String {
        format!(
            "<html>
               <head>
                 <style>
                   body {{
                     font-family: Arial, sans-serif;
                     text-align: center;
                   }}
                 </style>
               </head>
             <body>
               <h1>Email Verification</h1>
               <p>Your verification code is:</p>
               <h2 style=\"font-family: 'Courier New', monospace; user-select: all; \
               -webkit-user-select: all;\"><b>{}</b></h2>
               <p>We will never ask you for this code over the phone or email. \
               <b>Your code expires in {} minutes.</b></p>
               <p><i>If you didn't request this, please ignore this email.</i></p>
             </body>
             </html>",
            otp,
            otp_lifetime.as_secs() / 60,
        )
    }
}
