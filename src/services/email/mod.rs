use resend_rs::{types::CreateEmailBaseOptions, Resend};
use tracing::{info, warn};

/// Outgoing mail through Resend. Without an API key every send is skipped with a
/// warning, which is what local development and tests run with.
#[derive(Clone)]
pub struct EmailLayer {
    api_key: Option<String>,
    pub domain: String,
    pub frontend_url: String,
}

impl EmailLayer {
    pub fn new(api_key: Option<String>, domain: String, frontend_url: String) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            domain,
            frontend_url,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, String::from("localhost"), String::from("http://localhost:3000"))
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn password_reset_url(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            self.frontend_url.trim_end_matches('/'),
            token
        )
    }

    pub async fn send_password_reset(&self, to: String, token: String) -> Result<(), resend_rs::Error> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("email delivery disabled, password reset email not sent");
            return Ok(());
        };

        let resend = Resend::new(api_key);

        let from = format!("Classroom <noreply@{}>", &self.domain);
        let to = [to];
        let subject = "Classroom - Password Reset";

        let password_reset_url = self.password_reset_url(&token);

        let email = CreateEmailBaseOptions::new(from, to, subject).with_html(
            format!(
                "<p>A password reset was requested for your account.</p>\
                 <p><a href=\"{}\">Choose a new password</a></p>\
                 <p>The link expires shortly. If you did not ask for it, ignore this email.</p>",
                password_reset_url
            )
            .as_str(),
        );

        let _email = resend.emails.send(email).await?;

        info!("password reset email sent");
        Ok(())
    }
}
