use tracing::warn;

use crate::{services::email::EmailLayer, setup::config::AppConfig};

pub fn setup_email_service(config: &AppConfig) -> EmailLayer {
    let email_layer = EmailLayer::new(
        config.resend_api_key.clone(),
        config.email_domain.clone(),
        config.frontend_url.clone(),
    );

    if !email_layer.is_enabled() {
        warn!("RESEND_API_KEY is not set, outgoing email is disabled");
    }

    email_layer
}
