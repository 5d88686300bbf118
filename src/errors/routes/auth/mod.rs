mod password_reset;
mod session;
mod signin;
mod signup;

pub use password_reset::PasswordResetError;
pub use session::SessionError;
pub use signin::SigninError;
pub use signup::SignupError;
