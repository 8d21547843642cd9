mod signin;
mod signup;

pub use signin::SigninError;
pub use signup::SignupError;
